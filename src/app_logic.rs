/*
 * This module provides the application logic layer, centered around
 * `PipelineController`, which owns the project tree index and the build
 * output and turns project-model events into view commands. Unit tests for
 * the controller are in `handler_tests.rs`.
 */
pub mod handler;


pub use handler::{
    AppLogicError, ContextAction, ControllerRequest, PipelineController, ProjectEvent,
    RecoveryPassSummary, ViewCommand,
};

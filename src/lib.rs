/*
 * Content pipeline tooling: a synchronized tree view model over a content
 * project, and a recovery pass that repairs assets whose texture compression
 * failed during a build. The `core` module holds the platform-agnostic logic;
 * `app_logic` ties it together behind an event-driven controller.
 */
pub mod app_logic;
pub mod core;

/*
 * This module consolidates the platform-agnostic core of the content pipeline
 * tool: the project tree index (with its path segmentation and item model),
 * the build log scanner, the asset recovery engine and the external
 * quantizer, together with the supporting configuration, content discovery
 * and output buffering. Operations that touch the outside world are behind
 * traits (`ConfigManagerOperations`, `ContentScannerOperations`,
 * `RecoveryFileOperations`, `ProcessRunner`) so they can be mocked in tests.
 */
pub mod config;
pub mod file_system;
pub mod log_scanner;
pub mod output_log;
pub mod path_segmenter;
pub mod path_utils;
pub mod project_item;
pub mod quantizer;
pub mod recovery;
pub mod tree_index;

pub use config::{
    ConfigError, ConfigManagerOperations, CoreConfigManager, RecoveryConfig,
    load_recovery_config_from,
};

pub use file_system::{ContentScannerOperations, CoreContentScanner};

pub use log_scanner::{FailureRecord, LogScanner, ScanMarkers};

pub use output_log::{OutputLog, OutputSink};

pub use project_item::{ContentItem, FolderItem, ItemId, ProjectInfo, ProjectItem};

pub use quantizer::{
    CoreProcessRunner, ProcessRunner, QuantizeError, QuantizeEvent, QuantizeOutcome, Quantizer,
};

pub use recovery::{
    CoreRecoveryFileOperations, RecoveryAction, RecoveryEngine, RecoveryError, RecoveryEvent,
    RecoveryFileOperations, RecoveryReport,
};

pub use tree_index::{NodeKind, TreeIndex, TreeNodeId};

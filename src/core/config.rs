/*
 * Manages application configuration: the recognition literals and path
 * rewrite rule used by the asset recovery pass, and the last content
 * directory opened from the command line. Settings are stored as files in
 * the per-user local configuration directory.
 *
 * The recovery literals are tool- and filesystem-specific, so they live in
 * `RecoveryConfig` instead of in the scanning and repair code. Every field
 * falls back to its default when absent from the JSON file, which lets a user
 * override only the values that differ on their machine.
 *
 * `ConfigManagerOperations` abstracts the storage so that the controller can
 * be tested with mock implementations.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const RECOVERY_CONFIG_FILENAME: &str = "recovery_config.json";
const LAST_CONTENT_DIR_FILENAME: &str = "last_content_dir.txt";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoProjectDirectory,
    Utf8Error(std::string::FromUtf8Error),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl From<std::string::FromUtf8Error> for ConfigError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ConfigError::Utf8Error(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration format error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine project directory for configuration")
            }
            ConfigError::Utf8Error(e) => write!(f, "Configuration file UTF-8 error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::Utf8Error(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/*
 * How a source asset path maps onto the build output tree: every occurrence
 * of `source_segment` is replaced by `output_segment`, the rest of the path is
 * kept verbatim.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputRewrite {
    pub source_segment: String,
    pub output_segment: String,
}

impl Default for OutputRewrite {
    fn default() -> Self {
        OutputRewrite {
            source_segment: "/IOS/".to_string(),
            output_segment: "/IOS/bin/IOS/".to_string(),
        }
    }
}

// The external image quantization tool and the flags passed after the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        QuantizerConfig {
            executable: PathBuf::from("pngquant"),
            args: vec!["--ext".to_string(), ".png".to_string(), "--force".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    // A log line starting with any of these names the source file of the
    // diagnostics that follow it.
    pub path_marker_prefixes: Vec<String>,
    pub failure_marker: String,
    pub square_texture_marker: String,
    pub repairable_extensions: Vec<String>,
    pub quantizable_extensions: Vec<String>,
    pub compiled_extension: String,
    pub output_rewrite: OutputRewrite,
    pub quantizer: QuantizerConfig,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            path_marker_prefixes: vec!["D:/".to_string()],
            failure_marker: "Could not compress texture".to_string(),
            square_texture_marker: "PVRTC Compressed textures must be square".to_string(),
            repairable_extensions: vec!["png".to_string(), "jpg".to_string()],
            quantizable_extensions: vec!["png".to_string()],
            compiled_extension: "xnb".to_string(),
            output_rewrite: OutputRewrite::default(),
            quantizer: QuantizerConfig::default(),
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_recovery_config(&self, app_name: &str) -> Result<RecoveryConfig>;
    fn save_recovery_config(&self, app_name: &str, config: &RecoveryConfig) -> Result<()>;
    fn load_last_content_dir(&self, app_name: &str) -> Result<Option<PathBuf>>;
    fn save_last_content_dir(&self, app_name: &str, content_dir: Option<&Path>) -> Result<()>;
}

/*
 * Reads a recovery configuration from an explicit file, as given with
 * `--config` on the command line. Unlike the managed location, a missing file
 * here is an error.
 */
pub fn load_recovery_config_from(path: &Path) -> Result<RecoveryConfig> {
    log::trace!("Config: Loading recovery config from {path:?}");
    let file = File::open(path)?;
    let config = serde_json::from_reader(BufReader::new(file))?;
    Ok(config)
}

pub struct CoreConfigManager {
    // Overrides the per-user directory; used by tests and portable setups.
    config_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            config_dir_override: None,
        }
    }

    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        CoreConfigManager {
            config_dir_override: Some(config_dir),
        }
    }

    fn config_dir(&self, app_name: &str) -> Result<PathBuf> {
        match &self.config_dir_override {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => path_utils::get_base_app_config_local_dir(app_name)
                .ok_or(ConfigError::NoProjectDirectory),
        }
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the recovery configuration from `recovery_config.json` in the
     * application's configuration directory. A missing file yields the
     * built-in defaults; a malformed file is reported as an error.
     */
    fn load_recovery_config(&self, app_name: &str) -> Result<RecoveryConfig> {
        let file_path = self.config_dir(app_name)?.join(RECOVERY_CONFIG_FILENAME);
        if !file_path.exists() {
            log::debug!("CoreConfigManager: {file_path:?} does not exist, using defaults.");
            return Ok(RecoveryConfig::default());
        }
        let config = load_recovery_config_from(&file_path)?;
        log::debug!("CoreConfigManager: Loaded recovery config from {file_path:?}.");
        Ok(config)
    }

    fn save_recovery_config(&self, app_name: &str, config: &RecoveryConfig) -> Result<()> {
        let file_path = self.config_dir(app_name)?.join(RECOVERY_CONFIG_FILENAME);
        let mut writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(&mut writer, config)?;
        // Dropping a BufWriter discards write errors.
        writer.flush()?;
        log::debug!("CoreConfigManager: Saved recovery config to {file_path:?}.");
        Ok(())
    }

    fn load_last_content_dir(&self, app_name: &str) -> Result<Option<PathBuf>> {
        log::trace!("CoreConfigManager: Loading last content dir for app '{app_name}'");
        let file_path = self.config_dir(app_name)?.join(LAST_CONTENT_DIR_FILENAME);

        if !file_path.exists() {
            log::debug!("CoreConfigManager: Last content dir file {file_path:?} does not exist.");
            return Ok(None);
        }

        let mut bytes = Vec::new();
        File::open(&file_path)?.read_to_end(&mut bytes)?;
        let contents = String::from_utf8(bytes)?;

        if contents.trim().is_empty() {
            log::debug!("CoreConfigManager: Last content dir file {file_path:?} is empty.");
            Ok(None)
        } else {
            let path_text = contents.trim();
            log::debug!("CoreConfigManager: Loaded last content dir '{path_text}'.");
            Ok(Some(PathBuf::from(path_text)))
        }
    }

    // Passing `None` clears the stored value.
    fn save_last_content_dir(&self, app_name: &str, content_dir: Option<&Path>) -> Result<()> {
        let file_path = self.config_dir(app_name)?.join(LAST_CONTENT_DIR_FILENAME);
        let mut file = File::create(&file_path)?;
        if let Some(path) = content_dir {
            file.write_all(path.to_string_lossy().as_bytes())?;
        }
        log::debug!(
            "CoreConfigManager: Saved last content dir '{:?}' to {file_path:?}.",
            content_dir
        );
        Ok(())
    }
}

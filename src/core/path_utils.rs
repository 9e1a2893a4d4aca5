/*
 * Path helpers shared by the core: locating the per-user configuration
 * directory, and turning file system paths into the forward-slash location
 * strings used by project items and build logs.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/*
 * Retrieves (and creates if needed) the application's local, non-roaming
 * configuration directory. Returns `None` if the platform gives no suitable
 * location or the directory cannot be created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving config dir for '{app_name}'");
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    let config_path = proj_dirs.config_local_dir();
    if !config_path.exists() {
        if let Err(e) = fs::create_dir_all(config_path) {
            log::error!("PathUtils: Failed to create config directory {config_path:?}: {e}");
            return None;
        }
        log::debug!("PathUtils: Created config directory {config_path:?}");
    }
    Some(config_path.to_path_buf())
}

/*
 * Renders `path` relative to `root` with '/' separators, the form content item
 * locations take regardless of platform. Returns `None` if `path` is not under
 * `root`.
 */
pub fn to_item_location(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

// Log lines name files with forward slashes even on Windows.
pub fn to_log_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/*
 * Discovers content items on disk. A content directory is walked with the
 * `ignore` crate, so `.gitignore`/`.ignore` files and hidden entries are
 * respected, and every remaining regular file becomes a `ContentItem` whose
 * location is its '/'-separated path relative to the content root. This is
 * how the command line front end builds a project without a project file.
 */
use super::path_utils;
use super::project_item::ContentItem;
use ignore::{WalkBuilder, overrides::OverrideBuilder};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FileSystemError {
    Io(io::Error),
    IgnoreError(ignore::Error),
    InvalidPath(PathBuf),
}

impl From<io::Error> for FileSystemError {
    fn from(err: io::Error) -> Self {
        FileSystemError::Io(err)
    }
}

impl From<ignore::Error> for FileSystemError {
    fn from(err: ignore::Error) -> Self {
        FileSystemError::IgnoreError(err)
    }
}

impl std::fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSystemError::Io(e) => write!(f, "I/O error: {e}"),
            FileSystemError::IgnoreError(e) => write!(f, "Ignore pattern processing error: {e}"),
            FileSystemError::InvalidPath(p) => write!(f, "Invalid path: {p:?}"),
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileSystemError::Io(e) => Some(e),
            FileSystemError::IgnoreError(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

pub trait ContentScannerOperations: Send + Sync {
    /*
     * Lists the content files under `root_path` in path order. Items get
     * sequential ids starting at 1. `exclude_patterns` are gitignore-style
     * globs; a leading '!' re-includes.
     */
    fn scan_content(&self, root_path: &Path, exclude_patterns: &[String])
    -> Result<Vec<ContentItem>>;
}

pub struct CoreContentScanner {}

impl CoreContentScanner {
    pub fn new() -> Self {
        CoreContentScanner {}
    }
}

impl Default for CoreContentScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn build_overrides(root_path: &Path, exclude_patterns: &[String]) -> Option<ignore::overrides::Override> {
    if exclude_patterns.is_empty() {
        return None;
    }
    let mut override_builder = OverrideBuilder::new(root_path);
    for pattern in exclude_patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // Overrides are whitelists; negating turns them into excludes.
        let override_pattern = match trimmed.strip_prefix('!') {
            Some(include) if !include.trim().is_empty() => include.trim().to_string(),
            Some(_) => continue,
            None => format!("!{trimmed}"),
        };
        if let Err(err) = override_builder.add(&override_pattern) {
            log::warn!("ContentScanner: Invalid exclude pattern '{pattern}': {err}");
        }
    }
    match override_builder.build() {
        Ok(overrides) => Some(overrides),
        Err(err) => {
            log::warn!("ContentScanner: Failed to build overrides for exclude patterns: {err}");
            None
        }
    }
}

impl ContentScannerOperations for CoreContentScanner {
    fn scan_content(
        &self,
        root_path: &Path,
        exclude_patterns: &[String],
    ) -> Result<Vec<ContentItem>> {
        if !root_path.is_dir() {
            return Err(FileSystemError::InvalidPath(root_path.to_path_buf()));
        }
        log::debug!("ContentScanner: Scanning content directory {root_path:?}");

        let mut walker_builder = WalkBuilder::new(root_path);
        walker_builder
            .standard_filters(true)
            .parents(true)
            .git_global(false)
            .git_ignore(true)
            .git_exclude(true)
            .ignore(true)
            .hidden(true)
            .require_git(false)
            .sort_by_file_path(|a, b| a.cmp(b));
        if let Some(overrides) = build_overrides(root_path, exclude_patterns) {
            walker_builder.overrides(overrides);
        }

        let mut items = Vec::new();
        for entry_result in walker_builder.build() {
            let entry = entry_result?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(location) = path_utils::to_item_location(root_path, entry.path()) else {
                log::warn!(
                    "ContentScanner: {:?} is outside {root_path:?}, skipping.",
                    entry.path()
                );
                continue;
            };
            let id = items.len() as u64 + 1;
            items.push(ContentItem::new(id, location));
        }

        log::debug!(
            "ContentScanner: Found {} content item(s) under {root_path:?}.",
            items.len()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn setup_content_dir(base_path: &Path) -> io::Result<()> {
        fs::create_dir_all(base_path.join("game").join("tiles"))?;
        fs::create_dir_all(base_path.join("fonts"))?;
        fs::create_dir_all(base_path.join("bin").join("IOS"))?;
        File::create(base_path.join("game/tiles/snow.png"))?;
        File::create(base_path.join("game/dice.png"))?;
        File::create(base_path.join("fonts/arial.spritefont"))?;
        File::create(base_path.join("bin/IOS/dice.xnb"))?;
        File::create(base_path.join("notes.tmp"))?;
        Ok(())
    }

    fn locations(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.location.as_str()).collect()
    }

    #[test]
    fn test_scan_lists_files_in_path_order() -> Result<()> {
        let dir = tempdir()?;
        setup_content_dir(dir.path())?;
        let items = CoreContentScanner::new().scan_content(dir.path(), &[])?;
        assert_eq!(
            locations(&items),
            vec![
                "bin/IOS/dice.xnb",
                "fonts/arial.spritefont",
                "game/dice.png",
                "game/tiles/snow.png",
                "notes.tmp"
            ]
        );
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_scan_applies_exclude_patterns() -> Result<()> {
        let dir = tempdir()?;
        setup_content_dir(dir.path())?;
        let excludes = vec!["bin/".to_string(), "*.tmp".to_string(), "# comment".to_string()];
        let items = CoreContentScanner::new().scan_content(dir.path(), &excludes)?;
        assert_eq!(
            locations(&items),
            vec!["fonts/arial.spritefont", "game/dice.png", "game/tiles/snow.png"]
        );
        Ok(())
    }

    #[test]
    fn test_scan_respects_gitignore() -> Result<()> {
        let dir = tempdir()?;
        setup_content_dir(dir.path())?;
        fs::write(dir.path().join(".gitignore"), "fonts/\n")?;
        let items = CoreContentScanner::new().scan_content(dir.path(), &[])?;
        assert!(!locations(&items).contains(&"fonts/arial.spritefont"));
        assert!(locations(&items).contains(&"game/dice.png"));
        Ok(())
    }

    #[test]
    fn test_scan_rejects_non_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.png");
        File::create(&file).unwrap();
        let result = CoreContentScanner::new().scan_content(&file, &[]);
        assert!(matches!(result, Err(FileSystemError::InvalidPath(_))));
    }
}

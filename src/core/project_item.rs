use super::path_segmenter;
use serde::{Deserialize, Serialize};

/*
 * Stable identity of a project item. Tree nodes and selections refer to items
 * through this key rather than through references to the items themselves,
 * which keeps the tree serializable and independent of the project model's
 * object lifetimes. A folder has no identity of its own in the project model,
 * so it is keyed by the location prefix it represents.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemId {
    Project,
    Content(u64),
    Folder(String),
}

/*
 * Common capability of everything that can appear in the project tree: a
 * display name and a path-like location within the project.
 */
pub trait ProjectItem {
    fn id(&self) -> ItemId;
    fn name(&self) -> &str;
    fn location(&self) -> &str;
}

// The project itself, shown as the root of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub location: String,
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        ProjectInfo {
            name: name.into(),
            location: location.into(),
        }
    }
}

impl ProjectItem for ProjectInfo {
    fn id(&self) -> ItemId {
        ItemId::Project
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn location(&self) -> &str {
        &self.location
    }
}

/*
 * A leaf build input. The importer and processor names belong to the project
 * model; the tree only ever looks at the identity, name and location.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub location: String,
    #[serde(default)]
    pub importer: Option<String>,
    #[serde(default)]
    pub processor: Option<String>,
}

impl ContentItem {
    pub fn new(id: u64, location: impl Into<String>) -> Self {
        ContentItem {
            id,
            location: location.into(),
            importer: None,
            processor: None,
        }
    }

    pub fn with_build_settings(
        mut self,
        importer: Option<String>,
        processor: Option<String>,
    ) -> Self {
        self.importer = importer;
        self.processor = processor;
        self
    }
}

impl ProjectItem for ContentItem {
    fn id(&self) -> ItemId {
        ItemId::Content(self.id)
    }
    fn name(&self) -> &str {
        path_segmenter::leaf(&self.location)
    }
    fn location(&self) -> &str {
        &self.location
    }
}

/*
 * A synthetic grouping node for a shared path prefix. Created lazily by the
 * tree index and never persisted on its own.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub location: String,
}

impl FolderItem {
    pub fn new(location: impl Into<String>) -> Self {
        FolderItem {
            location: location.into(),
        }
    }
}

impl ProjectItem for FolderItem {
    fn id(&self) -> ItemId {
        ItemId::Folder(self.location.clone())
    }
    fn name(&self) -> &str {
        path_segmenter::leaf(&self.location)
    }
    fn location(&self) -> &str {
        &self.location
    }
}

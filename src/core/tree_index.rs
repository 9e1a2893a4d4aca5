/*
 * This module maintains the hierarchical index of project items shown in the
 * project tree. Items are inserted by location: every folder segment of the
 * location becomes (or reuses) a folder node, and the item itself becomes a
 * leaf under the innermost folder. Nodes live in an arena keyed by
 * `TreeNodeId`, and an explicit `ItemId -> TreeNodeId` map replaces any
 * reliance on comparing item references. A GUI tree widget is expected to
 * mirror this structure; it is not part of the index.
 *
 * Lookups of identities that are not in the tree are normal (e.g. refreshing
 * an item that was already excluded) and are reported as `None`/`false`
 * rather than as errors.
 */
use super::path_segmenter;
use super::project_item::{FolderItem, ItemId, ProjectItem};
use std::collections::HashMap;

// An opaque handle to a node in the tree, generated from a monotonically
// increasing counter and never reused within one `TreeIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeNodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Project,
    Folder,
    Content,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub label: String,
    pub item: ItemId,
    pub kind: NodeKind,
    pub parent: Option<TreeNodeId>,
    pub children: Vec<TreeNodeId>, // insertion order
    pub expanded: bool,
}

/*
 * Nodes created by a single `insert`: any folders that did not exist yet (in
 * creation order, outermost first) and the new leaf.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedNodes {
    pub folders: Vec<TreeNodeId>,
    pub leaf: TreeNodeId,
}

#[derive(Debug)]
pub struct TreeIndex {
    nodes: HashMap<TreeNodeId, TreeNode>,
    root: Option<TreeNodeId>,
    item_to_node: HashMap<ItemId, TreeNodeId>,
    next_node_id_counter: u64,
}

impl TreeIndex {
    pub fn new() -> Self {
        TreeIndex {
            nodes: HashMap::new(),
            root: None,
            item_to_node: HashMap::new(),
            next_node_id_counter: 1,
        }
    }

    // Node ids are never reused, not even across `set_root` calls.
    fn generate_node_id(&mut self) -> TreeNodeId {
        let id = self.next_node_id_counter;
        self.next_node_id_counter += 1;
        TreeNodeId(id)
    }

    fn add_node(
        &mut self,
        parent: Option<TreeNodeId>,
        label: &str,
        item: ItemId,
        kind: NodeKind,
    ) -> TreeNodeId {
        let id = self.generate_node_id();
        self.nodes.insert(
            id,
            TreeNode {
                label: label.to_string(),
                item: item.clone(),
                kind,
                parent,
                children: Vec::new(),
                expanded: false,
            },
        );
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.push(id);
            }
        }
        self.item_to_node.insert(item, id);
        id
    }

    /*
     * Clears every node and, if an item is given, creates a new root node for
     * it. Safe to call any number of times; each call is a full reset.
     */
    pub fn set_root(&mut self, item: Option<&dyn ProjectItem>) -> Option<TreeNodeId> {
        self.nodes.clear();
        self.item_to_node.clear();
        self.root = None;
        let item = item?;
        let root_id = self.add_node(None, item.name(), item.id(), NodeKind::Project);
        self.root = Some(root_id);
        log::debug!("TreeIndex: Root set to '{}' ({:?}).", item.name(), root_id);
        Some(root_id)
    }

    fn find_folder_child(&self, parent: TreeNodeId, label: &str) -> Option<TreeNodeId> {
        let parent_node = self.nodes.get(&parent)?;
        parent_node.children.iter().copied().find(|child_id| {
            self.nodes
                .get(child_id)
                .is_some_and(|child| child.kind == NodeKind::Folder && child.label == label)
        })
    }

    /*
     * Inserts `item` under the folder chain described by its location, creating
     * any missing folder nodes on the way. Folder labels are matched exactly
     * (case-sensitive) and the first matching folder wins. If the identity is
     * already in the tree its old node is removed first, so a re-insert acts as
     * a move. Returns `None` when there is no root to insert under.
     */
    pub fn insert(&mut self, item: &dyn ProjectItem) -> Option<InsertedNodes> {
        let Some(root_id) = self.root else {
            log::warn!(
                "TreeIndex: Cannot insert '{}' because the tree has no root.",
                item.location()
            );
            return None;
        };
        let identity = item.id();
        if identity == ItemId::Project {
            log::warn!("TreeIndex: Refusing to insert the project item below its own root.");
            return None;
        }
        if self.item_to_node.contains_key(&identity) {
            log::debug!("TreeIndex: {identity:?} already present, moving it.");
            self.remove(&identity);
        }

        let location = item.location();
        let segmented = path_segmenter::segment(location);
        let prefixes = path_segmenter::folder_prefixes(location);

        let mut parent = root_id;
        let mut created_folders = Vec::new();
        for (folder, prefix) in segmented.folders.iter().zip(prefixes) {
            parent = match self.find_folder_child(parent, folder) {
                Some(existing) => existing,
                None => {
                    let folder_item = FolderItem::new(prefix);
                    let folder_id =
                        self.add_node(Some(parent), folder, folder_item.id(), NodeKind::Folder);
                    log::trace!(
                        "TreeIndex: Created folder node {folder_id:?} for '{}'.",
                        folder_item.location
                    );
                    created_folders.push(folder_id);
                    folder_id
                }
            };
        }

        let label_taken = self
            .nodes
            .get(&parent)
            .is_some_and(|p| p.children.iter().any(|c| self.label_of(*c) == Some(item.name())));
        if label_taken {
            log::warn!(
                "TreeIndex: Label '{}' already used under the same parent; names should be unique per folder.",
                item.name()
            );
        }

        let leaf = self.add_node(Some(parent), item.name(), identity, NodeKind::Content);
        if let Some(root) = self.nodes.get_mut(&root_id) {
            root.expanded = true;
        }
        Some(InsertedNodes {
            folders: created_folders,
            leaf,
        })
    }

    /*
     * Detaches the node tagged with `item` together with its whole subtree.
     * Returns the id of the detached node, or `None` if the identity is not in
     * the tree. Folders left empty by the removal stay in place.
     */
    pub fn remove(&mut self, item: &ItemId) -> Option<TreeNodeId> {
        let node_id = self.find_by_identity(item)?;
        let parent = self.nodes.get(&node_id).and_then(|n| n.parent);
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                parent_node.children.retain(|c| *c != node_id);
            }
        }

        let mut pending = vec![node_id];
        let mut removed_count = 0usize;
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if self.item_to_node.get(&node.item) == Some(&current) {
                    self.item_to_node.remove(&node.item);
                }
                pending.extend(node.children);
                removed_count += 1;
            }
        }
        if self.root == Some(node_id) {
            self.root = None;
        }
        log::debug!("TreeIndex: Removed {item:?} ({removed_count} node(s)).");
        Some(node_id)
    }

    pub fn find_by_identity(&self, item: &ItemId) -> Option<TreeNodeId> {
        self.item_to_node.get(item).copied()
    }

    pub fn node(&self, id: TreeNodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    fn label_of(&self, id: TreeNodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.label.as_str())
    }

    pub fn children(&self, id: TreeNodeId) -> &[TreeNodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn root(&self) -> Option<TreeNodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // The synthesized folder item behind a folder node.
    pub fn folder_item(&self, id: TreeNodeId) -> Option<FolderItem> {
        match &self.nodes.get(&id)?.item {
            ItemId::Folder(location) => Some(FolderItem::new(location.clone())),
            _ => None,
        }
    }

    /*
     * Renders the tree as indented text lines, depth-first in child order.
     * Folders are suffixed with '/'. Used by the command line front end.
     */
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let Some(root_id) = self.root else {
            return lines;
        };
        let mut stack = vec![(root_id, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let suffix = if node.kind == NodeKind::Folder { "/" } else { "" };
            lines.push(format!("{}{}{}", "  ".repeat(depth), node.label, suffix));
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        lines
    }
}

impl Default for TreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

use crate::core::{
    ConfigManagerOperations, ContentItem, FolderItem, ItemId, LogScanner, NodeKind, OutputLog,
    OutputSink, ProcessRunner, ProjectInfo, ProjectItem, QuantizeEvent, QuantizeOutcome, Quantizer,
    RecoveryConfig, RecoveryEngine, RecoveryEvent, RecoveryFileOperations, RecoveryReport,
    ScanMarkers, TreeIndex, TreeNodeId,
};
use std::sync::Arc;

pub const APP_NAME: &str = "ContentPipeline";

pub(crate) const RECOVERY_START_BANNER: &str = "===== RECOVERY START =====";
pub(crate) const RECOVERY_FINISH_BANNER: &str = "===== RECOVERY FINISH =====";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppLogicError {
    // An action identifier the controller does not know how to handle.
    UnhandledAction(String),
}

impl std::fmt::Display for AppLogicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppLogicError::UnhandledAction(text) => write!(f, "Unhandled action text={text}"),
        }
    }
}

impl std::error::Error for AppLogicError {}

pub type Result<T> = std::result::Result<T, AppLogicError>;

/*
 * Changes to the project model, delivered by whatever loads and edits the
 * project. Items are passed by value; the controller only keeps identities.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    SetRoot(Option<ProjectInfo>),
    Insert(ContentItem),
    Remove(ItemId),
    Select(ItemId),
    Refresh(ItemId),
}

/*
 * Instructions for the view that renders the tree and the property panel.
 * They describe what changed in the index so a tree widget can be kept in
 * sync incrementally.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    ClearTree,
    AddNode {
        id: TreeNodeId,
        parent: Option<TreeNodeId>,
        label: String,
        kind: NodeKind,
    },
    RemoveNode(TreeNodeId),
    ExpandNode(TreeNodeId),
    SelectNode(TreeNodeId),
    RefreshNode(TreeNodeId),
    ShowProperties(Option<ItemId>),
    RefreshProperties(ItemId),
}

// Context menu entries offered on tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    Include,
    Exclude,
}

impl ContextAction {
    pub fn text(self) -> &'static str {
        match self {
            ContextAction::Include => "Add",
            ContextAction::Exclude => "Remove",
        }
    }

    pub fn from_text(text: &str) -> Result<Self> {
        match text {
            "Add" => Ok(ContextAction::Include),
            "Remove" => Ok(ContextAction::Exclude),
            other => Err(AppLogicError::UnhandledAction(other.to_string())),
        }
    }
}

// What the project model should do in response to a context action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerRequest {
    Include(String),
    Exclude(ItemId),
}

#[derive(Debug, Default)]
pub struct RecoveryPassSummary {
    pub recovery: RecoveryReport,
    pub quantization: Vec<QuantizeOutcome>,
}

impl RecoveryPassSummary {
    pub fn error_count(&self) -> usize {
        self.recovery.failures.len()
            + self
                .quantization
                .iter()
                .filter(|o| o.result.is_err())
                .count()
    }
}

/*
 * Keeps the project tree index, the selection and the build output in one
 * place, owned by a single thread. Project-model events come in through
 * `handle_event` and are answered with `ViewCommand`s; output written from
 * other threads arrives through `OutputSink`s and is applied on `drain`.
 * It also runs the recovery pass over the current build output.
 */
pub struct PipelineController {
    pub(crate) tree: TreeIndex,
    pub(crate) output: OutputLog,
    pub(crate) selected: Option<ItemId>,
    pub(crate) properties_target: Option<ItemId>,
    // Location of the open project; the root node only carries its identity.
    pub(crate) project_location: Option<String>,
    pub(crate) config: RecoveryConfig,
    file_ops: Arc<dyn RecoveryFileOperations>,
    process_runner: Arc<dyn ProcessRunner>,
}

impl PipelineController {
    pub fn new(
        config: RecoveryConfig,
        file_ops: Arc<dyn RecoveryFileOperations>,
        process_runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        PipelineController {
            tree: TreeIndex::new(),
            output: OutputLog::new(),
            selected: None,
            properties_target: None,
            project_location: None,
            config,
            file_ops,
            process_runner,
        }
    }

    /*
     * Replaces the recovery configuration with the one stored by
     * `config_manager`. On failure the current configuration is kept and the
     * problem is written to the output, since a bad settings file should not
     * prevent the editor from working.
     */
    pub fn load_settings(&mut self, config_manager: &dyn ConfigManagerOperations) {
        match config_manager.load_recovery_config(APP_NAME) {
            Ok(config) => {
                log::debug!("AppLogic: Loaded recovery settings.");
                self.config = config;
            }
            Err(e) => {
                log::error!("AppLogic: Error loading recovery settings: {e}. Keeping current.");
                self.output
                    .append(Some(&format!("ERROR: Could not load settings: {e}")));
            }
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn tree(&self) -> &TreeIndex {
        &self.tree
    }

    pub fn selected(&self) -> Option<&ItemId> {
        self.selected.as_ref()
    }

    fn add_node_command(&self, id: TreeNodeId) -> Option<ViewCommand> {
        let node = self.tree.node(id)?;
        Some(ViewCommand::AddNode {
            id,
            parent: node.parent,
            label: node.label.clone(),
            kind: node.kind,
        })
    }

    pub fn handle_event(&mut self, event: ProjectEvent) -> Vec<ViewCommand> {
        let mut commands = Vec::new();
        match event {
            ProjectEvent::SetRoot(project) => {
                let root = self
                    .tree
                    .set_root(project.as_ref().map(|p| p as &dyn ProjectItem));
                commands.push(ViewCommand::ClearTree);
                commands.extend(root.and_then(|id| self.add_node_command(id)));
                self.selected = None;
                self.properties_target = project.as_ref().map(|p| p.id());
                self.project_location = project.as_ref().map(|p| p.location().to_string());
                commands.push(ViewCommand::ShowProperties(self.properties_target.clone()));
            }
            ProjectEvent::Insert(item) => {
                if let Some(inserted) = self.tree.insert(&item) {
                    for id in inserted.folders.iter().chain(std::iter::once(&inserted.leaf)) {
                        commands.extend(self.add_node_command(*id));
                    }
                    commands.extend(self.tree.root().map(ViewCommand::ExpandNode));
                }
            }
            ProjectEvent::Remove(id) => {
                if let Some(node) = self.tree.remove(&id) {
                    commands.push(ViewCommand::RemoveNode(node));
                    let tree = &self.tree;
                    let gone = |item: &Option<ItemId>| {
                        item.as_ref()
                            .is_some_and(|i| tree.find_by_identity(i).is_none())
                    };
                    let selection_gone = gone(&self.selected);
                    let properties_gone = gone(&self.properties_target);
                    if selection_gone {
                        self.selected = None;
                    }
                    if properties_gone {
                        self.properties_target = None;
                    }
                } else {
                    log::trace!("AppLogic: Remove of {id:?} ignored, not in tree.");
                }
            }
            ProjectEvent::Select(id) => {
                if let Some(node) = self.tree.find_by_identity(&id) {
                    commands.push(ViewCommand::SelectNode(node));
                    commands.push(ViewCommand::ShowProperties(Some(id.clone())));
                    self.selected = Some(id.clone());
                    self.properties_target = Some(id);
                }
            }
            ProjectEvent::Refresh(id) => {
                if let Some(node) = self.tree.find_by_identity(&id) {
                    commands.push(ViewCommand::RefreshNode(node));
                }
                if self.properties_target.as_ref() == Some(&id) {
                    commands.push(ViewCommand::RefreshProperties(id));
                }
            }
        }
        commands
    }

    pub fn context_actions_for(&self, node: TreeNodeId) -> Vec<ContextAction> {
        match self.tree.node(node).map(|n| n.kind) {
            Some(NodeKind::Content) => vec![ContextAction::Exclude],
            Some(_) => vec![ContextAction::Include],
            None => Vec::new(),
        }
    }

    /*
     * Translates a clicked context menu entry into a request for the project
     * model. Unknown entry text is a programming error in the menu wiring and
     * is reported as such; a node that no longer exists yields `None`.
     */
    pub fn on_context_action(
        &self,
        action_text: &str,
        node: TreeNodeId,
    ) -> Result<Option<ControllerRequest>> {
        let action = ContextAction::from_text(action_text)?;
        let Some(tree_node) = self.tree.node(node) else {
            return Ok(None);
        };
        let request = match action {
            ContextAction::Exclude => ControllerRequest::Exclude(tree_node.item.clone()),
            ContextAction::Include => {
                let location = match &tree_node.item {
                    ItemId::Folder(_) => self
                        .tree
                        .folder_item(node)
                        .map(|f: FolderItem| f.location)
                        .unwrap_or_default(),
                    ItemId::Project => self.project_location.clone().unwrap_or_default(),
                    ItemId::Content(_) => String::new(),
                };
                ControllerRequest::Include(location)
            }
        };
        Ok(Some(request))
    }

    pub fn output_sink(&self) -> OutputSink {
        self.output.sink()
    }

    pub fn output_append(&mut self, text: Option<&str>) {
        self.output.append(text);
    }

    pub fn output_clear(&mut self) {
        self.output.clear();
    }

    // Applies queued output from other threads, then returns the full text.
    pub fn output_text(&mut self) -> &str {
        self.output.drain();
        self.output.text()
    }

    /*
     * Scans the current build output for repairable texture failures, repairs
     * them on disk and quantizes the repaired images. Progress and per-item
     * errors are appended to the output as the pass goes. Running the pass
     * again over the same output leaves the file system as it was after the
     * first run.
     */
    pub fn run_recovery_pass(&mut self) -> RecoveryPassSummary {
        self.output.drain();
        let log_text = self.output.text().to_string();
        self.output.append(Some(RECOVERY_START_BANNER));
        log::info!("AppLogic: Starting recovery pass over {} line(s).", log_text.lines().count());

        let markers = ScanMarkers::from_config(&self.config);
        let records = LogScanner::new(&log_text, &markers);
        let engine = RecoveryEngine::new(&self.config, self.file_ops.as_ref());
        let output = &mut self.output;
        let recovery = engine.run(records, |event| match event {
            RecoveryEvent::Fixing(action) => output.append(Some(&format!(
                "== FIXING: {}",
                action.original_path.display()
            ))),
            RecoveryEvent::Failed(failure) => {
                output.append(Some(&format!("ERROR: {}", failure.error)))
            }
        });

        let quantizer = Quantizer::new(&self.config.quantizer, self.process_runner.as_ref());
        let quantization = quantizer.run(&recovery.quantize_worklist, |event| match event {
            QuantizeEvent::Starting(path) => output.append(Some(&format!(
                "===== RUNNING QUANTIZER ON: {}",
                path.display()
            ))),
            QuantizeEvent::Finished(outcome) => {
                if let Err(e) = &outcome.result {
                    output.append(Some(&format!("ERROR: {e}")));
                }
            }
        });

        output.append(Some(RECOVERY_FINISH_BANNER));
        let summary = RecoveryPassSummary {
            recovery,
            quantization,
        };
        log::info!(
            "AppLogic: Recovery pass finished with {} error(s).",
            summary.error_count()
        );
        summary
    }
}

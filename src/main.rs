use content_pipeline::app_logic::handler::APP_NAME;
use content_pipeline::app_logic::{PipelineController, ProjectEvent};
use content_pipeline::core::file_system::FileSystemError;
use content_pipeline::core::path_utils;
use content_pipeline::core::{
    ConfigError, ConfigManagerOperations, ContentScannerOperations, CoreConfigManager,
    CoreContentScanner, CoreProcessRunner, CoreRecoveryFileOperations, ProjectInfo,
    RecoveryConfig, load_recovery_config_from,
};
use clap::{Args, Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "content_pipeline")]
#[command(version)]
#[command(about = "Inspect a content project and recover assets from failed texture builds", long_about = None)]
struct Cli {
    /// Increase diagnostic output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a build log for texture failures, repair them and quantize the copies
    Recover(RecoverArgs),
    /// Print the project tree of a content directory
    Tree(TreeArgs),
}

#[derive(Args)]
struct RecoverArgs {
    /// Build log to scan
    #[arg(short, long)]
    log: PathBuf,
    /// Recovery settings file; defaults to the per-user settings
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct TreeArgs {
    /// Content directory; defaults to the last one used
    dir: Option<PathBuf>,
    /// Gitignore-style pattern of files to leave out (repeatable)
    #[arg(short, long = "exclude")]
    excludes: Vec<String>,
}

#[derive(Debug)]
enum CliError {
    Io(PathBuf, io::Error),
    Config(ConfigError),
    Scan(FileSystemError),
    NoContentDirectory,
    LogReaderPanicked,
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<FileSystemError> for CliError {
    fn from(err: FileSystemError) -> Self {
        CliError::Scan(err)
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(path, e) => write!(f, "Could not read {path:?}: {e}"),
            CliError::Config(e) => write!(f, "{e}"),
            CliError::Scan(e) => write!(f, "{e}"),
            CliError::NoContentDirectory => {
                write!(f, "No content directory given and none used before")
            }
            CliError::LogReaderPanicked => write!(f, "The log reader thread panicked"),
        }
    }
}

impl std::error::Error for CliError {}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }
}

fn make_controller(config: RecoveryConfig) -> PipelineController {
    PipelineController::new(
        config,
        Arc::new(CoreRecoveryFileOperations::new()),
        Arc::new(CoreProcessRunner::new()),
    )
}

/*
 * Feeds the build log into the controller's output from a reader thread, the
 * way a running build would, then runs one recovery pass over it. Returns
 * failure if any item could not be repaired or quantized.
 */
fn run_recover(args: &RecoverArgs) -> Result<ExitCode, CliError> {
    let mut controller = match &args.config {
        Some(path) => make_controller(load_recovery_config_from(path)?),
        None => {
            let mut controller = make_controller(RecoveryConfig::default());
            controller.load_settings(&CoreConfigManager::new());
            controller
        }
    };

    let sink = controller.output_sink();
    let log_path = args.log.clone();
    let reader = thread::spawn(move || -> Result<usize, CliError> {
        let text = fs::read_to_string(&log_path).map_err(|e| CliError::Io(log_path.clone(), e))?;
        let mut fed = 0;
        for line in text.lines() {
            if !sink.append(line) {
                break;
            }
            fed += 1;
        }
        Ok(fed)
    });
    let fed = reader.join().map_err(|_| CliError::LogReaderPanicked)??;
    log::debug!("Main: Fed {fed} log line(s) into the output.");

    let summary = controller.run_recovery_pass();
    print!("{}", controller.output_text());
    println!(
        "Repaired {}, skipped {}, quantized {}, errors {}.",
        summary.recovery.repaired.len(),
        summary.recovery.skipped,
        summary.quantization.len(),
        summary.error_count()
    );

    if summary.error_count() > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned())
}

fn run_tree(args: &TreeArgs) -> Result<ExitCode, CliError> {
    let config_manager = CoreConfigManager::new();
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => config_manager
            .load_last_content_dir(APP_NAME)?
            .ok_or(CliError::NoContentDirectory)?,
    };

    let items = CoreContentScanner::new().scan_content(&dir, &args.excludes)?;
    let mut controller = make_controller(RecoveryConfig::default());
    controller.handle_event(ProjectEvent::SetRoot(Some(ProjectInfo::new(
        project_name(&dir),
        path_utils::to_log_path(&dir),
    ))));
    for item in items {
        controller.handle_event(ProjectEvent::Insert(item));
    }
    for line in controller.tree().render_lines() {
        println!("{line}");
    }

    if let Err(e) = config_manager.save_last_content_dir(APP_NAME, Some(&dir)) {
        log::warn!("Main: Could not remember content directory {dir:?}: {e}");
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Recover(args) => run_recover(args),
        Commands::Tree(args) => run_tree(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            log::error!("Main: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/*
 * Runs the external image quantization tool over the files collected by the
 * recovery pass. Each file gets its own invocation, strictly one after the
 * other, and each invocation is waited for. No timeout is applied: a tool that
 * hangs blocks the batch. Any failure (the tool could not be started, or it
 * exited unsuccessfully) is recorded for that file and the next file is
 * attempted regardless.
 */
use crate::core::config::QuantizerConfig;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug)]
pub enum QuantizeError {
    Launch(io::Error),
    // `None` when the process was terminated without an exit code.
    ExitStatus(Option<i32>),
}

impl std::fmt::Display for QuantizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantizeError::Launch(e) => write!(f, "Failed to start quantizer: {e}"),
            QuantizeError::ExitStatus(Some(code)) => {
                write!(f, "Quantizer exited with status {code}")
            }
            QuantizeError::ExitStatus(None) => write!(f, "Quantizer was terminated by a signal"),
        }
    }
}

impl std::error::Error for QuantizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuantizeError::Launch(e) => Some(e),
            _ => None,
        }
    }
}

/*
 * Abstracts launching a process and waiting for it. Returns the exit code
 * (`None` if the process had none) or the launch error.
 */
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<Option<i32>>;
}

pub struct CoreProcessRunner {}

impl CoreProcessRunner {
    pub fn new() -> Self {
        CoreProcessRunner {}
    }
}

impl Default for CoreProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for CoreProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<Option<i32>> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.code())
    }
}

#[derive(Debug)]
pub struct QuantizeOutcome {
    pub path: PathBuf,
    pub result: Result<(), QuantizeError>,
}

#[derive(Debug)]
pub enum QuantizeEvent<'a> {
    Starting(&'a Path),
    Finished(&'a QuantizeOutcome),
}

pub struct Quantizer<'a> {
    config: &'a QuantizerConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Quantizer<'a> {
    pub fn new(config: &'a QuantizerConfig, runner: &'a dyn ProcessRunner) -> Self {
        Quantizer { config, runner }
    }

    // The file comes first, then the configured flags.
    fn arguments_for(&self, path: &Path) -> Vec<OsString> {
        std::iter::once(path.as_os_str().to_os_string())
            .chain(self.config.args.iter().map(OsString::from))
            .collect()
    }

    pub fn quantize(&self, path: &Path) -> Result<(), QuantizeError> {
        let args = self.arguments_for(path);
        log::debug!(
            "Quantizer: Running {:?} with {:?}",
            self.config.executable,
            args
        );
        match self.runner.run(&self.config.executable, &args) {
            Ok(Some(0)) => Ok(()),
            Ok(code) => Err(QuantizeError::ExitStatus(code)),
            Err(e) => Err(QuantizeError::Launch(e)),
        }
    }

    /*
     * Quantizes every path in order. `on_event` sees each path just before its
     * invocation and each outcome right after, so callers can report progress.
     */
    pub fn run(
        &self,
        worklist: &[PathBuf],
        mut on_event: impl FnMut(QuantizeEvent<'_>),
    ) -> Vec<QuantizeOutcome> {
        worklist
            .iter()
            .map(|path| {
                on_event(QuantizeEvent::Starting(path));
                let result = self.quantize(path);
                if let Err(e) = &result {
                    log::warn!("Quantizer: {path:?} failed: {e}");
                }
                let outcome = QuantizeOutcome {
                    path: path.clone(),
                    result,
                };
                on_event(QuantizeEvent::Finished(&outcome));
                outcome
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedRunner {
        invocations: Mutex<Vec<(PathBuf, Vec<OsString>)>>,
        failing_file: PathBuf,
        launch_error: bool,
    }

    impl ScriptedRunner {
        fn new(failing_file: &str, launch_error: bool) -> Self {
            ScriptedRunner {
                invocations: Mutex::new(Vec::new()),
                failing_file: PathBuf::from(failing_file),
                launch_error,
            }
        }
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> io::Result<Option<i32>> {
            self.invocations
                .lock()
                .unwrap()
                .push((program.to_path_buf(), args.to_vec()));
            if Path::new(&args[0]) == self.failing_file {
                if self.launch_error {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
                }
                return Ok(Some(2));
            }
            Ok(Some(0))
        }
    }

    fn worklist() -> Vec<PathBuf> {
        vec![
            PathBuf::from("out/a.png"),
            PathBuf::from("out/b.png"),
            PathBuf::from("out/c.png"),
        ]
    }

    #[test]
    fn test_invocation_passes_file_then_flags() {
        let config = QuantizerConfig::default();
        let runner = ScriptedRunner::new("none", false);
        let quantizer = Quantizer::new(&config, &runner);
        quantizer.quantize(Path::new("out/a.png")).unwrap();

        let invocations = runner.invocations.lock().unwrap();
        assert_eq!(invocations[0].0, PathBuf::from("pngquant"));
        let args: Vec<&str> = invocations[0]
            .1
            .iter()
            .map(|a| a.to_str().unwrap())
            .collect();
        assert_eq!(args, vec!["out/a.png", "--ext", ".png", "--force"]);
    }

    #[test]
    fn test_launch_failure_does_not_stop_the_batch() {
        let config = QuantizerConfig::default();
        let runner = ScriptedRunner::new("out/a.png", true);
        let quantizer = Quantizer::new(&config, &runner);
        let outcomes = quantizer.run(&worklist(), |_| {});

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0].result, Err(QuantizeError::Launch(_))));
        assert!(outcomes[1].result.is_ok());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(runner.invocations.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_non_zero_exit_is_recorded() {
        let config = QuantizerConfig::default();
        let runner = ScriptedRunner::new("out/b.png", false);
        let quantizer = Quantizer::new(&config, &runner);
        let mut announced = Vec::new();
        let mut finished = 0;
        let outcomes = quantizer.run(&worklist(), |event| match event {
            QuantizeEvent::Starting(p) => announced.push(p.to_path_buf()),
            QuantizeEvent::Finished(_) => finished += 1,
        });

        assert!(matches!(
            outcomes[1].result,
            Err(QuantizeError::ExitStatus(Some(2)))
        ));
        assert!(outcomes[2].result.is_ok());
        assert_eq!(announced, worklist());
        assert_eq!(finished, 3);
    }

    #[test]
    fn test_core_runner_reports_missing_executable() {
        let config = QuantizerConfig {
            executable: PathBuf::from("definitely-not-an-installed-quantizer-binary"),
            args: Vec::new(),
        };
        let runner = CoreProcessRunner::new();
        let quantizer = Quantizer::new(&config, &runner);
        let outcomes = quantizer.run(&worklist(), |_| {});
        assert_eq!(outcomes.len(), 3);
        assert!(
            outcomes
                .iter()
                .all(|o| matches!(o.result, Err(QuantizeError::Launch(_))))
        );
    }
}

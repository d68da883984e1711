use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TunerError};
use crate::tuner::metrics::MetricSnapshot;

/// Execution port: run the engine on a configuration file and collect its metrics.
pub trait EnginePort {
    fn run(&mut self, config_path: &Path) -> Result<MetricSnapshot>;
}

/// Set by Ctrl-C; checked before and after every engine run.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Install a process-wide Ctrl-C handler that raises the returned flag.
    ///
    /// The engine child shares the terminal's process group and receives the
    /// signal itself; the tuner survives long enough to unwind and remove
    /// its temporary files.
    pub fn install() -> Result<Self> {
        let flag = Self::default();
        let handle = flag.clone();
        ctrlc::set_handler(move || handle.raise())?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(TunerError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Runs the engine as a blocking child process: `executable <config_path>`.
pub struct ProcessEngine {
    executable: PathBuf,
    interrupt: InterruptFlag,
}

impl ProcessEngine {
    pub fn new(executable: impl Into<PathBuf>, interrupt: InterruptFlag) -> Self {
        Self {
            executable: executable.into(),
            interrupt,
        }
    }
}

impl EnginePort for ProcessEngine {
    fn run(&mut self, config_path: &Path) -> Result<MetricSnapshot> {
        self.interrupt.check()?;
        tracing::debug!(engine = ?self.executable, config = ?config_path, "spawning engine");

        let output = Command::new(&self.executable)
            .arg(config_path)
            .output()
            .map_err(|source| TunerError::Spawn {
                path: self.executable.clone(),
                source,
            })?;

        // The child dies on the same Ctrl-C; report the interrupt rather than its exit code.
        self.interrupt.check()?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(TunerError::Execution {
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            tracing::warn!(engine = ?self.executable, "engine stderr: {stderr}");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(bytes = stdout.len(), "engine finished");
        MetricSnapshot::parse(&stdout)
    }
}

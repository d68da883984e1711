use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

/// Default directory for run logs.
pub const DEFAULT_LOG_DIR: &str = "parameter_search_logs";

/// Progress logger for one tuning run.
///
/// Every line goes to the console and, when a log file is attached, is
/// appended to it and flushed immediately. The file is closed when the
/// logger is dropped.
pub struct RunLogger {
    path: Option<PathBuf>,
    file: Option<Arc<Mutex<File>>>,
}

impl RunLogger {
    /// Open `<dir>/run_log_<timestamp>.txt` for appending, creating `dir` if needed.
    pub fn create<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("run_log_{stamp}.txt"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path: Some(path),
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Logger without a backing file.
    pub fn console_only() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a progress line to stdout and the log file.
    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        println!("{message}");
        self.append(message);
    }

    /// Write a warning line to stderr and the log file.
    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        eprintln!("{message}");
        self.append(message);
    }

    fn append(&self, message: &str) {
        if let Some(file) = &self.file {
            append_line(file, message.as_bytes());
        }
    }

    /// Writer factory for `tracing_subscriber`, mirroring events to stderr
    /// and to this logger's file for as long as the logger is alive.
    pub fn tracing_writer(&self) -> impl Fn() -> TeeWriter + Send + Sync + 'static {
        let file = self.file.as_ref().map(Arc::downgrade).unwrap_or_default();
        move || TeeWriter {
            file: file.upgrade(),
        }
    }
}

fn append_line(file: &Mutex<File>, bytes: &[u8]) {
    // A poisoned lock only means another writer panicked mid-line.
    let mut guard = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    // Console output already happened; a failing log write must not abort the run.
    let _ = write_flushed(&mut guard, bytes);
}

fn write_flushed(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.flush()
}

/// Stderr writer that also appends to the run log.
pub struct TeeWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &self.file {
            let mut guard = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.write_all(buf)?;
            guard.flush()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

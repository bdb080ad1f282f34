use crate::error::Error;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only destination for action log lines. The reconciler only ever
/// writes to it.
pub trait LogSink: Send + Sync {
    fn append(&self, message: &str) -> io::Result<()>;
}

pub fn format_line(message: &str) -> String {
    format!("{}: {}\n", Local::now().format(TIMESTAMP_FORMAT), message)
}

/// Plain-text action log, one timestamped line per entry.
pub struct FileLogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLogSink {
    /// Open the log for appending. A missing log file (and its parent
    /// directories) is created and starts with a creation entry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(Error::LogSink)?;
        }

        let existed = path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Error::LogSink)?;

        if !existed {
            let line = format_line("Log file created.");
            file.write_all(line.as_bytes()).map_err(Error::LogSink)?;
            info!("{}", line.trim_end());
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append(&self, message: &str) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| io::Error::new(ErrorKind::Other, format!("Failed to lock log: {}", e)))?;
        file.write_all(format_line(message).as_bytes())?;
        file.flush()
    }
}

/// Keeps log lines in memory, timestamps omitted.
#[derive(Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, message: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|e| io::Error::new(ErrorKind::Other, format!("Failed to lock log: {}", e)))?
            .push(message.to_string());
        Ok(())
    }
}

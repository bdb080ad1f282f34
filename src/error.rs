use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path error: {} is not below {}", path.display(), root.display())]
    Path { root: PathBuf, path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source folder {} does not exist or is not a directory", .0.display())]
    SourceMissing(PathBuf),

    #[error("Log sink error: {0}")]
    LogSink(#[source] io::Error),

    #[error("Synchronization pass already in progress")]
    PassInProgress,
}

impl Error {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

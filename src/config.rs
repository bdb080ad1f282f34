use crate::error::Error;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Raw configuration as merged from `Config.toml`, `MIRROR_*` environment
/// variables and command line overrides. Any field may still be missing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    pub source_path: Option<PathBuf>,
    pub replica_path: Option<PathBuf>,
    pub log_file_path: Option<PathBuf>,
    pub interval_secs: Option<u64>,
}

/// Validated settings for a synchronization job.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
}

pub fn load_configuration(overrides: &AppConfig) -> Result<AppConfig, Error> {
    let interval_override = overrides
        .interval_secs
        .map(i64::try_from)
        .transpose()
        .map_err(|_| Error::InvalidConfig("interval is too large".to_string()))?;

    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("MIRROR").try_parsing(true))
        .set_override_option("source_path", path_value(&overrides.source_path))?
        .set_override_option("replica_path", path_value(&overrides.replica_path))?
        .set_override_option("log_file_path", path_value(&overrides.log_file_path))?
        .set_override_option("interval_secs", interval_override)?
        .build()?;

    Ok(builder.try_deserialize::<AppConfig>()?)
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

impl AppConfig {
    pub fn is_complete(&self) -> bool {
        self.source_path.is_some()
            && self.replica_path.is_some()
            && self.log_file_path.is_some()
            && self.interval_secs.is_some()
    }

    /// Validate into settings. A missing interval is only accepted when
    /// `require_interval` is false (single passes); it then resolves to zero.
    pub fn resolve(&self, require_interval: bool) -> Result<SyncSettings, Error> {
        let source = required_path(&self.source_path, "source folder path")?;
        let replica = required_path(&self.replica_path, "replica folder path")?;
        let log_file = required_path(&self.log_file_path, "log file path")?;

        let interval_secs = match (self.interval_secs, require_interval) {
            (Some(0), true) | (None, true) => {
                return Err(Error::InvalidConfig(
                    "synchronization interval must be a positive number of seconds".to_string(),
                ))
            }
            (secs, _) => secs.unwrap_or(0),
        };

        check_roots_disjoint(&source, &replica)?;

        Ok(SyncSettings {
            source,
            replica,
            log_file,
            interval: Duration::from_secs(interval_secs),
        })
    }
}

fn required_path(value: &Option<PathBuf>, name: &str) -> Result<PathBuf, Error> {
    match value {
        Some(path) if !path.as_os_str().to_string_lossy().trim().is_empty() => Ok(path.clone()),
        _ => Err(Error::InvalidConfig(format!("{} is required", name))),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Source and replica must not be the same folder or nested in each other.
fn check_roots_disjoint(source: &Path, replica: &Path) -> Result<(), Error> {
    let source_abs = absolutize(source);
    let replica_abs = absolutize(replica);

    if source_abs.starts_with(&replica_abs) || replica_abs.starts_with(&source_abs) {
        return Err(Error::InvalidConfig(format!(
            "source {} and replica {} overlap",
            source.display(),
            replica.display()
        )));
    }
    Ok(())
}

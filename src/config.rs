//! Daemon configuration
//!
//! Settings persist as a human-editable JSON file in the app directory,
//! written with owner-only permissions since it can hold the upload
//! password. A shared snapshot is handed to every component; the caches
//! see it through the [`CacheConfig`] trait and can ask for a re-read
//! without knowing where the file lives.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::CacheConfig;
use crate::shortid;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 60606;

/// Default short-ID length in characters.
pub const DEFAULT_HASH_LEN: usize = 4;

/// Everything the daemon can be told. All fields have defaults, so a
/// hand-edited file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host used when building returned URLs. Empty means echo the
    /// request's Host header.
    pub host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Upload password checked against `X-Airlift-Password`. `None`
    /// disables the gate.
    pub password: Option<String>,
    /// Directory uploads are stored in.
    pub directory: PathBuf,
    /// Characters in a short ID, clamped to 1..=64.
    pub hash_len: usize,
    /// Maximum upload age in days. 0 disables age pruning.
    pub age: u32,
    /// Maximum total size of uploads in megabytes. 0 disables the bound.
    pub size: u64,
    /// Maximum number of uploads. 0 disables the bound.
    pub max_count: usize,
    /// Append the original file extension to returned URLs.
    pub append_ext: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            password: None,
            directory: home.join(".airliftd").join("uploads"),
            hash_len: DEFAULT_HASH_LEN,
            age: 0,
            size: 0,
            max_count: 0,
            append_ext: false,
        }
    }
}

impl Settings {
    /// Pull out-of-range values back into range.
    fn normalize(mut self) -> Self {
        self.hash_len = self.hash_len.clamp(1, 64);
        self
    }
}

/// Shared, reloadable view of the settings file. Clones are cheap and all
/// observe the same snapshot.
#[derive(Clone)]
pub struct SharedConfig {
    path: PathBuf,
    inner: Arc<RwLock<Settings>>,
}

impl SharedConfig {
    /// Read the settings at `path`, creating the file from defaults when
    /// it doesn't exist. An existing file is written back after loading so
    /// newly added fields show up with their defaults.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let parsed: Settings =
                    serde_json::from_str(&raw).context("decoding config")?;
                parsed.normalize()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, writing defaults");
                Settings::default()
            }
            Err(e) => return Err(e).context("reading config"),
        };
        save(&path, &settings)?;

        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(settings)),
        })
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().unwrap().clone()
    }

    /// Re-read the settings file and swap in the result.
    pub fn reload(&self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.path).context("reading config")?;
        let parsed: Settings = serde_json::from_str(&raw).context("decoding config")?;
        let parsed = parsed.normalize();
        *self.inner.write().unwrap() = parsed;
        info!(path = %self.path.display(), "config reloaded");
        Ok(())
    }
}

impl CacheConfig for SharedConfig {
    fn max_age(&self) -> u32 {
        self.inner.read().unwrap().age
    }

    fn max_size(&self) -> u64 {
        self.inner.read().unwrap().size
    }

    fn max_count(&self) -> usize {
        self.inner.read().unwrap().max_count
    }

    fn refresh(&self) {
        if let Err(e) = self.reload() {
            warn!(error = %e, "config refresh failed, keeping previous settings");
        }
    }

    fn process_hash(&self, buf: &[u8]) -> String {
        let len = self.inner.read().unwrap().hash_len;
        shortid::make(buf, len.clamp(1, 64))
    }
}

/// Write the settings as pretty JSON, owner read/write only.
fn save(path: &Path, settings: &Settings) -> Result<()> {
    let body = serde_json::to_string_pretty(settings).context("encoding config")?;
    write_private(path, body.as_bytes()).context("writing config")
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = SharedConfig::load_or_create(&path).unwrap();

        assert!(path.exists());
        let snap = config.snapshot();
        assert_eq!(snap.port, DEFAULT_PORT);
        assert_eq!(snap.hash_len, DEFAULT_HASH_LEN);
        assert_eq!(snap.password, None);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_loads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 8080, "size": 512}"#).unwrap();

        let config = SharedConfig::load_or_create(&path).unwrap();
        let snap = config.snapshot();
        assert_eq!(snap.port, 8080);
        assert_eq!(snap.size, 512);
        // untouched fields fall back to defaults
        assert_eq!(snap.hash_len, DEFAULT_HASH_LEN);

        // the file is rewritten with the full field set
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("hash_len"));
    }

    #[test]
    fn test_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{port: oops").unwrap();
        assert!(SharedConfig::load_or_create(&path).is_err());
    }

    #[test]
    fn test_hash_len_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hash_len": 0}"#).unwrap();
        let config = SharedConfig::load_or_create(&path).unwrap();
        assert_eq!(config.snapshot().hash_len, 1);
        assert_eq!(config.process_hash(&[7u8; 64]).len(), 1);

        std::fs::write(&path, r#"{"hash_len": 999}"#).unwrap();
        config.reload().unwrap();
        assert_eq!(config.snapshot().hash_len, 64);
    }

    #[test]
    fn test_reload_and_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = SharedConfig::load_or_create(&path).unwrap();
        assert_eq!(config.max_age(), 0);

        std::fs::write(&path, r#"{"age": 7, "max_count": 3}"#).unwrap();
        config.refresh();
        assert_eq!(config.max_age(), 7);
        assert_eq!(config.max_count(), 3);

        // a clone sees the same snapshot
        let other = config.clone();
        assert_eq!(other.max_count(), 3);
    }

    #[test]
    fn test_process_hash_uses_configured_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hash_len": 8}"#).unwrap();
        let config = SharedConfig::load_or_create(&path).unwrap();
        let id = config.process_hash(&[42u8; 64]);
        assert_eq!(id.len(), 8);
    }
}

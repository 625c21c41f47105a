//! Remote object store contract and backends.
//!
//! The pipeline only ever uses three operations: list keys under a prefix,
//! fetch a key to a local file, and put a local file at a key. Keys are
//! hierarchical strings (`speaker/chapter/file.wav`-shaped). Deleting local
//! copies is an ordinary filesystem concern and stays with the caller.

use crate::config::{Config, StoreBackend};
use crate::error::{MixError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Fetch/list/put capability shared by every layer above.
///
/// Constructed once by the composition root and passed into the orchestrator
/// and every worker; a mock or `FsStore` stands in for tests.
pub trait ObjectStore: Send + Sync {
    /// List all keys under `prefix`, in a stable order.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Download `key` to `dest`, overwriting any existing file.
    fn fetch(&self, key: &str, dest: &Path) -> Result<()>;

    /// Upload the file at `src` under `key`.
    fn put(&self, src: &Path, key: &str) -> Result<()>;
}

/// True when `key` sits under `prefix` as whole path components: `train`
/// matches `train/19/x.wav` but not `train2/19/x.wav`. A trailing slash on
/// the prefix is ignored; an empty prefix matches everything.
pub fn key_in_prefix(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Build the configured store backend.
pub fn from_config(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    match config.store.backend {
        StoreBackend::Fs => {
            let root = config.store.root.as_deref().ok_or_else(|| {
                MixError::ConfigInvalidValue {
                    key: "store.root".to_string(),
                    message: "required for the fs backend".to_string(),
                }
            })?;
            Ok(Arc::new(FsStore::new(root)))
        }
        StoreBackend::Http => {
            let endpoint = config.store.endpoint.as_deref().ok_or_else(|| {
                MixError::ConfigInvalidValue {
                    key: "store.endpoint".to_string(),
                    message: "required for the http backend".to_string(),
                }
            })?;
            Ok(Arc::new(HttpStore::new(endpoint)))
        }
    }
}

/// Directory-backed store.
///
/// Keys map directly to paths under the root. Doubles as the test backend
/// and as a way to run against a locally synced corpus.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect(&path, keys)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                keys.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsStore {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        if self.root.exists() {
            self.collect(&self.root, &mut keys)?;
        }
        keys.retain(|k| key_in_prefix(k, prefix));
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, key: &str, dest: &Path) -> Result<()> {
        fs::copy(self.root.join(key), dest).map_err(|e| MixError::RemoteUnavailable {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn put(&self, src: &Path, key: &str) -> Result<()> {
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, &dest).map_err(|e| MixError::RemoteUnavailable {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// HTTP store backend.
///
/// Expects `GET {endpoint}/index.json` to return a JSON array of keys,
/// `GET {endpoint}/{key}` to serve the object, and `PUT {endpoint}/{key}`
/// to accept an upload.
pub struct HttpStore {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }

    fn remote_err(key: &str, message: impl ToString) -> MixError {
        MixError::RemoteUnavailable {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// Parse the key index: a JSON array of key strings.
    fn parse_index(reader: impl std::io::Read) -> Result<Vec<String>> {
        serde_json::from_reader(reader)
            .map_err(|e| Self::remote_err("index.json", format!("invalid key index: {e}")))
    }
}

impl ObjectStore for HttpStore {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let url = self.url("index.json");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Self::remote_err("index.json", e))?;

        if !response.status().is_success() {
            return Err(Self::remote_err(
                "index.json",
                format!("listing returned status {}", response.status()),
            ));
        }

        let entries = Self::parse_index(response)?;

        let mut keys: Vec<String> = entries
            .into_iter()
            .filter(|k| key_in_prefix(k, prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, key: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(self.url(key))
            .send()
            .map_err(|e| Self::remote_err(key, e))?;

        if !response.status().is_success() {
            return Err(Self::remote_err(
                key,
                format!("fetch returned status {}", response.status()),
            ));
        }

        let mut file = fs::File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| Self::remote_err(key, e))?;
        file.flush()?;
        Ok(())
    }

    fn put(&self, src: &Path, key: &str) -> Result<()> {
        let body = fs::read(src)?;
        let response = self
            .client
            .put(self.url(key))
            .body(body)
            .send()
            .map_err(|e| Self::remote_err(key, e))?;

        if !response.status().is_success() {
            return Err(Self::remote_err(
                key,
                format!("upload returned status {}", response.status()),
            ));
        }
        Ok(())
    }
}

/// Bounded retry with exponential backoff for remote operations.
///
/// `attempts = 1` restores fail-fast behavior: the first error escalates
/// straight to a fatal `RemoteUnavailable`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Fail on the first error, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.store.retry_attempts,
            Duration::from_millis(config.store.retry_base_ms),
        )
    }

    /// Run `op`, retrying on error with delays of `base`, `2*base`, `4*base`...
    /// Returns the last error once attempts are exhausted.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(_) if attempt < self.attempts => {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

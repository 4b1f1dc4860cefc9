//! Persistent, expiring cache of JSON API responses.
//!
//! Each entry lives in its own file `{dir}/{key}.json`, where the key is a
//! SHA-256 digest of the request identity (method, URL and headers). Entries
//! expire a fixed duration after they were first cached.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Request;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One cached response as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub body: Value,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct ResponseCache {
    dir: PathBuf,
    expire_after: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expire_after: Duration) -> Self {
        Self {
            dir: dir.into(),
            expire_after,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Returns the cached body for `key` if an entry exists and has not expired at `now`.
    ///
    /// Unreadable entries count as misses; the next [`put`](Self::put) replaces them.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache entry");
                return None;
            }
        };

        if !entry.is_fresh(now) {
            debug!(url = %entry.url, expires_at = %entry.expires_at, "Cache entry expired");
            return None;
        }

        Some(entry.body)
    }

    /// Stores `body` under `key`, overwriting any previous entry.
    pub fn put(&self, key: &str, url: &str, body: &Value, now: DateTime<Utc>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;

        let entry = CacheEntry {
            url: url.to_string(),
            cached_at: now,
            expires_at: now + self.expire_after,
            body: body.clone(),
        };

        let path = self.entry_path(key);
        fs::write(&path, serde_json::to_vec(&entry)?)
            .with_context(|| format!("failed to write cache entry {}", path.display()))?;
        Ok(())
    }
}

/// Hashes everything that identifies a request: method, URL and headers in sorted order.
pub fn request_key(req: &Request) -> String {
    let mut headers: Vec<(String, &[u8])> = req
        .headers()
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes()))
        .collect();
    headers.sort();

    let mut hasher = Sha256::new();
    hasher.update(req.method().as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(req.url().as_str().as_bytes());
    hasher.update(b"\n");
    for (name, value) in headers {
        hasher.update(name.as_bytes());
        hasher.update(b": ");
        hasher.update(value);
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

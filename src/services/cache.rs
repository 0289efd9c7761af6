use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// On-disk shape: `{"timestamp": "<ISO-8601>", "data": ...}`.
///
/// Older project caches stored the payload under `projects`; both are read.
#[derive(Serialize, Deserialize)]
struct CacheEnvelope<T> {
    timestamp: NaiveDateTime,
    #[serde(alias = "projects")]
    data: T,
}

/// JSON file holding one value that expires `ttl_secs` after it was written.
pub struct TtlCache<T> {
    path: PathBuf,
    ttl_secs: u64,
    _payload: PhantomData<T>,
}

/// True when `stored` is at most `ttl_secs` old at `now`.
///
/// A timestamp from the future is treated as stale.
pub fn is_fresh(stored: NaiveDateTime, now: NaiveDateTime, ttl_secs: u64) -> bool {
    let age = now - stored;
    age >= Duration::zero() && age.num_seconds() < ttl_secs as i64
}

impl<T> TtlCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            path: path.into(),
            ttl_secs,
            _payload: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Option<T> {
        self.get_at(Local::now().naive_local())
    }

    /// Cached value if the file exists, parses, and is fresh at `now`.
    pub fn get_at(&self, now: NaiveDateTime) -> Option<T> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("[Cache] no cache at {}", self.path.display());
                return None;
            }
            Err(e) => {
                log::warn!("[Cache] cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };

        let envelope: CacheEnvelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("[Cache] ignoring corrupt cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        if !is_fresh(envelope.timestamp, now, self.ttl_secs) {
            log::debug!(
                "[Cache] {} is stale (written {})",
                self.path.display(),
                envelope.timestamp
            );
            return None;
        }
        log::debug!(
            "[Cache] using {} (age {}s)",
            self.path.display(),
            (now - envelope.timestamp).num_seconds()
        );
        Some(envelope.data)
    }

    pub fn set(&self, data: &T) {
        self.set_at(data, Local::now().naive_local());
    }

    /// Write `data` stamped with `now`. Failures are logged and otherwise ignored.
    pub fn set_at(&self, data: &T, now: NaiveDateTime) {
        if let Err(e) = self.write(data, now) {
            log::warn!("[Cache] cannot write {}: {}", self.path.display(), e);
        }
    }

    fn write(&self, data: &T, now: NaiveDateTime) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let envelope = CacheEnvelope { timestamp: now, data };
        let json = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&self.path, json)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

// src/history.rs
// Run-to-run memory of item identities, used to tag "Rappels" (reminders).
// The only state that crosses pipeline runs: loaded at start, appended to
// during normalization, saved at end by the pipeline entry.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_HISTORY_PATH: &str = "output/sent_history.json";
const RETENTION_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub times_seen: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    items: HashMap<String, HistoryEntry>,
    #[serde(default)]
    last_cleanup: Option<DateTime<Utc>>,
}

/// Identity key: sha-256 of the lowercased url, truncated to 16 hex chars.
pub fn item_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.trim().to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[derive(Debug, Default)]
pub struct RunHistory {
    inner: HistoryFile,
    path: Option<PathBuf>,
    dirty: bool,
}

impl RunHistory {
    /// In-memory history; recurrence detection starts cold and is not saved.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Load from disk; a missing or corrupt file starts fresh rather than
    /// failing the run.
    pub fn load(path: &Path) -> Self {
        let inner = match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HistoryFile::default(),
        };
        let mut h = Self {
            inner,
            path: Some(path.to_path_buf()),
            dirty: false,
        };
        h.cleanup(Utc::now());
        h
    }

    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// True when the url was already present before this run started
    /// (i.e. seen in a prior invocation).
    pub fn is_recurring(&self, url: &str) -> bool {
        self.inner.items.contains_key(&item_key(url))
    }

    /// Record a sighting. New urls are inserted for the next run; known urls
    /// get their counter bumped.
    pub fn observe(&mut self, title: &str, url: &str, now: DateTime<Utc>) {
        let key = item_key(url);
        self.dirty = true;
        match self.inner.items.get_mut(&key) {
            Some(e) => {
                e.times_seen = e.times_seen.saturating_add(1);
                e.last_seen = now;
            }
            None => {
                let mut title = title.to_string();
                title.truncate(title.char_indices().nth(100).map_or(title.len(), |(i, _)| i));
                self.inner.items.insert(
                    key,
                    HistoryEntry {
                        title,
                        url: url.to_string(),
                        first_seen: now,
                        last_seen: now,
                        times_seen: 1,
                    },
                );
            }
        }
    }

    fn cleanup(&mut self, now: DateTime<Utc>) {
        let due = self
            .inner
            .last_cleanup
            .map(|t| now - t > Duration::days(1))
            .unwrap_or(true);
        if !due {
            return;
        }
        let cutoff = now - Duration::days(RETENTION_DAYS);
        let before = self.inner.items.len();
        self.inner.items.retain(|_, e| e.last_seen > cutoff);
        if self.inner.items.len() != before {
            self.dirty = true;
        }
        self.inner.last_cleanup = Some(now);
    }

    /// Persist atomically (tmp + rename). No-op for ephemeral histories or
    /// when nothing changed.
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.inner)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

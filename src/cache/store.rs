//! Filesystem-backed store, one entry file per identity.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::entry::{CacheEntry, SCHEMA_VERSION, StoredEntry};
use crate::error::StoreError;
use crate::features::{SpectralFingerprint, WaveformPeaks};
use crate::identity::AudioIdentity;

/// Owns the on-disk representation of the cache.
///
/// Entry files are named by a hash of the audio file's path, so the same
/// path always maps to the same entry file across runs; staleness is
/// detected by comparing the full identity stored inside the entry.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up the entry for exactly this identity.
    ///
    /// An entry written for a previous identity of the same path (size
    /// or mtime differ) reads as `None`, an implicit invalidation by key
    /// mismatch. Corrupt or incompatible entries also read as `None`,
    /// with a warning, so the caller regenerates instead of failing.
    pub fn get(&self, identity: &AudioIdentity) -> Option<CacheEntry> {
        let path = self.entry_path(&identity.path);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(_) => return None,
        };

        let stored: StoredEntry = match serde_json::from_slice(&data) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    entry = %path.display(),
                    error = %e,
                    "discarding unreadable cache entry"
                );
                return None;
            }
        };

        if stored.schema_version != SCHEMA_VERSION {
            debug!(
                entry = %path.display(),
                version = stored.schema_version,
                "cache entry from an incompatible schema; treating as absent"
            );
            return None;
        }
        if stored.entry.identity != *identity {
            debug!(
                path = %identity.path.display(),
                "cached identity no longer matches the file; treating as absent"
            );
            return None;
        }

        Some(stored.entry)
    }

    /// Write (or extend) the entry for `identity`.
    ///
    /// Products already stored for the same identity are carried over,
    /// so peaks and fingerprint can arrive from separate jobs. The write
    /// goes to a temporary sibling and is renamed into place; a crash
    /// mid-write leaves the previous entry intact. Transient write
    /// failures are retried once.
    pub fn put(
        &self,
        identity: &AudioIdentity,
        peaks: Option<WaveformPeaks>,
        fingerprint: Option<SpectralFingerprint>,
    ) -> Result<CacheEntry, StoreError> {
        let existing = self.get(identity);
        let merged = CacheEntry {
            identity: identity.clone(),
            peaks: peaks.or_else(|| existing.as_ref().and_then(|e| e.peaks.clone())),
            fingerprint: fingerprint.or_else(|| existing.and_then(|e| e.fingerprint)),
            created_at_ms: now_ms(),
        };

        let payload = serde_json::to_vec(&StoredEntry {
            schema_version: SCHEMA_VERSION,
            entry: merged.clone(),
        })?;

        let final_path = self.entry_path(&identity.path);
        let tmp_path = final_path.with_extension("tmp");

        if let Err(first) = write_and_replace(&tmp_path, &final_path, &payload) {
            warn!(
                entry = %final_path.display(),
                error = %first,
                "cache write failed; retrying once"
            );
            write_and_replace(&tmp_path, &final_path, &payload).map_err(|e| StoreError::Io {
                path: final_path.clone(),
                source: e,
            })?;
        }

        Ok(merged)
    }

    /// Delete the entry for `path`, if any.
    pub fn remove(&self, path: &Path) {
        let entry = self.entry_path(path);
        if let Err(e) = fs::remove_file(&entry) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(entry = %entry.display(), error = %e, "failed to remove cache entry");
            }
        }
    }

    /// Delete entries whose audio file no longer appears in
    /// `known_paths`, plus any unreadable garbage and leftover
    /// temporaries. Returns the number of entries removed.
    pub fn sweep(&self, known_paths: &HashSet<PathBuf>) -> usize {
        let Ok(dir) = fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in dir.filter_map(Result::ok) {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("tmp") => {
                    // Leftover from an interrupted write.
                    if fs::remove_file(&path).is_ok() {
                        debug!(entry = %path.display(), "removed stale temporary");
                    }
                    continue;
                }
                Some("json") => {}
                _ => continue,
            }

            let keep = fs::read(&path)
                .ok()
                .and_then(|data| serde_json::from_slice::<StoredEntry>(&data).ok())
                .is_some_and(|stored| known_paths.contains(&stored.entry.identity.path));

            if !keep && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "cache sweep reclaimed entries");
        }
        removed
    }

    fn entry_path(&self, audio_path: &Path) -> PathBuf {
        let digest = Sha256::digest(audio_path.to_string_lossy().as_bytes());
        let hex: String = digest.iter().take(16).map(|b| format!("{b:02x}")).collect();
        self.root.join(format!("{hex}.json"))
    }
}

fn write_and_replace(tmp: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    fs::write(tmp, payload)?;
    fs::rename(tmp, target)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

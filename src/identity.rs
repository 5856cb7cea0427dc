//! File identity keys for the cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Content-change-sensitive key identifying one version of an audio file.
///
/// Two files are "the same" iff path, size and modification time all
/// match. Identities are probed fresh from the filesystem on every
/// access so a renamed or re-recorded file never aliases a stale cache
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AudioIdentity {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Modification time in milliseconds since the Unix epoch.
    /// Millisecond resolution matters for takes recorded seconds apart.
    pub mtime_ms: u64,
}

impl AudioIdentity {
    /// Probe the current identity of `path` from filesystem metadata.
    pub fn probe(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime_ms = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            mtime_ms,
        })
    }

    /// File name for progress display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn probe_reads_size_and_mtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("take.wav");
        fs::write(&path, b"0123456789").unwrap();

        let id = AudioIdentity::probe(&path).unwrap();
        assert_eq!(id.path, path);
        assert_eq!(id.size_bytes, 10);
        assert!(id.mtime_ms > 0);
    }

    #[test]
    fn probe_changes_when_file_is_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("take.wav");
        fs::write(&path, b"first").unwrap();
        let before = AudioIdentity::probe(&path).unwrap();

        fs::write(&path, b"second pass").unwrap();
        let after = AudioIdentity::probe(&path).unwrap();

        assert_ne!(before, after);
        assert_eq!(after.size_bytes, 11);
    }

    #[test]
    fn probe_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        assert!(AudioIdentity::probe(&dir.path().join("gone.wav")).is_err());
    }

    #[test]
    fn display_name_uses_file_name() {
        let id = AudioIdentity {
            path: PathBuf::from("/sessions/2024-03-01/take-04.wav"),
            size_bytes: 1,
            mtime_ms: 1,
        };
        assert_eq!(id.display_name(), "take-04.wav");
    }
}

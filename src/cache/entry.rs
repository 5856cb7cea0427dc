//! Cache entry schema.

use serde::{Deserialize, Serialize};

use crate::features::{SpectralFingerprint, WaveformPeaks};
use crate::identity::AudioIdentity;

/// Bump when the stored layout changes. Entries carrying any other
/// version are treated as absent on read instead of being misparsed.
pub const SCHEMA_VERSION: u32 = 1;

/// Stored products for one audio identity.
///
/// Entries are replaced, never mutated in place; copies handed to
/// callers are independent snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub identity: AudioIdentity,
    pub peaks: Option<WaveformPeaks>,
    pub fingerprint: Option<SpectralFingerprint>,
    pub created_at_ms: u64,
}

impl CacheEntry {
    /// Whether every product in `wanted` is present.
    pub fn has_products(&self, wanted: ProductSet) -> bool {
        (!wanted.peaks || self.peaks.is_some())
            && (!wanted.fingerprint || self.fingerprint.is_some())
    }
}

/// Which derived products a caller wants generated or present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductSet {
    pub peaks: bool,
    pub fingerprint: bool,
}

impl ProductSet {
    pub const ALL: Self = Self {
        peaks: true,
        fingerprint: true,
    };

    pub fn peaks_only() -> Self {
        Self {
            peaks: true,
            fingerprint: false,
        }
    }

    pub fn fingerprint_only() -> Self {
        Self {
            peaks: false,
            fingerprint: true,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            peaks: self.peaks || other.peaks,
            fingerprint: self.fingerprint || other.fingerprint,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.peaks && !self.fingerprint
    }
}

/// On-disk wrapper adding the schema version tag.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StoredEntry {
    pub schema_version: u32,
    #[serde(flatten)]
    pub entry: CacheEntry,
}

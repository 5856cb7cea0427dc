use std::time::Duration;

use crate::identity::AudioIdentity;

/// One recording discovered in a session folder.
#[derive(Debug, Clone)]
pub struct Recording {
    pub identity: AudioIdentity,
    /// Tag title when present, file stem otherwise.
    pub title: String,
    /// Tagged duration, when the container reports one.
    pub duration: Option<Duration>,
}

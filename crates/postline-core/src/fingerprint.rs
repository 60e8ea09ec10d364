//! Folder state fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Short digest of a folder's state, used for change detection and as a
/// cache-key component.
///
/// Only the message count and the next UID take part. The unseen count is
/// fixed to zero, so marking messages read never changes the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderFingerprint(String);

impl FolderFingerprint {
    /// Computes the fingerprint of a folder state.
    #[must_use]
    pub fn compute(folder: &str, message_count: u32, uid_next: u32) -> Self {
        Self::from_status(folder, message_count, 0, uid_next)
    }

    /// Computes the fingerprint from a full status; `unseen` is ignored.
    #[must_use]
    pub fn from_status(folder: &str, message_count: u32, _unseen: u32, uid_next: u32) -> Self {
        let input = format!("{folder}-{message_count}-0-{uid_next}");
        Self(format!("{:x}", Sha256::digest(input.as_bytes())))
    }

    /// Lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

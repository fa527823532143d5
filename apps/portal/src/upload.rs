//! CV upload validation.
//!
//! Pure checks of a candidate file against the tenant's [`FilePolicy`].
//! Both the file-picker and the drag-and-drop affordance funnel through
//! [`validate`] so the two paths can never diverge on size or type rules.

use bytes::Bytes;
use thiserror::Error;

use crate::config::FilePolicy;

/// A file the candidate selected or dropped, as reported by the platform.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    /// MIME type as declared by the platform, not derived from the extension.
    pub mime_type: String,
    pub bytes: Bytes,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        FileCandidate {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Preview rendering: size in MB with two decimals, e.g. "3.00".
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.bytes.len() as f64 / (1024.0 * 1024.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("unsupported file type '{found}'; allowed types: {allowed}")]
    UnsupportedType { found: String, allowed: String },

    #[error("file is too large ({size_mb} MB); the limit is {limit_mb} MB")]
    TooLarge { size_mb: String, limit_mb: u64 },
}

/// Checks `candidate` against `policy`. Synchronous, side-effect free, and
/// safe to call repeatedly on the same input — the candidate is only
/// borrowed, never consumed.
pub fn validate(candidate: &FileCandidate, policy: &FilePolicy) -> Result<(), FileRejection> {
    if !policy.accepts(&candidate.mime_type) {
        return Err(FileRejection::UnsupportedType {
            found: candidate.mime_type.clone(),
            allowed: policy.accepted_types().join(", "),
        });
    }

    // Strictly greater than the ceiling; a zero-byte file of an accepted
    // type passes (no minimum-size policy).
    if candidate.size_bytes() > policy.max_bytes() {
        return Err(FileRejection::TooLarge {
            size_mb: candidate.size_mb(),
            limit_mb: policy.max_megabytes(),
        });
    }

    Ok(())
}

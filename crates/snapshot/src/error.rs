//! Error types for msm-snapshot.

use std::path::PathBuf;

use msm_estimate::EstimateError;

/// Error type for snapshot encoding and snapshot stores.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing a snapshot file failed.
    #[error("i/o error on {}: {reason}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Description of the underlying failure.
        reason: String,
    },

    /// The snapshot text is not valid JSON for the expected layout.
    #[error("malformed snapshot: {reason}")]
    Malformed {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The snapshot was written by a newer (or unknown) format version.
    #[error("unsupported snapshot format version {found} (supported: 1..={supported})")]
    UnsupportedVersion {
        /// Version tag found in the snapshot.
        found: u32,
        /// Newest version this build understands.
        supported: u32,
    },

    /// No snapshot is stored under the name.
    #[error("snapshot '{name}' not found")]
    NotFound {
        /// Requested name.
        name: String,
    },

    /// Snapshot names must be non-empty and use only `[A-Za-z0-9._-]`.
    #[error("invalid snapshot name '{name}'")]
    InvalidName {
        /// Rejected name.
        name: String,
    },

    /// Rebuilding the model from the stored parts failed.
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Malformed {
            reason: e.to_string(),
        }
    }
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, e: &std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.into(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_version() {
        let err = SnapshotError::UnsupportedVersion {
            found: 7,
            supported: 2,
        };
        assert_eq!(
            err.to_string(),
            "unsupported snapshot format version 7 (supported: 1..=2)"
        );
    }

    #[test]
    fn display_io() {
        let err = SnapshotError::Io {
            path: PathBuf::from("/tmp/store/a.json"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "i/o error on /tmp/store/a.json: permission denied"
        );
    }

    #[test]
    fn json_errors_become_malformed() {
        let e = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(
            SnapshotError::from(e),
            SnapshotError::Malformed { .. }
        ));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SnapshotError>();
    }
}

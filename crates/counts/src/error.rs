//! Error types for the msm-counts crate.

/// Error type for all fallible operations in the msm-counts crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CountError {
    /// Returned when no trajectories are supplied.
    #[error("no trajectories supplied")]
    EmptyInput,

    /// Returned when the lag is zero.
    #[error("invalid lag: {lag} (must be >= 1)")]
    InvalidLag {
        /// The rejected lag.
        lag: usize,
    },

    /// Returned when no trajectory is longer than the lag.
    #[error("insufficient data: longest trajectory has {longest} frames, need more than lag {lag}")]
    InsufficientData {
        /// Requested lag.
        lag: usize,
        /// Length of the longest trajectory.
        longest: usize,
    },

    /// Returned when the largest connected set is too small to estimate a model.
    #[error("disconnected model: largest connected set has {size} state(s), need at least {min}")]
    DisconnectedModel {
        /// Size of the largest connected set found.
        size: usize,
        /// Minimum number of states required.
        min: usize,
    },

    /// Returned when a caller-supplied state subset is unusable.
    #[error("invalid state subset: {reason}")]
    InvalidSubset {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a count matrix names a column outside its state space.
    #[error("count matrix entry ({row}, {col}) is outside a {n_states}-state space")]
    ColumnOutOfRange {
        /// Row of the offending entry.
        row: usize,
        /// Offending column.
        col: usize,
        /// Number of states (rows).
        n_states: usize,
    },

    /// Returned when the largest label implies a state space above
    /// [`MAX_STATES`](crate::MAX_STATES).
    #[error("state label {label} exceeds the supported state space of {max} states")]
    TooManyStates {
        /// Largest label found.
        label: usize,
        /// Supported number of states.
        max: usize,
    },

    /// Returned when a dense count matrix is not square.
    #[error("count matrix row {row} has {got} entries, expected {expected}")]
    NotSquare {
        /// Offending row.
        row: usize,
        /// Expected row length.
        expected: usize,
        /// Actual row length.
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_column_out_of_range() {
        let e = CountError::ColumnOutOfRange {
            row: 0,
            col: 7,
            n_states: 2,
        };
        assert_eq!(
            e.to_string(),
            "count matrix entry (0, 7) is outside a 2-state space"
        );
    }

    #[test]
    fn error_invalid_lag() {
        let e = CountError::InvalidLag { lag: 0 };
        assert_eq!(e.to_string(), "invalid lag: 0 (must be >= 1)");
    }

    #[test]
    fn error_insufficient_data() {
        let e = CountError::InsufficientData {
            lag: 10,
            longest: 8,
        };
        assert_eq!(
            e.to_string(),
            "insufficient data: longest trajectory has 8 frames, need more than lag 10"
        );
    }

    #[test]
    fn error_disconnected_model() {
        let e = CountError::DisconnectedModel { size: 1, min: 2 };
        assert_eq!(
            e.to_string(),
            "disconnected model: largest connected set has 1 state(s), need at least 2"
        );
    }

    #[test]
    fn error_not_square() {
        let e = CountError::NotSquare {
            row: 1,
            expected: 3,
            got: 2,
        };
        assert_eq!(e.to_string(), "count matrix row 1 has 2 entries, expected 3");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<CountError>();
    }
}

//! Unified error handling for the track-matcher library.
//!
//! Degenerate inputs (empty tracks, queries outside an index) are not errors:
//! they produce empty or sentinel results. This type is reserved for caller
//! contract violations such as non-finite coordinates or invalid configuration.

use std::fmt;

/// Unified error type for track-matcher operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Track has insufficient points for processing
    InsufficientPoints {
        track_id: String,
        point_count: usize,
        minimum_required: usize,
    },
    /// Track has invalid (non-finite or out of range) coordinates
    InvalidCoordinates { track_id: String, message: String },
    /// A configuration or call parameter is out of range
    InvalidParameter {
        name: &'static str,
        message: String,
    },
    /// Two lists that must be parallel have different lengths
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Track id is not known to the engine
    UnknownTrack { track_id: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::InsufficientPoints {
                track_id,
                point_count,
                minimum_required,
            } => {
                write!(
                    f,
                    "Track '{}' has {} points, minimum {} required",
                    track_id, point_count, minimum_required
                )
            }
            TrackError::InvalidCoordinates { track_id, message } => {
                write!(f, "Track '{}' has invalid coordinates: {}", track_id, message)
            }
            TrackError::InvalidParameter { name, message } => {
                write!(f, "Invalid parameter '{}': {}", name, message)
            }
            TrackError::LengthMismatch {
                what,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Length mismatch for {}: expected {}, found {}",
                    what, expected, found
                )
            }
            TrackError::UnknownTrack { track_id } => {
                write!(f, "Unknown track '{}'", track_id)
            }
            TrackError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TrackError {}

/// Result type alias for track-matcher operations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Extension trait for converting Option to TrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(
        self,
        track_id: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T>;

    /// Convert Option to Result with unknown track error.
    fn ok_or_unknown_track(self, track_id: &str) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        track_id: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T> {
        self.ok_or_else(|| TrackError::InsufficientPoints {
            track_id: track_id.to_string(),
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_unknown_track(self, track_id: &str) -> Result<T> {
        self.ok_or_else(|| TrackError::UnknownTrack {
            track_id: track_id.to_string(),
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackError::Internal {
            message: message.to_string(),
        })
    }
}

/// Reject a parameter unless it is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackError::InvalidParameter {
            name,
            message: format!("must be a positive finite number, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackError::InsufficientPoints {
            track_id: "track-1".to_string(),
            point_count: 1,
            minimum_required: 2,
        };
        assert!(err.to_string().contains("track-1"));
        assert!(err.to_string().contains("1 points"));

        let err = TrackError::LengthMismatch {
            what: "weights",
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Length mismatch for weights: expected 3, found 2"
        );
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_insufficient_points("test", 0, 2);
        assert!(matches!(result, Err(TrackError::InsufficientPoints { .. })));

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_unknown_track("missing"),
            Err(TrackError::UnknownTrack { .. })
        ));
        assert_eq!(Some(3).ok_or_internal("unused"), Ok(3));
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("eps", 1.0).is_ok());
        assert!(ensure_positive("eps", 0.0).is_err());
        assert!(ensure_positive("eps", f64::NAN).is_err());
    }
}

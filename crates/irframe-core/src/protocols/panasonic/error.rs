use std::time::Duration;

use thiserror::Error;

/// Errors returned by Panasonic frame decoding.
///
/// Every variant names the offending edge so a misread frame can be
/// diagnosed from its dump; timing variants carry the observed duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame has {count} edges; complete mark/space pairs need an even count")]
    OddEdgeCount { count: usize },
    #[error("frame has only {count} edges; a header and at least one bit pair are required")]
    TruncatedFrame { count: usize },
    #[error("header edge {index} has the wrong level for a Panasonic header")]
    HeaderLevelMismatch { index: usize },
    #[error("header edge {index} lasted {duration:?}, outside the Panasonic header window")]
    HeaderTimingMismatch { index: usize, duration: Duration },
    #[error("edge {index} has the wrong level for its mark/space position")]
    BitLevelMismatch { index: usize },
    #[error("edge {index} lasted {duration:?}, matching neither the zero nor the one window")]
    BitTimingMismatch { index: usize, duration: Duration },
}

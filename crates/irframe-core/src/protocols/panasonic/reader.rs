use std::ops::RangeInclusive;
use std::time::Duration;

use super::error::DecodeError;
use super::layout;
use crate::edge::Edge;

/// Check whether a duration falls inside an inclusive microsecond window.
pub(crate) fn within(window: &RangeInclusive<u64>, duration: Duration) -> bool {
    let us = duration.as_micros();
    us >= u128::from(*window.start()) && us <= u128::from(*window.end())
}

/// Validate the header mark: active level inside the header-mark window.
pub fn check_header_mark(edge: &Edge, index: usize) -> Result<(), DecodeError> {
    if !edge.level {
        return Err(DecodeError::HeaderLevelMismatch { index });
    }
    if !within(&layout::HEADER_MARK_WINDOW_US, edge.duration) {
        return Err(DecodeError::HeaderTimingMismatch {
            index,
            duration: edge.duration,
        });
    }
    Ok(())
}

/// Validate the header space: inactive level inside the header-space window.
pub fn check_header_space(edge: &Edge, index: usize) -> Result<(), DecodeError> {
    if edge.level {
        return Err(DecodeError::HeaderLevelMismatch { index });
    }
    if !within(&layout::HEADER_SPACE_WINDOW_US, edge.duration) {
        return Err(DecodeError::HeaderTimingMismatch {
            index,
            duration: edge.duration,
        });
    }
    Ok(())
}

/// Validate a bit mark: active level inside the bit-mark window.
pub fn check_bit_mark(edge: &Edge, index: usize) -> Result<(), DecodeError> {
    if !edge.level {
        return Err(DecodeError::BitLevelMismatch { index });
    }
    if !within(&layout::BIT_MARK_WINDOW_US, edge.duration) {
        return Err(DecodeError::BitTimingMismatch {
            index,
            duration: edge.duration,
        });
    }
    Ok(())
}

/// Classify a bit space into its bit value by window membership.
///
/// A space matching neither window is still accepted as a zero when it is
/// the final payload edge (`last`): the quiet period after the last bit
/// tends to truncate its sample.
pub fn classify_bit_space(edge: &Edge, index: usize, last: bool) -> Result<bool, DecodeError> {
    if edge.level {
        return Err(DecodeError::BitLevelMismatch { index });
    }
    if within(&layout::ONE_SPACE_WINDOW_US, edge.duration) {
        return Ok(true);
    }
    if within(&layout::ZERO_SPACE_WINDOW_US, edge.duration) {
        return Ok(false);
    }
    if last {
        return Ok(false);
    }
    Err(DecodeError::BitTimingMismatch {
        index,
        duration: edge.duration,
    })
}

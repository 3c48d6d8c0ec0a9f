//! Panasonic pulse-distance decoding.
//!
//! A transmission is a fixed header mark/space pair followed by one
//! mark/space pair per data bit; the space duration carries the bit value.
//! The parser validates levels and timing windows edge by edge and
//! accumulates bits least significant first, either over a complete frame
//! (`decode`) or incrementally over a growing buffer (`DecoderCursor`).
//!
//! Timing windows live in `layout`, level/window conventions in `reader`,
//! so the parser stays a plain state machine. Errors carry the offending
//! edge index and observed duration.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::DecodeError;
pub use parser::{DecoderCursor, Step, decode, encode};

//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: nominal durations and timing windows (source of truth)
//! - `reader`: edge access and protocol conventions
//! - `parser`: domain-level decoding (no direct window arithmetic)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O or clock access; the capture layer
//! handles sampling and frame accumulation.

pub mod panasonic;

//! Core pipeline for decoding Panasonic infrared remote transmissions
//! from raw GPIO level samples.
//!
//! Two stages carry all the nontrivial logic: [`EdgeDetector`] turns
//! periodic boolean pin samples into timed level transitions, framing
//! complete transmissions with an inactivity timeout, and the Panasonic
//! decoder in [`protocols::panasonic`] validates one frame's mark/space
//! timing into a 48-bit code. The [`capture`] module wires the stages
//! together: a sampling thread, a bounded frame queue, and a decode
//! consumer. Hardware access stays behind the [`PinSource`] trait, so the
//! whole pipeline runs against scripted levels in tests.
//!
//! Invariants:
//! - Edge detection never fails; malformed timing is a decode-stage error.
//! - Frames reach the consumer in capture order; the sampler stalls on a
//!   full queue rather than drop a completed frame.
//! - The first transition after creation or after a tail edge is discarded
//!   to re-synchronize, since its preceding duration is unknown.
//!
//! # Examples
//! ```
//! use irframe_core::protocols::panasonic::{decode, encode};
//!
//! let frame = encode(0x0BD0_CC0C_0B02, 48);
//! assert_eq!(decode(frame.as_slice())?, 0x0BD0_CC0C_0B02);
//! # Ok::<(), irframe_core::protocols::panasonic::DecodeError>(())
//! ```

pub mod capture;
pub mod edge;
pub mod protocols;
pub mod source;

pub use capture::{
    CaptureConfig, CaptureError, CaptureHandle, DEFAULT_CADENCE, DEFAULT_QUEUE_DEPTH,
    FrameOutcome, decode_stream,
};
pub use edge::{DEFAULT_FRAME_CAPACITY, DEFAULT_TAIL_TIMEOUT, Edge, EdgeDetector, Edges};
pub use source::PinSource;

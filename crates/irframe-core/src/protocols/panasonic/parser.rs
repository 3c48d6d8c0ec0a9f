use std::time::Duration;

use super::error::DecodeError;
use super::layout;
use super::reader;
use crate::edge::{Edge, Edges};

/// Progress reported by one incremental decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The header mark/space pair validated; no bit is produced.
    Header,
    /// One decoded bit value.
    Bit(bool),
    /// All edges supplied so far have been consumed. The caller may call
    /// again once more edges arrive, or treat this as end-of-frame.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    AwaitingHeaderMark,
    AwaitingHeaderSpace,
    AwaitingBitMark,
    AwaitingBitSpace,
    Failed(DecodeError),
}

/// Incremental decoder over a possibly-still-growing edge buffer.
///
/// The cursor owns only its position and state, never the edges, so the
/// caller can keep handing it the same buffer as new edges arrive. The
/// index advances monotonically; a validation failure is terminal and is
/// returned again on every later call. Exhausting the buffer is not
/// terminal: a later call with more edges resumes where the cursor left
/// off.
///
/// # Examples
/// ```
/// use irframe_core::protocols::panasonic::{DecoderCursor, Step, encode};
///
/// let frame = encode(0b101, 3);
/// let mut cursor = DecoderCursor::new();
/// assert_eq!(cursor.next(frame.as_slice(), true)?, Step::Header);
/// assert_eq!(cursor.next(frame.as_slice(), true)?, Step::Bit(true));
/// assert_eq!(cursor.next(frame.as_slice(), true)?, Step::Bit(false));
/// assert_eq!(cursor.next(frame.as_slice(), true)?, Step::Bit(true));
/// assert_eq!(cursor.next(frame.as_slice(), true)?, Step::End);
/// assert!(cursor.is_done());
/// # Ok::<(), irframe_core::protocols::panasonic::DecodeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DecoderCursor {
    index: usize,
    bits: u32,
    complete: bool,
    state: State,
}

impl Default for DecoderCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderCursor {
    pub fn new() -> Self {
        Self {
            index: 0,
            bits: 0,
            complete: false,
            state: State::AwaitingHeaderMark,
        }
    }

    /// Number of bits decoded so far.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// True when the most recent [`DecoderCursor::next`] call returned
    /// [`Step::End`] at a mark/space pair boundary after at least one bit:
    /// everything supplied decoded cleanly and completely. Not terminal —
    /// a later call with more edges resumes the frame, and a dangling
    /// unpaired mark never reaches this state.
    pub fn is_done(&self) -> bool {
        self.complete
    }

    /// Advance by one step: the header pair on the first call, then one
    /// mark/space pair per call, yielding one bit each.
    ///
    /// `end_of_frame` declares that `edges` is the complete frame. While
    /// it is `false` the buffer may still grow, so exhaustion is
    /// provisional ([`Step::End`] now, more steps once more edges arrive)
    /// and a buffer-final space matching neither bit window is left
    /// unconsumed rather than guessed at. The lenient final-space zero is
    /// only ever applied on an `end_of_frame` call.
    pub fn next(&mut self, edges: &[Edge], end_of_frame: bool) -> Result<Step, DecodeError> {
        self.complete = false;
        loop {
            match self.state {
                State::Failed(ref err) => return Err(err.clone()),
                State::AwaitingHeaderMark => {
                    let Some(edge) = edges.get(self.index) else {
                        return self.end(false);
                    };
                    self.check(reader::check_header_mark(edge, self.index))?;
                    self.index += 1;
                    self.state = State::AwaitingHeaderSpace;
                }
                State::AwaitingHeaderSpace => {
                    let Some(edge) = edges.get(self.index) else {
                        return self.end(false);
                    };
                    self.check(reader::check_header_space(edge, self.index))?;
                    self.index += 1;
                    self.state = State::AwaitingBitMark;
                    return Ok(Step::Header);
                }
                State::AwaitingBitMark => {
                    let Some(edge) = edges.get(self.index) else {
                        return self.end(self.bits > 0);
                    };
                    self.check(reader::check_bit_mark(edge, self.index))?;
                    self.index += 1;
                    self.state = State::AwaitingBitSpace;
                }
                State::AwaitingBitSpace => {
                    let Some(edge) = edges.get(self.index) else {
                        return self.end(false);
                    };
                    let last = self.index + 1 == edges.len();
                    if last && !end_of_frame {
                        // The buffer may still grow, so an out-of-window
                        // space here cannot be the final lenient zero yet;
                        // leave it for a later call to settle.
                        return match reader::classify_bit_space(edge, self.index, false) {
                            Ok(bit) => Ok(self.emit_bit(bit)),
                            Err(_) => self.end(false),
                        };
                    }
                    let bit = self.check(reader::classify_bit_space(edge, self.index, last))?;
                    return Ok(self.emit_bit(bit));
                }
            }
        }
    }

    fn emit_bit(&mut self, bit: bool) -> Step {
        self.index += 1;
        self.bits += 1;
        self.state = State::AwaitingBitMark;
        Step::Bit(bit)
    }

    fn end(&mut self, complete: bool) -> Result<Step, DecodeError> {
        self.complete = complete;
        Ok(Step::End)
    }

    fn check<T>(&mut self, result: Result<T, DecodeError>) -> Result<T, DecodeError> {
        if let Err(err) = &result {
            self.state = State::Failed(err.clone());
        }
        result
    }
}

/// Decode one complete frame (tail edge excluded) into its code.
///
/// Bit `i` of the frame sets bit `i` of the result; no inversion or byte
/// reordering is applied. A payload without a header and at least one
/// complete bit pair is rejected as [`DecodeError::TruncatedFrame`].
///
/// # Examples
/// ```
/// use irframe_core::protocols::panasonic::{decode, encode};
///
/// let frame = encode(0x0BD0_CC0C_0B02, 48);
/// assert_eq!(decode(frame.as_slice())?, 0x0BD0_CC0C_0B02);
/// # Ok::<(), irframe_core::protocols::panasonic::DecodeError>(())
/// ```
pub fn decode(edges: &[Edge]) -> Result<u64, DecodeError> {
    if edges.len() % 2 != 0 {
        return Err(DecodeError::OddEdgeCount { count: edges.len() });
    }
    let mut cursor = DecoderCursor::new();
    let mut code = 0u64;
    let mut position = 0u32;
    loop {
        match cursor.next(edges, true)? {
            Step::Header => {}
            Step::Bit(bit) => {
                // Panasonic carries 48 bits; anything past the container
                // cannot occur in a frame the sampler buffered.
                if position < u64::BITS {
                    code |= u64::from(bit) << position;
                }
                position += 1;
            }
            Step::End => break,
        }
    }
    if !cursor.is_done() {
        // A header alone carries no bits; that is a runt frame, not
        // code zero.
        return Err(DecodeError::TruncatedFrame { count: edges.len() });
    }
    Ok(code)
}

/// Build the edge sequence for `code` at the nominal durations: the header
/// pair, then one mark/space pair per bit, least significant bit first.
///
/// The counterpart of [`decode`]; transmit paths and receiver tests use it
/// to produce well-formed frames.
pub fn encode(code: u64, bits: u32) -> Edges {
    let mut edges = Edges::with_capacity(2 + 2 * bits as usize);
    edges.push(mark(layout::HEADER_MARK_NOMINAL_US));
    edges.push(space(layout::HEADER_SPACE_NOMINAL_US));
    for position in 0..bits {
        edges.push(mark(layout::BIT_MARK_NOMINAL_US));
        let us = if code >> position & 1 == 1 {
            layout::ONE_SPACE_NOMINAL_US
        } else {
            layout::ZERO_SPACE_NOMINAL_US
        };
        edges.push(space(us));
    }
    edges
}

fn mark(us: u64) -> Edge {
    Edge {
        level: true,
        duration: Duration::from_micros(us),
        tail: false,
    }
}

fn space(us: u64) -> Edge {
    Edge {
        level: false,
        duration: Duration::from_micros(us),
        tail: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: u64 = 0x0BD0_CC0C_0B02;

    /// Drain a cursor over a complete frame, collecting bits LSB-first.
    fn drain(edges: &[Edge]) -> Result<(u64, u32), DecodeError> {
        let mut cursor = DecoderCursor::new();
        let mut code = 0u64;
        let mut position = 0u32;
        loop {
            match cursor.next(edges, true)? {
                Step::Header => {}
                Step::Bit(bit) => {
                    code |= u64::from(bit) << position;
                    position += 1;
                }
                Step::End => return Ok((code, position)),
            }
        }
    }

    #[test]
    fn round_trips_a_48_bit_code() {
        let frame = encode(CODE, layout::CODE_BITS);
        assert_eq!(frame.len(), 98);
        assert_eq!(decode(frame.as_slice()), Ok(CODE));
    }

    #[test]
    fn round_trips_boundary_codes() {
        for code in [0u64, 1, (1 << 48) - 1, 0x8000_0000_0001] {
            let frame = encode(code, layout::CODE_BITS);
            assert_eq!(decode(frame.as_slice()), Ok(code), "code {code:#x}");
        }
    }

    #[test]
    fn batch_and_incremental_agree() {
        let frame = encode(CODE, layout::CODE_BITS);
        let (code, bits) = drain(frame.as_slice()).expect("incremental decode");
        assert_eq!(code, CODE);
        assert_eq!(bits, layout::CODE_BITS);
        assert_eq!(decode(frame.as_slice()), Ok(code));
    }

    #[test]
    fn cursor_decodes_a_growing_buffer() {
        let frame = encode(0b110, 3);
        let edges = frame.as_slice();
        let mut cursor = DecoderCursor::new();

        // Only the header available: consumed, then exhausted.
        assert_eq!(cursor.next(&edges[..2], false), Ok(Step::Header));
        assert_eq!(cursor.next(&edges[..2], false), Ok(Step::End));
        assert!(!cursor.is_done());

        // One more pair arrives; a half pair keeps the cursor waiting.
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::Bit(false)));
        assert_eq!(cursor.next(&edges[..5], false), Ok(Step::End));

        assert_eq!(cursor.next(edges, true), Ok(Step::Bit(true)));
        assert_eq!(cursor.next(edges, true), Ok(Step::Bit(true)));
        assert_eq!(cursor.next(edges, true), Ok(Step::End));
        assert!(cursor.is_done());
        assert_eq!(cursor.bits(), 3);
    }

    #[test]
    fn cursor_resumes_after_end_at_a_pair_boundary() {
        let frame = encode(0b101, 3);
        let edges = frame.as_slice();
        let mut cursor = DecoderCursor::new();
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::Header));
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::Bit(true)));
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::End));
        // Clean so far, but not terminal: more edges resume the frame.
        assert!(cursor.is_done());
        assert_eq!(cursor.next(&edges[..6], false), Ok(Step::Bit(false)));
        assert_eq!(cursor.next(edges, true), Ok(Step::Bit(true)));
        assert_eq!(cursor.next(edges, true), Ok(Step::End));
        assert!(cursor.is_done());
        assert_eq!(cursor.bits(), 3);
    }

    #[test]
    fn prefix_final_space_is_not_classified_leniently() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[3].duration = Duration::from_micros(90);
        // Batch decode rejects the mid-frame space outright.
        assert!(matches!(
            decode(&edges),
            Err(DecodeError::BitTimingMismatch { index: 3, .. })
        ));
        // Streamed, the same space momentarily sits at the end of the
        // growing buffer; the cursor waits rather than guess, then fails
        // once later edges prove it mid-frame.
        let mut cursor = DecoderCursor::new();
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::Header));
        assert_eq!(cursor.next(&edges[..4], false), Ok(Step::End));
        assert!(!cursor.is_done());
        assert!(matches!(
            cursor.next(&edges[..6], false),
            Err(DecodeError::BitTimingMismatch { index: 3, .. })
        ));
    }

    #[test]
    fn odd_edge_count_is_rejected() {
        let mut frame = encode(CODE, layout::CODE_BITS);
        frame.push(mark(layout::BIT_MARK_NOMINAL_US));
        assert_eq!(
            decode(frame.as_slice()),
            Err(DecodeError::OddEdgeCount { count: 99 })
        );
        // Incrementally the dangling mark just never completes.
        let mut cursor = DecoderCursor::new();
        while cursor.next(frame.as_slice(), true) != Ok(Step::End) {}
        assert!(!cursor.is_done());
        assert_eq!(cursor.bits(), layout::CODE_BITS);
    }

    #[test]
    fn header_only_payload_is_rejected() {
        let frame = encode(CODE, layout::CODE_BITS);
        assert_eq!(
            decode(&frame.as_slice()[..2]),
            Err(DecodeError::TruncatedFrame { count: 2 })
        );
        assert_eq!(decode(&[]), Err(DecodeError::TruncatedFrame { count: 0 }));
    }

    #[test]
    fn header_mark_level_is_enforced() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[0].level = false;
        assert_eq!(
            decode(&edges),
            Err(DecodeError::HeaderLevelMismatch { index: 0 })
        );
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[1].level = true;
        assert_eq!(
            decode(&edges),
            Err(DecodeError::HeaderLevelMismatch { index: 1 })
        );
    }

    #[test]
    fn header_timing_is_enforced() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[0].duration = Duration::from_micros(900);
        assert_eq!(
            decode(&edges),
            Err(DecodeError::HeaderTimingMismatch {
                index: 0,
                duration: Duration::from_micros(900),
            })
        );
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[1].duration = Duration::from_micros(2626);
        assert_eq!(
            decode(&edges),
            Err(DecodeError::HeaderTimingMismatch {
                index: 1,
                duration: Duration::from_micros(2626),
            })
        );
    }

    #[test]
    fn bit_level_is_enforced() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[4].level = false;
        assert_eq!(decode(&edges), Err(DecodeError::BitLevelMismatch { index: 4 }));
    }

    #[test]
    fn mid_frame_space_outside_windows_fails() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[5].duration = Duration::from_micros(2000);
        assert_eq!(
            decode(&edges),
            Err(DecodeError::BitTimingMismatch {
                index: 5,
                duration: Duration::from_micros(2000),
            })
        );
    }

    #[test]
    fn truncated_final_space_reads_as_zero() {
        // The last bit of CODE is one; squash its space below both windows
        // and the frame decodes with that bit cleared.
        let code = CODE | 1 << 47;
        let frame = encode(code, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        let final_space = edges.len() - 1;
        edges[final_space].duration = Duration::from_micros(90);
        assert_eq!(decode(&edges), Ok(code & !(1 << 47)));
    }

    #[test]
    fn failed_cursor_stays_failed() {
        let frame = encode(CODE, layout::CODE_BITS);
        let mut edges: Vec<Edge> = frame.as_slice().to_vec();
        edges[2].duration = Duration::from_micros(5000);
        let mut cursor = DecoderCursor::new();
        assert_eq!(cursor.next(&edges, true), Ok(Step::Header));
        let err = cursor.next(&edges, true).unwrap_err();
        assert!(matches!(err, DecodeError::BitTimingMismatch { index: 2, .. }));
        // Terminal: the same error again, even with a fixed buffer.
        assert_eq!(cursor.next(frame.as_slice(), true), Err(err));
    }

    #[test]
    fn empty_buffer_reports_end_without_completing() {
        let mut cursor = DecoderCursor::new();
        assert_eq!(cursor.next(&[], true), Ok(Step::End));
        assert!(!cursor.is_done());
        assert_eq!(cursor.bits(), 0);
    }
}

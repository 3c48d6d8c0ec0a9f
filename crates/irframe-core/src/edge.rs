//! Edge detection over sampled pin levels.
//!
//! The detector turns a stream of instantaneous boolean samples into a
//! sparse stream of timed level transitions. A level held quietly for
//! longer than the configured timeout closes the frame with a tail edge;
//! after that the detector re-synchronizes, so the next observed
//! transition is discarded just like the first one after creation.

use std::fmt;
use std::ops::Index;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default quiet time after which a held level is treated as end of
/// transmission.
pub const DEFAULT_TAIL_TIMEOUT: Duration = Duration::from_millis(10);

/// Default frame buffer capacity: 64 bits as mark/space pairs, plus
/// headroom for the header and stray pulses.
pub const DEFAULT_FRAME_CAPACITY: usize = 128 + 32;

/// A single observed level segment.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use irframe_core::Edge;
///
/// let edge = Edge {
///     level: true,
///     duration: Duration::from_micros(502),
///     tail: false,
/// };
/// assert_eq!(edge.to_string(), "1, 502µs, false");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Level that was held for `duration` (`true` = active).
    pub level: bool,
    /// Wall-clock time the level was held before the observed change or
    /// timeout.
    pub duration: Duration,
    /// True when the segment was closed by the inactivity timeout rather
    /// than a genuine level change; marks end-of-frame. A tail edge
    /// reports the level that was being held when the timeout fired.
    pub tail: bool,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {:?}, {}", self.level as u8, self.duration, self.tail)
    }
}

/// An ordered sequence of edges; insertion order is chronological order.
///
/// A frame is the maximal run of edges up to and including a tail edge.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use irframe_core::{Edge, Edges};
///
/// let mut edges = Edges::new();
/// edges.push(Edge {
///     level: true,
///     duration: Duration::from_micros(3502),
///     tail: false,
/// });
/// assert_eq!(edges.levels(), vec![true]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edges(Vec<Edge>);

impl Edges {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, edge: Edge) {
        self.0.push(edge);
    }

    pub fn pop(&mut self) -> Option<Edge> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Edge] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.0.iter()
    }

    /// Levels of the edges, in order.
    pub fn levels(&self) -> Vec<bool> {
        self.0.iter().map(|edge| edge.level).collect()
    }

    /// Data edges of a frame: everything ahead of a trailing tail edge.
    ///
    /// This is the slice decoders consume; the tail only marks the frame
    /// boundary.
    pub fn payload(&self) -> &[Edge] {
        match self.0.last() {
            Some(edge) if edge.tail => &self.0[..self.0.len() - 1],
            _ => &self.0,
        }
    }
}

impl From<Vec<Edge>> for Edges {
    fn from(edges: Vec<Edge>) -> Self {
        Self(edges)
    }
}

impl Index<usize> for Edges {
    type Output = Edge;

    fn index(&self, index: usize) -> &Edge {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a Edges {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Edges {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Edges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, edge) in self.0.iter().enumerate() {
            writeln!(f, "{index}, {edge}")?;
        }
        writeln!(f, "{} edges", self.0.len())
    }
}

/// Stateful sampler-to-edge converter.
///
/// Feed one boolean level observation per sampling iteration through
/// [`EdgeDetector::observe`]; at most one [`Edge`] comes back per sample.
/// Detection never fails: malformed timing is a decode-stage concern.
///
/// # Examples
/// ```
/// use std::time::{Duration, Instant};
///
/// use irframe_core::EdgeDetector;
///
/// let mut detector = EdgeDetector::new(Duration::from_millis(10));
/// let start = Instant::now();
/// // The first observed transition only establishes synchronization.
/// assert!(detector.observe(true, start).is_none());
/// let edge = detector
///     .observe(false, start + Duration::from_micros(3502))
///     .unwrap();
/// assert!(edge.level);
/// assert_eq!(edge.duration, Duration::from_micros(3502));
/// ```
#[derive(Debug)]
pub struct EdgeDetector {
    timeout: Duration,
    previous: bool,
    last_change: Instant,
    synchronizing: bool,
}

impl EdgeDetector {
    /// Create a detector with the given inactivity timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            previous: false,
            last_change: Instant::now(),
            synchronizing: true,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Consume one level sample taken at `now`.
    ///
    /// Emits an edge when the level changed, or a tail edge when the held
    /// level outlived the timeout. While synchronizing (at startup and
    /// after every tail) the first transition is discarded: the duration
    /// preceding it is unknown and would corrupt timing.
    pub fn observe(&mut self, level: bool, now: Instant) -> Option<Edge> {
        let elapsed = now.duration_since(self.last_change);

        if level != self.previous {
            let emitted = if self.synchronizing {
                self.synchronizing = false;
                None
            } else {
                Some(Edge {
                    level: self.previous,
                    duration: elapsed,
                    tail: false,
                })
            };
            self.previous = level;
            self.last_change = now;
            return emitted;
        }

        if !self.synchronizing && elapsed > self.timeout {
            self.last_change = now;
            self.synchronizing = true;
            return Some(Edge {
                level: self.previous,
                duration: elapsed,
                tail: true,
            });
        }

        None
    }
}

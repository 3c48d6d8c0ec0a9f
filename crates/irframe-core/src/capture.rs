//! Capture pipeline: sampling thread, frame queue, decode consumer.
//!
//! A dedicated thread polls the pin at a fixed cadence and runs every
//! sample through the edge detector. Completed frames (tail edge seen,
//! enough data edges to be worth decoding) go into a bounded queue; if the
//! consumer lags, the sampler stalls on the queue rather than drop a frame.
//! The consumer decodes frames in arrival order, so delivery order is the
//! capture order regardless of per-frame decode time.
//!
//! Timeouts are wall-clock comparisons made inside `observe`; there is no
//! timer thread. Correctness needs the cadence to stay small against the
//! shortest protocol window, which is a configuration concern.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

use crate::edge::{DEFAULT_FRAME_CAPACITY, DEFAULT_TAIL_TIMEOUT, EdgeDetector, Edges};
use crate::protocols::panasonic::{self, DecodeError};
use crate::source::PinSource;

/// Default pin polling cadence.
pub const DEFAULT_CADENCE: Duration = Duration::from_micros(20);
/// Default hand-off queue depth, sized to absorb bursts of complete frames
/// while the consumer is momentarily busy.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;
/// Frames with fewer data edges than a header, one bit pair, and the
/// closing mark are idle noise and never reach the queue.
const MIN_DATA_EDGES: usize = 5;

/// Capture pipeline configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Pin polling interval. Undersampling silently collapses short
    /// pulses, so keep this well under the shortest timing window.
    pub cadence: Duration,
    /// Detector inactivity timeout bounding frames. Larger values
    /// tolerate longer intra-frame pauses but delay frame completion.
    pub timeout: Duration,
    /// Frame queue depth between sampler and consumer.
    pub queue_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            timeout: DEFAULT_TAIL_TIMEOUT,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start sampler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to a running capture; owns the sampling thread.
///
/// Dropping the handle cancels the capture: the sampler notices the flag
/// on its next iteration, closes the queue, and the consumer sees
/// end-of-stream after draining.
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Start sampling `pin` on a dedicated thread. Returns the handle and
    /// the frame receiver; frames arrive in capture order.
    pub fn spawn<P>(
        pin: P,
        config: CaptureConfig,
    ) -> Result<(CaptureHandle, Receiver<Edges>), CaptureError>
    where
        P: PinSource + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (frames, receiver) = sync_channel(config.queue_depth.max(1));
        let flag = Arc::clone(&stop);
        let sampler = thread::Builder::new()
            .name("irframe-sampler".to_string())
            .spawn(move || sample_loop(pin, &config, &frames, &flag))?;
        Ok((
            CaptureHandle {
                stop,
                sampler: Some(sampler),
            },
            receiver,
        ))
    }

    /// Stop sampling and close the frame queue. Frames already queued stay
    /// readable until the receiver drains them.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(sampler) = self.sampler.take() {
            let _ = sampler.join();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sample_loop<P: PinSource>(
    mut pin: P,
    config: &CaptureConfig,
    frames: &SyncSender<Edges>,
    stop: &AtomicBool,
) {
    let mut detector = EdgeDetector::new(config.timeout);
    let mut frame = Edges::with_capacity(DEFAULT_FRAME_CAPACITY);
    while !stop.load(Ordering::Relaxed) {
        let level = pin.is_active();
        if let Some(edge) = detector.observe(level, Instant::now()) {
            if edge.tail {
                let mut complete =
                    std::mem::replace(&mut frame, Edges::with_capacity(DEFAULT_FRAME_CAPACITY));
                if complete.len() >= MIN_DATA_EDGES {
                    // The transmission's closing mark has no bounded quiet
                    // side (it merged into the tail), so it is dropped to
                    // leave the even mark/space payload.
                    complete.pop();
                    complete.push(edge);
                    if !enqueue(frames, complete, stop, config.cadence) {
                        break;
                    }
                }
            } else {
                frame.push(edge);
            }
        }
        thread::sleep(config.cadence);
    }
}

/// Queue a frame without dropping it: retry while the queue is full,
/// giving up only on stop or a gone receiver. A plain blocking send would
/// pin the sampler here with no way to observe the stop flag.
fn enqueue(frames: &SyncSender<Edges>, mut frame: Edges, stop: &AtomicBool, cadence: Duration) -> bool {
    loop {
        match frames.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(returned)) => {
                if stop.load(Ordering::Relaxed) {
                    return false;
                }
                frame = returned;
                thread::sleep(cadence);
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

/// Outcome of decoding one captured frame.
#[derive(Debug)]
pub struct FrameOutcome {
    /// The captured frame, tail edge included.
    pub frame: Edges,
    /// Decoded code, or why the frame was rejected.
    pub result: Result<u64, DecodeError>,
}

/// Decode frames as they arrive, in capture order.
///
/// One outcome per frame; a decode error terminates that frame only. The
/// iterator ends when the capture is stopped and the queue drained.
///
/// # Examples
/// ```no_run
/// use irframe_core::{CaptureConfig, CaptureHandle, decode_stream};
///
/// let pin = || false; // real captures read GPIO here
/// let (handle, frames) = CaptureHandle::spawn(pin, CaptureConfig::default())?;
/// for outcome in decode_stream(frames) {
///     match outcome.result {
///         Ok(code) => println!("{code:#014x}"),
///         Err(err) => eprintln!("undecodable frame: {err}"),
///     }
/// }
/// handle.stop();
/// # Ok::<(), irframe_core::CaptureError>(())
/// ```
pub fn decode_stream(frames: Receiver<Edges>) -> impl Iterator<Item = FrameOutcome> {
    frames.into_iter().map(|frame| {
        let result = panasonic::decode(frame.payload());
        match &result {
            Ok(code) => debug!("frame of {} edges decoded to {code:#014x}", frame.len()),
            Err(err) => warn!("frame of {} edges rejected: {err}", frame.len()),
        }
        FrameOutcome { frame, result }
    })
}

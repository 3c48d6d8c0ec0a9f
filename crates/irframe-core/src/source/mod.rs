//! Pin capabilities feeding the capture pipeline.
//!
//! The sampler only needs an instantaneous active/inactive answer per
//! iteration; opening and configuring real GPIO lines is the caller's
//! concern (the CLI wires sysfs GPIO on Linux). Keeping hardware behind
//! this trait keeps the whole pipeline runnable against scripted levels.

/// Instantaneous level of the monitored line.
///
/// `true` means active. IR demodulators typically idle high and pull the
/// line low during a mark, so an implementation over raw GPIO usually
/// answers `level == low`.
pub trait PinSource {
    /// Sample the line. Called once per sampling iteration; must return
    /// well within the sampling cadence.
    fn is_active(&mut self) -> bool;
}

/// Closures work as pin sources, which keeps scripted pins cheap.
///
/// # Examples
/// ```
/// use irframe_core::PinSource;
///
/// let mut held = || true;
/// assert!(held.is_active());
/// ```
impl<F: FnMut() -> bool> PinSource for F {
    fn is_active(&mut self) -> bool {
        self()
    }
}

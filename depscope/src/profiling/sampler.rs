//! Stack capture with retry-on-resize
//!
//! The capture primitive fills a caller-provided buffer and reports when the
//! buffer turned out to be too small because stacks appeared between the
//! count estimate and the capture. [`capture_all`] grows the buffer to the
//! newly reported count and tries again until a capture fits.

use log::debug;

use crate::domain::StackSample;

/// Spare slots allocated on top of the live-stack estimate
pub const CAPTURE_SLACK: usize = 10;

/// Outcome of a single capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The first `n` buffer slots hold the captured stacks
    Complete(usize),
    /// More stacks were live than the buffer could hold
    CapacityExceeded { live: usize },
}

/// Source of live call stacks for the whole process
pub trait StackSource {
    /// Estimate of how many stacks a capture would produce right now
    fn live_count(&mut self) -> usize;

    /// Capture every live stack into `buf`
    ///
    /// Must either fill a prefix of `buf` and return [`Capture::Complete`], or
    /// leave the result unspecified and return [`Capture::CapacityExceeded`]
    /// with the current live count.
    fn capture(&mut self, buf: &mut [StackSample]) -> Capture;
}

impl<S: StackSource + ?Sized> StackSource for Box<S> {
    fn live_count(&mut self) -> usize {
        (**self).live_count()
    }

    fn capture(&mut self, buf: &mut [StackSample]) -> Capture {
        (**self).capture(buf)
    }
}

/// Snapshot every live stack, retrying with a bigger buffer as needed
///
/// Each retry sizes the buffer to the count reported by the failed attempt,
/// so the number of retries tracks how often the stack count grew during
/// the call. There is no cap on attempts.
pub fn capture_all<S: StackSource + ?Sized>(source: &mut S) -> Vec<StackSample> {
    let mut expected = source.live_count();
    let mut retries = 0usize;

    loop {
        let mut buf = vec![StackSample::default(); expected + CAPTURE_SLACK];
        match source.capture(&mut buf) {
            Capture::Complete(n) => {
                buf.truncate(n);
                if retries > 0 {
                    debug!("Captured {} stacks after {retries} resize(s)", buf.len());
                }
                return buf;
            }
            Capture::CapacityExceeded { live } => {
                retries += 1;
                // a source reporting a count that already fit would otherwise spin forever
                expected = live.max(buf.len());
            }
        }
    }
}

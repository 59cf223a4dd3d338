//! Signal-driven stack capture for every thread of this process
//!
//! Linux offers no way to read another thread's stack from the outside
//! without ptrace, so each thread is asked to walk its own stack: the sampler
//! sends it a signal with `tgkill`, and the handler unwinds the interrupted
//! stack into a preallocated slot.
//!
//! ```text
//!  sampler thread                       target thread
//!  ──────────────                       ─────────────
//!  slot.state = ARMED
//!  tgkill(pid, tid, SIGPROF) ─────────▶ on_sample_signal()
//!                                         ARMED → WRITING
//!                                         backtrace::trace_unsynchronized
//!                                         WRITING → DONE
//!  wait for DONE (or deadline)
//!  copy frames, slot.state = IDLE
//! ```
//!
//! Threads are visited one after another, so a capture is a best-effort
//! snapshot rather than a single instant. Threads that exit in between are
//! skipped, and so are threads that do not answer before the deadline (for
//! example because they block the signal).
//!
//! A handler that starts but never finishes (the unwinder can block on a
//! loader lock the interrupted thread holds) wedges the slot. Captures then
//! come back empty until the handler completes, so the sampler never hangs.
//!
//! The handler stays installed after sampling stops; a stray signal that
//! arrives while no capture is armed is ignored. Hosts that already use
//! `SIGPROF` should pick another signal with
//! [`SignalStackSource::with_options`].

#![allow(unsafe_code)] // signal handling and tgkill require unsafe

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use libc::c_int;
use log::{info, warn};

use super::sampler::{Capture, StackSource};
use super::threads::{current_tid, list_own_threads};
use crate::domain::{ProfilerError, StackSample, Tid};

/// Deepest stack recorded per thread; deeper frames are dropped
pub const MAX_FRAMES: usize = 128;

/// Signal used to interrupt threads when none is configured
pub const DEFAULT_SIGNAL: c_int = libc::SIGPROF;

/// How long to wait for one thread to answer
pub const DEFAULT_THREAD_TIMEOUT: Duration = Duration::from_millis(10);

/// Extra time a handler that already started gets to finish its stack walk
pub const HANDLER_GRACE: Duration = Duration::from_millis(100);

const IDLE: u8 = 0;
const ARMED: u8 = 1;
const WRITING: u8 = 2;
const DONE: u8 = 3;

/// Hand-off area between the sampler and the signal handler
struct SignalSlot {
    state: AtomicU8,
    len: AtomicUsize,
    /// Number of leading frames that belong to the handler itself
    skip: AtomicUsize,
    frames: UnsafeCell<[u64; MAX_FRAMES]>,
}

// SAFETY: `frames` is only written by the handler that moved `state` from
// ARMED to WRITING, and only read by the sampler after it observed DONE.
unsafe impl Sync for SignalSlot {}

static SLOT: SignalSlot = SignalSlot {
    state: AtomicU8::new(IDLE),
    len: AtomicUsize::new(0),
    skip: AtomicUsize::new(0),
    frames: UnsafeCell::new([0; MAX_FRAMES]),
};

/// One handler and one slot per process, so captures are serialized
static CAPTURE_LOCK: Mutex<()> = Mutex::new(());

/// Set while a handler holds the slot past its grace period. Captures
/// return nothing until it finishes, since the slot may still be written.
static WEDGED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sample_signal(_signal: c_int, _info: *mut libc::siginfo_t, _ctx: *mut c_void) {
    if SLOT.state.compare_exchange(ARMED, WRITING, Ordering::Acquire, Ordering::Relaxed).is_err() {
        return;
    }

    // SAFETY: errno is thread-local and the unwinder may clobber it
    let saved_errno = unsafe { *libc::__errno_location() };

    // SAFETY: winning the ARMED -> WRITING exchange grants exclusive access
    let frames = unsafe { &mut *SLOT.frames.get() };
    let handler_addr = on_sample_signal as usize;
    let mut len = 0;
    let mut skip = 0;

    // SAFETY: captures are serialized by CAPTURE_LOCK, and the closure
    // neither allocates nor takes locks.
    unsafe {
        backtrace::trace_unsynchronized(|frame| {
            frames[len] = frame.ip() as usize as u64;
            len += 1;
            if skip == 0 && frame.symbol_address() as usize == handler_addr {
                skip = len;
            }
            len < MAX_FRAMES
        });
    }

    SLOT.len.store(len, Ordering::Relaxed);
    SLOT.skip.store(skip, Ordering::Relaxed);
    SLOT.state.store(DONE, Ordering::Release);

    // SAFETY: see above
    unsafe { *libc::__errno_location() = saved_errno };
}

fn install_handler(signal: c_int) -> io::Result<()> {
    // SAFETY: the action is fully initialized before being installed, and the
    // handler only touches async-signal-safe state.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sample_signal as usize;
        action.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// [`StackSource`] that samples every other thread of this process
///
/// The calling (sampler) thread never samples itself.
#[derive(Debug)]
pub struct SignalStackSource {
    signal: c_int,
    thread_timeout: Duration,
}

impl SignalStackSource {
    /// Install the `SIGPROF` handler and build a source
    ///
    /// # Errors
    /// Returns an error if the signal handler cannot be installed
    pub fn new() -> Result<Self, ProfilerError> {
        Self::with_options(DEFAULT_SIGNAL, DEFAULT_THREAD_TIMEOUT)
    }

    /// Build a source using `signal`, waiting at most `thread_timeout` per thread
    ///
    /// # Errors
    /// Returns an error if the signal handler cannot be installed
    pub fn with_options(signal: c_int, thread_timeout: Duration) -> Result<Self, ProfilerError> {
        install_handler(signal)
            .map_err(|source| ProfilerError::SignalSetupFailed { signal, source })?;
        info!("Installed stack sampling handler for signal {signal}");
        Ok(Self { signal, thread_timeout })
    }

    /// Threads to sample: everything but the caller
    fn targets() -> Vec<Tid> {
        let me = current_tid();
        match list_own_threads() {
            Ok(tids) => tids.into_iter().filter(|tid| *tid != me).collect(),
            Err(e) => {
                warn!("{e:#}");
                Vec::new()
            }
        }
    }

    /// Interrupt one thread and collect its stack, innermost frame first
    fn sample_thread(&self, tid: Tid) -> Option<Vec<u64>> {
        SLOT.len.store(0, Ordering::Relaxed);
        SLOT.state.store(ARMED, Ordering::Release);

        // SAFETY: plain syscall; an exited thread yields ESRCH
        let rc = unsafe { libc::syscall(libc::SYS_tgkill, libc::getpid(), tid.0, self.signal) };
        if rc != 0 {
            SLOT.state.store(IDLE, Ordering::Release);
            return None;
        }

        let answer_by = Instant::now() + self.thread_timeout;
        match await_handler(answer_by, answer_by + HANDLER_GRACE) {
            Handoff::Done => {}
            Handoff::Unanswered => {
                warn!("{tid} did not answer within {:?}", self.thread_timeout);
                return None;
            }
            Handoff::Stuck => {
                WEDGED.store(true, Ordering::Release);
                warn!("Stack walk of {tid} did not finish; sampling paused until it does");
                return None;
            }
        }

        let len = SLOT.len.load(Ordering::Relaxed).min(MAX_FRAMES);
        let skip = SLOT.skip.load(Ordering::Relaxed).min(len);
        // SAFETY: DONE was observed with Acquire ordering, so the handler's
        // writes are visible and it no longer touches the slot
        let frames = call_sites(unsafe { &(&*SLOT.frames.get())[skip..len] });
        SLOT.state.store(IDLE, Ordering::Release);

        Some(frames)
    }
}

/// Outcome of waiting on the signal handler
#[derive(Debug, PartialEq, Eq)]
enum Handoff {
    Done,
    /// The signal was never handled; the slot is idle again
    Unanswered,
    /// The handler claimed the slot but never finished
    Stuck,
}

/// Wait until the handler finishes, giving up on an unanswered signal at
/// `answer_by` and on a started stack walk at `finish_by`
fn await_handler(answer_by: Instant, finish_by: Instant) -> Handoff {
    loop {
        let now = Instant::now();
        match SLOT.state.load(Ordering::Acquire) {
            DONE => return Handoff::Done,
            ARMED if now >= answer_by => {
                // A late delivery after this point finds the slot idle and
                // does nothing. Losing the race means the handler started.
                if SLOT
                    .state
                    .compare_exchange(ARMED, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return Handoff::Unanswered;
                }
                continue;
            }
            _ if now >= finish_by => return Handoff::Stuck,
            _ => {}
        }
        std::thread::yield_now();
    }
}

/// A stuck slot is reusable once its handler finally reports DONE
fn recover_slot() -> bool {
    if !WEDGED.load(Ordering::Acquire) {
        return true;
    }
    if SLOT.state.compare_exchange(DONE, IDLE, Ordering::AcqRel, Ordering::Acquire).is_ok() {
        WEDGED.store(false, Ordering::Release);
        info!("Stuck stack walk finished; sampling resumed");
        return true;
    }
    false
}

/// Map raw instruction pointers to addresses inside the calling instruction
///
/// Every frame but the innermost holds a return address, which may already
/// point into the next function when the call was the last instruction.
fn call_sites(ips: &[u64]) -> Vec<u64> {
    ips.iter()
        .enumerate()
        .map(|(i, &ip)| if i == 0 { ip } else { ip.saturating_sub(1) })
        .collect()
}

impl StackSource for SignalStackSource {
    fn live_count(&mut self) -> usize {
        Self::targets().len()
    }

    fn capture(&mut self, buf: &mut [StackSample]) -> Capture {
        let _guard = CAPTURE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if !recover_slot() {
            return Capture::Complete(0);
        }

        let tids = Self::targets();
        if tids.len() > buf.len() {
            return Capture::CapacityExceeded { live: tids.len() };
        }

        let mut filled = 0;
        for tid in tids {
            if let Some(frames) = self.sample_thread(tid) {
                buf[filled] = StackSample::new(frames);
                filled += 1;
            } else if WEDGED.load(Ordering::Acquire) {
                break;
            }
        }
        Capture::Complete(filled)
    }
}

//! Thread enumeration for the current process
//!
//! Lists the kernel thread ids of this process by reading /proc filesystem.

use anyhow::{Context, Result};
use std::fs;

use crate::domain::Tid;

/// List every thread of the current process via /proc/self/task
///
/// # Errors
/// Returns an error if /proc filesystem cannot be accessed or read
pub fn list_own_threads() -> Result<Vec<Tid>> {
    let task_dir = "/proc/self/task";

    let entries = fs::read_dir(task_dir).context(format!("Failed to read {task_dir}"))?;

    let mut tids: Vec<Tid> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            entry.file_name().to_str()?.parse::<i32>().ok().map(Tid)
        })
        .collect();

    tids.sort_unstable();
    Ok(tids)
}

/// Kernel thread id of the calling thread
#[allow(unsafe_code, clippy::cast_possible_truncation)]
#[must_use]
pub fn current_tid() -> Tid {
    // SAFETY: gettid takes no arguments and cannot fail
    Tid(unsafe { libc::syscall(libc::SYS_gettid) } as i32)
}

//! Memory mapping utilities for the profiled process
//!
//! Sampled addresses are runtime addresses. To look them up in the
//! executable's DWARF data we need to know where the executable was mapped,
//! which `/proc/self/maps` tells us.

use anyhow::{Context, Result};
use log::info;
use std::fs;

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Find the span of all mappings backed by `binary_path` in a maps listing
///
/// Each line has the shape `start-end perms offset dev inode pathname`. The
/// returned range runs from the lowest start to the highest end, so it covers
/// every segment of the binary.
#[must_use]
pub fn find_binary_range(maps: &str, binary_path: &str) -> Option<MemoryRange> {
    let mut range: Option<MemoryRange> = None;

    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(span) = parts.next() else { continue };
        // pathname is the sixth column and is absent for anonymous mappings
        if parts.nth(4) != Some(binary_path) {
            continue;
        }
        let Some((start, end)) = span.split_once('-') else { continue };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
        else {
            continue;
        };

        range = Some(match range {
            Some(r) => MemoryRange { start: r.start.min(start), end: r.end.max(end) },
            None => MemoryRange { start, end },
        });
    }

    range
}

/// Parse /proc/self/maps to find where `binary_path` is mapped in this process
///
/// # Errors
/// Returns an error if /proc/self/maps cannot be read or if the binary is not mapped
pub fn self_memory_range(binary_path: &str) -> Result<MemoryRange> {
    let maps = fs::read_to_string("/proc/self/maps").context("Failed to read /proc/self/maps")?;

    let range = find_binary_range(&maps, binary_path)
        .with_context(|| format!("Could not find memory range for {binary_path}"))?;

    info!(
        "Executable memory range: 0x{:x} - 0x{:x} (size: {} KB)",
        range.start,
        range.end,
        (range.end - range.start) / 1024
    );
    Ok(range)
}

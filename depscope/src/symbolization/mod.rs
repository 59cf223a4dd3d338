//! # Address Resolution
//!
//! Converts raw return addresses captured by the sampler into the source file
//! they belong to. Only the file path matters to depscope: the package
//! classifier turns it into a package identity.
//!
//! ## Address Translation Flow
//!
//! ```text
//! 1. Sampler captures a stack
//!    Raw addresses: [0x55f3a2b4c780, 0x55f3a2b4d120, ...]
//!
//! 2. /proc/self/maps gives the executable's mapped range
//!    Executable loaded at: 0x55f3a2b4c000 - 0x55f3a2b5f000
//!
//! 3. Addresses outside that range (libc, vdso) resolve to nothing
//!
//! 4. For PIE executables, rebase to the file's address space
//!    0x55f3a2b4c780 - 0x55f3a2b4c000 = 0x780
//!
//! 5. Look up 0x780 in the DWARF line table
//!    0x780 → /home/dev/myapp/src/net/tcp.rs
//! ```
//!
//! ## Limitations
//!
//! - **Requires debug symbols**: the host binary must be built with `debug = true`
//!   (line tables only is enough: `debug = "line-tables-only"`)
//! - **Main executable only**: frames in shared objects are never resolved
//! - **Inlining**: the innermost inlined location wins, so an inlined call
//!   is attributed to the package of the inlined function

pub mod memory_maps;
pub mod symbolizer;

pub use memory_maps::{find_binary_range, self_memory_range, MemoryRange};
pub use symbolizer::{AddressResolver, DwarfResolver, StaticResolver};

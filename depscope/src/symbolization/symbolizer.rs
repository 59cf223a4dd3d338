use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianArcSlice, RunTimeEndian};
use log::{info, warn};
use object::{Object, ObjectKind, ObjectSection};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::memory_maps::{self_memory_range, MemoryRange};

/// Maps a raw instruction address to the source file it came from
///
/// Called once per frame per sample, so implementations should be cheap on
/// repeated addresses. `None` means the address carries no source mapping,
/// which is routine for runtime and shared-library frames.
pub trait AddressResolver {
    fn resolve(&mut self, addr: u64) -> Option<Arc<str>>;
}

impl<R: AddressResolver + ?Sized> AddressResolver for Box<R> {
    fn resolve(&mut self, addr: u64) -> Option<Arc<str>> {
        (**self).resolve(addr)
    }
}

/// DWARF-backed resolver for addresses in this process's own executable
///
/// Includes a cache to avoid re-resolving the same addresses repeatedly,
/// which matters because the same return addresses show up on every tick.
pub struct DwarfResolver {
    ctx: Context<EndianArcSlice<RunTimeEndian>>,
    /// Where the executable is mapped; `None` disables the range check
    range: Option<MemoryRange>,
    /// Position-independent executables need addresses rebased to file offsets
    relocatable: bool,
    cache: HashMap<u64, Option<Arc<str>>>,
}

impl DwarfResolver {
    /// Create a resolver for the binary at `binary_path`
    ///
    /// `range` is where that binary is mapped in the current process.
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed, or if DWARF debug info is missing
    pub fn new<P: AsRef<Path>>(binary_path: P, range: Option<MemoryRange>) -> Result<Self> {
        let binary_data = fs::read(binary_path.as_ref()).context("Failed to read binary file")?;

        let obj_file = object::File::parse(&*binary_data).context("Failed to parse object file")?;
        let relocatable = obj_file.kind() == ObjectKind::Dynamic;

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianArcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianArcSlice::new(Arc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;

        Ok(Self { ctx, range, relocatable, cache: HashMap::new() })
    }

    /// Create a resolver for the executable of the current process
    ///
    /// # Errors
    /// Returns an error if `/proc/self/exe` cannot be read or carries no DWARF data
    pub fn for_current_exe() -> Result<Self> {
        let exe = fs::read_link("/proc/self/exe").context("Failed to resolve /proc/self/exe")?;
        let exe_str = exe.to_string_lossy();

        let range = match self_memory_range(&exe_str) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!("{e:#}; resolving addresses without range check");
                None
            }
        };

        let resolver = Self::new(&exe, range)?;
        info!(
            "Loaded debug info for {} ({})",
            exe_str,
            if resolver.relocatable { "PIE" } else { "fixed address" }
        );
        Ok(resolver)
    }

    /// Translate a runtime address to the address space of the DWARF data
    ///
    /// Returns None for addresses outside the executable (shared libraries,
    /// JIT code, vdso).
    fn adjust_address(&self, addr: u64) -> Option<u64> {
        match self.range {
            Some(range) if !range.contains(addr) => None,
            Some(range) if self.relocatable => Some(addr - range.start),
            _ => Some(addr),
        }
    }

    fn lookup(&self, addr: u64) -> Option<Arc<str>> {
        let file_addr = self.adjust_address(addr)?;
        let location = self.ctx.find_location(file_addr).ok()??;
        location.file.map(Arc::from)
    }
}

impl AddressResolver for DwarfResolver {
    fn resolve(&mut self, addr: u64) -> Option<Arc<str>> {
        if let Some(cached) = self.cache.get(&addr) {
            return cached.clone();
        }

        let file = self.lookup(addr);
        self.cache.insert(addr, file.clone());
        file
    }
}

/// Fixed address-to-file table
///
/// Useful for hosts that symbolize out of band and for exercising the
/// aggregation pipeline with synthetic stacks.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    files: HashMap<u64, Arc<str>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` as the source of `addr`
    #[must_use]
    pub fn with(mut self, addr: u64, file: &str) -> Self {
        self.insert(addr, file);
        self
    }

    pub fn insert(&mut self, addr: u64, file: &str) {
        self.files.insert(addr, Arc::from(file));
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&mut self, addr: u64) -> Option<Arc<str>> {
        self.files.get(&addr).cloned()
    }
}

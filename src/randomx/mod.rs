//! RandomX state management
//!
//! Owns the cache, the optional full dataset, and the per-worker virtual
//! machines. [`VmPool`] is the only entry point the mining engine uses;
//! the RAII wrappers below keep every allocation paired with its release.

mod cache;
mod dataset;
mod ffi;
mod pool;
mod vm;

pub use cache::Cache;
pub use dataset::Dataset;
pub use pool::VmPool;
pub use vm::{Vm, VmHandle};

use randomx_rs::RandomXFlag;

/// RandomX flag bitmask
///
/// Auto-detected hardware flags plus JIT; fast mode adds the full-memory
/// flag on the VM side only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flags(u32);

const FLAG_FULL_MEM: u32 = 0x4;
const FLAG_JIT: u32 = 0x8;

impl Flags {
    /// Hardware-recommended flags with JIT explicitly enabled, matching
    /// the daemon's initialization.
    pub fn recommended() -> Self {
        Self(RandomXFlag::get_recommended_flags().bits() | FLAG_JIT)
    }

    /// The same flags with full-memory set, for VMs bound to a dataset.
    pub fn with_full_mem(self) -> Self {
        Self(self.0 | FLAG_FULL_MEM)
    }

    /// Raw bits for the C API
    pub fn bits(self) -> u32 {
        self.0
    }
}

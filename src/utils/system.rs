//! System-resource detection and thread-count selection
//!
//! RandomX memory shapes the thread budget: fast mode needs ~2.5 GB for
//! the shared dataset and cache before the first worker starts, light mode
//! only the ~256 MB cache. Per worker, the scratchpad costs ~2 MB either
//! way, so the core count is almost always the real constraint.

use sysinfo::System;

const FAST_MODE_BASE_MB: u64 = 2560;
const LIGHT_MODE_BASE_MB: u64 = 300;
const PER_THREAD_MB: u64 = 4;

/// CPU and memory headline numbers
#[derive(Debug, Clone, Copy)]
pub struct SystemResources {
    pub cpu_cores: usize,
    pub total_ram_mb: u64,
    pub available_ram_mb: u64,
}

impl SystemResources {
    /// Snapshot the machine.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let cpu_cores = num_cpus::get().max(1);
        Self {
            cpu_cores,
            total_ram_mb: sys.total_memory() / (1024 * 1024),
            available_ram_mb: sys.available_memory() / (1024 * 1024),
        }
    }

    /// The highest sensible worker count for the given mode.
    ///
    /// Returns 0 when fast mode cannot fit in the available RAM at all;
    /// the caller falls back to light mode. Light mode always yields at
    /// least one thread.
    pub fn optimal_threads(&self, fast_mode: bool) -> usize {
        let base = if fast_mode {
            FAST_MODE_BASE_MB
        } else {
            LIGHT_MODE_BASE_MB
        };

        if self.available_ram_mb < base {
            return if fast_mode { 0 } else { 1 };
        }

        let by_ram = ((self.available_ram_mb - base) / PER_THREAD_MB) as usize;
        by_ram.min(self.cpu_cores).max(1)
    }
}

//! RandomX dataset wrapper with parallel initialization

use crate::error::InitError;
use crate::randomx::{ffi, Cache, Flags};
use std::ffi::c_void;
use tracing::debug;

/// The fully expanded RandomX dataset (~2 GB), shared by all fast-mode VMs
pub struct Dataset {
    ptr: *mut c_void,
}

// Read-only once initialized; during initialization the helper threads
// write disjoint item ranges.
unsafe impl Send for Dataset {}
unsafe impl Sync for Dataset {}

impl Dataset {
    /// Allocate an uninitialized dataset.
    pub fn alloc(flags: Flags) -> Result<Self, InitError> {
        let ptr = unsafe { ffi::randomx_alloc_dataset(flags.bits()) };
        if ptr.is_null() {
            return Err(InitError::DatasetAlloc);
        }
        Ok(Self { ptr })
    }

    /// Number of items in a full dataset
    pub fn item_count() -> u64 {
        unsafe { ffi::randomx_dataset_item_count() }
    }

    /// Expand the dataset from `cache` using `helpers` threads, each
    /// filling a contiguous item range; the last helper absorbs the
    /// remainder. Returns only after every item in `[0, item_count)` has
    /// been written exactly once.
    pub fn init_parallel(&self, cache: &Cache, helpers: usize) {
        let helpers = helpers.max(1);
        let item_count = Self::item_count();
        let items_per_helper = item_count / helpers as u64;

        debug!(item_count, helpers, "initializing RandomX dataset");

        std::thread::scope(|scope| {
            for i in 0..helpers {
                let start = i as u64 * items_per_helper;
                let count = if i == helpers - 1 {
                    item_count - start
                } else {
                    items_per_helper
                };
                scope.spawn(move || unsafe {
                    ffi::randomx_init_dataset(self.ptr, cache.as_ptr(), start, count);
                });
            }
        });
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        unsafe { ffi::randomx_release_dataset(self.ptr) };
    }
}

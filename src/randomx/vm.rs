//! RandomX virtual machine wrapper

use crate::core::constants::HASH_SIZE;
use crate::error::InitError;
use crate::randomx::{ffi, Cache, Dataset, Flags};
use std::ffi::c_void;

/// A hashing context bound to a cache (light mode) or dataset (fast mode).
///
/// Owned by the [`VmPool`](crate::randomx::VmPool); workers operate on it
/// through a borrowed [`VmHandle`].
pub struct Vm {
    ptr: *mut c_void,
}

// A VM is used by at most one thread at a time: its owning pool hands out
// exactly one handle per worker, and the pool is only mutated between
// sessions.
unsafe impl Send for Vm {}

impl Vm {
    /// Create a VM from a cache (light mode) or a dataset (fast mode).
    pub fn new(
        flags: Flags,
        cache: Option<&Cache>,
        dataset: Option<&Dataset>,
    ) -> Result<Self, InitError> {
        let cache_ptr = cache.map_or(std::ptr::null_mut(), Cache::as_ptr);
        let dataset_ptr = dataset.map_or(std::ptr::null_mut(), Dataset::as_ptr);
        let ptr = unsafe { ffi::randomx_create_vm(flags.bits(), cache_ptr, dataset_ptr) };
        if ptr.is_null() {
            return Err(InitError::VmCreate { worker: 0 });
        }
        Ok(Self { ptr })
    }

    /// Point the VM at a (re-initialized) dataset. Fast-mode re-keying
    /// rebinds VMs instead of recreating them.
    pub fn rebind_dataset(&mut self, dataset: &Dataset) {
        unsafe { ffi::randomx_vm_set_dataset(self.ptr, dataset.as_ptr()) };
    }

    /// A raw handle for a worker thread. The caller must ensure the VM
    /// outlives the handle and that no two threads use one concurrently.
    pub fn handle(&self) -> VmHandle {
        VmHandle { ptr: self.ptr }
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        unsafe { ffi::randomx_destroy_vm(self.ptr) };
    }
}

/// Non-owning VM reference moved into a worker thread for one session
#[derive(Clone, Copy)]
pub struct VmHandle {
    ptr: *mut c_void,
}

// See `Vm`: exclusivity per worker is enforced by the pool handing out one
// handle per worker id, and by the engine joining all workers before the
// pool is mutated.
unsafe impl Send for VmHandle {}

impl VmHandle {
    /// Compute the RandomX hash of `input` into `output`.
    pub fn hash_into(&mut self, input: &[u8], output: &mut [u8; HASH_SIZE]) {
        unsafe {
            ffi::randomx_calculate_hash(
                self.ptr,
                input.as_ptr(),
                input.len(),
                output.as_mut_ptr(),
            );
        }
    }
}

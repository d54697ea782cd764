//! RandomX cache wrapper

use crate::error::InitError;
use crate::randomx::{ffi, Flags};
use std::ffi::c_void;

/// A seed-keyed RandomX cache (~256 MB)
pub struct Cache {
    ptr: *mut c_void,
}

// The cache is written only by `init_cache`, which is called from exactly
// one thread while no VM or dataset-init helper is reading it. Concurrent
// use is otherwise read-only.
unsafe impl Send for Cache {}
unsafe impl Sync for Cache {}

impl Cache {
    /// Allocate a cache and initialize it with the given key. The key is
    /// the 32-byte epoch seed hash in normal operation, but the ABI takes
    /// arbitrary bytes (the chain's pre-epoch key is an ASCII string).
    pub fn new(flags: Flags, key: &[u8]) -> Result<Self, InitError> {
        let ptr = unsafe { ffi::randomx_alloc_cache(flags.bits()) };
        if ptr.is_null() {
            return Err(InitError::CacheAlloc);
        }
        let cache = Self { ptr };
        cache.reinit(key);
        Ok(cache)
    }

    /// Re-key the cache in place.
    ///
    /// Caller must guarantee no VM created from this cache is hashing and
    /// no dataset initialization is reading it.
    pub fn reinit(&self, key: &[u8]) {
        unsafe { ffi::randomx_init_cache(self.ptr, key.as_ptr(), key.len()) };
    }

    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        unsafe { ffi::randomx_release_cache(self.ptr) };
    }
}

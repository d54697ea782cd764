//! Raw RandomX C ABI
//!
//! Declarations for the subset of the RandomX library this miner uses.
//! The library itself is built and linked by the `randomx-rs` crate; these
//! raw bindings exist because the safe wrapper there does not expose
//! chunked dataset initialization or dataset rebinding on a live VM.

use std::ffi::c_void;

extern "C" {
    pub fn randomx_get_flags() -> u32;

    pub fn randomx_alloc_cache(flags: u32) -> *mut c_void;
    pub fn randomx_init_cache(cache: *mut c_void, key: *const u8, key_size: usize);
    pub fn randomx_release_cache(cache: *mut c_void);

    pub fn randomx_dataset_item_count() -> u64;
    pub fn randomx_alloc_dataset(flags: u32) -> *mut c_void;
    pub fn randomx_init_dataset(
        dataset: *mut c_void,
        cache: *mut c_void,
        start_item: u64,
        item_count: u64,
    );
    pub fn randomx_release_dataset(dataset: *mut c_void);

    pub fn randomx_create_vm(
        flags: u32,
        cache: *mut c_void,
        dataset: *mut c_void,
    ) -> *mut c_void;
    pub fn randomx_destroy_vm(vm: *mut c_void);
    pub fn randomx_vm_set_dataset(vm: *mut c_void, dataset: *mut c_void);

    pub fn randomx_calculate_hash(
        vm: *mut c_void,
        input: *const u8,
        input_size: usize,
        output: *mut u8,
    );
}

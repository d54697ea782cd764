//! Proof-of-work vectors against the real RandomX library
//!
//! Reconstructs mainnet block 1583 byte-for-byte and checks that its
//! RandomX hash comes out exactly as recorded on chain. Slow (each cache
//! initialization runs the full Argon2 fill), so everything shares one
//! cache per key.

use randomx_solo_miner::core::{BlockTemplate, Nonce256};
use randomx_solo_miner::randomx::{Cache, Flags, Vm};
use serde_json::json;

const GENESIS_EPOCH_KEY: &[u8] = b"ZcashRandomXPoW";

const EXPECTED_HASH_1583: &str =
    "4268bf0d59a72f3f086020274dcc869164c092442ecc52246d6e760b28a80500";

fn block_1583_header() -> [u8; 140] {
    let value = json!({
        "version": 4,
        "previousblockhash":
            "23d39ee3ec4600c3f507230519a64ea5f6c444b22e85633a9526289127f4aa17",
        "curtime": 1760323089u32,
        "bits": "1f09daa8",
        "height": 1583,
        "randomxseedheight": 0,
        "randomxseedhash": "00".repeat(32),
        "defaultroots": {
            "merkleroot":
                "cf56010cd2de6b1323a0b0cf5f8f7354a4fa41c492eae5861c7929f2673e4f8e",
            "blockcommitmentshash":
                "bf9cd388aa99b6d79402d285567ea326025936ef92d5a4c1ab7ae732acb942f5"
        },
        "coinbasetxn": { "data": "00" }
    });
    let template = BlockTemplate::from_rpc(&value).expect("valid template");
    let nonce = Nonce256::from_display_hex(
        "00004b208177028c86cd2875902953277897cebc15806b139d16c180b25a1262",
    )
    .expect("valid nonce");
    template.full_header(&nonce)
}

#[test]
fn block_1583_hashes_to_recorded_value() {
    let flags = Flags::recommended();
    let cache = Cache::new(flags, GENESIS_EPOCH_KEY).expect("cache");
    let vm = Vm::new(flags, Some(&cache), None).expect("vm");
    let mut handle = vm.handle();

    let header = block_1583_header();
    let mut hash = [0u8; 32];
    handle.hash_into(&header, &mut hash);

    assert_eq!(hex::encode(hash), EXPECTED_HASH_1583);
}

#[test]
fn hashing_is_deterministic_across_vms() {
    let flags = Flags::recommended();
    let cache = Cache::new(flags, GENESIS_EPOCH_KEY).expect("cache");
    let header = block_1583_header();

    let vm_a = Vm::new(flags, Some(&cache), None).expect("vm");
    let vm_b = Vm::new(flags, Some(&cache), None).expect("vm");

    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    let mut other_vm = [0u8; 32];

    let mut handle_a = vm_a.handle();
    handle_a.hash_into(&header, &mut first);
    handle_a.hash_into(&header, &mut second);
    vm_b.handle().hash_into(&header, &mut other_vm);

    assert_eq!(first, second);
    assert_eq!(first, other_vm);
}

#[test]
fn different_keys_give_different_hashes() {
    let flags = Flags::recommended();
    let header = block_1583_header();

    let cache_a = Cache::new(flags, GENESIS_EPOCH_KEY).expect("cache");
    let cache_b = Cache::new(flags, &[0x11u8; 32]).expect("cache");

    let mut hash_a = [0u8; 32];
    let mut hash_b = [0u8; 32];
    Vm::new(flags, Some(&cache_a), None)
        .expect("vm")
        .handle()
        .hash_into(&header, &mut hash_a);
    Vm::new(flags, Some(&cache_b), None)
        .expect("vm")
        .handle()
        .hash_into(&header, &mut hash_b);

    assert_ne!(hash_a, hash_b);
}

#[test]
fn rekeying_a_cache_changes_the_hash() {
    let flags = Flags::recommended();
    let header = block_1583_header();

    let cache = Cache::new(flags, GENESIS_EPOCH_KEY).expect("cache");
    let mut before = [0u8; 32];
    Vm::new(flags, Some(&cache), None)
        .expect("vm")
        .handle()
        .hash_into(&header, &mut before);
    assert_eq!(hex::encode(before), EXPECTED_HASH_1583);

    cache.reinit(&[0x22u8; 32]);
    let mut after = [0u8; 32];
    Vm::new(flags, Some(&cache), None)
        .expect("vm")
        .handle()
        .hash_into(&header, &mut after);
    assert_ne!(before, after);

    // And back again: the key fully determines the hash.
    cache.reinit(GENESIS_EPOCH_KEY);
    let mut restored = [0u8; 32];
    Vm::new(flags, Some(&cache), None)
        .expect("vm")
        .handle()
        .hash_into(&header, &mut restored);
    assert_eq!(restored, before);
}

/// Fast-mode parity: a dataset-backed VM must produce the same hashes as a
/// cache-backed one. Allocates the full ~2 GB dataset, so ignored by
/// default; run with `cargo test -- --ignored` on a big machine.
#[test]
#[ignore]
fn dataset_vm_matches_cache_vm() {
    use randomx_solo_miner::randomx::Dataset;

    let flags = Flags::recommended();
    let cache = Cache::new(flags, GENESIS_EPOCH_KEY).expect("cache");
    let dataset = Dataset::alloc(flags).expect("dataset");
    dataset.init_parallel(&cache, num_cpus::get());

    let header = block_1583_header();
    let mut light = [0u8; 32];
    let mut fast = [0u8; 32];

    Vm::new(flags, Some(&cache), None)
        .expect("light vm")
        .handle()
        .hash_into(&header, &mut light);
    Vm::new(flags.with_full_mem(), None, Some(&dataset))
        .expect("fast vm")
        .handle()
        .hash_into(&header, &mut fast);

    assert_eq!(hex::encode(light), EXPECTED_HASH_1583);
    assert_eq!(light, fast);
}

//! Mining-engine behavior against the real RandomX library (light mode)
//!
//! Sessions run with either a trivial target (every hash wins) or an
//! impossible one (only the all-zero hash wins), so none of these tests
//! depend on luck. Each test pays for at least one cache initialization.

use randomx_solo_miner::core::{BlockTemplate, Hash256, Target};
use randomx_solo_miner::miner::Miner;
use serde_json::json;
use std::time::{Duration, Instant};

fn test_seed(byte: u8) -> Hash256 {
    Hash256::from_bytes([byte; 32])
}

/// A template keyed to `seed` with the given target.
fn template_with(seed: &Hash256, target: Target) -> BlockTemplate {
    let value = json!({
        "version": 4,
        "previousblockhash": "11".repeat(32),
        "curtime": 1760323089u32,
        "bits": "1f09daa8",
        "height": 2000,
        "randomxseedheight": 0,
        "randomxseedhash": seed.to_internal_hex(),
        "defaultroots": {
            "merkleroot": "22".repeat(32),
            "blockcommitmentshash": "33".repeat(32)
        },
        "coinbasetxn": { "data": "00" }
    });
    let mut template = BlockTemplate::from_rpc(&value).expect("valid template");
    template.target = target;
    template
}

fn everything_wins() -> Target {
    Target::from_le_bytes([0xff; 32])
}

fn nothing_wins() -> Target {
    Target::from_le_bytes([0x00; 32])
}

fn wait_for_solution(miner: &mut Miner, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while miner.is_mining() {
        assert!(Instant::now() < deadline, "no solution within {timeout:?}");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn easy_target_produces_a_valid_solution() {
    let seed = test_seed(0x01);
    let mut miner = Miner::new(2, false);
    miner.initialize(&seed).expect("initialize");

    let template = template_with(&seed, everything_wins());
    miner.start_mining(template.clone()).expect("start");
    wait_for_solution(&mut miner, Duration::from_secs(60));

    let solution = miner.get_solution().expect("solution");
    assert!(template.target.is_met_by(&solution.hash));
    assert_eq!(&solution.header[..108], &template.header_prefix[..]);
    assert_eq!(&solution.header[108..], solution.nonce.as_bytes());
    assert!(miner.hash_count() >= 1);

    // Repeated reads return the identical tuple.
    let again = miner.get_solution().expect("solution persists");
    assert_eq!(again.hash, solution.hash);
    assert_eq!(again.nonce, solution.nonce);
    assert_eq!(again.header, solution.header);
}

#[test]
fn stop_cancels_a_session_without_a_solution() {
    let seed = test_seed(0x02);
    let mut miner = Miner::new(2, false);
    miner.initialize(&seed).expect("initialize");

    miner
        .start_mining(template_with(&seed, nothing_wins()))
        .expect("start");
    assert!(miner.is_mining());
    std::thread::sleep(Duration::from_millis(300));

    miner.stop();
    assert!(!miner.is_mining());
    assert!(miner.get_solution().is_none());
}

#[test]
fn start_requires_matching_seed() {
    let seed = test_seed(0x03);
    let mut miner = Miner::new(1, false);
    miner.initialize(&seed).expect("initialize");

    let other = test_seed(0x04);
    let err = miner
        .start_mining(template_with(&other, everything_wins()))
        .unwrap_err();
    assert!(err.to_string().contains("different seed"), "got: {err}");
}

#[test]
fn seed_update_is_idempotent_and_stops_the_session() {
    let seed_a = test_seed(0x05);
    let mut miner = Miner::new(1, false);
    miner.initialize(&seed_a).expect("initialize");

    // Same seed: a no-op even while a session is running.
    miner
        .start_mining(template_with(&seed_a, nothing_wins()))
        .expect("start");
    miner.update_seed(&seed_a).expect("same-seed update");
    assert!(miner.is_mining(), "same-seed update must not stop mining");

    // New seed: stops the session and re-keys.
    let seed_b = test_seed(0x06);
    miner.update_seed(&seed_b).expect("re-key");
    assert!(!miner.is_mining());
    assert_eq!(miner.current_seed(), Some(&seed_b));

    // Hash counter starts from zero in the next session.
    miner
        .start_mining(template_with(&seed_b, everything_wins()))
        .expect("start on new seed");
    wait_for_solution(&mut miner, Duration::from_secs(60));
    assert!(miner.get_solution().is_some());
}

#[test]
fn thread_resize_retains_the_seed() {
    let seed = test_seed(0x07);
    let mut miner = Miner::new(2, false);
    miner.initialize(&seed).expect("initialize");

    miner
        .start_mining(template_with(&seed, nothing_wins()))
        .expect("start");
    std::thread::sleep(Duration::from_millis(200));

    miner.set_thread_count(1).expect("resize");
    assert!(!miner.is_mining());
    assert_eq!(miner.thread_count(), 1);
    assert_eq!(miner.current_seed(), Some(&seed));

    // The rebuilt pool mines immediately with the retained seed.
    miner
        .start_mining(template_with(&seed, everything_wins()))
        .expect("start after resize");
    wait_for_solution(&mut miner, Duration::from_secs(60));
    assert!(miner.get_solution().is_some());

    // Resizing to the current count is a no-op.
    miner.set_thread_count(1).expect("no-op resize");
    assert_eq!(miner.thread_count(), 1);

    assert!(miner.set_thread_count(0).is_err());
}

#[test]
fn fresh_sessions_reset_the_hash_counter() {
    let seed = test_seed(0x08);
    let mut miner = Miner::new(1, false);
    miner.initialize(&seed).expect("initialize");

    miner
        .start_mining(template_with(&seed, nothing_wins()))
        .expect("start");
    std::thread::sleep(Duration::from_millis(500));
    miner.stop();
    let first_session = miner.hash_count();
    assert!(first_session >= 1);

    miner
        .start_mining(template_with(&seed, nothing_wins()))
        .expect("restart");
    let early = miner.hash_count();
    miner.stop();
    assert!(
        early < first_session,
        "counter did not reset: {early} >= {first_session}"
    );
}

#[test]
fn worker_nonces_stay_in_the_random_band() {
    // The solved nonce keeps the cleared protocol bytes at the top.
    let seed = test_seed(0x09);
    let mut miner = Miner::new(1, false);
    miner.initialize(&seed).expect("initialize");

    miner
        .start_mining(template_with(&seed, everything_wins()))
        .expect("start");
    wait_for_solution(&mut miner, Duration::from_secs(60));

    let solution = miner.get_solution().expect("solution");
    assert_eq!(solution.nonce.as_bytes()[30], 0);
    assert_eq!(solution.nonce.as_bytes()[31], 0);
}

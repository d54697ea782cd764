//! RandomX solo miner
//!
//! Control loop: fetch a template, mine it, watch the network for new
//! blocks and epoch changes, submit solutions, and keep going until
//! interrupted.

use clap::Parser;
use randomx_solo_miner::config::{Args, Config};
use randomx_solo_miner::core::{epoch_number, seed_height, BlockTemplate, Hash256};
use randomx_solo_miner::error::Result;
use randomx_solo_miner::miner::Miner;
use randomx_solo_miner::rpc::{MiningInfo, RpcClient, WalletInfo};
use randomx_solo_miner::utils::system::SystemResources;
use randomx_solo_miner::utils::{format_hashrate, init_logging};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// How often the inner loop wakes up to poll flags and timers
const TICK: Duration = Duration::from_millis(500);

/// Seconds between network-stats refreshes
const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Delay before retrying after a lost connection
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed tip checks before the session is stopped
const MAX_RPC_FAILURES: u32 = 2;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("error: failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    info!(
        version = randomx_solo_miner::VERSION,
        "starting RandomX solo miner"
    );
    if config.zmq_url.is_some() {
        warn!("--zmq-url is accepted but unused; block changes are polled");
    }

    let resources = SystemResources::detect();
    info!(
        cores = resources.cpu_cores,
        total_ram_mb = resources.total_ram_mb,
        available_ram_mb = resources.available_ram_mb,
        "system resources"
    );

    // Fast mode needs ~2.5 GB up front; fall back rather than fail later.
    let mut fast_mode = config.fast_mode;
    if fast_mode && resources.optimal_threads(true) == 0 {
        warn!("insufficient RAM for fast mode (need ~2.5GB), falling back to light mode");
        fast_mode = false;
    }

    let threads = config
        .threads
        .unwrap_or_else(|| resources.optimal_threads(fast_mode).max(1));
    if threads > resources.cpu_cores {
        warn!(
            threads,
            cores = resources.cpu_cores,
            "more threads requested than CPU cores available"
        );
    }
    info!(
        threads,
        mode = if fast_mode { "fast" } else { "light" },
        "mining configuration"
    );

    let rpc = RpcClient::new(&config.rpc_url, &config.rpc_user, &config.rpc_password)?;

    let chain_info = rpc.get_blockchain_info().await.map_err(|e| {
        error!(url = %config.rpc_url, "cannot reach the node, check URL and credentials");
        e
    })?;
    info!(
        chain = %chain_info.chain,
        height = chain_info.blocks,
        "connected to node"
    );

    // The first template tells us which seed to key RandomX with.
    let initial = rpc.get_block_template().await?;
    let initial = BlockTemplate::from_rpc(&initial)?;
    debug!(
        height = initial.height,
        seed_height = initial.seed_height,
        "initial template"
    );

    let mut miner = Miner::new(threads, fast_mode);
    miner.initialize(&initial.seed_hash)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    let mut blocks_mined: u64 = 0;
    let mut network_stats = MiningInfo::default();
    let mut wallet = WalletInfo::default();
    let mut was_disconnected = false;
    let mut last_stats_update = Instant::now();
    let mut stats_primed = false;

    while running.load(Ordering::SeqCst) {
        let template = match rpc.get_block_template().await {
            Ok(value) => match BlockTemplate::from_rpc(&value) {
                Ok(template) => template,
                Err(e) => {
                    warn!("bad block template: {e}");
                    sleep(RECONNECT_DELAY).await;
                    continue;
                }
            },
            Err(e) => {
                warn!("DISCONNECTED: {e}");
                was_disconnected = true;
                sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        if was_disconnected {
            info!("RPC reconnected, resuming mining");
            was_disconnected = false;
        }

        // Epoch transition: re-key before touching the new template.
        if miner.current_seed() != Some(&template.seed_hash) {
            let new_seed_height = seed_height(u64::from(template.height));
            info!(
                epoch = epoch_number(new_seed_height),
                seed = %template.seed_hash.short_tag(),
                "epoch transition, re-keying RandomX"
            );
            miner.update_seed(&template.seed_hash)?;
            info!("epoch transition complete");
        }

        let height = template.height;
        miner.start_mining(template)?;

        let mut block_changed = false;
        let mut rpc_failures: u32 = 0;
        let mut session_tip: Option<u64> = None;
        let mut last_block_check = Instant::now();
        let mut last_status = Instant::now();

        while miner.is_mining() && running.load(Ordering::SeqCst) {
            sleep(TICK).await;

            if last_block_check.elapsed().as_secs() >= config.block_check_secs {
                last_block_check = Instant::now();
                match rpc.get_blockchain_info().await {
                    Ok(tip) => {
                        rpc_failures = 0;
                        match session_tip {
                            None => session_tip = Some(tip.blocks),
                            Some(baseline) if tip.blocks > baseline => {
                                info!(
                                    tip = tip.blocks,
                                    "new block on the network, restarting on fresh work"
                                );
                                block_changed = true;
                                miner.stop();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                    Err(e) => {
                        rpc_failures += 1;
                        warn!(
                            failures = rpc_failures,
                            max = MAX_RPC_FAILURES,
                            "tip check failed: {e}"
                        );
                        if rpc_failures >= MAX_RPC_FAILURES {
                            warn!("RPC connection lost, stopping mining");
                            was_disconnected = true;
                            miner.stop();
                            break;
                        }
                    }
                }
            }

            if !stats_primed || last_stats_update.elapsed() >= STATS_INTERVAL {
                stats_primed = true;
                last_stats_update = Instant::now();
                if let Ok(stats) = rpc.get_mining_info().await {
                    network_stats = stats;
                }
                if !config.no_balance {
                    if let Ok(info) = rpc.get_wallet_info().await {
                        wallet = info;
                    }
                }
            }

            if last_status.elapsed().as_secs() >= config.update_interval_secs {
                last_status = Instant::now();
                let current_seed_height = seed_height(u64::from(height));
                info!(
                    height,
                    epoch = epoch_number(current_seed_height),
                    hashrate = %format_hashrate(miner.hashrate()),
                    hashes = miner.hash_count(),
                    network = %format_hashrate(network_stats.networksolps),
                    difficulty = network_stats.difficulty,
                    blocks_mined,
                    "mining"
                );
                if !config.no_balance {
                    debug!(
                        mature = wallet.balance,
                        immature = wallet.immature_balance,
                        total = wallet.total(),
                        "wallet balance"
                    );
                }
            }
        }

        if !running.load(Ordering::SeqCst) {
            miner.stop();
        }
        if block_changed {
            continue;
        }

        if let Some(solution) = miner.get_solution() {
            let block_hash = Hash256::from_bytes(solution.hash);
            info!(
                height = solution.template.height,
                hash = %block_hash,
                "solution found, submitting block"
            );

            let block_hex = randomx_solo_miner::core::serialize_block(
                &solution.header,
                &solution.hash,
                &solution.template.coinbase_txn_hex,
                &solution.template.other_txn_hex,
            )?;

            match rpc.submit_block(&block_hex).await {
                Ok(status) => {
                    blocks_mined += 1;
                    info!(
                        status = %status,
                        height = solution.template.height,
                        total = blocks_mined,
                        hash = %block_hash,
                        "block accepted"
                    );
                }
                Err(e) => {
                    warn!(hash = %block_hash, "block rejected: {e}");
                }
            }
        }
    }

    miner.stop();
    info!(blocks_mined, "miner stopped");
    Ok(())
}

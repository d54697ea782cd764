//! Mining engine: worker threads, cancellation, solution collection
//!
//! One OS thread per worker, coordinated through two atomic flags
//! (`mining`, `found`) and a relaxed hash counter. Workers poll `mining`
//! every iteration, so `stop()` returns after at most one in-flight hash
//! per worker. At most one worker publishes a solution per session,
//! guaranteed by a compare-and-set on `found`.

use crate::core::constants::{HASH_SIZE, HEADER_PREFIX_SIZE, HEADER_SIZE, NONCE_OFFSET};
use crate::core::{BlockTemplate, Hash256, Nonce256};
use crate::error::{Error, InitError, Result};
use crate::numa::{self, Assignment, Topology};
use crate::randomx::{VmHandle, VmPool};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info};

/// A winning header with its hash and the template it was mined from
#[derive(Clone, Debug)]
pub struct Solution {
    pub header: [u8; HEADER_SIZE],
    pub hash: [u8; HASH_SIZE],
    pub nonce: Nonce256,
    pub template: BlockTemplate,
}

/// State shared between the control thread and one session's workers
struct SessionShared {
    mining: AtomicBool,
    found: AtomicBool,
    hash_count: AtomicU64,
    solution: Mutex<Option<Solution>>,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            mining: AtomicBool::new(false),
            found: AtomicBool::new(false),
            hash_count: AtomicU64::new(0),
            solution: Mutex::new(None),
        }
    }
}

/// The miner: owns the VM pool and the worker threads of the current
/// session.
pub struct Miner {
    pool: VmPool,
    topology: Topology,
    assignment: Assignment,
    shared: Arc<SessionShared>,
    workers: Vec<JoinHandle<()>>,
    start_time: Instant,
}

impl Miner {
    /// Create a miner for `threads` workers. Resources are not allocated
    /// until [`Miner::initialize`].
    pub fn new(threads: usize, fast_mode: bool) -> Self {
        let topology = Topology::detect();
        let assignment = Assignment::new(&topology, threads);
        Self {
            pool: VmPool::new(threads, fast_mode),
            topology,
            assignment,
            shared: Arc::new(SessionShared::new()),
            workers: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Allocate and key the RandomX state for `seed`.
    pub fn initialize(&mut self, seed: &Hash256) -> Result<()> {
        self.pool
            .initialize(seed, &self.topology, &self.assignment)?;
        Ok(())
    }

    /// Spawn one worker per thread and begin searching the nonce space.
    ///
    /// The pool must be initialized with the template's seed; a running
    /// session is stopped first.
    pub fn start_mining(&mut self, template: BlockTemplate) -> Result<()> {
        self.stop();

        if !self.pool.is_initialized() {
            return Err(Error::Init(InitError::NotInitialized));
        }
        if self.pool.current_seed() != Some(&template.seed_hash) {
            return Err(Error::Init(InitError::SeedMismatch));
        }

        debug!(
            height = template.height,
            target = %template.target,
            "starting mining session"
        );

        // Fresh shared state per session so a stale worker from a previous
        // session can never flip this one's flags.
        self.shared = Arc::new(SessionShared::new());
        self.shared.mining.store(true, Ordering::Release);
        self.start_time = Instant::now();

        // Resolve every VM before spawning anything, so a lookup failure
        // cannot leave a half-started session behind.
        let threads = self.pool.threads();
        let mut vms = Vec::with_capacity(threads);
        for worker_id in 0..threads {
            vms.push(
                self.pool
                    .vm_handle_for_worker(worker_id, &self.assignment)
                    .ok_or(Error::Init(InitError::VmCreate { worker: worker_id }))?,
            );
        }

        let template = Arc::new(template);
        for (worker_id, vm) in vms.into_iter().enumerate() {
            let cpu_id = self.assignment.thread_to_cpu.get(worker_id).copied();
            let shared = Arc::clone(&self.shared);
            let template = Arc::clone(&template);

            self.workers.push(std::thread::spawn(move || {
                worker_loop(worker_id, vm, cpu_id, &template, &shared);
            }));
        }

        debug!(threads, "worker threads started");
        Ok(())
    }

    /// Whether a session is currently running
    pub fn is_mining(&self) -> bool {
        self.shared.mining.load(Ordering::Acquire)
    }

    /// Signal all workers to stop and join them. Returns once every worker
    /// has exited; a worker mid-hash finishes that hash first.
    pub fn stop(&mut self) {
        self.shared.mining.store(false, Ordering::Release);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// The solution of the last session, if one was found. Stops the
    /// session first if it is still running. Repeated calls return the
    /// same solution.
    pub fn get_solution(&mut self) -> Option<Solution> {
        if self.is_mining() {
            self.stop();
        }
        if !self.shared.found.load(Ordering::Acquire) {
            return None;
        }
        self.shared.solution.lock().clone()
    }

    /// Re-key the pool for a new epoch seed. Stops any running session.
    /// Idempotent for an unchanged seed.
    pub fn update_seed(&mut self, seed: &Hash256) -> Result<()> {
        if self.pool.current_seed() == Some(seed) {
            return Ok(());
        }
        if self.is_mining() {
            debug!("stopping session for seed update");
            self.stop();
        }
        info!(seed = %seed.short_tag(), "re-keying RandomX for new epoch");
        self.pool.update_seed(seed).map_err(Error::SeedUpdate)
    }

    /// Rebuild the pool for a different worker count, retaining the
    /// current seed. On failure the pool is left released and the next
    /// [`Miner::start_mining`] requires a fresh [`Miner::initialize`].
    pub fn set_thread_count(&mut self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(Error::config("thread count must be at least 1"));
        }
        if threads == self.pool.threads() {
            return Ok(());
        }
        if self.is_mining() {
            self.stop();
        }

        let saved_seed = self.pool.current_seed().copied();
        self.pool.release();
        self.pool.set_threads(threads);
        self.assignment = Assignment::new(&self.topology, threads);

        if let Some(seed) = saved_seed {
            self.pool
                .initialize(&seed, &self.topology, &self.assignment)
                .map_err(Error::Resize)?;
        }
        info!(threads, "thread count changed");
        Ok(())
    }

    /// Hashes computed in the current session
    pub fn hash_count(&self) -> u64 {
        self.shared.hash_count.load(Ordering::Relaxed)
    }

    /// Session hashrate in hashes per second; zero before the first
    /// elapsed second.
    pub fn hashrate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs();
        if elapsed == 0 {
            return 0.0;
        }
        self.hash_count() as f64 / elapsed as f64
    }

    /// Configured worker count
    pub fn thread_count(&self) -> usize {
        self.pool.threads()
    }

    /// Whether the miner runs against a full dataset
    pub fn is_fast_mode(&self) -> bool {
        self.pool.is_fast_mode()
    }

    /// The seed the pool is keyed with, if initialized
    pub fn current_seed(&self) -> Option<&Hash256> {
        self.pool.current_seed()
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The hot loop: hash 140-byte headers until told to stop or a solution
/// lands.
fn worker_loop(
    worker_id: usize,
    mut vm: VmHandle,
    cpu_id: Option<usize>,
    template: &BlockTemplate,
    shared: &SessionShared,
) {
    if let Some(cpu) = cpu_id {
        if numa::pin_current_thread(cpu) {
            debug!(worker_id, cpu, "worker pinned");
        }
    }

    let mut input = [0u8; HEADER_SIZE];
    input[..HEADER_PREFIX_SIZE].copy_from_slice(&template.header_prefix);

    let mut nonce = Nonce256::random();
    let mut hash = [0u8; HASH_SIZE];

    while shared.mining.load(Ordering::Acquire) && !shared.found.load(Ordering::Acquire) {
        input[NONCE_OFFSET..].copy_from_slice(nonce.as_bytes());
        vm.hash_into(&input, &mut hash);
        shared.hash_count.fetch_add(1, Ordering::Relaxed);

        if template.target.is_met_by(&hash) {
            if shared
                .found
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                *shared.solution.lock() = Some(Solution {
                    header: input,
                    hash,
                    nonce,
                    template: template.clone(),
                });
                // Publish before letting the other workers observe the stop.
                shared.mining.store(false, Ordering::Release);
                info!(worker_id, "solution found");
            }
            break;
        }

        nonce.increment();
    }
}

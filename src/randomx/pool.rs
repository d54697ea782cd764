//! VM pool: one RandomX VM per worker, re-keyed atomically on seed change
//!
//! Three layouts cover the mode matrix:
//!
//! - `LightFlat`: one shared cache, one VM per worker.
//! - `LightNuma`: one cache per NUMA node that has workers, allocated with
//!   that node preferred, plus the node's VMs. Keeps the 256 MB of hot
//!   cache memory local to the cores hashing against it.
//! - `FastFlat`: one shared ~2 GB dataset (initialized in parallel from a
//!   kept cache) with every VM bound to it. The dataset is not split per
//!   node.
//!
//! The pool is mutated only between mining sessions; during a session the
//! engine holds it immutable and workers operate on borrowed [`VmHandle`]s.

use crate::core::Hash256;
use crate::error::InitError;
use crate::numa::{self, Assignment, Topology};
use crate::randomx::{Cache, Dataset, Flags, Vm, VmHandle};
use std::time::Instant;
use tracing::{debug, info};

struct NodeSlot {
    /// Index into `Topology::nodes`
    node_index: usize,
    /// Hardware node id, for logging
    node_id: usize,
    cache: Cache,
    vms: Vec<Vm>,
}

enum Layout {
    LightFlat {
        cache: Cache,
        vms: Vec<Vm>,
    },
    LightNuma {
        nodes: Vec<NodeSlot>,
    },
    FastFlat {
        cache: Cache,
        dataset: Dataset,
        vms: Vec<Vm>,
    },
}

/// Owner of all RandomX state for the miner
pub struct VmPool {
    threads: usize,
    fast_mode: bool,
    seed: Option<Hash256>,
    layout: Option<Layout>,
}

impl VmPool {
    /// An empty pool; call [`VmPool::initialize`] before mining.
    pub fn new(threads: usize, fast_mode: bool) -> Self {
        Self {
            threads,
            fast_mode,
            seed: None,
            layout: None,
        }
    }

    /// Allocate and key every resource for the current thread count and
    /// topology. On failure everything acquired so far is released.
    pub fn initialize(
        &mut self,
        seed: &Hash256,
        topology: &Topology,
        assignment: &Assignment,
    ) -> Result<(), InitError> {
        let flags = Flags::recommended();
        let vm_flags = if self.fast_mode {
            flags.with_full_mem()
        } else {
            flags
        };

        info!(
            threads = self.threads,
            mode = if self.fast_mode { "fast" } else { "light" },
            flags = format_args!("0x{:x}", vm_flags.bits()),
            "initializing RandomX"
        );

        let layout = if self.fast_mode {
            self.init_fast(flags, vm_flags, seed)?
        } else if topology.numa_enabled {
            self.init_light_numa(flags, vm_flags, seed, topology, assignment)?
        } else {
            self.init_light_flat(flags, vm_flags, seed)?
        };

        self.layout = Some(layout);
        self.seed = Some(*seed);
        Ok(())
    }

    fn init_fast(
        &self,
        flags: Flags,
        vm_flags: Flags,
        seed: &Hash256,
    ) -> Result<Layout, InitError> {
        let cache = Cache::new(flags, seed.as_bytes())?;
        let dataset = Dataset::alloc(flags)?;

        let started = Instant::now();
        dataset.init_parallel(&cache, self.dataset_helpers());
        info!(
            elapsed_secs = format_args!("{:.1}", started.elapsed().as_secs_f64()),
            "RandomX dataset ready"
        );

        let mut vms = Vec::with_capacity(self.threads);
        for worker in 0..self.threads {
            vms.push(
                Vm::new(vm_flags, None, Some(&dataset))
                    .map_err(|_| InitError::VmCreate { worker })?,
            );
        }
        // The cache stays alive so a seed change only has to re-key it
        // instead of allocating a fresh one.
        Ok(Layout::FastFlat {
            cache,
            dataset,
            vms,
        })
    }

    fn init_light_flat(
        &self,
        flags: Flags,
        vm_flags: Flags,
        seed: &Hash256,
    ) -> Result<Layout, InitError> {
        let cache = Cache::new(flags, seed.as_bytes())?;
        let mut vms = Vec::with_capacity(self.threads);
        for worker in 0..self.threads {
            vms.push(
                Vm::new(vm_flags, Some(&cache), None)
                    .map_err(|_| InitError::VmCreate { worker })?,
            );
        }
        debug!(vms = self.threads, "created RandomX VMs from shared cache");
        Ok(Layout::LightFlat { cache, vms })
    }

    fn init_light_numa(
        &self,
        flags: Flags,
        vm_flags: Flags,
        seed: &Hash256,
        topology: &Topology,
        assignment: &Assignment,
    ) -> Result<Layout, InitError> {
        let mut nodes = Vec::new();
        for (node_index, node) in topology.nodes.iter().enumerate() {
            let workers = assignment.workers_on_node(node_index);
            if workers == 0 {
                continue;
            }

            numa::prefer_node(node.id);
            let slot = Self::init_node_slot(flags, vm_flags, seed, node_index, node.id, workers);
            numa::reset_preferred();

            let slot = slot?;
            info!(
                node = node.id,
                vms = workers,
                "allocated per-node RandomX cache"
            );
            nodes.push(slot);
        }
        Ok(Layout::LightNuma { nodes })
    }

    fn init_node_slot(
        flags: Flags,
        vm_flags: Flags,
        seed: &Hash256,
        node_index: usize,
        node_id: usize,
        workers: usize,
    ) -> Result<NodeSlot, InitError> {
        let cache = Cache::new(flags, seed.as_bytes())
            .map_err(|_| InitError::NodeCacheAlloc { node: node_id })?;
        let mut vms = Vec::with_capacity(workers);
        for _ in 0..workers {
            vms.push(
                Vm::new(vm_flags, Some(&cache), None)
                    .map_err(|_| InitError::NodeVmCreate { node: node_id })?,
            );
        }
        Ok(NodeSlot {
            node_index,
            node_id,
            cache,
            vms,
        })
    }

    /// Re-key every resource with a new seed. No-op when the seed is
    /// unchanged. The engine must have stopped the session first.
    pub fn update_seed(&mut self, seed: &Hash256) -> Result<(), InitError> {
        if self.seed.as_ref() == Some(seed) {
            debug!("seed unchanged, skipping update");
            return Ok(());
        }

        let vm_flags = if self.fast_mode {
            Flags::recommended().with_full_mem()
        } else {
            Flags::recommended()
        };

        let result = match self.layout.as_mut() {
            None => Err(InitError::NotInitialized),
            Some(Layout::LightFlat { cache, vms }) => {
                cache.reinit(seed.as_bytes());
                Self::recreate_vms(vms, vm_flags, cache, None)
            }
            Some(Layout::LightNuma { nodes }) => {
                let mut out = Ok(());
                for slot in nodes.iter_mut() {
                    slot.cache.reinit(seed.as_bytes());
                    if let Err(e) = Self::recreate_vms(
                        &mut slot.vms,
                        vm_flags,
                        &slot.cache,
                        Some(slot.node_id),
                    ) {
                        out = Err(e);
                        break;
                    }
                }
                out
            }
            Some(Layout::FastFlat {
                cache,
                dataset,
                vms,
            }) => {
                cache.reinit(seed.as_bytes());
                let started = Instant::now();
                dataset.init_parallel(cache, self.threads.min(num_cpus::get()));
                info!(
                    elapsed_secs = format_args!("{:.1}", started.elapsed().as_secs_f64()),
                    "RandomX dataset re-keyed"
                );
                // Same dataset pointer, fresh contents: rebinding is enough.
                for vm in vms.iter_mut() {
                    vm.rebind_dataset(dataset);
                }
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                self.seed = Some(*seed);
                Ok(())
            }
            Err(e) => {
                // A half-keyed pool would hash against the wrong epoch.
                self.layout = None;
                self.seed = None;
                Err(e)
            }
        }
    }

    fn recreate_vms(
        vms: &mut Vec<Vm>,
        vm_flags: Flags,
        cache: &Cache,
        node_id: Option<usize>,
    ) -> Result<(), InitError> {
        let count = vms.len();
        vms.clear();
        for worker in 0..count {
            let vm = Vm::new(vm_flags, Some(cache), None).map_err(|_| match node_id {
                Some(node) => InitError::NodeVmCreate { node },
                None => InitError::VmCreate { worker },
            })?;
            vms.push(vm);
        }
        Ok(())
    }

    /// Drop every VM, cache and dataset. The seed is cleared; the next
    /// [`VmPool::initialize`] starts from scratch.
    pub fn release(&mut self) {
        self.layout = None;
        self.seed = None;
    }

    /// Change the worker count on a released pool.
    pub fn set_threads(&mut self, threads: usize) {
        debug_assert!(self.layout.is_none(), "resize requires a released pool");
        self.threads = threads;
    }

    /// The VM for worker `i`, routed through the NUMA tables when the pool
    /// is partitioned per node.
    pub fn vm_handle_for_worker(
        &self,
        worker: usize,
        assignment: &Assignment,
    ) -> Option<VmHandle> {
        match self.layout.as_ref()? {
            Layout::LightFlat { vms, .. } | Layout::FastFlat { vms, .. } => {
                vms.get(worker).map(Vm::handle)
            }
            Layout::LightNuma { nodes } => {
                let node_index = *assignment.thread_to_node.get(worker)?;
                let slot = nodes.iter().find(|s| s.node_index == node_index)?;
                slot.vms
                    .get(assignment.rank_within_node(worker))
                    .map(Vm::handle)
            }
        }
    }

    /// Whether every worker currently has a seeded VM
    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    /// The seed the pool is currently keyed with
    pub fn current_seed(&self) -> Option<&Hash256> {
        self.seed.as_ref()
    }

    /// Configured worker count
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether the pool runs against a full dataset
    pub fn is_fast_mode(&self) -> bool {
        self.fast_mode
    }

    fn dataset_helpers(&self) -> usize {
        self.threads.min(num_cpus::get()).max(1)
    }
}

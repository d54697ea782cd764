//! NUMA topology discovery and worker placement
//!
//! On Linux with two or more configured NUMA nodes, each worker is pinned
//! to a specific CPU and light-mode caches are allocated with a node
//! preference so the hot Argon2 memory stays local. Everywhere else this
//! degrades to a single logical node covering every CPU, with pinning
//! still applied when the platform supports it.

use tracing::{debug, info, warn};

/// One NUMA node and its online CPUs
#[derive(Clone, Debug)]
pub struct Node {
    pub id: usize,
    pub cpu_ids: Vec<usize>,
}

/// The machine's NUMA layout as seen by the miner
#[derive(Clone, Debug)]
pub struct Topology {
    pub nodes: Vec<Node>,
    /// False when the machine has fewer than two nodes (or no NUMA
    /// support); per-node caches are pointless then.
    pub numa_enabled: bool,
}

impl Topology {
    /// Discover the topology, falling back to one flat node.
    pub fn detect() -> Self {
        match Self::detect_sysfs() {
            Some(topo) if topo.nodes.len() >= 2 => {
                info!(nodes = topo.nodes.len(), "NUMA topology detected");
                for node in &topo.nodes {
                    debug!(node = node.id, cpus = node.cpu_ids.len(), "NUMA node");
                }
                topo
            }
            _ => {
                debug!("single NUMA node or no NUMA support, using flat placement");
                Self::flat()
            }
        }
    }

    /// One logical node containing every CPU.
    pub fn flat() -> Self {
        let cpu_ids = core_affinity::get_core_ids()
            .map(|ids| ids.into_iter().map(|c| c.id).collect())
            .unwrap_or_else(|| (0..num_cpus::get()).collect());
        Self {
            nodes: vec![Node { id: 0, cpu_ids }],
            numa_enabled: false,
        }
    }

    #[cfg(target_os = "linux")]
    fn detect_sysfs() -> Option<Self> {
        let base = std::path::Path::new("/sys/devices/system/node");
        let mut nodes = Vec::new();

        for entry in std::fs::read_dir(base).ok()? {
            let entry = entry.ok()?;
            let name = entry.file_name();
            let name = name.to_str()?;
            let id: usize = match name.strip_prefix("node") {
                Some(rest) => rest.parse().ok()?,
                None => continue,
            };
            let cpulist = std::fs::read_to_string(entry.path().join("cpulist")).ok()?;
            let cpu_ids = parse_cpulist(cpulist.trim());
            if !cpu_ids.is_empty() {
                nodes.push(Node { id, cpu_ids });
            }
        }

        if nodes.is_empty() {
            return None;
        }
        nodes.sort_by_key(|n| n.id);
        let numa_enabled = nodes.len() >= 2;
        Some(Self {
            nodes,
            numa_enabled,
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn detect_sysfs() -> Option<Self> {
        None
    }
}

/// Parse a sysfs cpulist such as `0-3,8-11` or `0,2,4`.
fn parse_cpulist(list: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for part in list.split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                if let (Ok(lo), Ok(hi)) = (lo.trim().parse(), hi.trim().parse::<usize>()) {
                    cpus.extend(lo..=hi);
                }
            }
            None => {
                if let Ok(cpu) = part.trim().parse() {
                    cpus.push(cpu);
                }
            }
        }
    }
    cpus
}

/// Deterministic round-robin mapping of workers to nodes and CPUs
#[derive(Clone, Debug)]
pub struct Assignment {
    pub thread_to_node: Vec<usize>,
    pub thread_to_cpu: Vec<usize>,
}

impl Assignment {
    /// Place `threads` workers: worker `i` goes to node `i % node_count`,
    /// and within each node a rolling counter walks that node's CPU list.
    pub fn new(topology: &Topology, threads: usize) -> Self {
        let node_count = topology.nodes.len();
        let mut thread_to_node = Vec::with_capacity(threads);
        let mut thread_to_cpu = Vec::with_capacity(threads);
        let mut per_node_counter = vec![0usize; node_count];

        for t in 0..threads {
            let node = t % node_count;
            let cpus = &topology.nodes[node].cpu_ids;
            let cpu = cpus[per_node_counter[node] % cpus.len()];
            per_node_counter[node] += 1;
            thread_to_node.push(node);
            thread_to_cpu.push(cpu);
        }

        Self {
            thread_to_node,
            thread_to_cpu,
        }
    }

    /// Number of workers assigned to `node`
    pub fn workers_on_node(&self, node: usize) -> usize {
        self.thread_to_node.iter().filter(|&&n| n == node).count()
    }

    /// Position of worker `i` among the workers of its own node; indexes
    /// into that node's VM list.
    pub fn rank_within_node(&self, i: usize) -> usize {
        let node = self.thread_to_node[i];
        self.thread_to_node[..i]
            .iter()
            .filter(|&&n| n == node)
            .count()
    }
}

/// Pin the calling thread to one CPU. Best effort: a failure is logged and
/// the thread keeps running unpinned.
pub fn pin_current_thread(cpu_id: usize) -> bool {
    let pinned = core_affinity::set_for_current(core_affinity::CoreId { id: cpu_id });
    if !pinned {
        warn!(cpu_id, "failed to set thread affinity");
    }
    pinned
}

/// Prefer `node` for subsequent memory allocations on this thread.
#[cfg(target_os = "linux")]
pub fn prefer_node(node: usize) {
    const MPOL_PREFERRED: libc::c_int = 1;
    let mask: libc::c_ulong = 1 << node;
    let rc = unsafe {
        libc::syscall(
            libc::SYS_set_mempolicy,
            MPOL_PREFERRED,
            &mask as *const libc::c_ulong,
            (8 * std::mem::size_of::<libc::c_ulong>()) as libc::c_ulong,
        )
    };
    if rc != 0 {
        warn!(node, "set_mempolicy(MPOL_PREFERRED) failed");
    }
}

/// Restore the default allocation policy for this thread.
#[cfg(target_os = "linux")]
pub fn reset_preferred() {
    const MPOL_DEFAULT: libc::c_int = 0;
    unsafe {
        libc::syscall(
            libc::SYS_set_mempolicy,
            MPOL_DEFAULT,
            std::ptr::null::<libc::c_ulong>(),
            0 as libc::c_ulong,
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub fn prefer_node(_node: usize) {}

#[cfg(not(target_os = "linux"))]
pub fn reset_preferred() {}

//! NUMA-interleaved rank placement
//!
//! Ranks are spread round-robin over NUMA nodes: for every core offset inside
//! a node, one rank lands on each node before the offset advances by the
//! per-rank thread count. Job-launch scripts consume the result positionally,
//! so the order is part of the output format.

use std::fmt;

use log::{debug, info};

use crate::numa::topology::TopologyRecord;

/// Starting CPU ID of every rank, in rank order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    cpus: Vec<usize>,
}

impl PlacementPlan {
    pub fn cpus(&self) -> &[usize] {
        &self.cpus
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }
}

impl fmt::Display for PlacementPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, cpu) in self.cpus.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cpu)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// Every rank needs at least one thread.
    ZeroThreads,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::ZeroThreads => write!(f, "threads per rank must be at least 1"),
        }
    }
}

impl std::error::Error for PlanError {}

/// Compute the starting CPU of every rank.
///
/// Rank CPUs are `offset + node * cores_per_numa_node` with `offset` stepping
/// by `threads_per_rank` in the outer loop and `node` cycling in the inner
/// loop. A thread count larger than a NUMA node yields an empty plan.
pub fn plan(
    topology: &TopologyRecord,
    threads_per_rank: usize,
) -> Result<PlacementPlan, PlanError> {
    if threads_per_rank == 0 {
        return Err(PlanError::ZeroThreads);
    }

    let per_node = topology.cores_per_numa_node();
    if threads_per_rank > per_node {
        return Ok(PlacementPlan { cpus: Vec::new() });
    }

    let numa_nodes = topology.numa_nodes();
    let mut cpus = Vec::with_capacity(rank_count(topology, threads_per_rank));
    cpus.extend(
        (0..per_node)
            .step_by(threads_per_rank)
            .flat_map(|offset| (0..numa_nodes).map(move |node| offset + node * per_node)),
    );

    Ok(PlacementPlan { cpus })
}

/// Number of ranks [`plan`] produces for this topology.
pub fn rank_count(topology: &TopologyRecord, threads_per_rank: usize) -> usize {
    let per_node = topology.cores_per_numa_node();
    if threads_per_rank == 0 || threads_per_rank > per_node {
        return 0;
    }
    per_node.div_ceil(threads_per_rank) * topology.numa_nodes()
}

struct Settings<'a> {
    topology: &'a TopologyRecord,
    threads_per_rank: usize,
}

impl fmt::Display for Settings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} omp-threads={}", self.topology, self.threads_per_rank)
    }
}

/// Log the resolved settings at info and the placement at debug level
pub fn log_plan(topology: &TopologyRecord, threads_per_rank: usize, placement: &PlacementPlan) {
    info!(
        "Using settings: {}",
        Settings {
            topology,
            threads_per_rank
        }
    );
    debug!("CPU list: {}", placement);
}

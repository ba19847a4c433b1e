// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! NUMA (Non-Uniform Memory Access) utilities
//!
//! This module provides:
//! - NUMA node abstraction (`NumaNode`)
//! - Topology resolution from explicit values or `lscpu` (`topology`)
//! - A diagnostic summary of the discovered topology

use log::{info, warn};

pub mod topology;

use topology::{LscpuTopology, format_cpu_list};

/// Represents a NUMA node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NumaNode(pub u32);

impl std::fmt::Display for NumaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NUMA{}", self.0)
    }
}

/// Log a summary of the topology reported by `lscpu`
///
/// Uses `log::info!` and `log::warn!` for output. Make sure to initialize
/// logging before calling this function.
pub fn log_topology_summary(lscpu: &LscpuTopology) {
    info!("=== {} topology ===", lscpu.command());

    let cpu_info = match lscpu.query() {
        Ok(cpu_info) => cpu_info,
        Err(e) => {
            warn!("Failed to detect topology: {}", e);
            return;
        }
    };

    if let Some(model_name) = &cpu_info.model_name {
        info!("  Model: {}", model_name);
    }
    info!("  Sockets: {}", cpu_info.sockets);
    info!("  Cores per socket: {}", cpu_info.cores_per_socket);
    if let Some(threads) = cpu_info.threads_per_core {
        info!("  Threads per core: {}", threads);
    }
    info!("  NUMA nodes: {}", cpu_info.numa_nodes);

    for (node, cpus) in &cpu_info.numa_node_cpus {
        info!("  {}: {} CPUs ({})", node, cpus.len(), format_cpu_list(cpus));
    }

    match cpu_info.topology() {
        Ok(topology) => info!(
            "  Physical cores: {} ({} per NUMA node)",
            topology.total_cores(),
            topology.cores_per_numa_node()
        ),
        Err(e) => warn!("  Topology not usable for placement: {}", e),
    }
}

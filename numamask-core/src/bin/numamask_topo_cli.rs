// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Topology CLI
//!
//! Logs the machine topology as `lscpu` reports it, the same record
//! `numa-mask-gen --use-lscpu` plans against.
//!
//! Usage:
//!   cargo run --bin numamask_topo_cli [LSCPU_COMMAND]

use log::LevelFilter;
use numamask_core::logging;
use numamask_core::numa::log_topology_summary;
use numamask_core::numa::topology::LscpuTopology;

fn main() {
    logging::init_stderr(LevelFilter::Info);

    let lscpu = match std::env::args().nth(1) {
        Some(command) => LscpuTopology::new(command),
        None => LscpuTopology::default(),
    };
    log_topology_summary(&lscpu);
}

//! numa-mask-gen core
//!
//! Turns a machine topology (sockets, cores per socket, NUMA nodes) and a
//! per-rank thread count into the starting CPU of every MPI rank, spread
//! round-robin over NUMA nodes, and renders it as hex masks or a CPU list:
//! - `numa`: topology record, `lscpu` discovery, cpulist parsing
//! - `plan`: NUMA-interleaved rank placement
//! - `mask`: mask / CPU-list rendering
//! - `logging`: stderr logger setup

pub mod logging;
pub mod mask;
pub mod numa;
pub mod plan;

pub use mask::MaskFormat;
pub use numa::NumaNode;
pub use numa::topology::{
    CpuInfo, ExplicitTopology, LscpuTopology, MalformedRange, TopologyError, TopologyProvider,
    TopologyRecord,
};
pub use plan::{PlacementPlan, PlanError};

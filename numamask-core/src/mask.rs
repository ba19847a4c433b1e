//! Rendering a placement as launcher-friendly text

use log::warn;

use crate::numa::topology::TopologyRecord;
use crate::plan::PlacementPlan;

/// Output encoding of each rank's CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskFormat {
    /// `0x<bit><bit zero-padded to the topology width>`, covering the
    /// core and the mask word of its hyperthread sibling
    Hyperthread,
    /// `0x<bit>`
    Core,
    /// Decimal CPU ID
    CpuList,
}

impl MaskFormat {
    /// Pick the format from the command-line flags.
    ///
    /// A CPU list is only available without hyperthreads; asking for one
    /// otherwise logs a warning and keeps the hyperthread mask.
    pub fn from_flags(no_hyperthreads: bool, cpu_list: bool) -> Self {
        match (no_hyperthreads, cpu_list) {
            (false, true) => {
                warn!("Ignoring --cpu-list since using hyperthreads");
                MaskFormat::Hyperthread
            }
            (false, false) => MaskFormat::Hyperthread,
            (true, false) => MaskFormat::Core,
            (true, true) => MaskFormat::CpuList,
        }
    }
}

/// Hex digits used for the low mask word: a quarter of the core count
pub fn hex_width(total_cores: usize) -> usize {
    if total_cores >= 4 { total_cores / 4 } else { 1 }
}

/// Lowercase hex of `2^cpu`, any width, no prefix
fn bit_hex(cpu: usize) -> String {
    const LEADING: [char; 4] = ['1', '2', '4', '8'];

    let zeros = cpu / 4;
    let mut hex = String::with_capacity(zeros + 1);
    hex.push(LEADING[cpu % 4]);
    hex.extend(std::iter::repeat_n('0', zeros));
    hex
}

/// Render a single CPU in the given format
pub fn render_cpu(cpu: usize, format: MaskFormat, width: usize) -> String {
    match format {
        MaskFormat::Hyperthread => {
            let bit = bit_hex(cpu);
            format!("0x{bit}{bit:0>width$}")
        }
        MaskFormat::Core => format!("0x{}", bit_hex(cpu)),
        MaskFormat::CpuList => cpu.to_string(),
    }
}

/// Render every rank of the plan, comma separated
pub fn render(placement: &PlacementPlan, topology: &TopologyRecord, format: MaskFormat) -> String {
    let width = hex_width(topology.total_cores());
    placement
        .cpus()
        .iter()
        .map(|&cpu| render_cpu(cpu, format, width))
        .collect::<Vec<_>>()
        .join(",")
}

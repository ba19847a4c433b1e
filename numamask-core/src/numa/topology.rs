// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Machine topology detection
//!
//! This module builds a [`TopologyRecord`] either from explicit socket/core/NUMA
//! counts or from the output of `lscpu`. The `lscpu` text is parsed into a typed
//! [`CpuInfo`]; per-node CPU lists use the Linux cpulist format.

use std::fmt;
use std::process::Command;

use log::debug;

use super::NumaNode;

/// Shape of the machine: identical sockets, identical NUMA nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyRecord {
    sockets: usize,
    cores_per_socket: usize,
    numa_nodes: usize,
}

impl TopologyRecord {
    /// Build a record, rejecting zero counts and NUMA splits that do not
    /// divide the physical cores evenly.
    pub fn new(
        sockets: usize,
        cores_per_socket: usize,
        numa_nodes: usize,
    ) -> Result<Self, TopologyError> {
        let invalid: Vec<InvalidField> = [
            (TopologyField::Sockets, sockets),
            (TopologyField::CoresPerSocket, cores_per_socket),
            (TopologyField::NumaNodes, numa_nodes),
        ]
        .into_iter()
        .filter(|(_, value)| *value == 0)
        .map(|(field, _)| InvalidField {
            field,
            received: Some(0),
        })
        .collect();
        if !invalid.is_empty() {
            return Err(TopologyError::InvalidFields(invalid));
        }

        let total_cores = sockets
            .checked_mul(cores_per_socket)
            .ok_or(TopologyError::CoreCountOverflow {
                sockets,
                cores_per_socket,
            })?;

        if total_cores % numa_nodes != 0 {
            return Err(TopologyError::UnevenNumaSplit {
                total_cores,
                numa_nodes,
            });
        }

        Ok(Self {
            sockets,
            cores_per_socket,
            numa_nodes,
        })
    }

    pub fn sockets(&self) -> usize {
        self.sockets
    }

    pub fn cores_per_socket(&self) -> usize {
        self.cores_per_socket
    }

    pub fn numa_nodes(&self) -> usize {
        self.numa_nodes
    }

    /// Number of physical cores on the machine
    pub fn total_cores(&self) -> usize {
        self.sockets * self.cores_per_socket
    }

    /// Number of physical cores in each NUMA node
    pub fn cores_per_numa_node(&self) -> usize {
        self.total_cores() / self.numa_nodes
    }

    /// NUMA node owning a physical core, assuming nodes hold contiguous core IDs
    #[cfg(test)]
    pub(crate) fn numa_node_of(&self, cpu: usize) -> Option<NumaNode> {
        if cpu >= self.total_cores() {
            return None;
        }
        u32::try_from(cpu / self.cores_per_numa_node())
            .ok()
            .map(NumaNode)
    }
}

impl fmt::Display for TopologyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sockets={} cores-per-socket={} numa-nodes={} total-cores={} cores-per-numa-node={}",
            self.sockets,
            self.cores_per_socket,
            self.numa_nodes,
            self.total_cores(),
            self.cores_per_numa_node()
        )
    }
}

/// User-facing topology fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyField {
    Sockets,
    CoresPerSocket,
    NumaNodes,
}

impl fmt::Display for TopologyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyField::Sockets => write!(f, "sockets"),
            TopologyField::CoresPerSocket => write!(f, "cores-per-socket"),
            TopologyField::NumaNodes => write!(f, "numa-nodes"),
        }
    }
}

/// A topology field that was missing or not positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidField {
    pub field: TopologyField,
    /// `None` when the field was never supplied
    pub received: Option<i64>,
}

impl fmt::Display for InvalidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.received {
            Some(value) => write!(f, "{} = {}", self.field, value),
            None => write!(f, "{} = <unset>", self.field),
        }
    }
}

/// Errors that can occur while resolving the machine topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The topology query could not run or its output was unusable.
    Unavailable(String),
    /// Explicit topology values were missing or not positive.
    InvalidFields(Vec<InvalidField>),
    /// The NUMA node count does not divide the physical core count.
    UnevenNumaSplit {
        total_cores: usize,
        numa_nodes: usize,
    },
    /// sockets * cores-per-socket does not fit in a machine word.
    CoreCountOverflow {
        sockets: usize,
        cores_per_socket: usize,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::Unavailable(reason) => write!(
                f,
                "unable to gather node CPU and memory information ({}); \
                 try again using --sockets, --cores-per-socket and --numa-nodes",
                reason
            ),
            TopologyError::InvalidFields(fields) => {
                write!(
                    f,
                    "must supply positive integers for --sockets, --cores-per-socket \
                     and --numa-nodes; received "
                )?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                Ok(())
            }
            TopologyError::UnevenNumaSplit {
                total_cores,
                numa_nodes,
            } => write!(
                f,
                "{} physical cores cannot be split evenly across {} NUMA nodes",
                total_cores, numa_nodes
            ),
            TopologyError::CoreCountOverflow {
                sockets,
                cores_per_socket,
            } => write!(
                f,
                "{} sockets of {} cores overflow the core count",
                sockets, cores_per_socket
            ),
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<MalformedRange> for TopologyError {
    fn from(err: MalformedRange) -> Self {
        TopologyError::Unavailable(format!("malformed CPU list: {}", err))
    }
}

/// Source of a [`TopologyRecord`].
///
/// The command-line tool picks explicit values or `lscpu`; tests hand in a
/// fixed record.
pub trait TopologyProvider {
    fn resolve(&self) -> Result<TopologyRecord, TopologyError>;
}

impl TopologyProvider for TopologyRecord {
    fn resolve(&self) -> Result<TopologyRecord, TopologyError> {
        Ok(*self)
    }
}

/// Resolve the topology from auto-discovery or from explicit values.
///
/// With `use_auto_discovery` set the explicit values are ignored entirely.
pub fn resolve(
    use_auto_discovery: bool,
    explicit: &ExplicitTopology,
    discovery: &dyn TopologyProvider,
) -> Result<TopologyRecord, TopologyError> {
    if use_auto_discovery {
        discovery.resolve()
    } else {
        explicit.resolve()
    }
}

/// Topology supplied on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitTopology {
    pub sockets: Option<i64>,
    pub cores_per_socket: Option<i64>,
    pub numa_nodes: Option<i64>,
}

impl TopologyProvider for ExplicitTopology {
    fn resolve(&self) -> Result<TopologyRecord, TopologyError> {
        let fields = [
            (TopologyField::Sockets, self.sockets),
            (TopologyField::CoresPerSocket, self.cores_per_socket),
            (TopologyField::NumaNodes, self.numa_nodes),
        ];

        let mut values = [0usize; 3];
        let mut invalid = Vec::new();
        for (slot, (field, received)) in values.iter_mut().zip(fields) {
            match received.and_then(|v| usize::try_from(v).ok()).filter(|v| *v > 0) {
                Some(value) => *slot = value,
                None => invalid.push(InvalidField { field, received }),
            }
        }
        if !invalid.is_empty() {
            return Err(TopologyError::InvalidFields(invalid));
        }

        let [sockets, cores_per_socket, numa_nodes] = values;
        TopologyRecord::new(sockets, cores_per_socket, numa_nodes)
    }
}

/// Topology discovered by running `lscpu`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LscpuTopology {
    command: String,
}

impl Default for LscpuTopology {
    fn default() -> Self {
        Self::new("lscpu")
    }
}

impl LscpuTopology {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the query command and parse its output.
    ///
    /// Blocks until the command exits; no timeout is applied.
    pub fn query(&self) -> Result<CpuInfo, TopologyError> {
        // Field labels are only stable in the C locale
        let output = Command::new(&self.command)
            .env("LC_ALL", "C")
            .output()
            .map_err(|e| {
                TopologyError::Unavailable(format!("failed to run '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TopologyError::Unavailable(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        CpuInfo::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

impl TopologyProvider for LscpuTopology {
    fn resolve(&self) -> Result<TopologyRecord, TopologyError> {
        let info = self.query()?;
        debug!("{} reported:\n{}", self.command, info);
        info.topology()
    }
}

/// Typed view of the `lscpu` fields this tool cares about
///
/// Only sockets, cores per socket and NUMA node count are required; the rest
/// is kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInfo {
    pub architecture: Option<String>,
    pub cpu_op_modes: Option<String>,
    pub byte_order: Option<String>,
    pub address_sizes: Option<String>,
    pub cpus: Option<usize>,
    pub online_cpus: Option<Vec<usize>>,
    pub threads_per_core: Option<usize>,
    pub cores_per_socket: usize,
    pub sockets: usize,
    pub numa_nodes: usize,
    pub vendor_id: Option<String>,
    pub cpu_family: Option<String>,
    pub model: Option<String>,
    pub model_name: Option<String>,
    pub stepping: Option<String>,
    pub cpu_mhz: Option<f64>,
    pub cpu_max_mhz: Option<f64>,
    pub cpu_min_mhz: Option<f64>,
    pub bogomips: Option<f64>,
    pub virtualization: Option<String>,
    pub l1d_cache: Option<String>,
    pub l1i_cache: Option<String>,
    pub l2_cache: Option<String>,
    pub l3_cache: Option<String>,
    /// CPU list of every NUMA node, ordered by node index
    pub numa_node_cpus: Vec<(NumaNode, Vec<usize>)>,
    pub flags: Vec<String>,
}

impl CpuInfo {
    /// Parse `lscpu` output made of `Key: value` lines.
    ///
    /// Each line is split at its first colon. Unknown keys are ignored; a
    /// non-blank line without a colon, a missing required key or a value that
    /// does not parse makes the whole output unusable.
    pub fn parse(text: &str) -> Result<Self, TopologyError> {
        let mut info = CpuInfo::default();
        let mut sockets = None;
        let mut cores_per_socket = None;
        let mut numa_nodes = None;

        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                return Err(TopologyError::Unavailable(format!(
                    "line {} has no key/value delimiter: '{}'",
                    lineno + 1,
                    line.trim()
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "Architecture" => info.architecture = Some(value.to_string()),
                "CPU op-mode(s)" => info.cpu_op_modes = Some(value.to_string()),
                "Byte Order" => info.byte_order = Some(value.to_string()),
                "Address sizes" => info.address_sizes = Some(value.to_string()),
                "CPU(s)" => info.cpus = Some(parse_count(key, value)?),
                "On-line CPU(s) list" => info.online_cpus = Some(parse_cpulist_field(key, value)?),
                "Thread(s) per core" => info.threads_per_core = Some(parse_count(key, value)?),
                "Core(s) per socket" => cores_per_socket = Some(parse_count(key, value)?),
                "Socket(s)" => sockets = Some(parse_count(key, value)?),
                "NUMA node(s)" => numa_nodes = Some(parse_count(key, value)?),
                "Vendor ID" => info.vendor_id = Some(value.to_string()),
                "CPU family" => info.cpu_family = Some(value.to_string()),
                "Model" => info.model = Some(value.to_string()),
                "Model name" => info.model_name = Some(value.to_string()),
                "Stepping" => info.stepping = Some(value.to_string()),
                "CPU MHz" => info.cpu_mhz = Some(parse_mhz(key, value)?),
                "CPU max MHz" => info.cpu_max_mhz = Some(parse_mhz(key, value)?),
                "CPU min MHz" => info.cpu_min_mhz = Some(parse_mhz(key, value)?),
                "BogoMIPS" => info.bogomips = Some(parse_mhz(key, value)?),
                "Virtualization" => info.virtualization = Some(value.to_string()),
                "L1d cache" => info.l1d_cache = Some(value.to_string()),
                "L1i cache" => info.l1i_cache = Some(value.to_string()),
                "L2 cache" => info.l2_cache = Some(value.to_string()),
                "L3 cache" => info.l3_cache = Some(value.to_string()),
                "Flags" => info.flags = value.split_whitespace().map(str::to_string).collect(),
                _ => {
                    if let Some(node) = numa_node_index(key) {
                        info.numa_node_cpus
                            .push((node, parse_cpulist_field(key, value)?));
                    }
                }
            }
        }

        info.numa_node_cpus.sort_by_key(|(node, _)| *node);

        let missing = |key: &str| TopologyError::Unavailable(format!("missing '{}' field", key));
        info.sockets = sockets.ok_or_else(|| missing("Socket(s)"))?;
        info.cores_per_socket = cores_per_socket.ok_or_else(|| missing("Core(s) per socket"))?;
        info.numa_nodes = numa_nodes.ok_or_else(|| missing("NUMA node(s)"))?;

        Ok(info)
    }

    /// The placement-relevant part of this record
    pub fn topology(&self) -> Result<TopologyRecord, TopologyError> {
        TopologyRecord::new(self.sockets, self.cores_per_socket, self.numa_nodes)
    }
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn line<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            name: &str,
            value: Option<T>,
        ) -> fmt::Result {
            match value {
                Some(value) => writeln!(f, "  {} {}", name, value),
                None => Ok(()),
            }
        }

        let online = self.online_cpus.as_deref().map(format_cpu_list);

        line(f, "architecture", self.architecture.as_ref())?;
        line(f, "cpu_op_modes", self.cpu_op_modes.as_ref())?;
        line(f, "byte_order", self.byte_order.as_ref())?;
        line(f, "address_sizes", self.address_sizes.as_ref())?;
        line(f, "cpus", self.cpus)?;
        line(f, "cpus_online", online)?;
        line(f, "threads_per_core", self.threads_per_core)?;
        line(f, "cores_per_socket", Some(self.cores_per_socket))?;
        line(f, "sockets", Some(self.sockets))?;
        line(f, "numa_nodes", Some(self.numa_nodes))?;
        line(f, "vendor_id", self.vendor_id.as_ref())?;
        line(f, "cpu_family", self.cpu_family.as_ref())?;
        line(f, "model", self.model.as_ref())?;
        line(f, "model_name", self.model_name.as_ref())?;
        line(f, "stepping", self.stepping.as_ref())?;
        line(f, "cpu_mhz", self.cpu_mhz)?;
        line(f, "cpu_max_mhz", self.cpu_max_mhz)?;
        line(f, "cpu_min_mhz", self.cpu_min_mhz)?;
        line(f, "bogomips", self.bogomips)?;
        line(f, "virtualization", self.virtualization.as_ref())?;
        line(f, "l1d_cache", self.l1d_cache.as_ref())?;
        line(f, "l1i_cache", self.l1i_cache.as_ref())?;
        line(f, "l2_cache", self.l2_cache.as_ref())?;
        line(f, "l3_cache", self.l3_cache.as_ref())?;
        for (node, cpus) in &self.numa_node_cpus {
            writeln!(f, "  {} cpus {}", node, format_cpu_list(cpus))?;
        }
        write!(f, "  flags {}", self.flags.join(" "))
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, TopologyError> {
    value.parse().map_err(|_| {
        TopologyError::Unavailable(format!("'{}' is not an integer: '{}'", key, value))
    })
}

fn parse_mhz(key: &str, value: &str) -> Result<f64, TopologyError> {
    value.parse().map_err(|_| {
        TopologyError::Unavailable(format!("'{}' is not a number: '{}'", key, value))
    })
}

fn parse_cpulist_field(key: &str, value: &str) -> Result<Vec<usize>, TopologyError> {
    parse_cpulist(value)
        .map_err(|e| TopologyError::Unavailable(format!("malformed CPU list in '{}': {}", key, e)))
}

/// Match `NUMA node<N> CPU(s)` keys
fn numa_node_index(key: &str) -> Option<NumaNode> {
    key.strip_prefix("NUMA node")?
        .strip_suffix(" CPU(s)")?
        .parse()
        .ok()
        .map(NumaNode)
}

/// A CPU list that is not in cpulist format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedRange {
    /// A token that is not a non-negative integer
    InvalidCpuId(String),
    /// A range such as `0-3-7`
    TooManyEndpoints(String),
    /// A list expanding past [`MAX_CPULIST_LEN`] IDs
    RangeTooLarge(String),
}

impl fmt::Display for MalformedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRange::InvalidCpuId(token) => write!(f, "invalid CPU ID: '{}'", token),
            MalformedRange::TooManyEndpoints(part) => {
                write!(f, "range has more than two endpoints: '{}'", part)
            }
            MalformedRange::RangeTooLarge(part) => write!(
                f,
                "range expands past {} CPU IDs: '{}'",
                MAX_CPULIST_LEN, part
            ),
        }
    }
}

impl std::error::Error for MalformedRange {}

/// Upper bound on the IDs a single cpulist may expand to; far above any
/// kernel's `NR_CPUS`.
pub const MAX_CPULIST_LEN: usize = 1 << 20;

/// Parse Linux cpulist format
///
/// IDs come back in input order, ranges expanded inclusively. A descending
/// range such as `5-3` contributes nothing. Lists expanding to more than
/// [`MAX_CPULIST_LEN`] IDs are rejected.
///
/// Examples:
/// - "0-3" -> [0,1,2,3]
/// - "0-3,8,10-11" -> [0,1,2,3,8,10,11]
/// - "8,0-1" -> [8,0,1]
pub fn parse_cpulist(cpulist: &str) -> Result<Vec<usize>, MalformedRange> {
    let mut cpus = Vec::new();

    // Memory-only nodes report an empty list
    let cpulist = cpulist.trim();
    if cpulist.is_empty() {
        return Ok(cpus);
    }

    for part in cpulist.split(',') {
        let part = part.trim();
        let bounds: Vec<&str> = part.split('-').collect();
        match bounds.as_slice() {
            [cpu] => {
                if cpus.len() >= MAX_CPULIST_LEN {
                    return Err(MalformedRange::RangeTooLarge(part.to_string()));
                }
                cpus.push(parse_cpu_id(cpu)?);
            }
            [start, end] => {
                let start = parse_cpu_id(start)?;
                let end = parse_cpu_id(end)?;
                if end >= start && end - start >= MAX_CPULIST_LEN - cpus.len() {
                    return Err(MalformedRange::RangeTooLarge(part.to_string()));
                }
                cpus.extend(start..=end);
            }
            _ => return Err(MalformedRange::TooManyEndpoints(part.to_string())),
        }
    }

    Ok(cpus)
}

fn parse_cpu_id(token: &str) -> Result<usize, MalformedRange> {
    let token = token.trim();
    token
        .parse()
        .map_err(|_| MalformedRange::InvalidCpuId(token.to_string()))
}

/// Format a list of CPUs into a compact range representation
///
/// Example: [0, 1, 2, 3, 8, 9, 10] -> "0-3,8-10"
pub fn format_cpu_list(cpus: &[usize]) -> String {
    let Some((&first, rest)) = cpus.split_first() else {
        return String::new();
    };

    let mut result = Vec::new();
    let mut start = first;
    let mut prev = first;

    for &cpu in rest {
        if cpu == prev + 1 {
            prev = cpu;
            continue;
        }
        result.push(format_run(start, prev));
        start = cpu;
        prev = cpu;
    }
    result.push(format_run(start, prev));

    result.join(",")
}

fn format_run(start: usize, end: usize) -> String {
    if start == end {
        format!("{}", start)
    } else {
        format!("{}-{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL_SOCKET_LSCPU: &str = "\
Architecture:        x86_64
CPU op-mode(s):      32-bit, 64-bit
Byte Order:          Little Endian
Address sizes:       46 bits physical, 48 bits virtual
CPU(s):              16
On-line CPU(s) list: 0-15
Thread(s) per core:  2
Core(s) per socket:  4
Socket(s):           2
NUMA node(s):        2
Vendor ID:           GenuineIntel
CPU family:          6
Model:               85
Model name:          Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz
Stepping:            4
CPU MHz:             2100.000
CPU max MHz:         3700.0000
CPU min MHz:         1000.0000
BogoMIPS:            4200.00
Virtualization:      VT-x
L1d cache:           32K
L1i cache:           32K
L2 cache:            1024K
L3 cache:            22528K
NUMA node0 CPU(s):   0-3,8-11
NUMA node1 CPU(s):   4-7,12-15
Vulnerability Mds:   Mitigation; Clear CPU buffers; SMT vulnerable
Flags:               fpu vme de pse tsc
";

    #[test]
    fn test_parse_cpulist_range() {
        assert_eq!(parse_cpulist("0-3").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_cpulist_mixed() {
        assert_eq!(
            parse_cpulist("0-3,8,10-11").unwrap(),
            vec![0, 1, 2, 3, 8, 10, 11]
        );
    }

    #[test]
    fn test_parse_cpulist_keeps_input_order() {
        assert_eq!(parse_cpulist("8,0-1,1").unwrap(), vec![8, 0, 1, 1]);
    }

    #[test]
    fn test_parse_cpulist_descending_range_is_empty() {
        assert_eq!(parse_cpulist("5-3,7").unwrap(), vec![7]);
    }

    #[test]
    fn test_parse_cpulist_empty() {
        assert!(parse_cpulist("").unwrap().is_empty());
        assert!(parse_cpulist("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_cpulist_hyperthreading() {
        // Physical cores 0-15, HT siblings 32-47
        let cpus = parse_cpulist("0-15,32-47").unwrap();
        assert_eq!(cpus.len(), 32);
        assert_eq!(cpus[15], 15);
        assert_eq!(cpus[16], 32);
    }

    #[test]
    fn test_parse_cpulist_rejects_non_integer() {
        assert_eq!(
            parse_cpulist("0-3,x"),
            Err(MalformedRange::InvalidCpuId("x".to_string()))
        );
        assert_eq!(
            parse_cpulist("0-"),
            Err(MalformedRange::InvalidCpuId(String::new()))
        );
        assert!(parse_cpulist("0,,1").is_err());
    }

    #[test]
    fn test_parse_cpulist_rejects_three_endpoints() {
        assert_eq!(
            parse_cpulist("0-3-7"),
            Err(MalformedRange::TooManyEndpoints("0-3-7".to_string()))
        );
    }

    #[test]
    fn test_parse_cpulist_rejects_huge_range() {
        assert_eq!(
            parse_cpulist("0-18446744073709551615"),
            Err(MalformedRange::RangeTooLarge(
                "0-18446744073709551615".to_string()
            ))
        );
        // Many ranges that only overflow together
        let many = vec!["0-65535"; 17].join(",");
        assert!(matches!(
            parse_cpulist(&many),
            Err(MalformedRange::RangeTooLarge(_))
        ));
        // Exactly at the bound is fine
        let max = format!("0-{}", MAX_CPULIST_LEN - 1);
        assert_eq!(parse_cpulist(&max).unwrap().len(), MAX_CPULIST_LEN);
    }

    #[test]
    fn test_parse_lscpu_huge_numa_range_is_unavailable() {
        let text = "Socket(s): 1\nCore(s) per socket: 4\nNUMA node(s): 1\n\
                    NUMA node0 CPU(s): 0-18446744073709551615\n";
        let err = CpuInfo::parse(text).unwrap_err();
        let TopologyError::Unavailable(reason) = err else {
            panic!("expected unavailable, got {err:?}");
        };
        assert!(reason.contains("NUMA node0 CPU(s)"));
    }

    #[test]
    fn test_format_cpu_list() {
        assert_eq!(format_cpu_list(&[]), "");
        assert_eq!(format_cpu_list(&[0]), "0");
        assert_eq!(format_cpu_list(&[0, 1, 2, 3]), "0-3");
        assert_eq!(format_cpu_list(&[0, 2, 4]), "0,2,4");
        assert_eq!(format_cpu_list(&[0, 1, 2, 4, 6, 7, 8]), "0-2,4,6-8");
    }

    #[test]
    fn test_record_derived_values() {
        let topology = TopologyRecord::new(2, 4, 2).unwrap();
        assert_eq!(topology.total_cores(), 8);
        assert_eq!(topology.cores_per_numa_node(), 4);
        assert_eq!(topology.numa_node_of(3), Some(NumaNode(0)));
        assert_eq!(topology.numa_node_of(4), Some(NumaNode(1)));
        assert_eq!(topology.numa_node_of(8), None);
    }

    #[test]
    fn test_record_rejects_uneven_split() {
        assert_eq!(
            TopologyRecord::new(2, 4, 3),
            Err(TopologyError::UnevenNumaSplit {
                total_cores: 8,
                numa_nodes: 3
            })
        );
        // More nodes than cores
        assert!(matches!(
            TopologyRecord::new(1, 2, 4),
            Err(TopologyError::UnevenNumaSplit { .. })
        ));
    }

    #[test]
    fn test_record_rejects_zero() {
        let err = TopologyRecord::new(0, 4, 0).unwrap_err();
        let TopologyError::InvalidFields(fields) = err else {
            panic!("expected invalid fields, got {err:?}");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field).collect();
        assert_eq!(names, vec![TopologyField::Sockets, TopologyField::NumaNodes]);
    }

    #[test]
    fn test_explicit_topology_resolves() {
        let explicit = ExplicitTopology {
            sockets: Some(2),
            cores_per_socket: Some(4),
            numa_nodes: Some(2),
        };
        assert_eq!(explicit.resolve(), TopologyRecord::new(2, 4, 2));
    }

    #[test]
    fn test_explicit_topology_lists_every_bad_field() {
        let explicit = ExplicitTopology {
            sockets: None,
            cores_per_socket: Some(4),
            numa_nodes: Some(-3),
        };
        let err = explicit.resolve().unwrap_err();
        assert_eq!(
            err,
            TopologyError::InvalidFields(vec![
                InvalidField {
                    field: TopologyField::Sockets,
                    received: None
                },
                InvalidField {
                    field: TopologyField::NumaNodes,
                    received: Some(-3)
                },
            ])
        );
        let msg = err.to_string();
        assert!(msg.contains("sockets = <unset>"));
        assert!(msg.contains("numa-nodes = -3"));
        assert!(!msg.contains("cores-per-socket = 4"));
    }

    #[test]
    fn test_resolve_ignores_explicit_when_discovering() {
        let discovered = TopologyRecord::new(1, 8, 1).unwrap();
        let explicit = ExplicitTopology::default();
        assert_eq!(resolve(true, &explicit, &discovered), Ok(discovered));
        assert!(matches!(
            resolve(false, &explicit, &discovered),
            Err(TopologyError::InvalidFields(_))
        ));
    }

    #[test]
    fn test_parse_lscpu_dual_socket() {
        let info = CpuInfo::parse(DUAL_SOCKET_LSCPU).unwrap();
        assert_eq!(info.sockets, 2);
        assert_eq!(info.cores_per_socket, 4);
        assert_eq!(info.numa_nodes, 2);
        assert_eq!(info.cpus, Some(16));
        assert_eq!(info.threads_per_core, Some(2));
        assert_eq!(info.online_cpus.as_deref(), Some(&(0..16).collect::<Vec<_>>()[..]));
        assert_eq!(info.cpu_max_mhz, Some(3700.0));
        assert_eq!(
            info.model_name.as_deref(),
            Some("Intel(R) Xeon(R) Gold 6130 CPU @ 2.10GHz")
        );
        assert_eq!(
            info.numa_node_cpus,
            vec![
                (NumaNode(0), vec![0, 1, 2, 3, 8, 9, 10, 11]),
                (NumaNode(1), vec![4, 5, 6, 7, 12, 13, 14, 15]),
            ]
        );
        assert_eq!(info.flags, vec!["fpu", "vme", "de", "pse", "tsc"]);
        assert_eq!(info.topology(), TopologyRecord::new(2, 4, 2));
    }

    #[test]
    fn test_parse_lscpu_orders_nodes_numerically() {
        let text = "Socket(s): 1\nCore(s) per socket: 12\nNUMA node(s): 12\n\
                    NUMA node10 CPU(s): 10\nNUMA node2 CPU(s): 2\nNUMA node0 CPU(s): 0\n";
        let info = CpuInfo::parse(text).unwrap();
        let nodes: Vec<_> = info.numa_node_cpus.iter().map(|(n, _)| *n).collect();
        assert_eq!(nodes, vec![NumaNode(0), NumaNode(2), NumaNode(10)]);
    }

    #[test]
    fn test_parse_lscpu_minimal() {
        let info = CpuInfo::parse("Socket(s): 1\nCore(s) per socket: 4\nNUMA node(s): 1\n").unwrap();
        assert_eq!(info.architecture, None);
        assert!(info.numa_node_cpus.is_empty());
        assert_eq!(info.topology(), TopologyRecord::new(1, 4, 1));
    }

    #[test]
    fn test_parse_lscpu_missing_key() {
        let err = CpuInfo::parse("Socket(s): 2\nCore(s) per socket: 4\n").unwrap_err();
        assert_eq!(
            err,
            TopologyError::Unavailable("missing 'NUMA node(s)' field".to_string())
        );
    }

    #[test]
    fn test_parse_lscpu_non_integer() {
        let err = CpuInfo::parse("Socket(s): two\nCore(s) per socket: 4\nNUMA node(s): 1\n")
            .unwrap_err();
        assert!(matches!(err, TopologyError::Unavailable(_)));
    }

    #[test]
    fn test_parse_lscpu_line_without_delimiter() {
        let err = CpuInfo::parse("Socket(s): 2\ngarbage\n").unwrap_err();
        let TopologyError::Unavailable(reason) = err else {
            panic!("expected unavailable, got {err:?}");
        };
        assert!(reason.contains("line 2"));
    }

    #[test]
    fn test_parse_lscpu_malformed_numa_list() {
        let text = "Socket(s): 1\nCore(s) per socket: 4\nNUMA node(s): 1\nNUMA node0 CPU(s): 0-1-3\n";
        assert!(matches!(
            CpuInfo::parse(text),
            Err(TopologyError::Unavailable(_))
        ));
    }

    #[test]
    fn test_cpu_info_display_dumps_fields() {
        let info = CpuInfo::parse(DUAL_SOCKET_LSCPU).unwrap();
        let dump = info.to_string();
        assert!(dump.contains("  architecture x86_64"));
        assert!(dump.contains("  cpus_online 0-15"));
        assert!(dump.contains("  NUMA1 cpus 4-7,12-15"));
        assert!(dump.ends_with("  flags fpu vme de pse tsc"));
    }

    #[test]
    fn test_lscpu_missing_command_is_unavailable() {
        let lscpu = LscpuTopology::new("/nonexistent/numamask-lscpu");
        assert!(matches!(
            lscpu.resolve(),
            Err(TopologyError::Unavailable(_))
        ));
    }

    #[test]
    fn test_malformed_range_converts_to_unavailable() {
        let err: TopologyError = MalformedRange::InvalidCpuId("x".to_string()).into();
        assert!(matches!(err, TopologyError::Unavailable(_)));
    }
}

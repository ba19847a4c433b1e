//! numa-mask-gen
//!
//! Generates CPU masks for MPI/OpenMP process pinning. Topology comes either
//! from `--sockets/--cores-per-socket/--numa-nodes` or from `lscpu`; the mask
//! line goes to stdout, every diagnostic to stderr.

use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::error;
use numamask_core::logging;
use numamask_core::mask::{self, MaskFormat};
use numamask_core::numa::topology::{self, ExplicitTopology, LscpuTopology, TopologyProvider};
use numamask_core::plan::{self, PlanError};
use numamask_core::TopologyError;

#[derive(Parser, Debug)]
#[command(
    name = "numa-mask-gen",
    about = "Generate a CPU mask for MPI processor pinning"
)]
pub struct Cli {
    /// Number of OpenMP threads per rank
    #[arg(
        long,
        value_name = "OMP_THREADS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub threads: u32,

    /// Number of sockets per node
    #[arg(long, value_name = "NUM_SOCKETS", allow_negative_numbers = true)]
    pub sockets: Option<i64>,

    /// Number of cores per socket
    #[arg(long, value_name = "CORES_PER_SOCKET", allow_negative_numbers = true)]
    pub cores_per_socket: Option<i64>,

    /// Number of NUMA memory zones
    #[arg(long, value_name = "NUM_NUMA_NODES", allow_negative_numbers = true)]
    pub numa_nodes: Option<i64>,

    /// Use `lscpu` to determine the topology; all values but --threads are ignored
    #[arg(long, default_value_t = false)]
    pub use_lscpu: bool,

    /// Topology query command used by --use-lscpu
    #[arg(long, env = "NUMAMASK_LSCPU", default_value = "lscpu")]
    pub lscpu_command: String,

    /// Be verbose on stderr (-v settings, -vv topology and CPU list)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not include the core's hyperthread in the mask
    #[arg(long, default_value_t = false)]
    pub no_hyperthreads: bool,

    /// Print CPU IDs instead of a hex mask; ignored unless --no-hyperthreads is set
    #[arg(long, default_value_t = false)]
    pub cpu_list: bool,
}

impl Cli {
    pub fn explicit_topology(&self) -> ExplicitTopology {
        ExplicitTopology {
            sockets: self.sockets,
            cores_per_socket: self.cores_per_socket,
            numa_nodes: self.numa_nodes,
        }
    }
}

/// Errors that end a run with exit code 1.
#[derive(Debug)]
pub enum RunError {
    Topology(TopologyError),
    Plan(PlanError),
    Output(io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Topology(e) => write!(f, "{}", e),
            RunError::Plan(e) => write!(f, "{}", e),
            RunError::Output(e) => write!(f, "failed to write mask: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Topology(e) => Some(e),
            RunError::Plan(e) => Some(e),
            RunError::Output(e) => Some(e),
        }
    }
}

impl From<TopologyError> for RunError {
    fn from(err: TopologyError) -> Self {
        RunError::Topology(err)
    }
}

impl From<PlanError> for RunError {
    fn from(err: PlanError) -> Self {
        RunError::Plan(err)
    }
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::Output(err)
    }
}

/// Resolve, plan and render, writing the mask line to `out`.
///
/// `discovery` is consulted only with `--use-lscpu`. Nothing is written to
/// `out` unless every step succeeds.
pub fn run_with<W: Write>(
    cli: &Cli,
    discovery: &dyn TopologyProvider,
    out: &mut W,
) -> Result<(), RunError> {
    let format = MaskFormat::from_flags(cli.no_hyperthreads, cli.cpu_list);

    let topology = topology::resolve(cli.use_lscpu, &cli.explicit_topology(), discovery)?;
    let threads = cli.threads as usize;
    let placement = plan::plan(&topology, threads)?;
    plan::log_plan(&topology, threads, &placement);

    let line = mask::render(&placement, &topology, format);
    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(())
}

/// Main entry point for numa-mask-gen
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_stderr(logging::level_for_verbosity(cli.verbose));

    let lscpu = LscpuTopology::new(cli.lscpu_command.as_str());
    let stdout = io::stdout();
    ExitCode::from(exit_status(run_with(&cli, &lscpu, &mut stdout.lock())))
}

/// Log a failed run and pick the process exit status.
fn exit_status(result: Result<(), RunError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

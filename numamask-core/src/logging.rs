//! Logging bootstrap
//!
//! Every diagnostic goes to stderr so stdout only ever carries the mask line.

use log::LevelFilter;
use logforth::append;

/// Map the `-v` count onto a level: warnings always, settings at `-v`,
/// placement and topology dumps at `-vv`.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Install the global stderr logger at `level`. Call once per process.
pub fn init_stderr(level: LevelFilter) {
    logforth::builder()
        .dispatch(|d| d.filter(level).append(append::Stderr::default()))
        .apply();
}

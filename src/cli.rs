use std::path::PathBuf;

use clap::Parser;

/// A gate-level digital circuit simulator: parses a circuit definition
/// file, runs it for a fixed number of clock cycles, and prints the
/// recorded trace of every monitored signal.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Parses a gate-level circuit definition file and simulates it.\n\
On a successful parse, runs the network for the requested number of cycles and\n\
prints the trace of every MONITORed signal as a waveform of level characters.\n\
On a parse failure, the accumulated syntax/semantic diagnostics are printed to\n\
stderr and the process exits non-zero.\n\
\n\
EXAMPLES:\n\
  # Simulate a circuit for the default 10 cycles:\n\
  gatesim circuits/and_gate.txt\n\
\n\
  # Run more cycles and dump the trace as JSON:\n\
  gatesim circuits/ripple_counter.txt --cycles 50 --stats-json\n\
\n\
  # Raise the log level to see parser diagnostics as they happen:\n\
  gatesim circuits/broken.txt --verbose"
)]
pub struct Args {
    /// Path to the circuit definition file (must have a .txt extension).
    pub path: PathBuf,

    /// Number of simulation cycles to run after a successful parse.
    #[arg(short = 'c', long, default_value = "10", value_name = "N")]
    pub cycles: u32,

    /// Print the monitored-signal trace as JSON instead of a waveform.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub stats_json: bool,

    /// Raise the tracing log level (equivalent to RUST_LOG=debug).
    #[arg(short = 'v', long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}

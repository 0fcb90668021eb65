// Main application entry point.
// Orchestrates command-line parsing, scanning/parsing the circuit
// definition, running the requested number of simulation cycles, and
// reporting the resulting monitor traces.

use std::collections::BTreeMap;
use std::process::exit;
use std::time::Instant;

use colored::*;

use gatesim::circuit::Circuit;
use gatesim::cli;
use gatesim::config::Config;
use gatesim::logger;
use gatesim::parser::Parser;
use gatesim::scanner::Scanner;

fn main() {
    let args = cli::parse_args();
    let cfg = Config::from(&args);
    logger::init_tracing(&cfg);

    let scanner = match Scanner::new(&cfg.path) {
        Ok(scanner) => scanner,
        Err(err) => {
            tracing::error!(error = %err, "failed to open circuit definition file");
            eprintln!("{} {err}", "Error:".red().bold());
            exit(1);
        }
    };

    let mut circuit = Circuit::new();
    let (ok, error_count, error_text) = {
        let mut parser = Parser::new(scanner, &mut circuit);
        let ok = parser.parse_network();
        (ok, parser.error_count(), parser.error_text().to_string())
    };

    if !ok {
        tracing::error!(error_count, "circuit definition failed to parse");
        eprintln!("{}", "Circuit definition contains errors:".red().bold());
        eprintln!("{error_text}");
        exit(1);
    }

    let started = Instant::now();
    for cycle in 0..cfg.cycles {
        if !circuit.execute_cycle() {
            tracing::error!(cycle, "network failed to settle (oscillation)");
            eprintln!(
                "{} network did not settle within the propagation bound at cycle {cycle}",
                "Error:".red().bold()
            );
            exit(1);
        }
    }

    if cfg.stats_json {
        print_trace_json(&circuit);
    } else {
        print!("{}", circuit.monitors.format_traces(&circuit.names, &circuit.devices));
    }

    if cfg.verbose {
        eprintln!(
            "{} {} cycles in {}",
            "Simulation finished:".dimmed(),
            cfg.cycles,
            gatesim::util::format_duration(started.elapsed())
        );
    }
}

fn print_trace_json(circuit: &Circuit) {
    let mut traces: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for &(dev, pin) in circuit.monitors.monitored_signals() {
        let Some(name) = circuit.devices.get_signal_name(&circuit.names, dev, pin) else {
            continue;
        };
        let Some(trace) = circuit.monitors.trace(dev, pin) else {
            continue;
        };
        traces.insert(name, trace.iter().map(|level| level.as_u8()).collect());
    }
    match serde_json::to_string_pretty(&traces) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize monitor traces");
            eprintln!("{} {err}", "Error:".red().bold());
            exit(1);
        }
    }
}

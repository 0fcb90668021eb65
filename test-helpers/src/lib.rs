//! Common helper functions for gatesim's integration tests and benchmarks.

use gatesim::circuit::Circuit;
use gatesim::devices::SignalLevel;
use gatesim::scanner::Scanner;
use gatesim::Parser;

/// Parses `source` as a circuit definition, returning the built [`Circuit`]
/// and whether the parse was error-free.
pub fn build_circuit(source: &str) -> (Circuit, bool) {
    let scanner = Scanner::from_source(source);
    let mut circuit = Circuit::new();
    let ok = {
        let mut parser = Parser::new(scanner, &mut circuit);
        parser.parse_network()
    };
    (circuit, ok)
}

/// Parses and asserts the definition is error-free, returning the circuit.
pub fn parse_ok(source: &str) -> Circuit {
    let (circuit, ok) = build_circuit(source);
    assert!(ok, "expected circuit definition to parse without errors");
    circuit
}

/// Runs `cycles` simulation cycles, asserting the network settles every time.
pub fn run_cycles(circuit: &mut Circuit, cycles: usize) {
    for cycle in 0..cycles {
        assert!(
            circuit.execute_cycle(),
            "network failed to settle at cycle {cycle}"
        );
    }
}

/// Looks up a monitored signal's recorded trace by device/pin name, e.g.
/// `"sw1"` or `"g1.I1"`, and returns it as a sequence of [`SignalLevel`].
pub fn trace_of(circuit: &Circuit, qualified_name: &str) -> Vec<SignalLevel> {
    let (device_part, pin_part) = match qualified_name.split_once('.') {
        Some((d, p)) => (d, Some(p)),
        None => (qualified_name, None),
    };
    let device_id = circuit
        .names
        .query(device_part)
        .unwrap_or_else(|| panic!("unknown device name {device_part}"));
    let pin_id = pin_part.map(|p| {
        circuit
            .names
            .query(p)
            .unwrap_or_else(|| panic!("unknown pin name {p}"))
    });
    circuit
        .monitors
        .trace(device_id, pin_id)
        .unwrap_or_else(|| panic!("{qualified_name} is not monitored"))
        .to_vec()
}

/// A minimal two-switch AND gate circuit, useful as a quick smoke fixture.
pub const MINIMAL_AND_CIRCUIT: &str = "\
CIRCUIT {
DEVICES {
    sw1, sw2 = SWITCH(0);
    g1 = AND(2);
}
CONNECT {
    sw1 > g1.I1;
    sw2 > g1.I2;
}
MONITOR {
    g1;
}
}
END
";

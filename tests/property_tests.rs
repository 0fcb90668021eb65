//! Property-based tests for the name table, wiring, and monitor traces.

use gatesim::circuit::Circuit;
use gatesim::devices::GateKind;
use gatesim::names::Names;
use proptest::prelude::*;

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,15}".prop_filter("must not collide with a reserved keyword", |s| {
        !matches!(
            s.to_uppercase().as_str(),
            "CIRCUIT"
                | "DEVICES"
                | "CONNECT"
                | "MONITOR"
                | "END"
                | "CLOCK"
                | "SWITCH"
                | "AND"
                | "NAND"
                | "OR"
                | "NOR"
                | "XOR"
                | "NOT"
                | "DTYPE"
        )
    })
}

proptest! {
    /// Interning a name and reading it back must always return the exact
    /// original string, regardless of what else has been interned.
    #[test]
    fn names_round_trip(names_in in prop::collection::vec(arb_identifier(), 0..50), target in arb_identifier()) {
        let mut names = Names::new();
        for n in &names_in {
            names.intern(n);
        }
        let id = names.intern(&target);
        prop_assert_eq!(names.get_name_string(id), Some(target.as_str()));
    }

    /// At most one `make_connection` call can ever succeed for a given
    /// destination input pin, no matter how many sources attempt to wire
    /// into it.
    #[test]
    fn connection_uniqueness(n_sources in 1usize..8) {
        let mut circuit = Circuit::new();
        let dst = circuit.names.intern("dst");
        circuit.devices.make_gate(dst, GateKind::Or, n_sources as u8).unwrap();
        let dst_pin = circuit.names.intern("I1");

        let mut successes = 0;
        for i in 0..n_sources {
            let src = circuit.names.intern(&format!("src{i}"));
            circuit.devices.make_switch(src, false).unwrap();
            let result = circuit.network.make_connection(&circuit.devices, src, None, dst, dst_pin);
            if result.is_ok() {
                successes += 1;
            }
        }
        prop_assert!(successes <= 1);
    }

    /// A monitored signal's trace grows by exactly one sample per
    /// completed cycle, and never otherwise.
    #[test]
    fn monitor_trace_length_matches_cycles(cycles in 0usize..30) {
        let mut circuit = Circuit::new();
        let sw = circuit.names.intern("sw");
        circuit.devices.make_switch(sw, true).unwrap();
        circuit.monitors.make_monitor(&circuit.devices, sw, None).unwrap();

        for _ in 0..cycles {
            prop_assert!(circuit.execute_cycle());
        }
        let trace = circuit.monitors.trace(sw, None).unwrap();
        prop_assert_eq!(trace.len(), cycles);
        prop_assert_eq!(circuit.monitors.cycles_completed(), cycles);
    }
}

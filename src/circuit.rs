//! Composition root tying the name table, device registry, wiring, and
//! monitors together into the object the parser builds and the driver
//! runs cycles against.

use crate::devices::Devices;
use crate::monitors::Monitors;
use crate::names::Names;
use crate::network::Network;

/// Everything a parsed circuit definition produces. Built fresh per run;
/// [`crate::parser::Parser::parse_network`] populates it in place.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub names: Names,
    pub devices: Devices,
    pub network: Network,
    pub monitors: Monitors,
}

impl Circuit {
    pub fn new() -> Self {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        Circuit {
            names,
            devices,
            network: Network::new(),
            monitors: Monitors::new(),
        }
    }

    /// Runs one clock cycle and records the resulting signal levels on
    /// every monitored signal.
    pub fn execute_cycle(&mut self) -> bool {
        if !self.network.execute_network(&mut self.devices) {
            return false;
        }
        self.monitors.record_signals(&self.devices);
        true
    }

    /// Resets every switch/clock to its declared configuration and clears
    /// recorded monitor traces, without forgetting the wiring or monitor
    /// registrations themselves.
    pub fn cold_startup(&mut self) {
        self.devices.cold_startup();
        self.monitors.reset_monitors();
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Circuit::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{GateKind, SignalLevel};

    #[test]
    fn execute_cycle_records_every_monitored_signal() {
        let mut circuit = Circuit::new();
        let sw = circuit.names.intern("sw1");
        let g = circuit.names.intern("g1");
        circuit.devices.make_switch(sw, true).unwrap();
        circuit.devices.make_gate(g, GateKind::Not, 1).unwrap();
        let pin = circuit.devices.get(g).unwrap().input_pins()[0];
        circuit.network.make_connection(&circuit.devices, sw, None, g, pin).unwrap();
        circuit.monitors.make_monitor(&circuit.devices, g, None).unwrap();

        assert!(circuit.execute_cycle());
        assert_eq!(circuit.monitors.trace(g, None).unwrap().last(), Some(&SignalLevel::Falling));
    }

    #[test]
    fn cold_startup_clears_traces_and_resets_switches() {
        let mut circuit = Circuit::new();
        let sw = circuit.names.intern("sw1");
        circuit.devices.make_switch(sw, true).unwrap();
        circuit.monitors.make_monitor(&circuit.devices, sw, None).unwrap();
        circuit.execute_cycle();
        circuit.devices.set_switch(sw, false).unwrap();

        circuit.cold_startup();

        assert!(circuit.monitors.trace(sw, None).unwrap().is_empty());
        assert_eq!(circuit.devices.output_level(sw, None), Some(SignalLevel::High));
    }
}

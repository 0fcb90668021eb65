//! Wiring between devices and the fixed-point signal propagation kernel.
//!
//! [`Network`] stores connections as `(destination device, destination
//! pin) -> (source device, source pin)` pairs, all by [`NameId`] rather
//! than by reference, so devices and their wiring can be mutated
//! independently without fighting the borrow checker over a graph of
//! pointers (see [`crate::devices`] for why the same design is used
//! there).

use std::collections::HashMap;

use crate::devices::Devices;
use crate::errors::ConnectionError;
use crate::names::NameId;

/// Scans of the network stop retrying after this many passes and report
/// an oscillating network instead of looping forever.
pub const MAX_PROPAGATION_ITERATIONS: usize = 1000;

#[derive(Debug, Default, Clone)]
pub struct Network {
    connections: HashMap<(NameId, NameId), (NameId, Option<NameId>)>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    /// Wires `src_dev.src_pin`'s output into `dst_dev.dst_pin`'s input.
    /// `src_pin` is `None` for devices with a single unnamed output
    /// (switches, clocks, gates); `dst_pin` is always a named input pin.
    pub fn make_connection(
        &mut self,
        devices: &Devices,
        src_dev: NameId,
        src_pin: Option<NameId>,
        dst_dev: NameId,
        dst_pin: NameId,
    ) -> Result<(), ConnectionError> {
        let src = devices.get(src_dev).ok_or(ConnectionError::DeviceAbsent1)?;
        let dst = devices.get(dst_dev).ok_or(ConnectionError::DeviceAbsent2)?;

        if !src.output_pins().contains(&src_pin) {
            return Err(ConnectionError::PortAbsent1);
        }
        if !dst.input_pins().contains(&dst_pin) {
            if dst.output_pins().contains(&Some(dst_pin)) {
                return Err(ConnectionError::OutputToOutput);
            }
            return Err(ConnectionError::PortAbsent2);
        }
        if self.connections.contains_key(&(dst_dev, dst_pin)) {
            return Err(ConnectionError::InputConnected);
        }
        self.connections.insert((dst_dev, dst_pin), (src_dev, src_pin));
        Ok(())
    }

    pub fn get_connection(&self, dst_dev: NameId, dst_pin: NameId) -> Option<(NameId, Option<NameId>)> {
        self.connections.get(&(dst_dev, dst_pin)).copied()
    }

    pub fn is_connected(&self, dst_dev: NameId, dst_pin: NameId) -> bool {
        self.connections.contains_key(&(dst_dev, dst_pin))
    }

    /// True once every declared device has every one of its input pins
    /// wired to a source. The parser checks this once, after the CONNECT
    /// section closes, before allowing the circuit to run.
    pub fn check_network(&self, devices: &Devices) -> bool {
        self.unconnected_inputs(devices).is_empty()
    }

    /// Every `(device, pin)` input that has no source wired to it yet, in
    /// device-declaration order. Used to build the single "still
    /// unconnected" diagnostic once a connectionlist finishes parsing.
    pub fn unconnected_inputs(&self, devices: &Devices) -> Vec<(NameId, NameId)> {
        let mut result = Vec::new();
        for dev_id in devices.all_device_ids() {
            let dev = devices.get(dev_id).expect("id came from all_device_ids");
            for &pin in dev.input_pins() {
                if !self.is_connected(dev_id, pin) {
                    result.push((dev_id, pin));
                }
            }
        }
        result
    }

    fn refresh_inputs(&self, devices: &mut Devices) {
        for (&(dst_dev, dst_pin), &(src_dev, src_pin)) in &self.connections {
            let level = devices.output_level(src_dev, src_pin).unwrap_or(crate::devices::SignalLevel::Blank);
            devices.set_input(dst_dev, dst_pin, level);
        }
    }

    /// Advances the simulation by one clock cycle: collapses last cycle's
    /// transition levels, snapshots them, ticks every clock, iterates
    /// gates and D-type inputs to a fixed point, samples D-type edges,
    /// and finally stamps RISING/FALLING on whatever changed. Returns
    /// `false` if the network failed to settle within
    /// [`MAX_PROPAGATION_ITERATIONS`] (an oscillating network).
    pub fn execute_network(&self, devices: &mut Devices) -> bool {
        devices.collapse_outputs();
        let snapshot = devices.snapshot_outputs();
        devices.update_clocks();

        let mut converged = false;
        for _ in 0..MAX_PROPAGATION_ITERATIONS {
            self.refresh_inputs(devices);
            if !devices.step_combinational() {
                converged = true;
                break;
            }
        }
        if !converged {
            return false;
        }

        self.refresh_inputs(devices);
        devices.sample_dtype_edges();
        devices.stamp_edges(&snapshot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Devices, GateKind, SignalLevel};
    use crate::names::Names;

    fn setup() -> (Names, Devices, Network) {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        (names, devices, Network::new())
    }

    #[test]
    fn connection_to_occupied_input_is_rejected() {
        let (mut names, mut devices, mut network) = setup();
        let sw1 = names.intern("sw1");
        let sw2 = names.intern("sw2");
        let g = names.intern("g1");
        devices.make_switch(sw1, false).unwrap();
        devices.make_switch(sw2, false).unwrap();
        devices.make_gate(g, GateKind::Not, 1).unwrap();
        let pin = devices.get(g).unwrap().input_pins()[0];

        network.make_connection(&devices, sw1, None, g, pin).unwrap();
        assert_eq!(
            network.make_connection(&devices, sw2, None, g, pin),
            Err(ConnectionError::InputConnected)
        );
    }

    #[test]
    fn connecting_to_an_output_pin_is_rejected() {
        let (mut names, mut devices, mut network) = setup();
        let d = names.intern("d1");
        let sw = names.intern("sw1");
        devices.make_d_type(d).unwrap();
        devices.make_switch(sw, false).unwrap();
        let q_id = devices.get_signal_ids(&names, "d1.Q").unwrap().1.unwrap();

        assert_eq!(
            network.make_connection(&devices, sw, None, d, q_id),
            Err(ConnectionError::OutputToOutput)
        );
    }

    #[test]
    fn check_network_requires_every_input_wired() {
        let (mut names, mut devices, mut network) = setup();
        let sw = names.intern("sw1");
        let g = names.intern("g1");
        devices.make_switch(sw, true).unwrap();
        devices.make_gate(g, GateKind::Not, 1).unwrap();
        assert!(!network.check_network(&devices));

        let pin = devices.get(g).unwrap().input_pins()[0];
        network.make_connection(&devices, sw, None, g, pin).unwrap();
        assert!(network.check_network(&devices));
    }

    #[test]
    fn not_gate_inverts_switch_through_one_cycle() {
        let (mut names, mut devices, mut network) = setup();
        let sw = names.intern("sw1");
        let g = names.intern("g1");
        devices.make_switch(sw, true).unwrap();
        devices.make_gate(g, GateKind::Not, 1).unwrap();
        let pin = devices.get(g).unwrap().input_pins()[0];
        network.make_connection(&devices, sw, None, g, pin).unwrap();

        assert!(network.execute_network(&mut devices));
        assert_eq!(devices.output_level(g, None).unwrap().collapse(), SignalLevel::Low);
    }

    #[test]
    fn signal_chases_a_toggled_switch_across_cycles() {
        let (mut names, mut devices, mut network) = setup();
        let sw = names.intern("sw1");
        let g = names.intern("g1");
        devices.make_switch(sw, false).unwrap();
        devices.make_gate(g, GateKind::Not, 1).unwrap();
        let pin = devices.get(g).unwrap().input_pins()[0];
        network.make_connection(&devices, sw, None, g, pin).unwrap();

        network.execute_network(&mut devices);
        assert_eq!(devices.output_level(g, None).unwrap().collapse(), SignalLevel::High);

        devices.set_switch(sw, true).unwrap();
        network.execute_network(&mut devices);
        assert_eq!(devices.output_level(g, None).unwrap(), SignalLevel::Falling);
    }

    #[test]
    fn clock_driven_dtype_captures_data_on_toggle() {
        let (mut names, mut devices, mut network) = setup();
        let clk = names.intern("clk1");
        let data_sw = names.intern("data_sw");
        let d = names.intern("d1");
        devices.make_clock(clk, 1).unwrap();
        devices.make_switch(data_sw, true).unwrap();
        devices.make_d_type(d).unwrap();

        let (clk_pin, data_pin) = {
            let dev = devices.get(d).unwrap();
            let pins = dev.input_pins();
            (pins[1], pins[0])
        };
        network.make_connection(&devices, clk, None, d, clk_pin).unwrap();
        network.make_connection(&devices, data_sw, None, d, data_pin).unwrap();

        // half_period 1: every cycle toggles. Drive two cycles to guarantee
        // at least one LOW->HIGH transition is observed on CLK.
        network.execute_network(&mut devices);
        network.execute_network(&mut devices);

        let q_id = devices.get_signal_ids(&names, "d1.Q").unwrap().1.unwrap();
        assert!(devices.get(d).unwrap().is_dtype_initialized());
        assert_eq!(devices.output_level(d, Some(q_id)).unwrap().collapse(), SignalLevel::High);
    }
}

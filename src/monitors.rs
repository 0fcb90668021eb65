//! Recording and display of monitored signal traces.
//!
//! A monitor watches one device output across cycles. [`Monitors`] keeps
//! the recorded history by `(device, pin)` so the driver can print a
//! waveform, export it as JSON, or both.

use std::collections::HashMap;

use crate::devices::{Devices, SignalLevel};
use crate::errors::MonitorError;
use crate::names::{NameId, Names};

pub type Signal = (NameId, Option<NameId>);

#[derive(Debug, Default, Clone)]
pub struct Monitors {
    traces: HashMap<Signal, Vec<SignalLevel>>,
    order: Vec<Signal>,
    cycles_completed: usize,
}

impl Monitors {
    pub fn new() -> Self {
        Monitors::default()
    }

    /// Registers `dev.pin` (or bare `dev` for an unnamed output) as
    /// monitored. If cycles have already run, the new trace is backfilled
    /// with `BLANK` for every cycle it missed, so every trace in the
    /// registry stays the same length.
    pub fn make_monitor(&mut self, devices: &Devices, dev: NameId, pin: Option<NameId>) -> Result<(), MonitorError> {
        let device = devices.get(dev).ok_or(MonitorError::DeviceAbsent)?;
        if !device.output_pins().contains(&pin) {
            return Err(MonitorError::NotOutput);
        }
        let signal = (dev, pin);
        if self.traces.contains_key(&signal) {
            return Err(MonitorError::MonitorPresent);
        }
        self.traces.insert(signal, vec![SignalLevel::Blank; self.cycles_completed]);
        self.order.push(signal);
        Ok(())
    }

    pub fn remove_monitor(&mut self, dev: NameId, pin: Option<NameId>) -> bool {
        let signal = (dev, pin);
        if self.traces.remove(&signal).is_some() {
            self.order.retain(|s| *s != signal);
            true
        } else {
            false
        }
    }

    pub fn is_monitored(&self, dev: NameId, pin: Option<NameId>) -> bool {
        self.traces.contains_key(&(dev, pin))
    }

    /// Appends the current level of every monitored signal. Called once
    /// per completed cycle, after [`crate::network::Network::execute_network`].
    pub fn record_signals(&mut self, devices: &Devices) {
        for &(dev, pin) in &self.order {
            let level = devices.output_level(dev, pin).unwrap_or(SignalLevel::Blank);
            self.traces.get_mut(&(dev, pin)).expect("signal in order is in traces").push(level);
        }
        self.cycles_completed += 1;
    }

    /// Clears every recorded trace back to empty, for a cold-startup.
    /// Registered monitors themselves are kept.
    pub fn reset_monitors(&mut self) {
        for trace in self.traces.values_mut() {
            trace.clear();
        }
        self.cycles_completed = 0;
    }

    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }

    pub fn monitored_signals(&self) -> &[Signal] {
        &self.order
    }

    pub fn trace(&self, dev: NameId, pin: Option<NameId>) -> Option<&[SignalLevel]> {
        self.traces.get(&(dev, pin)).map(Vec::as_slice)
    }

    pub fn get_monitor_signal_names(&self, names: &Names, devices: &Devices) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|&(d, p)| devices.get_signal_name(names, d, p))
            .collect()
    }

    fn signal_name_margin(&self, names: &Names, devices: &Devices) -> usize {
        self.order
            .iter()
            .filter_map(|&(d, p)| devices.get_signal_name(names, d, p))
            .map(|s| s.len())
            .max()
            .unwrap_or(0)
    }

    /// Renders every trace as a row of `-`/`_`/`.` characters, one row per
    /// monitored signal, right-aligned on the longest signal name.
    pub fn format_traces(&self, names: &Names, devices: &Devices) -> String {
        let margin = self.signal_name_margin(names, devices);
        let mut output = String::new();
        for &(dev, pin) in &self.order {
            let name = devices.get_signal_name(names, dev, pin).unwrap_or_default();
            let trace = &self.traces[&(dev, pin)];
            let waveform: String = trace
                .iter()
                .map(|level| match level.collapse() {
                    SignalLevel::High => '-',
                    SignalLevel::Low => '_',
                    _ => '.',
                })
                .collect();
            output.push_str(&format!("{name:>margin$} : {waveform}\n"));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::Devices;
    use crate::names::Names;

    fn setup() -> (Names, Devices) {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        (names, devices)
    }

    #[test]
    fn monitor_on_missing_device_is_rejected() {
        let (names, devices) = setup();
        let mut monitors = Monitors::new();
        let bogus = NameId::from_index(9999);
        assert_eq!(monitors.make_monitor(&devices, bogus, None), Err(MonitorError::DeviceAbsent));
        // silence unused import warning for Names in this test module
        let _ = &names;
    }

    #[test]
    fn monitor_on_input_pin_is_rejected() {
        let (mut names, mut devices) = setup();
        let d = names.intern("d1");
        devices.make_d_type(d).unwrap();
        let mut monitors = Monitors::new();
        let clk_pin = devices.get(d).unwrap().input_pins()[1];
        assert_eq!(monitors.make_monitor(&devices, d, Some(clk_pin)), Err(MonitorError::NotOutput));
    }

    #[test]
    fn duplicate_monitor_is_rejected() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        let mut monitors = Monitors::new();
        monitors.make_monitor(&devices, sw, None).unwrap();
        assert_eq!(monitors.make_monitor(&devices, sw, None), Err(MonitorError::MonitorPresent));
    }

    #[test]
    fn late_monitor_is_backfilled_with_blank() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        let mut monitors = Monitors::new();
        monitors.record_signals(&devices);
        monitors.record_signals(&devices);
        monitors.make_monitor(&devices, sw, None).unwrap();
        let trace = monitors.trace(sw, None).unwrap();
        assert_eq!(trace, &[SignalLevel::Blank, SignalLevel::Blank]);
    }

    #[test]
    fn record_signals_appends_one_sample_per_call() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        let mut monitors = Monitors::new();
        monitors.make_monitor(&devices, sw, None).unwrap();
        monitors.record_signals(&devices);
        devices.set_switch(sw, false).unwrap();
        monitors.record_signals(&devices);
        assert_eq!(monitors.trace(sw, None).unwrap(), &[SignalLevel::High, SignalLevel::Low]);
        assert_eq!(monitors.cycles_completed(), 2);
    }

    #[test]
    fn reset_monitors_clears_traces_but_keeps_registration() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        let mut monitors = Monitors::new();
        monitors.make_monitor(&devices, sw, None).unwrap();
        monitors.record_signals(&devices);
        monitors.reset_monitors();
        assert!(monitors.trace(sw, None).unwrap().is_empty());
        assert!(monitors.is_monitored(sw, None));
    }

    #[test]
    fn format_traces_renders_one_line_per_signal() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        let mut monitors = Monitors::new();
        monitors.make_monitor(&devices, sw, None).unwrap();
        monitors.record_signals(&devices);
        let rendered = monitors.format_traces(&names, &devices);
        assert_eq!(rendered.trim(), "sw1 : -");
    }
}

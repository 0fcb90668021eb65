//! Device construction and per-device combinational/sequential behavior.
//!
//! A [`Device`] knows how to compute its own next output from its current
//! input levels; it does not know about connections. [`crate::network`]
//! owns the wiring and drives the fixed-point iteration across devices.

use std::collections::HashMap;

use crate::errors::DeviceError;
use crate::names::{NameId, Names};

/// A signal level. `RISING`/`FALLING` describe a transition that happened
/// during the cycle just completed; they collapse to `HIGH`/`LOW` at the
/// start of the next cycle. `BLANK` marks a pin that has never been driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalLevel {
    Low,
    High,
    Rising,
    Falling,
    Blank,
}

impl SignalLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            SignalLevel::Low => 0,
            SignalLevel::High => 1,
            SignalLevel::Rising => 2,
            SignalLevel::Falling => 3,
            SignalLevel::Blank => 4,
        }
    }

    /// Collapses a transition level to the steady value it settled on.
    /// `BLANK` and the plain levels pass through unchanged.
    pub fn collapse(self) -> SignalLevel {
        match self {
            SignalLevel::Rising => SignalLevel::High,
            SignalLevel::Falling => SignalLevel::Low,
            other => other,
        }
    }

    pub fn is_high(self) -> bool {
        self.collapse() == SignalLevel::High
    }

    pub fn complement(self) -> SignalLevel {
        match self.collapse() {
            SignalLevel::High => SignalLevel::Low,
            SignalLevel::Low => SignalLevel::High,
            other => other,
        }
    }
}

impl TryFrom<u8> for SignalLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(SignalLevel::Low),
            1 => Ok(SignalLevel::High),
            2 => Ok(SignalLevel::Rising),
            3 => Ok(SignalLevel::Falling),
            4 => Ok(SignalLevel::Blank),
            other => Err(other),
        }
    }
}

/// Boolean function a [`DeviceKind::Gate`] computes over its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Not,
}

/// Device kind plus whatever qualifier was given when it was declared.
/// Mutable runtime state (clock phase, D-type history) lives on [`Device`]
/// itself rather than here, since it changes cycle to cycle while the
/// qualifier does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Switch { initial: SignalLevel },
    Clock { half_period: u32 },
    Gate { kind: GateKind, n_inputs: u8 },
    DType,
}

/// A single device: its kind, its pin layout, and its current input/output
/// levels. Connections are not stored here — see [`crate::network::Network`].
#[derive(Debug, Clone)]
pub struct Device {
    pub id: NameId,
    pub kind: DeviceKind,
    input_pins: Vec<NameId>,
    output_pins: Vec<Option<NameId>>,
    inputs: HashMap<NameId, SignalLevel>,
    outputs: HashMap<Option<NameId>, SignalLevel>,
    clock_phase: u32,
    dtype_prev_clk: SignalLevel,
    dtype_initialized: bool,
}

impl Device {
    pub fn input_pins(&self) -> &[NameId] {
        &self.input_pins
    }

    pub fn output_pins(&self) -> &[Option<NameId>] {
        &self.output_pins
    }

    pub fn input_level(&self, pin: NameId) -> SignalLevel {
        self.inputs.get(&pin).copied().unwrap_or(SignalLevel::Blank)
    }

    pub fn output_level(&self, pin: Option<NameId>) -> SignalLevel {
        self.outputs.get(&pin).copied().unwrap_or(SignalLevel::Blank)
    }

    pub fn is_dtype_initialized(&self) -> bool {
        self.dtype_initialized
    }

    fn evaluate_gate(&self) -> SignalLevel {
        let (kind, _n) = match self.kind {
            DeviceKind::Gate { kind, n_inputs } => (kind, n_inputs),
            _ => unreachable!("evaluate_gate called on a non-gate device"),
        };
        let levels: Vec<SignalLevel> = self.input_pins.iter().map(|p| self.input_level(*p)).collect();
        if levels.iter().any(|l| *l == SignalLevel::Blank) {
            return SignalLevel::Blank;
        }
        let bits: Vec<bool> = levels.iter().map(|l| l.is_high()).collect();
        let result = match kind {
            GateKind::And => bits.iter().all(|&b| b),
            GateKind::Nand => !bits.iter().all(|&b| b),
            GateKind::Or => bits.iter().any(|&b| b),
            GateKind::Nor => !bits.iter().any(|&b| b),
            GateKind::Xor => bits[0] ^ bits[1],
            GateKind::Not => !bits[0],
        };
        if result {
            SignalLevel::High
        } else {
            SignalLevel::Low
        }
    }
}

/// Registry of all devices in a circuit, keyed by [`NameId`]. Pre-interns
/// the reserved pin names (`I1`..`I16`, `DATA`, `CLK`, `SET`, `CLEAR`,
/// `Q`, `QBAR`) once at construction so `make_*` calls never touch
/// [`Names`] again afterwards.
#[derive(Debug, Clone)]
pub struct Devices {
    devices: HashMap<NameId, Device>,
    input_pin_ids: Vec<NameId>,
    data_id: NameId,
    clk_id: NameId,
    set_id: NameId,
    clear_id: NameId,
    q_id: NameId,
    qbar_id: NameId,
}

const MAX_GATE_INPUTS: u8 = 16;

impl Devices {
    pub fn new(names: &mut Names) -> Self {
        let input_pin_ids = (1..=MAX_GATE_INPUTS)
            .map(|i| names.intern(&format!("I{i}")))
            .collect();
        Devices {
            devices: HashMap::new(),
            input_pin_ids,
            data_id: names.intern("DATA"),
            clk_id: names.intern("CLK"),
            set_id: names.intern("SET"),
            clear_id: names.intern("CLEAR"),
            q_id: names.intern("Q"),
            qbar_id: names.intern("QBAR"),
        }
    }

    pub fn get(&self, dev: NameId) -> Option<&Device> {
        self.devices.get(&dev)
    }

    pub fn contains(&self, dev: NameId) -> bool {
        self.devices.contains_key(&dev)
    }

    pub fn find_devices(&self, mut predicate: impl FnMut(&DeviceKind) -> bool) -> Vec<NameId> {
        let mut ids: Vec<NameId> = self
            .devices
            .values()
            .filter(|d| predicate(&d.kind))
            .map(|d| d.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn all_device_ids(&self) -> Vec<NameId> {
        self.find_devices(|_| true)
    }

    pub fn make_switch(&mut self, dev: NameId, initial_high: bool) -> Result<(), DeviceError> {
        if self.devices.contains_key(&dev) {
            return Err(DeviceError::DeviceAlreadyPresent);
        }
        let initial = if initial_high { SignalLevel::High } else { SignalLevel::Low };
        let mut outputs = HashMap::new();
        outputs.insert(None, initial);
        self.devices.insert(
            dev,
            Device {
                id: dev,
                kind: DeviceKind::Switch { initial },
                input_pins: Vec::new(),
                output_pins: vec![None],
                inputs: HashMap::new(),
                outputs,
                clock_phase: 0,
                dtype_prev_clk: SignalLevel::Low,
                dtype_initialized: true,
            },
        );
        Ok(())
    }

    pub fn make_clock(&mut self, dev: NameId, half_period: u32) -> Result<(), DeviceError> {
        if self.devices.contains_key(&dev) {
            return Err(DeviceError::DeviceAlreadyPresent);
        }
        if half_period == 0 {
            return Err(DeviceError::InvalidQualifier);
        }
        let mut outputs = HashMap::new();
        outputs.insert(None, SignalLevel::Low);
        self.devices.insert(
            dev,
            Device {
                id: dev,
                kind: DeviceKind::Clock { half_period },
                input_pins: Vec::new(),
                output_pins: vec![None],
                inputs: HashMap::new(),
                outputs,
                clock_phase: half_period,
                dtype_prev_clk: SignalLevel::Low,
                dtype_initialized: true,
            },
        );
        Ok(())
    }

    pub fn make_gate(&mut self, dev: NameId, kind: GateKind, n_inputs: u8) -> Result<(), DeviceError> {
        if self.devices.contains_key(&dev) {
            return Err(DeviceError::DeviceAlreadyPresent);
        }
        let valid = match kind {
            GateKind::And | GateKind::Nand | GateKind::Or | GateKind::Nor => {
                (1..=MAX_GATE_INPUTS).contains(&n_inputs)
            }
            GateKind::Xor => n_inputs == 2,
            GateKind::Not => n_inputs == 1,
        };
        if !valid {
            return Err(DeviceError::InvalidInputCount);
        }
        let input_pins = self.input_pin_ids[..n_inputs as usize].to_vec();
        let mut inputs = HashMap::new();
        for pin in &input_pins {
            inputs.insert(*pin, SignalLevel::Blank);
        }
        let mut outputs = HashMap::new();
        outputs.insert(None, SignalLevel::Blank);
        self.devices.insert(
            dev,
            Device {
                id: dev,
                kind: DeviceKind::Gate { kind, n_inputs },
                input_pins,
                output_pins: vec![None],
                inputs,
                outputs,
                clock_phase: 0,
                dtype_prev_clk: SignalLevel::Low,
                dtype_initialized: true,
            },
        );
        Ok(())
    }

    pub fn make_d_type(&mut self, dev: NameId) -> Result<(), DeviceError> {
        if self.devices.contains_key(&dev) {
            return Err(DeviceError::DeviceAlreadyPresent);
        }
        let input_pins = vec![self.data_id, self.clk_id, self.set_id, self.clear_id];
        let mut inputs = HashMap::new();
        for pin in &input_pins {
            inputs.insert(*pin, SignalLevel::Blank);
        }
        let (q, qbar) = Self::random_dtype_outputs();
        let mut outputs = HashMap::new();
        outputs.insert(Some(self.q_id), q);
        outputs.insert(Some(self.qbar_id), qbar);
        self.devices.insert(
            dev,
            Device {
                id: dev,
                kind: DeviceKind::DType,
                input_pins,
                output_pins: vec![Some(self.q_id), Some(self.qbar_id)],
                inputs,
                outputs,
                clock_phase: 0,
                dtype_prev_clk: SignalLevel::Low,
                dtype_initialized: false,
            },
        );
        Ok(())
    }

    fn random_dtype_outputs() -> (SignalLevel, SignalLevel) {
        if fastrand::bool() {
            (SignalLevel::High, SignalLevel::Low)
        } else {
            (SignalLevel::Low, SignalLevel::High)
        }
    }

    pub fn set_switch(&mut self, dev: NameId, high: bool) -> Result<(), DeviceError> {
        let device = self.devices.get_mut(&dev).ok_or(DeviceError::DeviceNotFound)?;
        if !matches!(device.kind, DeviceKind::Switch { .. }) {
            return Err(DeviceError::NotASwitch);
        }
        device.outputs.insert(None, if high { SignalLevel::High } else { SignalLevel::Low });
        Ok(())
    }

    pub fn output_level(&self, dev: NameId, pin: Option<NameId>) -> Option<SignalLevel> {
        self.devices.get(&dev).map(|d| d.output_level(pin))
    }

    pub(crate) fn set_input(&mut self, dev: NameId, pin: NameId, level: SignalLevel) {
        if let Some(device) = self.devices.get_mut(&dev) {
            device.inputs.insert(pin, level);
        }
    }

    /// Resets every device's mutable state to the configuration it was
    /// declared with: switches to their initial level, clocks to a fresh
    /// phase counter, gate outputs to `BLANK`, and D-types to a random
    /// uninitialized `Q`/`QBAR` pair.
    pub fn cold_startup(&mut self) {
        for device in self.devices.values_mut() {
            match device.kind {
                DeviceKind::Switch { initial } => {
                    device.outputs.insert(None, initial);
                }
                DeviceKind::Clock { half_period } => {
                    device.clock_phase = half_period;
                    device.outputs.insert(None, SignalLevel::Low);
                }
                DeviceKind::Gate { .. } => {
                    device.outputs.insert(None, SignalLevel::Blank);
                    for pin in device.input_pins.clone() {
                        device.inputs.insert(pin, SignalLevel::Blank);
                    }
                }
                DeviceKind::DType => {
                    let (q, qbar) = Self::random_dtype_outputs();
                    device.outputs.insert(Some(self.q_id), q);
                    device.outputs.insert(Some(self.qbar_id), qbar);
                    device.dtype_prev_clk = SignalLevel::Low;
                    device.dtype_initialized = false;
                    for pin in device.input_pins.clone() {
                        device.inputs.insert(pin, SignalLevel::Blank);
                    }
                }
            }
        }
    }

    /// Replaces any `RISING`/`FALLING` output left from the previous cycle
    /// with its settled `HIGH`/`LOW` value. Must run before a new cycle's
    /// snapshot is taken.
    pub(crate) fn collapse_outputs(&mut self) {
        for device in self.devices.values_mut() {
            for level in device.outputs.values_mut() {
                *level = level.collapse();
            }
        }
    }

    pub(crate) fn snapshot_outputs(&self) -> HashMap<(NameId, Option<NameId>), SignalLevel> {
        let mut snapshot = HashMap::new();
        for device in self.devices.values() {
            for (&pin, &level) in &device.outputs {
                snapshot.insert((device.id, pin), level);
            }
        }
        snapshot
    }

    pub(crate) fn update_clocks(&mut self) {
        for device in self.devices.values_mut() {
            if let DeviceKind::Clock { half_period } = device.kind {
                device.clock_phase = device.clock_phase.saturating_sub(1);
                if device.clock_phase == 0 {
                    let current = device.outputs.get(&None).copied().unwrap_or(SignalLevel::Low);
                    device.outputs.insert(None, current.complement());
                    device.clock_phase = half_period;
                }
            }
        }
    }

    /// Recomputes every gate's output from its currently visible inputs.
    /// Returns whether any gate's output changed, so the caller can detect
    /// a fixed point.
    pub(crate) fn step_combinational(&mut self) -> bool {
        let mut changed = false;
        for device in self.devices.values_mut() {
            if matches!(device.kind, DeviceKind::Gate { .. }) {
                let new = device.evaluate_gate();
                let old = device.outputs.get(&None).copied().unwrap_or(SignalLevel::Blank);
                if old != new {
                    device.outputs.insert(None, new);
                    changed = true;
                }
            }
        }
        changed
    }

    /// For each D-type, compares this cycle's settled `CLK` level against
    /// the level recorded at the end of the previous cycle; on a rising
    /// edge, samples `SET`/`CLEAR`/`DATA` into `Q`/`QBAR`.
    pub(crate) fn sample_dtype_edges(&mut self) {
        let (clk_id, set_id, clear_id, data_id, q_id, qbar_id) =
            (self.clk_id, self.set_id, self.clear_id, self.data_id, self.q_id, self.qbar_id);
        for device in self.devices.values_mut() {
            if !matches!(device.kind, DeviceKind::DType) {
                continue;
            }
            let clk_level = device.input_level(clk_id).collapse();
            let rising_edge = device.dtype_prev_clk == SignalLevel::Low && clk_level == SignalLevel::High;
            if rising_edge {
                let set = device.input_level(set_id).is_high();
                let clear = device.input_level(clear_id).is_high();
                let q = if set {
                    SignalLevel::High
                } else if clear {
                    SignalLevel::Low
                } else {
                    device.input_level(data_id).collapse()
                };
                device.outputs.insert(Some(q_id), q);
                device.outputs.insert(Some(qbar_id), q.complement());
                device.dtype_initialized = true;
            }
            device.dtype_prev_clk = clk_level;
        }
    }

    /// Marks every output that changed value this cycle as `RISING` or
    /// `FALLING` relative to `snapshot` (the collapsed pre-cycle levels).
    pub(crate) fn stamp_edges(&mut self, snapshot: &HashMap<(NameId, Option<NameId>), SignalLevel>) {
        for device in self.devices.values_mut() {
            for (&pin, level) in device.outputs.iter_mut() {
                let old = snapshot.get(&(device.id, pin)).copied().unwrap_or(SignalLevel::Blank).collapse();
                match (old, *level) {
                    (SignalLevel::Low, SignalLevel::High) => *level = SignalLevel::Rising,
                    (SignalLevel::High, SignalLevel::Low) => *level = SignalLevel::Falling,
                    _ => {}
                }
            }
        }
    }

    pub fn get_signal_name(&self, names: &Names, dev: NameId, pin: Option<NameId>) -> Option<String> {
        let dev_name = names.get_name_string(dev)?;
        match pin {
            None => Some(dev_name.to_string()),
            Some(pin_id) => {
                let pin_name = names.get_name_string(pin_id)?;
                Some(format!("{dev_name}.{pin_name}"))
            }
        }
    }

    pub fn get_signal_ids(&self, names: &Names, signal: &str) -> Option<(NameId, Option<NameId>)> {
        match signal.split_once('.') {
            None => names.query(signal).map(|id| (id, None)),
            Some((dev, pin)) => {
                let dev_id = names.query(dev)?;
                let pin_id = names.query(pin)?;
                Some((dev_id, Some(pin_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Names, Devices) {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        (names, devices)
    }

    #[test]
    fn switch_holds_declared_initial_level() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        assert_eq!(devices.output_level(sw, None), Some(SignalLevel::High));
    }

    #[test]
    fn duplicate_device_name_is_rejected() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, true).unwrap();
        assert_eq!(devices.make_clock(sw, 5), Err(DeviceError::DeviceAlreadyPresent));
    }

    #[test]
    fn zero_half_period_clock_is_rejected() {
        let (mut names, mut devices) = setup();
        let clk = names.intern("clk1");
        assert_eq!(devices.make_clock(clk, 0), Err(DeviceError::InvalidQualifier));
    }

    #[test]
    fn clock_toggles_after_half_period_cycles() {
        let (mut names, mut devices) = setup();
        let clk = names.intern("clk1");
        devices.make_clock(clk, 2).unwrap();
        devices.update_clocks();
        assert_eq!(devices.output_level(clk, None), Some(SignalLevel::Low));
        devices.update_clocks();
        assert_eq!(devices.output_level(clk, None), Some(SignalLevel::High));
    }

    #[test]
    fn and_gate_requires_all_inputs_high() {
        let (mut names, mut devices) = setup();
        let g = names.intern("g1");
        devices.make_gate(g, GateKind::And, 2).unwrap();
        let device = devices.get(g).unwrap();
        let pins: Vec<NameId> = device.input_pins().to_vec();
        devices.set_input(g, pins[0], SignalLevel::High);
        devices.set_input(g, pins[1], SignalLevel::Blank);
        devices.step_combinational();
        assert_eq!(devices.output_level(g, None), Some(SignalLevel::Blank));
        devices.set_input(g, pins[1], SignalLevel::High);
        devices.step_combinational();
        assert_eq!(devices.output_level(g, None), Some(SignalLevel::High));
    }

    #[test]
    fn xor_rejects_non_two_input_count() {
        let (mut names, mut devices) = setup();
        let g = names.intern("x1");
        assert_eq!(devices.make_gate(g, GateKind::Xor, 3), Err(DeviceError::InvalidInputCount));
    }

    #[test]
    fn dtype_samples_data_on_rising_clk_edge() {
        let (mut names, mut devices) = setup();
        let d = names.intern("d1");
        devices.make_d_type(d).unwrap();
        let device = devices.get(d).unwrap();
        let pins = device.input_pins().to_vec(); // DATA, CLK, SET, CLEAR
        let (data, clk, set, clear) = (pins[0], pins[1], pins[2], pins[3]);

        devices.set_input(d, data, SignalLevel::High);
        devices.set_input(d, clk, SignalLevel::Low);
        devices.set_input(d, set, SignalLevel::Low);
        devices.set_input(d, clear, SignalLevel::Low);
        devices.sample_dtype_edges();

        devices.set_input(d, clk, SignalLevel::High);
        devices.sample_dtype_edges();

        let q_id = devices.q_id;
        let qbar_id = devices.qbar_id;
        assert_eq!(devices.output_level(d, Some(q_id)), Some(SignalLevel::High));
        assert_eq!(devices.output_level(d, Some(qbar_id)), Some(SignalLevel::Low));
        assert!(devices.get(d).unwrap().is_dtype_initialized());
    }

    #[test]
    fn dtype_clear_overrides_data_on_rising_edge() {
        let (mut names, mut devices) = setup();
        let d = names.intern("d1");
        devices.make_d_type(d).unwrap();
        let pins = devices.get(d).unwrap().input_pins().to_vec();
        let (data, clk, set, clear) = (pins[0], pins[1], pins[2], pins[3]);

        devices.set_input(d, data, SignalLevel::High);
        devices.set_input(d, clk, SignalLevel::Low);
        devices.set_input(d, set, SignalLevel::Low);
        devices.set_input(d, clear, SignalLevel::High);
        devices.sample_dtype_edges();
        devices.set_input(d, clk, SignalLevel::High);
        devices.sample_dtype_edges();

        let q_id = devices.q_id;
        assert_eq!(devices.output_level(d, Some(q_id)), Some(SignalLevel::Low));
    }

    #[test]
    fn cold_startup_restores_switch_and_clock_configuration() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        let clk = names.intern("clk1");
        devices.make_switch(sw, false).unwrap();
        devices.make_clock(clk, 3).unwrap();
        devices.set_switch(sw, true).unwrap();
        devices.update_clocks();
        devices.update_clocks();

        devices.cold_startup();
        assert_eq!(devices.output_level(sw, None), Some(SignalLevel::Low));
        assert_eq!(devices.output_level(clk, None), Some(SignalLevel::Low));
    }

    #[test]
    fn stamp_edges_marks_transitions_but_not_steady_values() {
        let (mut names, mut devices) = setup();
        let sw = names.intern("sw1");
        devices.make_switch(sw, false).unwrap();
        devices.collapse_outputs();
        let snapshot = devices.snapshot_outputs();
        devices.set_switch(sw, true).unwrap();
        devices.stamp_edges(&snapshot);
        assert_eq!(devices.output_level(sw, None), Some(SignalLevel::Rising));
    }

    #[test]
    fn get_signal_name_round_trips_through_ids() {
        let (mut names, mut devices) = setup();
        let g = names.intern("g1");
        devices.make_gate(g, GateKind::And, 2).unwrap();
        let pin = devices.get(g).unwrap().input_pins()[0];
        assert_eq!(devices.get_signal_name(&names, g, None), Some("g1".to_string()));
        assert_eq!(devices.get_signal_name(&names, g, Some(pin)), Some("g1.I1".to_string()));
        assert_eq!(devices.get_signal_ids(&names, "g1.I1"), Some((g, Some(pin))));
    }
}

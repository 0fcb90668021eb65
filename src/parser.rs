//! Recursive-descent parser for the circuit definition language.
//!
//! Grammar, error-recovery discipline (panic-mode resynchronization to a
//! stopping symbol, the `skip` flag, and the three missing-closing-brace
//! lookahead hooks) and semantic actions live here. Every syntactic or
//! semantic violation funnels through [`Parser::raise`].

use crate::circuit::Circuit;
use crate::devices::GateKind;
use crate::errors::{ConnectionError, DeviceError};
use crate::names::{self, NameId};
use crate::scanner::{Scanner, Symbol, SymbolKind};

/// Pin id no device ever legitimately carries; used as a placeholder when
/// a connection point is written without a `.pin`, so a destination point
/// missing its pin fails lookup the same way a misspelled one would
/// rather than needing a second `Option` layer through `Network`.
const MISSING_PIN: NameId = NameId::from_index(u32::MAX);

/// A `device.pin` (or bare `device`) pair parsed from a `point`, carried
/// alongside the token it came from so errors can be anchored precisely.
struct Point {
    device: Symbol,
    pin: Option<Symbol>,
}

pub struct Parser<'a> {
    scanner: Scanner,
    circuit: &'a mut Circuit,
    symbol: Symbol,
    error_flag: bool,
    error_count: usize,
    error_text: String,
    /// Set when a semantic failure already consumed the offending
    /// sub-expression, so the following syntactic check is skipped
    /// instead of raising a second, cascaded complaint.
    skip: bool,
}

impl<'a> Parser<'a> {
    pub fn new(mut scanner: Scanner, circuit: &'a mut Circuit) -> Self {
        let symbol = scanner.get_symbol(&mut circuit.names);
        Parser {
            scanner,
            circuit,
            symbol,
            error_flag: false,
            error_count: 0,
            error_text: String::new(),
            skip: false,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    /// Parses the whole circuit definition, running every semantic
    /// action against `self.circuit` as it goes. Returns `true` iff no
    /// error was raised.
    pub fn parse_network(&mut self) -> bool {
        self.circuit_block();
        if self.symbol.is_keyword(names::END_ID) {
            self.advance();
        } else {
            self.raise("Expected 'END'", Some(";"), None);
        }
        self.error_text.push_str(&format!("\n\nError Count: {}\n", self.error_count));
        !self.error_flag
    }

    fn advance(&mut self) {
        self.symbol = self.scanner.get_symbol(&mut self.circuit.names);
    }

    /// Peeks the next token without updating `self.symbol`.
    fn peek(&mut self) -> Symbol {
        self.scanner.get_symbol(&mut self.circuit.names)
    }

    /// The Rust analogue of `parse.py`'s `__error`: records the
    /// diagnostic, logs it, and resynchronizes to `stopping_symbol` (by
    /// spelling) or EOF, unless `stopping_symbol` is `None`, in which
    /// case the caller is left to advance itself.
    fn raise(&mut self, message: &str, stopping_symbol: Option<&str>, symbol: Option<Symbol>) {
        let symbol = symbol.unwrap_or_else(|| self.symbol.clone());
        self.error_flag = true;
        self.error_count += 1;
        let excerpt = self.scanner.print_error(&symbol, message);
        let (line, column) = self.scanner.line_col(symbol.position);
        tracing::warn!(line, column, message, "parser error");
        if let Some(stop) = stopping_symbol {
            while self.symbol.string != stop && self.symbol.kind != SymbolKind::Eof {
                self.advance();
            }
        }
        self.error_text.push_str("\n\n");
        self.error_text.push_str(&excerpt);
    }

    // ---- circuit = "CIRCUIT" "{" devicelist connectionlist monitorlist "}"

    fn circuit_block(&mut self) {
        if self.symbol.is_keyword(names::CIRCUIT_ID) {
            self.advance();
        } else {
            self.raise("Expected 'CIRCUIT'", Some("{"), None);
        }
        if self.symbol.kind == SymbolKind::BraceLeft {
            self.advance();
        } else {
            self.raise("Expected '{'", None, None);
        }
        self.device_list();
        self.connection_list();
        self.monitor_list();
        if self.symbol.kind == SymbolKind::BraceRight {
            self.advance();
        } else {
            self.raise("Expected '}'", None, None);
        }
    }

    // ---- devicelist = "DEVICES" "{" { device } "}"

    fn device_list(&mut self) {
        if self.symbol.is_keyword(names::DEVICES_ID) {
            self.advance();
        } else {
            self.raise("Expected 'DEVICES'", Some("{"), None);
        }
        if self.symbol.kind == SymbolKind::BraceLeft {
            self.advance();
        } else {
            self.raise("Expected '{'", None, None);
        }

        self.device();
        let mut closing_brace_expected = true;
        while self.symbol.kind != SymbolKind::BraceRight && self.symbol.kind != SymbolKind::Eof {
            if self.symbol.is_keyword(names::CONNECT_ID) {
                let check_symbol = self.peek();
                if check_symbol.kind == SymbolKind::BraceLeft {
                    self.skip = true;
                    self.raise("Expected '}'", None, None);
                    self.symbol = check_symbol;
                    closing_brace_expected = false;
                    break;
                }
                self.raise("Device names cannot be Keywords: CONNECT", Some(";"), None);
                self.advance();
            }
            self.device();
        }
        if closing_brace_expected {
            self.advance();
        }
    }

    // ---- device = name { "," name } "=" devicekind ";"

    fn device(&mut self) {
        let mut device_names: Vec<Symbol> = Vec::new();
        if let Some(sym) = self.parse_device_name() {
            device_names.push(sym);
            let mut names_valid = true;
            while self.symbol.kind == SymbolKind::Comma && names_valid {
                self.advance();
                match self.parse_device_name() {
                    Some(sym) => device_names.push(sym),
                    None => names_valid = false,
                }
            }
            if names_valid {
                if self.symbol.kind == SymbolKind::Equals {
                    self.advance();
                    self.device_kind(&device_names);
                } else {
                    self.raise("Expected '=' or ','", Some(";"), None);
                }
            }
        }
        if self.symbol.kind == SymbolKind::Semicolon {
            self.advance();
        } else {
            self.raise("Expected ';'", None, None);
        }
    }

    fn parse_device_name(&mut self) -> Option<Symbol> {
        match &self.symbol.kind {
            SymbolKind::Name(_) => {
                let sym = self.symbol.clone();
                self.advance();
                Some(sym)
            }
            SymbolKind::Keyword(_) => {
                self.raise("Device names cannot be Keywords", Some(";"), None);
                None
            }
            _ => {
                self.raise("Device names must start with a letter and be alphanumeric", Some(";"), None);
                None
            }
        }
    }

    fn device_kind(&mut self, device_names: &[Symbol]) {
        let kind_symbol = self.symbol.clone();
        match kind_symbol.name_id() {
            Some(id) if id == names::CLOCK_ID => {
                self.advance();
                let half_period = self.numeric_qualifier(
                    1,
                    u64::MAX,
                    "a number n > 0, the number of simulation cycles after which the state changes",
                    "Clock half period must be greater than 0",
                );
                if !self.error_flag {
                    for sym in device_names {
                        self.make_device(sym, |d, devs| devs.make_clock(d, half_period.unwrap_or(1) as u32));
                    }
                }
            }
            Some(id) if id == names::SWITCH_ID => {
                self.advance();
                let state = self.switch_qualifier();
                if !self.error_flag {
                    for sym in device_names {
                        self.make_device(sym, |d, devs| devs.make_switch(d, state.unwrap_or(false)));
                    }
                }
            }
            Some(id) if id == names::AND_ID => self.make_gate_devices(device_names, "AND", GateKind::And, 1, 16),
            Some(id) if id == names::NAND_ID => self.make_gate_devices(device_names, "NAND", GateKind::Nand, 1, 16),
            Some(id) if id == names::OR_ID => self.make_gate_devices(device_names, "OR", GateKind::Or, 1, 16),
            Some(id) if id == names::NOR_ID => self.make_gate_devices(device_names, "NOR", GateKind::Nor, 1, 16),
            Some(id) if id == names::XOR_ID => {
                self.advance();
                if !self.error_flag {
                    for sym in device_names {
                        self.make_device(sym, |d, devs| devs.make_gate(d, GateKind::Xor, 2));
                    }
                }
            }
            Some(id) if id == names::NOT_ID => {
                self.advance();
                if !self.error_flag {
                    for sym in device_names {
                        self.make_device(sym, |d, devs| devs.make_gate(d, GateKind::Not, 1));
                    }
                }
            }
            Some(id) if id == names::DTYPE_ID => {
                self.advance();
                if !self.error_flag {
                    for sym in device_names {
                        self.make_device(sym, |d, devs| devs.make_d_type(d));
                    }
                }
            }
            _ => {
                self.raise(
                    "Not a supported device, supported devices: CLOCK, SWITCH, AND, NAND, OR, NOR, XOR, NOT, DTYPE",
                    Some(";"),
                    None,
                );
            }
        }
    }

    fn make_gate_devices(&mut self, device_names: &[Symbol], label: &str, kind: GateKind, lo: u64, hi: u64) {
        self.advance();
        let n_inputs = self.numeric_qualifier(
            lo,
            hi,
            &format!("number of inputs for {label} gate (valid range: {lo}-{hi})"),
            &format!("Number of inputs must be between {lo}-{hi}"),
        );
        if !self.error_flag {
            let n = n_inputs.unwrap_or(lo) as u8;
            for sym in device_names {
                self.make_device(sym, |d, devs| devs.make_gate(d, kind, n));
            }
        }
    }

    /// Interns one device name and runs `make` against it, turning a
    /// [`DeviceError`] into a diagnostic anchored at that name's token.
    fn make_device(&mut self, sym: &Symbol, make: impl FnOnce(NameId, &mut crate::devices::Devices) -> Result<(), DeviceError>) {
        let id = self.circuit.names.intern(&sym.string);
        if let Err(err) = make(id, &mut self.circuit.devices) {
            self.raise(&err.to_string(), None, Some(sym.clone()));
        }
    }

    /// `"(" NUMBER ")"`, where the number must land in `[lo, hi]`.
    /// Returns the parsed value if the parentheses and number were
    /// syntactically well formed, even when the range check failed (the
    /// `skip` flag still prevents a cascaded `')'`-missing complaint).
    fn numeric_qualifier(&mut self, lo: u64, hi: u64, description: &str, range_message: &str) -> Option<u64> {
        if self.symbol.kind != SymbolKind::ParenLeft {
            self.raise("Expected '('", Some(";"), None);
            return None;
        }
        self.advance();
        let Some(value) = self.symbol.numeric_value() else {
            self.raise(&format!("Expected {description}"), Some(";"), None);
            return None;
        };
        if value < lo || value > hi {
            self.skip = true;
            self.raise(range_message, Some(";"), None);
        }
        let result = if self.error_flag { None } else { Some(value) };
        if !self.skip {
            self.advance();
            if self.symbol.kind == SymbolKind::ParenRight {
                self.advance();
            } else {
                self.raise("Expected ')'", Some(";"), None);
            }
        }
        self.skip = false;
        result
    }

    /// `"(" ( ZERO | "1" ) ")"` — a switch's initial state.
    fn switch_qualifier(&mut self) -> Option<bool> {
        if self.symbol.kind != SymbolKind::ParenLeft {
            self.raise("Expected '('", Some(";"), None);
            return None;
        }
        self.advance();
        let Some(value) = self.symbol.numeric_value().filter(|&v| v == 0 || v == 1) else {
            self.raise("Expected state, either 0(OFF) or 1(ON)", Some(";"), None);
            return None;
        };
        self.advance();
        if self.symbol.kind == SymbolKind::ParenRight {
            self.advance();
        } else {
            self.raise("Expected ')'", Some(";"), None);
        }
        if self.error_flag { None } else { Some(value == 1) }
    }

    // ---- connectionlist = "CONNECT" "{" { connection } "}"

    fn connection_list(&mut self) {
        let connect_symbol = self.symbol.clone();
        if !self.skip {
            if self.symbol.is_keyword(names::CONNECT_ID) {
                self.advance();
            } else {
                self.raise("Expected 'CONNECT'", Some("{"), None);
            }
        }
        self.skip = false;

        if self.symbol.kind == SymbolKind::BraceLeft {
            self.advance();
        } else {
            self.raise("Expected '{'", None, None);
        }

        self.connection();
        let mut closing_brace_expected = true;
        while self.symbol.kind != SymbolKind::BraceRight && self.symbol.kind != SymbolKind::Eof {
            if self.symbol.is_keyword(names::MONITOR_ID) {
                let check_symbol = self.peek();
                if check_symbol.kind == SymbolKind::BraceLeft {
                    self.skip = true;
                    self.raise("Expected '}'", None, None);
                    self.symbol = check_symbol;
                    closing_brace_expected = false;
                    break;
                }
                self.raise("Device names cannot be Keywords: MONITOR", Some(";"), None);
                self.advance();
            }
            self.connection();
        }
        if closing_brace_expected {
            self.advance();
        }

        if !self.error_flag {
            let unconnected = self.circuit.network.unconnected_inputs(&self.circuit.devices);
            if !unconnected.is_empty() {
                let mut message = String::from("unconnected inputs: ");
                for &(dev, pin) in &unconnected {
                    if let Some(name) = self.circuit.devices.get_signal_name(&self.circuit.names, dev, Some(pin)) {
                        message.push_str(&name);
                        message.push(' ');
                    }
                }
                self.raise(&message, None, Some(connect_symbol));
            }
        }
    }

    // ---- connection = point ">" point { "," point } ";"

    fn connection(&mut self) {
        const DESTINATION_TERMINATORS: &[(SymbolKind, &str)] = &[(SymbolKind::Comma, ","), (SymbolKind::Semicolon, ";")];

        let Some(source) = self.point(&[(SymbolKind::Arrow, ">")]) else {
            self.skip_to_semicolon();
            return;
        };
        if self.symbol.kind == SymbolKind::Arrow {
            self.advance();
        } else {
            self.raise("Expected '>'", Some(";"), None);
            return;
        }

        let mut destinations = Vec::new();
        match self.point(DESTINATION_TERMINATORS) {
            Some(dest) => destinations.push(dest),
            None => {
                self.skip_to_semicolon();
                return;
            }
        }
        let mut points_valid = true;
        while self.symbol.kind == SymbolKind::Comma && points_valid {
            self.advance();
            match self.point(DESTINATION_TERMINATORS) {
                Some(dest) => destinations.push(dest),
                None => points_valid = false,
            }
        }

        if points_valid && !self.error_flag {
            let src_dev_id = self.circuit.names.intern(&source.device.string);
            let src_pin_id = source.pin.as_ref().map(|sym| self.circuit.names.intern(&sym.string));
            for dest in &destinations {
                let dst_dev_id = self.circuit.names.intern(&dest.device.string);
                let dst_pin_id = dest.pin.as_ref().map(|sym| self.circuit.names.intern(&sym.string)).unwrap_or(MISSING_PIN);
                let result = self.circuit.network.make_connection(&self.circuit.devices, src_dev_id, src_pin_id, dst_dev_id, dst_pin_id);
                if let Err(err) = result {
                    self.report_connection_error(err, &source, dest);
                }
            }
        }

        if self.symbol.kind == SymbolKind::Semicolon {
            self.advance();
        } else {
            self.raise("Expected ';'", None, None);
        }
    }

    /// Resynchronizes to the next `;` after a malformed point makes the
    /// rest of the connection clause unsalvageable.
    fn skip_to_semicolon(&mut self) {
        while self.symbol.string != ";" && self.symbol.kind != SymbolKind::Eof {
            self.advance();
        }
        if self.symbol.kind == SymbolKind::Semicolon {
            self.advance();
        }
    }

    /// Anchors a [`ConnectionError`] at the token the error names: the
    /// source device or pin, or the destination device or pin.
    fn report_connection_error(&mut self, err: ConnectionError, source: &Point, dest: &Point) {
        let symbol = match err {
            ConnectionError::DeviceAbsent1 => source.device.clone(),
            ConnectionError::PortAbsent1 => source.pin.clone().unwrap_or_else(|| source.device.clone()),
            ConnectionError::DeviceAbsent2 => dest.device.clone(),
            ConnectionError::PortAbsent2 | ConnectionError::OutputToOutput | ConnectionError::InputConnected => {
                dest.pin.clone().unwrap_or_else(|| dest.device.clone())
            }
        };
        self.raise(&err.to_string(), None, Some(symbol));
    }

    // ---- point = name [ "." name ]

    /// `terminators` lists the symbols legitimately allowed to follow a
    /// dot-less point in this call's context (`>` after a source point,
    /// `,`/`;` after a destination point); anything else left dangling
    /// there (a stray `:`, say) is itself a syntax error rather than
    /// something left for the caller to stumble over one token later,
    /// which would otherwise cascade into two or three diagnostics for
    /// one mistake.
    fn point(&mut self, terminators: &[(SymbolKind, &str)]) -> Option<Point> {
        let device = match &self.symbol.kind {
            SymbolKind::Name(_) => {
                let sym = self.symbol.clone();
                self.advance();
                sym
            }
            SymbolKind::Keyword(_) => {
                self.raise("Device names cannot be Keywords", Some(";"), None);
                return None;
            }
            _ => {
                self.raise("Expected a device name", Some(";"), None);
                return None;
            }
        };

        if self.symbol.kind == SymbolKind::Dot {
            self.advance();
            match &self.symbol.kind {
                SymbolKind::Name(_) => {
                    let pin = self.symbol.clone();
                    self.advance();
                    Some(Point { device, pin: Some(pin) })
                }
                SymbolKind::Keyword(_) => {
                    self.raise("Pin names cannot be Keywords", Some(";"), None);
                    None
                }
                _ => {
                    self.raise("Expected a pin name", Some(";"), None);
                    None
                }
            }
        } else if terminators.iter().any(|(kind, _)| *kind == self.symbol.kind) {
            Some(Point { device, pin: None })
        } else {
            let expected = terminators.iter().map(|(_, text)| format!("'{text}'")).collect::<Vec<_>>().join(" or ");
            self.raise(&format!("Expected '.' or {expected}"), Some(";"), None);
            None
        }
    }

    // ---- monitorlist = "MONITOR" "{" { point ";" } "}"

    fn monitor_list(&mut self) {
        if !self.skip {
            if self.symbol.is_keyword(names::MONITOR_ID) {
                self.advance();
            } else {
                self.raise("Expected 'MONITOR'", Some("{"), None);
            }
        }
        self.skip = false;

        if self.symbol.kind == SymbolKind::BraceLeft {
            self.advance();
        } else {
            self.raise("Expected '{'", None, None);
        }

        self.monitor();
        let mut closing_brace_expected = true;
        while self.symbol.kind != SymbolKind::BraceRight && self.symbol.kind != SymbolKind::Eof {
            if self.symbol.is_keyword(names::END_ID) {
                let check_symbol = self.peek();
                if check_symbol.kind == SymbolKind::BraceLeft {
                    self.skip = true;
                    self.raise("Expected '}'", None, None);
                    self.symbol = check_symbol;
                    closing_brace_expected = false;
                    break;
                }
                self.raise("Device names cannot be Keywords: END", Some(";"), None);
                self.advance();
            }
            self.monitor();
        }
        if closing_brace_expected {
            self.advance();
        }
    }

    fn monitor(&mut self) {
        if let Some(point) = self.point(&[(SymbolKind::Semicolon, ";")]) {
            if !self.error_flag {
                let dev_id = self.circuit.names.intern(&point.device.string);
                let pin_id = point.pin.as_ref().map(|sym| self.circuit.names.intern(&sym.string));
                let anchor = point.pin.clone().unwrap_or_else(|| point.device.clone());
                if let Err(err) = self.circuit.monitors.make_monitor(&self.circuit.devices, dev_id, pin_id) {
                    self.raise(&err.to_string(), None, Some(anchor));
                }
            }
        }
        if self.symbol.kind == SymbolKind::Semicolon {
            self.advance();
        } else {
            self.raise("Expected ';'", None, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::SignalLevel;

    fn parse(source: &str) -> (bool, Circuit) {
        let scanner = Scanner::from_source(source);
        let mut circuit = Circuit::new();
        let ok = {
            let mut parser = Parser::new(scanner, &mut circuit);
            parser.parse_network()
        };
        (ok, circuit)
    }

    const VALID: &str = "
        CIRCUIT {
            DEVICES {
                sw1 = SWITCH(1);
                g1 = NOT;
            }
            CONNECT {
                sw1 > g1.I1;
            }
            MONITOR {
                g1;
            }
        }
        END
    ";

    #[test]
    fn parses_a_minimal_valid_circuit() {
        let (ok, mut circuit) = parse(VALID);
        assert!(ok, "expected parse to succeed");
        assert!(circuit.execute_cycle());
        let g1 = circuit.names.query("g1").unwrap();
        assert_eq!(circuit.devices.output_level(g1, None).unwrap().collapse(), SignalLevel::Low);
    }

    #[test]
    fn missing_devices_closing_brace_is_recovered() {
        let source = "
            CIRCUIT {
                DEVICES {
                    sw1 = SWITCH(1);
                CONNECT {
                    sw1 > g1.I1;
                }
                MONITOR { }
            }
            END
        ";
        let (ok, _) = parse(source);
        assert!(!ok);
    }

    #[test]
    fn duplicate_device_name_is_a_semantic_error() {
        let source = "
            CIRCUIT {
                DEVICES {
                    sw1 = SWITCH(1);
                    sw1 = SWITCH(0);
                }
                CONNECT { }
                MONITOR { }
            }
            END
        ";
        let (ok, _) = parse(source);
        assert!(!ok);
    }

    #[test]
    fn stray_colon_in_a_connection_target_is_a_single_error() {
        // every input is wired by a clean statement first, so the one
        // malformed statement (which makes no connections at all, since
        // the whole destination list is discarded) contributes exactly
        // one diagnostic and leaves nothing unconnected behind it.
        let source = "
            CIRCUIT {
                DEVICES {
                    sw1, sw2 = SWITCH(0);
                    xor1 = XOR;
                    nor1 = NOR(2);
                }
                CONNECT {
                    sw1 > xor1.I1;
                    sw1 > xor1.I2;
                    sw1 > nor1.I1;
                    sw1 > nor1.I2;
                    sw2 > xor1:I2, nor1.I1;
                }
                MONITOR { }
            }
            END
        ";
        let scanner = Scanner::from_source(source);
        let mut circuit = Circuit::new();
        let mut parser = Parser::new(scanner, &mut circuit);
        let ok = parser.parse_network();
        assert!(!ok);
        assert_eq!(parser.error_count(), 1);
    }

    #[test]
    fn unconnected_input_is_reported_once() {
        let source = "
            CIRCUIT {
                DEVICES {
                    g1 = NOT;
                }
                CONNECT { }
                MONITOR { }
            }
            END
        ";
        let (ok, circuit) = parse(source);
        assert!(!ok);
        assert!(circuit.network.unconnected_inputs(&circuit.devices).len() == 1);
    }

    #[test]
    fn gate_input_count_out_of_range_is_rejected() {
        let source = "
            CIRCUIT {
                DEVICES {
                    g1 = AND(17);
                }
                CONNECT { }
                MONITOR { }
            }
            END
        ";
        let (ok, _) = parse(source);
        assert!(!ok);
    }

    #[test]
    fn switch_with_malformed_state_is_rejected() {
        let source = "
            CIRCUIT {
                DEVICES {
                    sw1 = SWITCH(2);
                }
                CONNECT { }
                MONITOR { }
            }
            END
        ";
        let (ok, _) = parse(source);
        assert!(!ok);
    }

    #[test]
    fn connecting_two_outputs_is_rejected() {
        let source = "
            CIRCUIT {
                DEVICES {
                    d1 = DTYPE;
                    d2 = DTYPE;
                }
                CONNECT {
                    d1.Q > d2.Q;
                }
                MONITOR { }
            }
            END
        ";
        let (ok, _) = parse(source);
        assert!(!ok);
    }
}

#![no_main]

use gatesim::circuit::Circuit;
use gatesim::scanner::Scanner;
use gatesim::Parser;
use libfuzzer_sys::fuzz_target;

// Exercises the scanner/parser pair on arbitrary bytes. Malformed circuit
// definitions are expected to be rejected with diagnostics, never to panic.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    let scanner = Scanner::from_source(source);
    let mut circuit = Circuit::new();
    let ok = {
        let mut parser = Parser::new(scanner, &mut circuit);
        parser.parse_network()
    };

    if ok {
        // A successfully parsed network must settle or report oscillation,
        // never panic, within a handful of cycles.
        for _ in 0..4 {
            if !circuit.execute_cycle() {
                break;
            }
        }
    }
});

#![no_main]

use gatesim::names::Names;
use gatesim::scanner::{Scanner, SymbolKind};
use libfuzzer_sys::fuzz_target;

// Drives the scanner alone, repeatedly pulling symbols until EOF. Catches
// lexical-layer panics (byte-position bookkeeping, long-line elision)
// independently of the parser's grammar-level recovery.
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    let mut scanner = Scanner::from_source(source);
    let mut names = Names::new();
    for _ in 0..10_000 {
        let symbol = scanner.get_symbol(&mut names);
        if symbol.kind == SymbolKind::Eof {
            break;
        }
    }
});

//! Lexical analyzer: reads circuit definition source text and translates
//! it into a stream of [`Symbol`]s, skipping whitespace and `\\ ... \\`
//! comments.
//!
//! The whole source file is read once at construction (to precompute
//! line boundaries for [`Scanner::print_error`]) and then scanned with a
//! one-character lookahead held in `current_character`, avoiding
//! random-access file seeks in the hot path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ScannerError;
use crate::names::{NameId, Names};

/// Longest source line `print_error` will print without eliding the
/// middle (or an end) with `[...]`.
const MAX_ERROR_LINE_LENGTH: usize = 79;

/// The kind of a scanned token, carrying whatever payload it needs (a
/// [`NameId`] for keywords/names, an integer for numbers). Grouping the
/// payload into the variant instead of a separate `id: u64` field lets
/// the compiler rule out mismatched accesses instead of a reader having
/// to remember which kinds populate which field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Comma,
    Semicolon,
    Equals,
    Keyword(NameId),
    Number(u64),
    Zero,
    Name(NameId),
    BraceLeft,
    BraceRight,
    ParenLeft,
    ParenRight,
    Arrow,
    Dot,
    Eof,
    Invalid,
}

/// A single lexical token: its kind, the byte offset of its first
/// character in the source, and its literal spelling (used for error
/// display and for the parser's stopping-symbol comparisons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub position: usize,
    pub string: String,
}

impl Symbol {
    /// The `NameId` carried by a `Keyword` or `Name` symbol, if any.
    pub fn name_id(&self) -> Option<NameId> {
        match self.kind {
            SymbolKind::Keyword(id) | SymbolKind::Name(id) => Some(id),
            _ => None,
        }
    }

    /// The integer value carried by a `Number` or `Zero` symbol, if any.
    /// Used by the parser where the grammar accepts either interchangeably
    /// (e.g. a SWITCH's initial state, which may be spelled `0` or `1`).
    pub fn numeric_value(&self) -> Option<u64> {
        match self.kind {
            SymbolKind::Zero => Some(0),
            SymbolKind::Number(n) => Some(n),
            _ => None,
        }
    }

    /// True if this symbol is the keyword `id`.
    pub fn is_keyword(&self, id: NameId) -> bool {
        matches!(self.kind, SymbolKind::Keyword(k) if k == id)
    }
}

/// Reads a circuit definition file and translates its characters into
/// [`Symbol`]s.
pub struct Scanner {
    bytes: Vec<u8>,
    line_starts: Vec<usize>,
    line_texts: Vec<String>,
    position: usize,
    current_character: Option<u8>,
    comment: bool,
}

impl Scanner {
    /// Opens `path`, failing with [`ScannerError`] if it does not exist,
    /// does not have a `.txt` extension, or cannot be read.
    pub fn new(path: &Path) -> Result<Self, ScannerError> {
        if !path.is_file() {
            return Err(ScannerError::NotFound(path.to_path_buf()));
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
            return Err(ScannerError::WrongExtension(path.to_path_buf()));
        }
        let source = fs::read_to_string(path).map_err(|source| ScannerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_source(&source))
    }

    /// Builds a scanner directly from in-memory source text, bypassing
    /// the filesystem. Used by tests and by fuzz targets.
    pub fn from_source(source: &str) -> Self {
        let bytes = source.as_bytes().to_vec();

        let mut line_starts = Vec::new();
        let mut acc = 0usize;
        for line in source.split_inclusive('\n') {
            line_starts.push(acc);
            acc += line.len();
        }
        if line_starts.is_empty() {
            line_starts.push(0);
        }
        let line_texts: Vec<String> = source.split('\n').map(str::to_string).collect();

        let current_character = bytes.first().copied();
        Scanner {
            bytes,
            line_starts,
            line_texts,
            position: 0,
            current_character,
            comment: false,
        }
    }

    /// Translates the next sequence of characters into a [`Symbol`]. At
    /// end of input, returns a symbol of kind `Eof`.
    pub fn get_symbol(&mut self, names: &mut Names) -> Symbol {
        self.skip_spaces();

        if self.current_character == Some(b'\\') {
            self.comment = self.check_comment();
            if !self.comment {
                self.backwards();
            }
            let mut ended_via_break = false;
            while self.comment {
                match self.current_character {
                    None => {
                        ended_via_break = true;
                        break;
                    }
                    Some(b'\\') => {
                        self.comment = self.check_comment();
                    }
                    _ => {}
                }
                self.advance();
            }
            if !ended_via_break {
                self.skip_spaces();
            }
        }

        let position = self.position;
        let symbol = match self.current_character {
            Some(c) if c.is_ascii_alphabetic() => {
                let name_string = self.get_name();
                let id = names.intern(&name_string);
                let kind = if crate::names::KEYWORDS.contains(&name_string.as_str()) {
                    SymbolKind::Keyword(id)
                } else {
                    SymbolKind::Name(id)
                };
                Symbol {
                    kind,
                    position,
                    string: name_string,
                }
            }
            Some(c) if c.is_ascii_digit() => {
                if c == b'0' {
                    self.advance();
                    Symbol {
                        kind: SymbolKind::Zero,
                        position,
                        string: "0".to_string(),
                    }
                } else {
                    let n = self.get_number();
                    Symbol {
                        kind: SymbolKind::Number(n),
                        position,
                        string: n.to_string(),
                    }
                }
            }
            Some(b',') => self.single_char_symbol(SymbolKind::Comma, position),
            Some(b';') => self.single_char_symbol(SymbolKind::Semicolon, position),
            Some(b'=') => self.single_char_symbol(SymbolKind::Equals, position),
            Some(b'{') => self.single_char_symbol(SymbolKind::BraceLeft, position),
            Some(b'}') => self.single_char_symbol(SymbolKind::BraceRight, position),
            Some(b'(') => self.single_char_symbol(SymbolKind::ParenLeft, position),
            Some(b')') => self.single_char_symbol(SymbolKind::ParenRight, position),
            Some(b'>') => self.single_char_symbol(SymbolKind::Arrow, position),
            Some(b'.') => self.single_char_symbol(SymbolKind::Dot, position),
            None => {
                self.advance();
                Symbol {
                    kind: SymbolKind::Eof,
                    position,
                    string: String::new(),
                }
            }
            Some(c) => {
                let s = (c as char).to_string();
                self.advance();
                Symbol {
                    kind: SymbolKind::Invalid,
                    position,
                    string: s,
                }
            }
        };

        if symbol.kind == SymbolKind::Eof && self.comment {
            self.print_error(&symbol, "File ended with open comment. Expected '\\\\'");
        }

        symbol
    }

    fn single_char_symbol(&mut self, kind: SymbolKind, position: usize) -> Symbol {
        let string = (self.current_character.unwrap() as char).to_string();
        self.advance();
        Symbol {
            kind,
            position,
            string,
        }
    }

    fn skip_spaces(&mut self) {
        while matches!(self.current_character, Some(c) if (c as char).is_whitespace()) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_character = self.bytes.get(self.position).copied();
    }

    fn backwards(&mut self) {
        self.position = self.position.saturating_sub(1);
        self.current_character = self.bytes.get(self.position).copied();
    }

    fn get_name(&mut self) -> String {
        let mut name = String::new();
        name.push(self.current_character.unwrap() as char);
        self.advance();
        while matches!(self.current_character, Some(c) if (c as char).is_ascii_alphanumeric()) {
            name.push(self.current_character.unwrap() as char);
            self.advance();
        }
        name
    }

    fn get_number(&mut self) -> u64 {
        let mut number = (self.current_character.unwrap() - b'0') as u64;
        self.advance();
        while matches!(self.current_character, Some(c) if c.is_ascii_digit()) {
            let digit = (self.current_character.unwrap() - b'0') as u64;
            number = number.saturating_mul(10).saturating_add(digit);
            self.advance();
        }
        number
    }

    /// Checks whether the backslash just seen starts or ends a comment:
    /// advances past it and peeks at the following character, toggling
    /// the comment flag only if that character is also a backslash.
    fn check_comment(&mut self) -> bool {
        self.advance();
        if self.current_character == Some(b'\\') {
            !self.comment
        } else {
            self.comment
        }
    }

    /// Finds the 1-based line number and 0-based column of a byte
    /// offset, plus that line's display text (without its terminating
    /// newline).
    fn locate(&self, position: usize) -> (usize, usize, &str) {
        let mut line_index = 0usize;
        for (i, &start) in self.line_starts.iter().enumerate() {
            if start <= position {
                line_index = i;
            } else {
                break;
            }
        }
        let col = position.saturating_sub(self.line_starts[line_index]);
        let text = self.line_texts.get(line_index).map(String::as_str).unwrap_or("");
        (line_index + 1, col, text)
    }

    /// The 1-based line number and 0-based column of a byte offset, for
    /// callers that want to log a diagnostic's location without the full
    /// formatted excerpt `print_error` produces.
    pub fn line_col(&self, position: usize) -> (usize, usize) {
        let (line, col, _) = self.locate(position);
        (line, col)
    }

    /// Formats a multi-line error excerpt: `Error on line L:`, the
    /// (possibly elided) source line, a caret under the offending
    /// column, and `suggestion`. Also prints the same text to stdout,
    /// so a diagnostic is visible immediately as well as returned.
    pub fn print_error(&self, symbol: &Symbol, suggestion: &str) -> String {
        let (line, col, line_text) = self.locate(symbol.position);
        let (display_text, display_col) = elide_line(line_text, col, MAX_ERROR_LINE_LENGTH);
        let output = format!(
            "Error on line {line}:\n\n{display_text}\n{pad}^\n\n{suggestion}",
            pad = " ".repeat(display_col),
        );
        println!("\n\n{output}");
        output
    }
}

/// Shortens `line` for display if it is longer than `max_len`,
/// replacing the elided prefix and/or suffix with `[...]` while keeping
/// `position` (a column index into `line`) visible. Returns the
/// (possibly shortened) text and the caret column within it.
fn elide_line(line: &str, position: usize, max_len: usize) -> (String, usize) {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= max_len {
        return (line.to_string(), position);
    }

    let mut chars = chars;
    let mut pos = position as isize;
    let half = (max_len as isize + 1) / 2;

    if pos > half - 5 {
        let cut = (pos - half + 6).max(0) as usize;
        let cut = cut.min(chars.len());
        chars = prepend_ellipsis(chars[cut..].to_vec());
        pos = half - 1;
    }

    if (chars.len() as isize - pos) > half {
        let end = (pos + max_len as isize / 2 - 4).max(0) as usize;
        let end = end.min(chars.len());
        chars.truncate(end);
        chars = append_ellipsis(chars);
    }

    (chars.into_iter().collect(), pos.max(0) as usize)
}

fn prepend_ellipsis(mut chars: Vec<char>) -> Vec<char> {
    let mut out: Vec<char> = "[...]".chars().collect();
    out.append(&mut chars);
    out
}

fn append_ellipsis(mut chars: Vec<char>) -> Vec<char> {
    chars.extend("[...]".chars());
    chars
}

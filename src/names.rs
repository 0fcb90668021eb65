//! Interning table mapping strings to small integer identifiers.
//!
//! All other components refer to names by [`NameId`] rather than by
//! `String`, so that device/pin/keyword identity reduces to an integer
//! comparison. A dual hash-map (string -> id) plus vector (id -> string)
//! gives O(1) lookup in both directions with IDs stable for the lifetime
//! of the table.

use std::collections::HashMap;
use std::fmt;

/// A stable integer identifier assigned by [`Names`] on first lookup of a
/// string. IDs are dense, starting at 0, and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameId(u32);

impl NameId {
    /// Constructs a `NameId` from a raw index. Only meant for call sites
    /// that already know the index is valid (e.g. pre-declared pin IDs
    /// that mirror the keyword table's construction order).
    pub(crate) fn from_index(index: u32) -> Self {
        NameId(index)
    }

    /// Returns the raw integer value of this ID.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed keyword vocabulary, reserved as the dense ID prefix 0..N of
/// every fresh [`Names`] table, so a single integer comparison suffices
/// for keyword recognition.
pub const KEYWORDS: &[&str] = &[
    "CIRCUIT", "DEVICES", "CONNECT", "MONITOR", "END", "CLOCK", "SWITCH", "AND", "NAND", "OR",
    "NOR", "XOR", "NOT", "DTYPE",
];

macro_rules! keyword_ids {
    ($($konst:ident => $index:expr),* $(,)?) => {
        $(pub const $konst: NameId = NameId($index);)*
    };
}

keyword_ids! {
    CIRCUIT_ID => 0,
    DEVICES_ID => 1,
    CONNECT_ID => 2,
    MONITOR_ID => 3,
    END_ID => 4,
    CLOCK_ID => 5,
    SWITCH_ID => 6,
    AND_ID => 7,
    NAND_ID => 8,
    OR_ID => 9,
    NOR_ID => 10,
    XOR_ID => 11,
    NOT_ID => 12,
    DTYPE_ID => 13,
}

/// String interning table. See the module documentation for the
/// rationale behind the dual hash-map/vector representation.
#[derive(Debug, Default, Clone)]
pub struct Names {
    ids: HashMap<String, NameId>,
    strings: Vec<String>,
}

impl Names {
    /// Creates a fresh table with the keyword vocabulary pre-interned at
    /// IDs 0..KEYWORDS.len(), so every table has the same stable IDs for
    /// reserved words regardless of what else gets interned afterward.
    pub fn new() -> Self {
        let mut names = Names {
            ids: HashMap::new(),
            strings: Vec::new(),
        };
        for keyword in KEYWORDS {
            names.intern(keyword);
        }
        debug_assert_eq!(names.query("DTYPE"), Some(DTYPE_ID));
        names
    }

    /// Interns a single string, returning its existing ID if known or
    /// assigning and returning the next unused ID otherwise.
    pub fn intern(&mut self, s: &str) -> NameId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = NameId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    /// Interns an ordered sequence of strings, returning their IDs in the
    /// same order. Split out as its own named operation (rather than
    /// runtime type dispatch on the argument) because every call site in
    /// the parser knows statically whether it has one name or several.
    pub fn intern_many<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<NameId> {
        names.iter().map(|s| self.intern(s.as_ref())).collect()
    }

    /// Returns the ID of `s` if it has already been interned, without
    /// inserting it.
    pub fn query(&self, s: &str) -> Option<NameId> {
        self.ids.get(s).copied()
    }

    /// Inverse lookup: the string an ID was assigned to, or `None` if
    /// `id` is out of range for this table.
    pub fn get_name_string(&self, id: NameId) -> Option<&str> {
        self.strings.get(id.index() as usize).map(String::as_str)
    }

    /// Number of distinct names interned so far (including keywords).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_occupy_fixed_prefix() {
        let names = Names::new();
        for (i, kw) in KEYWORDS.iter().enumerate() {
            assert_eq!(names.query(kw), Some(NameId(i as u32)));
        }
    }

    #[test]
    fn fresh_name_gets_next_id() {
        let mut names = Names::new();
        let base = names.len() as u32;
        let id = names.intern("sw1");
        assert_eq!(id.index(), base);
        assert_eq!(names.intern("sw1"), id, "re-interning returns the same id");
    }

    #[test]
    fn round_trip() {
        let mut names = Names::new();
        let id = names.intern("clk1");
        assert_eq!(names.get_name_string(id), Some("clk1"));
        assert_eq!(names.query("clk1"), Some(id));
    }

    #[test]
    fn query_never_inserts() {
        let names = Names::new();
        assert_eq!(names.query("nonexistent"), None);
    }

    #[test]
    fn out_of_range_id_is_none() {
        let names = Names::new();
        let bogus = NameId(10_000);
        assert_eq!(names.get_name_string(bogus), None);
    }

    #[test]
    fn intern_many_preserves_order() {
        let mut names = Names::new();
        let ids = names.intern_many(&["a", "b", "a", "c"]);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(names.get_name_string(ids[3]), Some("c"));
    }
}

//! Placeholder for a GUI front end's string-translation hook. This crate
//! has no GUI; a downstream front end is expected to replace it with a
//! real localization lookup without touching the simulator core.

/// Returns `s` unmodified. A localized front end swaps this out for a
/// real translation lookup; the simulator core never depends on the
/// result differing from its input.
pub fn translate(s: &str) -> &str {
    s
}

//! Crate-wide error taxonomy.
//!
//! Failures fall into five kinds: lexical, syntax, semantic,
//! network-runtime, and resource errors. Lexical/syntax/semantic errors
//! are accumulated by the parser (never raised as Rust errors — see
//! [`crate::parser::Parser`]); only resource errors (file missing, wrong
//! extension) and a handful of programmer errors in [`crate::names`]
//! propagate as `Result`s, via the `thiserror`-derived enums below.

use std::path::PathBuf;

use thiserror::Error;

use crate::names::NameId;

/// Failures constructing a [`crate::scanner::Scanner`]. These terminate
/// construction and are not recoverable.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("circuit definition file not found: {0}")]
    NotFound(PathBuf),

    #[error("circuit definition file must have a .txt extension: {0}")]
    WrongExtension(PathBuf),

    #[error("failed to read circuit definition file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Canned error codes returned by [`crate::network::Network::make_connection`].
/// Each has a fixed diagnostic message, indexed by variant, that the
/// parser attaches to the appropriate token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Input is already connected")]
    InputConnected,
    #[error("Output connected to output")]
    OutputToOutput,
    #[error("Device absent")]
    DeviceAbsent1,
    #[error("Device absent")]
    DeviceAbsent2,
    #[error("Port absent")]
    PortAbsent1,
    #[error("Port absent")]
    PortAbsent2,
}

/// Error codes returned by [`crate::monitors::Monitors::make_monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("Monitor already present")]
    MonitorPresent,
    #[error("Not an output")]
    NotOutput,
    #[error("Device absent")]
    DeviceAbsent,
}

/// Error codes returned by the [`crate::devices`] `make_*` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Device already present")]
    DeviceAlreadyPresent,
    #[error("Invalid qualifier for this device kind")]
    InvalidQualifier,
    #[error("Number of inputs must be between 1-16")]
    InvalidInputCount,
    #[error("No such device")]
    DeviceNotFound,
    #[error("Device is not a switch")]
    NotASwitch,
}

/// Raised only at the Parser/Devices boundary when a device ID is looked
/// up by a name that was never interned (a programmer error in the
/// caller, not a file-content error — those are SemanticErrors
/// accumulated by the parser instead).
#[derive(Debug, Error)]
#[error("no device registered for name id {0}")]
pub struct UnknownDeviceId(pub NameId);

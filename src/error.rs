//! Error shapes produced by the subnet table.
//!
//! Mirrors the donor codebase's own error style: a hand-rolled enum with
//! manual `Display`/`Error` impls rather than a derive-macro crate.

use std::fmt;

/// Why a textual subnet form was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input was empty after trimming the optional suffixes.
    Empty,
    /// `#weight` suffix did not parse as an integer, or had trailing garbage.
    InvalidWeight,
    /// `/prefix` suffix did not parse as a non-negative integer, or had
    /// trailing garbage.
    InvalidPrefix,
    /// A prefix length was given together with a MAC address body.
    PrefixWithMac,
    /// The prefix length exceeds the address family's width.
    PrefixOutOfRange,
    /// The body did not parse as a MAC address, IPv4 address, or IPv6
    /// address.
    UnrecognizedBody,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::Empty => "empty subnet string",
            ParseError::InvalidWeight => "invalid #weight suffix",
            ParseError::InvalidPrefix => "invalid /prefix suffix",
            ParseError::PrefixWithMac => "prefix length given with a MAC address",
            ParseError::PrefixOutOfRange => "prefix length out of range for address family",
            ParseError::UnrecognizedBody => "not a MAC, IPv4, or IPv6 address",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Logs and aborts the process. Used only when an internal invariant is
/// violated (an unknown `SubnetType` reaches the comparator or formatter) —
/// per spec this indicates memory corruption or a programming error, not a
/// recoverable condition.
///
/// The reference C implementation calls `exit(0)` here, a success status
/// for an internal error. This is an intentional deviation: we log at
/// `error` and panic, which aborts with a nonzero status.
#[track_caller]
pub fn fatal_invariant(msg: &str) -> ! {
    tracing::error!(message = msg, "fatal internal invariant violation");
    panic!("meshsubnet: fatal internal invariant violation: {msg}");
}

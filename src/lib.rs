//! Subnet routing table core for a mesh VPN overlay daemon.
//!
//! Tracks which node owns which MAC address, IPv4 prefix, or IPv6 prefix,
//! serves longest-prefix-match lookups with a small per-family cache, and
//! emits `subnet-up`/`subnet-down` hook events as ownership changes. This
//! crate has no network or process-execution surface of its own: callers
//! supply a [`hooks::HookRunner`] to actually run scripts, and a
//! [`node::Node`] registry to represent peers.

pub mod address;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod hooks;
pub mod node;
pub mod subnet;
pub mod table;

pub use address::MacAddr;
pub use codec::{format_subnet, parse_subnet};
pub use config::TableConfig;
pub use error::ParseError;
pub use hooks::{HookEnv, HookRunner, NullHookRunner};
pub use node::Node;
pub use subnet::{Subnet, SubnetKey, SubnetType};
pub use table::Table;

//! The hook emitter (§4.8): builds the `subnet-up`/`subnet-down` key-value
//! environment and hands it, together with the event name, to an external
//! `HookRunner`. This crate never executes a script itself — that
//! subsystem is explicitly out of scope — it only supplies the tuple,
//! mirroring the donor's `dispatch_webhook`/`send_webhook` split: build the
//! payload, hand it to a sink, log failures, never panic.

use std::rc::Rc;

use crate::codec::format_subnet;
use crate::config::TableConfig;
use crate::node::Node;
use crate::subnet::Subnet;

pub const EVENT_SUBNET_UP: &str = "subnet-up";
pub const EVENT_SUBNET_DOWN: &str = "subnet-down";

/// The environment passed to a `subnet-up`/`subnet-down` hook (§4.8).
#[derive(Debug, Clone)]
pub struct HookEnv {
    pub netname: String,
    pub device: String,
    pub interface: String,
    pub node: String,
    pub name: String,
    pub subnet: String,
    pub weight: String,
    pub remote_address: Option<String>,
    pub remote_port: Option<String>,
}

impl HookEnv {
    pub fn build(config: &TableConfig, owner: &Rc<Node>, myself: &Rc<Node>, subnet: &Subnet) -> Self {
        let formatted = format_subnet(subnet);
        // Strip the #weight suffix and surface it as its own variable.
        let (subnet_text, weight_text) = match formatted.split_once('#') {
            Some((s, w)) => (s.to_string(), w.to_string()),
            None => (formatted, String::new()),
        };

        let (remote_address, remote_port) = if !Rc::ptr_eq(owner, myself) {
            owner
                .address()
                .map(|addr| (addr.ip().to_string(), addr.port().to_string()))
                .unzip()
        } else {
            (None, None)
        };

        Self {
            netname: config.netname_str().to_string(),
            device: config.device_str().to_string(),
            interface: config.iface_str().to_string(),
            node: owner.name.clone(),
            name: myself.name.clone(),
            subnet: subnet_text,
            weight: weight_text,
            remote_address,
            remote_port,
        }
    }

    /// The environment as an ordered list of `KEY=VALUE`-style pairs, in
    /// the same order the reference implementation's `envp` array uses.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("NETNAME", self.netname.clone()),
            ("DEVICE", self.device.clone()),
            ("INTERFACE", self.interface.clone()),
            ("NODE", self.node.clone()),
            ("NAME", self.name.clone()),
            ("SUBNET", self.subnet.clone()),
            ("WEIGHT", self.weight.clone()),
        ];
        if let Some(address) = &self.remote_address {
            pairs.push(("REMOTEADDRESS", address.clone()));
        }
        if let Some(port) = &self.remote_port {
            pairs.push(("REMOTEPORT", port.clone()));
        }
        pairs
    }
}

/// Invokes an operator hook given its name and environment. The actual
/// script-execution subsystem is an external collaborator; implementations
/// should never panic here — log and move on, as the mutation API (§4.7)
/// that drives this cannot fail.
pub trait HookRunner {
    fn execute(&self, name: &str, env: &HookEnv);
}

/// Discards every event, logging at `debug`. Useful for embedding this
/// crate in a daemon that hasn't wired up script execution yet, and for
/// tests.
#[derive(Debug, Default)]
pub struct NullHookRunner;

impl HookRunner for NullHookRunner {
    fn execute(&self, name: &str, env: &HookEnv) {
        tracing::debug!(hook = name, subnet = %env.subnet, node = %env.node, "hook invoked (no-op runner)");
    }
}

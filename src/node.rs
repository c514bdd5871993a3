//! Minimal stand-in for the node registry, which is an external
//! collaborator per the specification. Only the surface the subnet table
//! actually touches is implemented here: a name, a reachability flag, a
//! per-node subnet index, and a last-known transport endpoint.
//!
//! A real daemon would own a richer node registry (peer handshake, config
//! file parsing, key material, ...); none of that belongs in this crate.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::rc::Rc;

use crate::subnet::Subnet;

/// A mesh peer that can own subnets.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    reachable: Cell<bool>,
    address: RefCell<Option<SocketAddr>>,
    pub subnet_tree: RefCell<BTreeSet<Rc<Subnet>>>,
}

impl Node {
    /// Creates a new node, initially unreachable with no known address.
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            reachable: Cell::new(false),
            address: RefCell::new(None),
            subnet_tree: RefCell::new(BTreeSet::new()),
        })
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.get()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.set(reachable);
    }

    pub fn address(&self) -> Option<SocketAddr> {
        *self.address.borrow()
    }

    pub fn set_address(&self, address: Option<SocketAddr>) {
        *self.address.borrow_mut() = address;
    }

    /// Number of subnets currently registered to this node.
    pub fn subnet_count(&self) -> usize {
        self.subnet_tree.borrow().len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_unreachable_with_no_address() {
        let n = Node::new("relay-1");
        assert!(!n.is_reachable());
        assert_eq!(n.address(), None);
        assert_eq!(n.subnet_count(), 0);
    }

    #[test]
    fn reachability_is_mutable() {
        let n = Node::new("relay-1");
        n.set_reachable(true);
        assert!(n.is_reachable());
    }
}

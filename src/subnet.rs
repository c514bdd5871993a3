//! The subnet record and its total order (§4.2, §4.5).

use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

use crate::address::MacAddr;
use crate::node::Node;

/// Default weight assigned to a subnet when the textual form omits `#weight`.
pub const DEFAULT_WEIGHT: i32 = 10;

/// Which of the three closed address families a subnet belongs to.
///
/// Ordinal order is fixed: `Mac < Ipv4 < Ipv6`. The exact numeric values are
/// an implementation detail; only their relative order is a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubnetType {
    Mac,
    Ipv4,
    Ipv6,
}

/// The variant payload for a [`Subnet`] — a closed sum over the three
/// address families, encoded as a tagged enum rather than through
/// inheritance (per the design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetKey {
    Mac { address: MacAddr },
    Ipv4 { address: Ipv4Addr, prefix: u8 },
    Ipv6 { address: Ipv6Addr, prefix: u8 },
}

impl SubnetKey {
    pub fn subnet_type(&self) -> SubnetType {
        match self {
            SubnetKey::Mac { .. } => SubnetType::Mac,
            SubnetKey::Ipv4 { .. } => SubnetType::Ipv4,
            SubnetKey::Ipv6 { .. } => SubnetType::Ipv6,
        }
    }

    pub fn prefix(&self) -> Option<u8> {
        match self {
            SubnetKey::Mac { .. } => None,
            SubnetKey::Ipv4 { prefix, .. } => Some(*prefix),
            SubnetKey::Ipv6 { prefix, .. } => Some(*prefix),
        }
    }
}

/// An ownership claim by a node over a MAC address or an IPv4/IPv6 prefix.
///
/// `owner` is set exactly once, by [`crate::table::Table::add`]; the parser
/// never populates it, to keep parsing pure (§4.2).
#[derive(Debug, Clone)]
pub struct Subnet {
    pub key: SubnetKey,
    pub weight: i32,
    pub owner: Option<Rc<Node>>,
    /// Opaque to this crate; preserved unchanged across the lifetime of the
    /// record for the benefit of other subsystems (e.g. lease expiry).
    pub expires: Option<i64>,
}

impl Subnet {
    /// Constructs an unowned subnet record with the default weight. Used by
    /// the parser and by lookup probes that only need a partially-filled
    /// record (see [`Subnet::probe`]).
    pub fn new(key: SubnetKey) -> Self {
        Self {
            key,
            weight: DEFAULT_WEIGHT,
            owner: None,
            expires: None,
        }
    }

    pub fn with_weight(key: SubnetKey, weight: i32) -> Self {
        Self {
            key,
            weight,
            owner: None,
            expires: None,
        }
    }

    /// A probe record for use with `lookup_exact`/`BTreeSet::get`: carries no
    /// owner, so the comparator's step 4 (owner-name tie-break) is skipped
    /// and the comparison falls back to the weight-diff result, per §4.5.
    pub fn probe(key: SubnetKey, weight: i32) -> Self {
        Self::with_weight(key, weight)
    }

    pub fn subnet_type(&self) -> SubnetType {
        self.key.subnet_type()
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner.as_deref().map(|n| n.name.as_str())
    }

    pub fn is_owner_reachable(&self) -> bool {
        self.owner.as_deref().map(Node::is_reachable).unwrap_or(false)
    }
}

fn key_cmp(a: &SubnetKey, b: &SubnetKey) -> Ordering {
    match (a, b) {
        (SubnetKey::Mac { address: a }, SubnetKey::Mac { address: b }) => a.cmp(b),
        (
            SubnetKey::Ipv4 {
                address: aa,
                prefix: pa,
            },
            SubnetKey::Ipv4 {
                address: ab,
                prefix: pb,
            },
        ) => {
            // Longer prefix sorts first.
            pb.cmp(pa).then_with(|| aa.octets().cmp(&ab.octets()))
        }
        (
            SubnetKey::Ipv6 {
                address: aa,
                prefix: pa,
            },
            SubnetKey::Ipv6 {
                address: ab,
                prefix: pb,
            },
        ) => pb.cmp(pa).then_with(|| aa.octets().cmp(&ab.octets())),
        _ => crate::error::fatal_invariant(
            "key_cmp called with mismatched subnet types after type-rank comparison",
        ),
    }
}

impl PartialEq for Subnet {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Subnet {}

impl PartialOrd for Subnet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subnet {
    /// The total order from §4.5: type first, then family-specific key
    /// (longest-prefix-first for IPv4/IPv6), then weight, then owner name
    /// (only when both owners are known).
    fn cmp(&self, other: &Self) -> Ordering {
        let type_ord = self.subnet_type().cmp(&other.subnet_type());
        if type_ord != Ordering::Equal {
            return type_ord;
        }

        let key_ord = key_cmp(&self.key, &other.key);
        if key_ord != Ordering::Equal {
            return key_ord;
        }

        let weight_ord = self.weight.cmp(&other.weight);
        if weight_ord != Ordering::Equal {
            return weight_ord;
        }

        match (&self.owner, &other.owner) {
            (Some(a), Some(b)) => a.name.cmp(&b.name),
            // Either owner is null: return the (zero) weight-diff result
            // as-is. This is what lets a partially-filled probe record
            // compare equal to a fully-owned tree entry in `lookup_exact`.
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn mac(b: [u8; 6]) -> SubnetKey {
        SubnetKey::Mac {
            address: MacAddr::new(b),
        }
    }

    fn v4(a: &str, prefix: u8) -> SubnetKey {
        SubnetKey::Ipv4 {
            address: a.parse().unwrap(),
            prefix,
        }
    }

    #[test]
    fn type_order_is_mac_lt_ipv4_lt_ipv6() {
        let m = Subnet::new(mac([0; 6]));
        let v4s = Subnet::new(v4("10.0.0.0", 8));
        let v6s = Subnet::new(SubnetKey::Ipv6 {
            address: "::".parse().unwrap(),
            prefix: 0,
        });
        assert!(m < v4s);
        assert!(v4s < v6s);
    }

    #[test]
    fn longer_prefix_sorts_first() {
        let wide = Subnet::new(v4("10.0.0.0", 8));
        let narrow = Subnet::new(v4("10.1.0.0", 16));
        assert!(narrow < wide);
    }

    #[test]
    fn weight_breaks_ties_lower_first() {
        let a = Subnet::with_weight(v4("10.0.0.0", 8), 5);
        let b = Subnet::with_weight(v4("10.0.0.0", 8), 10);
        assert!(a < b);
    }

    #[test]
    fn owner_name_breaks_weight_ties() {
        let n1 = Node::new("alice");
        let n2 = Node::new("bob");
        let mut a = Subnet::new(v4("10.0.0.0", 8));
        a.owner = Some(n1);
        let mut b = Subnet::new(v4("10.0.0.0", 8));
        b.owner = Some(n2);
        assert!(a < b);
    }

    #[test]
    fn partial_probe_compares_equal_ignoring_owner() {
        let n1 = Node::new("alice");
        let mut owned = Subnet::new(v4("10.0.0.0", 8));
        owned.owner = Some(n1);
        let probe = Subnet::probe(v4("10.0.0.0", 8), DEFAULT_WEIGHT);
        assert_eq!(owned.cmp(&probe), Ordering::Equal);
    }

    #[test]
    fn total_order_is_antisymmetric_and_transitive_over_a_sample() {
        let n1 = Node::new("alice");
        let n2 = Node::new("bob");
        let mut items = vec![
            Subnet::new(mac([1, 2, 3, 4, 5, 6])),
            Subnet::new(v4("10.0.0.0", 8)),
            Subnet::new(v4("10.1.0.0", 16)),
            Subnet::with_weight(v4("10.1.0.0", 16), 3),
        ];
        items[1].owner = Some(n1.clone());
        items[2].owner = Some(n2.clone());

        for a in &items {
            for b in &items {
                assert_eq!(a.cmp(b).reverse(), b.cmp(a));
            }
        }
        for a in &items {
            for b in &items {
                for c in &items {
                    if a.cmp(b) == Ordering::Less && b.cmp(c) == Ordering::Less {
                        assert_eq!(a.cmp(c), Ordering::Less);
                    }
                }
            }
        }
    }
}

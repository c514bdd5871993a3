//! The ordered index (§4.4) plus the mutation (§4.7) and lookup (§4.6)
//! APIs tying every other component together.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

use tracing::debug;

use crate::address::{maskcmp_v4, maskcmp_v6, MacAddr};
use crate::cache::FamilyCache;
use crate::config::TableConfig;
use crate::hooks::{HookEnv, HookRunner, EVENT_SUBNET_DOWN, EVENT_SUBNET_UP};
use crate::node::Node;
use crate::subnet::{Subnet, SubnetKey, SubnetType};

/// The process-wide subnet table: one global ordered index, the three
/// per-family lookup caches, and the configuration/hook-runner context
/// needed to drive mutations. Constructed once per daemon (the idiomatic
/// equivalent of `init_subnets()`), torn down by dropping it.
pub struct Table {
    global: RefCell<BTreeSet<Rc<Subnet>>>,
    mac_cache: RefCell<FamilyCache<MacAddr>>,
    ipv4_cache: RefCell<FamilyCache<Ipv4Addr>>,
    ipv6_cache: RefCell<FamilyCache<Ipv6Addr>>,
    config: TableConfig,
    myself: Rc<Node>,
    hook_runner: Box<dyn HookRunner>,
}

impl Table {
    pub fn new(config: TableConfig, myself: Rc<Node>, hook_runner: Box<dyn HookRunner>) -> Self {
        Self {
            global: RefCell::new(BTreeSet::new()),
            mac_cache: RefCell::new(FamilyCache::default()),
            ipv4_cache: RefCell::new(FamilyCache::default()),
            ipv6_cache: RefCell::new(FamilyCache::default()),
            config,
            myself,
            hook_runner,
        }
    }

    pub fn myself(&self) -> &Rc<Node> {
        &self.myself
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of subnets currently registered, across all owners.
    pub fn len(&self) -> usize {
        self.global.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-order traversal of the global index — visits every entry exactly
    /// once, in the §4.5 total order (type, then longest-prefix-first,
    /// then weight, then owner name).
    pub fn dump(&self) -> Vec<Rc<Subnet>> {
        self.global.borrow().iter().cloned().collect()
    }

    // ---- Mutation API (§4.7) ----------------------------------------

    /// Sets `subnet.owner`, inserts into both the global index and the
    /// node's own index, then flushes every cache. Insertion collisions on
    /// the global index (a comparator-equal subnet already present) are
    /// not reported as failures — the cache is still flushed.
    pub fn add(&self, node: &Rc<Node>, mut subnet: Subnet) -> Rc<Subnet> {
        subnet.owner = Some(node.clone());
        let rc = Rc::new(subnet);

        node.subnet_tree.borrow_mut().insert(rc.clone());
        self.global.borrow_mut().insert(rc.clone());
        self.flush_cache();

        debug!(subnet = %crate::codec::format_subnet(&rc), node = %node.name, "subnet added");
        rc
    }

    /// Deletes from the node's index first (matching the reference
    /// implementation's order — the node's index is the owning one),
    /// then from the global index, then flushes every cache.
    pub fn remove(&self, node: &Rc<Node>, subnet: &Rc<Subnet>) {
        node.subnet_tree.borrow_mut().remove(subnet);
        self.global.borrow_mut().remove(subnet);
        self.flush_cache();

        debug!(subnet = %crate::codec::format_subnet(subnet), node = %node.name, "subnet removed");
    }

    /// Explicit node teardown: unlinks every subnet owned by `node` from
    /// the global index and clears the node's own index. The idiomatic
    /// stand-in for "destroying a node destroys its subnet tree, whose
    /// per-subnet destructor unlinks the global tree" (§9) — Rust's
    /// ownership model has no implicit destructor hook to do this for us
    /// without `Weak` keys, which can't live in a `BTreeSet`.
    pub fn remove_node(&self, node: &Rc<Node>) {
        let mut global = self.global.borrow_mut();
        for subnet in node.subnet_tree.borrow().iter() {
            global.remove(subnet);
        }
        drop(global);
        node.subnet_tree.borrow_mut().clear();
        self.flush_cache();
    }

    /// Fires `subnet-up`/`subnet-down` hooks. If `subnet` is `None`, one
    /// event is emitted per subnet currently owned by `owner`; otherwise
    /// exactly one event is emitted.
    pub fn update(&self, owner: &Rc<Node>, subnet: Option<&Rc<Subnet>>, up: bool) {
        let event = if up { EVENT_SUBNET_UP } else { EVENT_SUBNET_DOWN };

        match subnet {
            Some(subnet) => {
                let env = HookEnv::build(&self.config, owner, &self.myself, subnet);
                self.hook_runner.execute(event, &env);
            }
            None => {
                for subnet in owner.subnet_tree.borrow().iter() {
                    let env = HookEnv::build(&self.config, owner, &self.myself, subnet);
                    self.hook_runner.execute(event, &env);
                }
            }
        }
    }

    pub fn flush_cache(&self) {
        self.mac_cache.borrow_mut().flush();
        self.ipv4_cache.borrow_mut().flush();
        self.ipv6_cache.borrow_mut().flush();
    }

    // ---- Lookup API (§4.6) ------------------------------------------

    /// Finds a subnet in `owner`'s own index comparator-equal to `probe`.
    pub fn lookup_exact(&self, owner: &Rc<Node>, probe: &Subnet) -> Option<Rc<Subnet>> {
        owner.subnet_tree.borrow().get(probe).cloned()
    }

    /// Looks up the subnet owning MAC address `addr`. If `owner` is given,
    /// the search (and the cache check) is scoped to that node; otherwise
    /// it spans the global index.
    pub fn lookup_mac(&self, owner: Option<&Rc<Node>>, addr: &MacAddr) -> Option<Rc<Subnet>> {
        {
            let cache = self.mac_cache.borrow();
            if let Some(hit) = cache.get(addr, |answer| match (owner, answer) {
                (Some(owner), Some(answer)) => match &answer.owner {
                    Some(answer_owner) => Rc::ptr_eq(answer_owner, owner),
                    None => true,
                },
                _ => true,
            }) {
                return hit;
            }
        }

        let result = match owner {
            Some(owner) => self.scan_mac(owner.subnet_tree.borrow().iter(), addr),
            None => self.scan_mac(self.global.borrow().iter(), addr),
        };

        self.mac_cache.borrow_mut().put(*addr, result.clone());
        result
    }

    fn scan_mac<'a>(
        &self,
        candidates: impl Iterator<Item = &'a Rc<Subnet>>,
        addr: &MacAddr,
    ) -> Option<Rc<Subnet>> {
        let mut result: Option<Rc<Subnet>> = None;
        for candidate in candidates {
            let matches = match candidate.key {
                SubnetKey::Mac { address } => address == *addr,
                _ => false,
            };
            if !matches {
                continue;
            }
            if result.is_none() {
                result = Some(candidate.clone());
                if candidate.is_owner_reachable() {
                    break;
                }
            } else if candidate.is_owner_reachable() {
                result = Some(candidate.clone());
                break;
            }
        }
        result
    }

    /// Longest-prefix IPv4 lookup. The global index is ordered
    /// longest-prefix-first within the IPv4 family, so the first matching
    /// candidate is the longest match; reachability is only used to break
    /// ties among candidates sharing that same (longest) prefix length —
    /// it never causes a shorter-prefix match to supersede a longer one.
    pub fn lookup_ipv4(&self, addr: &Ipv4Addr) -> Option<Rc<Subnet>> {
        if let Some(hit) = self.ipv4_cache.borrow().get(addr, |_| true) {
            return hit;
        }

        let result = {
            let global = self.global.borrow();
            self.scan_prefix(
                global
                    .iter()
                    .filter(|s| s.subnet_type() == SubnetType::Ipv4),
                |candidate| match candidate.key {
                    SubnetKey::Ipv4 { address, prefix } => {
                        (maskcmp_v4(&address, addr, prefix), prefix)
                    }
                    _ => (false, 0),
                },
            )
        };

        self.ipv4_cache.borrow_mut().put(*addr, result.clone());
        result
    }

    /// As [`Table::lookup_ipv4`] but for IPv6.
    pub fn lookup_ipv6(&self, addr: &Ipv6Addr) -> Option<Rc<Subnet>> {
        if let Some(hit) = self.ipv6_cache.borrow().get(addr, |_| true) {
            return hit;
        }

        let result = {
            let global = self.global.borrow();
            self.scan_prefix(
                global
                    .iter()
                    .filter(|s| s.subnet_type() == SubnetType::Ipv6),
                |candidate| match candidate.key {
                    SubnetKey::Ipv6 { address, prefix } => {
                        (maskcmp_v6(&address, addr, prefix), prefix)
                    }
                    _ => (false, 0),
                },
            )
        };

        self.ipv6_cache.borrow_mut().put(*addr, result.clone());
        result
    }

    /// Shared longest-prefix-with-reachability-tiebreak scan for IPv4/IPv6.
    /// `test` returns `(does this candidate's masked address match, its
    /// prefix length)`. `candidates` must already be ordered
    /// longest-prefix-first within the matching family.
    fn scan_prefix<'a>(
        &self,
        candidates: impl Iterator<Item = &'a Rc<Subnet>>,
        test: impl Fn(&Subnet) -> (bool, u8),
    ) -> Option<Rc<Subnet>> {
        let mut result: Option<Rc<Subnet>> = None;
        let mut result_prefix: u8 = 0;

        for candidate in candidates {
            let (is_match, prefix) = test(candidate);
            if !is_match {
                continue;
            }

            match &result {
                None => {
                    result = Some(candidate.clone());
                    result_prefix = prefix;
                    if candidate.is_owner_reachable() {
                        break;
                    }
                }
                Some(_) => {
                    if prefix != result_prefix {
                        // Strictly shorter prefix than our current best —
                        // never supersedes it, matching or not.
                        break;
                    }
                    if candidate.is_owner_reachable() {
                        result = Some(candidate.clone());
                        break;
                    }
                    // Same-length unreachable tie: keep the first-seen one.
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_subnet;
    use crate::hooks::NullHookRunner;

    fn table() -> Table {
        Table::new(
            TableConfig::default(),
            Node::new("myself"),
            Box::new(NullHookRunner),
        )
    }

    fn subnet(text: &str) -> Subnet {
        parse_subnet(text).unwrap()
    }

    // Scenario 2 (spec §8): longest prefix wins even when its owner is
    // unreachable, provided no reachable match exists at that same length.
    #[test]
    fn longest_prefix_match_wins_even_if_unreachable() {
        let table = table();
        let n1 = Node::new("n1");
        n1.set_reachable(true);
        let n2 = Node::new("n2");
        n2.set_reachable(false);

        table.add(&n1, subnet("10.0.0.0/8"));
        table.add(&n1, subnet("10.1.0.0/16"));
        let target = table.add(&n2, subnet("10.1.2.0/24"));

        let result = table.lookup_ipv4(&"10.1.2.5".parse().unwrap()).unwrap();
        assert!(Rc::ptr_eq(&result, &target));
    }

    // Scenario 3 (spec §8): a reachable owner at equal prefix length wins
    // over an unreachable one at the same length.
    #[test]
    fn reachability_breaks_ties_at_equal_prefix_length() {
        let table = table();
        let n1 = Node::new("n1");
        n1.set_reachable(true);
        let n2 = Node::new("n2");
        n2.set_reachable(false);

        table.add(&n2, subnet("10.1.2.0/24"));
        let n1_subnet = table.add(&n1, subnet("10.1.2.0/24"));

        let result = table.lookup_ipv4(&"10.1.2.5".parse().unwrap()).unwrap();
        assert!(Rc::ptr_eq(&result, &n1_subnet));
    }

    // Scenario 4 (spec §8): legacy unpadded MAC parses and formats padded.
    #[test]
    fn legacy_mac_parses_and_round_trips() {
        let s = parse_subnet("5:4:0:1:3:5").unwrap();
        assert_eq!(crate::codec::format_subnet(&s), "05:04:00:01:03:05");
    }

    // Scenario 5 (spec §8): cache coherence across a mutation.
    #[test]
    fn cache_is_invalidated_by_add() {
        let table = table();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        assert!(table.lookup_ipv4(&addr).is_none());

        let n1 = Node::new("n1");
        n1.set_reachable(true);
        let added = table.add(&n1, subnet("10.0.0.0/8"));

        let result = table.lookup_ipv4(&addr).unwrap();
        assert!(Rc::ptr_eq(&result, &added));
    }

    // Scenario 6 (spec §8): remove after scenario 3 re-fills the cache
    // with the remaining entry.
    #[test]
    fn remove_falls_back_to_remaining_owner() {
        let table = table();
        let n1 = Node::new("n1");
        n1.set_reachable(true);
        let n2 = Node::new("n2");
        n2.set_reachable(false);

        let n2_subnet = table.add(&n2, subnet("10.1.2.0/24"));
        let n1_subnet = table.add(&n1, subnet("10.1.2.0/24"));

        let addr: Ipv4Addr = "10.1.2.5".parse().unwrap();
        let first = table.lookup_ipv4(&addr).unwrap();
        assert!(Rc::ptr_eq(&first, &n1_subnet));

        table.remove(&n1, &n1_subnet);

        let second = table.lookup_ipv4(&addr).unwrap();
        assert!(Rc::ptr_eq(&second, &n2_subnet));
    }

    #[test]
    fn mac_lookup_prefers_reachable_otherwise_first_seen() {
        let table = table();
        let n1 = Node::new("n1");
        n1.set_reachable(false);
        let n2 = Node::new("n2");
        n2.set_reachable(false);

        let first = table.add(&n1, subnet("52:54:00:12:34:56"));
        let _second = table.add(&n2, subnet("52:54:00:12:34:56"));

        let mac = MacAddr::new([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        let result = table.lookup_mac(None, &mac).unwrap();
        // Neither reachable: first-seen (n1's entry, inserted first) wins.
        assert!(Rc::ptr_eq(&result, &first));
    }

    #[test]
    fn mac_lookup_scoped_to_owner_ignores_other_owners() {
        let table = table();
        let n1 = Node::new("n1");
        let n2 = Node::new("n2");

        table.add(&n1, subnet("52:54:00:12:34:56"));
        let n2_subnet = table.add(&n2, subnet("aa:bb:cc:dd:ee:ff"));

        let mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert!(table.lookup_mac(Some(&n1), &mac).is_none());
        let result = table.lookup_mac(Some(&n2), &mac).unwrap();
        assert!(Rc::ptr_eq(&result, &n2_subnet));
    }

    #[test]
    fn lookup_exact_finds_a_previously_added_subnet() {
        let table = table();
        let n1 = Node::new("n1");
        let added = table.add(&n1, subnet("10.1.2.0/24#5"));

        let probe = subnet("10.1.2.0/24#5");
        let found = table.lookup_exact(&n1, &probe).unwrap();
        assert!(Rc::ptr_eq(&found, &added));
    }

    #[test]
    fn lookup_exact_misses_on_different_prefix() {
        let table = table();
        let n1 = Node::new("n1");
        table.add(&n1, subnet("10.1.2.0/24"));

        let probe = subnet("10.1.2.0/25");
        assert!(table.lookup_exact(&n1, &probe).is_none());
    }

    #[test]
    fn remove_node_unlinks_all_its_subnets_from_the_global_index() {
        let table = table();
        let n1 = Node::new("n1");
        table.add(&n1, subnet("10.0.0.0/8"));
        table.add(&n1, subnet("10.1.0.0/16"));
        assert_eq!(table.len(), 2);

        table.remove_node(&n1);
        assert_eq!(table.len(), 0);
        assert_eq!(n1.subnet_count(), 0);
    }

    #[test]
    fn ownership_symmetry_holds_after_add() {
        let table = table();
        let n1 = Node::new("n1");
        let added = table.add(&n1, subnet("10.0.0.0/8"));

        assert!(table.dump().iter().any(|s| Rc::ptr_eq(s, &added)));
        assert!(n1.subnet_tree.borrow().iter().any(|s| Rc::ptr_eq(s, &added)));
    }

    #[test]
    fn traversal_visits_overlapping_prefixes_in_non_increasing_length_order() {
        let table = table();
        let n1 = Node::new("n1");
        table.add(&n1, subnet("10.0.0.0/8"));
        table.add(&n1, subnet("10.1.0.0/16"));
        table.add(&n1, subnet("10.1.2.0/24"));

        let prefixes: Vec<u8> = table
            .dump()
            .into_iter()
            .filter_map(|s| match s.key {
                SubnetKey::Ipv4 { prefix, .. } => Some(prefix),
                _ => None,
            })
            .collect();
        assert_eq!(prefixes, vec![24, 16, 8]);
    }

    #[test]
    fn update_with_no_subnet_emits_one_event_per_owned_subnet() {
        use std::cell::RefCell;

        struct Recorder(RefCell<Vec<String>>);
        impl HookRunner for Recorder {
            fn execute(&self, name: &str, env: &HookEnv) {
                self.0.borrow_mut().push(format!("{name}:{}", env.subnet));
            }
        }

        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        struct Forwarder(Rc<Recorder>);
        impl HookRunner for Forwarder {
            fn execute(&self, name: &str, env: &HookEnv) {
                self.0.execute(name, env);
            }
        }

        let table = Table::new(
            TableConfig::default(),
            Node::new("myself"),
            Box::new(Forwarder(recorder.clone())),
        );
        let n1 = Node::new("n1");
        table.add(&n1, subnet("10.0.0.0/8"));
        table.add(&n1, subnet("10.1.0.0/16"));

        table.update(&n1, None, true);

        assert_eq!(recorder.0.borrow().len(), 2);
    }
}

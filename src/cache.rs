//! The two-slot per-family lookup cache (§3 "Cache", §4.6).

use std::rc::Rc;

use crate::subnet::Subnet;

const SLOTS: usize = 2;

struct Slot<K> {
    valid: bool,
    key: K,
    answer: Option<Rc<Subnet>>,
}

impl<K: Default> Default for Slot<K> {
    fn default() -> Self {
        Self {
            valid: false,
            key: K::default(),
            answer: None,
        }
    }
}

/// A 2-slot cache memoizing `address -> owning subnet` answers for one
/// address family. `next` toggles on every write so successive insertions
/// alternate slots.
pub struct FamilyCache<K> {
    slots: [Slot<K>; SLOTS],
    next: usize,
}

impl<K: Default + Copy + PartialEq> Default for FamilyCache<K> {
    fn default() -> Self {
        Self {
            slots: [Slot::default(), Slot::default()],
            next: 0,
        }
    }
}

impl<K: Copy + PartialEq> FamilyCache<K> {
    /// Looks for a cached answer. `accept` decides, given a cached answer,
    /// whether the slot counts as a hit for this particular query (used to
    /// implement MAC lookup's owner scoping — §4.6, "lookup_mac additionally
    /// filters cache slots by owner").
    pub fn get(&self, key: &K, accept: impl Fn(Option<&Rc<Subnet>>) -> bool) -> Option<Option<Rc<Subnet>>> {
        for slot in &self.slots {
            if slot.valid && slot.key == *key && accept(slot.answer.as_ref()) {
                return Some(slot.answer.clone());
            }
        }
        None
    }

    /// Writes `answer` (which may be `None`, meaning "no match") into the
    /// next slot and toggles the write index.
    pub fn put(&mut self, key: K, answer: Option<Rc<Subnet>>) {
        self.slots[self.next] = Slot {
            valid: true,
            key,
            answer,
        };
        self.next = 1 - self.next;
    }

    /// Invalidates every slot. The only way the cache loses entries.
    pub fn flush(&mut self) {
        for slot in &mut self.slots {
            slot.valid = false;
            slot.answer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_never_hits() {
        let cache: FamilyCache<u32> = FamilyCache::default();
        assert!(cache.get(&42, |_| true).is_none());
    }

    #[test]
    fn put_then_get_hits() {
        let mut cache: FamilyCache<u32> = FamilyCache::default();
        cache.put(42, None);
        assert_eq!(cache.get(&42, |_| true), Some(None));
        assert!(cache.get(&7, |_| true).is_none());
    }

    #[test]
    fn flush_invalidates_all_slots() {
        let mut cache: FamilyCache<u32> = FamilyCache::default();
        cache.put(1, None);
        cache.put(2, None);
        cache.flush();
        assert!(cache.get(&1, |_| true).is_none());
        assert!(cache.get(&2, |_| true).is_none());
    }

    #[test]
    fn two_slots_both_remain_queryable_until_a_third_write() {
        let mut cache: FamilyCache<u32> = FamilyCache::default();
        cache.put(1, None);
        cache.put(2, None);
        assert!(cache.get(&1, |_| true).is_some());
        assert!(cache.get(&2, |_| true).is_some());
        // Third write recycles slot 0 (the one written first).
        cache.put(3, None);
        assert!(cache.get(&1, |_| true).is_none());
        assert!(cache.get(&2, |_| true).is_some());
        assert!(cache.get(&3, |_| true).is_some());
    }
}

//! Record store: owns every live key/value pair.
//!
//! Records live in a generational arena, so a handle stays valid until its
//! own record is removed and never aliases a later record. Intrusive
//! `prev`/`next` links thread the records in insertion order; that order is
//! what iteration yields, independent of where records sit in the slot index.

use core::iter::FusedIterator;
use slotmap::{DefaultKey, SecondaryMap, SlotMap};

#[derive(Clone, Debug)]
pub(crate) struct Record<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    /// Primary hash, computed once on insert and reused by every rebuild.
    pub(crate) hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct RecordStore<K, V> {
    records: SlotMap<DefaultKey, Record<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> RecordStore<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            records: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn get(&self, k: DefaultKey) -> Option<&Record<K, V>> {
        self.records.get(k)
    }

    pub(crate) fn get_mut(&mut self, k: DefaultKey) -> Option<&mut Record<K, V>> {
        self.records.get_mut(k)
    }

    /// Stored hash of a live record. Panics on a stale handle.
    pub(crate) fn hash_of(&self, k: DefaultKey) -> u64 {
        self.records
            .get(k)
            .expect("indexed record must be live")
            .hash
    }

    pub(crate) fn head(&self) -> Option<DefaultKey> {
        self.head
    }

    pub(crate) fn tail(&self) -> Option<DefaultKey> {
        self.tail
    }

    pub(crate) fn next_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.records.get(k)?.next
    }

    pub(crate) fn prev_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.records.get(k)?.prev
    }

    /// Append a record at the end of insertion order.
    pub(crate) fn push_back(&mut self, key: K, value: V, hash: u64) -> DefaultKey {
        let prev = self.tail;
        let k = self.records.insert(Record {
            key,
            value,
            hash,
            prev,
            next: None,
        });
        match prev {
            Some(p) => self.records[p].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        k
    }

    /// Unlink and return a record; `None` for a stale handle.
    pub(crate) fn remove(&mut self, k: DefaultKey) -> Option<(K, V)> {
        let record = self.records.remove(k)?;
        match record.prev {
            Some(p) => self.records[p].next = record.next,
            None => self.head = record.next,
        }
        match record.next {
            Some(n) => self.records[n].prev = record.prev,
            None => self.tail = record.prev,
        }
        Some((record.key, record.value))
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.head = None;
        self.tail = None;
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            records: &self.records,
            next: self.head,
            remaining: self.records.len(),
        }
    }

    /// Ordered mutable iteration.
    ///
    /// The arena hands out disjoint `&mut` only through its own (unordered)
    /// iterator, so those borrows are parked in a side table first and then
    /// claimed in link order. This costs one O(len) allocation per call.
    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let next = self.head;
        let remaining = self.records.len();
        let mut pending = SecondaryMap::with_capacity(remaining);
        for (k, record) in self.records.iter_mut() {
            pending.insert(k, record);
        }
        IterMut {
            pending,
            next,
            remaining,
        }
    }
}

impl<K, V> IntoIterator for RecordStore<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { store: self }
    }
}

/// Iterator over `(&K, &V)` in insertion order.
pub struct Iter<'a, K, V> {
    records: &'a SlotMap<DefaultKey, Record<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.next?)?;
        self.next = record.next;
        self.remaining -= 1;
        Some((&record.key, &record.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            records: self.records,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

/// Iterator over `(&K, &mut V)` in insertion order.
pub struct IterMut<'a, K, V> {
    pending: SecondaryMap<DefaultKey, &'a mut Record<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let record = self.pending.remove(self.next?)?;
        self.next = record.next;
        self.remaining -= 1;
        let Record { key, value, .. } = record;
        let key: &'a K = key;
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)` in insertion order.
pub struct IntoIter<K, V> {
    store: RecordStore<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let head = self.store.head?;
        self.store.remove(head)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.store.len(), Some(self.store.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(keys: &[&'static str]) -> (RecordStore<&'static str, usize>, Vec<DefaultKey>) {
        let mut store = RecordStore::new();
        let handles = keys
            .iter()
            .enumerate()
            .map(|(i, k)| store.push_back(*k, i, i as u64))
            .collect();
        (store, handles)
    }

    fn keys(store: &RecordStore<&'static str, usize>) -> Vec<&'static str> {
        store.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn push_back_keeps_insertion_order() {
        let (store, handles) = store_of(&["a", "b", "c"]);
        assert_eq!(keys(&store), ["a", "b", "c"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.iter().len(), 3);
        assert_eq!(store.next_of(handles[0]), Some(handles[1]));
        assert_eq!(store.prev_of(handles[0]), None);
        assert_eq!(store.next_of(handles[2]), None);
        assert_eq!(store.hash_of(handles[1]), 1);
    }

    #[test]
    fn remove_relinks_neighbors() {
        let (mut store, handles) = store_of(&["a", "b", "c", "d"]);
        assert_eq!(store.remove(handles[1]), Some(("b", 1)));
        assert_eq!(keys(&store), ["a", "c", "d"]);
        assert_eq!(store.remove(handles[0]), Some(("a", 0)));
        assert_eq!(store.remove(handles[3]), Some(("d", 3)));
        assert_eq!(keys(&store), ["c"]);
        assert_eq!(store.prev_of(handles[2]), None);
        assert_eq!(store.next_of(handles[2]), None);

        // Appending after removing the tail links from the new tail.
        store.push_back("e", 4, 4);
        assert_eq!(keys(&store), ["c", "e"]);
    }

    #[test]
    fn stale_handle_does_not_resolve() {
        let (mut store, handles) = store_of(&["a"]);
        store.remove(handles[0]);
        let fresh = store.push_back("b", 1, 1);
        assert_ne!(fresh, handles[0]);
        assert!(store.get(handles[0]).is_none());
        assert_eq!(store.remove(handles[0]), None);
        assert_eq!(store.get(fresh).map(|r| r.key), Some("b"));
    }

    #[test]
    fn iter_mut_follows_links_after_slot_reuse() {
        let (mut store, handles) = store_of(&["a", "b", "c"]);
        store.remove(handles[0]);
        // Likely reuses the arena slot of "a" but must iterate last.
        store.push_back("d", 3, 3);
        for (_, v) in store.iter_mut() {
            *v *= 10;
        }
        let got: Vec<(&str, usize)> = store.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, [("b", 10), ("c", 20), ("d", 30)]);
    }

    #[test]
    fn into_iter_drains_in_order() {
        let (store, _) = store_of(&["x", "y", "z"]);
        let mut it = store.into_iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some(("x", 0)));
        assert_eq!(it.collect::<Vec<_>>(), [("y", 1), ("z", 2)]);
    }

    #[test]
    fn clear_resets_links() {
        let (mut store, handles) = store_of(&["a", "b"]);
        store.clear();
        assert_eq!(store.len(), 0);
        assert!(store.iter().next().is_none());
        assert!(store.get(handles[0]).is_none());
        store.push_back("c", 2, 2);
        assert_eq!(keys(&store), ["c"]);
    }
}

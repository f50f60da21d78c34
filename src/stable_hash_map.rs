//! StableHashMap: open-addressing slot index over an insertion-ordered record arena.

use crate::error::LookupError;
use crate::record_store::RecordStore;
use crate::reentrancy::DebugReentrancy;
use crate::slot_index::{Position, SlotIndex};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::ops::Index;
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;
use tracing::{debug, trace};

pub use crate::record_store::{IntoIter, Iter, IterMut};

/// Stable reference to one entry of a [`StableHashMap`].
///
/// A handle keeps resolving to its entry across inserts, removals of other
/// entries, and rebuilds. Once its own entry is removed it never resolves
/// again, even if a later entry reuses the storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V, S>(&self, map: &'a StableHashMap<K, V, S>) -> Option<&'a K> {
        map.records.get(self.0).map(|r| &r.key)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a StableHashMap<K, V, S>) -> Option<&'a V> {
        map.records.get(self.0).map(|r| &r.value)
    }

    pub fn value_mut<'a, K, V, S>(
        &self,
        map: &'a mut StableHashMap<K, V, S>,
    ) -> Option<&'a mut V> {
        map.records.get_mut(self.0).map(|r| &mut r.value)
    }

    /// The entry inserted right after this one that is still live.
    ///
    /// `None` at the end of the map or for a stale handle.
    pub fn next<K, V, S>(&self, map: &StableHashMap<K, V, S>) -> Option<Handle> {
        map.records.next_of(self.0).map(Handle::new)
    }

    /// The entry inserted right before this one that is still live.
    pub fn prev<K, V, S>(&self, map: &StableHashMap<K, V, S>) -> Option<Handle> {
        map.records.prev_of(self.0).map(Handle::new)
    }
}

/// Hash map with insertion-ordered iteration and handles that survive
/// unrelated mutation.
///
/// Inserting a key that is already present is a no-op; the stored value is
/// kept. Removal leaves a tombstone in the slot index. Tombstones are only
/// cleared when the index is rebuilt at double capacity, which happens as
/// soon as occupied plus tombstoned slots exceed half the capacity.
#[derive(Clone)]
pub struct StableHashMap<K, V, S = RandomState> {
    hasher: S,
    index: SlotIndex,
    records: RecordStore<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> StableHashMap<K, V, RandomState> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Empty map sized to take `capacity` inserts before its first rebuild.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> StableHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: SlotIndex::new(),
            records: RecordStore::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: SlotIndex::with_capacity(SlotIndex::capacity_for(capacity)),
            records: RecordStore::with_capacity(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// The hash builder the map was created with.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Number of slots in the index. At most half of them may be occupied or
    /// tombstoned before the next insert triggers a rebuild.
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Remove every entry.
    ///
    /// Occupied slots become tombstones; the slot array is kept at its current
    /// size and the next rebuild still counts the cleared slots.
    pub fn clear(&mut self) {
        let cleared = self.len();
        self.index.tombstone_all();
        self.records.clear();
        trace!(
            cleared,
            capacity = self.index.capacity(),
            workload = self.index.workload(),
            "Cleared map."
        );
    }

    /// Handle to the oldest live entry.
    pub fn first(&self) -> Option<Handle> {
        self.records.head().map(Handle::new)
    }

    /// Handle to the newest live entry.
    pub fn last(&self) -> Option<Handle> {
        self.records.tail().map(Handle::new)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.records.iter()
    }

    /// Iterate with mutable values. Keys stay immutable.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.records.iter_mut()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Remove the entry behind `handle`. Returns `None` for a stale handle.
    ///
    /// The slot is found by handle identity, so `K: Eq` is never called.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let record = handle.raw_handle();
        let hash = self.records.get(record)?.hash;
        match self.index.find_position(hash, |r| r == record) {
            Position::Occupied { slot, .. } => self.erase_slot(slot),
            Position::Vacant(_) => None,
        }
    }

    fn erase_slot(&mut self, slot: usize) -> Option<(K, V)> {
        let record = self.index.vacate(slot)?;
        self.records.remove(record)
    }

    /// Rebuild the index at double capacity, dropping all tombstones.
    /// Records stay where they are; only their slots move.
    fn rebuild(&mut self) {
        let old_capacity = self.index.capacity();
        let tombstones_purged = self.index.tombstones();
        let records = &self.records;
        self.index.grow(|record| records.hash_of(record));
        debug!(
            old_capacity,
            new_capacity = self.index.capacity(),
            len = self.index.len(),
            tombstones_purged,
            "Rebuilt slot index."
        );
    }
}

impl<K, V, S> StableHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Hash `q` and walk its probe sequence. The only place user `Hash`/`Eq`
    /// code runs.
    fn locate<Q>(&self, q: &Q) -> (u64, Position)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        let records = &self.records;
        let position = self.index.find_position(hash, |record| {
            records
                .get(record)
                .is_some_and(|r| r.hash == hash && r.key.borrow() == q)
        });
        (hash, position)
    }

    fn find_or_create<F>(&mut self, key: K, default: F) -> (DefaultKey, bool)
    where
        F: FnOnce() -> V,
    {
        let (hash, position) = self.locate(&key);
        match position {
            Position::Occupied { record, .. } => (record, false),
            Position::Vacant(slot) => {
                let record = self.records.push_back(key, default(), hash);
                self.index.occupy(slot, record);
                if self.index.needs_rebuild() {
                    self.rebuild();
                }
                (record, true)
            }
        }
    }

    /// Insert `key -> value` unless `key` is already present.
    ///
    /// Returns `true` if the pair was inserted. An existing value is never
    /// overwritten.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.find_or_create(key, || value).1
    }

    /// Like [`insert`](Self::insert), but only builds the value if the key is
    /// absent.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> bool
    where
        F: FnOnce() -> V,
    {
        self.find_or_create(key, default).1
    }

    /// Value for `key`, inserting `default()` first if the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        // Resolved through the record handle, which a rebuild does not move.
        let (record, _) = self.find_or_create(key, default);
        &mut self
            .records
            .get_mut(record)
            .expect("record was just found or inserted")
            .value
    }

    /// Value for `key`, inserting `V::default()` first if the key is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Handle to the entry for `q`, or `None` if absent.
    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.locate(q).1 {
            Position::Occupied { record, .. } => Some(Handle::new(record)),
            Position::Vacant(_) => None,
        }
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let record = self.find(q)?.raw_handle();
        self.records.get(record).map(|r| (&r.key, &r.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let record = self.find(q)?.raw_handle();
        self.records.get_mut(record).map(|r| &mut r.value)
    }

    /// Value for `q`, or [`LookupError::KeyNotFound`].
    pub fn at<Q>(&self, q: &Q) -> Result<&V, LookupError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).ok_or(LookupError::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, LookupError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).ok_or(LookupError::KeyNotFound)
    }

    /// Remove `q` and return its value; `None` (and no change) if absent.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.locate(q).1 {
            Position::Occupied { slot, .. } => self.erase_slot(slot),
            Position::Vacant(_) => None,
        }
    }

    /// Panics unless the index, the record store and every key's probe
    /// sequence agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.index.assert_consistent();
        assert_eq!(self.index.len(), self.records.len());
        for (slot, record) in self.index.occupied() {
            let r = self
                .records
                .get(record)
                .expect("occupied slot refers to a live record");
            assert_eq!(r.hash, self.make_hash(&r.key), "stored hash is stale");
            match self.locate(&r.key).1 {
                Position::Occupied { slot: found, .. } => assert_eq!(found, slot),
                Position::Vacant(_) => panic!("key unreachable from its probe sequence"),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn workload(&self) -> usize {
        self.index.workload()
    }
}

impl<K, V> Default for StableHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> fmt::Debug for StableHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Equal when both hold the same keys with equal values, in any order.
impl<K, V, S> PartialEq for StableHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for StableHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q, V, S> Index<&Q> for StableHashMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is absent; use [`StableHashMap::at`] to get an error instead.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in StableHashMap")
    }
}

impl<K, V, S> Extend<(K, V)> for StableHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for StableHashMap<K, V, S>
where
    K: Eq + Hash + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

/// Duplicate keys keep their first value.
impl<K, V, S> FromIterator<(K, V)> for StableHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for StableHashMap<K, V, RandomState>
where
    K: Eq + Hash,
{
    fn from(pairs: [(K, V); N]) -> Self {
        let mut map = Self::with_capacity(N);
        map.extend(pairs);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a StableHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut StableHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for StableHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        self.records.into_iter()
    }
}

/// Iterator over keys in insertion order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over values in insertion order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot_index::INITIAL_CAPACITY;
    use std::hash::Hasher;
    use test_log::test;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key starts at slot 0 with the same stride
    }

    /// Invariant: a fresh map has the initial capacity and no workload.
    #[test]
    fn fresh_map_starts_at_initial_capacity() {
        let m: StableHashMap<u32, u32> = StableHashMap::new();
        assert_eq!(m.capacity(), INITIAL_CAPACITY);
        assert_eq!(m.workload(), 0);
        assert!(m.is_empty());
        m.assert_consistent();
    }

    /// Invariant: the rebuild fires on the insert that pushes workload past
    /// half of capacity, and not one insert earlier.
    #[test]
    fn rebuild_triggers_strictly_above_half() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..8 {
            m.insert(i, i);
        }
        assert_eq!(m.capacity(), 16);
        m.insert(8, 8);
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.workload(), 9);
        m.assert_consistent();
    }

    /// Invariant: erase tombstones its slot; len drops, workload does not.
    #[test]
    fn erase_keeps_workload() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..5 {
            m.insert(i, i);
        }
        assert_eq!(m.remove(&2), Some(2));
        assert_eq!(m.len(), 4);
        assert_eq!(m.workload(), 5);
        assert_eq!(m.index.tombstones(), 1);
        // Erasing an absent key is a no-op.
        assert_eq!(m.remove(&2), None);
        assert_eq!(m.workload(), 5);
        m.assert_consistent();
    }

    /// Invariant: tombstones alone can force a rebuild, which doubles the
    /// capacity and purges them.
    #[test]
    fn tombstones_drive_rebuild() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..8 {
            m.insert(i, i);
        }
        for i in 0..8 {
            m.remove(&i);
        }
        assert_eq!(m.len(), 0);
        assert_eq!(m.workload(), 8);
        assert_eq!(m.capacity(), 16);

        m.insert(100, 100);
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.workload(), 1);
        assert_eq!(m.index.tombstones(), 0);
        assert_eq!(m.get(&100), Some(&100));
        m.assert_consistent();
    }

    /// Invariant: clear tombstones every live slot without shrinking.
    #[test]
    fn clear_tombstones_live_slots() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..5 {
            m.insert(i, i);
        }
        m.remove(&0);
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.workload(), 5);
        m.assert_consistent();

        // Four more inserts push workload to 9 of 16.
        for i in 10..14 {
            m.insert(i, i);
        }
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.workload(), 4);
        m.assert_consistent();
    }

    /// Invariant: rebuild re-indexes but keeps records, so handles and
    /// insertion order survive it.
    #[test]
    fn rebuild_preserves_handles_and_order() {
        let mut m: StableHashMap<u32, String> = StableHashMap::new();
        m.insert(7, "seven".to_string());
        let h = m.find(&7).unwrap();
        for i in 100..200 {
            m.insert(i, i.to_string());
        }
        assert!(m.capacity() >= 256);
        assert_eq!(m.find(&7), Some(h));
        assert_eq!(h.value(&m).map(String::as_str), Some("seven"));
        let keys: Vec<u32> = m.keys().copied().collect();
        let expected: Vec<u32> = std::iter::once(7).chain(100..200).collect();
        assert_eq!(keys, expected);
        m.assert_consistent();
    }

    /// Invariant: indexed access that triggers a rebuild still returns the
    /// value of the key it inserted.
    #[test]
    fn indexed_access_across_rebuild() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..8 {
            m.insert(i, i);
        }
        let v = m.get_or_insert_default(42);
        assert_eq!(*v, 0);
        *v = 99;
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.at(&42), Ok(&99));
        m.assert_consistent();
    }

    /// Invariant: with every key colliding, lookups, erasure and growth still
    /// resolve through key equality.
    #[test]
    fn full_collisions_with_const_hasher() {
        let mut m: StableHashMap<String, usize, ConstBuildHasher> =
            StableHashMap::with_hasher(ConstBuildHasher);
        for i in 0..40 {
            assert!(m.insert(format!("k{i}"), i));
        }
        for i in (0..40).step_by(3) {
            assert_eq!(m.remove(&format!("k{i}")), Some(i));
        }
        for i in 0..40 {
            let expected = if i % 3 == 0 { None } else { Some(&i) };
            assert_eq!(m.get(format!("k{i}").as_str()), expected);
        }
        m.assert_consistent();
    }

    /// Invariant: remove by handle finds the slot without comparing keys and
    /// ignores stale handles.
    #[test]
    fn remove_by_handle() {
        let mut m: StableHashMap<String, i32, ConstBuildHasher> =
            StableHashMap::with_hasher(ConstBuildHasher);
        m.insert("a".to_string(), 1);
        let hb = {
            m.insert("b".to_string(), 2);
            m.find("b").unwrap()
        };
        assert_eq!(m.remove_handle(hb), Some(("b".to_string(), 2)));
        assert_eq!(m.remove_handle(hb), None);
        assert_eq!(m.len(), 1);
        assert!(m.contains_key("a"));
        m.assert_consistent();
    }

    /// Invariant: a clone copies tombstones and workload along with entries.
    #[test]
    fn clone_copies_slot_states() {
        let mut m: StableHashMap<u32, u32> = StableHashMap::new();
        for i in 0..6 {
            m.insert(i, i);
        }
        m.remove(&1);
        m.remove(&4);
        let c = m.clone();
        assert_eq!(c.capacity(), m.capacity());
        assert_eq!(c.workload(), m.workload());
        assert_eq!(c.index.tombstones(), 2);
        assert_eq!(c, m);
        c.assert_consistent();
    }

    /// Invariant (debug-only): re-entering the map from `K: Eq` during a probe
    /// panics; release builds skip this test.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        struct ReentryKey {
            id: &'static str,
            map: *const StableHashMap<ReentryKey, i32, ConstBuildHasher>,
            trigger: bool,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if self.id == other.id {
                    return true;
                }
                if other.trigger {
                    unsafe {
                        let m = &*other.map;
                        let _ = m.contains_key(self.id);
                    }
                }
                false
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
        impl Borrow<str> for ReentryKey {
            fn borrow(&self) -> &str {
                self.id
            }
        }

        let mut m: StableHashMap<ReentryKey, i32, ConstBuildHasher> =
            StableHashMap::with_hasher(ConstBuildHasher);
        m.insert(
            ReentryKey {
                id: "a",
                map: core::ptr::null(),
                trigger: false,
            },
            1,
        );

        let query = ReentryKey {
            id: "b",
            map: &m as *const _,
            trigger: true,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}

#![cfg(test)]

// Property tests for StableHashMap kept inside the crate so every step can
// also check slot-index invariants (workload, back-pointers, load bound,
// probe reachability) that the public API does not expose.

use crate::stable_hash_map::{Handle, StableHashMap};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    GetOrDefault(usize),
    Remove(usize),
    RemoveHandle(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            2 => idx.clone().prop_map(OpI::GetOrDefault),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::RemoveHandle),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap plus an
// insertion-order model. Invariants exercised after every op:
// - Insert succeeds iff the key is absent; the stored value is never overwritten.
// - `insert_with` runs its constructor exactly once on success, never on duplicate.
// - `find` returns the same handle for a key for as long as the key is live.
// - Removal by key or by handle returns the model's value and stales the handle.
// - Iteration yields live keys in insertion order with the model's values.
// - Stale handles never resolve; `len`/`is_empty` match the model.
// - The slot index stays consistent with the record store and under the load bound.
fn check_scenario<S: BuildHasher>(
    mut sut: StableHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut order: Vec<Key> = Vec::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let inserted = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already, "insert succeeds iff key is absent");
                if inserted {
                    let h = sut.find(&k).expect("inserted key is findable");
                    model.insert(k.clone(), v);
                    order.push(k.clone());
                    live.insert(k, h);
                }
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let mut calls = 0usize;
                let inserted = sut.insert_with(k.clone(), || {
                    calls += 1;
                    v
                });
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(calls, usize::from(inserted), "constructor runs only on insert");
                if inserted {
                    let h = sut.find(&k).expect("inserted key is findable");
                    model.insert(k.clone(), v);
                    order.push(k.clone());
                    live.insert(k, h);
                }
            }
            OpI::GetOrDefault(i) => {
                let k = key_from(pool, i);
                let got = *sut.get_or_insert_default(k.clone());
                match model.get(&k) {
                    Some(&mv) => prop_assert_eq!(got, mv),
                    None => {
                        prop_assert_eq!(got, 0);
                        let h = sut.find(&k).expect("defaulted key is findable");
                        model.insert(k.clone(), 0);
                        order.push(k.clone());
                        live.insert(k, h);
                    }
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                let removed = sut.remove(&k);
                prop_assert_eq!(removed, model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    order.retain(|o| o != &k);
                    stale.push(h);
                }
                prop_assert!(sut.find(&k).is_none());
                prop_assert!(sut.at(&k).is_err());
            }
            OpI::RemoveHandle(i) => {
                let k = key_from(pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove_handle(h).expect("live handle removes");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&k));
                    order.retain(|o| o != &k);
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.find(&k), live.get(&k).copied());
                prop_assert_eq!(sut.at(&k).ok(), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(&h) = live.get(&k) {
                    match h.value_mut(&mut sut) {
                        Some(vr) => {
                            *vr = vr.saturating_add(d);
                            let mv = model.get_mut(&k).expect("live key in model");
                            *mv = mv.saturating_add(d);
                        }
                        None => prop_assert!(false, "live handle should resolve"),
                    }
                }
            }
            OpI::Iterate => {
                let s_keys: Vec<Key> = sut.keys().cloned().collect();
                prop_assert_eq!(&s_keys, &order);
                for (k, v) in sut.iter() {
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
            OpI::Clear => {
                sut.clear();
                stale.extend(live.drain().map(|(_, h)| h));
                model.clear();
                order.clear();
            }
        }

        sut.assert_consistent();
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        for (k, &h) in &live {
            prop_assert_eq!(h.key(&sut), Some(k));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        check_scenario(StableHashMap::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one probe
// sequence, so correctness rests on equality checks and tombstone skipping.
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
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        check_scenario(StableHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Capacity hints only change when the first rebuild happens, never the contents.
proptest! {
    #[test]
    fn prop_capacity_hint_is_transparent(
        hint in 0usize..300,
        keys in proptest::collection::vec(0u16..500, 0..300),
    ) {
        let mut hinted: StableHashMap<u16, usize> = StableHashMap::with_capacity(hint);
        let mut plain: StableHashMap<u16, usize> = StableHashMap::new();
        prop_assert!(hinted.capacity() >= 2 * hint);
        for (i, k) in keys.iter().enumerate() {
            hinted.insert(*k, i);
            plain.insert(*k, i);
        }
        hinted.assert_consistent();
        prop_assert_eq!(&hinted, &plain);
        let a: Vec<_> = hinted.iter().collect();
        let b: Vec<_> = plain.iter().collect();
        prop_assert_eq!(a, b);
    }
}

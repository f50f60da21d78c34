//! stable-hashmap: a single-threaded, open-addressing hash map whose entry
//! handles stay valid across inserts and removals of other entries.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: amortized O(1) insert/lookup/remove with iteration in insertion
//!   order, trading memory for handle stability and an iteration order that
//!   does not depend on deletion history.
//! - Layers:
//!   - RecordStore<K, V>: owns the key/value pairs in a generational arena
//!     threaded by an intrusive doubly-linked list (insertion order).
//!   - SlotIndex: fixed-size array of `Empty | Occupied(record) |
//!     Tombstoned` slots, probed with a key-dependent stride, plus a dense
//!     position list of occupied slots with per-slot back-pointers.
//!   - StableHashMap<K, V, S>: public API tying the two together; the only
//!     layer that hashes or compares keys.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design.
//! - Unique keys; inserting a present key is a no-op and keeps the old value.
//! - Stable, generational record keys behind small `Handle` wrappers; a
//!   handle to a removed entry never resolves again.
//! - After every insert, `occupied + tombstoned <= capacity / 2`.
//!
//! Probing
//! - The walk starts at `hash % capacity` and steps by a stride mixed from
//!   the hash with three fixed factors. The stride is forced odd; capacity is
//!   a power of two, so every walk covers the whole table.
//! - Tombstones never stop a walk. They are reclaimed only by a rebuild.
//!
//! Growth
//! - Checked once per insert, after the insert: if
//!   `100 * workload > 50 * capacity`, the index is rebuilt at double
//!   capacity. Records are not moved; each live record handle is placed
//!   again using its stored hash, so rebuilding never calls `K: Hash` or
//!   `K: Eq` and never changes iteration order.
//! - Removal and `clear` leave tombstones and never shrink the table.
//!
//! Reentrancy policy
//! - User code runs only inside probing (`K: Hash`, `K: Eq`). A debug-only
//!   guard panics if that code re-enters the same map. After a removal
//!   returns `(K, V)` the structure is consistent again and `Drop` for `K`/`V`
//!   may do anything.
//!
//! Errors and logging
//! - [`StableHashMap::at`] is the only fallible lookup, returning
//!   [`LookupError::KeyNotFound`]. Everything else is total.
//! - Rebuilds emit a `tracing` debug event and `clear` a trace event; the
//!   crate installs no subscriber.
//!
//! Notes and non-goals
//! - No concurrent access, no incremental rebuild, no shrinking.
//! - Keys are immutable post-insert; iteration hands out `&K` only.
//! - `Clone` deep-copies records and slot states, tombstones included.

mod error;
mod probe;
mod record_store;
mod reentrancy;
mod slot_index;
pub mod stable_hash_map;
mod stable_hash_map_proptest;

// Public surface
pub use error::LookupError;
pub use stable_hash_map::{Handle, StableHashMap};

//! Open-addressing slot index.
//!
//! Maps a primary hash to the record handle stored for it. The index never
//! touches keys itself; callers pass a matcher that decides whether an
//! occupied slot holds the key they are after.
//!
//! Alongside the slots sits the position index: a dense list of occupied
//! slot numbers. Each occupied slot carries its own position in that list,
//! so a slot can leave the list in O(1) and `clear`/rebuild only touch live
//! slots.

use crate::probe::ProbeSeq;
use slotmap::DefaultKey;

/// Slot count of a fresh index.
pub(crate) const INITIAL_CAPACITY: usize = 16;

/// Workload may not exceed this share of capacity (in percent) after an insert.
pub(crate) const MAX_LOAD_PERCENT: usize = 50;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Slot {
    #[default]
    Empty,
    Occupied {
        record: DefaultKey,
        /// Back-pointer into `SlotIndex::positions`.
        position: usize,
    },
    /// Vacated. Still part of every probe walk and still counted as workload.
    Tombstoned,
}

/// Outcome of `SlotIndex::find_position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Position {
    Occupied { slot: usize, record: DefaultKey },
    Vacant(usize),
}

#[derive(Clone, Debug)]
pub(crate) struct SlotIndex {
    slots: Box<[Slot]>,
    positions: Vec<usize>,
    workload: usize,
}

impl SlotIndex {
    pub(crate) fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// `capacity` must be a power of two no smaller than `INITIAL_CAPACITY`.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two() && capacity >= INITIAL_CAPACITY);
        Self {
            slots: vec![Slot::Empty; capacity].into_boxed_slice(),
            positions: Vec::new(),
            workload: 0,
        }
    }

    /// Smallest valid capacity that takes `entries` inserts without a rebuild.
    pub(crate) fn capacity_for(entries: usize) -> usize {
        entries
            .checked_mul(100 / MAX_LOAD_PERCENT)
            .and_then(usize::checked_next_power_of_two)
            .expect("capacity overflow")
            .max(INITIAL_CAPACITY)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slot count.
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    /// Occupied plus tombstoned slots.
    pub(crate) fn workload(&self) -> usize {
        self.workload
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.workload - self.len()
    }

    /// Walk the probe sequence for `hash` until an empty slot or an occupied
    /// slot accepted by `is_match`.
    ///
    /// Tombstones and rejected occupied slots are stepped over. Termination
    /// relies on `workload < capacity`, which the rebuild threshold keeps.
    pub(crate) fn find_position<F>(&self, hash: u64, mut is_match: F) -> Position
    where
        F: FnMut(DefaultKey) -> bool,
    {
        for slot in ProbeSeq::start(hash, self.capacity()) {
            match self.slots[slot] {
                Slot::Empty => return Position::Vacant(slot),
                Slot::Occupied { record, .. } if is_match(record) => {
                    return Position::Occupied { slot, record };
                }
                Slot::Occupied { .. } | Slot::Tombstoned => {}
            }
        }
        unreachable!("probe cycle found no empty slot; workload must stay below capacity")
    }

    /// Put `record` into the empty `slot` returned by `find_position`.
    pub(crate) fn occupy(&mut self, slot: usize, record: DefaultKey) {
        debug_assert_eq!(self.slots[slot], Slot::Empty, "slot {slot} is not empty");
        let position = self.positions.len();
        self.positions.push(slot);
        self.slots[slot] = Slot::Occupied { record, position };
        self.workload += 1;
    }

    /// Place a record known to be absent from the index.
    ///
    /// No key comparison is needed, so this never calls back into user code.
    pub(crate) fn insert_unique(&mut self, hash: u64, record: DefaultKey) {
        match self.find_position(hash, |_| false) {
            Position::Vacant(slot) => self.occupy(slot, record),
            Position::Occupied { .. } => unreachable!("matcher rejects every slot"),
        }
    }

    /// Tombstone an occupied slot and return the record it held.
    ///
    /// Workload is unchanged; the tombstone keeps counting until a rebuild.
    pub(crate) fn vacate(&mut self, slot: usize) -> Option<DefaultKey> {
        let Slot::Occupied { record, position } = self.slots[slot] else {
            return None;
        };
        self.slots[slot] = Slot::Tombstoned;

        let removed = self.positions.swap_remove(position);
        debug_assert_eq!(removed, slot);
        // The former last entry now lives at `position`; repoint its slot.
        if let Some(&moved) = self.positions.get(position) {
            if let Slot::Occupied { position: p, .. } = &mut self.slots[moved] {
                *p = position;
            }
        }
        Some(record)
    }

    /// Tombstone every occupied slot in O(len). Capacity and workload stay.
    pub(crate) fn tombstone_all(&mut self) {
        for slot in self.positions.drain(..) {
            self.slots[slot] = Slot::Tombstoned;
        }
    }

    pub(crate) fn needs_rebuild(&self) -> bool {
        100 * self.workload > MAX_LOAD_PERCENT * self.capacity()
    }

    /// Live `(slot, record)` pairs in position-index order.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = (usize, DefaultKey)> + '_ {
        self.positions.iter().map(|&slot| match self.slots[slot] {
            Slot::Occupied { record, .. } => (slot, record),
            _ => unreachable!("position index points at a non-occupied slot"),
        })
    }

    /// Replace this index with one of at least double the capacity that
    /// holds the same records and no tombstones.
    ///
    /// `hash_of` returns the stored primary hash for a live record.
    pub(crate) fn grow<F>(&mut self, hash_of: F)
    where
        F: Fn(DefaultKey) -> u64,
    {
        let mut capacity = self.capacity() * 2;
        while 100 * self.len() > MAX_LOAD_PERCENT * capacity {
            capacity *= 2;
        }
        let old = std::mem::replace(self, Self::with_capacity(capacity));
        for (_, record) in old.occupied() {
            self.insert_unique(hash_of(record), record);
        }
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, slot: usize) -> Slot {
        self.slots[slot]
    }

    /// Panics unless counters, back-pointers and the load bound agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut occupied = 0;
        let mut tombstoned = 0;
        for (slot, state) in self.slots.iter().enumerate() {
            match *state {
                Slot::Empty => {}
                Slot::Tombstoned => tombstoned += 1,
                Slot::Occupied { position, .. } => {
                    occupied += 1;
                    assert_eq!(
                        self.positions[position], slot,
                        "back-pointer of slot {slot} is stale"
                    );
                }
            }
        }
        assert_eq!(occupied, self.positions.len());
        assert_eq!(occupied + tombstoned, self.workload);
        assert!(!self.needs_rebuild(), "load bound exceeded");
        assert!(self.capacity().is_power_of_two());
    }
}

//! Probe sequences over the slot index.
//!
//! A key's walk starts at `hash % capacity` and advances by a key-dependent
//! stride. The stride is folded out of the primary hash with a short
//! multiply-accumulate, so keys whose low bits collide still spread apart.

/// Mixing factors folded into the stride, applied in order.
const STRIDE_FACTORS: [u64; 3] = [239, 179, 191];

/// Stride for `hash` in a table of `capacity` slots.
///
/// The mixed value is forced odd. `capacity` is always a power of two, so an
/// odd stride is coprime to it and the walk touches every slot exactly once
/// per cycle. The raw mix can be zero or even for some hashes, which would
/// trap a probe inside a short cycle.
pub(crate) fn stride(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two() && capacity > 1);
    let cap = capacity as u64;
    let mut acc = 0u64;
    for factor in STRIDE_FACTORS {
        acc = acc.wrapping_mul(hash).wrapping_add(factor) % cap;
    }
    (acc as usize) | 1
}

/// The slots visited for one key, in probe order.
///
/// Yields exactly `capacity` slots (one full cycle) and then stops.
#[derive(Clone, Debug)]
pub(crate) struct ProbeSeq {
    pos: usize,
    stride: usize,
    mask: usize,
    remaining: usize,
}

impl ProbeSeq {
    pub(crate) fn start(hash: u64, capacity: usize) -> Self {
        Self {
            pos: (hash % capacity as u64) as usize,
            stride: stride(hash, capacity),
            mask: capacity - 1,
            remaining: capacity,
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let slot = self.pos;
        self.pos = (self.pos + self.stride) & self.mask;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ProbeSeq {}

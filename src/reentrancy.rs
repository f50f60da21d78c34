//! Debug-only guard against reentrant probing.
//!
//! While a probe walk is in progress the map hands control to user code
//! (`K: Hash` and `K: Eq`). A key type that reaches back into the same map
//! from there would observe it mid-lookup. Debug builds panic on that; in
//! release builds the guard is an empty struct and `enter` does nothing.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map probe tracker. Probing code holds `let _g = self.reentrancy.enter();`
/// for as long as it may call into user code.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Single-threaded: keeps the owning map !Send + !Sync.
    _single_thread: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _single_thread: PhantomData,
        }
    }

    /// Mark a probe as in progress until the returned guard drops.
    ///
    /// Panics in debug builds if a probe is already in progress.
    #[inline]
    pub(crate) fn enter(&self) -> ProbeGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "reentrancy detected: map accessed from key Hash/Eq during a probe"
            );
        }
        ProbeGuard { owner: self }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone starts idle regardless of the source's state.
impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub(crate) struct ProbeGuard<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    owner: &'a DebugReentrancy,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_probes_are_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[test]
    fn clone_is_idle() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        let c = r.clone();
        let _g2 = c.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_probe_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter();
            let _g2 = r.enter();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_probe_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter();
        let _g2 = r.enter();
    }
}

/// Failure of a checked lookup such as [`StableHashMap::at`].
///
/// [`StableHashMap::at`]: crate::StableHashMap::at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LookupError {
    #[error("key not found")]
    KeyNotFound,
}

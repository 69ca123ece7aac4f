use thiserror::Error;

/// Errors reported by the reactive store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Subscribers kept writing to the store and the flush was aborted.
    #[error("reactions did not settle after {rounds} rounds")]
    ReactionLoop { rounds: usize },
}

use crate::scene::NodeId;
use thiserror::Error;

/// Errors raised by [`ViewPool`](crate::pool::ViewPool).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("node {node:?} was not borrowed from this pool")]
    NotBorrowed { node: NodeId },
}

/// Errors raised while configuring the view layer.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("the entity view pool can only be set once")]
    PoolAlreadySet,

    #[error("view context type {type_name} is already registered")]
    DuplicateContext { type_name: &'static str },

    #[error("invalid view settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("failed to read view settings: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types

use std::path::PathBuf;

use crate::node::NodeId;

/// Failures reported by a namespace provider.
#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    /// The entry does not exist (or no longer exists)
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The entry exists but cannot be enumerated
    #[error("cannot enumerate {url}: {reason}")]
    NotReadable { url: String, reason: String },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the tree to its callers.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// An activation or selection target could not be resolved
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The node was removed, or never existed
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node has nothing to read yet (unresolved volume root)
    #[error("node {0} has no readable entry")]
    Unavailable(NodeId),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

/// Persistence failures for settings and shortcuts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not determine data directory")]
    NoDataDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Watcher setup failures.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to init watcher: {0}")]
    Notify(#[from] notify::Error),

    #[error("watcher requires a running tokio runtime")]
    NoRuntime,
}

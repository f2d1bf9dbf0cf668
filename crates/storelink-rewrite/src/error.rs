//! Error types for value conversion.
//!
//! Rewriting itself never fails; these cover moving payloads in and out of
//! the [`Value`](crate::value::Value) graph.

/// Errors converting between [`Value`](crate::value::Value) and JSON.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The payload could not be serialized into plain data.
    #[error("failed to project value: {0}")]
    Projection(#[from] serde_json::Error),

    /// The graph contains a cycle, which JSON cannot express.
    #[error("value graph contains a cycle")]
    Cycle,

    /// The graph contains an opaque handle, which JSON cannot express.
    #[error("foreign value {label} has no JSON form")]
    Foreign {
        /// Label of the handle.
        label: String,
    },
}

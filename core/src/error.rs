//! Error types for wavegraph-core.
//!
//! Store queries never fail: a missing node or edge is an empty result.
//! These errors are raised only by algorithms whose contract cannot be
//! honored (no path, no valid order, a negative cycle).

use thiserror::Error;

/// Result type alias for wavegraph-core operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by the algorithm suite.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An algorithm endpoint does not resolve to a node in the graph.
    #[error("node '{key}' not found")]
    NodeNotFound {
        /// The id or name the caller supplied.
        key: String,
    },

    /// A* exhausted its frontier without reaching the target.
    #[error("node {to} not reachable from {from}")]
    Unreachable {
        /// Name of the source node.
        from: String,
        /// Name of the target node.
        to: String,
    },

    /// Topological traversal finished with nodes whose in-degree never reached zero.
    #[error("cycle detected: {unresolved} node(s) have unresolved in-degree")]
    CycleDetected {
        /// Number of nodes left unvisited.
        unresolved: usize,
    },

    /// A node scheduled for visitation vanished from the graph mid-traversal.
    #[error("graph modified during traversal: node {node} disappeared")]
    ConcurrentModification {
        /// Id of the vanished node.
        node: u64,
    },

    /// Bellman-Ford still relaxed an edge after |V| passes.
    #[error("negative-weight cycle reachable from source")]
    NegativeCycle,

    /// The requested shortest-path method cannot run on this graph.
    #[error("method {method} unsupported: {reason}")]
    UnsupportedMethod {
        /// Method name.
        method: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl GraphError {
    pub(crate) fn not_found(key: impl ToString) -> Self {
        GraphError::NodeNotFound {
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::Unreachable {
            from: "(0, 0)".into(),
            to: "(2, 2)".into(),
        };
        assert_eq!(err.to_string(), "node (2, 2) not reachable from (0, 0)");

        let err = GraphError::CycleDetected { unresolved: 3 };
        assert!(err.to_string().contains('3'));

        let err = GraphError::not_found("missing");
        assert!(err.to_string().contains("missing"));
    }
}

//! Error types for the superstep engine
//!
//! Every fallible operation at the public surface returns `EngineError`.
//! Delivery problems (messages addressed to a vertex that no longer exists,
//! edge conditions that fail to evaluate) are warnings, not errors; they are
//! logged and never abort a round.

use thiserror::Error;

use crate::graph::GraphId;
use crate::program::ProgramError;
use crate::vertex::VertexId;

/// Errors surfaced by the engine API
#[derive(Debug, Error)]
pub enum EngineError {
    /// No live graph with this identifier
    #[error("graph not found: {0}")]
    GraphNotFound(GraphId),

    /// No vertex with this identifier in the addressed graph
    #[error("vertex not found: {0}")]
    VertexNotFound(VertexId),

    /// No outgoing edge between the two vertices
    #[error("edge not found: {from} -> {to}")]
    EdgeNotFound { from: VertexId, to: VertexId },

    /// The graph has no vertex designated as final
    #[error("no final vertex in graph {0}")]
    FinalVertexNotFound(GraphId),

    /// Operation not permitted in the graph's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The bounded run reached its round limit before halting
    #[error("max supersteps exceeded at round {round}")]
    MaxSuperstepsExceeded { round: u64 },

    /// The bounded run reached its wall-clock limit before halting
    #[error("timeout exceeded at round {round}")]
    TimeoutExceeded { round: u64 },

    /// A user-supplied compute function failed; fatal to the round
    #[error("vertex program failed in {vertex_id} at round {round}")]
    ProgramFailed {
        vertex_id: VertexId,
        round: u64,
        #[source]
        source: ProgramError,
    },
}

impl EngineError {
    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create an edge-not-found error
    pub fn edge_not_found(from: impl Into<VertexId>, to: impl Into<VertexId>) -> Self {
        Self::EdgeNotFound {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a program-failure error
    pub fn program_failed(
        vertex_id: impl Into<VertexId>,
        round: u64,
        source: ProgramError,
    ) -> Self {
        Self::ProgramFailed {
            vertex_id: vertex_id.into(),
            round,
            source,
        }
    }

    /// Check whether this is one of the not-found variants
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::GraphNotFound(_)
                | EngineError::VertexNotFound(_)
                | EngineError::EdgeNotFound { .. }
                | EngineError::FinalVertexNotFound(_)
        )
    }

    /// Check whether this is a bounded-run failure (limit tripped)
    pub fn is_bounded(&self) -> bool {
        matches!(
            self,
            EngineError::MaxSuperstepsExceeded { .. } | EngineError::TimeoutExceeded { .. }
        )
    }

    /// The round number attached to bounded-run and program failures
    pub fn round(&self) -> Option<u64> {
        match self {
            EngineError::MaxSuperstepsExceeded { round }
            | EngineError::TimeoutExceeded { round }
            | EngineError::ProgramFailed { round, .. } => Some(*round),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    // Errors cross task boundaries; keep them Send + Sync (compile-time check)
    static_assertions::assert_impl_all!(super::EngineError: Send, Sync);
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::MaxSuperstepsExceeded { round: 5 };
        assert_eq!(format!("{}", err), "max supersteps exceeded at round 5");

        let err = EngineError::GraphNotFound(GraphId::from("orders"));
        assert_eq!(format!("{}", err), "graph not found: orders");
    }

    #[test]
    fn test_edge_not_found() {
        let err = EngineError::edge_not_found("vtx.a", "vtx.b");
        match err {
            EngineError::EdgeNotFound { from, to } => {
                assert_eq!(from.as_str(), "vtx.a");
                assert_eq!(to.as_str(), "vtx.b");
            }
            _ => panic!("wrong error variant"),
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(EngineError::VertexNotFound(VertexId::from("vtx.x")).is_not_found());
        assert!(EngineError::FinalVertexNotFound(GraphId::from("g")).is_not_found());
        assert!(!EngineError::invalid_state("running").is_not_found());
    }

    #[test]
    fn test_is_bounded_and_round() {
        let err = EngineError::TimeoutExceeded { round: 3 };
        assert!(err.is_bounded());
        assert_eq!(err.round(), Some(3));

        let err = EngineError::invalid_state("busy");
        assert!(!err.is_bounded());
        assert_eq!(err.round(), None);
    }

    #[test]
    fn test_program_failed_carries_source() {
        let source: crate::program::ProgramError = "division by zero".into();
        let err = EngineError::program_failed("vtx.a", 2, source);
        assert_eq!(err.round(), Some(2));
        assert!(std::error::Error::source(&err).is_some());
    }
}

//! Compute programs and their execution context
//!
//! Every vertex carries a program: a callable executed once per superstep
//! while the vertex is active. The program sees an aggregated view of the
//! previous round's messages and decides whether to halt, keep its value, or
//! produce a new partial value for the auto-merge pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use crate::edge::Edge;
use crate::message::Message;
use crate::value::Value;
use crate::vertex::VertexId;

/// Error type produced by user programs and edge predicates
pub type ProgramError = Box<dyn std::error::Error + Send + Sync>;

/// Read-only view handed to a program for one compute step
#[derive(Debug, Clone)]
pub struct ComputeContext {
    /// Id of the vertex being computed
    pub vertex_id: VertexId,
    /// The vertex's current superstep
    pub superstep: u64,
    /// The vertex's current value
    pub value: Option<Value>,
    /// This round's incoming messages, as received
    pub raw_messages: Vec<Message>,
    /// Aggregated payload derived from the incoming messages
    pub aggregated: Option<Value>,
    /// The vertex's outgoing edges, in insertion order
    pub outgoing_edges: Vec<Edge>,
}

impl ComputeContext {
    /// Check if this is the vertex's first superstep
    pub fn is_first_superstep(&self) -> bool {
        self.superstep == 0
    }

    /// Check if any messages were received this round
    pub fn has_messages(&self) -> bool {
        !self.raw_messages.is_empty()
    }

    /// Number of messages received this round
    pub fn message_count(&self) -> usize {
        self.raw_messages.len()
    }
}

/// What a program decided for this compute step
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeOutcome {
    /// Deactivate; value unchanged; nothing emitted
    Halt,
    /// Keep the current value, broadcast it along passing edges, deactivate
    Unchanged,
    /// Merge this partial value with the aggregated incoming payload,
    /// store the result, broadcast it, and stay active
    NewValue(Value),
}

/// A vertex compute program.
///
/// Programs must be finite and must not call back into the engine. A program
/// error aborts the current round and is never retried.
#[async_trait]
pub trait VertexProgram: Send + Sync {
    async fn compute(&self, ctx: &ComputeContext) -> Result<ComputeOutcome, ProgramError>;
}

/// Shared, dynamically dispatched program
pub type BoxedProgram = Arc<dyn VertexProgram>;

/// Adapter turning a plain closure into a [`VertexProgram`]
pub struct FnProgram<F>(F);

#[async_trait]
impl<F> VertexProgram for FnProgram<F>
where
    F: Fn(&ComputeContext) -> Result<ComputeOutcome, ProgramError> + Send + Sync,
{
    async fn compute(&self, ctx: &ComputeContext) -> Result<ComputeOutcome, ProgramError> {
        (self.0)(ctx)
    }
}

/// Wrap a closure as a shareable program
pub fn program<F>(f: F) -> BoxedProgram
where
    F: Fn(&ComputeContext) -> Result<ComputeOutcome, ProgramError> + Send + Sync + 'static,
{
    Arc::new(FnProgram(f))
}

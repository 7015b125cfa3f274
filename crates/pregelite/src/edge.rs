//! Weighted, optionally conditional edges between vertices
//!
//! An edge is an immutable record owned by its source vertex. The optional
//! `condition` predicate is evaluated at emission time against the sender's
//! compute context; a predicate that fails to evaluate disables the send and
//! is reported as a delivery warning, never an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::program::{ComputeContext, ProgramError};
use crate::value::Value;
use crate::vertex::VertexId;

/// Send predicate evaluated against the sender's compute context
pub type EdgeCondition = Arc<dyn Fn(&ComputeContext) -> Result<bool, ProgramError> + Send + Sync>;

/// A directed edge from one vertex to another
#[derive(Clone)]
pub struct Edge {
    /// Source vertex id
    pub source: VertexId,
    /// Target vertex id
    pub target: VertexId,
    /// Edge weight
    pub weight: f64,
    /// Arbitrary edge properties
    pub properties: BTreeMap<String, Value>,
    /// Optional send predicate; absent means always send
    pub condition: Option<EdgeCondition>,
}

impl Edge {
    /// Create an edge with weight 1 and no properties or condition
    pub fn new(source: impl Into<VertexId>, target: impl Into<VertexId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1.0,
            properties: BTreeMap::new(),
            condition: None,
        }
    }

    /// Set the edge weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the edge properties
    pub fn with_properties<K, I>(mut self, properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.properties = properties.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Attach a send predicate
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ComputeContext) -> Result<bool, ProgramError> + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Evaluate the send predicate against the given context.
    ///
    /// Absent condition always permits. A predicate error suppresses the
    /// send and surfaces as a warning so misbehaving predicates are visible
    /// without aborting the round.
    pub fn permits(&self, ctx: &ComputeContext) -> bool {
        match &self.condition {
            None => true,
            Some(condition) => match condition(ctx) {
                Ok(send) => send,
                Err(error) => {
                    tracing::warn!(
                        source = %self.source,
                        target = %self.target,
                        %error,
                        "edge condition failed to evaluate; suppressing send"
                    );
                    false
                }
            },
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("weight", &self.weight)
            .field("properties", &self.properties)
            .field("condition", &self.condition.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

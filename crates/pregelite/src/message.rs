//! Messages exchanged between vertices
//!
//! A message is an immutable record created when a vertex emits into its
//! outbox. The `superstep` field is the sender's superstep at send time and
//! is the only ordering-relevant field; the timestamp exists for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::vertex::VertexId;

/// A single inter-vertex message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Vertex that emitted the message
    pub sender: VertexId,
    /// Vertex the message is addressed to
    pub recipient: VertexId,
    /// Payload
    pub content: Value,
    /// Sender's superstep at send time
    pub superstep: u64,
    /// Creation time, for diagnostics only
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message, capturing the current wall-clock time
    pub fn new(
        sender: impl Into<VertexId>,
        recipient: impl Into<VertexId>,
        content: Value,
        superstep: u64,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content,
            superstep,
            timestamp: Utc::now(),
        }
    }
}

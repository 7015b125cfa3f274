//! Vertices and their actor tasks
//!
//! Each vertex owns its state exclusively: a tokio task drains a FIFO
//! request channel, so concurrent operations against the same vertex are
//! applied in some total order. The engine and the graph layer only ever
//! talk to a vertex through its [`VertexHandle`].
//!
//! The compute step implements the activation state machine:
//!
//! - dormant vertices are skipped;
//! - an active vertex with an empty inbox past superstep 0 auto-halts;
//! - otherwise the user program runs and its outcome drives the
//!   merge-then-broadcast pipeline.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::edge::Edge;
use crate::error::EngineError;
use crate::graph::GraphId;
use crate::message::Message;
use crate::program::{BoxedProgram, ComputeContext, ComputeOutcome};
use crate::value::Value;

/// Depth of a vertex's request queue
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Unique identifier for a vertex within a graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub String);

impl VertexId {
    /// Mint a fresh identifier: `vtx.` followed by 32 lowercase hex digits
    /// of cryptographically random bytes. Never reused within a graph.
    pub fn mint() -> Self {
        Self(format!("vtx.{}", Uuid::new_v4().simple()))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a vertex in the computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexType {
    /// Initially active; seeds the computation without incoming messages
    Source,
    /// Initially dormant; woken by message delivery
    #[default]
    Normal,
    /// Sink whose last value is the graph's reported result
    Final,
}

impl VertexType {
    pub fn is_source(&self) -> bool {
        matches!(self, VertexType::Source)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, VertexType::Final)
    }
}

/// Creation options for a vertex
#[derive(Debug, Clone, Default)]
pub struct VertexOptions {
    /// Initial value; nil when absent
    pub value: Option<Value>,
    /// Vertex role
    pub vertex_type: VertexType,
}

impl VertexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_type(mut self, vertex_type: VertexType) -> Self {
        self.vertex_type = vertex_type;
        self
    }
}

/// Result of one compute step
#[derive(Debug, Clone)]
pub struct ComputeReport {
    /// Vertex that computed
    pub vertex_id: VertexId,
    /// False when the vertex was dormant and skipped
    pub ran: bool,
    /// Activation flag after the step
    pub active: bool,
    /// Value after the step
    pub value: Option<Value>,
    /// Messages emitted by this step, also buffered into the outbox
    pub emitted: Vec<Message>,
}

/// Full observable state of a vertex
#[derive(Debug, Clone)]
pub struct VertexSnapshot {
    pub graph_id: GraphId,
    pub id: VertexId,
    pub name: String,
    pub vertex_type: VertexType,
    pub value: Option<Value>,
    pub superstep: u64,
    pub active: bool,
    pub incoming_messages: Vec<Message>,
    pub pending_messages: Vec<Message>,
    pub outgoing_messages: Vec<Message>,
    pub outgoing_edges: Vec<Edge>,
}

/// Requests a vertex actor processes one at a time
pub(crate) enum VertexRequest {
    Compute {
        reply: oneshot::Sender<Result<ComputeReport, EngineError>>,
    },
    AddEdge {
        edge: Edge,
        reply: oneshot::Sender<()>,
    },
    RemoveEdge {
        target: VertexId,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Edges {
        reply: oneshot::Sender<Vec<Edge>>,
    },
    EnqueueOutbox {
        target: VertexId,
        content: Value,
        reply: oneshot::Sender<()>,
    },
    DrainOutbox {
        reply: oneshot::Sender<Vec<Message>>,
    },
    ClearOutbox {
        reply: oneshot::Sender<()>,
    },
    Receive {
        messages: Vec<Message>,
        reply: oneshot::Sender<()>,
    },
    Advance {
        reply: oneshot::Sender<()>,
    },
    IsActive {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<VertexSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a live vertex actor.
///
/// Cheap to clone; all methods serialize through the actor's request queue.
#[derive(Clone)]
pub struct VertexHandle {
    graph_id: GraphId,
    id: VertexId,
    name: String,
    vertex_type: VertexType,
    tx: mpsc::Sender<VertexRequest>,
}

impl VertexHandle {
    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    pub fn id(&self) -> &VertexId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_type(&self) -> VertexType {
        self.vertex_type
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> VertexRequest,
    ) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EngineError::VertexNotFound(self.id.clone()))?;
        rx.await
            .map_err(|_| EngineError::VertexNotFound(self.id.clone()))
    }

    /// Run one compute step
    pub async fn compute(&self) -> Result<ComputeReport, EngineError> {
        self.request(|reply| VertexRequest::Compute { reply }).await?
    }

    /// Install or replace the outgoing edge for the edge's target
    pub async fn add_outgoing_edge(&self, edge: Edge) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::AddEdge { edge, reply })
            .await
    }

    /// Remove the outgoing edge to `target`
    pub async fn remove_outgoing_edge(&self, target: VertexId) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::RemoveEdge { target, reply })
            .await?
    }

    /// Outgoing edges in insertion order
    pub async fn outgoing_edges(&self) -> Result<Vec<Edge>, EngineError> {
        self.request(|reply| VertexRequest::Edges { reply }).await
    }

    /// Targets of the outgoing edges, in insertion order
    pub async fn neighbors(&self) -> Result<Vec<VertexId>, EngineError> {
        Ok(self
            .outgoing_edges()
            .await?
            .into_iter()
            .map(|edge| edge.target)
            .collect())
    }

    /// Explicitly enqueue a message into the outbox
    pub async fn enqueue_outbox(
        &self,
        target: VertexId,
        content: Value,
    ) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::EnqueueOutbox {
            target,
            content,
            reply,
        })
        .await
    }

    /// Take the outbox, leaving it empty
    pub async fn drain_outbox(&self) -> Result<Vec<Message>, EngineError> {
        self.request(|reply| VertexRequest::DrainOutbox { reply })
            .await
    }

    /// Reset the outbox
    pub async fn clear_outbox(&self) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::ClearOutbox { reply })
            .await
    }

    /// Append messages to the pending buffer
    pub async fn receive(&self, messages: Vec<Message>) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::Receive { messages, reply })
            .await
    }

    /// Cross the round barrier: pending becomes incoming, superstep advances
    pub async fn advance(&self) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::Advance { reply }).await
    }

    pub async fn is_active(&self) -> Result<bool, EngineError> {
        self.request(|reply| VertexRequest::IsActive { reply }).await
    }

    /// Full observable state
    pub async fn snapshot(&self) -> Result<VertexSnapshot, EngineError> {
        self.request(|reply| VertexRequest::Snapshot { reply }).await
    }

    /// Stop the actor; subsequent requests fail with `VertexNotFound`
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.request(|reply| VertexRequest::Stop { reply }).await
    }
}

impl fmt::Debug for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexHandle")
            .field("graph_id", &self.graph_id)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vertex_type", &self.vertex_type)
            .finish()
    }
}

/// Spawn a vertex actor and return its handle
pub(crate) fn spawn(
    graph_id: GraphId,
    id: VertexId,
    name: String,
    vertex_type: VertexType,
    program: BoxedProgram,
    value: Option<Value>,
) -> VertexHandle {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let actor = VertexActor {
        graph_id: graph_id.clone(),
        id: id.clone(),
        name: name.clone(),
        vertex_type,
        program,
        value,
        outgoing_edges: Vec::new(),
        pending_messages: Vec::new(),
        incoming_messages: Vec::new(),
        outgoing_messages: Vec::new(),
        superstep: 0,
        active: vertex_type.is_source(),
        rx,
    };
    tokio::spawn(actor.run());
    VertexHandle {
        graph_id,
        id,
        name,
        vertex_type,
        tx,
    }
}

struct VertexActor {
    graph_id: GraphId,
    id: VertexId,
    name: String,
    vertex_type: VertexType,
    program: BoxedProgram,
    value: Option<Value>,
    outgoing_edges: Vec<Edge>,
    pending_messages: Vec<Message>,
    incoming_messages: Vec<Message>,
    outgoing_messages: Vec<Message>,
    superstep: u64,
    active: bool,
    rx: mpsc::Receiver<VertexRequest>,
}

impl VertexActor {
    async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match request {
                VertexRequest::Compute { reply } => {
                    let report = self.compute().await;
                    let _ = reply.send(report);
                }
                VertexRequest::AddEdge { edge, reply } => {
                    self.add_edge(edge);
                    let _ = reply.send(());
                }
                VertexRequest::RemoveEdge { target, reply } => {
                    let _ = reply.send(self.remove_edge(target));
                }
                VertexRequest::Edges { reply } => {
                    let _ = reply.send(self.outgoing_edges.clone());
                }
                VertexRequest::EnqueueOutbox {
                    target,
                    content,
                    reply,
                } => {
                    let message =
                        Message::new(self.id.clone(), target, content, self.superstep);
                    self.outgoing_messages.push(message);
                    let _ = reply.send(());
                }
                VertexRequest::DrainOutbox { reply } => {
                    let _ = reply.send(mem::take(&mut self.outgoing_messages));
                }
                VertexRequest::ClearOutbox { reply } => {
                    self.outgoing_messages.clear();
                    let _ = reply.send(());
                }
                VertexRequest::Receive { messages, reply } => {
                    self.pending_messages.extend(messages);
                    let _ = reply.send(());
                }
                VertexRequest::Advance { reply } => {
                    self.advance();
                    let _ = reply.send(());
                }
                VertexRequest::IsActive { reply } => {
                    let _ = reply.send(self.active);
                }
                VertexRequest::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                VertexRequest::Stop { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
        tracing::debug!(graph = %self.graph_id, vertex = %self.id, "vertex actor stopped");
    }

    /// One step of the activation state machine
    async fn compute(&mut self) -> Result<ComputeReport, EngineError> {
        if !self.active {
            return Ok(self.report(false, Vec::new()));
        }

        // Past the seeding round, silence means there is nothing to do.
        if self.superstep > 0 && self.incoming_messages.is_empty() {
            self.active = false;
            tracing::debug!(vertex = %self.id, superstep = self.superstep, "auto-halt on empty inbox");
            return Ok(self.report(true, Vec::new()));
        }

        let ctx = self.context(self.value.clone());
        let outcome = self
            .program
            .compute(&ctx)
            .await
            .map_err(|source| EngineError::program_failed(self.id.clone(), self.superstep, source))?;

        let emitted = match outcome {
            ComputeOutcome::Halt => {
                self.active = false;
                Vec::new()
            }
            ComputeOutcome::Unchanged => {
                let emitted = match self.value.clone() {
                    Some(current) => self.fan_out(current),
                    None => Vec::new(),
                };
                self.active = false;
                emitted
            }
            ComputeOutcome::NewValue(partial) => {
                let merged = Value::merge(ctx.aggregated.as_ref(), partial);
                self.value = Some(merged.clone());
                self.fan_out(merged)
            }
        };

        self.outgoing_messages.extend(emitted.iter().cloned());
        Ok(self.report(true, emitted))
    }

    /// Build one message per outgoing edge whose condition permits, in
    /// insertion order, carrying `payload` and the current superstep.
    fn fan_out(&self, payload: Value) -> Vec<Message> {
        let ctx = self.context(Some(payload.clone()));
        self.outgoing_edges
            .iter()
            .filter(|edge| edge.permits(&ctx))
            .map(|edge| {
                Message::new(
                    self.id.clone(),
                    edge.target.clone(),
                    payload.clone(),
                    self.superstep,
                )
            })
            .collect()
    }

    fn context(&self, value: Option<Value>) -> ComputeContext {
        let contents: Vec<Value> = self
            .incoming_messages
            .iter()
            .map(|m| m.content.clone())
            .collect();
        ComputeContext {
            vertex_id: self.id.clone(),
            superstep: self.superstep,
            value,
            raw_messages: self.incoming_messages.clone(),
            aggregated: Value::aggregate(&contents),
            outgoing_edges: self.outgoing_edges.clone(),
        }
    }

    fn add_edge(&mut self, edge: Edge) {
        match self
            .outgoing_edges
            .iter_mut()
            .find(|existing| existing.target == edge.target)
        {
            Some(existing) => *existing = edge,
            None => self.outgoing_edges.push(edge),
        }
    }

    fn remove_edge(&mut self, target: VertexId) -> Result<(), EngineError> {
        match self
            .outgoing_edges
            .iter()
            .position(|edge| edge.target == target)
        {
            Some(index) => {
                self.outgoing_edges.remove(index);
                Ok(())
            }
            None => Err(EngineError::EdgeNotFound {
                from: self.id.clone(),
                to: target,
            }),
        }
    }

    fn advance(&mut self) {
        self.superstep += 1;
        let delivered = mem::take(&mut self.pending_messages);
        if !delivered.is_empty() {
            self.active = true;
        }
        self.incoming_messages = delivered;
    }

    fn report(&self, ran: bool, emitted: Vec<Message>) -> ComputeReport {
        ComputeReport {
            vertex_id: self.id.clone(),
            ran,
            active: self.active,
            value: self.value.clone(),
            emitted,
        }
    }

    fn snapshot(&self) -> VertexSnapshot {
        VertexSnapshot {
            graph_id: self.graph_id.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            vertex_type: self.vertex_type,
            value: self.value.clone(),
            superstep: self.superstep,
            active: self.active,
            incoming_messages: self.incoming_messages.clone(),
            pending_messages: self.pending_messages.clone(),
            outgoing_messages: self.outgoing_messages.clone(),
            outgoing_edges: self.outgoing_edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{program, ComputeOutcome};

    static_assertions::assert_impl_all!(VertexHandle: Send, Sync);

    fn test_vertex(vertex_type: VertexType, p: BoxedProgram) -> VertexHandle {
        spawn(
            GraphId::from("test-graph"),
            VertexId::mint(),
            "v".to_string(),
            vertex_type,
            p,
            None,
        )
    }

    fn echo_program() -> BoxedProgram {
        program(|ctx| match &ctx.aggregated {
            Some(v) => Ok(ComputeOutcome::NewValue(v.clone())),
            None => Ok(ComputeOutcome::NewValue(Value::number(0.0))),
        })
    }

    #[test]
    fn test_minted_id_shape() {
        let id = VertexId::mint();
        let hex = id.as_str().strip_prefix("vtx.").expect("vtx. prefix");
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_minted_ids_unique() {
        let a = VertexId::mint();
        let b = VertexId::mint();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_source_starts_active_normal_dormant() {
        let source = test_vertex(VertexType::Source, echo_program());
        let normal = test_vertex(VertexType::Normal, echo_program());
        assert!(source.is_active().await.unwrap());
        assert!(!normal.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_dormant_vertex_skipped() {
        let v = test_vertex(VertexType::Normal, echo_program());
        let report = v.compute().await.unwrap();
        assert!(!report.ran);
        assert!(!report.active);
        assert!(report.emitted.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_then_advance_activates() {
        let v = test_vertex(VertexType::Normal, echo_program());
        let msg = Message::new("vtx.peer", v.id().clone(), Value::number(2.0), 0);
        v.receive(vec![msg]).await.unwrap();

        // still dormant until the barrier
        assert!(!v.is_active().await.unwrap());

        v.advance().await.unwrap();
        assert!(v.is_active().await.unwrap());

        let snap = v.snapshot().await.unwrap();
        assert_eq!(snap.superstep, 1);
        assert_eq!(snap.incoming_messages.len(), 1);
        assert!(snap.pending_messages.is_empty());
    }

    #[tokio::test]
    async fn test_advance_with_empty_pending_preserves_state() {
        let v = test_vertex(VertexType::Normal, echo_program());
        v.advance().await.unwrap();
        assert!(!v.is_active().await.unwrap());

        let snap = v.snapshot().await.unwrap();
        assert_eq!(snap.superstep, 1);
        assert!(snap.incoming_messages.is_empty());
    }

    #[tokio::test]
    async fn test_auto_halt_on_empty_inbox() {
        let v = test_vertex(VertexType::Source, echo_program());
        // superstep 0: the program runs even with an empty inbox
        let report = v.compute().await.unwrap();
        assert!(report.ran);
        assert!(report.active);
        assert_eq!(report.value, Some(Value::Number(0.0)));

        // superstep 1, nothing delivered: auto-halt without running the program
        v.advance().await.unwrap();
        let report = v.compute().await.unwrap();
        assert!(report.ran);
        assert!(!report.active);
        assert_eq!(report.value, Some(Value::Number(0.0)));
        assert!(report.emitted.is_empty());
    }

    #[tokio::test]
    async fn test_halt_outcome_deactivates_without_emitting() {
        let v = test_vertex(VertexType::Source, program(|_| Ok(ComputeOutcome::Halt)));
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.next"))
            .await
            .unwrap();

        let report = v.compute().await.unwrap();
        assert!(!report.active);
        assert!(report.emitted.is_empty());
        assert_eq!(report.value, None);
    }

    #[tokio::test]
    async fn test_unchanged_broadcasts_current_value_and_halts() {
        let v = spawn(
            GraphId::from("test-graph"),
            VertexId::mint(),
            "v".to_string(),
            VertexType::Source,
            program(|_| Ok(ComputeOutcome::Unchanged)),
            Some(Value::number(7.0)),
        );
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.next"))
            .await
            .unwrap();

        let report = v.compute().await.unwrap();
        assert!(!report.active);
        assert_eq!(report.emitted.len(), 1);
        assert_eq!(report.emitted[0].content, Value::Number(7.0));
        assert_eq!(report.value, Some(Value::Number(7.0)));
    }

    #[tokio::test]
    async fn test_new_value_merges_with_aggregated() {
        let v = test_vertex(
            VertexType::Normal,
            program(|_| {
                Ok(ComputeOutcome::NewValue(Value::map([(
                    "sum",
                    Value::number(1.0),
                )])))
            }),
        );
        let incoming = Message::new(
            "vtx.peer",
            v.id().clone(),
            Value::map([("sum", Value::number(0.0)), ("origin", Value::from("seed"))]),
            0,
        );
        v.receive(vec![incoming]).await.unwrap();
        v.advance().await.unwrap();

        let report = v.compute().await.unwrap();
        // aggregated is the merge base; keys from the new value win
        let value = report.value.expect("merged value");
        assert_eq!(value.get("sum"), Some(&Value::Number(1.0)));
        assert_eq!(value.get("origin"), Some(&Value::from("seed")));
        assert!(report.active);
    }

    #[tokio::test]
    async fn test_fan_out_respects_conditions_and_order() {
        let v = test_vertex(
            VertexType::Source,
            program(|_| Ok(ComputeOutcome::NewValue(Value::number(5.0)))),
        );
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.always"))
            .await
            .unwrap();
        v.add_outgoing_edge(
            Edge::new(v.id().clone(), "vtx.never").with_condition(|_| Ok(false)),
        )
        .await
        .unwrap();
        v.add_outgoing_edge(
            Edge::new(v.id().clone(), "vtx.big")
                .with_condition(|ctx| Ok(ctx.value.as_ref().and_then(Value::as_number) > Some(1.0))),
        )
        .await
        .unwrap();

        let report = v.compute().await.unwrap();
        let targets: Vec<&str> = report
            .emitted
            .iter()
            .map(|m| m.recipient.as_str())
            .collect();
        assert_eq!(targets, vec!["vtx.always", "vtx.big"]);
    }

    #[tokio::test]
    async fn test_emitted_messages_carry_sender_superstep() {
        let v = test_vertex(VertexType::Source, echo_program());
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.next"))
            .await
            .unwrap();
        v.advance().await.unwrap();
        v.advance().await.unwrap();
        v.enqueue_outbox(VertexId::from("vtx.next"), Value::from("direct"))
            .await
            .unwrap();

        let snap = v.snapshot().await.unwrap();
        assert_eq!(snap.outgoing_messages.len(), 1);
        assert_eq!(snap.outgoing_messages[0].superstep, 2);
        assert_eq!(snap.outgoing_messages[0].sender, *v.id());
    }

    #[tokio::test]
    async fn test_drain_outbox_empties_buffer() {
        let v = test_vertex(VertexType::Normal, echo_program());
        v.enqueue_outbox(VertexId::from("vtx.a"), Value::number(1.0))
            .await
            .unwrap();
        v.enqueue_outbox(VertexId::from("vtx.b"), Value::number(2.0))
            .await
            .unwrap();

        let drained = v.drain_outbox().await.unwrap();
        assert_eq!(drained.len(), 2);
        // same-sender emission order preserved
        assert_eq!(drained[0].recipient.as_str(), "vtx.a");
        assert_eq!(drained[1].recipient.as_str(), "vtx.b");

        let snap = v.snapshot().await.unwrap();
        assert!(snap.outgoing_messages.is_empty());
    }

    #[tokio::test]
    async fn test_add_edge_replaces_duplicate_target() {
        let v = test_vertex(VertexType::Normal, echo_program());
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.t").with_weight(1.0))
            .await
            .unwrap();
        v.add_outgoing_edge(Edge::new(v.id().clone(), "vtx.t").with_weight(9.0))
            .await
            .unwrap();

        let edges = v.outgoing_edges().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 9.0);
    }

    #[tokio::test]
    async fn test_remove_missing_edge_fails() {
        let v = test_vertex(VertexType::Normal, echo_program());
        let err = v
            .remove_outgoing_edge(VertexId::from("vtx.ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EdgeNotFound { .. }));
    }

    #[tokio::test]
    async fn test_program_failure_surfaces_and_actor_survives() {
        let v = test_vertex(VertexType::Source, program(|_| Err("boom".into())));
        let err = v.compute().await.unwrap_err();
        match err {
            EngineError::ProgramFailed { round, .. } => assert_eq!(round, 0),
            other => panic!("expected program failure, got {:?}", other),
        }
        // the actor keeps serving requests after a program error
        assert!(v.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_releases_actor() {
        let v = test_vertex(VertexType::Normal, echo_program());
        v.stop().await.unwrap();
        let err = v.is_active().await.unwrap_err();
        assert!(matches!(err, EngineError::VertexNotFound(_)));
    }
}

//! Graph CRUD and message routing
//!
//! A graph owns a set of vertex actors keyed by minted ids. Handles are
//! resolved through the process-wide registry; the graph itself keeps only
//! the insertion order, the final-vertex designation, and the lifecycle
//! flag that forbids CRUD while a run is in progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::EngineError;
use crate::program::BoxedProgram;
use crate::registry::Registry;
use crate::value::Value;
use crate::vertex::{
    self, ComputeReport, VertexHandle, VertexId, VertexOptions, VertexSnapshot,
};

/// Identifier of a live graph, chosen by the caller at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub String);

impl GraphId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GraphId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GraphId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed graph of vertex actors plus its superstep driver state
pub struct Graph {
    id: GraphId,
    name: String,
    registry: Arc<Registry>,
    /// Vertex ids in creation order
    order: RwLock<Vec<VertexId>>,
    /// The unique final vertex, once one is created
    final_vertex: Mutex<Option<VertexId>>,
    running: AtomicBool,
    /// Cumulative rounds executed, used to label superstep reports
    pub(crate) rounds: AtomicU64,
}

impl Graph {
    pub(crate) fn new(id: GraphId, name: String, registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            registry,
            order: RwLock::new(Vec::new()),
            final_vertex: Mutex::new(None),
            running: AtomicBool::new(false),
            rounds: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_mutable(&self) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::invalid_state(format!(
                "graph {} is running; vertex and edge CRUD is not permitted",
                self.id
            )));
        }
        Ok(())
    }

    pub(crate) fn try_begin_run(&self) -> Result<(), EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::invalid_state(format!(
                "graph {} is already running",
                self.id
            )));
        }
        Ok(())
    }

    pub(crate) fn end_run(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Create a vertex: mint an id, spawn the actor, publish the registry
    /// entry, and return the handle.
    pub fn create_vertex(
        &self,
        name: impl Into<String>,
        program: BoxedProgram,
        options: VertexOptions,
    ) -> Result<VertexHandle, EngineError> {
        self.ensure_mutable()?;

        if options.vertex_type.is_final() {
            let guard = lock(&self.final_vertex);
            if let Some(existing) = guard.as_ref() {
                return Err(EngineError::invalid_state(format!(
                    "graph {} already has final vertex {}",
                    self.id, existing
                )));
            }
        }

        let id = VertexId::mint();
        let name = name.into();
        let vertex_type = options.vertex_type;
        let handle = vertex::spawn(
            self.id.clone(),
            id.clone(),
            name.clone(),
            vertex_type,
            program,
            options.value,
        );
        self.registry.insert_vertex(handle.clone());
        write(&self.order).push(id.clone());
        if vertex_type.is_final() {
            *lock(&self.final_vertex) = Some(id.clone());
        }
        tracing::debug!(graph = %self.id, vertex = %id, %name, ?vertex_type, "vertex created");
        Ok(handle)
    }

    /// Stop a vertex actor and drop it from the registry
    pub async fn stop_vertex(&self, id: &VertexId) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let handle = self
            .registry
            .remove_vertex(&self.id, id)
            .ok_or_else(|| EngineError::VertexNotFound(id.clone()))?;
        write(&self.order).retain(|v| v != id);
        let mut final_guard = lock(&self.final_vertex);
        if final_guard.as_ref() == Some(id) {
            *final_guard = None;
        }
        drop(final_guard);
        handle.stop().await?;
        tracing::debug!(graph = %self.id, vertex = %id, "vertex stopped");
        Ok(())
    }

    /// Resolve a vertex handle
    pub fn vertex(&self, id: &VertexId) -> Result<VertexHandle, EngineError> {
        self.registry
            .vertex(&self.id, id)
            .ok_or_else(|| EngineError::VertexNotFound(id.clone()))
    }

    /// All vertex handles in creation order
    pub fn list_vertices(&self) -> Vec<VertexHandle> {
        read(&self.order)
            .iter()
            .filter_map(|id| self.registry.vertex(&self.id, id))
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        read(&self.order).len()
    }

    /// Full observable state of one vertex
    pub async fn vertex_state(&self, id: &VertexId) -> Result<VertexSnapshot, EngineError> {
        self.vertex(id)?.snapshot().await
    }

    /// Install an edge after checking both endpoints live in this graph
    pub async fn create_edge(&self, edge: Edge) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let source = self.vertex(&edge.source)?;
        // target must exist too, even though only the source stores the edge
        self.vertex(&edge.target)?;
        source.add_outgoing_edge(edge).await
    }

    /// Remove the edge between two vertices
    pub async fn remove_edge(&self, from: &VertexId, to: &VertexId) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        self.vertex(from)?.remove_outgoing_edge(to.clone()).await
    }

    /// Outgoing edges of one vertex
    pub async fn vertex_edges(&self, id: &VertexId) -> Result<Vec<Edge>, EngineError> {
        self.vertex(id)?.outgoing_edges().await
    }

    /// Neighbor ids of one vertex
    pub async fn vertex_neighbors(&self, id: &VertexId) -> Result<Vec<VertexId>, EngineError> {
        self.vertex(id)?.neighbors().await
    }

    /// Every edge in the graph; ordering between vertices is unspecified
    pub async fn list_edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for handle in self.list_vertices() {
            if let Ok(mut outgoing) = handle.outgoing_edges().await {
                edges.append(&mut outgoing);
            }
        }
        edges
    }

    /// Enqueue a message into the sender's outbox; it travels with the next
    /// round's routing pass
    pub async fn send_message(
        &self,
        from: &VertexId,
        to: &VertexId,
        content: Value,
    ) -> Result<(), EngineError> {
        let sender = self.vertex(from)?;
        self.vertex(to)?;
        sender.enqueue_outbox(to.clone(), content).await
    }

    /// Manually compute a single vertex (diagnostic)
    pub async fn compute_vertex(&self, id: &VertexId) -> Result<ComputeReport, EngineError> {
        self.vertex(id)?.compute().await
    }

    /// State of the unique final vertex, once the graph has halted
    pub async fn final_value(&self) -> Result<VertexSnapshot, EngineError> {
        let id = lock(&self.final_vertex)
            .clone()
            .ok_or_else(|| EngineError::FinalVertexNotFound(self.id.clone()))?;
        self.vertex_state(&id).await
    }

    /// Stop every vertex actor; used at graph teardown
    pub(crate) async fn shutdown(&self) {
        let ids: Vec<VertexId> = read(&self.order).clone();
        for id in ids {
            if let Some(handle) = self.registry.remove_vertex(&self.id, &id) {
                let _ = handle.stop().await;
            }
        }
        write(&self.order).clear();
        *lock(&self.final_vertex) = None;
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vertices", &self.vertex_count())
            .field("running", &self.is_running())
            .finish()
    }
}

// Poisoning cannot be meaningfully recovered from here; take the inner
// value and keep serving.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

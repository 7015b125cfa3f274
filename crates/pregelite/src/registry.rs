//! Process-wide registry and graph supervision
//!
//! The registry is the only shared mutable structure in the engine: two
//! read-mostly directories mapping graph ids to graphs and (graph id,
//! vertex id) pairs to vertex handles. It is written only when graphs or
//! vertices are created and destroyed; during a run it is read-only.
//!
//! [`Engine`] is the embedding surface: it supervises graph lifetimes and
//! forwards id-addressed operations to the owning graph.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::RunConfig;
use crate::edge::Edge;
use crate::error::EngineError;
use crate::graph::{Graph, GraphId};
use crate::program::BoxedProgram;
use crate::superstep::{RunReport, SuperstepReport};
use crate::value::Value;
use crate::vertex::{ComputeReport, VertexHandle, VertexId, VertexOptions, VertexSnapshot};

/// Directory of live graphs and vertices
pub struct Registry {
    graphs: RwLock<HashMap<GraphId, Arc<Graph>>>,
    vertices: RwLock<HashMap<(GraphId, VertexId), VertexHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            graphs: RwLock::new(HashMap::new()),
            vertices: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert_graph(&self, graph: Arc<Graph>) -> Result<(), EngineError> {
        let mut graphs = write(&self.graphs);
        if graphs.contains_key(graph.id()) {
            return Err(EngineError::invalid_state(format!(
                "graph id already in use: {}",
                graph.id()
            )));
        }
        graphs.insert(graph.id().clone(), graph);
        Ok(())
    }

    pub(crate) fn remove_graph(&self, id: &GraphId) -> Option<Arc<Graph>> {
        write(&self.graphs).remove(id)
    }

    pub fn graph(&self, id: &GraphId) -> Option<Arc<Graph>> {
        read(&self.graphs).get(id).cloned()
    }

    pub fn graphs(&self) -> Vec<Arc<Graph>> {
        read(&self.graphs).values().cloned().collect()
    }

    pub fn graph_count(&self) -> usize {
        read(&self.graphs).len()
    }

    pub(crate) fn insert_vertex(&self, handle: VertexHandle) {
        write(&self.vertices).insert((handle.graph_id().clone(), handle.id().clone()), handle);
    }

    pub(crate) fn remove_vertex(&self, graph: &GraphId, id: &VertexId) -> Option<VertexHandle> {
        write(&self.vertices).remove(&(graph.clone(), id.clone()))
    }

    pub fn vertex(&self, graph: &GraphId, id: &VertexId) -> Option<VertexHandle> {
        read(&self.vertices)
            .get(&(graph.clone(), id.clone()))
            .cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedding surface: graph supervisor plus id-addressed passthroughs
pub struct Engine {
    registry: Arc<Registry>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Create a graph. The name doubles as the graph id and must be unique
    /// among live graphs.
    pub fn create_graph(&self, name: impl Into<String>) -> Result<Arc<Graph>, EngineError> {
        let name = name.into();
        let graph = Graph::new(GraphId(name.clone()), name, Arc::clone(&self.registry));
        self.registry.insert_graph(Arc::clone(&graph))?;
        tracing::info!(graph = %graph.id(), "graph created");
        Ok(graph)
    }

    /// Stop a graph: every vertex actor is stopped and all registry entries
    /// are dropped.
    pub async fn stop_graph(&self, id: &GraphId) -> Result<(), EngineError> {
        let graph = self
            .registry
            .remove_graph(id)
            .ok_or_else(|| EngineError::GraphNotFound(id.clone()))?;
        graph.shutdown().await;
        tracing::info!(graph = %id, "graph stopped");
        Ok(())
    }

    /// Resolve a live graph
    pub fn graph(&self, id: &GraphId) -> Result<Arc<Graph>, EngineError> {
        self.registry
            .graph(id)
            .ok_or_else(|| EngineError::GraphNotFound(id.clone()))
    }

    pub fn list_graphs(&self) -> Vec<Arc<Graph>> {
        self.registry.graphs()
    }

    pub fn graph_count(&self) -> usize {
        self.registry.graph_count()
    }

    // Id-addressed passthroughs

    pub fn create_vertex(
        &self,
        graph_id: &GraphId,
        name: impl Into<String>,
        program: BoxedProgram,
        options: VertexOptions,
    ) -> Result<VertexHandle, EngineError> {
        self.graph(graph_id)?.create_vertex(name, program, options)
    }

    pub async fn stop_vertex(
        &self,
        graph_id: &GraphId,
        vertex_id: &VertexId,
    ) -> Result<(), EngineError> {
        self.graph(graph_id)?.stop_vertex(vertex_id).await
    }

    pub async fn get_vertex_state(
        &self,
        graph_id: &GraphId,
        vertex_id: &VertexId,
    ) -> Result<VertexSnapshot, EngineError> {
        self.graph(graph_id)?.vertex_state(vertex_id).await
    }

    pub fn list_vertices(&self, graph_id: &GraphId) -> Result<Vec<VertexHandle>, EngineError> {
        Ok(self.graph(graph_id)?.list_vertices())
    }

    pub fn vertex_count(&self, graph_id: &GraphId) -> Result<usize, EngineError> {
        Ok(self.graph(graph_id)?.vertex_count())
    }

    pub async fn create_edge(&self, graph_id: &GraphId, edge: Edge) -> Result<(), EngineError> {
        self.graph(graph_id)?.create_edge(edge).await
    }

    pub async fn remove_edge(
        &self,
        graph_id: &GraphId,
        from: &VertexId,
        to: &VertexId,
    ) -> Result<(), EngineError> {
        self.graph(graph_id)?.remove_edge(from, to).await
    }

    pub async fn get_vertex_edges(
        &self,
        graph_id: &GraphId,
        vertex_id: &VertexId,
    ) -> Result<Vec<Edge>, EngineError> {
        self.graph(graph_id)?.vertex_edges(vertex_id).await
    }

    pub async fn get_vertex_neighbors(
        &self,
        graph_id: &GraphId,
        vertex_id: &VertexId,
    ) -> Result<Vec<VertexId>, EngineError> {
        self.graph(graph_id)?.vertex_neighbors(vertex_id).await
    }

    pub async fn list_edges(&self, graph_id: &GraphId) -> Result<Vec<Edge>, EngineError> {
        Ok(self.graph(graph_id)?.list_edges().await)
    }

    pub async fn send_message(
        &self,
        graph_id: &GraphId,
        from: &VertexId,
        to: &VertexId,
        content: Value,
    ) -> Result<(), EngineError> {
        self.graph(graph_id)?.send_message(from, to, content).await
    }

    pub async fn compute_vertex(
        &self,
        graph_id: &GraphId,
        vertex_id: &VertexId,
    ) -> Result<ComputeReport, EngineError> {
        self.graph(graph_id)?.compute_vertex(vertex_id).await
    }

    pub async fn execute_superstep(
        &self,
        graph_id: &GraphId,
    ) -> Result<SuperstepReport, EngineError> {
        self.graph(graph_id)?.execute_superstep().await
    }

    pub async fn run(
        &self,
        graph_id: &GraphId,
        config: &RunConfig,
    ) -> Result<RunReport, EngineError> {
        self.graph(graph_id)?.run(config).await
    }

    pub async fn get_final_value(
        &self,
        graph_id: &GraphId,
    ) -> Result<VertexSnapshot, EngineError> {
        self.graph(graph_id)?.final_value().await
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{program, ComputeOutcome};

    static_assertions::assert_impl_all!(Engine: Send, Sync);

    fn halt() -> BoxedProgram {
        program(|_| Ok(ComputeOutcome::Halt))
    }

    #[tokio::test]
    async fn test_create_and_stop_graph() {
        let engine = Engine::new();
        let graph = engine.create_graph("orders").unwrap();
        assert_eq!(engine.graph_count(), 1);
        assert_eq!(graph.id().as_str(), "orders");

        engine.stop_graph(&GraphId::from("orders")).await.unwrap();
        assert_eq!(engine.graph_count(), 0);
        assert!(matches!(
            engine.graph(&GraphId::from("orders")),
            Err(EngineError::GraphNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_graph_id_rejected() {
        let engine = Engine::new();
        engine.create_graph("g").unwrap();
        assert!(matches!(
            engine.create_graph("g"),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_graph_releases_vertices() {
        let engine = Engine::new();
        let graph = engine.create_graph("g").unwrap();
        let v = graph
            .create_vertex("a", halt(), VertexOptions::new())
            .unwrap();
        let graph_id = graph.id().clone();
        let vertex_id = v.id().clone();

        engine.stop_graph(&graph_id).await.unwrap();
        assert!(engine.registry().vertex(&graph_id, &vertex_id).is_none());
        // the actor is gone too
        assert!(v.is_active().await.is_err());
    }

    #[tokio::test]
    async fn test_vertex_lookup_is_scoped_by_graph() {
        let engine = Engine::new();
        let a = engine.create_graph("a").unwrap();
        let b = engine.create_graph("b").unwrap();
        let v = a.create_vertex("v", halt(), VertexOptions::new()).unwrap();

        assert!(engine.registry().vertex(a.id(), v.id()).is_some());
        assert!(engine.registry().vertex(b.id(), v.id()).is_none());
    }

    #[tokio::test]
    async fn test_passthrough_operations() {
        let engine = Engine::new();
        let graph = engine.create_graph("g").unwrap();
        let gid = graph.id().clone();

        let a = engine
            .create_vertex(&gid, "a", halt(), VertexOptions::new())
            .unwrap();
        let b = engine
            .create_vertex(&gid, "b", halt(), VertexOptions::new())
            .unwrap();
        assert_eq!(engine.vertex_count(&gid).unwrap(), 2);

        engine
            .create_edge(&gid, Edge::new(a.id().clone(), b.id().clone()))
            .await
            .unwrap();
        assert_eq!(engine.list_edges(&gid).await.unwrap().len(), 1);
        assert_eq!(
            engine.get_vertex_neighbors(&gid, a.id()).await.unwrap(),
            vec![b.id().clone()]
        );

        engine
            .send_message(&gid, a.id(), b.id(), Value::number(1.0))
            .await
            .unwrap();
        let snap = engine.get_vertex_state(&gid, a.id()).await.unwrap();
        assert_eq!(snap.outgoing_messages.len(), 1);

        let missing = GraphId::from("nope");
        assert!(matches!(
            engine.vertex_count(&missing),
            Err(EngineError::GraphNotFound(_))
        ));
    }
}

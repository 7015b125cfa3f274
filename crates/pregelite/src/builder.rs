//! Fluent graph construction
//!
//! The builder accumulates a pending description of a graph: a name, vertex
//! specs addressed by label, and edges between labels. `finish` translates
//! the description into engine CRUD calls, mapping labels to the minted
//! vertex ids. The first failing call tears the partially constructed graph
//! down and propagates the error.

use std::collections::HashMap;

use crate::edge::Edge;
use crate::error::EngineError;
use crate::graph::Graph;
use crate::program::BoxedProgram;
use crate::registry::Engine;
use crate::vertex::{VertexId, VertexOptions, VertexType};

type EdgeConfigure = Box<dyn FnOnce(Edge) -> Edge + Send>;

struct VertexSpec {
    label: String,
    program: BoxedProgram,
    options: VertexOptions,
}

struct EdgeSpec {
    from: String,
    to: String,
    configure: Option<EdgeConfigure>,
}

/// Accumulates a graph description for one-shot construction
pub struct GraphBuilder<'a> {
    engine: &'a Engine,
    name: String,
    vertices: Vec<VertexSpec>,
    edges: Vec<EdgeSpec>,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(engine: &'a Engine, name: impl Into<String>) -> Self {
        Self {
            engine,
            name: name.into(),
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a vertex with default options
    pub fn vertex(self, label: impl Into<String>, program: BoxedProgram) -> Self {
        self.vertex_with(label, program, VertexOptions::new())
    }

    /// Add a vertex with explicit options
    pub fn vertex_with(
        mut self,
        label: impl Into<String>,
        program: BoxedProgram,
        options: VertexOptions,
    ) -> Self {
        self.vertices.push(VertexSpec {
            label: label.into(),
            program,
            options,
        });
        self
    }

    /// Add an initially active seeding vertex
    pub fn source(self, label: impl Into<String>, program: BoxedProgram) -> Self {
        self.vertex_with(
            label,
            program,
            VertexOptions::new().with_type(VertexType::Source),
        )
    }

    /// Add the sink vertex whose value is the graph's result
    pub fn sink(self, label: impl Into<String>, program: BoxedProgram) -> Self {
        self.vertex_with(
            label,
            program,
            VertexOptions::new().with_type(VertexType::Final),
        )
    }

    /// Add an edge between two labels with default weight
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            configure: None,
        });
        self
    }

    /// Add an edge and customize its weight, properties, or condition
    pub fn edge_with<F>(mut self, from: impl Into<String>, to: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(Edge) -> Edge + Send + 'static,
    {
        self.edges.push(EdgeSpec {
            from: from.into(),
            to: to.into(),
            configure: Some(Box::new(configure)),
        });
        self
    }

    /// Translate the description into CRUD calls.
    ///
    /// On the first error the partially constructed graph is stopped and the
    /// error propagated.
    pub async fn finish(self) -> Result<std::sync::Arc<Graph>, EngineError> {
        let graph = self.engine.create_graph(self.name)?;

        let outcome = Self::apply(&graph, self.vertices, self.edges).await;
        match outcome {
            Ok(()) => Ok(graph),
            Err(error) => {
                let _ = self.engine.stop_graph(graph.id()).await;
                Err(error)
            }
        }
    }

    async fn apply(
        graph: &Graph,
        vertices: Vec<VertexSpec>,
        edges: Vec<EdgeSpec>,
    ) -> Result<(), EngineError> {
        let mut ids: HashMap<String, VertexId> = HashMap::new();

        for spec in vertices {
            if ids.contains_key(&spec.label) {
                return Err(EngineError::invalid_state(format!(
                    "duplicate vertex label: {}",
                    spec.label
                )));
            }
            let handle = graph.create_vertex(spec.label.clone(), spec.program, spec.options)?;
            ids.insert(spec.label, handle.id().clone());
        }

        for spec in edges {
            let from = Self::resolve(&ids, &spec.from)?;
            let to = Self::resolve(&ids, &spec.to)?;
            let mut edge = Edge::new(from, to);
            if let Some(configure) = spec.configure {
                edge = configure(edge);
            }
            graph.create_edge(edge).await?;
        }

        Ok(())
    }

    fn resolve(ids: &HashMap<String, VertexId>, label: &str) -> Result<VertexId, EngineError> {
        ids.get(label)
            .cloned()
            .ok_or_else(|| EngineError::invalid_state(format!("unknown vertex label: {}", label)))
    }
}

impl Engine {
    /// Start a fluent graph description
    pub fn build_graph(&self, name: impl Into<String>) -> GraphBuilder<'_> {
        GraphBuilder::new(self, name)
    }
}

//! pregelite: an in-process Pregel-style superstep engine
//!
//! A graph of vertex actors runs as a sequence of globally synchronized
//! rounds. Within a round each active vertex executes its user program
//! against an aggregated view of the previous round's messages; between
//! rounds the engine routes outbox messages to the recipients' pending
//! buffers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │   registry: graph id → Graph, (graph id, vertex id) → actor  │
//! │                                                              │
//! │   Graph ── superstep driver ───────────────────────────────┐ │
//! │   │  Compute → Drain → Deliver → Clear → Advance           │ │
//! │   │     │                                                  │ │
//! │   │     ▼                                                  │ │
//! │   │  Vertex actors (one tokio task each, FIFO requests)    │ │
//! │   └────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pregelite::{ComputeOutcome, Engine, RunConfig, Value, program};
//!
//! let engine = Engine::new();
//! let graph = engine
//!     .build_graph("counter")
//!     .source("seed", program(|_| Ok(ComputeOutcome::NewValue(Value::number(0.0)))))
//!     .sink("out", program(|ctx| match &ctx.aggregated {
//!         Some(v) => Ok(ComputeOutcome::NewValue(v.clone())),
//!         None => Ok(ComputeOutcome::Halt),
//!     }))
//!     .edge("seed", "out")
//!     .finish()
//!     .await?;
//!
//! graph.run(&RunConfig::default()).await?;
//! let result = graph.final_value().await?;
//! ```

pub mod builder;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod message;
pub mod program;
pub mod registry;
pub mod superstep;
pub mod value;
pub mod vertex;

// Re-exports for convenience
pub use builder::GraphBuilder;
pub use config::RunConfig;
pub use edge::{Edge, EdgeCondition};
pub use error::EngineError;
pub use graph::{Graph, GraphId};
pub use message::Message;
pub use program::{
    program, BoxedProgram, ComputeContext, ComputeOutcome, FnProgram, ProgramError, VertexProgram,
};
pub use registry::{Engine, Registry};
pub use superstep::{RunReport, SuperstepReport};
pub use value::Value;
pub use vertex::{
    ComputeReport, VertexHandle, VertexId, VertexOptions, VertexSnapshot, VertexType,
};

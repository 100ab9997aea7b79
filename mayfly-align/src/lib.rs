//! mayfly-align: long-read to assembly-graph alignment core
//!
//! Pipeline for one read:
//! - a seeding subsystem (external, behind [`ChainSeeder`]) delivers ranked
//!   chains of candidate anchors
//! - the cluster processor orders anchors along the read and joins
//!   consecutive anchors through the gap filler
//! - gaps are filled by a bounded best-first search over
//!   `(edge span, read prefix)` states, with edit-distance primitives as the
//!   edge-weight oracles
//! - unanchored read ends are restored by an open-ended variant of the same
//!   search
//! - pairs of subreads that could not be joined get gap records with
//!   topology-aware overlap fix-up
//!
//! Key principle: failures stay local. A gap that cannot be filled splits the
//! walk; the per-read mapping is always produced.
//!
//! Parallelism is read-level; the graph is shared read-only and all search
//! state is owned by one search instance.

pub mod aligner;
pub mod config;
pub mod distance;
pub mod filler;
pub mod graph;
pub mod search;
pub mod types;

pub use aligner::{ChainSeeder, ReadAligner};
pub use config::{AlignerConfig, GapClosingConfig};
pub use filler::{EndsStatus, GapFiller, GapFillerResult};
pub use graph::{AssemblyGraph, EdgeId, GraphBuilder, VertexId};
pub use search::ends::EndsReconstructor;
pub use search::gap::{GapDijkstra, ReachableVertices};
pub use types::{
    AnchorRange, GapDescription, GraphPosition, MappingInstance, MappingPath, MappingRange,
    OneReadMapping, PathPosition, PathRange, Range,
};

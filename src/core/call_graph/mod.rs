// src/core/call_graph/mod.rs
//! Call graph model, call resolution, ranking and focus filtering
//!
//! Entities and edges come in from the per-file extractor; the resolver
//! links call sites to definitions, the assembler builds an immutable
//! snapshot and the ranker assigns heat over the whole project before any
//! focus filter narrows it down.

mod call_graph;
mod resolver;
mod ranker;
mod focus;

pub use call_graph::{CallGraph, CallEdge, FunctionEntity, FunctionKind, Centrality};
pub use resolver::{CallResolver, Resolution, ResolutionStats};
pub use ranker::{Ranker, betweenness_centrality, min_max_normalize};
pub use focus::FocusPredicate;

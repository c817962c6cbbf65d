// src/core/mod.rs
mod engine;
mod parser;
mod extractor;
mod analysis;
mod report;

// Call graph model, resolution and ranking
mod call_graph;

// Language-specific parsers
mod languages;

pub use parser::{SourceCollector, SourceFile, ParseFailure, CollectedSources, extract_sources};
pub use extractor::{
    EntityExtractor, FileExtraction, CallSite, CallTarget, EnclosingScope, ScopeLevel, module_name,
};
pub use languages::{LanguageParser, PythonParser, SyntaxWalker, SyntaxNode, TaggedNode, ScopeFrame, ScopeKind, Position};
pub use analysis::{Analyzer, Analysis, Diagnostics, GraphState, analyze_sources};
pub use report::{ReportGenerator, GraphExport, EntityRecord, ExportSummary};

pub use call_graph::{
    CallGraph, CallEdge, FunctionEntity, FunctionKind, Centrality,
    CallResolver, Resolution, ResolutionStats,
    Ranker, betweenness_centrality, min_max_normalize,
    FocusPredicate,
};

// Export the main engine
pub use engine::Engine;

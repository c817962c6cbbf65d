// src/core/analysis.rs
//! Whole-project analysis pipeline.
//!
//! Per-file extraction runs in parallel; everything after the barrier
//! (merge, resolution, assembly, ranking, focus) works on an immutable merged
//! snapshot. Counters travel in an explicit [`Diagnostics`] record that is
//! produced even when nothing was found.

use serde::{Deserialize, Serialize};
use tracing::{info, debug, warn};

use crate::config::RankingConfig;
use crate::error::{CallheatError, Result};
use super::call_graph::{CallGraph, CallResolver, FocusPredicate, Ranker};
use super::parser::{extract_sources, CollectedSources, ParseFailure, SourceFile};

/// Run-level counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub files_scanned: usize,
    pub files_failed: usize,
    /// Entities in the whole-project graph, before focus filtering
    pub entities: usize,
    /// Edges in the whole-project graph, before focus filtering
    pub edges: usize,
    pub calls_seen: usize,
    pub calls_resolved: usize,
    pub calls_unresolved: usize,
    pub calls_ambiguous: usize,
    /// Documented entities over all entities, 0 when there are none
    pub docstring_coverage: f64,
}

/// The graph handed to renderers: either data or an explicit "no data"
#[derive(Debug, Clone)]
pub enum GraphState {
    /// Ranked graph, already narrowed by the focus predicate if one was given
    Ready(CallGraph),
    /// No function definitions were extracted
    Empty,
}

impl GraphState {
    pub fn graph(&self) -> Option<&CallGraph> {
        match self {
            GraphState::Ready(graph) => Some(graph),
            GraphState::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.graph().map_or(true, CallGraph::is_empty)
    }
}

/// Result of one analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub graph: GraphState,
    pub diagnostics: Diagnostics,
    pub failures: Vec<ParseFailure>,
    pub focus: Option<FocusPredicate>,
}

impl Analysis {
    /// Fingerprint of the rendered graph; empty when there is no graph
    pub fn fingerprint(&self) -> String {
        self.graph.graph().map(CallGraph::fingerprint).unwrap_or_default()
    }
}

pub struct Analyzer {
    ranker: Ranker,
}

impl Analyzer {
    pub fn new(ranking: &RankingConfig) -> Self {
        Self {
            ranker: Ranker::new(ranking.clone()),
        }
    }

    /// Analyze in-memory sources
    pub fn analyze(&self, sources: &[SourceFile], focus: Option<&str>) -> Result<Analysis> {
        self.run(sources, Vec::new(), focus)
    }

    /// Analyze collected sources; unreadable files count as scanned and failed
    pub fn analyze_collected(&self, collected: CollectedSources, focus: Option<&str>) -> Result<Analysis> {
        self.run(&collected.files, collected.failures, focus)
    }

    fn run(
        &self,
        sources: &[SourceFile],
        prior_failures: Vec<ParseFailure>,
        focus: Option<&str>,
    ) -> Result<Analysis> {
        // Reject a bad predicate before doing any work
        let focus = focus.map(FocusPredicate::parse).transpose()?;

        let files_scanned = sources.len() + prior_failures.len();
        let mut failures = prior_failures;
        let mut entities = Vec::new();
        let mut calls = Vec::new();

        info!("📖 Extracting functions from {} files...", sources.len());
        for outcome in extract_sources(sources) {
            match outcome {
                Ok(extraction) => {
                    debug!(
                        "{}: {} functions, {} call sites",
                        extraction.source_file,
                        extraction.entities.len(),
                        extraction.calls.len()
                    );
                    entities.extend(extraction.entities);
                    calls.extend(extraction.calls);
                }
                Err(failure) => {
                    warn!("Skipping {}: {}", failure.path, failure.message);
                    failures.push(failure);
                }
            }
        }
        entities.sort_by(|a, b| a.id.cmp(&b.id));

        info!("🔗 Resolving {} call sites...", calls.len());
        let (edges, stats) = CallResolver::new(&entities).resolve_all(&calls);

        let mut diagnostics = Diagnostics {
            files_scanned,
            files_failed: failures.len(),
            calls_seen: stats.calls_seen,
            calls_resolved: stats.calls_resolved,
            calls_unresolved: stats.calls_unresolved,
            calls_ambiguous: stats.calls_ambiguous,
            ..Diagnostics::default()
        };

        let graph = match CallGraph::assemble(entities, edges) {
            Ok(mut graph) => {
                self.ranker.rank(&mut graph);
                diagnostics.entities = graph.len();
                diagnostics.edges = graph.edges().len();
                diagnostics.docstring_coverage = graph.docstring_coverage();
                info!(
                    "🕸️ Built call graph: {} functions, {} calls ({} unresolved)",
                    diagnostics.entities, diagnostics.edges, diagnostics.calls_unresolved
                );

                match &focus {
                    Some(predicate) => {
                        let view = graph.focus(predicate);
                        info!("🎯 Focus {:?} kept {} of {} functions", predicate.as_str(), view.len(), graph.len());
                        GraphState::Ready(view)
                    }
                    None => GraphState::Ready(graph),
                }
            }
            Err(CallheatError::EmptyGraph) => {
                warn!(
                    "No functions found ({} files scanned, {} failed)",
                    diagnostics.files_scanned, diagnostics.files_failed
                );
                GraphState::Empty
            }
            Err(e) => return Err(e),
        };

        Ok(Analysis {
            graph,
            diagnostics,
            failures,
            focus,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

/// One-shot analysis of in-memory sources with the given ranking weights
pub fn analyze_sources(sources: &[SourceFile], focus: Option<&str>, ranking: &RankingConfig) -> Result<Analysis> {
    Analyzer::new(ranking).analyze(sources, focus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(analysis: &Analysis) -> &CallGraph {
        analysis.graph.graph().expect("graph should have data")
    }

    fn entity_id<'a>(graph: &'a CallGraph, path: &str) -> &'a str {
        graph
            .entities()
            .iter()
            .find(|e| e.qualified_path == path)
            .map(|e| e.id.as_str())
            .unwrap_or_else(|| panic!("missing {path}"))
    }

    #[test]
    fn test_mutual_recursion() {
        let sources = vec![SourceFile::new(
            "loop.py",
            "def a():\n    b()\n\ndef b():\n    a()\n",
        )];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();
        let graph = ready(&analysis);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 2);
        for entity in graph.entities() {
            let centrality = graph.centrality(&entity.id).unwrap();
            assert_eq!(centrality.in_degree, 1);
            assert_eq!(centrality.betweenness, 0.0);
        }
    }

    #[test]
    fn test_linear_chain_betweenness() {
        let sources = vec![SourceFile::new(
            "chain.py",
            "def a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    d()\n\ndef d():\n    return 1\n",
        )];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();
        let graph = ready(&analysis);

        let between = |path: &str| graph.centrality(entity_id(graph, path)).unwrap().betweenness;
        assert_eq!(between("chain.a"), 0.0);
        assert_eq!(between("chain.d"), 0.0);
        assert!(between("chain.b") > 0.0);
        assert!(between("chain.c") > 0.0);

        // B and C carry the chain, so they run hotter than its ends
        let heat = |path: &str| graph.entity(entity_id(graph, path)).unwrap().heat().unwrap();
        assert!(heat("chain.b") > heat("chain.a"));
        assert!(heat("chain.c") > heat("chain.a"));
    }

    #[test]
    fn test_broken_file_is_skipped_and_counted() {
        let sources = vec![
            SourceFile::new("one.py", "def one():\n    two()\n"),
            SourceFile::new("two.py", "def two():\n    return 2\n"),
            SourceFile::new("broken.py", "def broken(:\n    pass\n"),
        ];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();

        assert_eq!(analysis.diagnostics.files_scanned, 3);
        assert_eq!(analysis.diagnostics.files_failed, 1);
        assert_eq!(analysis.failures[0].path, "broken.py");

        let graph = ready(&analysis);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert!(graph.entities().iter().all(|e| e.source_file != "broken.py"));
    }

    #[test]
    fn test_external_call_is_counted_as_unresolved() {
        let sources = vec![SourceFile::new(
            "io_helpers.py",
            "import os\n\ndef cwd():\n    return os.getcwd()\n",
        )];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();

        assert!(ready(&analysis).edges().is_empty());
        assert_eq!(analysis.diagnostics.calls_seen, 1);
        assert_eq!(analysis.diagnostics.calls_resolved, 0);
        assert_eq!(analysis.diagnostics.calls_unresolved, 1);
    }

    #[test]
    fn test_single_entity_has_zero_heat() {
        let sources = vec![SourceFile::new("solo.py", "def solo():\n    solo()\n")];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();
        let graph = ready(&analysis);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.entities()[0].heat(), Some(0.0));
    }

    #[test]
    fn test_no_functions_is_an_empty_state_with_diagnostics() {
        let sources = vec![
            SourceFile::new("constants.py", "ANSWER = 42\nprint(ANSWER)\n"),
            SourceFile::new("broken.py", "class (:\n"),
        ];
        let analysis = Analyzer::default().analyze(&sources, None).unwrap();

        assert!(matches!(analysis.graph, GraphState::Empty));
        assert!(analysis.graph.is_empty());
        assert_eq!(analysis.diagnostics.files_scanned, 2);
        assert_eq!(analysis.diagnostics.files_failed, 1);
        assert_eq!(analysis.diagnostics.docstring_coverage, 0.0);
        assert_eq!(analysis.fingerprint(), "");
    }

    #[test]
    fn test_invalid_focus_is_rejected_before_analysis() {
        let sources = vec![SourceFile::new("a.py", "def a():\n    pass\n")];
        let result = Analyzer::default().analyze(&sources, Some("a,,b"));
        assert!(matches!(result, Err(CallheatError::InvalidFocus(_))));
    }

    #[test]
    fn test_focus_keeps_whole_project_heat() {
        let sources = vec![SourceFile::new(
            "chain.py",
            "def a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    pass\n",
        )];
        let full = Analyzer::default().analyze(&sources, None).unwrap();
        let focused = Analyzer::default().analyze(&sources, Some("B")).unwrap();

        let focused_graph = ready(&focused);
        assert_eq!(focused_graph.len(), 1);
        let kept = &focused_graph.entities()[0];
        assert_eq!(kept.heat(), ready(&full).entity(&kept.id).unwrap().heat());
        assert_eq!(focused.diagnostics, full.diagnostics);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let sources = vec![
            SourceFile::new("pkg/a.py", "def a():\n    \"\"\"Entry.\"\"\"\n    helper()\n    helper()\n"),
            SourceFile::new("pkg/b.py", "def helper():\n    if True:\n        return 1\n"),
        ];
        let first = analyze_sources(&sources, None, &RankingConfig::default()).unwrap();
        let second = analyze_sources(&sources, None, &RankingConfig::default()).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(ready(&first).edges(), ready(&second).edges());
        assert_eq!(ready(&first).edges().len(), 2);
        assert_eq!(first.diagnostics.docstring_coverage, 0.5);
    }
}

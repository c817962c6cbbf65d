use std::path::PathBuf;

use assert_fs::prelude::*;
use callheat::config::{ParsingConfig, RankingConfig};
use callheat::core::{Analyzer, GraphState, SourceCollector};
use callheat::CallheatError;

fn spaceship() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/spaceship")
}

fn collector() -> SourceCollector {
    SourceCollector::new(&ParsingConfig::default(), &[]).unwrap()
}

#[tokio::test]
async fn spaceship_counts_functions_and_calls() {
    let collected = collector().collect(spaceship()).await.unwrap();
    let analysis = Analyzer::default().analyze_collected(collected, None).unwrap();
    let d = &analysis.diagnostics;

    assert_eq!(d.files_scanned, 2);
    assert_eq!(d.files_failed, 0);
    assert_eq!(d.entities, 10);
    assert_eq!(d.edges, 8);
    // min() and hypot() are external
    assert_eq!(d.calls_seen, 10);
    assert_eq!(d.calls_unresolved, 2);
    assert_eq!(d.calls_ambiguous, 0);

    let graph = analysis.graph.graph().unwrap();
    let ignite = graph
        .entities()
        .iter()
        .find(|e| e.qualified_path == "engine.ignite")
        .unwrap();
    assert_eq!(ignite.doc_excerpt, "Raise thrust if both tanks are healthy.");
    assert_eq!(ignite.start_line, 4);
    assert_eq!(ignite.id, "engine.ignite@engine.py:4");

    let bleed_valve = graph
        .entities()
        .iter()
        .find(|e| e.name == "bleed_valve")
        .unwrap();
    assert_eq!(bleed_valve.complexity, 0);

    for entity in graph.entities() {
        let heat = entity.heat().unwrap();
        assert!((0.0..=1.0).contains(&heat));
    }
}

#[tokio::test]
async fn spaceship_focus_keeps_only_ignite() {
    let collected = collector().collect(spaceship()).await.unwrap();
    let full = Analyzer::default().analyze_collected(collected.clone(), None).unwrap();
    let focused = Analyzer::default().analyze_collected(collected, Some("ignite")).unwrap();

    let graph = focused.graph.graph().unwrap();
    assert_eq!(graph.len(), 1);
    assert!(graph.entities().iter().all(|e| e.id.contains("ignite")));
    assert!(graph.edges().is_empty());

    let kept = &graph.entities()[0];
    let original = full.graph.graph().unwrap().entity(&kept.id).unwrap();
    assert_eq!(kept.heat(), original.heat());
}

#[tokio::test]
async fn collector_skips_virtualenvs_caches_and_gitignored_paths() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("app/main.py").write_str("def main():\n    helper()\n").unwrap();
    temp.child("app/util.py").write_str("def helper():\n    pass\n").unwrap();
    temp.child("venv/lib/site.py").write_str("def vendored():\n    pass\n").unwrap();
    temp.child("app/__pycache__/main.py").write_str("def stale():\n    pass\n").unwrap();
    temp.child("generated/out.py").write_str("def generated():\n    pass\n").unwrap();
    temp.child(".gitignore").write_str("generated/\n").unwrap();
    temp.child("README.md").write_str("# not python\n").unwrap();

    let collected = collector().collect(temp.path()).await.unwrap();
    let paths: Vec<&str> = collected.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["app/main.py", "app/util.py"]);
    assert_eq!(collected.scanned(), 2);

    let analysis = Analyzer::default().analyze_collected(collected, None).unwrap();
    let graph = analysis.graph.graph().unwrap();
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].source_file, "app/main.py");
}

#[tokio::test]
async fn collector_honours_configured_ignore_patterns() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src/core.py").write_str("def core():\n    pass\n").unwrap();
    temp.child("build/lib/core.py").write_str("def core():\n    pass\n").unwrap();

    let collector = SourceCollector::new(&ParsingConfig::default(), &["build/".to_string()]).unwrap();
    let collected = collector.collect(temp.path()).await.unwrap();
    assert_eq!(collected.files.len(), 1);
    assert_eq!(collected.files[0].path, "src/core.py");
}

#[tokio::test]
async fn unreadable_and_oversized_files_count_as_failed() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("good.py").write_str("def good():\n    pass\n").unwrap();
    temp.child("latin1.py").write_binary(b"def caf\xe9():\n    pass\n").unwrap();
    temp.child("huge.py").write_str(&"x = 1\n".repeat(64)).unwrap();

    let config = ParsingConfig {
        max_file_size: 100,
        ..ParsingConfig::default()
    };
    let collected = SourceCollector::new(&config, &[]).unwrap().collect(temp.path()).await.unwrap();
    assert_eq!(collected.files.len(), 1);
    assert_eq!(collected.failures.len(), 2);

    let analysis = Analyzer::default().analyze_collected(collected, None).unwrap();
    assert_eq!(analysis.diagnostics.files_scanned, 3);
    assert_eq!(analysis.diagnostics.files_failed, 2);
    assert_eq!(analysis.diagnostics.entities, 1);
}

#[tokio::test]
async fn directory_without_python_is_an_empty_state() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("notes.txt").write_str("nothing to see").unwrap();

    let collected = collector().collect(temp.path()).await.unwrap();
    let analysis = Analyzer::default().analyze_collected(collected, None).unwrap();

    assert!(matches!(analysis.graph, GraphState::Empty));
    assert_eq!(analysis.diagnostics.files_scanned, 0);
    assert_eq!(analysis.diagnostics.entities, 0);
}

#[test]
fn ranking_weights_shift_heat() {
    use callheat::core::SourceFile;

    // hub is called three times but sits on no path; relay sits on every path
    let sources = vec![SourceFile::new(
        "weights.py",
        "def a():\n    relay()\n    hub()\n\ndef b():\n    hub()\n\ndef c():\n    hub()\n\ndef relay():\n    sink()\n\ndef hub():\n    pass\n\ndef sink():\n    pass\n",
    )];

    let heat_of = |ranking: RankingConfig, name: &str| {
        let analysis = Analyzer::new(&ranking).analyze(&sources, None).unwrap();
        let graph = analysis.graph.graph().unwrap();
        graph
            .entities()
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.heat())
            .unwrap()
    };

    let degree_only = RankingConfig {
        betweenness_weight: 0.0,
        in_degree_weight: 1.0,
    };
    let betweenness_only = RankingConfig {
        betweenness_weight: 1.0,
        in_degree_weight: 0.0,
    };

    assert_eq!(heat_of(degree_only.clone(), "hub"), 1.0);
    assert_eq!(heat_of(betweenness_only.clone(), "hub"), 0.0);
    assert_eq!(heat_of(betweenness_only, "relay"), 1.0);
    assert!(heat_of(degree_only, "relay") < 1.0);
}

#[test]
fn malformed_focus_is_rejected() {
    let result = Analyzer::default().analyze(&[], Some("  "));
    assert!(matches!(result, Err(CallheatError::InvalidFocus(_))));
}

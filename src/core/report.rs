// src/core/report.rs - Read-only renderers over an analysis snapshot
use std::collections::BTreeMap;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::OutputConfig;
use crate::error::Result;
use super::analysis::{Analysis, Diagnostics};
use super::call_graph::{CallEdge, CallGraph, FunctionEntity, FunctionKind};

const MARKDOWN_TEMPLATE_NAME: &str = "report.md";

const MARKDOWN_TEMPLATE: &str = r#"# Callheat Report{% if project %}: {{ project }}{% endif %}

_Generated {{ generated_at }}{% if focus %} · focus `{{ focus }}`{% endif %}_

## Diagnostics

| Metric | Value |
| --- | --- |
| Files scanned | {{ diagnostics.files_scanned }} |
| Files failed | {{ diagnostics.files_failed }} |
| Functions detected | {{ diagnostics.entities }} |
| Calls tracked | {{ diagnostics.edges }} |
| Calls seen | {{ diagnostics.calls_seen }} |
| Calls resolved | {{ diagnostics.calls_resolved }} |
| Calls unresolved | {{ diagnostics.calls_unresolved }} ({{ diagnostics.calls_ambiguous }} ambiguous) |
| Docstring coverage | {{ coverage }} |
{% if failures %}
### Skipped files

{% for failure in failures -%}
- `{{ failure.path }}`{% if failure.line %} (line {{ failure.line }}){% endif %}: {{ failure.message }}
{% endfor -%}
{% endif %}
{% if empty -%}
## No data

No function definitions matched. The diagnostics above show what was scanned.
{% else -%}
## Knowledge Hotspots

| Function | Heat | Betweenness | Location |
| --- | --- | --- | --- |
{% for row in hotspots -%}
| `{{ row.qualified_path }}` | {{ row.heat }} | {{ row.betweenness }} | {{ row.location }} |
{% endfor %}
## Fan-in Champs (most callers)

| Function | Incoming calls |
| --- | --- |
{% for row in fan_in -%}
| `{{ row.qualified_path }}` | {{ row.count }} |
{% endfor %}
## Fan-out Champs (most callees)

| Function | Outgoing calls |
| --- | --- |
{% for row in fan_out -%}
| `{{ row.qualified_path }}` | {{ row.count }} |
{% endfor %}
## Busiest Modules

| Module | Functions |
| --- | --- |
{% for row in modules -%}
| `{{ row.module }}` | {{ row.count }} |
{% endfor -%}
{% endif -%}
"#;

/// One entity as exported to JSON
#[derive(Debug, Clone, Serialize)]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    pub qualified_path: String,
    pub kind: FunctionKind,
    pub doc: String,
    pub complexity: u32,
    pub heat: f64,
    pub betweenness: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub source_file: String,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub version: String,
    pub focus: Option<String>,
    pub functions: usize,
    pub calls: usize,
    pub hottest: Option<String>,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub summary: ExportSummary,
    pub diagnostics: Diagnostics,
    pub fingerprint: String,
    pub entities: Vec<EntityRecord>,
    pub edges: Vec<CallEdge>,
}

#[derive(Debug, Serialize)]
struct HotspotRow {
    qualified_path: String,
    heat: String,
    betweenness: String,
    location: String,
}

#[derive(Debug, Serialize)]
struct CountRow {
    qualified_path: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct ModuleRow {
    module: String,
    count: usize,
}

pub struct ReportGenerator {
    tera: Tera,
    hotspot_count: usize,
    project: String,
}

impl ReportGenerator {
    pub fn new(output: &OutputConfig, project: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(MARKDOWN_TEMPLATE_NAME, MARKDOWN_TEMPLATE)?;

        Ok(Self {
            tera,
            hotspot_count: output.hotspot_count.max(1),
            project: project.to_string(),
        })
    }

    /// Build the serializable export; an empty graph exports empty arrays
    pub fn export(&self, analysis: &Analysis) -> GraphExport {
        let (entities, edges, hottest) = match analysis.graph.graph() {
            Some(graph) => (
                graph.entities().iter().map(|e| entity_record(graph, e)).collect(),
                graph.edges().to_vec(),
                graph.hottest().first().map(|e| e.id.clone()),
            ),
            None => (Vec::new(), Vec::new(), None),
        };

        GraphExport {
            summary: ExportSummary {
                version: env!("CARGO_PKG_VERSION").to_string(),
                focus: analysis.focus.as_ref().map(|f| f.as_str().to_string()),
                functions: entities.len(),
                calls: edges.len(),
                hottest,
            },
            diagnostics: analysis.diagnostics.clone(),
            fingerprint: analysis.fingerprint(),
            entities,
            edges,
        }
    }

    pub fn to_json(&self, analysis: &Analysis) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export(analysis))?)
    }

    pub fn to_markdown(&self, analysis: &Analysis) -> Result<String> {
        let mut context = Context::new();
        context.insert("project", &self.project);
        context.insert("generated_at", &chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());
        context.insert("focus", &analysis.focus.as_ref().map(|f| f.as_str()));
        context.insert("diagnostics", &analysis.diagnostics);
        context.insert("coverage", &coverage_label(&analysis.diagnostics));
        context.insert("failures", &analysis.failures);

        match analysis.graph.graph().filter(|g| !g.is_empty()) {
            Some(graph) => {
                context.insert("empty", &false);
                context.insert("hotspots", &self.hotspot_rows(graph));
                context.insert("fan_in", &self.fan_rows(graph, |c| c.in_degree));
                context.insert("fan_out", &self.fan_rows(graph, |c| c.out_degree));
                context.insert("modules", &self.module_rows(graph));
            }
            None => {
                context.insert("empty", &true);
            }
        }

        Ok(self.tera.render(MARKDOWN_TEMPLATE_NAME, &context)?)
    }

    /// Plain-text digest for the terminal
    pub fn to_summary(&self, analysis: &Analysis) -> String {
        let d = &analysis.diagnostics;
        let mut out = String::new();

        out.push_str(&format!("Files scanned:      {}\n", d.files_scanned));
        out.push_str(&format!("Files failed:       {}\n", d.files_failed));
        out.push_str(&format!("Functions:          {}\n", d.entities));
        out.push_str(&format!("Calls tracked:      {}\n", d.edges));
        out.push_str(&format!(
            "Calls resolved:     {}/{} ({} unresolved, {} ambiguous)\n",
            d.calls_resolved, d.calls_seen, d.calls_unresolved, d.calls_ambiguous
        ));
        out.push_str(&format!("Docstring coverage: {}\n", coverage_label(d)));

        match analysis.graph.graph().filter(|g| !g.is_empty()) {
            Some(graph) => {
                out.push_str("\nHotspots:\n");
                for (rank, entity) in graph.hottest().into_iter().take(self.hotspot_count).enumerate() {
                    out.push_str(&format!(
                        "  {:>2}. {:<40} heat {:.3}  {}:{}\n",
                        rank + 1,
                        entity.qualified_path,
                        entity.heat().unwrap_or(0.0),
                        entity.source_file,
                        entity.start_line
                    ));
                }
            }
            None => out.push_str("\nNo data: no functions matched.\n"),
        }

        out
    }

    fn hotspot_rows(&self, graph: &CallGraph) -> Vec<HotspotRow> {
        graph
            .hottest()
            .into_iter()
            .take(self.hotspot_count)
            .map(|entity| HotspotRow {
                qualified_path: entity.qualified_path.clone(),
                heat: format!("{:.3}", entity.heat().unwrap_or(0.0)),
                betweenness: format!(
                    "{:.3}",
                    graph.centrality(&entity.id).map_or(0.0, |c| c.betweenness)
                ),
                location: format!("{}:{}", entity.source_file, entity.start_line),
            })
            .collect()
    }

    fn fan_rows(&self, graph: &CallGraph, measure: impl Fn(&super::call_graph::Centrality) -> usize) -> Vec<CountRow> {
        let mut rows: Vec<CountRow> = graph
            .entities()
            .iter()
            .map(|entity| CountRow {
                qualified_path: entity.qualified_path.clone(),
                count: graph.centrality(&entity.id).map_or(0, &measure),
            })
            .collect();
        // Stable sort keeps id order among ties
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows.truncate(self.hotspot_count);
        rows
    }

    fn module_rows(&self, graph: &CallGraph) -> Vec<ModuleRow> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entity in graph.entities() {
            *counts.entry(module_bucket(&entity.qualified_path)).or_default() += 1;
        }

        let mut rows: Vec<ModuleRow> = counts
            .into_iter()
            .map(|(module, count)| ModuleRow { module, count })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows.truncate(self.hotspot_count);
        rows
    }
}

fn entity_record(graph: &CallGraph, entity: &FunctionEntity) -> EntityRecord {
    let centrality = graph.centrality(&entity.id).copied().unwrap_or_default();
    EntityRecord {
        id: entity.id.clone(),
        name: entity.name.clone(),
        qualified_path: entity.qualified_path.clone(),
        kind: entity.kind,
        doc: entity.doc_excerpt.clone(),
        complexity: entity.complexity,
        heat: entity.heat().unwrap_or(0.0),
        betweenness: centrality.betweenness,
        in_degree: centrality.in_degree,
        out_degree: centrality.out_degree,
        source_file: entity.source_file.clone(),
        start_line: entity.start_line,
        end_line: entity.end_line,
    }
}

/// First two dotted segments of a qualified path, or the first when that is all there is
fn module_bucket(qualified_path: &str) -> String {
    let parts: Vec<&str> = qualified_path.split('.').collect();
    if parts.len() <= 2 {
        parts[0].to_string()
    } else {
        parts[..2].join(".")
    }
}

fn coverage_label(diagnostics: &Diagnostics) -> String {
    let documented = (diagnostics.docstring_coverage * diagnostics.entities as f64).round() as usize;
    format!(
        "{}/{} ({:.1}%)",
        documented,
        diagnostics.entities,
        diagnostics.docstring_coverage * 100.0
    )
}

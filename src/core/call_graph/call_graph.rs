// src/core/call_graph/call_graph.rs - Call graph snapshot model
use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};
use tracing::warn;

use crate::error::{CallheatError, Result};

/// Syntactic flavour of a function definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionKind {
    Function,
    Method,
    AsyncFunction,
    AsyncMethod,
    StaticMethod,
    ClassMethod,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
            FunctionKind::AsyncFunction => "asyncFunction",
            FunctionKind::AsyncMethod => "asyncMethod",
            FunctionKind::StaticMethod => "staticMethod",
            FunctionKind::ClassMethod => "classMethod",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One function or method definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntity {
    /// `<qualified_path>@<source_file>:<start_line>`
    pub id: String,
    pub name: String,
    /// Dotted module/class/function path
    pub qualified_path: String,
    pub kind: FunctionKind,
    /// First line of the docstring, or empty
    pub doc_excerpt: String,
    /// Flat count of meaningful statements in the body
    pub complexity: u32,
    pub source_file: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Set once by the ranker after the whole project is assembled
    heat: Option<f64>,
}

impl FunctionEntity {
    pub fn new(
        name: String,
        qualified_path: String,
        kind: FunctionKind,
        doc_excerpt: String,
        complexity: u32,
        source_file: String,
        line_range: (usize, usize),
    ) -> Self {
        Self {
            id: Self::make_id(&qualified_path, &source_file, line_range.0),
            name,
            qualified_path,
            kind,
            doc_excerpt,
            complexity,
            source_file,
            start_line: line_range.0,
            end_line: line_range.1,
            heat: None,
        }
    }

    /// Stable identifier: same path, file and line always give the same id
    pub fn make_id(qualified_path: &str, source_file: &str, start_line: usize) -> String {
        format!("{}@{}:{}", qualified_path, source_file, start_line)
    }

    /// Heat in [0, 1], or `None` before ranking
    pub fn heat(&self) -> Option<f64> {
        self.heat
    }

    pub fn has_doc(&self) -> bool {
        !self.doc_excerpt.is_empty()
    }

    pub(crate) fn set_heat(&mut self, heat: f64) {
        debug_assert!(self.heat.is_none(), "heat is assigned exactly once");
        self.heat = Some(heat);
    }
}

/// One resolved call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller_id: String,
    pub callee_id: String,
    /// File where the call textually occurs
    pub source_file: String,
    pub line: usize,
}

/// Structural measures computed by the ranker
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Centrality {
    /// Incoming call sites, counting every edge of the multigraph
    pub in_degree: usize,
    /// Outgoing call sites, counting every edge of the multigraph
    pub out_degree: usize,
    /// Unnormalized betweenness over the collapsed digraph
    pub betweenness: f64,
}

/// Immutable call graph snapshot.
///
/// Entities live in an arena sorted by id; edges and the derived
/// in/out indices refer to entities by arena position. Indices are always
/// rebuilt from the edge list, never patched incrementally.
#[derive(Debug, Clone)]
pub struct CallGraph {
    entities: Vec<FunctionEntity>,
    edges: Vec<CallEdge>,
    index: HashMap<String, usize>,
    /// Edge positions leaving each entity
    out_edges: Vec<Vec<usize>>,
    /// Edge positions entering each entity
    in_edges: Vec<Vec<usize>>,
    /// Empty until ranked, then one record per entity
    centrality: Vec<Centrality>,
}

impl CallGraph {
    /// Build the snapshot from extracted entities and resolved edges.
    ///
    /// Fails with [`CallheatError::EmptyGraph`] when there are no entities.
    /// Edges pointing at unknown entities are dropped.
    pub fn assemble(entities: Vec<FunctionEntity>, edges: Vec<CallEdge>) -> Result<Self> {
        if entities.is_empty() {
            return Err(CallheatError::EmptyGraph);
        }

        let mut entities = entities;
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        let before = entities.len();
        entities.dedup_by(|later, earlier| later.id == earlier.id);
        if entities.len() != before {
            warn!("Dropped {} entities with duplicate ids", before - entities.len());
        }

        let mut graph = Self::from_parts(entities, Vec::new(), Vec::new());

        let total = edges.len();
        let mut edges: Vec<CallEdge> = edges
            .into_iter()
            .filter(|edge| graph.index.contains_key(&edge.caller_id) && graph.index.contains_key(&edge.callee_id))
            .collect();
        if edges.len() != total {
            warn!("Dropped {} edges with dangling endpoints", total - edges.len());
        }
        edges.sort();

        graph.edges = edges;
        graph.rebuild_indices();
        Ok(graph)
    }

    /// Assemble a graph from parts that are already sorted and consistent
    pub(crate) fn from_parts(
        entities: Vec<FunctionEntity>,
        edges: Vec<CallEdge>,
        centrality: Vec<Centrality>,
    ) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, entity)| (entity.id.clone(), i))
            .collect();

        let mut graph = Self {
            entities,
            edges,
            index,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            centrality,
        };
        graph.rebuild_indices();
        graph
    }

    fn rebuild_indices(&mut self) {
        let n = self.entities.len();
        self.out_edges = vec![Vec::new(); n];
        self.in_edges = vec![Vec::new(); n];

        for (position, edge) in self.edges.iter().enumerate() {
            // Endpoints were validated on the way in
            if let (Some(&caller), Some(&callee)) =
                (self.index.get(&edge.caller_id), self.index.get(&edge.callee_id))
            {
                self.out_edges[caller].push(position);
                self.in_edges[callee].push(position);
            }
        }
    }

    pub fn entities(&self) -> &[FunctionEntity] {
        &self.entities
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: &str) -> Option<&FunctionEntity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Call sites made by the entity at `index`
    pub fn outgoing(&self, index: usize) -> impl Iterator<Item = &CallEdge> {
        self.out_edges[index].iter().map(move |&e| &self.edges[e])
    }

    /// Call sites targeting the entity at `index`
    pub fn incoming(&self, index: usize) -> impl Iterator<Item = &CallEdge> {
        self.in_edges[index].iter().map(move |&e| &self.edges[e])
    }

    pub fn in_degree(&self, index: usize) -> usize {
        self.in_edges[index].len()
    }

    pub fn out_degree(&self, index: usize) -> usize {
        self.out_edges[index].len()
    }

    /// Successor lists with parallel edges merged and self-loops removed.
    ///
    /// Lists are sorted, so traversals over them are deterministic.
    pub fn collapsed_adjacency(&self) -> Vec<Vec<usize>> {
        (0..self.entities.len())
            .map(|caller| {
                let mut successors: Vec<usize> = self
                    .outgoing(caller)
                    .filter_map(|edge| self.index_of(&edge.callee_id))
                    .filter(|&callee| callee != caller)
                    .collect();
                successors.sort_unstable();
                successors.dedup();
                successors
            })
            .collect()
    }

    pub fn is_ranked(&self) -> bool {
        !self.entities.is_empty() && self.centrality.len() == self.entities.len()
    }

    pub fn centrality(&self, id: &str) -> Option<&Centrality> {
        self.index.get(id).and_then(|&i| self.centrality.get(i))
    }

    pub(crate) fn centrality_records(&self) -> &[Centrality] {
        &self.centrality
    }

    /// Store ranking output; one centrality record and one heat per entity
    pub(crate) fn apply_ranking(&mut self, centrality: Vec<Centrality>, heat: Vec<f64>) {
        debug_assert_eq!(centrality.len(), self.entities.len());
        debug_assert_eq!(heat.len(), self.entities.len());

        for (entity, value) in self.entities.iter_mut().zip(heat) {
            entity.set_heat(value);
        }
        self.centrality = centrality;
    }

    /// Entities with a non-empty doc excerpt over all entities; 0 for an empty graph
    pub fn docstring_coverage(&self) -> f64 {
        if self.entities.is_empty() {
            return 0.0;
        }
        let documented = self.entities.iter().filter(|e| e.has_doc()).count();
        documented as f64 / self.entities.len() as f64
    }

    /// SHA-256 over ids, heat and edges; identical input gives an identical digest
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entity in &self.entities {
            hasher.update(entity.id.as_bytes());
            hasher.update(b"\0");
            let heat = entity.heat.map(|h| format!("{:.12}", h)).unwrap_or_default();
            hasher.update(heat.as_bytes());
            hasher.update(b"\n");
        }
        for edge in &self.edges {
            hasher.update(
                format!("{}->{}@{}:{}\n", edge.caller_id, edge.callee_id, edge.source_file, edge.line)
                    .as_bytes(),
            );
        }
        format!("{:x}", hasher.finalize())
    }

    /// Entities ordered by descending heat, ties by id
    pub fn hottest(&self) -> Vec<&FunctionEntity> {
        let mut ranked: Vec<&FunctionEntity> = self.entities.iter().collect();
        ranked.sort_by(|a, b| {
            let ha = a.heat.unwrap_or(0.0);
            let hb = b.heat.unwrap_or(0.0);
            hb.total_cmp(&ha).then_with(|| a.id.cmp(&b.id))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, line: usize) -> FunctionEntity {
        FunctionEntity::new(
            name.to_string(),
            format!("app.{}", name),
            FunctionKind::Function,
            String::new(),
            1,
            "app.py".to_string(),
            (line, line + 1),
        )
    }

    fn edge(caller: &FunctionEntity, callee: &FunctionEntity, line: usize) -> CallEdge {
        CallEdge {
            caller_id: caller.id.clone(),
            callee_id: callee.id.clone(),
            source_file: "app.py".to_string(),
            line,
        }
    }

    #[test]
    fn test_assemble_rejects_empty_input() {
        assert!(matches!(
            CallGraph::assemble(vec![], vec![]),
            Err(CallheatError::EmptyGraph)
        ));
    }

    #[test]
    fn test_ids_are_stable() {
        assert_eq!(entity("ignite", 4).id, "app.ignite@app.py:4");
        assert_eq!(entity("ignite", 4).id, entity("ignite", 4).id);
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let a = entity("a", 1);
        let b = entity("b", 5);
        let edges = vec![edge(&a, &b, 2), edge(&a, &b, 3)];
        let graph = CallGraph::assemble(vec![a.clone(), b.clone()], edges).unwrap();

        assert_eq!(graph.edges().len(), 2);
        let b_index = graph.index_of(&b.id).unwrap();
        assert_eq!(graph.in_degree(b_index), 2);
        assert_eq!(graph.collapsed_adjacency()[graph.index_of(&a.id).unwrap()], vec![b_index]);

        let lines: Vec<usize> = graph.incoming(b_index).map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(graph.outgoing(b_index).count(), 0);
    }

    #[test]
    fn test_dangling_edges_are_dropped() {
        let a = entity("a", 1);
        let ghost = entity("ghost", 9);
        let graph = CallGraph::assemble(vec![a.clone()], vec![edge(&a, &ghost, 2)]).unwrap();

        assert!(graph.edges().is_empty());
        for edge in graph.edges() {
            assert!(graph.entity(&edge.caller_id).is_some());
            assert!(graph.entity(&edge.callee_id).is_some());
        }
    }

    #[test]
    fn test_self_loops_are_not_adjacency() {
        let a = entity("a", 1);
        let graph = CallGraph::assemble(vec![a.clone()], vec![edge(&a, &a, 2)]).unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert!(graph.collapsed_adjacency()[0].is_empty());
    }

    #[test]
    fn test_unranked_graph_has_no_heat() {
        let graph = CallGraph::assemble(vec![entity("a", 1)], vec![]).unwrap();
        assert!(!graph.is_ranked());
        assert!(graph.entities().iter().all(|e| e.heat().is_none()));
    }
}

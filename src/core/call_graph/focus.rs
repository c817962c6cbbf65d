//! Focus filtering over a ranked call graph.
//!
//! A predicate is one or more comma-separated terms ("ignite,nav.py"),
//! matched case-insensitively as substrings of an entity's name, qualified
//! path, doc excerpt or source file. Filtering keeps heat untouched: it runs
//! after ranking and only selects a subset of the snapshot.

use std::collections::HashSet;

use crate::error::{CallheatError, Result};
use super::{CallGraph, Centrality, FunctionEntity};

const MAX_PREDICATE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusPredicate {
    raw: String,
    terms: Vec<String>,
}

impl FocusPredicate {
    /// Validate and split a user-supplied predicate
    pub fn parse(input: &str) -> Result<Self> {
        if input.chars().count() > MAX_PREDICATE_LEN {
            return Err(CallheatError::InvalidFocus(format!(
                "predicate is longer than {} characters",
                MAX_PREDICATE_LEN
            )));
        }
        if input.trim().is_empty() {
            return Err(CallheatError::InvalidFocus("predicate is empty".to_string()));
        }

        let mut terms = Vec::new();
        for term in input.split(',') {
            let term = term.trim();
            if term.is_empty() {
                return Err(CallheatError::InvalidFocus(format!(
                    "empty term in {:?}",
                    input
                )));
            }
            if term.chars().any(char::is_control) {
                return Err(CallheatError::InvalidFocus(format!(
                    "term {:?} contains control characters",
                    term
                )));
            }
            terms.push(term.to_lowercase());
        }

        Ok(Self {
            raw: input.trim().to_string(),
            terms,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matches(&self, entity: &FunctionEntity) -> bool {
        let haystacks = [
            entity.name.to_lowercase(),
            entity.qualified_path.to_lowercase(),
            entity.doc_excerpt.to_lowercase(),
            entity.source_file.to_lowercase(),
        ];
        self.terms
            .iter()
            .any(|term| haystacks.iter().any(|h| h.contains(term.as_str())))
    }
}

impl CallGraph {
    /// Subgraph of matching entities and the edges between them.
    ///
    /// Heat and centrality are carried over unchanged from this snapshot.
    pub fn focus(&self, predicate: &FocusPredicate) -> CallGraph {
        let records = self.centrality_records();
        let mut entities = Vec::new();
        let mut centrality: Vec<Centrality> = Vec::new();

        for (i, entity) in self.entities().iter().enumerate() {
            if predicate.matches(entity) {
                entities.push(entity.clone());
                if let Some(record) = records.get(i) {
                    centrality.push(*record);
                }
            }
        }

        let kept: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        let edges = self
            .edges()
            .iter()
            .filter(|e| kept.contains(e.caller_id.as_str()) && kept.contains(e.callee_id.as_str()))
            .cloned()
            .collect();

        // Entities stay sorted by id, so the subset is already in arena order
        CallGraph::from_parts(entities, edges, centrality)
    }
}

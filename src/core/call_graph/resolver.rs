//! Call resolution: matches call sites to extracted definitions by name.
//!
//! There is no type inference, so resolution is best-effort and tuned for
//! precision over recall:
//! 1. Look for `<scope>.<name>` through the enclosing scopes, innermost
//!    first. Bare names search function scopes and the module (class bodies
//!    are not part of Python's name lookup); `self.`/`cls.` receivers search
//!    class scopes only; any other receiver skips this step.
//! 2. Otherwise accept a project-wide entity with that simple name, but only
//!    when exactly one exists.
//! 3. Everything else is dropped. Ambiguous calls are never guessed.

use std::collections::{HashMap, HashSet};
use serde::{Serialize, Deserialize};
use tracing::debug;

use super::{CallEdge, FunctionEntity};
use super::super::extractor::{CallSite, ScopeLevel};

/// Counters describing how call sites fared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub calls_seen: usize,
    pub calls_resolved: usize,
    /// External, untargetable and ambiguous calls
    pub calls_unresolved: usize,
    /// Subset of `calls_unresolved` dropped for having several candidates
    pub calls_ambiguous: usize,
}

/// Outcome for a single call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Arena position of the callee among the resolver's entities
    Resolved(usize),
    Ambiguous,
    Unresolved,
}

pub struct CallResolver<'g> {
    entities: &'g [FunctionEntity],
    ids: HashSet<&'g str>,
    by_path: HashMap<&'g str, Vec<usize>>,
    by_name: HashMap<&'g str, Vec<usize>>,
}

impl<'g> CallResolver<'g> {
    pub fn new(entities: &'g [FunctionEntity]) -> Self {
        let mut by_path: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();

        for (i, entity) in entities.iter().enumerate() {
            by_path.entry(entity.qualified_path.as_str()).or_default().push(i);
            by_name.entry(entity.name.as_str()).or_default().push(i);
        }

        Self {
            entities,
            ids: entities.iter().map(|e| e.id.as_str()).collect(),
            by_path,
            by_name,
        }
    }

    fn pick(candidates: Option<&Vec<usize>>) -> Option<Resolution> {
        match candidates.map(Vec::as_slice) {
            Some([only]) => Some(Resolution::Resolved(*only)),
            Some([_, _, ..]) => Some(Resolution::Ambiguous),
            _ => None,
        }
    }

    /// Resolve one call site to zero or one callee
    pub fn resolve(&self, site: &CallSite) -> Resolution {
        let Some(target) = &site.target else {
            return Resolution::Unresolved;
        };

        let self_receiver = target.is_self_receiver();
        if target.receiver.is_none() || self_receiver {
            let in_chain = site.scopes.iter().filter(|scope| {
                if self_receiver {
                    scope.level == ScopeLevel::Class
                } else {
                    scope.level != ScopeLevel::Class
                }
            });

            for scope in in_chain {
                let path = if scope.qualified_path.is_empty() {
                    target.name.clone()
                } else {
                    format!("{}.{}", scope.qualified_path, target.name)
                };
                if let Some(found) = Self::pick(self.by_path.get(path.as_str())) {
                    return found;
                }
            }
        }

        Self::pick(self.by_name.get(target.name.as_str())).unwrap_or(Resolution::Unresolved)
    }

    /// Resolve every call site into edges, counting what was dropped
    pub fn resolve_all<'s>(&self, sites: impl IntoIterator<Item = &'s CallSite>) -> (Vec<CallEdge>, ResolutionStats) {
        let mut edges = Vec::new();
        let mut stats = ResolutionStats::default();

        for site in sites {
            stats.calls_seen += 1;

            if !self.ids.contains(site.caller_id.as_str()) {
                debug!("Call at {}:{} has no known caller", site.source_file, site.line);
                stats.calls_unresolved += 1;
                continue;
            }

            match self.resolve(site) {
                Resolution::Resolved(callee) => {
                    stats.calls_resolved += 1;
                    edges.push(CallEdge {
                        caller_id: site.caller_id.clone(),
                        callee_id: self.entities[callee].id.clone(),
                        source_file: site.source_file.clone(),
                        line: site.line,
                    });
                }
                Resolution::Ambiguous => {
                    stats.calls_unresolved += 1;
                    stats.calls_ambiguous += 1;
                    debug!(
                        "Ambiguous call to {:?} at {}:{} dropped",
                        site.target.as_ref().map(|t| t.name.as_str()),
                        site.source_file,
                        site.line
                    );
                }
                Resolution::Unresolved => {
                    stats.calls_unresolved += 1;
                }
            }
        }

        (edges, stats)
    }
}

//! Structural ranking: in-degree, betweenness centrality and blended heat.
//!
//! Betweenness uses Brandes' algorithm on the collapsed digraph (parallel
//! call sites merged, self-loops ignored). For every ordered pair (s, t)
//! with s ≠ v ≠ t, v accrues σ(s,t|v) / σ(s,t). Values are not normalized;
//! heat does its own min-max scaling.

use std::collections::VecDeque;
use tracing::debug;

use crate::config::RankingConfig;
use super::{CallGraph, Centrality};

pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Compute centrality and assign heat to every entity, once
    pub fn rank(&self, graph: &mut CallGraph) {
        if graph.is_ranked() {
            debug!("Graph already ranked, keeping existing heat");
            return;
        }

        let n = graph.len();
        let adjacency = graph.collapsed_adjacency();
        let betweenness = betweenness_centrality(&adjacency);

        let centrality: Vec<Centrality> = (0..n)
            .map(|i| Centrality {
                in_degree: graph.in_degree(i),
                out_degree: graph.out_degree(i),
                betweenness: betweenness[i],
            })
            .collect();

        let heat = if n <= 1 {
            // A lone entity has nothing to be ranked against
            vec![0.0; n]
        } else {
            let in_degree: Vec<f64> = centrality.iter().map(|c| c.in_degree as f64).collect();
            let (w_between, w_degree) = self.config.normalized_weights();
            min_max_normalize(&betweenness)
                .into_iter()
                .zip(min_max_normalize(&in_degree))
                .map(|(b, d)| (w_between * b + w_degree * d).clamp(0.0, 1.0))
                .collect()
        };

        debug!("Ranked {} entities over {} edges", n, graph.edges().len());
        graph.apply_ranking(centrality, heat);
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

/// Brandes betweenness over successor lists indexed by arena position
pub fn betweenness_centrality(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut scores = vec![0.0; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = VecDeque::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut distance: Vec<Option<usize>> = vec![None; n];
    let mut delta = vec![0.0_f64; n];

    for source in 0..n {
        stack.clear();
        queue.clear();
        for i in 0..n {
            predecessors[i].clear();
            sigma[i] = 0.0;
            distance[i] = None;
            delta[i] = 0.0;
        }

        sigma[source] = 1.0;
        distance[source] = Some(0);
        queue.push_back(source);

        // Count shortest paths from the source
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let next = distance[v].map_or(0, |d| d + 1);
            for &w in &adjacency[v] {
                if distance[w].is_none() {
                    distance[w] = Some(next);
                    queue.push_back(w);
                }
                if distance[w] == Some(next) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        // Accumulate dependencies in reverse BFS order
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                if sigma[w] > 0.0 {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
            }
            if w != source {
                scores[w] += delta[w];
            }
        }
    }

    scores
}

/// Scale to [0, 1]; a constant series maps to all zeros
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    if !span.is_finite() || span <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_linear_chain() {
        // A -> B -> C -> D
        let adjacency = vec![vec![1], vec![2], vec![3], vec![]];
        let scores = betweenness_centrality(&adjacency);
        assert!(approx(scores[0], 0.0));
        assert!(approx(scores[1], 2.0));
        assert!(approx(scores[2], 2.0));
        assert!(approx(scores[3], 0.0));
    }

    #[test]
    fn test_shortest_path_ties_are_split() {
        // A -> B -> D, A -> C -> D
        let adjacency = vec![vec![1, 2], vec![3], vec![3], vec![]];
        let scores = betweenness_centrality(&adjacency);
        assert!(approx(scores[1], 0.5));
        assert!(approx(scores[2], 0.5));
        assert!(approx(scores[0], 0.0));
        assert!(approx(scores[3], 0.0));
    }

    #[test]
    fn test_mutual_recursion_has_no_intermediates() {
        let adjacency = vec![vec![1], vec![0]];
        assert_eq!(betweenness_centrality(&adjacency), vec![0.0, 0.0]);
    }

    #[test]
    fn test_disconnected_and_isolated_nodes_score_zero() {
        let adjacency = vec![vec![], vec![], vec![]];
        assert_eq!(betweenness_centrality(&adjacency), vec![0.0, 0.0, 0.0]);
        assert!(betweenness_centrality(&[]).is_empty());
    }

    #[test]
    fn test_star_hub() {
        // Leaves 1..=3 call the hub 0, the hub calls leaf 4
        let adjacency = vec![vec![4], vec![0], vec![0], vec![0], vec![]];
        let scores = betweenness_centrality(&adjacency);
        assert!(approx(scores[0], 3.0));
        assert!(scores[1..].iter().all(|s| approx(*s, 0.0)));
    }

    #[test]
    fn test_min_max_normalize() {
        assert_eq!(min_max_normalize(&[0.0, 2.0, 1.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }
}

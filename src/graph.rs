//! Similarity graph building.
//!
//! This module turns a corpus of notes with embedding vectors into the
//! sparse weighted graph behind the neural map view, and derives the
//! aggregate statistics shown alongside it. Building is pure: the same
//! notes and configuration always produce the identical node and edge
//! sets, which the map cache and the tests rely on.

use crate::embeddings::cosine_similarity;
use crate::models::{GraphConfig, GraphEdge, GraphNode, GraphStats, NeuralMap, Note};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;

// ============================================================================
// Graph Building
// ============================================================================

impl GraphConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(format!(
                "min_similarity must be in [0, 1], got {}",
                self.min_similarity
            ));
        }
        if self.max_nodes == 0 {
            return Err("max_nodes must be at least 1".to_string());
        }
        if self.connections_per_node == 0 {
            return Err("connections_per_node must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Build the similarity graph over `notes`.
///
/// 1. Keep notes carrying at least one selected tag (all notes when the
///    selection is empty), most recently updated first, id ascending on
///    ties, truncated to `max_nodes`.
/// 2. Score every pair of surviving embedded notes by cosine similarity and
///    drop pairs below `min_similarity`.
/// 3. Keep an edge when it ranks in the top `connections_per_node` of
///    either endpoint, so a strong one-sided affinity survives a busy
///    neighbor.
/// 4. Drop degree-zero nodes unless `show_isolated` is set.
///
/// Notes without an embedding never produce edges but remain valid isolated
/// nodes. An empty corpus yields an empty graph.
pub fn build_similarity_graph(notes: &[Note], config: &GraphConfig) -> Result<NeuralMap, String> {
    config.validate()?;

    let mut selected: Vec<&Note> = notes
        .iter()
        .filter(|n| {
            config.selected_tags.is_empty()
                || n.tags.iter().any(|t| config.selected_tags.contains(t))
        })
        .collect();
    selected.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
    selected.truncate(config.max_nodes);

    let candidates = score_pairs(&selected, config.min_similarity);
    let edges = keep_top_connections(candidates, config.connections_per_node);

    let mut degree: HashMap<u64, usize> = HashMap::new();
    for e in &edges {
        *degree.entry(e.source).or_insert(0) += 1;
        *degree.entry(e.target).or_insert(0) += 1;
    }

    let nodes: Vec<GraphNode> = selected
        .iter()
        .filter_map(|n| {
            let deg = *degree.get(&n.id).unwrap_or(&0);
            if deg == 0 && !config.show_isolated {
                return None;
            }
            Some(GraphNode::new(n.id, n.title.clone(), n.tags.clone(), deg))
        })
        .collect();

    let embedded_notes = notes.iter().filter(|n| n.embedding.is_some()).count();
    let stats = compute_graph_stats(&nodes, &edges, notes.len(), embedded_notes);

    Ok(NeuralMap {
        nodes,
        edges,
        stats,
    })
}

/// All above-threshold pairs among embedded notes, canonically ordered
/// (`source < target`) and sorted for deterministic output regardless of
/// rayon scheduling.
fn score_pairs(selected: &[&Note], min_similarity: f64) -> Vec<GraphEdge> {
    use rayon::prelude::*;

    let embedded: Vec<(&Note, &Vec<f32>)> = selected
        .iter()
        .filter_map(|n| n.embedding.as_ref().map(|e| (*n, e)))
        .collect();
    let embedded = &embedded;

    let mut candidates: Vec<GraphEdge> = (0..embedded.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let (a, ea) = embedded[i];
            embedded[i + 1..].iter().filter_map(move |&(b, eb)| {
                if a.id == b.id {
                    return None;
                }
                let similarity = cosine_similarity(ea, eb);
                if similarity < min_similarity {
                    return None;
                }
                let (source, target) = if a.id < b.id {
                    (a.id, b.id)
                } else {
                    (b.id, a.id)
                };
                Some(GraphEdge {
                    source,
                    target,
                    similarity,
                })
            })
        })
        .collect();

    candidates.sort_by(|x, y| x.source.cmp(&y.source).then(x.target.cmp(&y.target)));
    candidates.dedup_by(|x, y| x.source == y.source && x.target == y.target);
    candidates
}

/// Bound graph density: each node ranks its incident candidates by
/// similarity (neighbor id on ties) and an edge survives if either endpoint
/// ranks it within its top `k`.
fn keep_top_connections(candidates: Vec<GraphEdge>, k: usize) -> Vec<GraphEdge> {
    let mut per_node: HashMap<u64, Vec<usize>> = HashMap::new();
    for (idx, e) in candidates.iter().enumerate() {
        per_node.entry(e.source).or_default().push(idx);
        per_node.entry(e.target).or_default().push(idx);
    }

    let neighbor_of = |idx: usize, node: u64| -> u64 {
        let e = &candidates[idx];
        if e.source == node {
            e.target
        } else {
            e.source
        }
    };

    let mut kept: HashSet<usize> = HashSet::new();
    for (node, mut incident) in per_node {
        incident.sort_by(|&x, &y| {
            candidates[y]
                .similarity
                .partial_cmp(&candidates[x].similarity)
                .unwrap_or(Ordering::Equal)
                .then(neighbor_of(x, node).cmp(&neighbor_of(y, node)))
        });
        kept.extend(incident.into_iter().take(k));
    }

    let mut kept: Vec<usize> = kept.into_iter().collect();
    kept.sort_unstable();
    kept.into_iter().map(|i| candidates[i].clone()).collect()
}

// ============================================================================
// Graph Statistics
// ============================================================================

/// Aggregate metrics for the map summary. Pure over its arguments; an empty
/// graph gives an average degree of zero, not a division by zero.
pub fn compute_graph_stats(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    total_notes: usize,
    embedded_notes: usize,
) -> GraphStats {
    let total_nodes = nodes.len();
    let total_edges = edges.len();

    let avg_degree = if total_nodes > 0 {
        2.0 * total_edges as f64 / total_nodes as f64
    } else {
        0.0
    };

    let mut min_similarity = None;
    let mut max_similarity = None;
    for e in edges {
        min_similarity = Some(match min_similarity {
            Some(m) if m < e.similarity => m,
            _ => e.similarity,
        });
        max_similarity = Some(match max_similarity {
            Some(m) if m > e.similarity => m,
            _ => e.similarity,
        });
    }

    let isolated_nodes = nodes.iter().filter(|n| n.degree == 0).count();

    let embedding_coverage = if total_notes > 0 {
        embedded_notes as f64 / total_notes as f64
    } else {
        0.0
    };

    GraphStats {
        total_nodes,
        total_edges,
        avg_degree,
        min_similarity,
        max_similarity,
        isolated_nodes,
        embedding_coverage,
    }
}

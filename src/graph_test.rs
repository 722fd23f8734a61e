//! Tests for the similarity graph builder and stats calculator.
//!
//! Embeddings are hand-built 2D unit vectors so pairwise cosine
//! similarities are known up front and the tests stay deterministic.

use super::*;
use chrono::{Duration, TimeZone, Utc};

// ============================================================================
// Helpers
// ============================================================================

/// Build a minimal Note for testing. `age` pushes `updated_at` back in
/// minutes so recency ordering is controllable per note.
fn mock_note(id: u64, title: &str, tags: &[&str], age: i64, embedding: Option<Vec<f32>>) -> Note {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let updated_at = base - Duration::minutes(age);
    Note {
        id,
        title: title.to_string(),
        content: format!("content of {}", title),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: updated_at,
        updated_at,
        embedding,
    }
}

/// Unit vector at the given angle, so cosine similarity between two of
/// these is the cosine of the angle between them.
fn unit(angle_deg: f64) -> Vec<f32> {
    let rad = angle_deg.to_radians();
    vec![rad.cos() as f32, rad.sin() as f32]
}

fn config(min_similarity: f64) -> GraphConfig {
    GraphConfig {
        min_similarity,
        ..Default::default()
    }
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn empty_corpus_yields_empty_graph() {
    let map = build_similarity_graph(&[], &config(0.5)).unwrap();
    assert!(map.nodes.is_empty());
    assert!(map.edges.is_empty());
    assert_eq!(map.stats.total_nodes, 0);
    assert_eq!(map.stats.avg_degree, 0.0);
    assert_eq!(map.stats.min_similarity, None);
    assert_eq!(map.stats.max_similarity, None);
    assert_eq!(map.stats.embedding_coverage, 0.0);
}

#[test]
fn invalid_config_is_rejected() {
    let bad = GraphConfig {
        min_similarity: 1.5,
        ..Default::default()
    };
    assert!(build_similarity_graph(&[], &bad).is_err());

    let bad = GraphConfig {
        max_nodes: 0,
        ..Default::default()
    };
    assert!(build_similarity_graph(&[], &bad).is_err());
}

/// Three embedded notes where two pairs clear the 0.5 threshold and the
/// third does not, plus two notes without embeddings. The weak pair is
/// dropped; the embedding-less notes are isolated nodes, not errors.
#[test]
fn threshold_drops_weak_edges_and_keeps_isolated_notes() {
    // angles: 0°, 26°, -53° → cos 26° ≈ 0.90, cos 53° ≈ 0.60, cos 79° ≈ 0.19
    let notes = vec![
        mock_note(1, "alpha", &[], 0, Some(unit(0.0))),
        mock_note(2, "beta", &[], 1, Some(unit(26.0))),
        mock_note(3, "gamma", &[], 2, Some(unit(-53.0))),
        mock_note(4, "delta", &[], 3, None),
        mock_note(5, "epsilon", &[], 4, None),
    ];

    let map = build_similarity_graph(&notes, &config(0.5)).unwrap();

    assert_eq!(map.edges.len(), 2);
    assert!(map.edges.iter().any(|e| e.source == 1 && e.target == 2));
    assert!(map.edges.iter().any(|e| e.source == 1 && e.target == 3));
    // The ~0.19 beta/gamma pair fell below the floor
    assert!(!map.edges.iter().any(|e| e.source == 2 && e.target == 3));

    assert_eq!(map.nodes.len(), 5);
    assert_eq!(map.stats.isolated_nodes, 2);
    assert!((map.stats.embedding_coverage - 0.6).abs() < 1e-9);

    // Hiding isolated nodes drops exactly the embedding-less pair
    let hidden = GraphConfig {
        min_similarity: 0.5,
        show_isolated: false,
        ..Default::default()
    };
    let map = build_similarity_graph(&notes, &hidden).unwrap();
    assert_eq!(map.nodes.len(), 3);
    assert_eq!(map.stats.isolated_nodes, 0);
    assert_eq!(map.edges.len(), 2);
}

#[test]
fn no_self_edges_or_duplicate_pairs() {
    let notes: Vec<Note> = (0..6)
        .map(|i| {
            mock_note(
                i + 1,
                &format!("n{}", i),
                &[],
                i as i64,
                Some(unit(i as f64 * 10.0)),
            )
        })
        .collect();

    let map = build_similarity_graph(&notes, &config(0.0)).unwrap();

    let mut seen = std::collections::HashSet::new();
    for e in &map.edges {
        assert_ne!(e.source, e.target);
        assert!(e.source < e.target, "canonical edge ordering violated");
        assert!(seen.insert((e.source, e.target)), "duplicate pair");
    }
}

#[test]
fn builder_is_deterministic() {
    let notes: Vec<Note> = (0..20)
        .map(|i| {
            mock_note(
                i + 1,
                &format!("n{}", i),
                &[],
                i as i64,
                Some(unit(i as f64 * 7.0)),
            )
        })
        .collect();

    let cfg = config(0.3);
    let first = build_similarity_graph(&notes, &cfg).unwrap();
    let second = build_similarity_graph(&notes, &cfg).unwrap();

    assert_eq!(first.edges, second.edges);
    let ids = |m: &NeuralMap| m.nodes.iter().map(|n| n.id).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

/// With k = 1 the hub's own top edge is hub–x, but hub–y survives because
/// it is y's best connection: top-K lists are unioned across endpoints.
#[test]
fn top_k_union_keeps_one_sided_affinity() {
    let notes = vec![
        mock_note(1, "hub", &[], 0, Some(unit(0.0))),
        mock_note(2, "x", &[], 1, Some(unit(18.0))),  // cos 18° ≈ 0.95 to hub
        mock_note(3, "y", &[], 2, Some(unit(-26.0))), // cos 26° ≈ 0.90 to hub
    ];

    let cfg = GraphConfig {
        min_similarity: 0.5,
        connections_per_node: 1,
        ..Default::default()
    };
    let map = build_similarity_graph(&notes, &cfg).unwrap();

    assert_eq!(map.edges.len(), 2);
    assert!(map.edges.iter().any(|e| e.source == 1 && e.target == 2));
    assert!(map.edges.iter().any(|e| e.source == 1 && e.target == 3));
}

#[test]
fn max_nodes_keeps_most_recently_updated() {
    // Notes 1..5, note 1 freshest; identical embeddings so any surviving
    // pair would connect.
    let notes: Vec<Note> = (1..=5)
        .map(|i| mock_note(i, &format!("n{}", i), &[], i as i64, Some(unit(0.0))))
        .collect();

    let cfg = GraphConfig {
        min_similarity: 0.5,
        max_nodes: 2,
        ..Default::default()
    };
    let map = build_similarity_graph(&notes, &cfg).unwrap();

    let ids: Vec<u64> = map.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2]);
    for e in &map.edges {
        assert!(ids.contains(&e.source) && ids.contains(&e.target));
    }
    assert_eq!(map.edges.len(), 1);
}

#[test]
fn tag_filter_selects_any_matching_tag() {
    let notes = vec![
        mock_note(1, "a", &["rust"], 0, Some(unit(0.0))),
        mock_note(2, "b", &["ml", "rust"], 1, Some(unit(5.0))),
        mock_note(3, "c", &["cooking"], 2, Some(unit(10.0))),
    ];

    let cfg = GraphConfig {
        min_similarity: 0.5,
        selected_tags: vec!["rust".to_string()],
        ..Default::default()
    };
    let map = build_similarity_graph(&notes, &cfg).unwrap();

    let ids: Vec<u64> = map.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn degree_matches_incident_edges() {
    let notes = vec![
        mock_note(1, "a", &[], 0, Some(unit(0.0))),
        mock_note(2, "b", &[], 1, Some(unit(10.0))),
        mock_note(3, "c", &[], 2, Some(unit(20.0))),
    ];

    let map = build_similarity_graph(&notes, &config(0.5)).unwrap();
    for node in &map.nodes {
        let incident = map
            .edges
            .iter()
            .filter(|e| e.source == node.id || e.target == node.id)
            .count();
        assert_eq!(node.degree, incident);
    }
}

// ============================================================================
// Stats
// ============================================================================

#[test]
fn stats_identities_hold() {
    let notes: Vec<Note> = (0..4)
        .map(|i| {
            mock_note(
                i + 1,
                &format!("n{}", i),
                &[],
                i as i64,
                Some(unit(i as f64 * 15.0)),
            )
        })
        .collect();

    let map = build_similarity_graph(&notes, &config(0.2)).unwrap();

    assert_eq!(map.stats.total_edges, map.edges.len());
    assert_eq!(map.stats.total_nodes, map.nodes.len());
    let expected = 2.0 * map.edges.len() as f64 / map.nodes.len() as f64;
    assert!((map.stats.avg_degree - expected).abs() < 1e-9);

    let min = map
        .edges
        .iter()
        .map(|e| e.similarity)
        .fold(f64::INFINITY, f64::min);
    let max = map
        .edges
        .iter()
        .map(|e| e.similarity)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(map.stats.min_similarity, Some(min));
    assert_eq!(map.stats.max_similarity, Some(max));
}

#[test]
fn stats_tolerate_empty_graph() {
    let stats = compute_graph_stats(&[], &[], 0, 0);
    assert_eq!(stats.avg_degree, 0.0);
    assert_eq!(stats.embedding_coverage, 0.0);
    assert_eq!(stats.isolated_nodes, 0);
}

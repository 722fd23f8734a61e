//! Data models for the neural notes engine.
//!
//! This module contains all the core data structures used throughout the
//! application: notes, the similarity graph, search results, explanations,
//! and the request/response types of the HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Note Type
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present only when embedding computation succeeded for this note.
    /// Missing embeddings are a coverage statistic, not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

// ============================================================================
// Similarity Graph Data Structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: u64,
    pub label: String,
    pub tags: Vec<String>,
    /// Number of incident edges. Recomputed from the edge set on every
    /// build; never carried over between builds.
    pub degree: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vz: Option<f64>,
}

impl GraphNode {
    pub fn new(id: u64, label: String, tags: Vec<String>, degree: usize) -> Self {
        GraphNode {
            id,
            label,
            tags,
            degree,
            x: None,
            y: None,
            z: None,
            vx: None,
            vy: None,
            vz: None,
        }
    }
}

/// An undirected edge between two distinct notes. `source < target` always
/// holds, so each unordered pair has exactly one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: u64,
    pub target: u64,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub avg_degree: f64,
    pub min_similarity: Option<f64>,
    pub max_similarity: Option<f64>,
    pub isolated_nodes: usize,
    /// Fraction of the full corpus that has an embedding.
    pub embedding_coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralMap {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}

// ============================================================================
// Graph Builder Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub min_similarity: f64,
    pub max_nodes: usize,
    pub connections_per_node: usize,
    pub selected_tags: Vec<String>,
    pub show_isolated: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            min_similarity: 0.45,
            max_nodes: 200,
            connections_per_node: 3,
            selected_tags: Vec::new(),
            show_isolated: true,
        }
    }
}

/// Raw query parameters for `/api/map`. Integer fields are signed so that
/// out-of-range input reaches `into_config` and is rejected with a message
/// instead of failing deserialization opaquely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphParams {
    pub min_similarity: Option<f64>,
    pub max_nodes: Option<i64>,
    pub connections_per_node: Option<i64>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub show_isolated: Option<bool>,
    pub layout: Option<String>,
}

impl GraphParams {
    pub fn into_config(self) -> Result<GraphConfig, String> {
        let defaults = GraphConfig::default();

        let min_similarity = self.min_similarity.unwrap_or(defaults.min_similarity);
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(format!(
                "min_similarity must be in [0, 1], got {}",
                min_similarity
            ));
        }

        let max_nodes = self.max_nodes.unwrap_or(defaults.max_nodes as i64);
        if max_nodes < 1 {
            return Err(format!("max_nodes must be at least 1, got {}", max_nodes));
        }

        let connections_per_node = self
            .connections_per_node
            .unwrap_or(defaults.connections_per_node as i64);
        if connections_per_node < 1 {
            return Err(format!(
                "connections_per_node must be at least 1, got {}",
                connections_per_node
            ));
        }

        let selected_tags = self
            .tags
            .map(|t| {
                t.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(GraphConfig {
            min_similarity,
            max_nodes: max_nodes as usize,
            connections_per_node: connections_per_node as usize,
            selected_tags,
            show_isolated: self.show_isolated.unwrap_or(defaults.show_isolated),
        })
    }
}

// ============================================================================
// Search Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Semantic,
    Keyword,
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMethod::Semantic => write!(f, "semantic"),
            SearchMethod::Keyword => write!(f, "keyword"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    DateDesc,
    DateAsc,
    Title,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub tags: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub sort_by: SortBy,
    /// Explicitly requested method. None means semantic-first with keyword
    /// fallback when embeddings are unavailable.
    pub method: Option<SearchMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    pub preview: String,
    pub tags: Vec<String>,
    /// Relevance in [0, 1]. Zero-score results never appear.
    pub score: f64,
    pub method: SearchMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub count: usize,
    pub search_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Explanation Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplanationMethod {
    Llm,
    RuleBased,
    Fallback,
}

/// Always carries renderable prose. `error` is set when a preferred tier was
/// unavailable and the chain degraded past it.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub explanation: String,
    pub method: ExplanationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub query: String,
    pub results: Vec<SearchResult>,
}

// ============================================================================
// Map Response
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MapResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
    /// Physics tuning for the client-side simulation runtime. Present only
    /// for the force layout; radial/tree carry coordinates on the nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<crate::layout::ForceSimulationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Note Listing
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NoteListEntry {
    pub id: u64,
    pub title: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_params_defaults() {
        let config = GraphParams::default().into_config().unwrap();
        assert_eq!(config.max_nodes, 200);
        assert_eq!(config.connections_per_node, 3);
        assert!(config.show_isolated);
        assert!(config.selected_tags.is_empty());
    }

    #[test]
    fn graph_params_rejects_negative_max_nodes() {
        let params = GraphParams {
            max_nodes: Some(-5),
            ..Default::default()
        };
        let err = params.into_config().unwrap_err();
        assert!(err.contains("max_nodes"));
    }

    #[test]
    fn graph_params_rejects_out_of_range_similarity() {
        let params = GraphParams {
            min_similarity: Some(1.5),
            ..Default::default()
        };
        assert!(params.into_config().is_err());

        let params = GraphParams {
            min_similarity: Some(-0.1),
            ..Default::default()
        };
        assert!(params.into_config().is_err());
    }

    #[test]
    fn graph_params_rejects_zero_connections() {
        let params = GraphParams {
            connections_per_node: Some(0),
            ..Default::default()
        };
        assert!(params.into_config().is_err());
    }

    #[test]
    fn graph_params_parses_tag_list() {
        let params = GraphParams {
            tags: Some("rust, ideas,,ml ".to_string()),
            ..Default::default()
        };
        let config = params.into_config().unwrap();
        assert_eq!(config.selected_tags, vec!["rust", "ideas", "ml"]);
    }
}

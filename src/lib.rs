//! Neuranote library - re-exports for testing and external use.
//!
//! This module provides public access to all the application's modules
//! for testing purposes and potential library use.

use sled::Db;
use std::fs;
use std::path::PathBuf;

pub mod embeddings;
pub mod explain;
pub mod graph;
pub mod handlers;
pub mod layout;
pub mod models;
pub mod notes;
pub mod search;

// ============================================================================
// Configuration
// ============================================================================

pub const NOTES_DIR: &str = "content";
pub const DB_PATH: &str = ".neuranote_db";

// ============================================================================
// Application State
// ============================================================================

/// Shared server state. The engine itself is stateless; this only holds
/// the note directory, the embedding cache, and external service
/// configuration read once at startup.
#[derive(Clone)]
pub struct AppState {
    pub notes_dir: PathBuf,
    pub db: Db,
    pub embedding: Option<embeddings::EmbeddingConfig>,
    pub llm: Option<explain::LlmConfig>,
}

impl AppState {
    pub fn new() -> Self {
        let notes_dir = PathBuf::from(NOTES_DIR);
        fs::create_dir_all(&notes_dir).ok();

        let db = sled::open(DB_PATH).expect("Failed to open database");

        Self {
            notes_dir,
            db,
            embedding: embeddings::EmbeddingConfig::from_env(),
            llm: explain::LlmConfig::from_env(),
        }
    }

    pub fn load_notes(&self) -> Vec<models::Note> {
        notes::load_all_notes(&self.notes_dir)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export commonly used types
pub use models::{
    ExplainRequest, Explanation, ExplanationMethod, GraphConfig, GraphEdge, GraphNode, GraphParams,
    GraphStats, MapResponse, NeuralMap, Note, NoteListEntry, SearchFilters, SearchMethod,
    SearchRequest, SearchResponse, SearchResult, SortBy,
};

pub use embeddings::{
    cosine_similarity, ensure_note_embeddings, fetch_embedding, load_cached_embedding,
    store_embedding, EmbeddingConfig,
};

pub use graph::{build_similarity_graph, compute_graph_stats};

pub use layout::{
    apply_layout, radial_layout, seed_initial_positions, tree_layout, ForceSimulationConfig,
    LayoutStrategy, SimulationRunner,
};

pub use search::rank_notes;

pub use explain::{
    explain_results, fallback_explanation, query_llm_explanation, rule_based_explanation,
    LlmConfig, EXPLAIN_RESULT_CAP,
};

pub use notes::{generate_id, load_all_notes, load_note, parse_frontmatter, preview, tokenize, Frontmatter};

//! HTTP route handlers for the engine's JSON API.
//!
//! Three surfaces: the neural map, search, and result explanation. Degraded
//! dependencies (embedding or generation service down) surface as fields in
//! an otherwise successful response; only malformed input produces an
//! error status.

use crate::embeddings::{ensure_note_embeddings, fetch_embedding};
use crate::explain::explain_results;
use crate::graph::{build_similarity_graph, compute_graph_stats};
use crate::layout::{apply_layout, LayoutStrategy};
use crate::models::{
    ExplainRequest, GraphParams, MapResponse, NoteListEntry, SearchMethod, SearchRequest,
    SearchResponse,
};
use crate::search::rank_notes;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

// ============================================================================
// Neural Map
// ============================================================================

pub async fn map_api(
    Query(params): Query<GraphParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let layout = match params
        .layout
        .as_deref()
        .unwrap_or("force")
        .parse::<LayoutStrategy>()
    {
        Ok(l) => l,
        Err(e) => return bad_request(e),
    };
    let config = match params.into_config() {
        Ok(c) => c,
        Err(e) => return bad_request(e),
    };

    let mut notes = state.load_notes();
    ensure_note_embeddings(&state.db, state.embedding.as_ref(), &mut notes).await;

    if notes.is_empty() {
        return Json(MapResponse {
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: compute_graph_stats(&[], &[], 0, 0),
            simulation: None,
            message: Some("No notes found. Create some notes to see the neural map!".to_string()),
        })
        .into_response();
    }

    let mut map = match build_similarity_graph(&notes, &config) {
        Ok(m) => m,
        Err(e) => return bad_request(e),
    };
    let simulation = apply_layout(&mut map, layout);

    let message = format!(
        "Neural map with {} notes and {} connections",
        map.stats.total_nodes, map.stats.total_edges
    );
    Json(MapResponse {
        nodes: map.nodes,
        edges: map.edges,
        stats: map.stats,
        simulation,
        message: Some(message),
    })
    .into_response()
}

// ============================================================================
// Search
// ============================================================================

pub async fn search_api(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Json(SearchResponse {
            query,
            results: Vec::new(),
            count: 0,
            search_method: SearchMethod::Keyword.to_string(),
            message: Some("Please enter a search term".to_string()),
        })
        .into_response();
    }

    let mut notes = state.load_notes();
    ensure_note_embeddings(&state.db, state.embedding.as_ref(), &mut notes).await;

    // The query embedding is only fetched when semantic scoring is in play
    let want_semantic = !matches!(request.filters.method, Some(SearchMethod::Keyword));
    let query_embedding = match (&state.embedding, want_semantic) {
        (Some(config), true) => fetch_embedding(config, &query).await,
        _ => None,
    };
    let embedding_degraded =
        want_semantic && state.embedding.is_some() && query_embedding.is_none();

    let (results, method) = rank_notes(&query, query_embedding.as_deref(), &notes, &request.filters);

    let mut message = format!("Found {} notes using {} matching", results.len(), method);
    if embedding_degraded {
        message.push_str(" (embedding service unavailable)");
    }

    Json(SearchResponse {
        query,
        count: results.len(),
        results,
        search_method: method.to_string(),
        message: Some(message),
    })
    .into_response()
}

// ============================================================================
// Explanation
// ============================================================================

pub async fn explain_api(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExplainRequest>,
) -> Response {
    let explanation = explain_results(state.llm.as_ref(), &request.query, &request.results).await;
    Json(explanation).into_response()
}

// ============================================================================
// Note Listing
// ============================================================================

pub async fn notes_api(State(state): State<Arc<AppState>>) -> Response {
    let entries: Vec<NoteListEntry> = state
        .load_notes()
        .into_iter()
        .map(|n| NoteListEntry {
            id: n.id,
            title: n.title,
            tags: n.tags,
            updated_at: n.updated_at,
        })
        .collect();
    Json(entries).into_response()
}

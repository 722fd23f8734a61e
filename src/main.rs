//! Neuranote - a personal note-taking tool with a neural map.
//!
//! This is the main entry point for the engine's API server.
//! The application is organized into the following modules:
//!
//! - `models`: Data structures for notes, the similarity graph, and search
//! - `notes`: Note loading, frontmatter parsing, and text helpers
//! - `embeddings`: Embedding service client, cache, and cosine similarity
//! - `graph`: Similarity graph building and statistics
//! - `layout`: Force/radial/tree layout strategies
//! - `search`: Query ranking with semantic and keyword signals
//! - `explain`: Explanation generation fallback chain
//! - `handlers`: HTTP route handlers

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use neuranote::{handlers, AppState, NOTES_DIR};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/api/map", get(handlers::map_api))
        .route("/api/search", post(handlers::search_api))
        .route("/api/explain", post(handlers::explain_api))
        .route("/api/notes", get(handlers::notes_api))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("Failed to bind to port 3000");

    println!("Neuranote server running at http://127.0.0.1:3000");
    println!("Notes directory: {}", NOTES_DIR);

    if state.embedding.is_some() {
        println!("Semantic search: ENABLED (EMBEDDING_URL set)");
    } else {
        println!("Semantic search: DISABLED (set EMBEDDING_URL to enable embeddings)");
    }
    if state.llm.is_some() {
        println!("AI explanations: ENABLED (LLM_URL set)");
    } else {
        println!("AI explanations: DISABLED (set LLM_URL to enable)");
    }

    axum::serve(listener, app).await.expect("Server error");
}

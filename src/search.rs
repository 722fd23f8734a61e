//! Query ranking over the note corpus.
//!
//! Fuses two scoring signals: cosine similarity against a query embedding
//! when one is available, and a token-overlap keyword heuristic otherwise.
//! The two are never blended; every result carries the single method that
//! scored it. Filters are strict: a note outside the requested tags or
//! date range is excluded before scoring, never merely down-ranked.

use crate::embeddings::cosine_similarity;
use crate::models::{Note, SearchFilters, SearchMethod, SearchResult, SortBy};
use crate::notes::{preview, tokenize};
use std::cmp::Ordering;

const PREVIEW_LEN: usize = 150;

// ============================================================================
// Ranking
// ============================================================================

/// Rank `notes` against the query. Returns the ordered results and the
/// method actually used, so the caller can surface degradation (semantic
/// wanted, keyword delivered) without failing the request.
///
/// Results scoring zero are dropped; an empty result list is a valid
/// outcome, not an error.
pub fn rank_notes(
    query: &str,
    query_embedding: Option<&[f32]>,
    notes: &[Note],
    filters: &SearchFilters,
) -> (Vec<SearchResult>, SearchMethod) {
    let candidates: Vec<&Note> = notes.iter().filter(|n| passes_filters(n, filters)).collect();

    let corpus_has_embeddings = candidates.iter().any(|n| n.embedding.is_some());
    let semantic_possible = query_embedding.is_some() && corpus_has_embeddings;

    let method = match filters.method {
        Some(SearchMethod::Keyword) => SearchMethod::Keyword,
        Some(SearchMethod::Semantic) if semantic_possible => SearchMethod::Semantic,
        Some(SearchMethod::Semantic) => SearchMethod::Keyword,
        None if semantic_possible => SearchMethod::Semantic,
        None => SearchMethod::Keyword,
    };

    let mut results: Vec<SearchResult> = match method {
        SearchMethod::Semantic => {
            let qe = query_embedding.unwrap_or(&[]);
            candidates
                .iter()
                .filter_map(|n| {
                    let emb = n.embedding.as_ref()?;
                    let score = cosine_similarity(qe, emb);
                    build_result(n, score, SearchMethod::Semantic)
                })
                .collect()
        }
        SearchMethod::Keyword => candidates
            .iter()
            .filter_map(|n| {
                let score = keyword_score(query, n);
                build_result(n, score, SearchMethod::Keyword)
            })
            .collect(),
    };

    sort_results(&mut results, filters.sort_by);
    (results, method)
}

fn passes_filters(note: &Note, filters: &SearchFilters) -> bool {
    if !filters.tags.is_empty() && !note.tags.iter().any(|t| filters.tags.contains(t)) {
        return false;
    }
    let date = note.created_at.date_naive();
    if let Some(from) = filters.date_from {
        if date < from {
            return false;
        }
    }
    if let Some(to) = filters.date_to {
        if date > to {
            return false;
        }
    }
    true
}

fn build_result(note: &Note, score: f64, method: SearchMethod) -> Option<SearchResult> {
    // Implicit relevance floor: zero scores never surface
    if score <= 0.0 {
        return None;
    }
    Some(SearchResult {
        id: note.id,
        title: note.title.clone(),
        preview: preview(&note.content, PREVIEW_LEN),
        tags: note.tags.clone(),
        score: score.min(1.0),
        method,
        created_at: note.created_at,
    })
}

/// Token-overlap heuristic: each query token found in the title counts
/// full, one found only in the body counts half, normalized by the query
/// token count.
fn keyword_score(query: &str, note: &Note) -> f64 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let title_tokens = tokenize(&note.title);
    let content_tokens = tokenize(&note.content);

    let mut hits = 0.0;
    for token in &query_tokens {
        if title_tokens.contains(token) {
            hits += 1.0;
        } else if content_tokens.contains(token) {
            hits += 0.5;
        }
    }

    hits / query_tokens.len() as f64
}

fn sort_results(results: &mut [SearchResult], sort_by: SortBy) {
    // Vec::sort_by is stable, which the relevance ordering relies on
    match sort_by {
        SortBy::Relevance => results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        }),
        SortBy::DateDesc => {
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)))
        }
        SortBy::DateAsc => {
            results.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        }
        SortBy::Title => results.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id))),
    }
}

//! Embedding computation and caching.
//!
//! Embeddings come from an external OpenAI-compatible embeddings endpoint
//! and are cached in a sled tree keyed by note id. Each cached record stores
//! a content hash so edits invalidate the cached vector. A note whose
//! embedding cannot be computed simply stays without one; downstream
//! components treat missing embeddings as reduced coverage, not as errors.

use crate::models::Note;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const EMBEDDINGS_TREE: &str = "embeddings";

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for the embedding service. Absent configuration means
/// the service is unavailable and callers fall back to keyword-only paths.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Read configuration from the environment. Returns None when no
    /// endpoint is set, which disables semantic features.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("EMBEDDING_URL").ok()?;
        Some(EmbeddingConfig {
            endpoint,
            model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            timeout_secs: 10,
        })
    }
}

// ============================================================================
// Cosine Similarity
// ============================================================================

/// Cosine similarity clamped to [0, 1]. Mismatched or empty vectors score
/// zero rather than erroring, matching the "no embedding, no edge" rule.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(0.0, 1.0)
}

// ============================================================================
// Embedding Service Client
// ============================================================================

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Fetch an embedding for a piece of text. Any failure (timeout, transport
/// error, malformed response) yields None so the caller can degrade.
pub async fn fetch_embedding(config: &EmbeddingConfig, text: &str) -> Option<Vec<f32>> {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(_) => return None,
    };

    let mut request = client.post(&config.endpoint).json(&serde_json::json!({
        "model": config.model,
        "input": text,
    }));
    if let Some(ref key) = config.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }

    let parsed: EmbeddingResponse = response.json().await.ok()?;
    let vector = parsed.data.into_iter().next()?.embedding;
    if vector.is_empty() {
        None
    } else {
        Some(vector)
    }
}

// ============================================================================
// Sled-Backed Cache
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CachedEmbedding {
    content_hash: String,
    vector: Vec<f32>,
}

fn content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0]);
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn load_cached_embedding(db: &sled::Db, note_id: u64, hash: &str) -> Option<Vec<f32>> {
    let tree = db.open_tree(EMBEDDINGS_TREE).ok()?;
    let raw = tree.get(note_id.to_le_bytes()).ok()??;
    let cached: CachedEmbedding = serde_json::from_slice(&raw).ok()?;
    if cached.content_hash == hash {
        Some(cached.vector)
    } else {
        None
    }
}

pub fn store_embedding(
    db: &sled::Db,
    note_id: u64,
    hash: &str,
    vector: &[f32],
) -> Result<(), String> {
    let tree = db.open_tree(EMBEDDINGS_TREE).map_err(|e| e.to_string())?;
    let record = CachedEmbedding {
        content_hash: hash.to_string(),
        vector: vector.to_vec(),
    };
    let bytes = serde_json::to_vec(&record).map_err(|e| e.to_string())?;
    tree.insert(note_id.to_le_bytes(), bytes)
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Fill in `note.embedding` for every note, from cache when fresh, otherwise
/// from the embedding service when one is configured. Service failures leave
/// the affected notes without an embedding and keep going.
pub async fn ensure_note_embeddings(
    db: &sled::Db,
    config: Option<&EmbeddingConfig>,
    notes: &mut [Note],
) {
    let mut service_down = false;

    for note in notes.iter_mut() {
        let hash = content_hash(&note.title, &note.content);

        if let Some(vector) = load_cached_embedding(db, note.id, &hash) {
            note.embedding = Some(vector);
            continue;
        }

        let config = match config {
            Some(c) => c,
            None => continue,
        };
        if service_down {
            continue;
        }

        let text = format!("{}\n{}", note.title, note.content);
        match fetch_embedding(config, &text).await {
            Some(vector) => {
                if let Err(e) = store_embedding(db, note.id, &hash, &vector) {
                    eprintln!("Failed to cache embedding for note {}: {}", note.id, e);
                }
                note.embedding = Some(vector);
            }
            None => {
                // One failed call marks the service down for this pass so a
                // large corpus doesn't wait out a timeout per note.
                eprintln!("Embedding service unavailable; continuing without");
                service_down = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_is_symmetric() {
        let a = vec![0.1, 0.5, 0.3];
        let b = vec![0.4, 0.2, 0.9];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn cosine_identical_vectors_is_one() {
        let a = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_clamps_opposed_vectors_to_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_handles_degenerate_input() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn cache_round_trip_and_invalidation() {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("temp sled db");
        let vector = vec![0.1_f32, 0.2, 0.3];
        let hash = content_hash("Title", "Body");

        store_embedding(&db, 42, &hash, &vector).unwrap();
        assert_eq!(load_cached_embedding(&db, 42, &hash), Some(vector));

        // Edited content sees a different hash and misses the cache
        let stale = content_hash("Title", "Edited body");
        assert_eq!(load_cached_embedding(&db, 42, &stale), None);
        // Unknown note misses too
        assert_eq!(load_cached_embedding(&db, 7, &hash), None);
    }
}

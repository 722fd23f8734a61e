//! Match explanations for search results.
//!
//! Produces a short prose explanation of why the top results matched a
//! query. Three tiers, first success wins:
//!
//! 1. an external OpenAI-compatible chat endpoint (with timeout),
//! 2. a rule-based template over shared terms and tags,
//! 3. a generic fallback string.
//!
//! Every tier failure degrades to the next one; the caller always gets
//! renderable text plus the method that produced it, so the UI can badge
//! "AI-Powered" versus "Rule-Based" output. A failure here never touches
//! the already-computed ranked results.

use crate::models::{Explanation, ExplanationMethod, SearchResult};
use crate::notes::tokenize;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Only the top results feed the explanation, bounding prompt cost.
pub const EXPLAIN_RESULT_CAP: usize = 5;

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for the text-generation service. Absent
/// configuration means tier 1 is skipped entirely.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("LLM_URL").ok()?;
        Some(LlmConfig {
            endpoint,
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            timeout_secs: 15,
        })
    }
}

// ============================================================================
// Tier 1: Language Model
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn build_prompt(query: &str, results: &[SearchResult]) -> String {
    let mut prompt = format!(
        "A user searched their personal notes for: \"{}\"\n\n\
        These notes matched:\n",
        query
    );
    for r in results {
        prompt.push_str(&format!("- {} (tags: {})\n  {}\n", r.title, r.tags.join(", "), r.preview));
    }
    prompt.push_str(
        "\nIn two or three sentences, explain to the user why these notes \
        are relevant to the search. Return only the explanation prose.",
    );
    prompt
}

/// Ask the language model for an explanation. Any failure (no route,
/// timeout, non-2xx, malformed body) yields None and the chain degrades.
pub async fn query_llm_explanation(
    config: &LlmConfig,
    query: &str,
    results: &[SearchResult],
) -> Option<String> {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(_) => return None,
    };

    let mut request = client.post(&config.endpoint).json(&serde_json::json!({
        "model": config.model,
        "messages": [{"role": "user", "content": build_prompt(query, results)}],
    }));
    if let Some(ref key) = config.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }

    let parsed: ChatResponse = response.json().await.ok()?;
    let text = parsed.choices.into_iter().next()?.message.content;
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Tier 2: Rule-Based Template
// ============================================================================

/// Template explanation from what the query and the results visibly share.
/// Returns None when there is nothing to cite (no results, or no shared
/// terms and no tags).
pub fn rule_based_explanation(query: &str, results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let query_tokens = tokenize(query);

    // BTreeSet for stable ordering in the rendered sentence
    let mut shared_terms: BTreeSet<String> = BTreeSet::new();
    let mut tags: BTreeSet<String> = BTreeSet::new();
    for r in results {
        let note_tokens = tokenize(&format!("{} {}", r.title, r.preview));
        shared_terms.extend(query_tokens.intersection(&note_tokens).cloned());
        tags.extend(r.tags.iter().cloned());
    }

    if shared_terms.is_empty() && tags.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    if !shared_terms.is_empty() {
        let terms: Vec<String> = shared_terms.into_iter().collect();
        parts.push(format!("they share the terms: {}", terms.join(", ")));
    }
    if !tags.is_empty() {
        let tags: Vec<String> = tags.into_iter().collect();
        parts.push(format!("they are tagged: {}", tags.join(", ")));
    }

    Some(format!(
        "These {} notes matched your search because {}.",
        results.len(),
        parts.join(" and ")
    ))
}

// ============================================================================
// Tier 3: Generic Fallback
// ============================================================================

pub fn fallback_explanation() -> String {
    "These notes were ranked as the closest matches to your search.".to_string()
}

// ============================================================================
// Chain
// ============================================================================

/// Run the explanation chain over the top results. Always returns prose;
/// `error` records why a preferred tier was skipped over.
pub async fn explain_results(
    config: Option<&LlmConfig>,
    query: &str,
    results: &[SearchResult],
) -> Explanation {
    let top = &results[..results.len().min(EXPLAIN_RESULT_CAP)];

    let mut error = None;
    if let Some(config) = config {
        match query_llm_explanation(config, query, top).await {
            Some(text) => {
                return Explanation {
                    explanation: text,
                    method: ExplanationMethod::Llm,
                    error: None,
                }
            }
            None => error = Some("language model unavailable".to_string()),
        }
    }

    if let Some(text) = rule_based_explanation(query, top) {
        return Explanation {
            explanation: text,
            method: ExplanationMethod::RuleBased,
            error,
        };
    }

    Explanation {
        explanation: fallback_explanation(),
        method: ExplanationMethod::Fallback,
        error,
    }
}

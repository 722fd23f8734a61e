//! Note loading and text processing.
//!
//! This module handles all operations on note files:
//! - Frontmatter parsing (YAML-like format: id, title, tags, created)
//! - File system scanning and parallel loading
//! - Preview generation for search results and map tooltips
//! - Word tokenization used by keyword scoring

use crate::models::Note;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

// ============================================================================
// Frontmatter Parsing
// ============================================================================

#[derive(Debug, Default)]
pub struct Frontmatter {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub created: Option<NaiveDate>,
}

pub fn parse_frontmatter(content: &str) -> (Frontmatter, String) {
    let mut fm = Frontmatter::default();
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() || lines[0].trim() != "---" {
        return (fm, content.to_string());
    }

    let mut end_idx = None;
    for (i, line) in lines.iter().enumerate().skip(1) {
        if line.trim() == "---" {
            end_idx = Some(i);
            break;
        }
    }

    let end_idx = match end_idx {
        Some(i) => i,
        None => return (fm, content.to_string()),
    };

    let mut in_tag_block = false;

    for line in &lines[1..end_idx] {
        let trimmed = line.trim();

        if in_tag_block {
            if let Some(tag) = trimmed.strip_prefix("- ") {
                let tag = tag.trim();
                if !tag.is_empty() {
                    fm.tags.push(tag.to_string());
                }
                continue;
            }
            in_tag_block = false;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "id" => fm.id = value.parse().ok(),
                "title" => fm.title = Some(value.to_string()),
                "created" | "date" => {
                    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                        fm.created = Some(date);
                    }
                }
                "tags" => {
                    if value.is_empty() {
                        in_tag_block = true;
                    } else {
                        // Inline form: tags: rust, ideas
                        let value = value.trim_start_matches('[').trim_end_matches(']');
                        fm.tags.extend(
                            value
                                .split(',')
                                .map(|t| t.trim().to_string())
                                .filter(|t| !t.is_empty()),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fm.tags.sort();
    fm.tags.dedup();

    let body = lines[end_idx + 1..].join("\n");
    (fm, body)
}

// ============================================================================
// Id Generation
// ============================================================================

/// Deterministic id for notes whose frontmatter lacks an `id:` field,
/// derived from the relative path so it survives re-scans.
pub fn generate_id(path: &PathBuf) -> u64 {
    use sha2::Digest;
    let mut hasher = sha2::Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    u64::from_le_bytes([
        result[0], result[1], result[2], result[3], result[4], result[5], result[6], result[7],
    ])
}

// ============================================================================
// Note Loading
// ============================================================================

pub fn load_note(path: &PathBuf, notes_dir: &PathBuf) -> Option<Note> {
    let content = fs::read_to_string(path).ok()?;
    let relative_path = path.strip_prefix(notes_dir).ok()?.to_path_buf();

    let (fm, body) = parse_frontmatter(&content);

    let id = fm.id.unwrap_or_else(|| generate_id(&relative_path));

    let title = fm.title.unwrap_or_else(|| {
        relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let metadata = fs::metadata(path).ok()?;
    let updated_at: DateTime<Utc> = metadata.modified().ok()?.into();
    let created_at = fm
        .created
        .and_then(|d| Utc.from_local_datetime(&d.and_hms_opt(0, 0, 0)?).single())
        .unwrap_or(updated_at);

    Some(Note {
        id,
        title,
        content: body,
        tags: fm.tags,
        created_at,
        updated_at,
        embedding: None,
    })
}

pub fn load_all_notes(notes_dir: &PathBuf) -> Vec<Note> {
    use rayon::prelude::*;

    let paths: Vec<PathBuf> = WalkDir::new(notes_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "md").unwrap_or(false))
        .map(|e| e.path().to_path_buf())
        .collect();

    let mut notes: Vec<Note> = paths
        .par_iter()
        .filter_map(|path| load_note(path, notes_dir))
        .collect();

    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
    notes
}

// ============================================================================
// Text Helpers
// ============================================================================

/// Single-line preview: first `n` characters of the content with newlines
/// flattened and a trailing ellipsis when truncated.
pub fn preview(text: &str, n: usize) -> String {
    let t: String = text.trim().replace('\n', " ");
    if t.chars().count() > n {
        let truncated: String = t.chars().take(n).collect();
        format!("{}…", truncated)
    } else {
        t
    }
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Lowercased word tokens with stop words and short words removed. Used by
/// keyword scoring and the rule-based explanation template.
pub fn tokenize(text: &str) -> HashSet<String> {
    let re = Regex::new(r"\b\w+\b").expect("valid regex");
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frontmatter_with_block_tags() {
        let content = "---\nid: 7\ntitle: Test Note\ntags:\n- rust\n- ideas\ncreated: 2024-03-01\n---\nBody text here.";
        let (fm, body) = parse_frontmatter(content);
        assert_eq!(fm.id, Some(7));
        assert_eq!(fm.title.as_deref(), Some("Test Note"));
        assert_eq!(fm.tags, vec!["ideas", "rust"]);
        assert_eq!(fm.created, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(body, "Body text here.");
    }

    #[test]
    fn parses_inline_tags_and_dedupes() {
        let content = "---\ntags: rust, ml, rust\n---\nx";
        let (fm, _) = parse_frontmatter(content);
        assert_eq!(fm.tags, vec!["ml", "rust"]);
    }

    #[test]
    fn content_without_frontmatter_passes_through() {
        let content = "Just a note.\nSecond line.";
        let (fm, body) = parse_frontmatter(content);
        assert!(fm.title.is_none());
        assert!(fm.tags.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn generated_ids_are_stable() {
        let path = PathBuf::from("subdir/note.md");
        assert_eq!(generate_id(&path), generate_id(&path));
        assert_ne!(generate_id(&path), generate_id(&PathBuf::from("other.md")));
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("short\nnote", 120), "short note");
        let long = "x".repeat(200);
        let p = preview(&long, 120);
        assert!(p.ends_with('…'));
        assert_eq!(p.chars().count(), 121);
    }

    #[test]
    fn tokenize_drops_stop_and_short_words() {
        let tokens = tokenize("The cat sat on the mat with AI");
        assert!(tokens.contains("cat"));
        assert!(tokens.contains("sat"));
        assert!(tokens.contains("mat"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("on"));
        // "AI" is only two characters
        assert!(!tokens.contains("ai"));
    }
}

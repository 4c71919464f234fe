//! Keyword relevance selection over document chunks.
//!
//! Deliberately simple: lowercase substring matching, no ranking, no
//! embeddings. A chunk matches if it contains ANY query token; original
//! chunk order is always preserved. What happens when nothing matches is a
//! configuration decision, not hardcoded behavior — see [`FallbackPolicy`].

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Query tokens must be longer than this many characters to count.
const MIN_TOKEN_CHARS: usize = 3;

/// What to return when no chunk matches the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// The first `limit` chunks. The documented default.
    #[default]
    FirstN,
    /// First, middle, and last chunk — a structural sample suited to
    /// "give me an overview" style questions.
    StructuralSample,
    /// Nothing.
    Empty,
}

impl FallbackPolicy {
    /// Parse a policy name as it appears in configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "first_n" => Some(Self::FirstN),
            "structural_sample" => Some(Self::StructuralSample),
            "empty" => Some(Self::Empty),
            _ => None,
        }
    }
}

/// Select at most `limit` chunks relevant to `query`, preserving original
/// chunk order. Falls back per `policy` when nothing matches. Never fails:
/// an empty chunk list or empty query yields an empty vector.
pub fn select_relevant(
    chunks: &[String],
    query: &str,
    limit: usize,
    policy: FallbackPolicy,
) -> Vec<String> {
    if chunks.is_empty() || query.trim().is_empty() || limit == 0 {
        return Vec::new();
    }

    let query_lower = query.to_lowercase();
    let tokens: Vec<&str> = query_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .collect();

    let matches: Vec<String> = chunks
        .iter()
        .filter(|chunk| {
            let chunk_lower = chunk.to_lowercase();
            tokens.iter().any(|t| chunk_lower.contains(t))
        })
        .take(limit)
        .cloned()
        .collect();

    if !matches.is_empty() {
        return matches;
    }

    debug!(?policy, chunk_count = chunks.len(), "No chunk matched query, applying fallback");
    match policy {
        FallbackPolicy::FirstN => chunks.iter().take(limit).cloned().collect(),
        FallbackPolicy::StructuralSample => {
            let mut indices = vec![0, chunks.len() / 2, chunks.len() - 1];
            indices.dedup();
            indices.into_iter().map(|i| chunks[i].clone()).collect()
        }
        FallbackPolicy::Empty => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matching_preserves_original_order() {
        let c = chunks(&[
            "выручка выросла",
            "расходы сократились",
            "выручка за квартал",
            "прогноз на год",
        ]);
        let result = select_relevant(&c, "какая выручка?", 10, FallbackPolicy::Empty);
        assert_eq!(result, chunks(&["выручка выросла", "выручка за квартал"]));
    }

    #[test]
    fn limit_caps_matches() {
        let c = chunks(&["data one", "data two", "data three"]);
        let result = select_relevant(&c, "show data", 2, FallbackPolicy::Empty);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], "data one");
    }

    #[test]
    fn short_tokens_are_ignored()  {
        // every token here is ≤ 3 chars, so nothing can match
        let c = chunks(&["big cat sat"]);
        let result = select_relevant(&c, "cat sat on a big rug", 5, FallbackPolicy::Empty);
        assert!(result.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = chunks(&["Quarterly REVENUE report"]);
        let result = select_relevant(&c, "revenue", 5, FallbackPolicy::Empty);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn empty_inputs_yield_empty() {
        assert!(select_relevant(&[], "query", 5, FallbackPolicy::FirstN).is_empty());
        let c = chunks(&["chunk"]);
        assert!(select_relevant(&c, "   ", 5, FallbackPolicy::FirstN).is_empty());
        assert!(select_relevant(&c, "query", 0, FallbackPolicy::FirstN).is_empty());
    }

    #[test]
    fn fallback_first_n() {
        let c = chunks(&["one", "two", "three", "four"]);
        let result = select_relevant(&c, "совершенно unrelated", 2, FallbackPolicy::FirstN);
        assert_eq!(result, chunks(&["one", "two"]));
    }

    #[test]
    fn fallback_structural_sample_is_first_middle_last() {
        let c = chunks(&["one", "two", "three", "four"]);
        let result =
            select_relevant(&c, "о чём файл", 3, FallbackPolicy::StructuralSample);
        assert_eq!(result, chunks(&["one", "three", "four"]));
    }

    #[test]
    fn fallback_structural_sample_single_chunk() {
        let c = chunks(&["only"]);
        let result = select_relevant(&c, "о чём файл", 3, FallbackPolicy::StructuralSample);
        assert_eq!(result, chunks(&["only"]));
    }

    #[test]
    fn fallback_empty() {
        let c = chunks(&["one", "two"]);
        assert!(select_relevant(&c, "ничего общего", 2, FallbackPolicy::Empty).is_empty());
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!(FallbackPolicy::parse("first_n"), Some(FallbackPolicy::FirstN));
        assert_eq!(
            FallbackPolicy::parse("structural_sample"),
            Some(FallbackPolicy::StructuralSample)
        );
        assert_eq!(FallbackPolicy::parse("empty"), Some(FallbackPolicy::Empty));
        assert_eq!(FallbackPolicy::parse("last_n"), None);
    }
}

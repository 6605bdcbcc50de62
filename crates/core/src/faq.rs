//! FAQ lookup: an exact/substring pass first, then keyword-overlap scoring.
//!
//! Scoring weights keyword hits over question-word hits over answer-word
//! hits (3/2/1). Ties resolve to store order, so ranking is deterministic
//! for equal scores.

use std::collections::HashSet;

use crate::domain::knowledge::KnowledgeBaseEntry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedFaq<'a> {
    pub entry: &'a KnowledgeBaseEntry,
    pub score: u32,
}

/// Find the best answer for a free-text query, or `None` when nothing in the
/// knowledge base relates to it.
pub fn search<'a>(entries: &'a [KnowledgeBaseEntry], query: &str) -> Option<&'a KnowledgeBaseEntry> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let needle = query.to_lowercase();
    if let Some(entry) = entries.iter().filter(|entry| entry.is_active).find(|entry| {
        entry.question.to_lowercase().contains(&needle)
            || entry.answer.to_lowercase().contains(&needle)
    }) {
        return Some(entry);
    }

    rank(entries, query, 1).into_iter().next().map(|ranked| ranked.entry)
}

/// Score active entries against the query and return the top `limit`,
/// highest score first.
pub fn rank<'a>(
    entries: &'a [KnowledgeBaseEntry],
    query: &str,
    limit: usize,
) -> Vec<RankedFaq<'a>> {
    let query_words: HashSet<String> =
        query.to_lowercase().split_whitespace().map(str::to_owned).collect();
    if query_words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<RankedFaq<'a>> = entries
        .iter()
        .filter(|entry| entry.is_active)
        .filter_map(|entry| {
            let score = score_entry(entry, &query_words);
            (score > 0).then_some(RankedFaq { entry, score })
        })
        .collect();

    // Stable sort keeps store order among equal scores.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}

fn score_entry(entry: &KnowledgeBaseEntry, query_words: &HashSet<String>) -> u32 {
    let keyword_hits = entry
        .keywords
        .iter()
        .filter(|keyword| query_words.contains(&keyword.to_lowercase()))
        .count() as u32;
    let question_hits = overlap(&entry.question, query_words);
    let answer_hits = overlap(&entry.answer, query_words);

    keyword_hits * 3 + question_hits * 2 + answer_hits
}

fn overlap(text: &str, query_words: &HashSet<String>) -> u32 {
    let words: HashSet<String> =
        text.to_lowercase().split_whitespace().map(str::to_owned).collect();
    words.iter().filter(|word| query_words.contains(*word)).count() as u32
}

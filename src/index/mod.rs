//! Indexing: text to lemmatized term counts, written as postings
//!
//! This module handles:
//! - Normalizing and tokenizing page text
//! - Tagging and lemmatizing tokens
//! - The bounded indexing pipeline fed by fetch workers
//! - Running queries against the postings

mod lemmatizer;
mod pipeline;
mod tokenizer;

pub use lemmatizer::{lemmatize, lemmatize_tokens, tag, Pos};
pub use pipeline::{
    index_channel, index_record, IndexIntake, IndexOutcome, IndexPipeline, IndexRecord, IndexStats,
};
pub use tokenizer::{is_stopword, normalize_text, tokenize, MAX_TOKEN_CHARS};

use crate::storage::{self, SearchHit, SharedStorage};
use crate::DriftnetError;
use std::collections::HashMap;

/// Counts lemmatized terms in `text`
pub fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in lemmatize_tokens(&tokenize(text)) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Runs `query` through the indexing tokenizer and searches the postings
///
/// # Arguments
///
/// * `storage` - Store holding pages and postings
/// * `query` - Free text, tokenized and lemmatized like page text
/// * `require_all` - Only return pages containing every query term
/// * `limit` - Maximum number of hits
///
/// # Returns
///
/// Hits ordered by rank, then by total term count. A query with no indexable
/// terms returns no hits.
pub fn search(
    storage: &SharedStorage,
    query: &str,
    require_all: bool,
    limit: usize,
) -> Result<Vec<SearchHit>, DriftnetError> {
    let terms = lemmatize_tokens(&tokenize(query));
    if terms.is_empty() {
        return Ok(Vec::new());
    }
    let hits = storage::lock(storage)?.search(&terms, require_all, limit)?;
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{share, SqliteStorage};

    #[test]
    fn test_term_counts_scenario() {
        let counts = term_counts("The cat sat");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("cat"), Some(&1));
        assert_eq!(counts.get("sat"), Some(&1));
    }

    #[test]
    fn test_term_counts_deterministic() {
        let text = "Spiders crawled the web, crawling pages; the pages linked back.";
        assert_eq!(term_counts(text), term_counts(text));
        assert_eq!(term_counts(text).get("page"), Some(&2));
    }

    #[test]
    fn test_search_uses_lemmas() {
        let storage = share(SqliteStorage::new_in_memory().unwrap());
        index_record(
            &storage,
            &IndexRecord {
                url: "https://a.com/".to_string(),
                title: "Cats".to_string(),
                description: String::new(),
                outgoing: Vec::new(),
                text: "cat cat dog".to_string(),
            },
        );
        index_record(
            &storage,
            &IndexRecord {
                url: "https://b.com/".to_string(),
                title: "Dogs".to_string(),
                description: String::new(),
                outgoing: Vec::new(),
                text: "dog".to_string(),
            },
        );

        let any = search(&storage, "Cats and dogs", false, 10).unwrap();
        assert_eq!(any.len(), 2);
        assert_eq!(any[0].url, "https://a.com/");
        assert_eq!(any[0].match_count, 2);
        assert_eq!(any[0].total_word_count, 3);

        let all = search(&storage, "cats dogs", true, 10).unwrap();
        assert_eq!(all.len(), 1);

        assert!(search(&storage, "the and", false, 10).unwrap().is_empty());
    }
}

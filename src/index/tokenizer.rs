//! Text normalization and tokenization for indexing
//!
//! Normalization collapses whitespace, removes punctuation (ASCII plus the
//! typographic apostrophe) and lowercases. Tokens come from unicode word
//! segmentation; stopwords and tokens longer than [`MAX_TOKEN_CHARS`] are
//! dropped.

use unicode_segmentation::UnicodeSegmentation;

/// Tokens with more characters than this are dropped
pub const MAX_TOKEN_CHARS: usize = 30;

/// English stopwords, apostrophe-free forms only since punctuation is
/// removed before the lookup
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn",
    "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan",
    "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Checks if a lowercase word is a stopword
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Collapses whitespace, strips punctuation and lowercases
pub fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '\u{2019}')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalizes and splits `text` into indexable tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .unicode_words()
        .filter(|word| word.chars().count() <= MAX_TOKEN_CHARS)
        .filter(|word| !is_stopword(word))
        .map(String::from)
        .collect()
}

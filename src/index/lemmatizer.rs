//! Part-of-speech tagging and lemmatization
//!
//! Both are rule based. A token is tagged as a verb when it is a known
//! irregular verb form, when it follows a modal, or when it carries an
//! `-ing`/`-ed` suffix; everything else is a noun. Nouns lose plural
//! suffixes and verbs lose inflection suffixes.

/// Coarse part of speech used to pick a lemmatization rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Noun,
    Verb,
}

/// Modals that survive stopword removal and mark the next token as a verb
const MODALS: &[&str] = &["would", "could", "might", "must", "may", "shall", "ought"];

/// Irregular verb forms and their base form
const IRREGULAR_VERBS: &[(&str, &str)] = &[
    ("began", "begin"),
    ("begun", "begin"),
    ("bought", "buy"),
    ("brought", "bring"),
    ("built", "build"),
    ("came", "come"),
    ("caught", "catch"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("drew", "draw"),
    ("drawn", "draw"),
    ("drove", "drive"),
    ("driven", "drive"),
    ("ate", "eat"),
    ("eaten", "eat"),
    ("fell", "fall"),
    ("fallen", "fall"),
    ("felt", "feel"),
    ("found", "find"),
    ("flew", "fly"),
    ("flown", "fly"),
    ("forgot", "forget"),
    ("forgotten", "forget"),
    ("gave", "give"),
    ("given", "give"),
    ("went", "go"),
    ("gone", "go"),
    ("grew", "grow"),
    ("grown", "grow"),
    ("held", "hold"),
    ("kept", "keep"),
    ("knew", "know"),
    ("known", "know"),
    ("led", "lead"),
    ("left", "leave"),
    ("lost", "lose"),
    ("made", "make"),
    ("meant", "mean"),
    ("met", "meet"),
    ("paid", "pay"),
    ("ran", "run"),
    ("rode", "ride"),
    ("ridden", "ride"),
    ("rose", "rise"),
    ("risen", "rise"),
    ("said", "say"),
    ("saw", "see"),
    ("seen", "see"),
    ("sent", "send"),
    ("sold", "sell"),
    ("spent", "spend"),
    ("spoke", "speak"),
    ("spoken", "speak"),
    ("stood", "stand"),
    ("took", "take"),
    ("taken", "take"),
    ("taught", "teach"),
    ("thought", "think"),
    ("told", "tell"),
    ("understood", "understand"),
    ("woke", "wake"),
    ("wrote", "write"),
    ("written", "write"),
];

/// Irregular noun plurals and their singular form
const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "person"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
];

fn lookup(table: &[(&str, &'static str)], word: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(form, _)| *form == word)
        .map(|(_, base)| *base)
}

fn is_vowel(c: u8) -> bool {
    matches!(c, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Tags each token with a part of speech
pub fn tag(tokens: &[String]) -> Vec<Pos> {
    let mut tags = Vec::with_capacity(tokens.len());
    let mut after_modal = false;

    for token in tokens {
        let word = token.as_str();
        let pos = if after_modal || lookup(IRREGULAR_VERBS, word).is_some() || has_verb_suffix(word)
        {
            Pos::Verb
        } else {
            Pos::Noun
        };
        after_modal = MODALS.contains(&word);
        tags.push(pos);
    }

    tags
}

fn has_verb_suffix(word: &str) -> bool {
    word.len() > 4 && (word.ends_with("ing") || word.ends_with("ed"))
}

/// Reduces a lowercase token to its base form for the given part of speech
pub fn lemmatize(word: &str, pos: Pos) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    match pos {
        Pos::Noun => lemmatize_noun(word),
        Pos::Verb => lemmatize_verb(word),
    }
}

fn lemmatize_noun(word: &str) -> String {
    if let Some(base) = lookup(IRREGULAR_NOUNS, word) {
        return base.to_string();
    }
    if word.len() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

fn lemmatize_verb(word: &str) -> String {
    if let Some(base) = lookup(IRREGULAR_VERBS, word) {
        return base.to_string();
    }
    if word.len() > 4 {
        if let Some(stem) = word.strip_suffix("ing") {
            return restore_stem(stem);
        }
        if let Some(stem) = word.strip_suffix("ied") {
            return format!("{}y", stem);
        }
        if let Some(stem) = word.strip_suffix("ed") {
            return restore_stem(stem);
        }
    }
    if word.len() > 3 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
        for suffix in ["sses", "xes", "ches", "shes", "zes"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        if !word.ends_with("ss") {
            if let Some(stem) = word.strip_suffix('s') {
                return stem.to_string();
            }
        }
    }
    word.to_string()
}

/// Repairs a stem left after removing `-ing` or `-ed`
///
/// A doubled final consonant is undoubled (`stopp` to `stop`) unless it is
/// one that English keeps doubled. Short consonant-vowel-consonant stems
/// and stems ending in `v` regain a silent `e` (`mak` to `make`).
fn restore_stem(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();

    if n >= 2 && bytes[n - 1] == bytes[n - 2] && !is_vowel(bytes[n - 1]) {
        if matches!(bytes[n - 1], b'l' | b's' | b'z' | b'f') {
            return stem.to_string();
        }
        return stem[..n - 1].to_string();
    }

    let short_cvc = n == 3
        && !is_vowel(bytes[0])
        && is_vowel(bytes[1])
        && !is_vowel(bytes[2])
        && !matches!(bytes[2], b'w' | b'x' | b'y');
    if short_cvc || n <= 2 || stem.ends_with('v') {
        return format!("{}e", stem);
    }

    stem.to_string()
}

/// Tags and lemmatizes a token sequence
pub fn lemmatize_tokens(tokens: &[String]) -> Vec<String> {
    tag(tokens)
        .into_iter()
        .zip(tokens)
        .map(|(pos, token)| lemmatize(token, pos))
        .collect()
}

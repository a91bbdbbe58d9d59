//! Name comparison helpers shared by the textual heuristics.
//!
//! Names are split into word tokens (on separators, otherwise on camel-case
//! boundaries), normalized to lowercase alphanumerics and compared under a
//! [`PreprocessingMethod`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use rust_stemmers::{Algorithm, Stemmer};

use crate::core::types::PreprocessingMethod;

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// Drops every non-word character and lowercases the rest.
pub fn preprocess(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Splits on separators when the name has any, otherwise on case boundaries.
pub fn split(name: &str) -> Vec<String> {
    let parts: Vec<&str> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() > 1 {
        return parts.into_iter().map(str::to_string).collect();
    }
    split_case(name)
}

// a boundary sits before an uppercase letter that follows a lowercase one,
// or before an uppercase letter that starts a lowercase run (HTTPServer -> HTTP|Server)
fn split_case(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && c.is_ascii_uppercase()
            && (chars[i - 1].is_ascii_lowercase()
                || chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase()));
        if boundary && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split and normalized tokens of a name; empty tokens are dropped.
pub fn tokens(name: &str) -> Vec<String> {
    split(name)
        .iter()
        .map(|s| preprocess(s))
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn word_count(name: &str) -> usize {
    tokens(name).len()
}

fn lemma(word: &str) -> String {
    // rule-based noun lemmas; irregular plurals are out of reach without a dictionary
    if let Some(stem) = word.strip_suffix("ies").filter(|s| s.len() > 1) {
        return format!("{stem}y");
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && word.len() > 3 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Whether two (already concatenated) names are equal under `method`.
pub fn are_equal(a: &str, b: &str, method: PreprocessingMethod) -> bool {
    let (a, b) = (preprocess(a), preprocess(b));
    match method {
        PreprocessingMethod::None => a == b,
        PreprocessingMethod::Stemming => STEMMER.stem(&a) == STEMMER.stem(&b),
        PreprocessingMethod::Lemmatization => lemma(&a) == lemma(&b),
    }
}

fn contiguous_sublists<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    let n = items.len();
    (1..=n).flat_map(move |len| (0..=n - len).map(move |start| &items[start..start + len]))
}

/// Whether `a` equals the concatenation of some contiguous run of `names`.
pub fn is_contained(a: &str, names: &[String], method: PreprocessingMethod) -> bool {
    let a = preprocess(a);
    if a.is_empty() {
        return false;
    }
    contiguous_sublists(names).any(|run| are_equal(&a, &run.concat(), method))
}

/// Whether the whole name `a` appears, on word boundaries, in the name `b`.
pub fn is_name_contained(a: &str, b: &str, method: PreprocessingMethod) -> bool {
    is_contained(a, &tokens(b), method)
}

/// `I`-prefixed interface names (`IOrderService`) compared without the prefix.
pub fn is_interface_contained(interface_name: &str, other: &str, method: PreprocessingMethod) -> bool {
    match strip_interface_prefix(interface_name) {
        Some(rest) => is_name_contained(rest, other, method),
        None => false,
    }
}

pub fn strip_interface_prefix(name: &str) -> Option<&str> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_ascii_uppercase() => Some(&name[1..]),
        _ => None,
    }
}

/// Length of the longest run of `name`'s tokens found in `names`, divided by
/// the token count of `name`. Zero when `name` has no tokens.
pub fn contained_ratio(name: &str, names: &[String], method: PreprocessingMethod) -> f64 {
    let split = tokens(name);
    if split.is_empty() {
        return 0.0;
    }
    let names: Vec<String> = names.iter().map(|n| preprocess(n)).collect();
    let best = contiguous_sublists(&split)
        .filter(|run| is_contained(&run.concat(), &names, method))
        .map(<[String]>::len)
        .max()
        .unwrap_or(0);
    best as f64 / split.len() as f64
}

/// `min(1, words(a) / words(b))`, or `None` when `b` has no words.
pub fn word_ratio(a: &str, b: &str) -> Option<f64> {
    match word_count(b) {
        0 => None,
        wb => Some((word_count(a) as f64 / wb as f64).min(1.0)),
    }
}

/// Tokens of `name` without the given words.
pub fn remove_words(name: &str, words: &BTreeSet<String>) -> Vec<String> {
    let words: BTreeSet<String> = words.iter().map(|w| preprocess(w)).collect();
    tokens(name).into_iter().filter(|t| !words.contains(t)).collect()
}

/// Package depths (prefix lengths of `containment`) whose inclusion strictly
/// raises the stemmed contained ratio of `name`, shallowest first.
///
/// The outermost package is never reported on its own.
pub fn matched_packages(name: &str, containment: &[String]) -> Vec<usize> {
    let similarity = contained_ratio(name, containment, PreprocessingMethod::Stemming);
    if similarity == 0.0 {
        return Vec::new();
    }
    let mut matched = Vec::new();
    for i in (1..containment.len()).rev() {
        let shorter = contained_ratio(name, &containment[..i], PreprocessingMethod::Stemming);
        if shorter < similarity {
            matched.push(i + 1);
        }
        if shorter == 0.0 {
            break;
        }
    }
    matched.reverse();
    matched
}

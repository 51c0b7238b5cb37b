use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};

/// Contractions whose `'s`/`'m` suffix expands to a form of "to be"
/// rather than a possessive.
const IRREGULAR_CONTRACTIONS: [&str; 9] = [
    "i'm", "he's", "she's", "it's", "what's", "when's", "where's", "how's", "why's",
];

/// Conjugations of "to be" (plus the "wo"/"will" fragments left behind by
/// suffix stripping) that collapse to the single root form "be".
const BE_FORMS: [&str; 8] = ["am", "is", "are", "will", "was", "were", "been", "wo"];

/// Expands contractions and stems tokens into keyword root forms. The same
/// pipeline runs at index time and at query time so both sides agree on
/// what a term looks like.
pub struct TermNormalizer {
    stemmer: Stemmer,
}

impl Default for TermNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TermNormalizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Splits body text into raw tokens: runs of letters and apostrophes
    /// (kept only when they contain at least one letter) and runs of ASCII
    /// digits. Everything else is a separator.
    pub fn tokenize(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut has_letter = false;
        let mut in_digits = false;

        for ch in text.chars() {
            if ch.is_alphabetic() || ch == '\'' {
                if in_digits {
                    tokens.push(std::mem::take(&mut current));
                    in_digits = false;
                }
                current.push(ch);
                has_letter |= ch != '\'';
            } else if ch.is_ascii_digit() {
                if !current.is_empty() && !in_digits {
                    if has_letter {
                        tokens.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                    has_letter = false;
                }
                in_digits = true;
                current.push(ch);
            } else {
                if !current.is_empty() && (has_letter || in_digits) {
                    tokens.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                has_letter = false;
                in_digits = false;
            }
        }
        if !current.is_empty() && (has_letter || in_digits) {
            tokens.push(current);
        }
        tokens
    }

    /// Normalizes one raw token into zero or more root forms. Synthetic
    /// terms produced by contraction expansion come before the stem of the
    /// remaining token; duplicates within one token are removed.
    pub fn normalize_token(&self, token: &str) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        let lower = token.to_lowercase();
        let mut working = lower.clone();

        if IRREGULAR_CONTRACTIONS.contains(&lower.as_str()) {
            // "it's" carries "it is", not a possessive
            working.truncate(working.len() - 2);
            terms.push("be".to_string());
        } else if lower.ends_with("n't") {
            working.truncate(working.len() - 3);
            terms.push("not".to_string());
        } else if lower.ends_with("'ll") || lower.ends_with("'re") {
            working.truncate(working.len() - 3);
            terms.push("be".to_string());
        } else if lower.ends_with("'s") {
            working.truncate(working.len() - 2);
        } else if lower.ends_with("s'") {
            working.truncate(working.len() - 1);
        }

        if BE_FORMS.contains(&working.as_str()) {
            working = "be".to_string();
        }

        if !working.is_empty() {
            let stemmed = self.stemmer.stem(&working).into_owned();
            if !stemmed.is_empty() {
                terms.push(stemmed);
            }
        }

        let mut seen = HashSet::new();
        terms.retain(|t| seen.insert(t.clone()));
        terms
    }

    /// Tokenizes and normalizes a whole text, preserving per-token
    /// multiplicity (the caller counts occurrences).
    pub fn normalize_text(&self, text: &str) -> Vec<String> {
        Self::tokenize(text)
            .iter()
            .flat_map(|t| self.normalize_token(t))
            .collect()
    }
}

/// An insertion-ordered set of root forms, used by the query engine to
/// deduplicate terms across a whole phrase while keeping first-seen order.
#[derive(Debug, Default)]
pub struct TermSet {
    terms: Vec<String>,
    seen: HashSet<String>,
}

impl TermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a term; returns false if it was already present.
    pub fn insert(&mut self, term: String) -> bool {
        if self.seen.contains(&term) {
            return false;
        }
        self.seen.insert(term.clone());
        self.terms.push(term);
        true
    }

    pub fn contains(&self, term: &str) -> bool {
        self.seen.contains(term)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(token: &str) -> Vec<String> {
        TermNormalizer::new().normalize_token(token)
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let tokens = TermNormalizer::tokenize("Hello, world! It's 2024.");
        assert_eq!(tokens, vec!["Hello", "world", "It's", "2024"]);
    }

    #[test]
    fn test_tokenize_skips_bare_apostrophes() {
        let tokens = TermNormalizer::tokenize("'' one '' two''three");
        assert_eq!(tokens, vec!["one", "two''three"]);
    }

    #[test]
    fn test_tokenize_separates_digits_from_letters() {
        let tokens = TermNormalizer::tokenize("abc123def");
        assert_eq!(tokens, vec!["abc", "123", "def"]);
    }

    #[test]
    fn test_negation_contraction() {
        assert_eq!(norm("isn't"), vec!["not", "be"]);
        assert_eq!(norm("don't"), vec!["not", "do"]);
    }

    #[test]
    fn test_wont_collapses_to_not_be() {
        // "won't" strips to "wo", which is treated as a form of "will"
        assert_eq!(norm("won't"), vec!["not", "be"]);
    }

    #[test]
    fn test_future_and_present_contractions() {
        assert_eq!(norm("you'll"), vec!["be", "you"]);
        assert_eq!(norm("we're"), vec!["be", "we"]);
    }

    #[test]
    fn test_irregular_contractions_expand_to_be() {
        assert_eq!(norm("it's"), vec!["be", "it"]);
        assert_eq!(norm("I'm"), vec!["be", "i"]);
        assert_eq!(norm("what's"), vec!["be", "what"]);
    }

    #[test]
    fn test_possessive_is_stripped() {
        assert_eq!(norm("Boston's"), vec!["boston"]);
        assert_eq!(norm("dogs'"), vec!["dog"]);
    }

    #[test]
    fn test_be_forms_collapse() {
        assert_eq!(norm("is"), vec!["be"]);
        assert_eq!(norm("were"), vec!["be"]);
        assert_eq!(norm("will"), vec!["be"]);
    }

    #[test]
    fn test_plain_token_is_stemmed_lowercase() {
        assert_eq!(norm("Running"), vec!["run"]);
        assert_eq!(norm("searches"), vec!["search"]);
    }

    #[test]
    fn test_numeric_token_passes_through() {
        assert_eq!(norm("2024"), vec!["2024"]);
    }

    #[test]
    fn test_term_set_dedups_in_order() {
        let mut set = TermSet::new();
        assert!(set.insert("b".to_string()));
        assert!(set.insert("a".to_string()));
        assert!(!set.insert("b".to_string()));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(set.len(), 2);
    }
}

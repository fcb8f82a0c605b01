//! Lexical relevance scoring.
//!
//! A question is lower-cased and split into maximal runs of the term
//! alphabet (Latin, Cyrillic, `.`). Terms shorter than `min_term_len`
//! characters are dropped. A document's score is the sum, over every
//! surviving term occurrence in the question, of the number of
//! non-overlapping occurrences of that term in the lower-cased body.
//!
//! ```text
//! "Как создать сделку в Bitrix24?"
//!   → ["как", "создать", "сделку", "в", "bitrix"]
//!   → ["создать", "сделку", "bitrix"]          (len ≥ 4)
//! ```

use docbot_config::DEFAULT_TERM_PATTERN;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Terms of three characters or fewer carry no signal.
pub const DEFAULT_MIN_TERM_LEN: usize = 4;

static DEFAULT_SCORER: LazyLock<Scorer> = LazyLock::new(Scorer::default);

/// Tokenizes questions and counts term occurrences in document bodies.
#[derive(Debug, Clone)]
pub struct Scorer {
    pattern: Regex,
    min_term_len: usize,
}

impl Scorer {
    /// Build a scorer from a term regex and a minimum term length in chars.
    pub fn new(term_pattern: &str, min_term_len: usize) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            pattern: Regex::new(term_pattern)?,
            min_term_len,
        })
    }

    pub fn min_term_len(&self) -> usize {
        self.min_term_len
    }

    /// Question terms in question order, repeats included.
    pub fn terms(&self, question: &str) -> Vec<String> {
        let lowered = question.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|term| term.chars().count() >= self.min_term_len)
            .map(String::from)
            .collect()
    }

    /// Score a body against terms produced by [`Scorer::terms`].
    pub fn score_terms(&self, terms: &[String], body: &str) -> u64 {
        if terms.is_empty() {
            return 0;
        }
        let body = body.to_lowercase();
        terms
            .iter()
            .map(|term| body.matches(term.as_str()).count() as u64)
            .sum()
    }

    /// Score one document body against a question.
    pub fn score(&self, question: &str, body: &str) -> u64 {
        self.score_terms(&self.terms(question), body)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_TERM_PATTERN).expect("default term pattern compiles"),
            min_term_len: DEFAULT_MIN_TERM_LEN,
        }
    }
}

/// Score `body` against `question` with the default alphabet and threshold.
pub fn score_document(question: &str, body: &str) -> u64 {
    DEFAULT_SCORER.score(question, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilingual_question_terms() {
        let terms = Scorer::default().terms("Как создать сделку в Bitrix24?");
        assert_eq!(terms, vec!["создать", "сделку", "bitrix"]);
    }

    #[test]
    fn scoring_example_counts_each_occurrence() {
        let body = "Чтобы создать сделку, вызовите метод. Сделку можно изменить. \
                    Удалить сделку нельзя.";
        assert_eq!(score_document("Как создать сделку в Bitrix24?", body), 4);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(score_document("DEAL", "deal Deal DEAL"), 3);
    }

    #[test]
    fn short_terms_are_ignored() {
        assert_eq!(score_document("как в api", "как в api как в api"), 0);
    }

    #[test]
    fn repeated_question_terms_count_twice() {
        assert_eq!(score_document("lead lead", "one lead here"), 2);
    }

    #[test]
    fn periods_are_part_of_terms() {
        let scorer = Scorer::default();
        assert_eq!(scorer.terms("crm.deal.add?"), vec!["crm.deal.add"]);
        assert_eq!(scorer.score("crm.deal.add", "call crm.deal.add or crm.deal.list"), 1);
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(score_document("aaaa", "aaaaaa"), 1);
        assert_eq!(score_document("aaaa", "aaaaaaaa"), 2);
    }

    #[test]
    fn empty_question_scores_zero() {
        assert_eq!(score_document("", "anything at all"), 0);
        assert_eq!(score_document("?!, 123", "anything at all"), 0);
    }

    #[test]
    fn digits_split_terms() {
        let terms = Scorer::default().terms("bitrix24rest");
        assert_eq!(terms, vec!["bitrix", "rest"]);
    }

    #[test]
    fn custom_threshold_and_alphabet() {
        let scorer = Scorer::new("[a-z0-9]+", 2).unwrap();
        assert_eq!(scorer.min_term_len(), 2);
        assert_eq!(scorer.terms("v2 of api"), vec!["v2", "of", "api"]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(Scorer::new("(unclosed", 4).is_err());
    }
}

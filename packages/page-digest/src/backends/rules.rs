//! Rule-based language model.
//!
//! Splits sentences on terminal punctuation, tokenizes on letter/digit runs,
//! and tags entities with surface patterns: honorifics mark people, company
//! suffixes mark organizations, a small gazetteer marks places. It needs no
//! model files, at the cost of recall: anything capitalized that matches no
//! cue is tagged `MISC`.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::traits::language::{AnalyzedText, LanguageModel, Sentence};
use crate::types::entity::EntitySpan;

lazy_static! {
    // Sentence terminator followed by whitespace or end of text
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+(?:\s+|$)").unwrap();

    // Word tokens: letter/digit runs with inner apostrophes and hyphens
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}](?:[\p{L}\p{N}'’\-]*[\p{L}\p{N}])?").unwrap();

    // Runs of capitalized words, e.g. "Acme Widget Corp"
    static ref CAPITALIZED_RUN: Regex = Regex::new(
        r"\b\p{Lu}[\p{L}\p{N}'’\-]*(?:\s+\p{Lu}[\p{L}\p{N}'’\-]*)*"
    ).unwrap();

    // Currency amounts - $40, $1,200.50
    static ref MONEY: Regex = Regex::new(r"[$€£]\d[\d,]*(?:\.\d+)?").unwrap();

    // Percentages - 12%, 3.5%
    static ref PERCENT: Regex = Regex::new(r"\b\d+(?:\.\d+)?%").unwrap();

    // Ordinals - 1st, 22nd, third
    static ref ORDINAL: Regex = Regex::new(
        r"\b(?:\d+(?:st|nd|rd|th)|(?i:first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth))\b"
    ).unwrap();

    // Four-digit years 1500-2099
    static ref YEAR: Regex = Regex::new(r"\b(?:1[5-9]|20)\d{2}\b").unwrap();

    // Bare numbers
    static ref NUMBER: Regex = Regex::new(r"\b\d+\b").unwrap();

    // Title followed by a capitalized name - "Dr. Jane Smith"
    static ref HONORIFIC_NAME: Regex = Regex::new(
        r"\b(?:Mr|Mrs|Ms|Dr|Prof|Sen|Rep|Gov)\.?\s+(\p{Lu}[\p{L}'’\-]*(?:\s+\p{Lu}[\p{L}'’\-]*)*)"
    ).unwrap();
}

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sen", "Rep", "Gov", "St", "Jr", "Sr", "vs", "e.g", "i.e",
];

/// Places recognized without context.
const GAZETTEER: &[&str] = &[
    "America", "Australia", "Beijing", "Berlin", "Brazil", "California", "Canada", "Chicago",
    "China", "England", "France", "Germany", "India", "Italy", "Japan", "London", "Mexico",
    "Minneapolis", "Minnesota", "New York", "Paris", "Russia", "Spain", "Texas", "Tokyo",
    "United Kingdom", "United States", "Washington",
];

/// Capitalized words that start a sentence without naming anything.
const LEADING_STOPWORDS: &[&str] = &[
    "A", "After", "An", "And", "At", "Before", "But", "He", "Her", "His", "I", "If", "In",
    "It", "Its", "My", "Our", "On", "Or", "She", "That", "The", "Their", "These", "They",
    "This", "Those", "We", "When", "While", "You", "Your",
];

const ORG_SUFFIXES: &[&str] = &[
    "Inc", "Corp", "Corporation", "Ltd", "LLC", "Company", "Co", "Group", "University",
    "Institute", "Foundation",
];

const DATE_WORDS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday",
    "Saturday", "Sunday",
];

/// Regex-driven [`LanguageModel`] with no external resources.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedLanguageModel;

impl RuleBasedLanguageModel {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous analysis; the trait method delegates here.
    pub fn analyze_text(&self, text: &str) -> AnalyzedText {
        let mut analyzed = AnalyzedText::default();

        for sentence in split_sentences(text) {
            let tokens = tokenize(sentence);
            if tokens.is_empty() {
                continue;
            }
            analyzed.entities.extend(tag_entities(sentence));
            analyzed.sentences.push(Sentence::new(sentence, tokens));
        }

        analyzed
    }
}

#[async_trait]
impl LanguageModel for RuleBasedLanguageModel {
    async fn analyze(&self, text: &str) -> Result<AnalyzedText> {
        Ok(self.analyze_text(text))
    }
}

/// Split on terminal punctuation, keeping the punctuation with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let last_word = text[start..m.start()]
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default();
        if ABBREVIATIONS.contains(&last_word) {
            continue;
        }
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

pub fn tokenize(sentence: &str) -> Vec<String> {
    TOKEN
        .find_iter(sentence)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Entity spans of one sentence in order of appearance.
fn tag_entities(sentence: &str) -> Vec<EntitySpan> {
    // (start, end, text, label)
    let mut found: Vec<(usize, usize, String, &'static str)> = Vec::new();

    for m in MONEY.find_iter(sentence) {
        found.push((m.start(), m.end(), m.as_str().to_string(), "MONEY"));
    }
    for m in PERCENT.find_iter(sentence) {
        found.push((m.start(), m.end(), m.as_str().to_string(), "PERCENT"));
    }
    for m in ORDINAL.find_iter(sentence) {
        found.push((m.start(), m.end(), m.as_str().to_string(), "ORDINAL"));
    }
    for m in YEAR.find_iter(sentence) {
        found.push((m.start(), m.end(), m.as_str().to_string(), "DATE"));
    }
    for m in NUMBER.find_iter(sentence) {
        found.push((m.start(), m.end(), m.as_str().to_string(), "CARDINAL"));
    }
    for caps in HONORIFIC_NAME.captures_iter(sentence) {
        if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
            found.push((whole.start(), whole.end(), name.as_str().to_string(), "PERSON"));
        }
    }
    for m in CAPITALIZED_RUN.find_iter(sentence) {
        if let Some((text, label)) = classify_run(m.as_str()) {
            found.push((m.start(), m.end(), text, label));
        }
    }

    // Longest match wins at a position, then push order; overlaps are dropped
    found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut spans = Vec::new();
    let mut covered = 0;
    for (start, end, text, label) in found {
        if start < covered {
            continue;
        }
        covered = end;
        spans.push(EntitySpan::new(text, label));
    }
    spans
}

fn classify_run(run: &str) -> Option<(String, &'static str)> {
    let words: Vec<&str> = run
        .split_whitespace()
        .skip_while(|word| LEADING_STOPWORDS.contains(word))
        .map(|word| {
            word.trim_end_matches("'s")
                .trim_end_matches("’s")
        })
        .filter(|word| !word.is_empty())
        .collect();

    let last = *words.last()?;
    let text = words.join(" ");
    let label = if words.iter().all(|w| DATE_WORDS.contains(w)) {
        "DATE"
    } else if words.len() > 1 && ORG_SUFFIXES.contains(&last) {
        "ORG"
    } else if GAZETTEER.contains(&text.as_str()) {
        "GPE"
    } else {
        "MISC"
    };
    Some((text, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[EntitySpan]) -> Vec<(&str, &str)> {
        spans
            .iter()
            .map(|s| (s.text.as_str(), s.label.as_str()))
            .collect()
    }

    #[test]
    fn test_sentence_split_keeps_punctuation() {
        let sentences = split_sentences("One short line. Another line here!  A third? trailing");
        assert_eq!(
            sentences,
            vec!["One short line.", "Another line here!", "A third?", "trailing"]
        );
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        assert_eq!(split_sentences("Pi is 3.14 roughly.").len(), 1);
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(
            tokenize("Well-known, isn't it? (yes)"),
            vec!["Well-known", "isn't", "it", "yes"]
        );
    }

    #[test]
    fn test_tags_capitalized_runs_and_numbers() {
        let model = RuleBasedLanguageModel::new();
        let analyzed = model.analyze_text("Alice met Bob. Alice left 3 times.");

        assert_eq!(analyzed.sentences.len(), 2);
        assert_eq!(
            texts(&analyzed.entities),
            vec![
                ("Alice", "MISC"),
                ("Bob", "MISC"),
                ("Alice", "MISC"),
                ("3", "CARDINAL"),
            ]
        );
    }

    #[test]
    fn test_leading_stopword_and_org_suffix() {
        let spans = tag_entities("The Acme Widget Corp raised $40 in March, up 12%.");
        assert_eq!(
            texts(&spans),
            vec![
                ("Acme Widget Corp", "ORG"),
                ("$40", "MONEY"),
                ("March", "DATE"),
                ("12%", "PERCENT"),
            ]
        );
    }

    #[test]
    fn test_honorific_marks_person_and_does_not_split() {
        let model = RuleBasedLanguageModel::new();
        let analyzed = model.analyze_text("Dr. Jane Smith visited Paris. She stayed.");

        assert_eq!(analyzed.sentences.len(), 2);
        assert_eq!(
            texts(&analyzed.entities),
            vec![("Jane Smith", "PERSON"), ("Paris", "GPE")]
        );
    }

    #[test]
    fn test_years_and_ordinals() {
        let spans = tag_entities("In 1999 she came 2nd and then third of 40.");
        assert_eq!(
            texts(&spans),
            vec![
                ("1999", "DATE"),
                ("2nd", "ORDINAL"),
                ("third", "ORDINAL"),
                ("40", "CARDINAL"),
            ]
        );
    }

    #[test]
    fn test_stopword_only_run_skipped() {
        assert!(tag_entities("The end.").is_empty());
    }

    #[tokio::test]
    async fn test_trait_matches_sync_analysis() {
        let model = RuleBasedLanguageModel::new();
        let text = "Paris is in France. It rains.";
        assert_eq!(model.analyze(text).await.unwrap(), model.analyze_text(text));
    }
}

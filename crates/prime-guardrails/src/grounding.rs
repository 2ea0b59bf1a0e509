//! Grounding of model output against reference documents

use crate::config::GroundingConfig;
use crate::types::{Finding, FindingKind};
use std::collections::HashSet;

/// Share of a sentence's content words that must appear in the references
const SENTENCE_SUPPORT_THRESHOLD: f32 = 0.5;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "who", "did", "yes", "she",
    "too", "use", "that", "with", "have", "this", "will", "your", "from", "they", "been", "were",
    "what", "when", "which", "there", "their", "would", "could", "should", "about", "into",
    "than", "then", "them", "these", "those", "also", "such", "some", "more", "most", "very",
    "just", "only", "other", "over", "each", "does", "here", "where", "while",
];

/// A sentence of model output and whether the references back it
#[derive(Debug, Clone)]
pub struct SentenceSupport {
    /// Sentence text, trimmed
    pub text: String,
    /// Byte offset in the output
    pub start: usize,
    /// Byte offset one past the end
    pub end: usize,
    /// Fraction of content words found in the references
    pub overlap: f32,
    /// Whether the overlap met the threshold
    pub supported: bool,
}

/// Result of a grounding check
#[derive(Debug, Clone)]
pub struct GroundingReport {
    /// Whether the check ran (references present and enabled)
    pub checked: bool,
    /// supported / total sentences
    pub support_ratio: f32,
    /// Whether the ratio met `min_support`
    pub grounded: bool,
    /// Per-sentence breakdown
    pub sentences: Vec<SentenceSupport>,
}

impl GroundingReport {
    fn skipped() -> Self {
        Self {
            checked: false,
            support_ratio: 1.0,
            grounded: true,
            sentences: vec![],
        }
    }

    /// Unsupported sentences as guard findings
    pub fn findings(&self) -> Vec<Finding> {
        self.sentences
            .iter()
            .filter(|s| !s.supported)
            .map(|s| {
                Finding::new(
                    FindingKind::Ungrounded,
                    format!("sentence not supported by references ({:.2})", s.overlap),
                )
                .at(s.start, s.end)
            })
            .collect()
    }

    /// `output` rebuilt from supported sentences only, keeping their original separators
    pub fn supported_text(&self, output: &str) -> String {
        let kept: String = self
            .sentences
            .iter()
            .filter(|s| s.supported)
            .filter_map(|s| output.get(s.start..s.end))
            .collect();
        kept.trim().to_string()
    }
}

/// Checks output sentences against reference documents by word overlap
pub struct GroundingChecker {
    config: GroundingConfig,
}

impl GroundingChecker {
    /// Create a new checker
    pub fn new(config: GroundingConfig) -> Self {
        Self { config }
    }

    /// Whether ungrounded output should be blocked
    pub fn blocks(&self) -> bool {
        self.config.block_ungrounded
    }

    /// Whether unsupported sentences should be stripped
    pub fn strips(&self) -> bool {
        self.config.strip_unsupported
    }

    /// Check `output` against `reference_docs`
    pub fn check(&self, output: &str, reference_docs: &[String]) -> GroundingReport {
        if !self.config.enabled || reference_docs.iter().all(|d| d.trim().is_empty()) {
            return GroundingReport::skipped();
        }

        let vocabulary: HashSet<String> = reference_docs
            .iter()
            .flat_map(|doc| content_words(doc))
            .collect();

        let sentences: Vec<SentenceSupport> = split_sentences(output)
            .into_iter()
            .map(|(start, end)| {
                let text = output[start..end].trim().to_string();
                let words = content_words(&text);
                let overlap = if words.is_empty() {
                    1.0
                } else {
                    let hits = words.iter().filter(|w| vocabulary.contains(*w)).count();
                    hits as f32 / words.len() as f32
                };
                SentenceSupport {
                    text,
                    start,
                    end,
                    overlap,
                    supported: overlap >= SENTENCE_SUPPORT_THRESHOLD,
                }
            })
            .collect();

        let support_ratio = if sentences.is_empty() {
            1.0
        } else {
            sentences.iter().filter(|s| s.supported).count() as f32 / sentences.len() as f32
        };

        GroundingReport {
            checked: true,
            support_ratio,
            grounded: support_ratio >= self.config.min_support,
            sentences,
        }
    }
}

/// Byte spans of non-blank sentences, split after `.`, `!`, `?` or a newline.
///
/// Leading whitespace stays with the sentence that follows it.
fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let mut spans = vec![];
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = idx + ch.len_utf8();
            if !text[start..end].trim().is_empty() {
                spans.push((start, end));
                start = end;
            }
        }
    }
    if start < text.len() && !text[start..].trim().is_empty() {
        spans.push((start, text.len()));
    }

    spans
}

/// Lowercase words of three or more characters, minus stop words
fn content_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

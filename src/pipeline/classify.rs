//! Pattern-based language detection for traffic line descriptions.
//!
//! Two passes over the configured pattern set, always in configured priority
//! order: a literal substring pass, then a word-boundary keyword pass for
//! terms like "viet" that must match only as standalone tokens. Descriptions
//! matching neither pass come back unclassified and are surfaced in the
//! review session.

use regex::Regex;

use crate::config::LanguagePattern;
use crate::domain::LanguageCode;
use crate::error::{BridgeError, Result};

struct CompiledPattern {
    code: LanguageCode,
    substrings: Vec<String>,
    keywords: Vec<Regex>,
}

pub struct LanguageClassifier {
    patterns: Vec<CompiledPattern>,
}

impl LanguageClassifier {
    /// Compile the configured pattern set. Pattern order is classification
    /// priority and is fixed for the whole run.
    pub fn new(patterns: &[LanguagePattern]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let keywords = pattern
                .keywords
                .iter()
                .map(|term| {
                    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).map_err(|source| {
                        BridgeError::Pattern {
                            pattern: term.clone(),
                            source,
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            compiled.push(CompiledPattern {
                code: LanguageCode::new(&pattern.code),
                substrings: pattern
                    .substrings
                    .iter()
                    .map(|s| s.to_lowercase())
                    .collect(),
                keywords,
            });
        }
        Ok(Self { patterns: compiled })
    }

    /// Propose a language for one description, or `None` when no pattern
    /// matches. Deterministic: the same description always yields the same
    /// proposal within a run.
    pub fn classify(&self, description: &str) -> Option<LanguageCode> {
        let lowered = description.to_lowercase();

        // Pass 1: literal substrings, first configured language with a hit
        // wins.
        for pattern in &self.patterns {
            if pattern.substrings.iter().any(|s| lowered.contains(s)) {
                return Some(pattern.code.clone());
            }
        }

        // Pass 2: word-boundary keywords, same priority order.
        for pattern in &self.patterns {
            if pattern.keywords.iter().any(|re| re.is_match(description)) {
                return Some(pattern.code.clone());
            }
        }

        None
    }
}

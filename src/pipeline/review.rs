//! Classification review: a single correction stage between classification
//! and merge-back.
//!
//! The session is pure state transitions over [`ReviewCommand`]s; the actual
//! console UI is an adapter implementing [`CorrectionSource`], which keeps
//! the correction logic headless-testable.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::LanguageCode;
use crate::error::Result;

/// A distinct row description, the rows sharing it, and its classification
/// state. Created during classification, mutated only by the review session,
/// consumed at finalize.
#[derive(Debug, Clone)]
pub struct DescriptionGroup {
    pub description: String,
    /// Indices of the rows sharing this description, first-seen order.
    pub rows: Vec<usize>,
    /// The classifier's verdict; `None` when no pattern matched.
    pub proposed: Option<LanguageCode>,
    /// Current code, initially the proposal, overwritten by corrections.
    pub confirmed: Option<LanguageCode>,
}

impl DescriptionGroup {
    pub fn occurrences(&self) -> usize {
        self.rows.len()
    }
}

/// One operator action against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// Set the group with exactly this description to `code`.
    Exact {
        description: String,
        code: LanguageCode,
    },
    /// Set every group whose description contains `pattern`
    /// (case-insensitive) to `code`.
    Pattern { pattern: String, code: LanguageCode },
}

/// Commands the operator boundary can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommand {
    Correct(Correction),
    Finalize,
    Abandon,
}

/// Abstract operator boundary. Implementations block for input (console) or
/// replay a script (tests, `--auto` runs).
pub trait CorrectionSource {
    fn next_command(&mut self, session: &ReviewSession) -> Result<ReviewCommand>;
}

/// Accepts every proposal without interaction.
pub struct AutoFinalize;

impl CorrectionSource for AutoFinalize {
    fn next_command(&mut self, _session: &ReviewSession) -> Result<ReviewCommand> {
        Ok(ReviewCommand::Finalize)
    }
}

/// Replays a fixed command script; used by tests.
pub struct ScriptedSource {
    commands: std::vec::IntoIter<ReviewCommand>,
}

impl ScriptedSource {
    pub fn new(commands: Vec<ReviewCommand>) -> Self {
        Self {
            commands: commands.into_iter(),
        }
    }
}

impl CorrectionSource for ScriptedSource {
    fn next_command(&mut self, _session: &ReviewSession) -> Result<ReviewCommand> {
        // A script that runs dry abandons rather than looping forever.
        Ok(self.commands.next().unwrap_or(ReviewCommand::Abandon))
    }
}

/// Description -> confirmed code mapping returned by finalize. Unresolved
/// descriptions map to the explicit unknown sentinel and are listed
/// separately for the run summary.
#[derive(Debug, Clone)]
pub struct ConfirmedCodes {
    codes: HashMap<String, LanguageCode>,
    unresolved: Vec<String>,
}

impl ConfirmedCodes {
    pub fn code_for(&self, description: &str) -> LanguageCode {
        self.codes
            .get(description)
            .cloned()
            .unwrap_or_else(LanguageCode::unknown)
    }

    /// Descriptions that reached finalize still unclassified.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }
}

/// The review session: open for correction until finalized or abandoned.
pub struct ReviewSession {
    groups: Vec<DescriptionGroup>,
    by_description: HashMap<String, usize>,
}

impl ReviewSession {
    /// Build the session from classified groups. Group order is first-seen
    /// row order; the listing order is computed on demand.
    pub fn new(groups: Vec<DescriptionGroup>) -> Self {
        let by_description = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.description.clone(), i))
            .collect();
        Self {
            groups,
            by_description,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Restartable listing for the operator: unclassified groups first (they
    /// always need attention regardless of count), then by descending
    /// occurrence count, first-seen order breaking ties.
    pub fn groups(&self) -> Vec<&DescriptionGroup> {
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        order.sort_by_key(|&i| {
            let group = &self.groups[i];
            (
                group.confirmed.is_some(),
                std::cmp::Reverse(group.occurrences()),
                i,
            )
        });
        order.into_iter().map(|i| &self.groups[i]).collect()
    }

    /// Current per-code group-occurrence counts, for the summary display.
    pub fn language_counts(&self) -> HashMap<LanguageCode, usize> {
        let mut counts = HashMap::new();
        for group in &self.groups {
            let code = group.confirmed.clone().unwrap_or_else(LanguageCode::unknown);
            *counts.entry(code).or_insert(0) += group.occurrences();
        }
        counts
    }

    /// Apply one correction, returning the number of groups touched.
    /// Corrections are applied in the order issued; later ones win.
    pub fn apply(&mut self, correction: &Correction) -> usize {
        match correction {
            Correction::Exact { description, code } => {
                match self.by_description.get(description) {
                    Some(&index) => {
                        self.groups[index].confirmed = Some(code.clone());
                        1
                    }
                    None => {
                        warn!(description = %description, "no group with that exact description");
                        0
                    }
                }
            }
            Correction::Pattern { pattern, code } => {
                let needle = pattern.to_lowercase();
                let mut touched = 0;
                for group in &mut self.groups {
                    if group.description.to_lowercase().contains(&needle) {
                        group.confirmed = Some(code.clone());
                        touched += 1;
                    }
                }
                if touched == 0 {
                    warn!(pattern = %pattern, "pattern matched no descriptions");
                }
                touched
            }
        }
    }

    /// Freeze all groups and return the description -> code mapping. Groups
    /// still unclassified map to the unknown sentinel, never auto-guessed.
    pub fn finalize(self) -> ConfirmedCodes {
        let mut codes = HashMap::with_capacity(self.groups.len());
        let mut unresolved = Vec::new();
        for group in self.groups {
            let code = match group.confirmed {
                Some(code) => code,
                None => {
                    unresolved.push(group.description.clone());
                    LanguageCode::unknown()
                }
            };
            codes.insert(group.description, code);
        }
        if !unresolved.is_empty() {
            info!(
                count = unresolved.len(),
                "descriptions finalized without a language"
            );
        }
        ConfirmedCodes { codes, unresolved }
    }
}

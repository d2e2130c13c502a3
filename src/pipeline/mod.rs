//! The transformation pipeline: normalizers over every row, classification
//! per distinct description, the operator review session, then merge-back
//! and derived fields.

pub mod classify;
pub mod normalize;
pub mod review;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{CanonicalRow, LanguageCode, RawRow, RowDefect, RunMetadata};
use crate::error::Result;
use crate::ingest::SourceDocument;
use classify::LanguageClassifier;
use normalize::{
    clean_numeric, compose_billcode, derive_broker_fee, derive_month, derive_spot_type,
    parse_currency, parse_date, parse_time_range, replace_market, round_spot_length,
};
use review::{CorrectionSource, DescriptionGroup, ReviewCommand, ReviewSession};

/// A row that carried at least one unparseable field, for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedRow {
    /// Zero-based position in the input batch.
    pub row: usize,
    pub description: String,
    pub defects: Vec<RowDefect>,
}

/// End-of-run accounting. Rows with defects are retained in the output and
/// reported here rather than dropped.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub total_gross: Decimal,
    pub language_counts: BTreeMap<String, usize>,
    pub flagged: Vec<FlaggedRow>,
    /// Descriptions finalized while still unclassified.
    pub unresolved_descriptions: Vec<String>,
}

/// The finished batch: canonical rows in input order plus the summary.
#[derive(Debug)]
pub struct PipelineOutput {
    pub rows: Vec<CanonicalRow>,
    pub summary: RunSummary,
}

pub struct TransformPipeline<'a> {
    config: &'a AppConfig,
    classifier: LanguageClassifier,
}

impl<'a> TransformPipeline<'a> {
    pub fn new(config: &'a AppConfig) -> Result<Self> {
        config.validate()?;
        let classifier = LanguageClassifier::new(&config.languages)?;
        Ok(Self { config, classifier })
    }

    /// Run the full batch. Returns `None` when the operator abandons the
    /// review session; no rows are emitted in that case.
    pub fn run(
        &self,
        document: &SourceDocument,
        metadata: &RunMetadata,
        corrections: &mut dyn CorrectionSource,
    ) -> Result<Option<PipelineOutput>> {
        // Stage 1: per-field normalization into row skeletons.
        let mut rows: Vec<CanonicalRow> = document
            .rows
            .iter()
            .map(|raw| self.normalize_row(raw, document, metadata))
            .collect();

        // Stage 2: classify each distinct description once, in first-seen
        // order, before any interaction starts.
        let session = self.classify_batch(&document.rows);

        // Stage 3: the operator boundary. Blocks until finalize or abandon.
        let confirmed = match drive_review(session, corrections)? {
            Some(confirmed) => confirmed,
            None => {
                warn!("review session abandoned; no rows emitted");
                return Ok(None);
            }
        };

        // Stage 4: merge confirmed codes and flag unresolved rows.
        for (row, raw) in rows.iter_mut().zip(&document.rows) {
            let code = confirmed.code_for(&raw.description);
            if code.is_unknown() {
                row.defects
                    .push(RowDefect::new("Lang.", &raw.description));
            }
            row.language = code;
        }

        // Stage 5: summary.
        let summary = summarize(&rows, &document.rows, confirmed.unresolved().to_vec());
        info!(
            total = summary.total_rows,
            flagged = summary.flagged.len(),
            unresolved = summary.unresolved_descriptions.len(),
            "batch complete"
        );
        Ok(Some(PipelineOutput { rows, summary }))
    }

    /// Normalize one raw row into a canonical skeleton. The language field
    /// stays pending until the review session resolves it.
    fn normalize_row(
        &self,
        raw: &RawRow,
        document: &SourceDocument,
        metadata: &RunMetadata,
    ) -> CanonicalRow {
        let mut defects = Vec::new();

        let range = parse_time_range(&raw.time_range);
        if range.is_partial() {
            defects.push(RowDefect::new("Time In/Out", &raw.time_range));
        }

        let air_date = parse_date(&raw.air_date);
        if air_date.is_none() {
            defects.push(RowDefect::new("Air Date", &raw.air_date));
        }

        let gross_rate = match parse_currency(&raw.gross_rate) {
            Some(amount) => amount,
            None => {
                defects.push(RowDefect::new("Gross Rate", &raw.gross_rate));
                Decimal::ZERO
            }
        };

        let length_secs = match raw.length.trim().parse::<f64>() {
            Ok(seconds) => round_spot_length(seconds),
            Err(_) if raw.length.trim().is_empty() => 0,
            Err(_) => {
                defects.push(RowDefect::new("Length", &raw.length));
                0
            }
        };

        let line = clean_numeric(&raw.line).unwrap_or_else(|| {
            defects.push(RowDefect::new("Line", &raw.line));
            0
        });
        let spot_number = clean_numeric(&raw.spot_number).unwrap_or_else(|| {
            defects.push(RowDefect::new("#", &raw.spot_number));
            0
        });

        let bill_code = compose_billcode(
            &document.billcode_fragments.0,
            &document.billcode_fragments.1,
        );
        if bill_code.is_empty() {
            defects.push(RowDefect::new("Bill Code", ""));
        }

        let fee_rate = metadata
            .agency_fee_rate
            .unwrap_or(self.config.agency_fee_rate);

        CanonicalRow {
            bill_code,
            time_in: range.time_in,
            time_out: range.time_out,
            air_date,
            end_date: None,
            month: air_date
                .map(|d| derive_month(d, metadata.billing_type, self.config.broadcast_week_start)),
            priority: String::new(),
            gross_rate,
            length_secs,
            line,
            spot_number,
            market: replace_market(&self.config.markets, &raw.market),
            program: raw.program.trim().to_string(),
            media: raw.media.trim().to_string(),
            billing_type: metadata.billing_type,
            revenue_type: metadata.revenue_type,
            order_type: metadata.order_type,
            sales_person: metadata.sales_person.clone(),
            language: LanguageCode::unknown(),
            affidavit: metadata.affidavit,
            estimate: metadata.estimate.clone(),
            contract: metadata.contract.clone(),
            spot_type: derive_spot_type(gross_rate),
            broker_fees: derive_broker_fee(gross_rate, metadata.order_type, fee_rate),
            defects,
        }
    }

    /// Group rows by description and propose a code per distinct
    /// description. Classification covers the whole batch before the review
    /// session opens, so bulk pattern corrections see every group. Public
    /// so inspection runs can classify without the interactive stage.
    pub fn classify_batch(&self, rows: &[RawRow]) -> ReviewSession {
        let mut groups: Vec<DescriptionGroup> = Vec::new();
        let mut index: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for (row_index, raw) in rows.iter().enumerate() {
            match index.get(raw.description.as_str()) {
                Some(&i) => groups[i].rows.push(row_index),
                None => {
                    let proposed = self.classifier.classify(&raw.description);
                    index.insert(raw.description.as_str(), groups.len());
                    groups.push(DescriptionGroup {
                        description: raw.description.clone(),
                        rows: vec![row_index],
                        confirmed: proposed.clone(),
                        proposed,
                    });
                }
            }
        }
        info!(groups = groups.len(), rows = rows.len(), "classified batch");
        ReviewSession::new(groups)
    }
}

/// Pump commands from the operator boundary into the session until it is
/// finalized or abandoned.
fn drive_review(
    mut session: ReviewSession,
    corrections: &mut dyn CorrectionSource,
) -> Result<Option<review::ConfirmedCodes>> {
    loop {
        match corrections.next_command(&session)? {
            ReviewCommand::Correct(correction) => {
                let touched = session.apply(&correction);
                info!(touched, "applied correction");
            }
            ReviewCommand::Finalize => return Ok(Some(session.finalize())),
            ReviewCommand::Abandon => return Ok(None),
        }
    }
}

fn summarize(
    rows: &[CanonicalRow],
    raw_rows: &[RawRow],
    unresolved_descriptions: Vec<String>,
) -> RunSummary {
    let mut language_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_gross = Decimal::ZERO;
    let mut flagged = Vec::new();
    for (index, (row, raw)) in rows.iter().zip(raw_rows).enumerate() {
        *language_counts
            .entry(row.language.as_str().to_string())
            .or_insert(0) += 1;
        total_gross += row.gross_rate;
        if row.is_flagged() {
            flagged.push(FlaggedRow {
                row: index,
                description: raw.description.clone(),
                defects: row.defects.clone(),
            });
        }
    }
    RunSummary {
        total_rows: rows.len(),
        total_gross,
        language_counts,
        flagged,
        unresolved_descriptions,
    }
}

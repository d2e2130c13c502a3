//! Reads a scheduler CSV export into [`RawRow`]s.
//!
//! The export carries a two-line preamble (the bill-code identifier
//! fragments) ahead of the real tabular header, plus embedded subtotal rows
//! that belong to the report layout rather than the schedule. Everything
//! else is retained; defective values are the pipeline's problem, not
//! ingest's.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::domain::RawRow;
use crate::error::{BridgeError, Result};

/// Expected source columns, by export name.
const COL_LINE: &str = "id_contrattirighe";
const COL_SPOT_NUMBER: &str = "Textbox14";
const COL_TIME_RANGE: &str = "timerange2";
const COL_AIR_DATE: &str = "dateschedule";
const COL_LENGTH: &str = "duration3";
const COL_GROSS_RATE: &str = "IMPORTO2";
const COL_MARKET: &str = "nome2";
const COL_PROGRAM: &str = "airtimep";
const COL_MEDIA: &str = "bookingcode2";
const COL_DESCRIPTION: &str = "rowdescription";

/// Preamble fields holding the two bill-code fragments.
const FRAGMENT_FIRST: &str = "Textbox180";
const FRAGMENT_SECOND: &str = "Textbox171";

/// Number of physical lines ahead of the tabular header.
const PREAMBLE_LINES: usize = 3;

/// The parsed export: bill-code fragments from the preamble plus the raw
/// schedule rows in file order.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub billcode_fragments: (String, String),
    pub rows: Vec<RawRow>,
}

pub fn read_source(path: &Path) -> Result<SourceDocument> {
    let text = std::fs::read_to_string(path)?;
    read_source_str(&text)
}

/// Parse export text. Split out from [`read_source`] so tests can feed
/// literals.
pub fn read_source_str(text: &str) -> Result<SourceDocument> {
    // Strip a UTF-8 BOM if the exporter left one.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let billcode_fragments = parse_preamble(text);

    let body_start = match nth_line_offset(text, PREAMBLE_LINES) {
        Some(offset) => offset,
        None => {
            return Err(BridgeError::Config(
                "export has no data section after the preamble".to_string(),
            ))
        }
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text[body_start..].as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| BridgeError::MissingColumn(name.to_string()))
    };

    let line_idx = column(COL_LINE)?;
    let spot_number_idx = column(COL_SPOT_NUMBER)?;
    let time_range_idx = column(COL_TIME_RANGE)?;
    let air_date_idx = column(COL_AIR_DATE)?;
    let length_idx = column(COL_LENGTH)?;
    let gross_rate_idx = column(COL_GROSS_RATE)?;
    let market_idx = column(COL_MARKET)?;
    let program_idx = column(COL_PROGRAM)?;
    let media_idx = column(COL_MEDIA)?;
    let description_idx = column(COL_DESCRIPTION)?;

    let mut rows = Vec::new();
    let mut skipped_empty = 0usize;
    let mut skipped_subtotal = 0usize;

    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        if record.iter().all(|f| f.trim().is_empty()) {
            skipped_empty += 1;
            continue;
        }
        // Subtotal rows echo the report's textbox ids into the amount column.
        if field(gross_rate_idx).contains("Textbox") {
            skipped_subtotal += 1;
            continue;
        }

        rows.push(RawRow {
            line: field(line_idx),
            spot_number: field(spot_number_idx),
            time_range: field(time_range_idx),
            air_date: field(air_date_idx),
            length: field(length_idx),
            gross_rate: field(gross_rate_idx),
            market: field(market_idx),
            program: field(program_idx),
            media: field(media_idx),
            description: field(description_idx),
        });
    }

    if skipped_empty > 0 || skipped_subtotal > 0 {
        warn!(
            empty = skipped_empty,
            subtotal = skipped_subtotal,
            "dropped report layout rows"
        );
    }
    info!(rows = rows.len(), "read source export");

    Ok(SourceDocument {
        billcode_fragments,
        rows,
    })
}

/// Pull the bill-code fragments out of the two-line preamble. A missing or
/// malformed preamble yields empty fragments; the pipeline reports the empty
/// bill code downstream.
fn parse_preamble(text: &str) -> (String, String) {
    let mut lines = text.lines();
    let (Some(header_line), Some(value_line)) = (lines.next(), lines.next()) else {
        return (String::new(), String::new());
    };

    let preamble = format!("{header_line}\n{value_line}\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(preamble.as_bytes());
    let mut records = reader.records();
    let (Some(Ok(names)), Some(Ok(values))) = (records.next(), records.next()) else {
        return (String::new(), String::new());
    };

    let lookup = |wanted: &str| -> String {
        names
            .iter()
            .position(|name| name.trim() == wanted)
            .and_then(|i| values.get(i))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    (lookup(FRAGMENT_FIRST), lookup(FRAGMENT_SECOND))
}

/// Byte offset of the start of line `n` (zero-based), or `None` past EOF.
fn nth_line_offset(text: &str, n: usize) -> Option<usize> {
    let mut offset = 0;
    for _ in 0..n {
        let rest = &text[offset..];
        let newline = rest.find('\n')?;
        offset += newline + 1;
    }
    (offset < text.len()).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Textbox180,Textbox171
ACME001,Nissan West
,
id_contrattirighe,Textbox14,timerange2,dateschedule,duration3,IMPORTO2,nome2,airtimep,bookingcode2,rowdescription
\"1,001\",1,0600-0630,01/15/2024,30,\"$1,250.00\",SEATTLE DMA,Morning News,TV,Line 1 Vietnamese News
1002,2,0630-0700,01/16/2024,30,$0.00,SEATTLE DMA,Morning News,TV,Line 2 Hmong Hour
,,,,,,,,,
1003,3,0700-0730,01/17/2024,30,Textbox61,SEATTLE DMA,Morning News,TV,subtotal
";

    #[test]
    fn reads_fragments_and_rows() {
        let document = read_source_str(SAMPLE).unwrap();
        assert_eq!(
            document.billcode_fragments,
            ("ACME001".to_string(), "Nissan West".to_string())
        );
        assert_eq!(document.rows.len(), 2);
        assert_eq!(document.rows[0].line, "1,001");
        assert_eq!(document.rows[0].gross_rate, "$1,250.00");
        assert_eq!(document.rows[1].description, "Line 2 Hmong Hour");
    }

    #[test]
    fn skips_empty_and_subtotal_rows() {
        let document = read_source_str(SAMPLE).unwrap();
        assert!(document.rows.iter().all(|r| r.description != "subtotal"));
    }

    #[test]
    fn missing_expected_column_is_fatal() {
        let text = SAMPLE.replace("rowdescription", "somethingelse");
        match read_source_str(&text) {
            Err(BridgeError::MissingColumn(name)) => assert_eq!(name, "rowdescription"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn tolerates_missing_preamble_values() {
        let text = SAMPLE.replace("ACME001,Nissan West", ",");
        let document = read_source_str(&text).unwrap();
        assert_eq!(
            document.billcode_fragments,
            (String::new(), String::new())
        );
    }

    #[test]
    fn strips_utf8_bom() {
        let text = format!("\u{feff}{SAMPLE}");
        let document = read_source_str(&text).unwrap();
        assert_eq!(document.rows.len(), 2);
    }
}

//! Renders canonical rows into the standardized billing CSV.
//!
//! Column names and order are fixed by [`OUTPUT_COLUMNS`]; optional values
//! render as blank cells. Rows carrying defects are written like any other,
//! the run summary is where defects are reported.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use csv::Writer;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{CanonicalRow, OUTPUT_COLUMNS};
use crate::error::Result;
use crate::pipeline::normalize::format_length;
use crate::pipeline::RunSummary;

const DATE_FORMAT: &str = "%m/%d/%y";
const TIME_FORMAT: &str = "%H:%M:%S";

pub fn write_rows(path: &Path, rows: &[CanonicalRow]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    write_to(&mut writer, rows)?;
    writer.flush()?;
    info!(rows = rows.len(), path = %path.display(), "wrote billing output");
    Ok(())
}

/// Write the run summary next to the billing output as pretty JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "wrote run summary");
    Ok(())
}

fn write_to<W: std::io::Write>(writer: &mut Writer<W>, rows: &[CanonicalRow]) -> Result<()> {
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        writer.write_record(&render_row(row))?;
    }
    Ok(())
}

fn render_row(row: &CanonicalRow) -> Vec<String> {
    vec![
        row.bill_code.clone(),
        format_time(row.time_in),
        format_time(row.time_out),
        format_date(row.air_date),
        format_date(row.end_date),
        format_date(row.month),
        row.priority.clone(),
        format_money(row.gross_rate),
        format_length(row.length_secs),
        row.line.to_string(),
        row.spot_number.to_string(),
        row.market.clone(),
        row.program.clone(),
        row.media.clone(),
        row.billing_type.to_string(),
        row.revenue_type.to_string(),
        row.order_type.to_string(),
        row.sales_person.clone(),
        row.language.to_string(),
        if row.affidavit { "Y" } else { "N" }.to_string(),
        row.estimate.clone(),
        row.contract.clone(),
        row.spot_type.to_string(),
        row.broker_fees.map(format_money).unwrap_or_default(),
    ]
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BillingType, LanguageCode, OrderType, RevenueType, SpotType};
    use chrono::NaiveDate;

    fn sample_row() -> CanonicalRow {
        CanonicalRow {
            bill_code: "ACME001:Nissan West".to_string(),
            time_in: NaiveTime::from_hms_opt(6, 0, 0),
            time_out: NaiveTime::from_hms_opt(6, 30, 0),
            air_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            end_date: None,
            month: NaiveDate::from_ymd_opt(2024, 1, 1),
            priority: String::new(),
            gross_rate: Decimal::new(125000, 2),
            length_secs: 30,
            line: 1001,
            spot_number: 1,
            market: "Seattle".to_string(),
            program: "Morning News".to_string(),
            media: "TV".to_string(),
            billing_type: BillingType::Calendar,
            revenue_type: RevenueType::InternalAdSales,
            order_type: OrderType::Agency,
            sales_person: "Alex".to_string(),
            language: LanguageCode::new("V"),
            affidavit: false,
            estimate: "EST-9".to_string(),
            contract: "CT-44".to_string(),
            spot_type: SpotType::Com,
            broker_fees: Some(Decimal::new(18750, 2)),
            defects: Vec::new(),
        }
    }

    fn written(rows: &[CanonicalRow]) -> String {
        let mut writer = Writer::from_writer(Vec::new());
        write_to(&mut writer, rows).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn header_matches_column_contract() {
        let text = written(&[]);
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Bill Code,Time In,Time Out"));
        assert!(header.ends_with("Contract,Type,Broker Fees"));
        assert_eq!(header.split(',').count(), OUTPUT_COLUMNS.len());
    }

    #[test]
    fn renders_full_row() {
        let text = written(&[sample_row()]);
        let data = text.lines().nth(1).unwrap();
        assert!(data.contains("ACME001:Nissan West"));
        assert!(data.contains("06:00:00"));
        assert!(data.contains("01/15/24"));
        assert!(data.contains("1250.00"));
        assert!(data.contains("00:00:30"));
        assert!(data.contains("187.50"));
        assert!(data.contains(",N,"));
    }

    #[test]
    fn optional_fields_render_blank() {
        let mut row = sample_row();
        row.time_in = None;
        row.air_date = None;
        row.month = None;
        row.broker_fees = None;
        let text = written(&[row]);
        let data = text.lines().nth(1).unwrap();
        let fields: Vec<&str> = data.split(',').collect();
        assert_eq!(fields[1], ""); // Time In
        assert_eq!(fields[3], ""); // Air Date
        assert!(data.ends_with(",COM,"));
    }

    #[test]
    fn zero_gross_row_renders_bns() {
        let mut row = sample_row();
        row.gross_rate = Decimal::ZERO;
        row.spot_type = SpotType::Bns;
        row.broker_fees = None;
        let text = written(&[row]);
        assert!(text.lines().nth(1).unwrap().contains(",BNS,"));
    }
}

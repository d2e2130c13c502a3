//! Pure field normalizers.
//!
//! Each function converts one raw field into one canonical value. Parse
//! failures are reported to the caller through `Option`/flag returns so the
//! pipeline can record a [`RowDefect`](crate::domain::RowDefect) and keep
//! going; nothing here aborts a batch.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;

use crate::domain::{BillingType, OrderType, SpotType};

/// Parsed halves of a `timerange2` value. Either half may be missing when
/// only one side of the range was readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
}

impl TimeRange {
    /// True when at least one half failed to parse.
    pub fn is_partial(&self) -> bool {
        self.time_in.is_none() || self.time_out.is_none()
    }
}

/// Parse a single clock string in the formats the scheduler emits.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // Bare "HHMM" compact form first, then the delimited forms in order of
    // likelihood.
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        return NaiveTime::parse_from_str(raw, "%H%M").ok();
    }
    for format in ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"] {
        if let Ok(time) = NaiveTime::parse_from_str(raw, format) {
            return Some(time);
        }
    }
    None
}

/// Split a combined range string (e.g. "0600-0630") into start/end times.
///
/// A half that fails to parse comes back as `None`; the caller flags the row
/// but keeps the valid half rather than aborting the batch.
pub fn parse_time_range(raw: &str) -> TimeRange {
    match raw.trim().split_once('-') {
        Some((start, end)) => TimeRange {
            time_in: parse_clock(start),
            time_out: parse_clock(end),
        },
        None => TimeRange {
            time_in: parse_clock(raw),
            time_out: None,
        },
    }
}

/// Parse a date in the common text forms seen in exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d", "%m-%d-%Y", "%d-%b-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Strip currency symbols and group separators and parse to fixed-point.
///
/// Empty or placeholder values ("-", "N/A") normalize to zero. `None` means
/// the text was genuinely unparseable; the caller substitutes zero and flags
/// the row.
pub fn parse_currency(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("n/a") {
        return Some(Decimal::ZERO);
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<Decimal>().ok()
}

/// Round a spot length to the nearest 15-second increment, ties rounding up.
/// Zero or negative input normalizes to zero duration.
pub fn round_spot_length(seconds: f64) -> u32 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let units = (seconds / 15.0 + 0.5).floor();
    (units * 15.0) as u32
}

/// Render a length in seconds as zero-padded `HH:MM:SS`.
pub fn format_length(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Join two bill-code identifier fragments as `"A:B"`. A single non-empty
/// fragment stands alone; both empty yields the empty string, which the
/// pipeline reports but does not treat as fatal.
pub fn compose_billcode(first: &str, second: &str) -> String {
    let first = first.trim();
    let second = second.trim();
    match (first.is_empty(), second.is_empty()) {
        (false, false) => format!("{}:{}", first, second),
        (false, true) => first.to_string(),
        (true, false) => second.to_string(),
        (true, true) => String::new(),
    }
}

/// Look up a raw market name in the replacement mapping. Exact,
/// case-sensitive; absent names pass through unchanged.
pub fn replace_market(replacements: &HashMap<String, String>, raw: &str) -> String {
    match replacements.get(raw) {
        Some(standard) => standard.clone(),
        None => raw.to_string(),
    }
}

/// Strip group commas and any decimal tail from an identifier field
/// (Line, #) and parse to an integer.
pub fn clean_numeric(raw: &str) -> Option<i64> {
    let cleaned = raw.trim().replace(',', "");
    let integral = cleaned.split('.').next().unwrap_or("");
    if integral.is_empty() {
        return None;
    }
    integral.parse::<i64>().ok()
}

/// Derive the billing month for an air date.
///
/// Calendar billing uses the first day of the air date's calendar month.
/// Broadcast billing also starts months on day one, but an air date falling
/// before the month's first `week_start` weekday belongs to the prior
/// broadcast month and rolls back to that month's first day.
pub fn derive_month(air_date: NaiveDate, billing_type: BillingType, week_start: Weekday) -> NaiveDate {
    let month_first = air_date - Duration::days(i64::from(air_date.day0()));
    match billing_type {
        BillingType::Calendar => month_first,
        BillingType::Broadcast => {
            let offset =
                (7 + week_start.num_days_from_monday() - month_first.weekday().num_days_from_monday()) % 7;
            let boundary = month_first + Duration::days(i64::from(offset));
            if air_date < boundary {
                let prior = month_first - Duration::days(1);
                prior - Duration::days(i64::from(prior.day0()))
            } else {
                month_first
            }
        }
    }
}

/// Type column: bonus spots carry an exactly-zero gross rate.
pub fn derive_spot_type(gross_rate: Decimal) -> SpotType {
    if gross_rate.is_zero() {
        SpotType::Bns
    } else {
        SpotType::Com
    }
}

/// Broker fee: gross x fee rate for Agency orders with a positive gross;
/// blank otherwise. Never negative.
pub fn derive_broker_fee(
    gross_rate: Decimal,
    order_type: OrderType,
    fee_rate: Decimal,
) -> Option<Decimal> {
    if order_type != OrderType::Agency || gross_rate <= Decimal::ZERO {
        return None;
    }
    Some((gross_rate * fee_rate).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_compact_and_delimited_clocks() {
        assert_eq!(parse_clock("0600"), NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(parse_clock("18:30"), NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(parse_clock("6:30 AM"), NaiveTime::from_hms_opt(6, 30, 0));
        assert_eq!(parse_clock("2500"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn splits_time_range() {
        let range = parse_time_range("0600-0630");
        assert_eq!(range.time_in, NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(range.time_out, NaiveTime::from_hms_opt(6, 30, 0));
        assert!(!range.is_partial());
    }

    #[test]
    fn keeps_valid_half_of_broken_range() {
        let range = parse_time_range("0600-junk");
        assert_eq!(range.time_in, NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(range.time_out, None);
        assert!(range.is_partial());
    }

    #[test]
    fn parses_common_date_forms() {
        let expected = Some(date(2024, 1, 15));
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date("1/15/24"), expected);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn currency_strips_symbols_and_separators() {
        assert_eq!(parse_currency("$1,234.50"), Some(Decimal::new(123450, 2)));
        assert_eq!(parse_currency(""), Some(Decimal::ZERO));
        assert_eq!(parse_currency("-"), Some(Decimal::ZERO));
        assert_eq!(parse_currency("N/A"), Some(Decimal::ZERO));
        assert_eq!(parse_currency("twelve"), None);
    }

    #[test]
    fn currency_is_idempotent() {
        let first = parse_currency("$1,234.50").unwrap();
        let second = parse_currency(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn length_rounds_to_15_with_ties_up() {
        assert_eq!(round_spot_length(31.0), 30);
        assert_eq!(round_spot_length(45.0), 45);
        assert_eq!(round_spot_length(7.5), 15);
        assert_eq!(round_spot_length(22.5), 30);
        assert_eq!(round_spot_length(0.0), 0);
        assert_eq!(round_spot_length(-10.0), 0);
        // Rounded result never drifts more than half an increment
        for tenth in 0..2000u32 {
            let input = f64::from(tenth) / 10.0;
            let rounded = f64::from(round_spot_length(input));
            assert_eq!(rounded % 15.0, 0.0);
            assert!((rounded - input).abs() <= 7.5, "input {}", input);
        }
    }

    #[test]
    fn formats_length_as_hms() {
        assert_eq!(format_length(0), "00:00:00");
        assert_eq!(format_length(90), "00:01:30");
        assert_eq!(format_length(3615), "01:00:15");
    }

    #[test]
    fn billcode_composition_table() {
        assert_eq!(compose_billcode("A", "B"), "A:B");
        assert_eq!(compose_billcode("A", ""), "A");
        assert_eq!(compose_billcode("", "B"), "B");
        assert_eq!(compose_billcode("", ""), "");
    }

    #[test]
    fn market_lookup_is_case_sensitive_with_passthrough() {
        let mut replacements = HashMap::new();
        replacements.insert("SEATTLE DMA".to_string(), "Seattle".to_string());
        assert_eq!(replace_market(&replacements, "SEATTLE DMA"), "Seattle");
        assert_eq!(replace_market(&replacements, "Seattle DMA"), "Seattle DMA");
        assert_eq!(replace_market(&replacements, "Portland"), "Portland");
    }

    #[test]
    fn cleans_identifier_numbers() {
        assert_eq!(clean_numeric("1,234"), Some(1234));
        assert_eq!(clean_numeric("42.0"), Some(42));
        assert_eq!(clean_numeric("  7 "), Some(7));
        assert_eq!(clean_numeric("x"), None);
        assert_eq!(clean_numeric(""), None);
    }

    #[test]
    fn calendar_month_is_first_of_month() {
        let month = derive_month(date(2024, 1, 15), BillingType::Calendar, Weekday::Mon);
        assert_eq!(month, date(2024, 1, 1));
    }

    #[test]
    fn broadcast_month_rolls_back_before_week_start() {
        // June 2024 opens on a Saturday; the first Monday is June 3rd.
        assert_eq!(
            derive_month(date(2024, 6, 1), BillingType::Broadcast, Weekday::Mon),
            date(2024, 5, 1)
        );
        assert_eq!(
            derive_month(date(2024, 6, 3), BillingType::Broadcast, Weekday::Mon),
            date(2024, 6, 1)
        );
        // A month opening on the configured weekday never rolls back.
        // July 1st 2024 is a Monday.
        assert_eq!(
            derive_month(date(2024, 7, 1), BillingType::Broadcast, Weekday::Mon),
            date(2024, 7, 1)
        );
    }

    #[test]
    fn spot_type_from_gross_rate() {
        assert_eq!(derive_spot_type(Decimal::ZERO), SpotType::Bns);
        assert_eq!(derive_spot_type(Decimal::new(10000, 2)), SpotType::Com);
    }

    #[test]
    fn broker_fee_only_for_agency_with_positive_gross() {
        let gross = Decimal::new(10000, 2); // 100.00
        let rate = Decimal::new(15, 2); // 0.15
        assert_eq!(
            derive_broker_fee(gross, OrderType::Agency, rate),
            Some(Decimal::new(1500, 2))
        );
        assert_eq!(derive_broker_fee(gross, OrderType::NonAgency, rate), None);
        assert_eq!(derive_broker_fee(Decimal::ZERO, OrderType::Agency, rate), None);
        assert_eq!(
            derive_broker_fee(Decimal::new(-5000, 2), OrderType::Agency, rate),
            None
        );
    }
}

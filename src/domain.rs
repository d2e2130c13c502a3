use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One record as read from the source export, unnormalized.
///
/// Field names follow the standardized output schema; the ingest layer maps
/// the source's export column names onto these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    pub line: String,
    pub spot_number: String,
    pub time_range: String,
    pub air_date: String,
    pub length: String,
    pub gross_rate: String,
    pub market: String,
    pub program: String,
    pub media: String,
    pub description: String,
}

/// Billing convention selected for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum BillingType {
    Calendar,
    Broadcast,
}

impl std::fmt::Display for BillingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingType::Calendar => write!(f, "Calendar"),
            BillingType::Broadcast => write!(f, "Broadcast"),
        }
    }
}

/// How the order was placed; Agency orders accrue a broker fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OrderType {
    Agency,
    NonAgency,
    Trade,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Agency => write!(f, "Agency"),
            OrderType::NonAgency => write!(f, "Non-Agency"),
            OrderType::Trade => write!(f, "Trade"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum RevenueType {
    BrandedContent,
    DirectResponse,
    InternalAdSales,
    PaidProgramming,
    Trade,
}

impl std::fmt::Display for RevenueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevenueType::BrandedContent => write!(f, "Branded Content"),
            RevenueType::DirectResponse => write!(f, "Direct Response Sales"),
            RevenueType::InternalAdSales => write!(f, "Internal Ad Sales"),
            RevenueType::PaidProgramming => write!(f, "Paid Programming"),
            RevenueType::Trade => write!(f, "Trade"),
        }
    }
}

/// Spot classification derived from the normalized gross rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotType {
    /// Paid commercial spot
    Com,
    /// Bonus spot, zero gross
    Bns,
}

impl std::fmt::Display for SpotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotType::Com => write!(f, "COM"),
            SpotType::Bns => write!(f, "BNS"),
        }
    }
}

/// A language code as it appears in the output `Lang.` column.
///
/// Codes are configuration, not a closed enum. The sentinel `??` marks a
/// description that reached finalize unclassified; downstream consumers must
/// not treat it as a real language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub const UNKNOWN: &'static str = "??";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run-level metadata supplied by the operator, stamped onto every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub billing_type: BillingType,
    pub revenue_type: RevenueType,
    pub order_type: OrderType,
    /// Overrides the configured agency fee rate when set.
    pub agency_fee_rate: Option<Decimal>,
    pub sales_person: String,
    pub estimate: String,
    pub contract: String,
    pub affidavit: bool,
}

/// A field that could not be parsed under its expected grammar.
///
/// Defects are recorded alongside the row and surfaced in the run summary;
/// they never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDefect {
    pub field: String,
    pub value: String,
}

impl RowDefect {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for RowDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}'", self.field, self.value)
    }
}

/// One output record in the standardized billing schema.
///
/// Produced 1:1 and order-preserving from [`RawRow`]s. Optional fields are
/// rendered blank by the output layer; a `None` paired with a [`RowDefect`]
/// means the source value failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub bill_code: String,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub air_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub month: Option<NaiveDate>,
    pub priority: String,
    pub gross_rate: Decimal,
    /// Spot length in seconds, already rounded to a 15-second increment.
    pub length_secs: u32,
    pub line: i64,
    pub spot_number: i64,
    pub market: String,
    pub program: String,
    pub media: String,
    pub billing_type: BillingType,
    pub revenue_type: RevenueType,
    pub order_type: OrderType,
    pub sales_person: String,
    pub language: LanguageCode,
    pub affidavit: bool,
    pub estimate: String,
    pub contract: String,
    pub spot_type: SpotType,
    pub broker_fees: Option<Decimal>,
    pub defects: Vec<RowDefect>,
}

impl CanonicalRow {
    pub fn is_flagged(&self) -> bool {
        !self.defects.is_empty()
    }
}

/// Output column contract, in order. Any consumer (e.g. a spreadsheet
/// writer) can rely on these exact names.
pub const OUTPUT_COLUMNS: &[&str] = &[
    "Bill Code",
    "Time In",
    "Time Out",
    "Air Date",
    "End Date",
    "Month",
    "Priority",
    "Gross Rate",
    "Length",
    "Line",
    "#",
    "Market",
    "Program",
    "Media",
    "Billing Type",
    "Revenue Type",
    "Agency?",
    "Sales Person",
    "Lang.",
    "Affidavit?",
    "Estimate",
    "Contract",
    "Type",
    "Broker Fees",
];

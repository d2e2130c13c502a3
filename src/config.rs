use std::collections::HashMap;
use std::path::Path;

use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Detection patterns for a single language, in priority order within the
/// run configuration.
///
/// `substrings` match anywhere in the case-normalized description;
/// `keywords` must appear as standalone tokens (word-boundary anchored).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagePattern {
    pub code: String,
    #[serde(default)]
    pub substrings: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl LanguagePattern {
    pub fn new(code: &str, substrings: &[&str], keywords: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            substrings: substrings.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn default_agency_fee_rate() -> Decimal {
    Decimal::new(15, 2)
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

/// Application configuration, loaded once and passed explicitly into the
/// classifier and normalizers. No process-wide mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Raw market name -> standardized market name (case-sensitive).
    #[serde(default)]
    pub markets: HashMap<String, String>,

    /// Ordered language pattern set; listing order is classification
    /// priority.
    pub languages: Vec<LanguagePattern>,

    /// Standard agency fee rate applied to Agency orders.
    #[serde(default = "default_agency_fee_rate")]
    pub agency_fee_rate: Decimal,

    /// Weekday that opens a broadcast month. Air dates before the first
    /// occurrence of this weekday in their calendar month bill into the
    /// prior month.
    #[serde(default = "default_week_start")]
    pub broadcast_week_start: Weekday,

    #[serde(default)]
    pub sales_people: Vec<String>,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file. Fails fast with a
    /// specific message before any row processing starts.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(BridgeError::Config(
                "language pattern set is empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for pattern in &self.languages {
            if pattern.code.trim().is_empty() {
                return Err(BridgeError::Config(
                    "language pattern with empty code".to_string(),
                ));
            }
            if !seen.insert(pattern.code.as_str()) {
                return Err(BridgeError::Config(format!(
                    "duplicate language code '{}'",
                    pattern.code
                )));
            }
            if pattern.substrings.is_empty() && pattern.keywords.is_empty() {
                return Err(BridgeError::Config(format!(
                    "language '{}' has no detection terms",
                    pattern.code
                )));
            }
        }
        if self.agency_fee_rate < Decimal::ZERO || self.agency_fee_rate > Decimal::ONE {
            return Err(BridgeError::Config(format!(
                "agency fee rate {} outside 0..=1",
                self.agency_fee_rate
            )));
        }
        Ok(())
    }

    /// True when `code` belongs to the configured pattern set.
    pub fn is_known_language(&self, code: &str) -> bool {
        self.languages.iter().any(|p| p.code == code)
    }

    pub fn language_codes(&self) -> Vec<&str> {
        self.languages.iter().map(|p| p.code.as_str()).collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            markets: HashMap::new(),
            languages: vec![
                LanguagePattern::new("M", &["chinese", "mandarin"], &[]),
                LanguagePattern::new("C", &["cantonese"], &[]),
                LanguagePattern::new("T", &["filipino", "tagalog"], &[]),
                LanguagePattern::new("Hm", &["hmong"], &[]),
                LanguagePattern::new("SA", &["south asian", "punjabi", "hindi"], &[]),
                LanguagePattern::new("V", &["vietnamese"], &["viet"]),
                LanguagePattern::new("K", &["korean"], &[]),
                LanguagePattern::new("J", &["japanese"], &[]),
                LanguagePattern::new("E", &["english"], &[]),
            ],
            agency_fee_rate: default_agency_fee_rate(),
            broadcast_week_start: default_week_start(),
            sales_people: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_known_language("V"));
        assert!(!config.is_known_language("??"));
    }

    #[test]
    fn rejects_empty_pattern_set() {
        let config = AppConfig {
            languages: Vec::new(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let mut config = AppConfig::default();
        config
            .languages
            .push(LanguagePattern::new("V", &["vietnamese"], &[]));
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_fee() {
        let config = AppConfig {
            agency_fee_rate: Decimal::new(15, 1), // 1.5
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn parses_toml_config() {
        let text = r#"
            agency_fee_rate = "0.10"
            broadcast_week_start = "Mon"

            [markets]
            "SEATTLE DMA" = "Seattle"

            [[languages]]
            code = "V"
            substrings = ["vietnamese"]
            keywords = ["viet"]
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.agency_fee_rate, Decimal::new(10, 2));
        assert_eq!(config.markets["SEATTLE DMA"], "Seattle");
        assert_eq!(config.languages.len(), 1);
    }
}

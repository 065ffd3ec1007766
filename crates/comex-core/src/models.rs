//! Core data models used throughout Che.Comex.
//!
//! These are plain records: trade-flow rows and regulatory reference data
//! are read-mostly, and [`OpportunityResult`] is recomputed on every
//! request and never persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for domain values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("invalid HS code '{0}': expected 2 to 10 digits")]
    InvalidHsCode(String),

    #[error("invalid trade flow: {0}")]
    InvalidTradeFlow(String),
}

/// Harmonized System product code.
///
/// Stored as digits only; dots and spaces in the input (`"0901.21"`) are
/// stripped. The first two digits are the chapter, the first four the
/// heading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HsCode(String);

impl HsCode {
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, '.' | ' ' | '-'))
            .collect();
        if digits.len() < 2 || digits.len() > 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ModelError::InvalidHsCode(raw.to_string()));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-digit chapter, e.g. `"09"` for coffee, tea and spices.
    pub fn chapter(&self) -> &str {
        &self.0[..2]
    }

    /// Four-digit heading, when the code is at least that long.
    pub fn heading(&self) -> Option<&str> {
        self.0.get(..4)
    }

    /// True if this code falls under `prefix` (a chapter, heading, or
    /// any shorter code).
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for HsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HsCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HsCode {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HsCode> for String {
    fn from(code: HsCode) -> Self {
        code.0
    }
}

/// One row of bilateral trade: how much of a product moved from an
/// origin to a destination in a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFlow {
    pub hs_code: HsCode,
    /// ISO 3166-1 alpha-2 code of the exporting country.
    pub origin_country: String,
    /// ISO 3166-1 alpha-2 code of the importing country.
    pub destination_country: String,
    pub year: i32,
    /// Quantity shipped (tonnes or units, depending on the source).
    pub volume: f64,
    pub value_usd: f64,
}

impl TradeFlow {
    /// Rejects rows with negative or non-finite quantities.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(ModelError::InvalidTradeFlow(format!(
                "volume must be non-negative, got {}",
                self.volume
            )));
        }
        if !self.value_usd.is_finite() || self.value_usd < 0.0 {
            return Err(ModelError::InvalidTradeFlow(format!(
                "value_usd must be non-negative, got {}",
                self.value_usd
            )));
        }
        if self.origin_country.is_empty() || self.destination_country.is_empty() {
            return Err(ModelError::InvalidTradeFlow(
                "origin and destination must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A document requirement. `None` fields are wildcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryRule {
    pub hs_chapter: Option<String>,
    pub country_code: Option<String>,
    pub origin_country_code: Option<String>,
    pub document_name: String,
    pub issuer: String,
    pub description: String,
}

impl RegulatoryRule {
    /// Number of non-wildcard fields. Higher means more specific.
    pub fn specificity(&self) -> usize {
        [
            self.hs_chapter.is_some(),
            self.country_code.is_some(),
            self.origin_country_code.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn matches(&self, chapter: &str, country: &str, origin: Option<&str>) -> bool {
        let chapter_ok = self.hs_chapter.as_deref().map_or(true, |c| c == chapter);
        let country_ok = self
            .country_code
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(country));
        let origin_ok = match (self.origin_country_code.as_deref(), origin) {
            (None, _) => true,
            (Some(rule_origin), Some(o)) => rule_origin.eq_ignore_ascii_case(o),
            (Some(_), None) => false,
        };
        chapter_ok && country_ok && origin_ok
    }
}

/// Tariff applied by `country_code` to goods whose HS code starts with
/// `hs_prefix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffLine {
    pub country_code: String,
    pub hs_prefix: String,
    pub rate_percent: f64,
    #[serde(default)]
    pub non_tariff_measures: Vec<String>,
}

/// A document a shipment needs, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredDocument {
    pub name: String,
    pub issuer: String,
    pub description: String,
}

impl From<&RegulatoryRule> for RequiredDocument {
    fn from(rule: &RegulatoryRule) -> Self {
        Self {
            name: rule.document_name.clone(),
            issuer: rule.issuer.clone(),
            description: rule.description.clone(),
        }
    }
}

/// Trade volume summed per destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationAggregate {
    pub country_code: String,
    pub volume: f64,
    pub value_usd: f64,
    /// Number of trade-flow rows folded into this aggregate.
    pub rows: usize,
}

/// A ranked destination market for a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityResult {
    #[serde(rename = "country")]
    pub country_code: String,
    pub country_name: String,
    pub score: f64,
    pub demand_score: f64,
    pub tariff_score: f64,
    pub ease_score: f64,
    pub landed_cost: f64,
    pub tariff_rate: f64,
    pub required_documents: Vec<String>,
    pub non_tariff_measures: Vec<String>,
    pub volume: f64,
    pub value_usd: f64,
}

//! Shared country reference table.
//!
//! Every country name ↔ ISO 3166-1 alpha-2 mapping in Che.Comex goes
//! through this table: CSV import, HTTP query parameters, and result
//! presentation all normalize here.

use serde::Serialize;

/// A country known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    pub region: &'static str,
}

const fn c(code: &'static str, name: &'static str, region: &'static str) -> Country {
    Country { code, name, region }
}

/// Countries in alphabetical order of code.
pub const COUNTRIES: &[Country] = &[
    c("AE", "United Arab Emirates", "Middle East"),
    c("AR", "Argentina", "South America"),
    c("AU", "Australia", "Oceania"),
    c("BD", "Bangladesh", "South Asia"),
    c("BE", "Belgium", "Europe"),
    c("BO", "Bolivia", "South America"),
    c("BR", "Brazil", "South America"),
    c("CA", "Canada", "North America"),
    c("CH", "Switzerland", "Europe"),
    c("CL", "Chile", "South America"),
    c("CN", "China", "East Asia"),
    c("CO", "Colombia", "South America"),
    c("DE", "Germany", "Europe"),
    c("EC", "Ecuador", "South America"),
    c("EG", "Egypt", "Africa"),
    c("ES", "Spain", "Europe"),
    c("FR", "France", "Europe"),
    c("GB", "United Kingdom", "Europe"),
    c("ID", "Indonesia", "Southeast Asia"),
    c("IN", "India", "South Asia"),
    c("IT", "Italy", "Europe"),
    c("JP", "Japan", "East Asia"),
    c("KR", "South Korea", "East Asia"),
    c("MX", "Mexico", "North America"),
    c("MY", "Malaysia", "Southeast Asia"),
    c("NG", "Nigeria", "Africa"),
    c("NL", "Netherlands", "Europe"),
    c("PE", "Peru", "South America"),
    c("PH", "Philippines", "Southeast Asia"),
    c("PL", "Poland", "Europe"),
    c("PY", "Paraguay", "South America"),
    c("RU", "Russia", "Europe"),
    c("SA", "Saudi Arabia", "Middle East"),
    c("SG", "Singapore", "Southeast Asia"),
    c("TH", "Thailand", "Southeast Asia"),
    c("TR", "Turkey", "Middle East"),
    c("US", "United States", "North America"),
    c("UY", "Uruguay", "South America"),
    c("VN", "Vietnam", "Southeast Asia"),
    c("ZA", "South Africa", "Africa"),
];

/// Alternate spellings seen in imported data, mapped to codes.
const ALIASES: &[(&str, &str)] = &[
    ("usa", "US"),
    ("united states of america", "US"),
    ("estados unidos", "US"),
    ("uk", "GB"),
    ("great britain", "GB"),
    ("england", "GB"),
    ("holland", "NL"),
    ("korea", "KR"),
    ("republic of korea", "KR"),
    ("viet nam", "VN"),
    ("uae", "AE"),
    ("russian federation", "RU"),
    ("brasil", "BR"),
    ("alemania", "DE"),
    ("deutschland", "DE"),
    ("españa", "ES"),
    ("méxico", "MX"),
    ("türkiye", "TR"),
];

/// Finds a country by alpha-2 code, English name, or known alias.
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn lookup(name_or_code: &str) -> Option<&'static Country> {
    let needle = name_or_code.trim();
    if needle.is_empty() {
        return None;
    }

    if needle.len() == 2 {
        if let Some(found) = COUNTRIES
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(needle))
        {
            return Some(found);
        }
    }

    let lowered = needle.to_lowercase();
    if let Some(found) = COUNTRIES.iter().find(|c| c.name.to_lowercase() == lowered) {
        return Some(found);
    }

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .and_then(|(_, code)| COUNTRIES.iter().find(|c| c.code == *code))
}

/// Normalizes to an upper-case alpha-2 code. Unknown two-letter inputs
/// are kept (upper-cased) so rows for countries outside the table are not
/// lost; anything else unknown returns `None`.
pub fn normalize_code(name_or_code: &str) -> Option<String> {
    if let Some(country) = lookup(name_or_code) {
        return Some(country.code.to_string());
    }
    let trimmed = name_or_code.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(trimmed.to_ascii_uppercase());
    }
    None
}

/// Display name for a code, falling back to the code itself.
pub fn name_for(code: &str) -> String {
    lookup(code)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| code.to_ascii_uppercase())
}

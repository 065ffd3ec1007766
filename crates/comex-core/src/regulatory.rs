//! Regulatory decision table: tariffs, required documents, and
//! non-tariff measures per (destination, HS code, origin).
//!
//! # Resolution
//!
//! - **Tariff**: the destination's tariff line with the longest
//!   `hs_prefix` that prefixes the HS code. No match (unknown country or
//!   unlisted chapter) falls back to [`DEFAULT_MFN_RATE`].
//! - **Documents**: every rule whose non-wildcard fields all equal the
//!   query matches. Matches are ordered by specificity (descending, stable)
//!   and deduplicated by document name, keeping the most specific rule.
//!
//! The built-in rules tie everything beyond the four baseline documents to
//! a specific destination, so an unlisted destination gets exactly the
//! baseline set and the MFN default.

use serde::Serialize;

use crate::models::{HsCode, RegulatoryRule, RequiredDocument, TariffLine};

/// Generic WTO most-favoured-nation rate, in percent.
pub const DEFAULT_MFN_RATE: f64 = 12.0;

/// Everything the engine knows about shipping a product to a destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegulatoryProfile {
    pub country_code: String,
    pub hs_code: String,
    pub tariff_rate: f64,
    /// False when the tariff came from the MFN default.
    pub tariff_matched: bool,
    pub required_documents: Vec<RequiredDocument>,
    pub non_tariff_measures: Vec<String>,
}

/// In-memory rule set used by the opportunity engine and the document
/// lookup endpoints.
#[derive(Debug, Clone, Default)]
pub struct RegulatoryTable {
    tariffs: Vec<TariffLine>,
    rules: Vec<RegulatoryRule>,
}

impl RegulatoryTable {
    pub fn new(tariffs: Vec<TariffLine>, rules: Vec<RegulatoryRule>) -> Self {
        Self { tariffs, rules }
    }

    /// The static reference table shipped with the engine.
    pub fn builtin() -> Self {
        Self::new(builtin_tariff_lines(), builtin_rules())
    }

    pub fn tariff_lines(&self) -> &[TariffLine] {
        &self.tariffs
    }

    pub fn rules(&self) -> &[RegulatoryRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.tariffs.is_empty() && self.rules.is_empty()
    }

    fn tariff_line(&self, country: &str, hs_code: &HsCode) -> Option<&TariffLine> {
        self.tariffs
            .iter()
            .filter(|t| t.country_code.eq_ignore_ascii_case(country) && hs_code.starts_with(&t.hs_prefix))
            .max_by_key(|t| t.hs_prefix.len())
    }

    pub fn tariff_rate(&self, country: &str, hs_code: &HsCode) -> f64 {
        self.tariff_line(country, hs_code)
            .map(|t| t.rate_percent)
            .unwrap_or(DEFAULT_MFN_RATE)
    }

    pub fn non_tariff_measures(&self, country: &str, hs_code: &HsCode) -> Vec<String> {
        self.tariff_line(country, hs_code)
            .map(|t| t.non_tariff_measures.clone())
            .unwrap_or_default()
    }

    pub fn required_documents(
        &self,
        hs_code: &HsCode,
        country: &str,
        origin: Option<&str>,
    ) -> Vec<RequiredDocument> {
        let mut matched: Vec<&RegulatoryRule> = self
            .rules
            .iter()
            .filter(|r| r.matches(hs_code.chapter(), country, origin))
            .collect();
        // sort_by is stable: equal specificity keeps table order.
        matched.sort_by(|a, b| b.specificity().cmp(&a.specificity()));

        let mut docs: Vec<RequiredDocument> = Vec::with_capacity(matched.len());
        for rule in matched {
            if !docs.iter().any(|d| d.name == rule.document_name) {
                docs.push(RequiredDocument::from(rule));
            }
        }
        docs
    }

    pub fn resolve(&self, hs_code: &HsCode, country: &str, origin: Option<&str>) -> RegulatoryProfile {
        let line = self.tariff_line(country, hs_code);
        RegulatoryProfile {
            country_code: country.to_ascii_uppercase(),
            hs_code: hs_code.to_string(),
            tariff_rate: line.map(|t| t.rate_percent).unwrap_or(DEFAULT_MFN_RATE),
            tariff_matched: line.is_some(),
            required_documents: self.required_documents(hs_code, country, origin),
            non_tariff_measures: line.map(|t| t.non_tariff_measures.clone()).unwrap_or_default(),
        }
    }
}

fn tariff(country: &str, prefix: &str, rate: f64, measures: &[&str]) -> TariffLine {
    TariffLine {
        country_code: country.to_string(),
        hs_prefix: prefix.to_string(),
        rate_percent: rate,
        non_tariff_measures: measures.iter().map(|m| m.to_string()).collect(),
    }
}

fn rule(
    chapter: Option<&str>,
    country: Option<&str>,
    origin: Option<&str>,
    name: &str,
    issuer: &str,
    description: &str,
) -> RegulatoryRule {
    RegulatoryRule {
        hs_chapter: chapter.map(str::to_string),
        country_code: country.map(str::to_string),
        origin_country_code: origin.map(str::to_string),
        document_name: name.to_string(),
        issuer: issuer.to_string(),
        description: description.to_string(),
    }
}

/// Names of the documents every shipment needs.
pub const BASELINE_DOCUMENTS: [&str; 4] = [
    "Commercial Invoice",
    "Packing List",
    "Bill of Lading",
    "Certificate of Origin",
];

pub fn builtin_tariff_lines() -> Vec<TariffLine> {
    vec![
        // United States
        tariff("US", "09", 0.0, &["FDA Prior Notice", "FDA Food Facility Registration"]),
        tariff("US", "08", 2.5, &["FDA Prior Notice", "APHIS Fruit Import Permit"]),
        tariff("US", "02", 4.4, &["USDA FSIS Equivalence"]),
        tariff("US", "22", 6.3, &["TTB Certificate of Label Approval"]),
        tariff("US", "61", 16.5, &["Textile Country of Origin Labeling"]),
        tariff("US", "62", 16.6, &["Textile Country of Origin Labeling"]),
        tariff("US", "64", 10.0, &[]),
        tariff("US", "85", 2.6, &["FCC Equipment Authorization"]),
        tariff("US", "8703", 2.5, &["EPA/DOT Vehicle Compliance"]),
        // European Union members
        tariff("DE", "09", 7.5, &["EU Maximum Residue Limits"]),
        tariff("DE", "0901", 0.0, &["EU Maximum Residue Limits", "EU Deforestation Regulation Due Diligence"]),
        tariff("DE", "08", 8.0, &["EU Maximum Residue Limits"]),
        tariff("DE", "22", 12.0, &["EU Wine Labeling"]),
        tariff("DE", "61", 12.0, &["REACH Restricted Substances"]),
        tariff("DE", "85", 3.7, &["CE Marking", "RoHS Compliance"]),
        tariff("NL", "09", 7.5, &["EU Maximum Residue Limits"]),
        tariff("NL", "0901", 0.0, &["EU Maximum Residue Limits", "EU Deforestation Regulation Due Diligence"]),
        tariff("NL", "08", 8.0, &["EU Maximum Residue Limits"]),
        tariff("ES", "08", 8.0, &["EU Maximum Residue Limits"]),
        tariff("FR", "22", 12.0, &["EU Wine Labeling"]),
        // China
        tariff("CN", "09", 8.0, &["GACC Overseas Producer Registration"]),
        tariff("CN", "02", 12.0, &["GACC Overseas Producer Registration"]),
        tariff("CN", "12", 3.0, &["GMO Safety Certificate"]),
        tariff("CN", "26", 0.0, &[]),
        tariff("CN", "74", 2.0, &[]),
        tariff("CN", "85", 5.0, &["China Compulsory Certification (CCC)"]),
        // Japan
        tariff("JP", "09", 6.0, &["Food Sanitation Act Notification"]),
        tariff("JP", "0901", 0.0, &["Food Sanitation Act Notification"]),
        tariff("JP", "02", 38.5, &["Beef Safeguard Quota"]),
        tariff("JP", "85", 0.0, &["PSE Mark"]),
        // Others
        tariff("IN", "09", 100.0, &["FSSAI Import Clearance"]),
        tariff("IN", "85", 20.0, &["BIS Compulsory Registration"]),
        tariff("VN", "09", 20.0, &[]),
        tariff("VN", "85", 0.0, &[]),
        tariff("ID", "09", 5.0, &["Halal Certification"]),
        tariff("ID", "02", 5.0, &["Halal Certification"]),
        tariff("KR", "09", 8.0, &["MFDS Import Declaration"]),
        tariff("AE", "09", 5.0, &[]),
        tariff("AE", "02", 5.0, &["Halal Certification"]),
        tariff("CA", "09", 0.0, &["CFIA Safe Food License"]),
        tariff("CA", "61", 18.0, &["Textile Labelling Act"]),
        tariff("MX", "09", 20.0, &["NOM Labeling"]),
        tariff("GB", "09", 0.0, &["UK Maximum Residue Limits"]),
        tariff("GB", "22", 8.0, &[]),
    ]
}

pub fn builtin_rules() -> Vec<RegulatoryRule> {
    let mut rules = vec![
        rule(None, None, None, BASELINE_DOCUMENTS[0], "Exporter", "Itemized invoice stating price, Incoterm and currency"),
        rule(None, None, None, BASELINE_DOCUMENTS[1], "Exporter", "Per-package contents, weights and dimensions"),
        rule(None, None, None, BASELINE_DOCUMENTS[2], "Carrier", "Transport contract and receipt for the goods"),
        rule(None, None, None, BASELINE_DOCUMENTS[3], "Chamber of Commerce", "Declares the country where the goods were produced"),
    ];

    for country in ["US", "DE", "NL", "ES", "FR", "GB", "CN", "JP", "KR", "CA", "IN", "ID", "AE", "MX"] {
        for chapter in ["02", "03", "07", "08", "09", "10", "12"] {
            rules.push(rule(
                Some(chapter),
                Some(country),
                None,
                "Phytosanitary or Health Certificate",
                "Origin plant/animal health authority",
                "Certifies the consignment is free of pests and fit for consumption",
            ));
        }
    }

    rules.extend([
        rule(None, Some("US"), None, "ISF 10+2 Filing", "Importer", "Importer Security Filing lodged 24h before loading"),
        rule(Some("09"), Some("US"), None, "FDA Prior Notice Confirmation", "U.S. FDA", "Prior notice of imported food shipments"),
        rule(Some("85"), Some("US"), None, "FCC Declaration of Conformity", "Manufacturer", "Radio-frequency device compliance"),
        rule(Some("61"), Some("US"), None, "Textile Declaration", "Manufacturer", "Fiber content and country of origin declaration"),
        rule(None, Some("DE"), None, "EORI Registration", "EU Customs", "Economic operator registration number"),
        rule(None, Some("NL"), None, "EORI Registration", "EU Customs", "Economic operator registration number"),
        rule(None, Some("ES"), None, "EORI Registration", "EU Customs", "Economic operator registration number"),
        rule(None, Some("FR"), None, "EORI Registration", "EU Customs", "Economic operator registration number"),
        rule(Some("85"), Some("DE"), None, "EU Declaration of Conformity", "Manufacturer", "CE marking declaration"),
        rule(Some("09"), Some("DE"), None, "EUDR Due Diligence Statement", "Operator", "Deforestation-free and legal production statement"),
        rule(Some("09"), Some("NL"), None, "EUDR Due Diligence Statement", "Operator", "Deforestation-free and legal production statement"),
        rule(None, Some("DE"), Some("CO"), "EUR.1 Movement Certificate", "Origin customs", "Preferential origin under the EU-Andean trade agreement"),
        rule(None, Some("DE"), Some("PE"), "EUR.1 Movement Certificate", "Origin customs", "Preferential origin under the EU-Andean trade agreement"),
        rule(None, Some("DE"), Some("EC"), "EUR.1 Movement Certificate", "Origin customs", "Preferential origin under the EU-Andean trade agreement"),
        rule(None, Some("CN"), None, "CIQ Inspection Application", "GACC", "Entry inspection and quarantine application"),
        rule(Some("85"), Some("CN"), None, "CCC Certificate", "CNCA", "China Compulsory Certification"),
        rule(Some("02"), Some("CN"), None, "GACC Registration Number", "GACC", "Registered overseas food producer"),
        rule(None, Some("IN"), None, "Importer-Exporter Code", "DGFT", "Importer registration with the Directorate General of Foreign Trade"),
        rule(Some("85"), Some("IN"), None, "BIS Registration", "Bureau of Indian Standards", "Compulsory registration for electronics"),
        rule(Some("02"), Some("ID"), None, "Halal Certificate", "Recognized halal body", "Halal slaughter and handling certification"),
        rule(Some("02"), Some("AE"), None, "Halal Certificate", "Recognized halal body", "Halal slaughter and handling certification"),
        rule(None, Some("MX"), None, "Pedimento", "Customs broker", "Mexican customs entry declaration"),
        rule(None, Some("CA"), None, "Canada Customs Invoice", "Exporter", "CCI or equivalent commercial invoice"),
        rule(Some("02"), Some("JP"), None, "Meat Inspection Certificate", "Origin veterinary authority", "Export meat inspection certificate"),
    ]);

    rules
}

//! HS classification: free-text product description → HS code.
//!
//! The built-in [`KeywordClassifier`] matches description words against a
//! static catalogue of HS headings. The application crate can put a
//! remote classifier in front of it behind the same [`Classifier`] trait.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::HsCode;

/// A catalogue heading with the keywords that identify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsEntry {
    pub code: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

/// Result of classifying a product description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub hs_code: HsCode,
    pub description: String,
    /// `1.0` for an exact code, otherwise the share of the query's words
    /// that matched the chosen entry.
    pub confidence: f64,
}

/// Maps free-text product descriptions to HS codes.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns `None` when the description cannot be classified.
    async fn classify(&self, description: &str) -> Result<Option<Classification>>;
}

const fn e(
    code: &'static str,
    description: &'static str,
    keywords: &'static [&'static str],
) -> HsEntry {
    HsEntry {
        code,
        description,
        keywords,
    }
}

/// Headings most often traded through the marketplace.
pub const BUILTIN_CATALOGUE: &[HsEntry] = &[
    e("0201", "Meat of bovine animals, fresh or chilled", &["beef", "bovine", "meat", "carne"]),
    e("0303", "Fish, frozen", &["fish", "frozen", "salmon", "tuna", "pescado"]),
    e("0306", "Crustaceans", &["shrimp", "prawn", "lobster", "crab", "camaron"]),
    e("0709", "Vegetables, fresh or chilled (incl. avocados)", &["vegetable", "avocado", "asparagus", "palta", "aguacate"]),
    e("0803", "Bananas, fresh or dried", &["banana", "bananas", "plantain", "banano"]),
    e("0805", "Citrus fruit, fresh or dried", &["citrus", "orange", "lemon", "lime", "mandarin", "limon"]),
    e("0806", "Grapes, fresh or dried", &["grape", "grapes", "raisin", "raisins", "uva"]),
    e("0901", "Coffee, whether or not roasted", &["coffee", "cafe", "arabica", "robusta", "espresso"]),
    e("0902", "Tea", &["tea", "chai", "matcha"]),
    e("1001", "Wheat and meslin", &["wheat", "trigo", "meslin"]),
    e("1005", "Maize (corn)", &["maize", "corn", "maiz"]),
    e("1006", "Rice", &["rice", "arroz", "paddy"]),
    e("1201", "Soya beans", &["soy", "soya", "soybean", "soybeans", "soja"]),
    e("1511", "Palm oil", &["palm", "oil"]),
    e("1701", "Cane or beet sugar", &["sugar", "cane", "azucar"]),
    e("1801", "Cocoa beans", &["cocoa", "cacao", "beans"]),
    e("2204", "Wine of fresh grapes", &["wine", "vino", "merlot", "malbec"]),
    e("2601", "Iron ores and concentrates", &["iron", "ore", "hierro"]),
    e("2603", "Copper ores and concentrates", &["copper", "ore", "cobre"]),
    e("2709", "Petroleum oils, crude", &["crude", "petroleum", "oil", "petroleo"]),
    e("3004", "Medicaments, packaged for retail sale", &["medicine", "medicament", "pharmaceutical", "drug", "tablets"]),
    e("3304", "Beauty and make-up preparations", &["cosmetic", "cosmetics", "makeup", "skincare", "cream"]),
    e("3901", "Polymers of ethylene", &["polyethylene", "plastic", "polymer", "pellets"]),
    e("4011", "New pneumatic tyres, of rubber", &["tyre", "tire", "tires", "tyres", "rubber"]),
    e("4407", "Wood sawn or chipped lengthwise", &["wood", "lumber", "timber", "sawn", "madera"]),
    e("5201", "Cotton, not carded or combed", &["cotton", "algodon", "raw"]),
    e("6109", "T-shirts and vests, knitted", &["tshirt", "t-shirt", "shirt", "vest", "camiseta", "knitted"]),
    e("6203", "Men's suits, jackets and trousers", &["suit", "jacket", "trousers", "pants", "jeans"]),
    e("6403", "Footwear with leather uppers", &["shoes", "footwear", "leather", "boots", "zapatos"]),
    e("7108", "Gold, unwrought or semi-manufactured", &["gold", "oro", "bullion"]),
    e("7403", "Refined copper, unwrought", &["copper", "cathode", "cathodes", "refined"]),
    e("8471", "Automatic data-processing machines", &["computer", "laptop", "notebook", "server", "pc"]),
    e("8517", "Telephone sets, including smartphones", &["phone", "smartphone", "telephone", "mobile", "celular"]),
    e("8541", "Semiconductor devices, including solar cells", &["solar", "panel", "semiconductor", "photovoltaic", "diode"]),
    e("8703", "Motor cars and vehicles for transport of persons", &["car", "cars", "vehicle", "automobile", "auto"]),
    e("9403", "Other furniture and parts thereof", &["furniture", "table", "chair", "desk", "muebles"]),
];

/// Static HS heading catalogue with prefix and keyword search.
#[derive(Debug, Clone)]
pub struct HsCatalogue {
    entries: Vec<HsEntry>,
}

impl HsCatalogue {
    pub fn new(entries: Vec<HsEntry>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_CATALOGUE.to_vec())
    }

    pub fn entries(&self) -> &[HsEntry] {
        &self.entries
    }

    /// Looks up the entry whose code is the longest prefix of `code`.
    pub fn describe(&self, code: &HsCode) -> Option<&HsEntry> {
        self.entries
            .iter()
            .filter(|e| code.starts_with(e.code))
            .max_by_key(|e| e.code.len())
    }

    /// Entries whose code starts with `query`, or whose description or
    /// keywords contain it. Catalogue order is preserved.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&HsEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().take(limit).collect();
        }
        let code_query = HsCode::parse(&needle).ok();

        self.entries
            .iter()
            .filter(|e| match &code_query {
                Some(code) => e.code.starts_with(code.as_str()) || code.starts_with(e.code),
                None => {
                    e.description.to_lowercase().contains(&needle)
                        || e.keywords.iter().any(|k| k.contains(needle.as_str()))
                }
            })
            .take(limit)
            .collect()
    }
}

impl Default for HsCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Classifies by counting keyword hits per catalogue entry.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    catalogue: HsCatalogue,
}

impl KeywordClassifier {
    pub fn new(catalogue: HsCatalogue) -> Self {
        Self { catalogue }
    }

    /// Synchronous classification used by the async trait impl and by
    /// remote classifiers as their fallback.
    pub fn classify_text(&self, description: &str) -> Option<Classification> {
        if let Ok(code) = HsCode::parse(description.trim()) {
            let text = self
                .catalogue
                .describe(&code)
                .map(|e| e.description.to_string())
                .unwrap_or_default();
            return Some(Classification {
                hs_code: code,
                description: text,
                confidence: 1.0,
            });
        }

        let (words, word_count) = tokenize(description);
        if word_count == 0 {
            return None;
        }

        let mut best: Option<(&HsEntry, usize)> = None;
        for entry in self.catalogue.entries() {
            let hits = entry
                .keywords
                .iter()
                .filter(|k| words.contains(**k))
                .count();
            // Strictly greater keeps the earliest entry on ties.
            if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
                best = Some((entry, hits));
            }
        }

        let (entry, hits) = best?;
        let hs_code = HsCode::parse(entry.code).ok()?;
        Some(Classification {
            hs_code,
            description: entry.description.to_string(),
            confidence: (hits as f64 / word_count as f64).min(1.0),
        })
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, description: &str) -> Result<Option<Classification>> {
        let result = self.classify_text(description);
        tracing::debug!(
            description,
            hs_code = result.as_ref().map(|c| c.hs_code.as_str()),
            "keyword classification"
        );
        Ok(result)
    }
}

/// Lower-cased alphanumeric words for keyword matching, plus the number of
/// distinct words in the input. Hyphenated words are matched whole and by
/// their parts but count once.
fn tokenize(text: &str) -> (HashSet<String>, usize) {
    let mut words = HashSet::new();
    let mut originals = HashSet::new();
    for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '-')) {
        let word = raw.trim_matches('-').to_lowercase();
        if word.is_empty() {
            continue;
        }
        if word.contains('-') {
            for part in word.split('-').filter(|p| !p.is_empty()) {
                words.insert(part.to_string());
            }
        }
        originals.insert(word.clone());
        words.insert(word);
    }
    (words, originals.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_coffee() {
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("Roasted arabica coffee beans").unwrap();
        assert_eq!(result.hs_code.as_str(), "0901");
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[test]
    fn test_classify_exact_code() {
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("8517.12").unwrap();
        assert_eq!(result.hs_code.as_str(), "851712");
        assert_eq!(result.description, "Telephone sets, including smartphones");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_classify_no_match() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.classify_text("quantum flux capacitor").is_none());
        assert!(classifier.classify_text("   ").is_none());
    }

    #[test]
    fn test_classify_most_hits_wins() {
        // 2603 matches both words, 7403 and 2601 only one each.
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("copper ore").unwrap();
        assert_eq!(result.hs_code.as_str(), "2603");
    }

    #[test]
    fn test_classify_tie_prefers_catalogue_order() {
        // "oil" is a keyword of both 1511 and 2709.
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("oil").unwrap();
        assert_eq!(result.hs_code.as_str(), "1511");
    }

    #[test]
    fn test_classify_hyphenated() {
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("cotton T-Shirt").unwrap();
        assert_eq!(result.hs_code.as_str(), "6109");
    }

    #[test]
    fn test_confidence_counts_hyphenated_word_once() {
        // "t-shirt" and its part "shirt" both hit 6109; the input has three words.
        let classifier = KeywordClassifier::default();
        let result = classifier.classify_text("blue cotton t-shirt").unwrap();
        assert_eq!(result.hs_code.as_str(), "6109");
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_classifier_trait() {
        let classifier: Box<dyn Classifier> = Box::new(KeywordClassifier::default());
        let result = classifier.classify("fresh bananas").await.unwrap();
        assert_eq!(result.unwrap().hs_code.as_str(), "0803");
    }

    #[test]
    fn test_catalogue_search_by_prefix_and_text() {
        let catalogue = HsCatalogue::builtin();
        let by_code = catalogue.search("09", 10);
        assert_eq!(by_code.len(), 2);
        assert_eq!(by_code[0].code, "0901");

        let by_text = catalogue.search("coffee", 10);
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].code, "0901");

        assert_eq!(catalogue.search("", 3).len(), 3);
    }

    #[test]
    fn test_describe_longest_prefix() {
        let catalogue = HsCatalogue::builtin();
        let code = HsCode::parse("090121").unwrap();
        assert_eq!(catalogue.describe(&code).unwrap().code, "0901");
        assert!(catalogue.describe(&HsCode::parse("99").unwrap()).is_none());
    }
}

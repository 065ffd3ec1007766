//! The opportunity engine: rank destination markets for a product.
//!
//! # Pipeline
//!
//! 1. Fetch trade flows related to the HS code (optionally one year).
//! 2. Drop flows into the exporter's own country.
//! 3. Aggregate volume and value per destination (first-seen order).
//! 4. Resolve tariff, documents and non-tariff measures per destination.
//! 5. Score, rank (stable, descending), truncate.
//!
//! Nothing is cached; every call recomputes from the store.

use anyhow::Result;
use serde::Serialize;

use crate::aggregate::aggregate_by_destination;
use crate::countries;
use crate::models::{HsCode, OpportunityResult, TradeFlow};
use crate::regulatory::RegulatoryTable;
use crate::scoring::{self, ScoreWeights};
use crate::store::{hs_related, load_regulatory_table, TradeStore};

/// Inputs for one ranking.
#[derive(Debug, Clone)]
pub struct OpportunityRequest {
    pub hs_code: HsCode,
    /// Exporter's country (alpha-2). Used for origin-specific document
    /// rules and to exclude the home market.
    pub origin_country: Option<String>,
    pub fob_price: f64,
    pub logistics_cost: f64,
    pub year: Option<i32>,
    pub limit: Option<usize>,
}

/// Engine tuning, decoupled from application config.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineParams {
    pub weights: ScoreWeights,
}

pub struct OpportunityEngine<'a, S: TradeStore + ?Sized> {
    store: &'a S,
    table: RegulatoryTable,
    params: EngineParams,
}

impl<'a, S: TradeStore + ?Sized> OpportunityEngine<'a, S> {
    pub fn new(store: &'a S, table: RegulatoryTable, params: EngineParams) -> Self {
        Self {
            store,
            table,
            params,
        }
    }

    /// Builds an engine over the reference data held by `store`. An empty
    /// store falls back to the built-in table.
    pub async fn from_store(store: &'a S, params: EngineParams) -> Result<Self> {
        let table = load_regulatory_table(store).await?;
        Ok(Self::new(store, table, params))
    }

    pub fn table(&self) -> &RegulatoryTable {
        &self.table
    }

    /// Runs the full pipeline against stored trade flows.
    pub async fn rank(&self, req: &OpportunityRequest) -> Result<Vec<OpportunityResult>> {
        let rows = self.store.trade_flows(req.hs_code.as_str(), req.year).await?;
        Ok(self.rank_rows(req, rows))
    }

    /// Runs the pipeline over rows supplied by the caller (e.g. a remote
    /// trade-data source). Rows for unrelated HS codes or other years are
    /// dropped first.
    pub fn rank_rows(&self, req: &OpportunityRequest, rows: Vec<TradeFlow>) -> Vec<OpportunityResult> {
        let origin = req.origin_country.as_deref();
        let rows: Vec<TradeFlow> = rows
            .into_iter()
            .filter(|r| hs_related(r.hs_code.as_str(), req.hs_code.as_str()))
            .filter(|r| req.year.map_or(true, |y| r.year == y))
            .filter(|r| origin.map_or(true, |o| !r.destination_country.eq_ignore_ascii_case(o)))
            .collect();

        let aggregates = aggregate_by_destination(&rows);
        let max_volume = aggregates.iter().map(|a| a.volume).fold(0.0_f64, f64::max);

        let mut results: Vec<OpportunityResult> = aggregates
            .iter()
            .map(|agg| {
                let profile = self.table.resolve(&req.hs_code, &agg.country_code, origin);
                let breakdown = scoring::score(
                    agg.volume,
                    max_volume,
                    profile.tariff_rate,
                    profile.required_documents.len(),
                    &self.params.weights,
                );
                OpportunityResult {
                    country_code: agg.country_code.clone(),
                    country_name: countries::name_for(&agg.country_code),
                    score: breakdown.total,
                    demand_score: breakdown.demand,
                    tariff_score: breakdown.tariff,
                    ease_score: breakdown.ease,
                    landed_cost: scoring::landed_cost(
                        req.fob_price,
                        req.logistics_cost,
                        profile.tariff_rate,
                    ),
                    tariff_rate: profile.tariff_rate,
                    required_documents: profile
                        .required_documents
                        .into_iter()
                        .map(|d| d.name)
                        .collect(),
                    non_tariff_measures: profile.non_tariff_measures,
                    volume: agg.volume,
                    value_usd: agg.value_usd,
                }
            })
            .collect();

        scoring::rank(&mut results);
        if let Some(limit) = req.limit {
            results.truncate(limit);
        }

        tracing::debug!(
            hs_code = %req.hs_code,
            rows = rows.len(),
            destinations = results.len(),
            "ranked opportunities"
        );
        results
    }
}

/// Rows shown when the engine has no data for a product.
///
/// These are static placeholders, not computed from any store.
pub fn fallback_opportunities() -> Vec<OpportunityResult> {
    [
        ("IN", 85.0, 90.0, 76.0, 80.0),
        ("VN", 78.0, 75.0, 80.0, 80.0),
        ("ID", 72.0, 65.0, 80.0, 80.0),
    ]
    .into_iter()
    .map(|(code, score, demand, tariff, ease)| OpportunityResult {
        country_code: code.to_string(),
        country_name: countries::name_for(code),
        score,
        demand_score: demand,
        tariff_score: tariff,
        ease_score: ease,
        landed_cost: 0.0,
        tariff_rate: (100.0 - tariff) / 2.0,
        required_documents: crate::regulatory::BASELINE_DOCUMENTS
            .iter()
            .map(|d| d.to_string())
            .collect(),
        non_tariff_measures: Vec::new(),
        volume: 0.0,
        value_usd: 0.0,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regulatory::{BASELINE_DOCUMENTS, DEFAULT_MFN_RATE};
    use crate::store::memory::InMemoryStore;

    fn flow(origin: &str, dest: &str, year: i32, volume: f64) -> TradeFlow {
        TradeFlow {
            hs_code: HsCode::parse("0901").unwrap(),
            origin_country: origin.to_string(),
            destination_country: dest.to_string(),
            year,
            volume,
            value_usd: volume * 3.0,
        }
    }

    fn request(origin: Option<&str>) -> OpportunityRequest {
        OpportunityRequest {
            hs_code: HsCode::parse("0901").unwrap(),
            origin_country: origin.map(str::to_string),
            fob_price: 10_000.0,
            logistics_cost: 1_500.0,
            year: None,
            limit: None,
        }
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_trade_flows(
                &[
                    flow("BR", "US", 2023, 400.0),
                    flow("CO", "US", 2023, 100.0),
                    flow("BR", "DE", 2023, 300.0),
                    flow("BR", "FJ", 2023, 250.0),
                    flow("VN", "BR", 2023, 900.0),
                    flow("BR", "JP", 2022, 50.0),
                ],
                "test",
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_rank_end_to_end() {
        let store = seeded_store().await;
        let engine = OpportunityEngine::new(&store, RegulatoryTable::builtin(), EngineParams::default());
        let results = engine.rank(&request(Some("BR"))).await.unwrap();

        // BR is the origin, so its own imports are excluded.
        assert!(results.iter().all(|r| r.country_code != "BR"));
        assert_eq!(results.len(), 4);

        // US: 500 volume (max), 0% tariff, 7 documents → 40 + 30 + 19.5
        let us = &results[0];
        assert_eq!(us.country_code, "US");
        assert_eq!(us.country_name, "United States");
        assert!((us.demand_score - 100.0).abs() < 1e-9);
        assert!((us.tariff_score - 100.0).abs() < 1e-9);
        assert!((us.ease_score - 65.0).abs() < 1e-9);
        assert!((us.score - 89.5).abs() < 1e-9);
        assert!((us.landed_cost - 11_500.0).abs() < 1e-9);
        assert_eq!(us.volume, 500.0);

        for r in &results {
            assert!((0.0..=100.0).contains(&r.score));
            assert!(r.tariff_score >= 0.0 && r.ease_score >= 0.0);
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_unknown_destination_uses_defaults() {
        let store = seeded_store().await;
        let engine = OpportunityEngine::new(&store, RegulatoryTable::builtin(), EngineParams::default());
        let results = engine.rank(&request(Some("BR"))).await.unwrap();
        let fj = results.iter().find(|r| r.country_code == "FJ").unwrap();
        assert_eq!(fj.tariff_rate, DEFAULT_MFN_RATE);
        assert_eq!(fj.required_documents, BASELINE_DOCUMENTS.to_vec());
        assert!((fj.landed_cost - 12_700.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_year_filter_and_limit() {
        let store = seeded_store().await;
        let engine = OpportunityEngine::new(&store, RegulatoryTable::builtin(), EngineParams::default());
        let mut req = request(None);
        req.year = Some(2022);
        let results = engine.rank(&req).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].country_code, "JP");

        req.year = None;
        req.limit = Some(2);
        assert_eq!(engine.rank(&req).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let store = InMemoryStore::new();
        let engine = OpportunityEngine::from_store(&store, EngineParams::default())
            .await
            .unwrap();
        assert!(!engine.table().is_empty());
        assert!(engine.rank(&request(Some("BR"))).await.unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_aggregation_order() {
        let store = InMemoryStore::new();
        let engine = OpportunityEngine::new(&store, RegulatoryTable::default(), EngineParams::default());
        let rows = vec![
            flow("BR", "FJ", 2023, 100.0),
            flow("BR", "TO", 2023, 100.0),
            flow("BR", "WS", 2023, 100.0),
        ];
        let results = engine.rank_rows(&request(Some("BR")), rows);
        let order: Vec<&str> = results.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(order, vec!["FJ", "TO", "WS"]);
    }

    #[test]
    fn test_rank_rows_ignores_other_products() {
        let store = InMemoryStore::new();
        let engine = OpportunityEngine::new(&store, RegulatoryTable::builtin(), EngineParams::default());
        let mut phones = flow("BR", "CN", 2023, 999.0);
        phones.hs_code = HsCode::parse("8517").unwrap();
        let mut roasted = flow("BR", "DE", 2023, 5.0);
        roasted.hs_code = HsCode::parse("090121").unwrap();
        let rows = vec![flow("BR", "US", 2023, 10.0), phones, roasted];

        let results = engine.rank_rows(&request(Some("BR")), rows);
        let order: Vec<&str> = results.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(order, vec!["US", "DE"]);
        assert!((results[0].demand_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_rows() {
        let rows = fallback_opportunities();
        let names: Vec<&str> = rows.iter().map(|r| r.country_name.as_str()).collect();
        assert_eq!(names, vec!["India", "Vietnam", "Indonesia"]);
    }
}

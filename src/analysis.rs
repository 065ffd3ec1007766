//! Market analysis: the presenter in front of the opportunity engine.
//!
//! Used by both the `comex analyze` CLI command and
//! `GET /api/market-analysis`. Resolves the HS code (given directly or
//! classified from a product description), runs the engine over remote or
//! stored trade flows, and substitutes the static fallback rows when the
//! engine has nothing to rank.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use comex_core::classify::{Classifier, HsCatalogue};
use comex_core::countries;
use comex_core::models::{HsCode, OpportunityResult};
use comex_core::opportunity::{fallback_opportunities, OpportunityEngine, OpportunityRequest};
use comex_core::scoring::{landed_cost, round2};

use crate::classifier::create_classifier;
use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;
use crate::trade_source::RemoteTradeSource;

/// Query parameters shared by the CLI and HTTP frontends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisQuery {
    pub hs_code: Option<String>,
    pub product: Option<String>,
    pub origin: Option<String>,
    pub fob_price: Option<f64>,
    pub logistics_cost: Option<f64>,
    pub year: Option<i32>,
    pub limit: Option<usize>,
}

/// Response shape consumed by the dashboard map and sidebar.
#[derive(Debug, Clone, Serialize)]
pub struct MarketAnalysis {
    pub hs_code: String,
    pub product: String,
    pub origin: Option<String>,
    /// True when `opportunities` are the static placeholder rows.
    pub fallback: bool,
    pub opportunities: Vec<OpportunityResult>,
}

/// Builds the engine request from a query, applying config defaults.
async fn build_request(
    config: &Config,
    classifier: &dyn Classifier,
    query: &AnalysisQuery,
) -> Result<(OpportunityRequest, String)> {
    let (hs_code, product) = match (&query.hs_code, &query.product) {
        (Some(code), _) if !code.trim().is_empty() => {
            let hs_code = HsCode::parse(code)?;
            let product = HsCatalogue::builtin()
                .describe(&hs_code)
                .map(|e| e.description.to_string())
                .unwrap_or_default();
            (hs_code, product)
        }
        (_, Some(product)) if !product.trim().is_empty() => {
            match classifier.classify(product).await? {
                Some(c) => (c.hs_code, product.clone()),
                None => bail!("could not classify product: {}", product),
            }
        }
        _ => bail!("either hs_code or product must be provided"),
    };

    let origin_country = match query.origin.as_deref().map(str::trim) {
        Some(o) if !o.is_empty() => match countries::normalize_code(o) {
            Some(code) => Some(code),
            None => bail!("invalid origin country: {}", o),
        },
        _ => None,
    };

    let fob_price = query.fob_price.unwrap_or(config.scoring.default_fob_price);
    let logistics_cost = query
        .logistics_cost
        .unwrap_or(config.scoring.logistics_cost_estimate);
    if !(fob_price.is_finite() && fob_price >= 0.0)
        || !(logistics_cost.is_finite() && logistics_cost >= 0.0)
    {
        bail!("fob_price and logistics_cost must be finite and not negative");
    }

    let limit = query.limit.unwrap_or(config.scoring.final_limit);
    if limit == 0 {
        bail!("limit must be >= 1");
    }

    Ok((
        OpportunityRequest {
            hs_code,
            origin_country,
            fob_price,
            logistics_cost,
            year: query.year,
            limit: Some(limit),
        },
        product,
    ))
}

/// Core analysis function returning structured data (used by CLI and server).
pub async fn market_analysis(
    config: &Config,
    pool: &SqlitePool,
    classifier: &dyn Classifier,
    query: &AnalysisQuery,
) -> Result<MarketAnalysis> {
    let (req, product) = build_request(config, classifier, query).await?;

    let store = SqliteStore::new(pool.clone());
    let engine = OpportunityEngine::from_store(&store, config.scoring.engine_params()).await?;

    let remote_rows = match &config.trade_data {
        Some(td) => {
            RemoteTradeSource::new(td)?
                .fetch(req.hs_code.as_str(), req.origin_country.as_deref())
                .await
        }
        None => Vec::new(),
    };

    let mut opportunities = if remote_rows.is_empty() {
        engine.rank(&req).await?
    } else {
        engine.rank_rows(&req, remote_rows)
    };

    let fallback = opportunities.is_empty();
    if fallback {
        tracing::info!(hs_code = %req.hs_code, "no trade data; serving fallback opportunities");
        opportunities = fallback_opportunities();
        for o in &mut opportunities {
            o.landed_cost = landed_cost(req.fob_price, req.logistics_cost, o.tariff_rate);
        }
    }

    for o in &mut opportunities {
        o.score = round2(o.score);
        o.demand_score = round2(o.demand_score);
        o.tariff_score = round2(o.tariff_score);
        o.ease_score = round2(o.ease_score);
        o.landed_cost = round2(o.landed_cost);
    }

    Ok(MarketAnalysis {
        hs_code: req.hs_code.to_string(),
        product,
        origin: req.origin_country,
        fallback,
        opportunities,
    })
}

/// CLI entry point for `comex analyze`.
pub async fn run_analyze(config: &Config, query: &AnalysisQuery, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let classifier = create_classifier(config)?;
    let analysis = market_analysis(config, &pool, classifier.as_ref(), query).await;
    pool.close().await;
    let analysis = analysis?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "HS {} {}",
        analysis.hs_code,
        if analysis.product.is_empty() {
            String::new()
        } else {
            format!("({})", analysis.product)
        }
    );
    if let Some(ref origin) = analysis.origin {
        println!("origin: {} ({})", origin, countries::name_for(origin));
    }
    if analysis.fallback {
        println!("No trade data for this product; showing fallback markets.");
    }
    println!();
    println!(
        "  {:<4} {:<22} {:>7} {:>7} {:>7} {:>7} {:>7} {:>12}",
        "#", "COUNTRY", "SCORE", "DEMAND", "TARIFF", "EASE", "RATE%", "LANDED"
    );
    println!("  {}", "-".repeat(82));
    for (i, o) in analysis.opportunities.iter().enumerate() {
        println!(
            "  {:<4} {:<22} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>12.2}",
            i + 1,
            format!("{} {}", o.country_code, o.country_name),
            o.score,
            o.demand_score,
            o.tariff_score,
            o.ease_score,
            o.tariff_rate,
            o.landed_cost
        );
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TradeDataConfig;
    use crate::migrate::migrate_pool;
    use crate::test_support::spawn_mock;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use comex_core::classify::KeywordClassifier;
    use comex_core::models::TradeFlow;
    use comex_core::store::TradeStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool_with_flows() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());
        let flows: Vec<TradeFlow> = [("US", 300.0), ("DE", 200.0), ("BR", 999.0)]
            .iter()
            .map(|(dest, volume)| TradeFlow {
                hs_code: HsCode::parse("0901").unwrap(),
                origin_country: "CO".to_string(),
                destination_country: dest.to_string(),
                year: 2023,
                volume: *volume,
                value_usd: volume * 4.0,
            })
            .collect();
        store.insert_trade_flows(&flows, "test").await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_analysis_by_product_description() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        let query = AnalysisQuery {
            product: Some("specialty arabica coffee".to_string()),
            origin: Some("Brazil".to_string()),
            ..Default::default()
        };
        let analysis = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap();
        assert_eq!(analysis.hs_code, "0901");
        assert_eq!(analysis.origin.as_deref(), Some("BR"));
        assert!(!analysis.fallback);
        let countries: Vec<&str> = analysis
            .opportunities
            .iter()
            .map(|o| o.country_code.as_str())
            .collect();
        assert_eq!(countries, vec!["US", "DE"]);
    }

    #[tokio::test]
    async fn test_analysis_falls_back_when_no_rows() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        let query = AnalysisQuery {
            hs_code: Some("8517".to_string()),
            ..Default::default()
        };
        let analysis = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap();
        assert!(analysis.fallback);
        assert_eq!(analysis.opportunities.len(), 3);
        assert_eq!(analysis.product, "Telephone sets, including smartphones");
        // India placeholder: 12% tariff on the default 10000 FOB + 1500 logistics.
        assert_eq!(analysis.opportunities[0].country_code, "IN");
        assert_eq!(analysis.opportunities[0].landed_cost, 12_700.0);
    }

    #[tokio::test]
    async fn test_non_finite_prices_rejected() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        for (fob, logistics) in [(f64::NAN, 0.0), (f64::INFINITY, 0.0), (100.0, f64::NAN)] {
            let query = AnalysisQuery {
                hs_code: Some("0901".to_string()),
                fob_price: Some(fob),
                logistics_cost: Some(logistics),
                ..Default::default()
            };
            let err = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("must be finite"));
        }
    }

    fn remote_config(url: String) -> Config {
        let mut config = Config::minimal("unused.sqlite");
        config.trade_data = Some(TradeDataConfig {
            url,
            timeout_secs: 5,
        });
        config
    }

    #[tokio::test]
    async fn test_remote_rows_replace_stored_rows() {
        let app = Router::new().route(
            "/trade",
            get(|| async {
                Json(serde_json::json!([
                    {"hs_code": "0901", "origin_country": "BR", "destination_country": "USA",
                     "year": 2023, "volume": 10.0, "value_usd": 40.0},
                    {"hs_code": "0901", "origin_country": "BR", "destination_country": "JP",
                     "year": 2023, "volume": 40.0, "value_usd": 160.0},
                    {"hs_code": "8517", "origin_country": "BR", "destination_country": "CN",
                     "year": 2023, "volume": 999.0, "value_usd": 9990.0}
                ]))
            }),
        );
        let base = spawn_mock(app).await;
        let pool = pool_with_flows().await;
        let config = remote_config(format!("{}/trade", base));
        let query = AnalysisQuery {
            hs_code: Some("0901".to_string()),
            origin: Some("BR".to_string()),
            ..Default::default()
        };
        let analysis = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap();
        assert!(!analysis.fallback);
        let countries: Vec<&str> = analysis
            .opportunities
            .iter()
            .map(|o| o.country_code.as_str())
            .collect();
        // Stored rows (US 300, DE 200) are not used; the 8517 row is ignored.
        assert_eq!(countries, vec!["JP", "US"]);
        assert_eq!(analysis.opportunities[0].demand_score, 100.0);
        assert_eq!(analysis.opportunities[1].demand_score, 25.0);
    }

    #[tokio::test]
    async fn test_remote_error_uses_stored_rows() {
        let app = Router::new().route("/trade", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let base = spawn_mock(app).await;
        let pool = pool_with_flows().await;
        let config = remote_config(format!("{}/trade", base));
        let query = AnalysisQuery {
            hs_code: Some("0901".to_string()),
            origin: Some("BR".to_string()),
            ..Default::default()
        };
        let analysis = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap();
        let countries: Vec<&str> = analysis
            .opportunities
            .iter()
            .map(|o| o.country_code.as_str())
            .collect();
        assert_eq!(countries, vec!["US", "DE"]);
    }

    #[tokio::test]
    async fn test_analysis_requires_code_or_product() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        let err = market_analysis(
            &config,
            &pool,
            &KeywordClassifier::default(),
            &AnalysisQuery::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("must be provided"));
    }

    #[tokio::test]
    async fn test_analysis_rejects_unknown_origin() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        let query = AnalysisQuery {
            hs_code: Some("0901".to_string()),
            origin: Some("Atlantis".to_string()),
            ..Default::default()
        };
        let err = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid origin"));
    }

    #[tokio::test]
    async fn test_scores_rounded_for_presentation() {
        let pool = pool_with_flows().await;
        let config = Config::minimal("unused.sqlite");
        let query = AnalysisQuery {
            hs_code: Some("0901".to_string()),
            ..Default::default()
        };
        let analysis = market_analysis(&config, &pool, &KeywordClassifier::default(), &query)
            .await
            .unwrap();
        for o in &analysis.opportunities {
            assert_eq!(o.score, round2(o.score));
        }
    }
}

//! Regulatory lookups for a single destination: required documents,
//! tariff rate, and non-tariff measures.
//!
//! Shared by `comex documents`, `GET /api/documents/required` and
//! `GET /api/tariffs`.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::SqlitePool;

use comex_core::countries;
use comex_core::models::HsCode;
use comex_core::regulatory::RegulatoryProfile;
use comex_core::store::load_regulatory_table;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Tariff-only view returned by `GET /api/tariffs`.
#[derive(Debug, Clone, Serialize)]
pub struct TariffInfo {
    pub country_code: String,
    pub country_name: String,
    pub hs_code: String,
    pub tariff_rate: f64,
    pub tariff_matched: bool,
    pub non_tariff_measures: Vec<String>,
}

fn normalize_country(label: &str, value: &str) -> Result<String> {
    match countries::normalize_code(value) {
        Some(code) => Ok(code),
        None => bail!("invalid {} country: {}", label, value),
    }
}

/// Resolves the full regulatory profile for an HS code and destination.
pub async fn requirements(
    pool: &SqlitePool,
    hs_code: &str,
    country: &str,
    origin: Option<&str>,
) -> Result<RegulatoryProfile> {
    let hs_code = HsCode::parse(hs_code)?;
    let country = normalize_country("destination", country)?;
    let origin = origin
        .filter(|o| !o.trim().is_empty())
        .map(|o| normalize_country("origin", o))
        .transpose()?;

    let store = SqliteStore::new(pool.clone());
    let table = load_regulatory_table(&store).await?;
    Ok(table.resolve(&hs_code, &country, origin.as_deref()))
}

pub async fn tariff(pool: &SqlitePool, hs_code: &str, country: &str) -> Result<TariffInfo> {
    let profile = requirements(pool, hs_code, country, None).await?;
    Ok(TariffInfo {
        country_name: countries::name_for(&profile.country_code),
        country_code: profile.country_code,
        hs_code: profile.hs_code,
        tariff_rate: profile.tariff_rate,
        tariff_matched: profile.tariff_matched,
        non_tariff_measures: profile.non_tariff_measures,
    })
}

/// CLI entry point for `comex documents`.
pub async fn run_documents(
    config: &Config,
    hs_code: &str,
    country: &str,
    origin: Option<&str>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let profile = requirements(&pool, hs_code, country, origin).await;
    pool.close().await;
    let profile = profile?;

    println!(
        "HS {} into {} ({})",
        profile.hs_code,
        profile.country_code,
        countries::name_for(&profile.country_code)
    );
    println!(
        "tariff: {:.2}%{}",
        profile.tariff_rate,
        if profile.tariff_matched { "" } else { " (MFN default)" }
    );
    if !profile.non_tariff_measures.is_empty() {
        println!("non-tariff measures:");
        for m in &profile.non_tariff_measures {
            println!("  - {}", m);
        }
    }
    println!();
    println!("required documents ({}):", profile.required_documents.len());
    for (i, doc) in profile.required_documents.iter().enumerate() {
        println!("  {}. {} [{}]", i + 1, doc.name, doc.issuer);
        if !doc.description.is_empty() {
            println!("     {}", doc.description);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::migrate_pool;
    use comex_core::regulatory::{BASELINE_DOCUMENTS, DEFAULT_MFN_RATE};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn empty_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_unknown_country_gets_baseline() {
        let pool = empty_pool().await;
        let profile = requirements(&pool, "0901", "FJ", None).await.unwrap();
        assert_eq!(profile.tariff_rate, DEFAULT_MFN_RATE);
        assert!(!profile.tariff_matched);
        let names: Vec<&str> = profile
            .required_documents
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, BASELINE_DOCUMENTS.to_vec());
    }

    #[tokio::test]
    async fn test_country_names_are_accepted() {
        let pool = empty_pool().await;
        let info = tariff(&pool, "0901", "United States").await.unwrap();
        assert_eq!(info.country_code, "US");
        assert!(info.tariff_matched);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let pool = empty_pool().await;
        assert!(requirements(&pool, "abc", "US", None).await.is_err());
        let err = requirements(&pool, "0901", "Atlantis", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid destination"));
    }
}

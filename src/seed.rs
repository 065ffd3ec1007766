//! `comex seed`: reference data plus deterministic demo trade flows.
//!
//! Writes the built-in tariff lines and regulatory rules, then replaces all
//! rows with source `seed` by synthetic flows. Volumes come from a SHA-256
//! of `(hs, origin, destination, year)`, so reseeding always produces the
//! same table contents.

use anyhow::Result;
use sha2::{Digest, Sha256};

use comex_core::classify::BUILTIN_CATALOGUE;
use comex_core::models::{HsCode, TradeFlow};
use comex_core::regulatory::RegulatoryTable;
use comex_core::store::TradeStore;

use crate::config::Config;
use crate::db;
use crate::migrate::migrate_pool;
use crate::sqlite_store::SqliteStore;

pub const SEED_SOURCE: &str = "seed";

const SEED_ORIGINS: &[&str] = &["BR", "CO", "PE", "VN", "IN", "CN", "US", "DE"];

const SEED_DESTINATIONS: &[&str] = &[
    "US", "DE", "NL", "ES", "FR", "GB", "CN", "JP", "KR", "IN", "VN", "ID", "AE", "CA", "MX",
];

const SEED_YEARS: &[i32] = &[2021, 2022, 2023];

fn digest(hs: &str, origin: &str, destination: &str, year: i32) -> u64 {
    let hash = Sha256::digest(format!("{}|{}|{}|{}", hs, origin, destination, year).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_be_bytes(bytes)
}

/// Builds the synthetic flow set. Roughly a third of the
/// (product, origin, destination) lanes are dropped so rankings differ
/// between products.
pub fn synthetic_flows() -> Vec<TradeFlow> {
    let mut flows = Vec::new();
    for entry in BUILTIN_CATALOGUE {
        let Ok(hs_code) = HsCode::parse(entry.code) else {
            continue;
        };
        for origin in SEED_ORIGINS {
            for destination in SEED_DESTINATIONS {
                if origin == destination || digest(entry.code, origin, destination, 0) % 3 == 0 {
                    continue;
                }
                for &year in SEED_YEARS {
                    let h = digest(entry.code, origin, destination, year);
                    let volume = (h % 50_000) as f64 + 100.0;
                    let unit_price = ((h >> 20) % 4_000) as f64 / 100.0 + 0.5;
                    flows.push(TradeFlow {
                        hs_code: hs_code.clone(),
                        origin_country: origin.to_string(),
                        destination_country: destination.to_string(),
                        year,
                        volume,
                        value_usd: (volume * unit_price * 100.0).round() / 100.0,
                    });
                }
            }
        }
    }
    flows
}

/// Counts reported by a seed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub tariff_lines: usize,
    pub rules: usize,
    pub trade_flows: usize,
}

pub async fn seed_store<S: TradeStore + ?Sized>(store: &S) -> Result<SeedReport> {
    let table = RegulatoryTable::builtin();
    store
        .replace_reference_data(table.tariff_lines(), table.rules())
        .await?;

    let removed = store.delete_trade_flows(SEED_SOURCE).await?;
    if removed > 0 {
        tracing::debug!(removed, "cleared previous seed rows");
    }

    let flows = synthetic_flows();
    let inserted = store.insert_trade_flows(&flows, SEED_SOURCE).await?;

    Ok(SeedReport {
        tariff_lines: table.tariff_lines().len(),
        rules: table.rules().len(),
        trade_flows: inserted,
    })
}

/// CLI entry point for `comex seed`.
pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    let store = SqliteStore::new(pool.clone());
    let report = seed_store(&store).await;
    pool.close().await;
    let report = report?;

    println!("Seed complete:");
    println!("  tariff lines:     {}", report.tariff_lines);
    println!("  regulatory rules: {}", report.rules);
    println!("  trade flows:      {}", report.trade_flows);
    Ok(())
}

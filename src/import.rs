//! `comex import`: load trade flows from a CSV file.
//!
//! Expected header:
//!
//! ```text
//! hs_code,origin_country,destination_country,year,volume,value_usd
//! ```
//!
//! Countries may be alpha-2 codes or names known to the country table.
//! Rows that fail to parse or validate are skipped and counted; the rest
//! are inserted in one transaction under source `import:<file name>`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use comex_core::countries;
use comex_core::models::{HsCode, TradeFlow};
use comex_core::store::TradeStore;

use crate::config::Config;
use crate::db;
use crate::migrate::migrate_pool;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Deserialize)]
struct CsvRow {
    hs_code: String,
    origin_country: String,
    destination_country: String,
    year: i32,
    volume: f64,
    value_usd: f64,
}

impl CsvRow {
    fn into_flow(self) -> Option<TradeFlow> {
        let flow = TradeFlow {
            hs_code: HsCode::parse(&self.hs_code).ok()?,
            origin_country: countries::normalize_code(&self.origin_country)?,
            destination_country: countries::normalize_code(&self.destination_country)?,
            year: self.year,
            volume: self.volume,
            value_usd: self.value_usd,
        };
        flow.validate().ok()?;
        Some(flow)
    }
}

/// Rows accepted and rows skipped by a parse.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub flows: Vec<TradeFlow>,
    pub skipped: usize,
}

/// Parses CSV trade rows. Fails only when the header is unusable.
pub fn parse_trade_csv<R: Read>(reader: R) -> Result<ParsedCsv> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read CSV header")?;
    for required in [
        "hs_code",
        "origin_country",
        "destination_country",
        "year",
        "volume",
        "value_usd",
    ] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!("CSV header is missing column '{}'", required);
        }
    }

    let mut parsed = ParsedCsv::default();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        match result.ok().and_then(CsvRow::into_flow) {
            Some(flow) => parsed.flows.push(flow),
            None => {
                tracing::debug!(row = line + 1, "skipping invalid trade row");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Source tag stored with imported rows.
pub fn import_source(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    format!("import:{}", name)
}

/// CLI entry point for `comex import`.
///
/// With `replace`, rows previously imported from a file of the same name
/// are deleted first.
pub async fn run_import(config: &Config, path: &Path, replace: bool) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let parsed = parse_trade_csv(file)?;
    let source = import_source(path);

    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    let result = async {
        if replace {
            let removed = store.delete_trade_flows(&source).await?;
            tracing::info!(source = %source, removed, "replaced previous import");
        }
        store.insert_trade_flows(&parsed.flows, &source).await
    }
    .await;
    pool.close().await;
    let imported = result?;

    println!("imported: {}, skipped: {}", imported, parsed.skipped);
    Ok(())
}

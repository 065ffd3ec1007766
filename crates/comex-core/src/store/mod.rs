//! Storage abstraction for Che.Comex.
//!
//! The [`TradeStore`] trait covers every read and write the opportunity
//! pipeline and the reference-data commands need, so the pipeline can run
//! against SQLite in the application and against [`memory::InMemoryStore`]
//! in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{RegulatoryRule, TariffLine, TradeFlow};
use crate::regulatory::RegulatoryTable;

/// Abstract storage backend for trade flows and regulatory reference data.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_trade_flows`](TradeStore::insert_trade_flows) | Append trade-flow rows tagged with a source |
/// | [`delete_trade_flows`](TradeStore::delete_trade_flows) | Drop every row from one source |
/// | [`trade_flows`](TradeStore::trade_flows) | Rows related to an HS code, in insertion order |
/// | [`tariff_lines`](TradeStore::tariff_lines) | All tariff lines |
/// | [`regulatory_rules`](TradeStore::regulatory_rules) | All document rules, in table order |
/// | [`replace_reference_data`](TradeStore::replace_reference_data) | Swap the tariff and rule tables |
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Appends rows. Returns the number inserted.
    async fn insert_trade_flows(&self, flows: &[TradeFlow], source: &str) -> Result<usize>;

    /// Deletes all rows inserted with `source`. Returns the number removed.
    async fn delete_trade_flows(&self, source: &str) -> Result<u64>;

    /// Rows whose HS code is under `hs_code` (more specific) or is a
    /// parent of it (less specific), optionally restricted to one year.
    /// Insertion order is preserved.
    async fn trade_flows(&self, hs_code: &str, year: Option<i32>) -> Result<Vec<TradeFlow>>;

    async fn tariff_lines(&self) -> Result<Vec<TariffLine>>;

    async fn regulatory_rules(&self) -> Result<Vec<RegulatoryRule>>;

    /// Replaces both reference tables atomically where the backend allows.
    async fn replace_reference_data(
        &self,
        tariffs: &[TariffLine],
        rules: &[RegulatoryRule],
    ) -> Result<()>;
}

/// Builds a [`RegulatoryTable`] from the store's reference data. An empty
/// store falls back to [`RegulatoryTable::builtin`].
pub async fn load_regulatory_table<S: TradeStore + ?Sized>(store: &S) -> Result<RegulatoryTable> {
    let tariffs = store.tariff_lines().await?;
    let rules = store.regulatory_rules().await?;
    if tariffs.is_empty() && rules.is_empty() {
        tracing::debug!("no reference data stored; using built-in regulatory table");
        return Ok(RegulatoryTable::builtin());
    }
    Ok(RegulatoryTable::new(tariffs, rules))
}

/// True when one code is a prefix of the other.
pub fn hs_related(stored: &str, query: &str) -> bool {
    stored.starts_with(query) || query.starts_with(stored)
}

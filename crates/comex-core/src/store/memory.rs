//! In-memory [`TradeStore`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{RegulatoryRule, TariffLine, TradeFlow};

use super::{hs_related, TradeStore};

struct StoredFlow {
    flow: TradeFlow,
    source: String,
}

/// In-memory store for testing.
pub struct InMemoryStore {
    flows: RwLock<Vec<StoredFlow>>,
    tariffs: RwLock<Vec<TariffLine>>,
    rules: RwLock<Vec<RegulatoryRule>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            flows: RwLock::new(Vec::new()),
            tariffs: RwLock::new(Vec::new()),
            rules: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl TradeStore for InMemoryStore {
    async fn insert_trade_flows(&self, flows: &[TradeFlow], source: &str) -> Result<usize> {
        for flow in flows {
            flow.validate()?;
        }
        let mut stored = self.flows.write().map_err(poisoned)?;
        stored.extend(flows.iter().map(|f| StoredFlow {
            flow: f.clone(),
            source: source.to_string(),
        }));
        Ok(flows.len())
    }

    async fn delete_trade_flows(&self, source: &str) -> Result<u64> {
        let mut stored = self.flows.write().map_err(poisoned)?;
        let before = stored.len();
        stored.retain(|s| s.source != source);
        Ok((before - stored.len()) as u64)
    }

    async fn trade_flows(&self, hs_code: &str, year: Option<i32>) -> Result<Vec<TradeFlow>> {
        let stored = self.flows.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .filter(|s| hs_related(s.flow.hs_code.as_str(), hs_code))
            .filter(|s| year.map_or(true, |y| s.flow.year == y))
            .map(|s| s.flow.clone())
            .collect())
    }

    async fn tariff_lines(&self) -> Result<Vec<TariffLine>> {
        Ok(self.tariffs.read().map_err(poisoned)?.clone())
    }

    async fn regulatory_rules(&self) -> Result<Vec<RegulatoryRule>> {
        Ok(self.rules.read().map_err(poisoned)?.clone())
    }

    async fn replace_reference_data(
        &self,
        tariffs: &[TariffLine],
        rules: &[RegulatoryRule],
    ) -> Result<()> {
        *self.tariffs.write().map_err(poisoned)? = tariffs.to_vec();
        *self.rules.write().map_err(poisoned)? = rules.to_vec();
        Ok(())
    }
}

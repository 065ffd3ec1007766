//! SQLite-backed [`TradeStore`] implementation.
//!
//! Maps each [`TradeStore`] operation onto the schema created by
//! [`crate::migrate`] (trade_flows, tariff_lines, regulatory_rules).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use comex_core::models::{HsCode, RegulatoryRule, TariffLine, TradeFlow};
use comex_core::store::TradeStore;

/// SQLite implementation of the [`TradeStore`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TradeStore for SqliteStore {
    async fn insert_trade_flows(&self, flows: &[TradeFlow], source: &str) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for flow in flows {
            flow.validate()?;
            sqlx::query(
                r#"
                INSERT INTO trade_flows (id, hs_code, origin_country, destination_country,
                                         year, volume, value_usd, source, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(flow.hs_code.as_str())
            .bind(&flow.origin_country)
            .bind(&flow.destination_country)
            .bind(flow.year)
            .bind(flow.volume)
            .bind(flow.value_usd)
            .bind(source)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(flows.len())
    }

    async fn delete_trade_flows(&self, source: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM trade_flows WHERE source = ?")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn trade_flows(&self, hs_code: &str, year: Option<i32>) -> Result<Vec<TradeFlow>> {
        let rows = sqlx::query(
            r#"
            SELECT hs_code, origin_country, destination_country, year, volume, value_usd
            FROM trade_flows
            WHERE (hs_code LIKE ? || '%' OR ? LIKE hs_code || '%')
              AND (? IS NULL OR year = ?)
            ORDER BY rowid ASC
            "#,
        )
        .bind(hs_code)
        .bind(hs_code)
        .bind(year)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TradeFlow> {
                let code: String = row.get("hs_code");
                Ok(TradeFlow {
                    hs_code: HsCode::parse(&code)
                        .with_context(|| format!("corrupt hs_code in trade_flows: {}", code))?,
                    origin_country: row.get("origin_country"),
                    destination_country: row.get("destination_country"),
                    year: row.get("year"),
                    volume: row.get("volume"),
                    value_usd: row.get("value_usd"),
                })
            })
            .collect()
    }

    async fn tariff_lines(&self) -> Result<Vec<TariffLine>> {
        let rows = sqlx::query(
            "SELECT country_code, hs_prefix, rate_percent, non_tariff_measures_json FROM tariff_lines ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TariffLine> {
                let measures_json: String = row.get("non_tariff_measures_json");
                Ok(TariffLine {
                    country_code: row.get("country_code"),
                    hs_prefix: row.get("hs_prefix"),
                    rate_percent: row.get("rate_percent"),
                    non_tariff_measures: serde_json::from_str(&measures_json)
                        .context("corrupt non_tariff_measures_json")?,
                })
            })
            .collect()
    }

    async fn regulatory_rules(&self) -> Result<Vec<RegulatoryRule>> {
        let rows = sqlx::query(
            r#"
            SELECT hs_chapter, country_code, origin_country_code, document_name, issuer, description
            FROM regulatory_rules
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RegulatoryRule {
                hs_chapter: row.get("hs_chapter"),
                country_code: row.get("country_code"),
                origin_country_code: row.get("origin_country_code"),
                document_name: row.get("document_name"),
                issuer: row.get("issuer"),
                description: row.get("description"),
            })
            .collect())
    }

    async fn replace_reference_data(
        &self,
        tariffs: &[TariffLine],
        rules: &[RegulatoryRule],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tariff_lines")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM regulatory_rules")
            .execute(&mut *tx)
            .await?;

        for line in tariffs {
            sqlx::query(
                r#"
                INSERT INTO tariff_lines (country_code, hs_prefix, rate_percent, non_tariff_measures_json)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(country_code, hs_prefix) DO UPDATE SET
                    rate_percent = excluded.rate_percent,
                    non_tariff_measures_json = excluded.non_tariff_measures_json
                "#,
            )
            .bind(&line.country_code)
            .bind(&line.hs_prefix)
            .bind(line.rate_percent)
            .bind(serde_json::to_string(&line.non_tariff_measures)?)
            .execute(&mut *tx)
            .await?;
        }

        for rule in rules {
            sqlx::query(
                r#"
                INSERT INTO regulatory_rules (hs_chapter, country_code, origin_country_code,
                                              document_name, issuer, description)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&rule.hs_chapter)
            .bind(&rule.country_code)
            .bind(&rule.origin_country_code)
            .bind(&rule.document_name)
            .bind(&rule.issuer)
            .bind(&rule.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::migrate_pool;
    use comex_core::regulatory::RegulatoryTable;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn flow(hs: &str, dest: &str, year: i32, volume: f64) -> TradeFlow {
        TradeFlow {
            hs_code: HsCode::parse(hs).unwrap(),
            origin_country: "BR".to_string(),
            destination_country: dest.to_string(),
            year,
            volume,
            value_usd: volume * 2.0,
        }
    }

    #[tokio::test]
    async fn test_trade_flows_roundtrip_in_insertion_order() {
        let store = memory_store().await;
        store
            .insert_trade_flows(
                &[
                    flow("090121", "US", 2023, 10.0),
                    flow("09", "DE", 2022, 20.0),
                    flow("0902", "JP", 2023, 30.0),
                    flow("0901", "CN", 2023, 40.0),
                ],
                "test",
            )
            .await
            .unwrap();

        let rows = store.trade_flows("0901", None).await.unwrap();
        let dests: Vec<&str> = rows.iter().map(|r| r.destination_country.as_str()).collect();
        assert_eq!(dests, vec!["US", "DE", "CN"]);
        assert_eq!(rows[0].hs_code.as_str(), "090121");
        assert_eq!(rows[0].value_usd, 20.0);

        let only_2023 = store.trade_flows("0901", Some(2023)).await.unwrap();
        assert_eq!(only_2023.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_is_all_or_nothing() {
        let store = memory_store().await;
        let mut bad = flow("0901", "US", 2023, 1.0);
        bad.volume = -1.0;
        let result = store
            .insert_trade_flows(&[flow("0901", "DE", 2023, 1.0), bad], "test")
            .await;
        assert!(result.is_err());
        assert!(store.trade_flows("0901", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_source() {
        let store = memory_store().await;
        store
            .insert_trade_flows(&[flow("0901", "US", 2023, 1.0)], "seed")
            .await
            .unwrap();
        store
            .insert_trade_flows(&[flow("0901", "DE", 2023, 1.0)], "import:a.csv")
            .await
            .unwrap();
        assert_eq!(store.delete_trade_flows("seed").await.unwrap(), 1);
        assert_eq!(store.trade_flows("0901", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reference_data_roundtrip() {
        let store = memory_store().await;
        let table = RegulatoryTable::builtin();
        store
            .replace_reference_data(table.tariff_lines(), table.rules())
            .await
            .unwrap();
        // Replacing twice must not duplicate.
        store
            .replace_reference_data(table.tariff_lines(), table.rules())
            .await
            .unwrap();

        let tariffs = store.tariff_lines().await.unwrap();
        let rules = store.regulatory_rules().await.unwrap();
        assert_eq!(tariffs, table.tariff_lines().to_vec());
        assert_eq!(rules, table.rules().to_vec());
    }
}

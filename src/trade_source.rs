//! Remote trade-volume source.
//!
//! Queried before stored rows when `[trade_data]` is configured. Every
//! failure (connect, timeout, non-2xx status, malformed JSON) is logged and
//! produces an empty list; the caller then uses stored trade flows.
//!
//! ```text
//! GET {url}?hs_code=0901&origin=BR
//! 200 [ {"hs_code": "0901", "origin_country": "BR", "destination_country": "US",
//!        "year": 2023, "volume": 1200.0, "value_usd": 5400000.0}, ... ]
//! ```

use anyhow::Result;
use std::time::Duration;

use comex_core::countries;
use comex_core::models::TradeFlow;

use crate::config::TradeDataConfig;

pub struct RemoteTradeSource {
    client: reqwest::Client,
    url: String,
}

impl RemoteTradeSource {
    pub fn new(config: &TradeDataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Fetches rows for an HS code. Never fails; see module docs.
    pub async fn fetch(&self, hs_code: &str, origin: Option<&str>) -> Vec<TradeFlow> {
        match self.try_fetch(hs_code, origin).await {
            Ok(rows) => {
                tracing::debug!(hs_code, rows = rows.len(), "fetched remote trade data");
                rows
            }
            Err(e) => {
                tracing::warn!(hs_code, error = %e, "remote trade data unavailable");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, hs_code: &str, origin: Option<&str>) -> Result<Vec<TradeFlow>> {
        let mut query: Vec<(&str, &str)> = vec![("hs_code", hs_code)];
        if let Some(o) = origin {
            query.push(("origin", o));
        }

        let response = self.client.get(&self.url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("trade data service returned {}", status);
        }

        let rows: Vec<TradeFlow> = response.json().await?;
        Ok(sanitize(rows))
    }
}

/// Drops invalid rows and normalizes country names to alpha-2 codes.
fn sanitize(rows: Vec<TradeFlow>) -> Vec<TradeFlow> {
    rows.into_iter()
        .filter_map(|mut row| {
            row.origin_country = countries::normalize_code(&row.origin_country)?;
            row.destination_country = countries::normalize_code(&row.destination_country)?;
            row.validate().ok()?;
            Some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;

    fn source(url: String) -> RemoteTradeSource {
        RemoteTradeSource::new(&TradeDataConfig {
            url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_query_and_sanitizes_rows() {
        let app = Router::new().route(
            "/trade",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("hs_code").map(String::as_str), Some("0901"));
                assert_eq!(params.get("origin").map(String::as_str), Some("BR"));
                Json(serde_json::json!([
                    {"hs_code": "0901", "origin_country": "BR", "destination_country": "Germany",
                     "year": 2023, "volume": 12.0, "value_usd": 50.0},
                    {"hs_code": "0901", "origin_country": "BR", "destination_country": "Atlantis",
                     "year": 2023, "volume": 3.0, "value_usd": 9.0}
                ]))
            }),
        );
        let base = spawn_mock(app).await;
        let rows = source(format!("{}/trade", base)).fetch("0901", Some("BR")).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].destination_country, "DE");
        assert_eq!(rows[0].volume, 12.0);
    }

    #[tokio::test]
    async fn test_error_status_returns_empty() {
        let app = Router::new().route("/trade", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = spawn_mock(app).await;
        assert!(source(format!("{}/trade", base)).fetch("0901", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_returns_empty() {
        let app = Router::new().route("/trade", get(|| async { "not json" }));
        let base = spawn_mock(app).await;
        assert!(source(format!("{}/trade", base)).fetch("0901", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_source_returns_empty() {
        let source = RemoteTradeSource::new(&TradeDataConfig {
            url: "http://127.0.0.1:9/trade".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        assert!(source.fetch("0901", Some("BR")).await.is_empty());
    }

    #[test]
    fn test_sanitize_normalizes_and_filters() {
        let rows: Vec<TradeFlow> = serde_json::from_str(
            r#"[
                {"hs_code": "0901", "origin_country": "Brazil", "destination_country": "USA",
                 "year": 2023, "volume": 10.0, "value_usd": 30.0},
                {"hs_code": "0901", "origin_country": "BR", "destination_country": "Atlantis",
                 "year": 2023, "volume": 10.0, "value_usd": 30.0},
                {"hs_code": "0901", "origin_country": "BR", "destination_country": "DE",
                 "year": 2023, "volume": -4.0, "value_usd": 30.0}
            ]"#,
        )
        .unwrap();
        let clean = sanitize(rows);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].origin_country, "BR");
        assert_eq!(clean[0].destination_country, "US");
    }
}

//! Classifier construction and the `comex classify` command.
//!
//! Two providers are supported:
//!
//! - **`keyword`** (default): [`KeywordClassifier`] over the built-in HS
//!   catalogue. No network access.
//! - **`remote`**: [`RemoteClassifier`] posts the description to an HTTP
//!   service and falls back to the keyword classifier on any failure.
//!
//! # Remote protocol
//!
//! ```text
//! POST {url}   {"description": "roasted coffee beans"}
//! 200          {"hs_code": "0901.21", "description": "...", "confidence": 0.93}
//! 200          {"hs_code": null}            (not classifiable)
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use comex_core::classify::{Classification, Classifier, KeywordClassifier};
use comex_core::models::HsCode;

use crate::config::{ClassifierConfig, Config};

/// Classifier backed by an external HTTP service.
pub struct RemoteClassifier {
    client: reqwest::Client,
    url: String,
    fallback: KeywordClassifier,
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    hs_code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl RemoteClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("classifier.url required for remote provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            fallback: KeywordClassifier::default(),
        })
    }

    async fn call(&self, description: &str) -> Result<Option<Classification>> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "description": description }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("classifier service error {}: {}", status, body);
        }

        let parsed: RemoteResponse = response.json().await?;
        let Some(raw_code) = parsed.hs_code else {
            return Ok(None);
        };
        let hs_code = HsCode::parse(&raw_code)?;
        Ok(Some(Classification {
            hs_code,
            description: parsed.description.unwrap_or_default(),
            confidence: parsed.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        }))
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, description: &str) -> Result<Option<Classification>> {
        match self.call(description).await {
            Ok(Some(result)) => Ok(Some(result)),
            Ok(None) => {
                tracing::debug!(description, "remote classifier returned no code; trying keywords");
                Ok(self.fallback.classify_text(description))
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote classifier failed; falling back to keywords");
                Ok(self.fallback.classify_text(description))
            }
        }
    }
}

/// Builds the classifier selected by `[classifier].provider`.
pub fn create_classifier(config: &Config) -> Result<Box<dyn Classifier>> {
    match config.classifier.provider.as_str() {
        "keyword" => Ok(Box::new(KeywordClassifier::default())),
        "remote" => Ok(Box::new(RemoteClassifier::new(&config.classifier)?)),
        other => anyhow::bail!("Unknown classifier provider: '{}'", other),
    }
}

/// CLI entry point for `comex classify`.
pub async fn run_classify(config: &Config, description: &str) -> Result<()> {
    let classifier = create_classifier(config)?;
    match classifier.classify(description).await? {
        Some(c) => {
            println!("hs_code:     {}", c.hs_code);
            println!("chapter:     {}", c.hs_code.chapter());
            println!("description: {}", c.description);
            println!("confidence:  {:.2}", c.confidence);
        }
        None => {
            println!("No classification for: {}", description);
        }
    }
    Ok(())
}

//! Opportunity scoring.
//!
//! ```text
//! demand = volume / max_volume * 100
//! tariff = max(0, 100 - tariff_rate * 2)
//! ease   = max(0, 100 - document_count * 5)
//! total  = demand * w_demand + tariff * w_tariff + ease * w_ease
//! landed = fob + logistics + fob * tariff_rate / 100
//! ```
//!
//! With non-negative weights summing to 1 and each sub-score in
//! `[0, 100]`, the total stays in `[0, 100]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::OpportunityResult;

#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    #[error("score weights must be non-negative and finite")]
    Negative,
    #[error("score weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Relative weights of the three sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub demand: f64,
    pub tariff: f64,
    pub ease: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            demand: 0.4,
            tariff: 0.3,
            ease: 0.3,
        }
    }
}

impl ScoreWeights {
    pub fn new(demand: f64, tariff: f64, ease: f64) -> Result<Self, WeightsError> {
        let weights = Self {
            demand,
            tariff,
            ease,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), WeightsError> {
        let all = [self.demand, self.tariff, self.ease];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WeightsError::Negative);
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }
}

/// Sub-scores and total for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub demand: f64,
    pub tariff: f64,
    pub ease: f64,
    pub total: f64,
}

/// Share of the best destination's volume, as a percentage.
/// A zero (or negative) maximum yields 0.
pub fn demand_score(volume: f64, max_volume: f64) -> f64 {
    if max_volume <= 0.0 || !max_volume.is_finite() {
        return 0.0;
    }
    (volume.max(0.0) / max_volume * 100.0).min(100.0)
}

pub fn tariff_score(tariff_rate_percent: f64) -> f64 {
    (100.0 - tariff_rate_percent * 2.0).clamp(0.0, 100.0)
}

pub fn ease_score(required_document_count: usize) -> f64 {
    (100.0 - required_document_count as f64 * 5.0).max(0.0)
}

pub fn score(
    volume: f64,
    max_volume: f64,
    tariff_rate_percent: f64,
    required_document_count: usize,
    weights: &ScoreWeights,
) -> ScoreBreakdown {
    let demand = demand_score(volume, max_volume);
    let tariff = tariff_score(tariff_rate_percent);
    let ease = ease_score(required_document_count);
    ScoreBreakdown {
        demand,
        tariff,
        ease,
        total: (demand * weights.demand + tariff * weights.tariff + ease * weights.ease)
            .clamp(0.0, 100.0),
    }
}

pub fn landed_cost(fob_price: f64, logistics_cost: f64, tariff_rate_percent: f64) -> f64 {
    fob_price + logistics_cost + fob_price * (tariff_rate_percent / 100.0)
}

/// Sorts by score, highest first. Stable: equal scores keep input order.
pub fn rank(results: &mut [OpportunityResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Rounds to two decimals for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

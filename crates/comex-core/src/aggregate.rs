//! Trade-flow aggregation by destination.

use std::collections::HashMap;

use crate::models::{DestinationAggregate, TradeFlow};

/// Sums volume and value per destination country.
///
/// Output order is the order in which each destination first appears in
/// `rows`. Ranking relies on this: equal scores keep aggregation order.
pub fn aggregate_by_destination(rows: &[TradeFlow]) -> Vec<DestinationAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<DestinationAggregate> = Vec::new();

    for row in rows {
        let slot = *index
            .entry(row.destination_country.as_str())
            .or_insert_with(|| {
                out.push(DestinationAggregate {
                    country_code: row.destination_country.clone(),
                    volume: 0.0,
                    value_usd: 0.0,
                    rows: 0,
                });
                out.len() - 1
            });
        let agg = &mut out[slot];
        agg.volume += row.volume;
        agg.value_usd += row.value_usd;
        agg.rows += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HsCode;

    fn flow(dest: &str, year: i32, volume: f64, value: f64) -> TradeFlow {
        TradeFlow {
            hs_code: HsCode::parse("0901").unwrap(),
            origin_country: "BR".to_string(),
            destination_country: dest.to_string(),
            year,
            volume,
            value_usd: value,
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_by_destination(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_sums_per_destination() {
        let rows = vec![
            flow("US", 2022, 100.0, 1000.0),
            flow("DE", 2022, 50.0, 600.0),
            flow("US", 2023, 20.0, 250.0),
        ];
        let aggs = aggregate_by_destination(&rows);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].country_code, "US");
        assert_eq!(aggs[0].volume, 120.0);
        assert_eq!(aggs[0].value_usd, 1250.0);
        assert_eq!(aggs[0].rows, 2);
        assert_eq!(aggs[1].country_code, "DE");
        assert_eq!(aggs[1].rows, 1);
    }

    #[test]
    fn test_aggregate_first_seen_order() {
        let rows = vec![
            flow("JP", 2023, 1.0, 1.0),
            flow("CN", 2023, 99.0, 1.0),
            flow("JP", 2023, 1.0, 1.0),
            flow("AE", 2023, 5.0, 1.0),
        ];
        let order: Vec<String> = aggregate_by_destination(&rows)
            .into_iter()
            .map(|a| a.country_code)
            .collect();
        assert_eq!(order, vec!["JP", "CN", "AE"]);
    }
}

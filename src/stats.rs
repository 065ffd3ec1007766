//! Database statistics and health overview.
//!
//! Summarizes what is loaded: trade-flow counts, product and destination
//! coverage, reference-data sizes, and a per-source breakdown. Used by
//! `comex stats` to confirm that seeds and imports landed.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Per-source breakdown of trade-flow rows.
struct SourceStats {
    source: String,
    row_count: i64,
    hs_count: i64,
    destination_count: i64,
    last_import_ts: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_flows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trade_flows")
        .fetch_one(&pool)
        .await?;

    let distinct_hs: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT hs_code) FROM trade_flows")
        .fetch_one(&pool)
        .await?;

    let distinct_destinations: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT destination_country) FROM trade_flows")
            .fetch_one(&pool)
            .await?;

    let tariff_lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tariff_lines")
        .fetch_one(&pool)
        .await?;

    let rules: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM regulatory_rules")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Che.Comex Database Stats");
    println!("========================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!("  Trade flows:   {}", total_flows);
    println!("  HS codes:      {}", distinct_hs);
    println!("  Destinations:  {}", distinct_destinations);
    println!("  Tariff lines:  {}", tariff_lines);
    println!(
        "  Rules:         {}{}",
        rules,
        if tariff_lines == 0 && rules == 0 {
            " (built-in table in use)"
        } else {
            ""
        }
    );

    let source_rows = sqlx::query(
        r#"
        SELECT
            source,
            COUNT(*) AS row_count,
            COUNT(DISTINCT hs_code) AS hs_count,
            COUNT(DISTINCT destination_country) AS destination_count,
            MAX(created_at) AS last_import
        FROM trade_flows
        GROUP BY source
        ORDER BY row_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            row_count: row.get("row_count"),
            hs_count: row.get("hs_count"),
            destination_count: row.get("destination_count"),
            last_import_ts: row.get("last_import"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<28} {:>8} {:>6} {:>6}   {}",
            "SOURCE", "ROWS", "HS", "DEST", "LOADED"
        );
        println!("  {}", "-".repeat(70));

        for s in &source_stats {
            let loaded = match s.last_import_ts {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<28} {:>8} {:>6} {:>6}   {}",
                s.source, s.row_count, s.hs_count, s.destination_count, loaded
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts_relative(ts: i64) -> String {
    relative_to(chrono::Utc::now().timestamp(), ts)
}

fn relative_to(now: i64, ts: i64) -> String {
    let delta = now - ts;
    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index. Safe to run repeatedly.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Create trade flows table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trade_flows (
            id TEXT PRIMARY KEY,
            hs_code TEXT NOT NULL,
            origin_country TEXT NOT NULL,
            destination_country TEXT NOT NULL,
            year INTEGER NOT NULL,
            volume REAL NOT NULL CHECK (volume >= 0),
            value_usd REAL NOT NULL CHECK (value_usd >= 0),
            source TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create tariff lines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tariff_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            country_code TEXT NOT NULL,
            hs_prefix TEXT NOT NULL,
            rate_percent REAL NOT NULL,
            non_tariff_measures_json TEXT NOT NULL DEFAULT '[]',
            UNIQUE(country_code, hs_prefix)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create regulatory rules table; NULL columns are wildcards
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regulatory_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hs_chapter TEXT,
            country_code TEXT,
            origin_country_code TEXT,
            document_name TEXT NOT NULL,
            issuer TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_trade_flows_hs_code ON trade_flows(hs_code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_trade_flows_source ON trade_flows(source)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_regulatory_rules_country ON regulatory_rules(country_code)",
    )
    .execute(pool)
    .await?;

    tracing::debug!("migrations applied");
    Ok(())
}

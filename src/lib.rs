//! # Che.Comex
//!
//! Market-intelligence engine for exporters: classify a product into an HS
//! code, aggregate trade flows by destination, resolve tariffs and required
//! documents, and rank destination markets by opportunity.
//!
//! Pure domain logic lives in the `comex-core` crate. This crate adds the
//! SQLite store, remote data clients, CLI commands and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ seed/import │──▶│ SqliteStore  │◀──│ remote   │
//! │  (CSV)      │   │ (TradeStore) │   │ sources  │
//! └─────────────┘   └──────┬───────┘   └────┬─────┘
//!                          ▼                ▼
//!                   ┌────────────────────────────┐
//!                   │ comex-core OpportunityEngine│
//!                   └──────┬──────────────┬──────┘
//!                          ▼              ▼
//!                     ┌────────┐     ┌────────┐
//!                     │  CLI   │     │  HTTP  │
//!                     └────────┘     └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `TradeStore` |
//! | [`seed`] | Reference data and demo trade flows |
//! | [`import`] | CSV trade-flow import |
//! | [`classifier`] | Classifier selection and remote client |
//! | [`trade_source`] | Remote trade-volume client |
//! | [`analysis`] | Market analysis presenter |
//! | [`documents`] | Required documents and tariff lookups |
//! | [`stats`] | Database summary |
//! | [`server`] | HTTP API |
//! | [`logging`] | `tracing` subscriber setup |

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod db;
pub mod documents;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod seed;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod trade_source;

#[cfg(test)]
mod test_support;

//! # Che.Comex Core
//!
//! Pure logic for the Che.Comex market-intelligence engine: trade data
//! models, the shared country reference table, HS classification, the
//! regulatory decision table, opportunity scoring, and the storage trait.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! The application crate supplies a SQLite-backed [`store::TradeStore`]
//! and wires the pipeline into a CLI and an HTTP server.

pub mod aggregate;
pub mod classify;
pub mod countries;
pub mod models;
pub mod opportunity;
pub mod regulatory;
pub mod scoring;
pub mod store;

//! YieldVault Server - wallet ledger and investment maturity engine
//!
//! This crate provides the REST API server for the YieldVault platform:
//! users fund a wallet, buy fixed-term plans, and are paid out by a
//! background maturity sweep once a plan's term ends.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod locks;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;

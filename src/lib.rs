//! Trip distance accumulation and fuel consumption projections.
//!
//! [`calc`] holds the pure computations; everything else feeds it from
//! Kafka events and PostgreSQL.

pub mod calc;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod kafka;
pub mod logging;
pub mod models;
pub mod processor;

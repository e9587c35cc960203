//! Core domain types and logic. No I/O happens below this module.

pub mod config_validation;
pub mod coverage;
pub mod decision;
pub mod engine;
pub mod error;
pub mod execution;
pub mod leaderboard;
pub mod market;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod returns;
pub mod series;
pub mod simulation;
pub mod strategy;

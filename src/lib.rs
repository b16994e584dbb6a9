//! # Meta Ranker
//!
//! Tournament standings and combo meta analysis over match records.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (match records, standings, combo performance)
//! - **calculate**: Standings, Buchholz and combo aggregation
//! - **storage**: JSONL match exports
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod models;
pub mod storage;

pub use models::*;

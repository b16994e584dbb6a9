//! Core data models for match ranking.

mod ids;
mod match_record;
mod performance;
mod standing;

pub use ids::*;
pub use match_record::*;
pub use performance::*;
pub use standing::*;

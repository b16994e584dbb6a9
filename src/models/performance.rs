//! Combo performance model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calculate::{
    calculate_avg_points, calculate_composite_score, calculate_weighted_win_rate,
    calculate_win_rate, Smoothing,
};

/// What a performance row is keyed by: the combo, optionally split per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    pub entity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl EntityKey {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            owner: None,
        }
    }

    pub fn owned_by(entity: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            owner: Some(owner.into()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{} ({})", self.entity, owner),
            None => write!(f, "{}", self.entity),
        }
    }
}

/// Aggregated results of one combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPerformance {
    pub key: EntityKey,

    pub wins: u32,

    pub losses: u32,

    pub total_matches: u32,

    /// Points scored in won matches only
    pub total_points: u64,

    /// wins / total_matches
    pub win_rate: f64,

    /// Win rate shrunk towards zero for small samples
    pub weighted_win_rate: f64,

    pub avg_points_per_match: f64,

    /// Leaderboard score blending weighted win rate and scoring efficiency
    pub composite_score: f64,
}

impl EntityPerformance {
    /// Build a row from raw totals, deriving every rate.
    pub fn from_totals(
        key: EntityKey,
        wins: u32,
        losses: u32,
        total_points: u64,
        smoothing: &Smoothing,
    ) -> Self {
        let total_matches = wins + losses;
        let win_rate = calculate_win_rate(wins, losses);
        let weighted_win_rate = calculate_weighted_win_rate(win_rate, total_matches, smoothing.k());
        let avg_points_per_match = calculate_avg_points(total_points, total_matches);
        let composite_score = calculate_composite_score(
            weighted_win_rate,
            avg_points_per_match,
            smoothing.points_scale(),
        );

        Self {
            key,
            wins,
            losses,
            total_matches,
            total_points,
            win_rate,
            weighted_win_rate,
            avg_points_per_match,
            composite_score,
        }
    }
}

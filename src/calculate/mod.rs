//! Ranking and statistics engine.
//!
//! Pure, synchronous computations over match records:
//! - Swiss standings with score, head-to-head, Buchholz and point differential tie-breaks
//! - Median Buchholz opponent strength
//! - Combo win rates, smoothed win rates and composite scores
//!
//! Every call works on the slice it is given and builds fresh output.

pub mod buchholz;
pub mod combos;
pub mod selection;
pub mod skip;
pub mod standings;
pub mod validate;

pub use buchholz::{compute_buchholz, median_buchholz};
pub use combos::{aggregate, group_by, AggregateOptions, ComboReport, ComboSortKey, SegmentExtractor};
pub use selection::{
    inconsistent_groupings, select_matches, InconsistentGrouping, MatchFilter, PracticePolicy,
    Selection,
};
pub use skip::{resolve, ResolvedMatch, SkipReason, SkippedRecord};
pub use standings::{
    compare_standings, compute_standings, compute_standings_by_grouping, rank_standings,
    GroupedStandings, StandingsMode, StandingsReport,
};
pub use validate::{validate_matches, ValidationReport};

use thiserror::Error;

/// Default smoothing constant for the weighted win rate.
pub const DEFAULT_SMOOTHING_K: f64 = 10.0;

/// Default points normalization for the composite score.
pub const DEFAULT_POINTS_SCALE: f64 = 3.0;

/// Errors from misuse of the calculation API. Bad data is never an error here.
#[derive(Debug, Error)]
pub enum CalculateError {
    #[error("Invalid standings mode: {0} (expected perTournament or global)")]
    InvalidMode(String),

    #[error("Invalid sort key: {0}")]
    InvalidSortKey(String),

    #[error("Invalid practice policy: {0} (expected exclude, include or only)")]
    InvalidPracticePolicy(String),

    #[error("Invalid smoothing: {0}")]
    InvalidSmoothing(String),
}

/// Constants used to derive combo rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    k: f64,
    points_scale: f64,
}

impl Smoothing {
    /// `k` must be finite and non-negative, `points_scale` finite and positive.
    pub fn new(k: f64, points_scale: f64) -> Result<Self, CalculateError> {
        if !k.is_finite() || k < 0.0 {
            return Err(CalculateError::InvalidSmoothing(format!(
                "smoothing constant must be >= 0, got {k}"
            )));
        }
        if !points_scale.is_finite() || points_scale <= 0.0 {
            return Err(CalculateError::InvalidSmoothing(format!(
                "points scale must be > 0, got {points_scale}"
            )));
        }
        Ok(Self { k, points_scale })
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn points_scale(&self) -> f64 {
        self.points_scale
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            k: DEFAULT_SMOOTHING_K,
            points_scale: DEFAULT_POINTS_SCALE,
        }
    }
}

/// Calculate win rate from wins/losses.
pub fn calculate_win_rate(wins: u32, losses: u32) -> f64 {
    let total = wins + losses;
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64
    }
}

/// Shrink a win rate by `n / (n + k)`.
pub fn calculate_weighted_win_rate(win_rate: f64, total_matches: u32, k: f64) -> f64 {
    if total_matches == 0 {
        return 0.0;
    }
    let n = total_matches as f64;
    win_rate * (n / (n + k))
}

/// Average points per match, 0 without matches.
pub fn calculate_avg_points(total_points: u64, total_matches: u32) -> f64 {
    if total_matches == 0 {
        0.0
    } else {
        total_points as f64 / total_matches as f64
    }
}

/// `weighted_win_rate * (avg_points / points_scale) * 100`.
pub fn calculate_composite_score(weighted_win_rate: f64, avg_points: f64, points_scale: f64) -> f64 {
    if points_scale <= 0.0 {
        return 0.0;
    }
    weighted_win_rate * (avg_points / points_scale) * 100.0
}

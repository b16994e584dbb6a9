//! Participant standings model.

use serde::{Deserialize, Serialize};

/// One row of a ranked standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStanding {
    /// Participant identifier
    pub participant: String,

    pub wins: u32,

    pub losses: u32,

    /// Standings points (1 per win in a single tournament, awarded points globally)
    pub score: i64,

    /// Wins against opponents on the same score
    pub tb: u32,

    /// Median Buchholz of the opponents faced
    pub buchholz: i64,

    /// Points scored minus points conceded
    pub points_diff: i64,

    /// 1-based position; never shared between rows
    pub rank: u32,
}

impl ParticipantStanding {
    pub fn new(participant: String) -> Self {
        Self {
            participant,
            wins: 0,
            losses: 0,
            score: 0,
            tb: 0,
            buchholz: 0,
            points_diff: 0,
            rank: 0,
        }
    }

    pub fn total_matches(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win rate as a fraction (0.0 to 1.0).
    pub fn win_rate(&self) -> f64 {
        crate::calculate::calculate_win_rate(self.wins, self.losses)
    }
}

//! Data-quality handling for incoming match records.
//!
//! Bad rows never abort an aggregation. They are turned into a
//! [`SkippedRecord`] that travels next to the result.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{MatchId, MatchRecord, Side};

/// Why a record (or one side of it) did not contribute.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("participant {side} is missing")]
    MissingParticipant { side: Side },

    #[error("participant {participant:?} is paired against itself")]
    SelfMatch { participant: String },

    #[error("winner {winner:?} is neither participant")]
    UnknownWinner { winner: String },

    #[error("combo for side {side} is missing")]
    MissingEntity { side: Side },

    #[error("grouping key is missing")]
    MissingGroupingKey,
}

/// A skipped record, addressed by its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,

    #[serde(flatten)]
    pub reason: SkipReason,
}

impl SkippedRecord {
    pub(crate) fn new(index: usize, record: &MatchRecord, reason: SkipReason) -> Self {
        debug!(index, id = ?record.id, "skipping match record: {}", reason);
        Self {
            index,
            match_id: record.id.clone(),
            reason,
        }
    }
}

/// A match with both participants and a winner, points clamped to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMatch<'a> {
    pub participant_a: &'a str,
    pub participant_b: &'a str,
    pub winner: Side,
    pub score_a: u32,
    pub score_b: u32,
    pub award: Option<u32>,
}

impl<'a> ResolvedMatch<'a> {
    pub fn participant(&self, side: Side) -> &'a str {
        match side {
            Side::A => self.participant_a,
            Side::B => self.participant_b,
        }
    }

    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    pub fn winner_name(&self) -> &'a str {
        self.participant(self.winner)
    }

    pub fn loser_name(&self) -> &'a str {
        self.participant(self.winner.other())
    }
}

fn identifier(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Clamp a source number to the non-negative range; absent counts as 0.
pub fn clamp_points(value: Option<i64>) -> u32 {
    match value {
        Some(v) if v < 0 => {
            debug!(value = v, "negative points clamped to 0");
            0
        }
        Some(v) => u32::try_from(v).unwrap_or(u32::MAX),
        None => 0,
    }
}

/// Validate a record.
///
/// `Ok(None)` is an unresolved match (no winner yet). Unresolved matches are
/// excluded silently, they are not malformed.
pub fn resolve(record: &MatchRecord) -> Result<Option<ResolvedMatch<'_>>, SkipReason> {
    let participant_a = identifier(record.participant_a.as_deref())
        .ok_or(SkipReason::MissingParticipant { side: Side::A })?;
    let participant_b = identifier(record.participant_b.as_deref())
        .ok_or(SkipReason::MissingParticipant { side: Side::B })?;

    if participant_a == participant_b {
        return Err(SkipReason::SelfMatch {
            participant: participant_a.to_string(),
        });
    }

    let Some(winner) = identifier(record.winner.as_deref()) else {
        return Ok(None);
    };

    let winner = if winner == participant_a {
        Side::A
    } else if winner == participant_b {
        Side::B
    } else {
        return Err(SkipReason::UnknownWinner {
            winner: winner.to_string(),
        });
    };

    Ok(Some(ResolvedMatch {
        participant_a,
        participant_b,
        winner,
        score_a: clamp_points(record.score_a),
        score_b: clamp_points(record.score_b),
        award: record.award.map(|a| clamp_points(Some(a))),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ok() {
        let record = MatchRecord::new("t", "x", "y").with_scores(3, 1).won_by(Side::A);
        let resolved = resolve(&record).unwrap().unwrap();

        assert_eq!(resolved.winner_name(), "x");
        assert_eq!(resolved.loser_name(), "y");
        assert_eq!(resolved.score(Side::A), 3);
        assert_eq!(resolved.award, None);
    }

    #[test]
    fn test_resolve_unresolved() {
        let record = MatchRecord::new("t", "x", "y");
        assert_eq!(resolve(&record), Ok(None));

        let mut blank = MatchRecord::new("t", "x", "y");
        blank.winner = Some(String::new());
        assert_eq!(resolve(&blank), Ok(None));
    }

    #[test]
    fn test_resolve_missing_participant() {
        let mut record = MatchRecord::new("t", "x", "y").won_by(Side::A);
        record.participant_b = None;
        assert_eq!(
            resolve(&record),
            Err(SkipReason::MissingParticipant { side: Side::B })
        );

        record.participant_a = Some(String::new());
        assert_eq!(
            resolve(&record),
            Err(SkipReason::MissingParticipant { side: Side::A })
        );
    }

    #[test]
    fn test_resolve_unknown_winner() {
        let mut record = MatchRecord::new("t", "x", "y");
        record.winner = Some("z".to_string());
        assert_eq!(
            resolve(&record),
            Err(SkipReason::UnknownWinner {
                winner: "z".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_self_match() {
        let record = MatchRecord::new("t", "x", "x").won_by(Side::A);
        assert!(matches!(resolve(&record), Err(SkipReason::SelfMatch { .. })));
    }

    #[test]
    fn test_clamp_points() {
        assert_eq!(clamp_points(None), 0);
        assert_eq!(clamp_points(Some(-4)), 0);
        assert_eq!(clamp_points(Some(7)), 7);
        assert_eq!(clamp_points(Some(i64::MAX)), u32::MAX);
    }

    #[test]
    fn test_negative_scores_do_not_skip() {
        let record = MatchRecord::new("t", "x", "y").with_scores(-2, 3).won_by(Side::B);
        let resolved = resolve(&record).unwrap().unwrap();
        assert_eq!(resolved.score_a, 0);
        assert_eq!(resolved.score_b, 3);
    }

    #[test]
    fn test_skipped_record_serialization() {
        let record = MatchRecord::new("t", "x", "y").with_generated_id(1);
        let skipped = SkippedRecord::new(4, &record, SkipReason::MissingGroupingKey);
        let json = serde_json::to_value(&skipped).unwrap();

        assert_eq!(json["index"], 4);
        assert_eq!(json["reason"], "missing_grouping_key");
        assert!(json.get("matchId").is_some());
    }
}

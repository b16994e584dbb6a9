//! Match record model: one game result between two participants.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::{EntityId, MatchId, TournamentId};

/// Which side of a match a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Identifier that may arrive as a string or a number.
fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(val.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Points that may arrive as an integer, a float or a numeric string.
/// Fractions are truncated; anything else reads as absent.
fn deserialize_lenient_points<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(val.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }))
}

fn truncate(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}

/// A single match as handed over by the data source.
///
/// Every field is optional on the wire; rows come from an external store and
/// are validated when the ranking code consumes them, not here. Identifiers
/// are compared by exact string equality, callers canonicalize them first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Source id, if the store has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MatchId>,

    /// Tournament this match belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_key: Option<TournamentId>,

    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub participant_a: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub participant_b: Option<String>,

    /// Equal to one of the participants, or absent while unresolved
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub winner: Option<String>,

    /// Points scored by side A
    #[serde(default, deserialize_with = "deserialize_lenient_points")]
    pub score_a: Option<i64>,

    /// Points scored by side B
    #[serde(default, deserialize_with = "deserialize_lenient_points")]
    pub score_b: Option<i64>,

    /// Combo used by side A
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_a: Option<String>,

    /// Combo used by side B
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_b: Option<String>,

    /// Standings points credited to the winner in the global model
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_points",
        skip_serializing_if = "Option::is_none"
    )]
    pub award: Option<i64>,

    /// Practice/exhibition flag of the tournament
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_practice: Option<bool>,
}

impl MatchRecord {
    /// Create an unresolved match between two participants.
    pub fn new(
        grouping_key: impl Into<TournamentId>,
        participant_a: impl Into<String>,
        participant_b: impl Into<String>,
    ) -> Self {
        Self {
            grouping_key: Some(grouping_key.into()),
            participant_a: Some(participant_a.into()),
            participant_b: Some(participant_b.into()),
            ..Default::default()
        }
    }

    /// Set the winner by side.
    pub fn won_by(mut self, side: Side) -> Self {
        self.winner = self.participant(side).map(str::to_string);
        self
    }

    pub fn with_scores(mut self, score_a: i64, score_b: i64) -> Self {
        self.score_a = Some(score_a);
        self.score_b = Some(score_b);
        self
    }

    pub fn with_entities(mut self, entity_a: impl Into<String>, entity_b: impl Into<String>) -> Self {
        self.entity_a = Some(entity_a.into());
        self.entity_b = Some(entity_b.into());
        self
    }

    pub fn with_award(mut self, award: i64) -> Self {
        self.award = Some(award);
        self
    }

    pub fn practice(mut self, is_practice: bool) -> Self {
        self.is_practice = Some(is_practice);
        self
    }

    /// Attach a deterministic id derived from the grouping, round and participants.
    pub fn with_generated_id(mut self, round: u32) -> Self {
        let grouping = self.grouping_key.as_ref().map(EntityId::as_str).unwrap_or("");
        let id = EntityId::generate(&[
            grouping,
            &round.to_string(),
            self.participant_a.as_deref().unwrap_or(""),
            self.participant_b.as_deref().unwrap_or(""),
        ]);
        self.id = Some(id);
        self
    }

    pub fn participant(&self, side: Side) -> Option<&str> {
        match side {
            Side::A => self.participant_a.as_deref(),
            Side::B => self.participant_b.as_deref(),
        }
    }

    pub fn entity(&self, side: Side) -> Option<&str> {
        match side {
            Side::A => self.entity_a.as_deref(),
            Side::B => self.entity_b.as_deref(),
        }
    }

    pub fn score(&self, side: Side) -> Option<i64> {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    /// Practice flag, absent counts as a competitive match.
    pub fn is_practice(&self) -> bool {
        self.is_practice.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let m = MatchRecord::new("cup", "alice", "bob")
            .with_scores(3, 1)
            .won_by(Side::A);

        assert_eq!(m.winner.as_deref(), Some("alice"));
        assert_eq!(m.score(Side::B), Some(1));
        assert!(!m.is_practice());
    }

    #[test]
    fn test_deserialize_camel_case_with_missing_fields() {
        let json = r#"{"groupingKey":"t1","participantA":"x","participantB":"y","winner":"y","scoreB":3}"#;
        let m: MatchRecord = serde_json::from_str(json).unwrap();

        assert_eq!(m.grouping_key, Some(TournamentId::from("t1")));
        assert_eq!(m.score_a, None);
        assert_eq!(m.score_b, Some(3));
        assert_eq!(m.entity(Side::A), None);
    }

    #[test]
    fn test_deserialize_null_winner() {
        let json = r#"{"participantA":"x","participantB":"y","winner":null}"#;
        let m: MatchRecord = serde_json::from_str(json).unwrap();
        assert!(m.winner.is_none());
        assert!(m.grouping_key.is_none());
    }

    #[test]
    fn test_deserialize_loosely_typed_fields() {
        let json = r#"{"groupingKey":"t1","participantA":17,"participantB":"y","winner":17,"scoreA":3.0,"scoreB":"2","award":"x"}"#;
        let m: MatchRecord = serde_json::from_str(json).unwrap();

        assert_eq!(m.participant_a.as_deref(), Some("17"));
        assert_eq!(m.winner.as_deref(), Some("17"));
        assert_eq!(m.score_a, Some(3));
        assert_eq!(m.score_b, Some(2));
        assert_eq!(m.award, None);
    }

    #[test]
    fn test_deserialize_wrong_typed_identifier_reads_as_missing() {
        let json = r#"{"participantA":true,"participantB":"y","winner":"y","scoreA":-1.5}"#;
        let m: MatchRecord = serde_json::from_str(json).unwrap();

        assert!(m.participant_a.is_none());
        assert_eq!(m.score_a, Some(-1));
    }

    #[test]
    fn test_generated_id_is_stable() {
        let a = MatchRecord::new("cup", "alice", "bob").with_generated_id(2);
        let b = MatchRecord::new("cup", "alice", "bob").with_generated_id(2);
        let c = MatchRecord::new("cup", "alice", "bob").with_generated_id(3);

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::A.other(), Side::B);
        assert_eq!(Side::B.to_string(), "B");
    }
}

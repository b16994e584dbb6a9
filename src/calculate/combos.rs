//! Combo performance aggregation.
//!
//! Every side of a resolved match that names a combo is one trial of that
//! combo. Points only accrue on a win. Rates are derived from the totals
//! with the [`Smoothing`] constants.

use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::skip::{resolve, SkipReason, SkippedRecord};
use super::{CalculateError, Smoothing};
use crate::models::{EntityKey, EntityPerformance, MatchRecord, Side};

/// Options for [`aggregate`].
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Split each combo per participant that used it
    pub per_owner: bool,

    pub smoothing: Smoothing,
}

/// Fields a combo leaderboard can be ordered by, all descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboSortKey {
    #[default]
    Composite,
    WinRate,
    WeightedWinRate,
    Matches,
    AvgPoints,
    Wins,
}

impl FromStr for ComboSortKey {
    type Err = CalculateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "composite" => Ok(Self::Composite),
            "win-rate" | "win_rate" => Ok(Self::WinRate),
            "weighted" | "weighted-win-rate" | "weighted_win_rate" => Ok(Self::WeightedWinRate),
            "matches" => Ok(Self::Matches),
            "points" | "avg-points" | "avg_points" => Ok(Self::AvgPoints),
            "wins" => Ok(Self::Wins),
            other => Err(CalculateError::InvalidSortKey(other.to_string())),
        }
    }
}

impl ComboSortKey {
    /// Stable descending sort. Floats compare exactly, without tolerance.
    pub fn sort(self, rows: &mut [&EntityPerformance]) {
        match self {
            ComboSortKey::Composite => {
                rows.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score))
            }
            ComboSortKey::WinRate => rows.sort_by(|a, b| b.win_rate.total_cmp(&a.win_rate)),
            ComboSortKey::WeightedWinRate => {
                rows.sort_by(|a, b| b.weighted_win_rate.total_cmp(&a.weighted_win_rate))
            }
            ComboSortKey::Matches => rows.sort_by(|a, b| b.total_matches.cmp(&a.total_matches)),
            ComboSortKey::AvgPoints => {
                rows.sort_by(|a, b| b.avg_points_per_match.total_cmp(&a.avg_points_per_match))
            }
            ComboSortKey::Wins => rows.sort_by(|a, b| b.wins.cmp(&a.wins)),
        }
    }
}

/// Aggregated combo rows in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboReport {
    pub computed_at: DateTime<Utc>,

    entries: Vec<EntityPerformance>,

    #[serde(skip)]
    smoothing: Smoothing,

    pub resolved_matches: usize,

    /// Whole records and single sides that did not contribute
    pub skipped: Vec<SkippedRecord>,
}

impl ComboReport {
    /// Rows in the order each combo was first seen.
    pub fn entries(&self) -> &[EntityPerformance] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<EntityPerformance> {
        self.entries
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityPerformance> {
        self.entries.iter().find(|e| &e.key == key)
    }

    /// Leaderboard order.
    pub fn sorted_by_composite(&self) -> Vec<&EntityPerformance> {
        self.sorted_by(ComboSortKey::Composite)
    }

    pub fn sorted_by(&self, key: ComboSortKey) -> Vec<&EntityPerformance> {
        let mut rows: Vec<_> = self.entries.iter().collect();
        key.sort(&mut rows);
        rows
    }

    /// Merge rows sharing a sub-attribute, see [`group_by`].
    pub fn grouped<F>(&self, extractor: F) -> Vec<EntityPerformance>
    where
        F: Fn(&EntityKey) -> Option<String>,
    {
        group_by(&self.entries, extractor, &self.smoothing)
    }
}

#[derive(Default, Clone, Copy)]
struct Totals {
    wins: u32,
    losses: u32,
    points: u64,
}

/// Insertion-ordered accumulator.
struct Ledger<K> {
    index: HashMap<K, usize>,
    rows: Vec<(K, Totals)>,
}

impl<K: Clone + Eq + Hash> Ledger<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut Totals {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.rows.len();
                self.index.insert(key.clone(), idx);
                self.rows.push((key, Totals::default()));
                idx
            }
        };
        &mut self.rows[idx].1
    }

    fn into_rows(self) -> Vec<(K, Totals)> {
        self.rows
    }
}

/// Aggregate combo performance over a set of matches.
pub fn aggregate<'a, I>(matches: I, options: &AggregateOptions) -> ComboReport
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut ledger: Ledger<EntityKey> = Ledger::new();
    let mut resolved_matches = 0;
    let mut skipped = Vec::new();

    for (index, record) in matches.into_iter().enumerate() {
        let m = match resolve(record) {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(reason) => {
                skipped.push(SkippedRecord::new(index, record, reason));
                continue;
            }
        };
        resolved_matches += 1;

        for side in [Side::A, Side::B] {
            let Some(entity) = record.entity(side).filter(|e| !e.is_empty()) else {
                skipped.push(SkippedRecord::new(
                    index,
                    record,
                    SkipReason::MissingEntity { side },
                ));
                continue;
            };

            let key = if options.per_owner {
                EntityKey::owned_by(entity, m.participant(side))
            } else {
                EntityKey::new(entity)
            };

            let totals = ledger.entry(key);
            if m.winner == side {
                totals.wins += 1;
                totals.points += u64::from(m.score(side));
            } else {
                totals.losses += 1;
            }
        }
    }

    let entries: Vec<EntityPerformance> = ledger
        .into_rows()
        .into_iter()
        .map(|(key, t)| {
            EntityPerformance::from_totals(key, t.wins, t.losses, t.points, &options.smoothing)
        })
        .collect();

    info!(
        combos = entries.len(),
        resolved_matches,
        skipped = skipped.len(),
        per_owner = options.per_owner,
        "aggregated combo performance"
    );

    ComboReport {
        computed_at: Utc::now(),
        entries,
        smoothing: options.smoothing,
        resolved_matches,
        skipped,
    }
}

/// Merge per-combo totals by a sub-attribute of the combo.
///
/// Works on already aggregated rows, so each trial is counted once. Rows the
/// extractor returns `None` for are left out. The owner is kept, so per-owner
/// rows merge per owner.
pub fn group_by<F>(
    entries: &[EntityPerformance],
    extractor: F,
    smoothing: &Smoothing,
) -> Vec<EntityPerformance>
where
    F: Fn(&EntityKey) -> Option<String>,
{
    let mut ledger: Ledger<EntityKey> = Ledger::new();

    for entry in entries {
        let Some(attribute) = extractor(&entry.key) else {
            debug!(combo = %entry.key, "no attribute extracted, row not grouped");
            continue;
        };
        let key = EntityKey {
            entity: attribute,
            owner: entry.key.owner.clone(),
        };
        let totals = ledger.entry(key);
        totals.wins += entry.wins;
        totals.losses += entry.losses;
        totals.points += entry.total_points;
    }

    ledger
        .into_rows()
        .into_iter()
        .map(|(key, t)| EntityPerformance::from_totals(key, t.wins, t.losses, t.points, smoothing))
        .collect()
}

/// Picks one segment out of a composite combo name, e.g. the ratchet of
/// `"Wizard Rod 5-70 DB"` split on spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentExtractor {
    pub delimiter: String,
    pub index: usize,
}

impl SegmentExtractor {
    pub fn new(delimiter: impl Into<String>, index: usize) -> Self {
        Self {
            delimiter: delimiter.into(),
            index,
        }
    }

    /// Empty segments from repeated delimiters are ignored.
    pub fn extract(&self, combo: &str) -> Option<String> {
        if self.delimiter.is_empty() {
            return (self.index == 0 && !combo.is_empty()).then(|| combo.to_string());
        }
        combo
            .split(self.delimiter.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .nth(self.index)
            .map(str::to_string)
    }

    pub fn extract_key(&self, key: &EntityKey) -> Option<String> {
        self.extract(&key.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn game(a: &str, b: &str, combo_a: &str, combo_b: &str, winner: Side, score: i64) -> MatchRecord {
        let (score_a, score_b) = match winner {
            Side::A => (score, 0),
            Side::B => (0, score),
        };
        MatchRecord::new("cup", a, b)
            .with_entities(combo_a, combo_b)
            .with_scores(score_a, score_b)
            .won_by(winner)
    }

    #[test]
    fn test_empty_input() {
        let matches: Vec<MatchRecord> = Vec::new();
        let report = aggregate(&matches, &AggregateOptions::default());
        assert!(report.entries().is_empty());
        assert!(report.sorted_by_composite().is_empty());
    }

    #[test]
    fn test_trials_and_points() {
        let matches = vec![
            game("x", "y", "red", "blue", Side::A, 3),
            game("x", "y", "red", "blue", Side::B, 2),
            game("x", "z", "red", "green", Side::A, 1),
        ];
        let report = aggregate(&matches, &AggregateOptions::default());

        let red = report.get(&EntityKey::new("red")).unwrap();
        assert_eq!((red.wins, red.losses, red.total_matches), (2, 1, 3));
        assert_eq!(red.total_points, 4);

        let blue = report.get(&EntityKey::new("blue")).unwrap();
        assert_eq!((blue.wins, blue.losses, blue.total_points), (1, 1, 2));

        // Losing side points do not accrue.
        let green = report.get(&EntityKey::new("green")).unwrap();
        assert_eq!(green.total_points, 0);
        assert_eq!(green.total_matches, 1);

        let order: Vec<_> = report.entries().iter().map(|e| e.key.entity.as_str()).collect();
        assert_eq!(order, vec!["red", "blue", "green"]);
    }

    #[test]
    fn test_losing_points_ignored_even_when_scored() {
        let m = MatchRecord::new("cup", "x", "y")
            .with_entities("red", "blue")
            .with_scores(4, 2)
            .won_by(Side::A);
        let report = aggregate(&[m], &AggregateOptions::default());
        assert_eq!(report.get(&EntityKey::new("blue")).unwrap().total_points, 0);
        assert_eq!(report.get(&EntityKey::new("red")).unwrap().total_points, 4);
    }

    #[test]
    fn test_weighted_win_rate_smoothing() {
        let mut matches = Vec::new();
        for i in 0..100 {
            matches.push(game(&format!("p{i}"), "q", "veteran", "filler", Side::A, 1));
        }
        for i in 0..10 {
            matches.push(game(&format!("r{i}"), "q", "rookie", "filler", Side::A, 1));
        }
        let report = aggregate(&matches, &AggregateOptions::default());

        let veteran = report.get(&EntityKey::new("veteran")).unwrap();
        let rookie = report.get(&EntityKey::new("rookie")).unwrap();

        assert_eq!(veteran.win_rate, 1.0);
        assert!((veteran.weighted_win_rate - 100.0 / 110.0).abs() < 1e-12);
        assert!(veteran.weighted_win_rate < 1.0);
        assert!((rookie.weighted_win_rate - 0.5).abs() < 1e-12);
        assert!(rookie.weighted_win_rate < veteran.weighted_win_rate);
    }

    #[test]
    fn test_sorted_by_composite_and_other_keys() {
        let matches = vec![
            game("x", "y", "a", "b", Side::A, 3),
            game("x", "y", "a", "b", Side::A, 3),
            game("x", "y", "c", "b", Side::A, 1),
            game("x", "y", "c", "b", Side::A, 1),
            game("x", "y", "c", "b", Side::A, 1),
        ];
        let report = aggregate(&matches, &AggregateOptions::default());

        let by_composite: Vec<_> = report
            .sorted_by_composite()
            .iter()
            .map(|e| e.key.entity.clone())
            .collect();
        assert_eq!(by_composite, vec!["a", "c", "b"]);

        let by_matches: Vec<_> = report
            .sorted_by(ComboSortKey::Matches)
            .iter()
            .map(|e| e.key.entity.clone())
            .collect();
        assert_eq!(by_matches, vec!["b", "c", "a"]);

        // Unsorted view is untouched.
        assert_eq!(report.entries()[0].key.entity, "a");
    }

    #[test]
    fn test_per_owner() {
        let matches = vec![
            game("x", "y", "red", "red", Side::A, 3),
            game("x", "z", "red", "red", Side::B, 3),
        ];
        let options = AggregateOptions {
            per_owner: true,
            ..Default::default()
        };
        let report = aggregate(&matches, &options);

        assert_eq!(report.entries().len(), 3);
        let x = report.get(&EntityKey::owned_by("red", "x")).unwrap();
        assert_eq!((x.wins, x.losses), (1, 1));
        assert!(report.get(&EntityKey::new("red")).is_none());
    }

    #[test]
    fn test_missing_entity_skips_one_side() {
        let mut m = game("x", "y", "red", "blue", Side::A, 3);
        m.entity_b = None;
        let report = aggregate(&[m], &AggregateOptions::default());

        assert_eq!(report.entries().len(), 1);
        assert_eq!(report.resolved_matches, 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::MissingEntity { side: Side::B }
        );
    }

    #[test]
    fn test_unresolved_and_malformed() {
        let unresolved = MatchRecord::new("cup", "x", "y").with_entities("red", "blue");
        let mut malformed = game("x", "y", "red", "blue", Side::A, 3);
        malformed.winner = Some("ghost".to_string());

        let report = aggregate(&[unresolved, malformed], &AggregateOptions::default());
        assert!(report.entries().is_empty());
        assert_eq!(report.resolved_matches, 0);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_group_by_segment() {
        let matches = vec![
            game("x", "y", "Dran Sword 3-60 F", "Hells Scythe 4-60 T", Side::A, 3),
            game("x", "y", "Wizard Rod 3-60 B", "Hells Scythe 4-60 T", Side::B, 2),
            game("x", "y", "Wizard Rod 3-60 B", "Dran Sword 3-60 F", Side::A, 1),
        ];
        let report = aggregate(&matches, &AggregateOptions::default());

        let ratchet = SegmentExtractor::new(" ", 2);
        let grouped = report.grouped(|k| ratchet.extract_key(k));

        assert_eq!(grouped.len(), 2);
        let r360 = &grouped[0];
        assert_eq!(r360.key.entity, "3-60");
        // Dran Sword: 1W 1L (3 pts), Wizard Rod: 1W 1L (1 pt)
        assert_eq!((r360.wins, r360.losses, r360.total_points), (2, 2, 4));
        assert_eq!(r360.total_matches, 4);

        let r460 = &grouped[1];
        assert_eq!((r460.wins, r460.losses, r460.total_points), (1, 1, 2));

        let total_trials: u32 = grouped.iter().map(|g| g.total_matches).sum();
        assert_eq!(total_trials, 6);
    }

    #[test]
    fn test_group_by_drops_unextractable() {
        let rows = vec![EntityPerformance::from_totals(
            EntityKey::new("solo"),
            1,
            0,
            3,
            &Smoothing::default(),
        )];
        let grouped = group_by(&rows, |k| SegmentExtractor::new(" ", 1).extract_key(k), &Smoothing::default());
        assert!(grouped.is_empty());
    }

    #[test]
    fn test_segment_extractor() {
        let blade = SegmentExtractor::new(" ", 0);
        assert_eq!(blade.extract("Phoenix  Wing 9-60 GF"), Some("Phoenix".to_string()));
        assert_eq!(SegmentExtractor::new(" ", 9).extract("a b"), None);
        assert_eq!(SegmentExtractor::new("/", 1).extract("a / b / c"), Some("b".to_string()));
        assert_eq!(SegmentExtractor::new("", 0).extract("whole"), Some("whole".to_string()));
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("weighted".parse::<ComboSortKey>().unwrap(), ComboSortKey::WeightedWinRate);
        assert_eq!("points".parse::<ComboSortKey>().unwrap(), ComboSortKey::AvgPoints);
        assert!("elo".parse::<ComboSortKey>().is_err());
    }
}

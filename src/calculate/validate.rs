//! Data-quality report over a match export.
//!
//! Runs every pipeline over the full input, practice matches included, and
//! collects what each one had to skip.

use serde::Serialize;

use super::combos::{aggregate, AggregateOptions};
use super::selection::{select_matches, InconsistentGrouping, MatchFilter, PracticePolicy};
use super::skip::SkippedRecord;
use super::standings::{compute_standings, compute_standings_by_grouping, StandingsMode};
use super::Smoothing;
use crate::models::MatchRecord;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub records: usize,
    pub resolved_matches: usize,
    pub unresolved_matches: usize,
    /// Records no standings table can use
    pub malformed: Vec<SkippedRecord>,
    /// Records left out of per-tournament tables
    pub ungrouped: Vec<SkippedRecord>,
    /// Record sides left out of the combo leaderboard
    pub combo_skips: Vec<SkippedRecord>,
    pub mixed_practice: Vec<InconsistentGrouping>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
            && self.ungrouped.is_empty()
            && self.combo_skips.is_empty()
            && self.mixed_practice.is_empty()
    }
}

pub fn validate_matches(matches: &[MatchRecord], smoothing: Smoothing) -> ValidationReport {
    let selection = select_matches(matches, &MatchFilter::new(PracticePolicy::Include));
    let standings = compute_standings(selection.matches.iter().copied(), StandingsMode::PerTournament);
    let grouped = compute_standings_by_grouping(matches, StandingsMode::PerTournament);
    let combos = aggregate(
        selection.matches.iter().copied(),
        &AggregateOptions {
            per_owner: false,
            smoothing,
        },
    );

    ValidationReport {
        records: matches.len(),
        resolved_matches: standings.resolved_matches,
        unresolved_matches: standings.unresolved_matches,
        malformed: standings.skipped,
        ungrouped: grouped.skipped,
        combo_skips: combos.skipped,
        mixed_practice: selection.warnings,
    }
}

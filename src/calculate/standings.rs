//! Swiss standings with a fixed tie-break cascade.
//!
//! Order is `score → tb → buchholz → points_diff`, all descending. Rows
//! equal on all four keys keep the order in which their participants were
//! first seen in the input, and every row gets its own rank.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::buchholz::compute_buchholz;
use super::skip::{resolve, ResolvedMatch, SkipReason, SkippedRecord};
use super::CalculateError;
use crate::models::{MatchRecord, ParticipantStanding, TournamentId};

/// How standings points are awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StandingsMode {
    /// One point per win, for a single tournament
    #[default]
    PerTournament,
    /// Points come from each match's `award`, for a cross-tournament view
    Global,
}

impl StandingsMode {
    /// Standings points the winner of `m` earns.
    fn points_for_win(self, m: &ResolvedMatch<'_>) -> i64 {
        match self {
            StandingsMode::PerTournament => 1,
            StandingsMode::Global => i64::from(m.award.unwrap_or(1)),
        }
    }
}

impl FromStr for StandingsMode {
    type Err = CalculateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perTournament" | "per-tournament" | "per_tournament" => Ok(Self::PerTournament),
            "global" => Ok(Self::Global),
            other => Err(CalculateError::InvalidMode(other.to_string())),
        }
    }
}

/// Standings plus what was left out of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsReport {
    pub mode: StandingsMode,

    /// When this report was computed
    pub computed_at: DateTime<Utc>,

    /// Sorted and ranked rows
    pub standings: Vec<ParticipantStanding>,

    /// Matches that contributed
    pub resolved_matches: usize,

    /// Matches without a winner yet
    pub unresolved_matches: usize,

    pub skipped: Vec<SkippedRecord>,
}

impl StandingsReport {
    /// Row for a participant, if they played a resolved match.
    pub fn get(&self, participant: &str) -> Option<&ParticipantStanding> {
        self.standings.iter().find(|s| s.participant == participant)
    }
}

/// Standings for each tournament in a mixed input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedStandings {
    pub groupings: BTreeMap<TournamentId, StandingsReport>,

    /// Records with no grouping key
    pub skipped: Vec<SkippedRecord>,
}

/// Per-participant scratch state for one computation.
#[derive(Default)]
struct Tally<'a> {
    wins: u32,
    losses: u32,
    score: i64,
    points_for: i64,
    points_against: i64,
    /// Distinct opponents in the order first faced
    opponents: Vec<&'a str>,
    faced: HashSet<&'a str>,
    wins_against: HashMap<&'a str, u32>,
}

impl<'a> Tally<'a> {
    fn face(&mut self, opponent: &'a str, scored: u32, conceded: u32) {
        if self.faced.insert(opponent) {
            self.opponents.push(opponent);
        }
        self.points_for += i64::from(scored);
        self.points_against += i64::from(conceded);
    }
}

/// Participants in first-seen order.
#[derive(Default)]
struct Arena<'a> {
    index: HashMap<&'a str, usize>,
    names: Vec<&'a str>,
    tallies: Vec<Tally<'a>>,
}

impl<'a> Arena<'a> {
    fn entry(&mut self, participant: &'a str) -> &mut Tally<'a> {
        let idx = match self.index.get(participant) {
            Some(&idx) => idx,
            None => {
                let idx = self.names.len();
                self.index.insert(participant, idx);
                self.names.push(participant);
                self.tallies.push(Tally::default());
                idx
            }
        };
        &mut self.tallies[idx]
    }

    fn record(&mut self, m: &ResolvedMatch<'a>, mode: StandingsMode) {
        // Seed both sides in input order so ties fall back to encounter order.
        self.entry(m.participant_a);
        self.entry(m.participant_b);

        let winner = m.winner_name();
        let loser = m.loser_name();
        let winner_points = m.score(m.winner);
        let loser_points = m.score(m.winner.other());

        let w = self.entry(winner);
        w.wins += 1;
        w.score += mode.points_for_win(m);
        w.face(loser, winner_points, loser_points);
        *w.wins_against.entry(loser).or_insert(0) += 1;

        let l = self.entry(loser);
        l.losses += 1;
        l.face(winner, loser_points, winner_points);
    }

    /// Wins each participant earned against others on the same score.
    fn tie_breaks(&self) -> Vec<u32> {
        let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, tally) in self.tallies.iter().enumerate() {
            groups.entry(tally.score).or_default().push(idx);
        }

        let mut tb = vec![0; self.tallies.len()];
        for members in groups.values().filter(|m| m.len() > 1) {
            for &idx in members {
                tb[idx] = members
                    .iter()
                    .filter(|&&other| other != idx)
                    .map(|&other| {
                        self.tallies[idx]
                            .wins_against
                            .get(self.names[other])
                            .copied()
                            .unwrap_or(0)
                    })
                    .sum();
            }
        }
        tb
    }

    fn buchholz(&self) -> BTreeMap<String, i64> {
        let scores: HashMap<String, i64> = self
            .names
            .iter()
            .zip(&self.tallies)
            .map(|(name, t)| (name.to_string(), t.score))
            .collect();
        let opponents: HashMap<String, Vec<String>> = self
            .names
            .iter()
            .zip(&self.tallies)
            .map(|(name, t)| {
                let faced = t.opponents.iter().map(|o| o.to_string()).collect();
                (name.to_string(), faced)
            })
            .collect();
        compute_buchholz(&scores, &opponents)
    }

    fn into_standings(self) -> Vec<ParticipantStanding> {
        let tb = self.tie_breaks();
        let buchholz = self.buchholz();

        self.names
            .iter()
            .zip(self.tallies)
            .zip(tb)
            .map(|((name, tally), tb)| {
                let mut row = ParticipantStanding::new(name.to_string());
                row.wins = tally.wins;
                row.losses = tally.losses;
                row.score = tally.score;
                row.tb = tb;
                row.buchholz = buchholz.get(*name).copied().unwrap_or(0);
                row.points_diff = tally.points_for - tally.points_against;
                row
            })
            .collect()
    }
}

/// The tie-break cascade as a comparator, best row first.
pub fn compare_standings(a: &ParticipantStanding, b: &ParticipantStanding) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.tb.cmp(&a.tb))
        .then(b.buchholz.cmp(&a.buchholz))
        .then(b.points_diff.cmp(&a.points_diff))
}

/// Sort with the cascade (stable) and assign 1-based ranks.
pub fn rank_standings(standings: &mut [ParticipantStanding]) {
    standings.sort_by(compare_standings);
    for (idx, row) in standings.iter_mut().enumerate() {
        row.rank = idx as u32 + 1;
    }
}

/// Compute ranked standings for one grouping of matches.
///
/// Participant identifiers are compared exactly. Malformed records are
/// skipped and reported, never fatal. An empty input gives empty standings.
pub fn compute_standings<'a, I>(matches: I, mode: StandingsMode) -> StandingsReport
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    standings_from_indexed(matches.into_iter().enumerate(), mode)
}

fn standings_from_indexed<'a, I>(matches: I, mode: StandingsMode) -> StandingsReport
where
    I: IntoIterator<Item = (usize, &'a MatchRecord)>,
{
    let mut arena = Arena::default();
    let mut resolved_matches = 0;
    let mut unresolved_matches = 0;
    let mut skipped = Vec::new();

    for (index, record) in matches {
        match resolve(record) {
            Ok(Some(m)) => {
                arena.record(&m, mode);
                resolved_matches += 1;
            }
            Ok(None) => unresolved_matches += 1,
            Err(reason) => skipped.push(SkippedRecord::new(index, record, reason)),
        }
    }

    let mut standings = arena.into_standings();
    rank_standings(&mut standings);

    info!(
        participants = standings.len(),
        resolved_matches,
        unresolved_matches,
        skipped = skipped.len(),
        "computed standings"
    );

    StandingsReport {
        mode,
        computed_at: Utc::now(),
        standings,
        resolved_matches,
        unresolved_matches,
        skipped,
    }
}

/// Compute standings for every grouping key present in `matches`.
///
/// Groupings are independent and computed in parallel. Skip indices refer
/// to positions in the full input.
pub fn compute_standings_by_grouping(
    matches: &[MatchRecord],
    mode: StandingsMode,
) -> GroupedStandings {
    let mut groups: BTreeMap<TournamentId, Vec<(usize, &MatchRecord)>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (index, record) in matches.iter().enumerate() {
        match record.grouping_key.as_ref().filter(|k| !k.is_blank()) {
            Some(key) => groups.entry(key.clone()).or_default().push((index, record)),
            None => skipped.push(SkippedRecord::new(
                index,
                record,
                SkipReason::MissingGroupingKey,
            )),
        }
    }

    let groupings = groups
        .into_par_iter()
        .map(|(key, records)| (key, standings_from_indexed(records, mode)))
        .collect();

    GroupedStandings { groupings, skipped }
}

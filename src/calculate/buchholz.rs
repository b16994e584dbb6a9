//! Opponent strength (median Buchholz).

use std::collections::{BTreeMap, HashMap};

/// Median Buchholz over a list of opponent scores.
///
/// With more than two opponents the single lowest and single highest score
/// are dropped before summing. Two or fewer opponents are summed as is.
pub fn median_buchholz(opponent_scores: &[i64]) -> i64 {
    if opponent_scores.len() <= 2 {
        return opponent_scores.iter().sum();
    }

    let mut sorted = opponent_scores.to_vec();
    sorted.sort_unstable();
    sorted[1..sorted.len() - 1].iter().sum()
}

/// Buchholz for every participant that has an opponent list.
///
/// Opponents missing from `scores` count as 0.
pub fn compute_buchholz<S>(
    scores: &HashMap<String, i64, S>,
    opponents: &HashMap<String, Vec<String>, S>,
) -> BTreeMap<String, i64>
where
    S: std::hash::BuildHasher,
{
    opponents
        .iter()
        .map(|(participant, faced)| {
            let opponent_scores: Vec<i64> = faced
                .iter()
                .map(|o| scores.get(o).copied().unwrap_or(0))
                .collect();
            (participant.clone(), median_buchholz(&opponent_scores))
        })
        .collect()
}

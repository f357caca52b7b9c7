// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Season standings from per-tournament points.

use std::cmp::Ordering;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{resolver::PositionedResult, ties::round_to_tenth, Category, PlayerId, TournamentId};

/// One player's finish in one tournament on one track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentFinish {
    #[serde(rename = "tournamentId")]
    pub tournament_id: TournamentId,
    pub category: Category,
    pub position: u32,
    pub points: f64,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardRow {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    #[serde(rename = "categoryPoints")]
    pub category_points: IndexMap<Category, f64>,
    pub total: f64,
    /// Tournaments played, counted or not.
    pub events: usize,
    #[serde(rename = "averageScore")]
    pub average_score: Option<f64>,
    pub finishes: Vec<TournamentFinish>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    #[serde(flatten)]
    pub row: LeaderboardRow,
}

/// Turn a resolved track into finishes for the leaderboard.
pub fn finishes_from_results(
    tournament_id: TournamentId,
    category: Category,
    results: &[PositionedResult],
) -> impl Iterator<Item = (PlayerId, TournamentFinish)> + '_ {
    results.iter().map(move |result| {
        (
            result.player_id,
            TournamentFinish {
                tournament_id,
                category,
                position: result.position,
                points: result.points,
                score: result.score,
            },
        )
    })
}

/// Sum a player's points per category and in total.
///
/// With `best_of` only that many of the player's highest paying finishes count.
pub fn aggregate(
    player_id: PlayerId,
    finishes: Vec<TournamentFinish>,
    best_of: Option<usize>,
) -> LeaderboardRow {
    let counted = finishes
        .iter()
        .sorted_by(|a, b| {
            b.points
                .total_cmp(&a.points)
                .then(a.tournament_id.cmp(&b.tournament_id))
        })
        .take(best_of.unwrap_or(usize::MAX));

    let mut category_points: IndexMap<Category, f64> = IndexMap::new();
    for finish in counted {
        *category_points.entry(finish.category).or_default() += finish.points;
    }
    category_points.sort_keys();
    for points in category_points.values_mut() {
        *points = round_to_tenth(*points);
    }
    let total = round_to_tenth(category_points.values().sum());

    let average_score = if finishes.is_empty() {
        None
    } else {
        Some(finishes.iter().map(|f| f.score).sum::<f64>() / finishes.len() as f64)
    };

    let finishes: Vec<TournamentFinish> = finishes
        .into_iter()
        .sorted_by_key(|f| f.tournament_id)
        .collect();
    LeaderboardRow {
        player_id,
        category_points,
        total,
        events: finishes.len(),
        average_score,
        finishes,
    }
}

/// Order of the leaderboard: more points first, then a lower average score,
/// then more tournaments played, then the lower player id.
fn compare_rows(a: &LeaderboardRow, b: &LeaderboardRow) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| match (a.average_score, b.average_score) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then(b.events.cmp(&a.events))
        .then(a.player_id.cmp(&b.player_id))
}

/// Rank rows 1..N. Leaderboard ranks never repeat, unlike tournament positions.
pub fn rank(rows: Vec<LeaderboardRow>) -> Vec<RankedRow> {
    rows.into_iter()
        .sorted_by(compare_rows)
        .enumerate()
        .map(|(index, row)| RankedRow {
            rank: index + 1,
            row,
        })
        .collect()
}

/// Group finishes per player, aggregate and rank.
pub fn standings(
    finishes: impl IntoIterator<Item = (PlayerId, TournamentFinish)>,
    best_of: Option<usize>,
) -> Vec<RankedRow> {
    let rows = finishes
        .into_iter()
        .into_group_map()
        .into_iter()
        .map(|(player_id, finishes)| aggregate(player_id, finishes, best_of))
        .collect();
    rank(rows)
}

#[cfg(test)]
mod tests {
    use super::{aggregate, finishes_from_results, standings, TournamentFinish};
    use crate::{
        points::{BeyondTable, PointsConfig},
        resolve_tournament, Category, ScoreEntry,
    };

    fn finish(tournament_id: i64, category: Category, points: f64, score: f64) -> TournamentFinish {
        TournamentFinish {
            tournament_id,
            category,
            position: 1,
            points,
            score,
        }
    }

    #[test]
    fn sums_per_category() {
        let row = aggregate(
            7,
            vec![
                finish(3, Category::Tour, 300.0, 72.0),
                finish(1, Category::Major, 358.3, 70.0),
                finish(2, Category::Tour, 0.1, 74.0),
                finish(4, Category::Major, 0.2, 76.0),
            ],
            None,
        );
        let categories: Vec<(Category, f64)> =
            row.category_points.iter().map(|(c, p)| (*c, *p)).collect();
        assert_eq!(
            categories,
            vec![(Category::Major, 358.5), (Category::Tour, 300.1)]
        );
        assert_eq!(row.total, 658.6);
        assert_eq!(row.events, 4);
        assert_eq!(row.average_score, Some(73.0));
        let order: Vec<i64> = row.finishes.iter().map(|f| f.tournament_id).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn best_of_counts_highest_finishes() {
        let row = aggregate(
            1,
            vec![
                finish(1, Category::Tour, 100.0, 70.0),
                finish(2, Category::League, 40.0, 70.0),
                finish(3, Category::Major, 250.0, 70.0),
            ],
            Some(2),
        );
        assert_eq!(row.total, 350.0);
        assert!(!row.category_points.contains_key(&Category::League));
        assert_eq!(row.events, 3);
    }

    #[test]
    fn ranks_are_dense_and_tie_break_on_average_score() {
        let ranked = standings(
            vec![
                (1, finish(1, Category::Tour, 200.0, 74.0)),
                (2, finish(1, Category::Tour, 500.0, 70.0)),
                (3, finish(1, Category::Tour, 200.0, 71.0)),
                (4, finish(1, Category::Tour, 50.0, 80.0)),
            ],
            None,
        );
        let order: Vec<(usize, i64)> = ranked.iter().map(|r| (r.rank, r.row.player_id)).collect();
        assert_eq!(order, vec![(1, 2), (2, 3), (3, 1), (4, 4)]);
    }

    #[test]
    fn equal_totals_and_averages_fall_back_to_events_then_id() {
        let ranked = standings(
            vec![
                (9, finish(1, Category::Tour, 100.0, 70.0)),
                (5, finish(1, Category::Tour, 100.0, 70.0)),
                (8, finish(1, Category::Tour, 50.0, 70.0)),
                (8, finish(2, Category::Tour, 50.0, 70.0)),
            ],
            None,
        );
        let order: Vec<i64> = ranked.iter().map(|r| r.row.player_id).collect();
        assert_eq!(order, vec![8, 5, 9]);
    }

    #[test]
    fn tied_finishes_feed_category_totals() {
        let config = PointsConfig::from_entries(
            [(
                Category::Major,
                vec![(1, 750.0), (2, 400.0), (3, 350.0), (4, 325.0)],
            )],
            BeyondTable::Zero,
        )
        .unwrap();
        let entries = vec![
            ScoreEntry::new(1, Some(70.0), None),
            ScoreEntry::new(2, Some(70.0), None),
            ScoreEntry::new(3, Some(70.0), None),
            ScoreEntry::new(4, Some(75.0), None),
        ];
        let results = resolve_tournament(&entries, Category::Major, &config);
        let ranked = standings(finishes_from_results(1, Category::Major, &results.net), None);

        let totals: Vec<(usize, i64, f64)> = ranked
            .iter()
            .map(|r| (r.rank, r.row.player_id, r.row.total))
            .collect();
        assert_eq!(
            totals,
            vec![(1, 1, 500.0), (2, 2, 500.0), (3, 3, 500.0), (4, 4, 325.0)]
        );
        assert_eq!(ranked[0].row.finishes[0].position, 1);
    }

    #[test]
    fn serializes_flat_rows() {
        let ranked = standings(vec![(1, finish(1, Category::Supr, 10.0, 70.0))], None);
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json[0]["rank"], 1);
        assert_eq!(json[0]["playerId"], 1);
        assert_eq!(json[0]["categoryPoints"]["supr"], 10.0);
    }
}

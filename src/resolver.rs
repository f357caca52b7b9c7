// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    points::PointsConfig,
    ties::{assign_positions, average_points, group_ties},
    Category, PlayerId, ScoreEntry, Track,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PositionedResult {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    pub position: u32,
    pub tied: bool,
    pub points: f64,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TournamentResults {
    pub net: Vec<PositionedResult>,
    pub gross: Vec<PositionedResult>,
}

impl TournamentResults {
    pub fn track(&self, track: Track) -> &[PositionedResult] {
        match track {
            Track::Net => &self.net,
            Track::Gross => &self.gross,
        }
    }
}

/// Rank a tournament on both tracks.
///
/// Net pays out from the tournament's own category table, gross from the tour table.
pub fn resolve_tournament(
    entries: &[ScoreEntry],
    category: Category,
    config: &PointsConfig,
) -> TournamentResults {
    TournamentResults {
        net: resolve_track(entries, Track::Net, category, config),
        gross: resolve_track(entries, Track::Gross, category, config),
    }
}

/// Rank the entries that have a score on `track`, in finishing order.
///
/// Entries without a score for the track are left out. Without a points table
/// for the track's category every position is worth 0.
pub fn resolve_track(
    entries: &[ScoreEntry],
    track: Track,
    category: Category,
    config: &PointsConfig,
) -> Vec<PositionedResult> {
    let table_category = track.table_category(category);
    let schedule = config.schedule(table_category);
    if schedule.is_missing() {
        warn!(%track, %category, %table_category, "no points table, awarding 0 points");
    }

    let scored = entries
        .iter()
        .filter_map(|entry| entry.score(track).map(|score| (entry.player_id, score)));
    let groups = assign_positions(group_ties(scored, |(_, score)| *score));

    let mut results = Vec::new();
    for group in &groups {
        let points = average_points(group.position, group.size(), &schedule);
        for (player_id, score) in &group.members {
            results.push(PositionedResult {
                player_id: *player_id,
                position: group.position,
                tied: group.is_tied(),
                points,
                score: *score,
            });
        }
    }
    debug!(
        %track,
        %category,
        players = results.len(),
        groups = groups.len(),
        "resolved track"
    );
    results
}

// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod audit;
pub mod cli;
pub mod db;
pub mod import;
pub mod leaderboard;
pub mod memory;
pub mod points;
pub mod recalc;
pub mod resolver;
pub mod ties;

pub use points::{BeyondTable, PointsConfig, PointsError, PointsTable};
pub use recalc::{
    RecalculationError, RecalculationReport, RecalculationScope, RecalculationService,
    ResultStore,
};
pub use resolver::{resolve_tournament, resolve_track, PositionedResult, TournamentResults};

pub type TournamentId = i64;
pub type PlayerId = i64;

/// Tournament type, each with its own points schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Major,
    Tour,
    League,
    Supr,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Major,
        Category::Tour,
        Category::League,
        Category::Supr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Major => "major",
            Category::Tour => "tour",
            Category::League => "league",
            Category::Supr => "supr",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category {0:?}, valid categories are: major, tour, league, supr")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// One of the two independent scoring lenses of a tournament.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Net,
    Gross,
}

impl Track {
    /// The category whose points table pays out this track.
    ///
    /// Gross is always benchmarked against the tour schedule, whatever the
    /// tournament's own category is.
    pub fn table_category(&self, tournament_category: Category) -> Category {
        match self {
            Track::Net => tournament_category,
            Track::Gross => Category::Tour,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Net => "net",
            Track::Gross => "gross",
        }
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tracks a recalculation touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Net,
    Gross,
    Both,
}

impl Mode {
    pub fn tracks(&self) -> &'static [Track] {
        match self {
            Mode::Net => &[Track::Net],
            Mode::Gross => &[Track::Gross],
            Mode::Both => &[Track::Net, Track::Gross],
        }
    }
}

/// One player's raw result in one tournament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub net_score: Option<f64>,
    pub gross_score: Option<f64>,
    pub handicap: Option<f64>,
}

impl ScoreEntry {
    pub fn new(player_id: PlayerId, net_score: Option<f64>, gross_score: Option<f64>) -> Self {
        Self {
            player_id,
            net_score,
            gross_score,
            handicap: None,
        }
    }

    /// The score for a track, if one was recorded. Non-finite values count as missing.
    pub fn score(&self, track: Track) -> Option<f64> {
        let score = match track {
            Track::Net => self.net_score,
            Track::Gross => self.gross_score,
        };
        score.filter(|score| score.is_finite())
    }
}

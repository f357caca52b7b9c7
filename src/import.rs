// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs::File, io::BufReader, path::Path};

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use thiserror::Error;

use crate::{points::PointsConfig, Category};

#[derive(Debug, Deserialize)]
pub struct PlayerScore {
    pub player: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub net: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub gross: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub handicap: Option<f64>,
}

impl PlayerScore {
    /// The net score, or gross minus handicap when only those were recorded.
    pub fn net_score(&self) -> Option<f64> {
        self.net.or_else(|| match (self.gross, self.handicap) {
            (Some(gross), Some(handicap)) => Some(gross - handicap),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TournamentFile {
    pub name: String,
    pub date: NaiveDate,
    pub category: Category,
    #[serde(default)]
    pub manual_entry: bool,
    pub scores: Vec<PlayerScore>,
}

/// Score sheets write numbers as text as often as not, and leave blanks.
fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Number::Float(value)) => Ok(Some(value)),
        Some(Number::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Number::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unable to read json file {path:?}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path:?}")]
    InvalidJSON {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ImportError> {
    let path_name = path.display().to_string();
    let file = File::open(path).map_err(|source| ImportError::FileRead {
        path: path_name.to_owned(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| ImportError::InvalidJSON {
        path: path_name,
        source,
    })
}

pub fn read_tournament_json(path: &Path) -> Result<TournamentFile, ImportError> {
    read_json(path)
}

/// Read a points configuration. Invalid tables, such as a repeated position,
/// are reported as invalid json.
pub fn read_points_config_json(path: &Path) -> Result<PointsConfig, ImportError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{read_tournament_json, ImportError, TournamentFile};
    use crate::Category;

    #[test]
    fn parse_tournament() {
        let tournament: TournamentFile = serde_json::from_str(
            r#"{
                "name": "Autumn League 3",
                "date": "2026-09-20",
                "category": "league",
                "scores": [
                    {"player": "Ann", "net": 70, "gross": "82", "handicap": 12},
                    {"player": "Bob", "gross": 90.5, "handicap": "18.5"},
                    {"player": "Cid", "net": "", "gross": null}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(tournament.category, Category::League);
        assert!(!tournament.manual_entry);
        assert_eq!(tournament.scores[0].gross, Some(82.0));
        assert_eq!(tournament.scores[0].net_score(), Some(70.0));
        assert_eq!(tournament.scores[1].net, None);
        assert_eq!(tournament.scores[1].net_score(), Some(72.0));
        assert_eq!(tournament.scores[2].net_score(), None);
        assert_eq!(tournament.scores[2].gross, None);
    }

    #[test]
    fn reject_unknown_category() {
        let result: Result<TournamentFile, _> = serde_json::from_str(
            r#"{"name": "X", "date": "2026-01-01", "category": "open", "scores": []}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn reject_non_numeric_score() {
        let result: Result<TournamentFile, _> = serde_json::from_str(
            r#"{"name": "X", "date": "2026-01-01", "category": "tour",
                "scores": [{"player": "Ann", "net": "DNF"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_file() {
        let result = read_tournament_json(Path::new("/nonexistent/tournament.json"));
        assert!(matches!(result, Err(ImportError::FileRead { .. })));
    }
}

// Points schedules per tournament category

// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Category;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointsError {
    #[error("position {position} appears more than once in the points table")]
    DuplicateConfigPosition { position: u32 },
    #[error("positions start at 1, got {position}")]
    InvalidPosition { position: u32 },
    #[error("points for position {position} must be a non-negative number, got {points}")]
    InvalidPoints { position: u32, points: f64 },
    #[error("points table for {category} is invalid")]
    InvalidTable {
        category: Category,
        #[source]
        source: Box<PointsError>,
    },
}

/// Anything that pays out points for a finishing position.
pub trait Payout {
    fn points_for(&self, position: u32) -> f64;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub position: u32,
    pub points: f64,
}

/// Sparse position to points mapping, sorted by position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PointsEntry>", into = "Vec<PointsEntry>")]
pub struct PointsTable {
    entries: Vec<PointsEntry>,
}

impl PointsTable {
    pub fn new(entries: impl IntoIterator<Item = (u32, f64)>) -> Result<Self, PointsError> {
        let mut seen = HashSet::new();
        let mut table = Vec::new();
        for (position, points) in entries {
            if position == 0 {
                return Err(PointsError::InvalidPosition { position });
            }
            if !points.is_finite() || points < 0.0 {
                return Err(PointsError::InvalidPoints { position, points });
            }
            if !seen.insert(position) {
                return Err(PointsError::DuplicateConfigPosition { position });
            }
            table.push(PointsEntry { position, points });
        }
        table.sort_by_key(|entry| entry.position);
        Ok(PointsTable { entries: table })
    }

    pub fn entries(&self) -> &[PointsEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest configured position, 0 for an empty table.
    pub fn last_position(&self) -> u32 {
        self.entries.last().map_or(0, |entry| entry.position)
    }

    /// Exact lookup: the configured value, or `None` when the position has no entry.
    pub fn get(&self, position: u32) -> Option<f64> {
        self.entries
            .binary_search_by_key(&position, |entry| entry.position)
            .ok()
            .map(|index| self.entries[index].points)
    }
}

impl Payout for PointsTable {
    fn points_for(&self, position: u32) -> f64 {
        self.get(position).unwrap_or(0.0)
    }
}

impl TryFrom<Vec<PointsEntry>> for PointsTable {
    type Error = PointsError;

    fn try_from(entries: Vec<PointsEntry>) -> Result<Self, Self::Error> {
        PointsTable::new(entries.into_iter().map(|e| (e.position, e.points)))
    }
}

impl From<PointsTable> for Vec<PointsEntry> {
    fn from(table: PointsTable) -> Self {
        table.entries
    }
}

/// What a position past the end of a table is worth.
///
/// Gaps inside the configured range always pay 0; this only covers positions
/// greater than the highest configured one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeyondTable {
    #[default]
    Zero,
    LastEntry,
    Fixed(f64),
}

/// A table together with the policy for positions beyond it.
///
/// A missing table pays 0 for every position.
#[derive(Clone, Copy, Debug)]
pub struct Schedule<'a> {
    table: Option<&'a PointsTable>,
    beyond: BeyondTable,
}

impl Schedule<'_> {
    pub fn is_missing(&self) -> bool {
        self.table.is_none()
    }
}

impl Payout for Schedule<'_> {
    fn points_for(&self, position: u32) -> f64 {
        let Some(table) = self.table else {
            return 0.0;
        };
        if position <= table.last_position() {
            return table.points_for(position);
        }
        match self.beyond {
            BeyondTable::Zero => 0.0,
            BeyondTable::LastEntry => table.entries.last().map_or(0.0, |entry| entry.points),
            BeyondTable::Fixed(points) => points,
        }
    }
}

/// Immutable snapshot of every category's points table.
///
/// Administrative changes produce a new snapshot instead of mutating this one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigData")]
pub struct PointsConfig {
    beyond_table: BeyondTable,
    tables: IndexMap<Category, PointsTable>,
}

#[derive(Deserialize)]
struct ConfigData {
    #[serde(default)]
    beyond_table: BeyondTable,
    tables: IndexMap<Category, PointsTable>,
}

impl From<ConfigData> for PointsConfig {
    fn from(data: ConfigData) -> Self {
        PointsConfig::new(data.tables, data.beyond_table)
    }
}

impl PointsConfig {
    pub fn new(
        tables: impl IntoIterator<Item = (Category, PointsTable)>,
        beyond_table: BeyondTable,
    ) -> Self {
        let mut tables: IndexMap<Category, PointsTable> = tables.into_iter().collect();
        tables.sort_keys();
        PointsConfig {
            beyond_table,
            tables,
        }
    }

    /// Build a configuration from raw `(position, points)` lists, rejecting the
    /// whole configuration when any table is invalid.
    pub fn from_entries(
        tables: impl IntoIterator<Item = (Category, Vec<(u32, f64)>)>,
        beyond_table: BeyondTable,
    ) -> Result<Self, PointsError> {
        let tables = tables
            .into_iter()
            .map(|(category, entries)| {
                PointsTable::new(entries)
                    .map(|table| (category, table))
                    .map_err(|source| PointsError::InvalidTable {
                        category,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PointsConfig::new(tables, beyond_table))
    }

    /// The table of a category. An empty table counts as missing.
    pub fn table(&self, category: Category) -> Option<&PointsTable> {
        self.tables.get(&category).filter(|table| !table.is_empty())
    }

    pub fn tables(&self) -> impl Iterator<Item = (Category, &PointsTable)> {
        self.tables.iter().map(|(category, table)| (*category, table))
    }

    pub fn beyond_table(&self) -> BeyondTable {
        self.beyond_table
    }

    pub fn schedule(&self, category: Category) -> Schedule<'_> {
        Schedule {
            table: self.table(category),
            beyond: self.beyond_table,
        }
    }

    pub fn with_table(&self, category: Category, table: PointsTable) -> Self {
        let mut tables = self.tables.clone();
        tables.insert(category, table);
        PointsConfig::new(tables, self.beyond_table)
    }

    pub fn without_table(&self, category: Category) -> Self {
        let mut tables = self.tables.clone();
        tables.shift_remove(&category);
        PointsConfig::new(tables, self.beyond_table)
    }

    pub fn with_policy(&self, beyond_table: BeyondTable) -> Self {
        PointsConfig {
            beyond_table,
            tables: self.tables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{BeyondTable, Payout, PointsConfig, PointsError, PointsTable};
    use crate::Category;

    fn major() -> PointsTable {
        PointsTable::new([(1, 750.0), (2, 400.0), (3, 350.0), (4, 325.0)]).unwrap()
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let table = PointsTable::new([(1, 500.0), (2, 300.0), (1, 450.0)]);
        assert_eq!(
            table,
            Err(PointsError::DuplicateConfigPosition { position: 1 })
        );
    }

    #[test]
    fn invalid_entries_are_rejected() {
        assert_eq!(
            PointsTable::new([(0, 10.0)]),
            Err(PointsError::InvalidPosition { position: 0 })
        );
        assert!(matches!(
            PointsTable::new([(1, -1.0)]),
            Err(PointsError::InvalidPoints { position: 1, .. })
        ));
    }

    #[test]
    fn entries_are_sorted() {
        let table = PointsTable::new([(3, 10.0), (1, 30.0), (2, 20.0)]).unwrap();
        let positions: Vec<u32> = table.entries().iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(table.last_position(), 3);
    }

    #[rstest]
    #[case(1, 750.0)]
    #[case(4, 325.0)]
    #[case(5, 0.0)]
    #[case(100, 0.0)]
    fn exact_lookup(#[case] position: u32, #[case] points: f64) {
        assert_eq!(major().points_for(position), points);
    }

    #[test]
    fn gap_inside_table_pays_zero() {
        let table = PointsTable::new([(1, 100.0), (3, 50.0)]).unwrap();
        let config = PointsConfig::new([(Category::League, table)], BeyondTable::LastEntry);
        assert_eq!(config.schedule(Category::League).points_for(2), 0.0);
    }

    #[rstest]
    #[case(BeyondTable::Zero, 0.0)]
    #[case(BeyondTable::LastEntry, 325.0)]
    #[case(BeyondTable::Fixed(0.5), 0.5)]
    fn beyond_table_policy(#[case] policy: BeyondTable, #[case] points: f64) {
        let config = PointsConfig::new([(Category::Major, major())], policy);
        let schedule = config.schedule(Category::Major);
        assert_eq!(schedule.points_for(4), 325.0);
        assert_eq!(schedule.points_for(9), points);
    }

    #[test]
    fn missing_table_pays_zero() {
        let config = PointsConfig::new([(Category::Major, major())], BeyondTable::Fixed(1.0));
        let schedule = config.schedule(Category::Supr);
        assert!(schedule.is_missing());
        assert_eq!(schedule.points_for(1), 0.0);
    }

    #[rstest]
    #[case(BeyondTable::Fixed(0.5))]
    #[case(BeyondTable::LastEntry)]
    fn empty_table_counts_as_missing(#[case] policy: BeyondTable) {
        let config: PointsConfig = serde_json::from_str(&format!(
            r#"{{"beyond_table": {}, "tables": {{"supr": [], "tour": [{{"position": 1, "points": 500}}]}}}}"#,
            serde_json::to_string(&policy).unwrap()
        ))
        .unwrap();
        assert!(config.table(Category::Supr).is_none());
        let schedule = config.schedule(Category::Supr);
        assert!(schedule.is_missing());
        assert_eq!(schedule.points_for(1), 0.0);
        assert_eq!(schedule.points_for(2), 0.0);
    }

    #[test]
    fn updates_produce_new_snapshot() {
        let config = PointsConfig::new([(Category::Major, major())], BeyondTable::Zero);
        let tour = PointsTable::new([(1, 500.0)]).unwrap();
        let updated = config.with_table(Category::Tour, tour);

        assert!(config.table(Category::Tour).is_none());
        assert_eq!(updated.table(Category::Tour).unwrap().get(1), Some(500.0));
        assert!(updated.without_table(Category::Major).table(Category::Major).is_none());
        assert_eq!(
            updated.with_policy(BeyondTable::LastEntry).beyond_table(),
            BeyondTable::LastEntry
        );
    }

    #[test]
    fn invalid_table_names_category() {
        let result = PointsConfig::from_entries(
            [
                (Category::Major, vec![(1, 750.0)]),
                (Category::Tour, vec![(1, 500.0), (1, 400.0)]),
            ],
            BeyondTable::Zero,
        );
        match result {
            Err(PointsError::InvalidTable { category, source }) => {
                assert_eq!(category, Category::Tour);
                assert_eq!(*source, PointsError::DuplicateConfigPosition { position: 1 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn deserialize_config() {
        let config: PointsConfig = serde_json::from_str(
            r#"{
                "beyond_table": {"fixed": 0.5},
                "tables": {
                    "tour": [{"position": 2, "points": 300}, {"position": 1, "points": 500}],
                    "major": [{"position": 1, "points": 750}]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.beyond_table(), BeyondTable::Fixed(0.5));
        let categories: Vec<Category> = config.tables().map(|(c, _)| c).collect();
        assert_eq!(categories, vec![Category::Major, Category::Tour]);
        assert_eq!(config.table(Category::Tour).unwrap().get(2), Some(300.0));
    }

    #[test]
    fn deserialize_rejects_duplicates() {
        let result: Result<PointsConfig, _> = serde_json::from_str(
            r#"{"tables": {"tour": [{"position": 1, "points": 500}, {"position": 1, "points": 5}]}}"#,
        );
        assert!(result.is_err());
    }
}

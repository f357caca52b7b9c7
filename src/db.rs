// Database connections

// SPDX-FileCopyrightText: 2023 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::{
    audit::{AuditLevel, AuditLogEntry},
    import::TournamentFile,
    leaderboard::TournamentFinish,
    points::{BeyondTable, PointsConfig},
    recalc::{Placing, ResultStore, StoreError, StoredResult, Tournament},
    Category, PlayerId, ScoreEntry, TournamentId, Track,
};

pub trait Database {
    fn open(&self) -> anyhow::Result<Connection>;
}

pub struct LocalDatabase {
    path: PathBuf,
}

impl LocalDatabase {
    pub fn new(path: PathBuf) -> Self {
        LocalDatabase { path }
    }
}

impl Database for LocalDatabase {
    fn open(&self) -> anyhow::Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }
}

pub fn create_database(conn: &Connection) -> anyhow::Result<()> {
    conn.pragma_update(None, "foreign_keys", "on")?;
    conn.execute_batch(
        "
        create table if not exists Player (
            id integer primary key autoincrement,
            name text not null,

            unique(name)
        );

        create table if not exists Tournament (
            id integer primary key autoincrement,
            name text not null,
            category text not null,
            date text not null,
            manual_entry integer not null default 0,

            unique(name, date)
        );

        create table if not exists Score (
            id integer primary key autoincrement,
            tournament_id integer not null,
            player_id integer not null,
            net_score real,
            gross_score real,
            handicap real,
            net_position integer,
            net_points real,
            gross_position integer,
            gross_points real,

            unique(tournament_id, player_id),
            foreign key(tournament_id) references Tournament(id),
            foreign key(player_id) references Player(id)
        );

        create table if not exists PointsEntry (
            category text not null,
            position integer not null,
            points real not null,

            primary key(category, position)
        );

        create table if not exists Setting (
            name text primary key,
            value text not null
        );

        create table if not exists AuditLog (
            id integer primary key autoincrement,
            timestamp text not null,
            level text not null,
            action text not null,
            payload text not null
        )
    ",
    )?;
    Ok(())
}

fn backend(error: rusqlite::Error) -> StoreError {
    StoreError::Backend(error.into())
}

fn is_busy(error: &rusqlite::Error) -> bool {
    matches!(
        error.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

fn parse_category(category: &str) -> Result<Category, StoreError> {
    category
        .parse()
        .map_err(|error| StoreError::Backend(anyhow::Error::new(error)))
}

fn placing(position: Option<u32>, points: Option<f64>) -> Option<Placing> {
    position.map(|position| Placing::new(position, points.unwrap_or(0.0)))
}

/// Tournaments, scores, points configuration and audit log in SQLite.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> anyhow::Result<Self> {
        create_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open(db: &dyn Database) -> anyhow::Result<Self> {
        let conn = db.open()?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        SqliteStore::new(conn)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace the stored points configuration with a new snapshot.
    pub fn store_points_config(&self, config: &PointsConfig) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("delete from PointsEntry", [])?;
        {
            let mut stmt =
                tx.prepare("insert into PointsEntry (category, position, points) values (?, ?, ?)")?;
            for (category, table) in config.tables() {
                for entry in table.entries() {
                    stmt.execute(params![category.as_str(), entry.position, entry.points])?;
                }
            }
        }
        tx.execute(
            "
            insert into Setting (name, value) values ('beyond_table', ?)
            on conflict (name) do update set value = excluded.value;
        ",
            params![serde_json::to_string(&config.beyond_table())?],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load the points configuration, failing on any invalid table.
    pub fn load_points_config(&self) -> anyhow::Result<PointsConfig> {
        let mut stmt = self
            .conn
            .prepare("select category, position, points from PointsEntry order by category, position")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables: Vec<(Category, Vec<(u32, f64)>)> = Vec::new();
        for (category, entries) in &rows.into_iter().chunk_by(|(category, _, _)| category.clone()) {
            let category: Category = category
                .parse()
                .with_context(|| format!("invalid points configuration category {}", category))?;
            tables.push((
                category,
                entries.map(|(_, position, points)| (position, points)).collect(),
            ));
        }

        let beyond_table: Option<String> = self
            .conn
            .query_row(
                "select value from Setting where name = 'beyond_table'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let beyond_table = match beyond_table {
            Some(value) => serde_json::from_str(&value).context("invalid beyond_table setting")?,
            None => BeyondTable::default(),
        };

        Ok(PointsConfig::from_entries(tables, beyond_table)?)
    }

    /// Store a tournament and its scores.
    ///
    /// Derived positions and points of players that are still in the tournament
    /// are kept so that a recalculation can report what changed.
    pub fn store_tournament(&self, tournament: &TournamentFile) -> anyhow::Result<TournamentId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "
            insert into Tournament (name, category, date, manual_entry) values (?, ?, ?, ?)
            on conflict (name, date) do update set
                category = excluded.category,
                manual_entry = excluded.manual_entry;
        ",
            params![
                tournament.name,
                tournament.category.as_str(),
                tournament.date,
                tournament.manual_entry
            ],
        )?;
        let tournament_id: TournamentId = tx.query_row(
            "select id from Tournament where name = ? and date = ?",
            params![tournament.name, tournament.date],
            |row| row.get(0),
        )?;

        let mut player_ids = Vec::new();
        for score in &tournament.scores {
            tx.execute(
                "
                insert into Player (name) values (?)
                on conflict (name) do nothing;
            ",
                params![score.player],
            )?;
            let player_id: PlayerId = tx.query_row(
                "select id from Player where name = ?",
                params![score.player],
                |row| row.get(0),
            )?;
            player_ids.push(player_id);

            tx.execute(
                "
                insert into Score (tournament_id, player_id, net_score, gross_score, handicap)
                values (?, ?, ?, ?, ?)
                on conflict (tournament_id, player_id) do update set
                    net_score = excluded.net_score,
                    gross_score = excluded.gross_score,
                    handicap = excluded.handicap;
            ",
                params![
                    tournament_id,
                    player_id,
                    score.net_score(),
                    score.gross,
                    score.handicap
                ],
            )?;
        }

        let stored: Vec<PlayerId> = {
            let mut stmt = tx.prepare("select player_id from Score where tournament_id = ?")?;
            let ids = stmt
                .query_map(params![tournament_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        for player_id in stored.into_iter().filter(|p| !player_ids.contains(p)) {
            tx.execute(
                "delete from Score where tournament_id = ? and player_id = ?",
                params![tournament_id, player_id],
            )?;
        }

        tx.commit()?;
        Ok(tournament_id)
    }

    pub fn append_audit(&self, entries: &[AuditLogEntry]) -> anyhow::Result<()> {
        let mut stmt = self.conn.prepare(
            "insert into AuditLog (timestamp, level, action, payload) values (?, ?, ?, ?)",
        )?;
        for entry in entries {
            stmt.execute(params![
                entry.timestamp,
                entry.level.as_str(),
                entry.action.as_str(),
                serde_json::to_string(&entry.payload)?
            ])?;
        }
        Ok(())
    }

    pub fn audit_entries(&self) -> anyhow::Result<Vec<AuditLogEntry>> {
        let mut stmt = self
            .conn
            .prepare("select timestamp, level, action, payload from AuditLog order by id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, DateTime<Utc>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(timestamp, level, action, payload)| -> anyhow::Result<AuditLogEntry> {
                Ok(AuditLogEntry {
                    timestamp,
                    level: if level == AuditLevel::Warning.as_str() {
                        AuditLevel::Warning
                    } else {
                        AuditLevel::Info
                    },
                    action: action.parse()?,
                    payload: serde_json::from_str(&payload)?,
                })
            })
            .collect()
    }

    pub fn player_names(&self) -> anyhow::Result<HashMap<PlayerId, String>> {
        let mut stmt = self.conn.prepare("select id, name from Player")?;
        let names = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(names)
    }

    /// Every stored finish on a track, optionally for one tournament category.
    pub fn finishes(
        &self,
        track: Track,
        category: Option<Category>,
    ) -> anyhow::Result<Vec<(PlayerId, TournamentFinish)>> {
        let sql = match track {
            Track::Net => {
                "
                select Score.player_id, Tournament.id, Tournament.category,
                       Score.net_position, Score.net_points, Score.net_score
                from Score join Tournament on Score.tournament_id = Tournament.id
                where Score.net_position is not null and Score.net_score is not null
                order by Tournament.date asc, Score.id asc
            "
            }
            Track::Gross => {
                "
                select Score.player_id, Tournament.id, Tournament.category,
                       Score.gross_position, Score.gross_points, Score.gross_score
                from Score join Tournament on Score.tournament_id = Tournament.id
                where Score.gross_position is not null and Score.gross_score is not null
                order by Tournament.date asc, Score.id asc
            "
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, PlayerId>(0)?,
                    row.get::<_, TournamentId>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut finishes = Vec::new();
        for (player_id, tournament_id, tournament_category, position, points, score) in rows {
            let tournament_category: Category = tournament_category.parse()?;
            if category.is_some_and(|category| category != tournament_category) {
                continue;
            }
            finishes.push((
                player_id,
                TournamentFinish {
                    tournament_id,
                    category: tournament_category,
                    position,
                    points: points.unwrap_or(0.0),
                    score,
                },
            ));
        }
        Ok(finishes)
    }

    fn query_tournaments(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Tournament>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "select id, name, category, manual_entry from Tournament {} order by date, id",
                filter
            ))
            .map_err(backend)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, TournamentId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        rows.into_iter()
            .map(|(id, name, category, manual_entry)| -> Result<Tournament, StoreError> {
                Ok(Tournament {
                    id,
                    name,
                    category: parse_category(&category)?,
                    manual_entry,
                })
            })
            .collect()
    }
}

impl ResultStore for SqliteStore {
    fn tournaments(&self) -> Result<Vec<Tournament>, StoreError> {
        self.query_tournaments("", [])
    }

    fn tournament(&self, tournament_id: TournamentId) -> Result<Option<Tournament>, StoreError> {
        Ok(self
            .query_tournaments("where id = ?", params![tournament_id])?
            .into_iter()
            .next())
    }

    fn player_tournaments(&self, player_id: PlayerId) -> Result<Vec<TournamentId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "
                select distinct Score.tournament_id
                from Score join Tournament on Score.tournament_id = Tournament.id
                where Score.player_id = ?
                order by Tournament.date, Tournament.id
            ",
            )
            .map_err(backend)?;
        let ids = stmt
            .query_map(params![player_id], |row| row.get(0))
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(ids)
    }

    fn score_entries(&self, tournament_id: TournamentId) -> Result<Vec<ScoreEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "
                select player_id, net_score, gross_score, handicap
                from Score
                where tournament_id = ?
                order by id asc
            ",
            )
            .map_err(backend)?;
        let entries = stmt
            .query_map(params![tournament_id], |row| {
                Ok(ScoreEntry {
                    player_id: row.get(0)?,
                    net_score: row.get(1)?,
                    gross_score: row.get(2)?,
                    handicap: row.get(3)?,
                })
            })
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(entries)
    }

    fn stored_results(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<StoredResult>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "
                select player_id, net_position, net_points, gross_position, gross_points
                from Score
                where tournament_id = ?
                order by id asc
            ",
            )
            .map_err(backend)?;
        let results = stmt
            .query_map(params![tournament_id], |row| {
                Ok(StoredResult {
                    player_id: row.get(0)?,
                    net: placing(row.get(1)?, row.get(2)?),
                    gross: placing(row.get(3)?, row.get(4)?),
                })
            })
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(results)
    }

    fn write_placing(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        track: Track,
        placing: Option<Placing>,
    ) -> Result<(), StoreError> {
        let sql = match track {
            Track::Net => {
                "update Score set net_position = ?, net_points = ? where tournament_id = ? and player_id = ?"
            }
            Track::Gross => {
                "update Score set gross_position = ?, gross_points = ? where tournament_id = ? and player_id = ?"
            }
        };
        let updated = self
            .conn
            .execute(
                sql,
                params![
                    placing.map(|p| p.position),
                    placing.map(|p| p.points),
                    tournament_id,
                    player_id
                ],
            )
            .map_err(|error| {
                if is_busy(&error) {
                    StoreError::Conflict {
                        tournament_id,
                        player_id,
                    }
                } else {
                    backend(error)
                }
            })?;
        if updated == 0 {
            return Err(StoreError::MissingRow {
                tournament_id,
                player_id,
            });
        }
        Ok(())
    }
}

// Keep stored positions and points in line with scores and configuration

// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex, PoisonError},
};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    audit::{AuditAction, AuditLog, AuditLogEntry},
    points::PointsConfig,
    resolver::resolve_track,
    Category, Mode, PlayerId, ScoreEntry, TournamentId, Track,
};

/// Points are stored rounded to one decimal, anything closer than this is unchanged.
const POINTS_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placing {
    pub position: u32,
    pub points: f64,
}

impl Placing {
    pub fn new(position: u32, points: f64) -> Self {
        Self { position, points }
    }
}

fn same_placing(a: Option<Placing>, b: Option<Placing>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.position == b.position && (a.points - b.points).abs() < POINTS_TOLERANCE
        }
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub category: Category,
    /// Results were entered by hand and must not be derived.
    pub manual_entry: bool,
}

/// Positions and points as currently persisted for one player in one tournament.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub player_id: PlayerId,
    pub net: Option<Placing>,
    pub gross: Option<Placing>,
}

impl StoredResult {
    pub fn placing(&self, track: Track) -> Option<Placing> {
        match track {
            Track::Net => self.net,
            Track::Gross => self.gross,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("result of player {player_id} in tournament {tournament_id} was changed concurrently")]
    Conflict {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },
    #[error("no stored result for player {player_id} in tournament {tournament_id}")]
    MissingRow {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },
    #[error("player {player_id} has more than one score in tournament {tournament_id}")]
    DuplicatePlayer {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Conflicts go away when the row is recalculated again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Persistence collaborator: where scores come from and derived results go to.
pub trait ResultStore {
    fn tournaments(&self) -> Result<Vec<Tournament>, StoreError>;

    fn tournament(&self, tournament_id: TournamentId) -> Result<Option<Tournament>, StoreError>;

    /// Tournaments the player has a score in.
    fn player_tournaments(&self, player_id: PlayerId) -> Result<Vec<TournamentId>, StoreError>;

    /// Score entries of a tournament, always in the same order.
    fn score_entries(&self, tournament_id: TournamentId) -> Result<Vec<ScoreEntry>, StoreError>;

    fn stored_results(&self, tournament_id: TournamentId)
        -> Result<Vec<StoredResult>, StoreError>;

    /// Overwrite one track of one stored row. Writing the same value twice is harmless.
    fn write_placing(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        track: Track,
        placing: Option<Placing>,
    ) -> Result<(), StoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalculationScope {
    Tournament(TournamentId),
    Player(PlayerId),
    Category(Category),
    All,
}

impl Display for RecalculationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecalculationScope::Tournament(id) => write!(f, "tournament {}", id),
            RecalculationScope::Player(id) => write!(f, "player {}", id),
            RecalculationScope::Category(category) => write!(f, "category {}", category),
            RecalculationScope::All => f.write_str("all tournaments"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowChange {
    #[serde(rename = "tournamentId")]
    pub tournament_id: TournamentId,
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    pub track: Track,
    pub old: Option<Placing>,
    pub new: Option<Placing>,
}

/// A row, or a whole tournament when `player_id` is empty, that could not be processed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedRow {
    #[serde(rename = "tournamentId")]
    pub tournament_id: TournamentId,
    #[serde(rename = "playerId")]
    pub player_id: Option<PlayerId>,
    pub track: Option<Track>,
    pub reason: String,
    pub retryable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Nothing needed changing.
    Unchanged,
    Updated,
    /// Some rows could not be processed.
    Incomplete,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecalculationReport {
    pub scope: RecalculationScope,
    pub mode: Mode,
    pub changed: Vec<RowChange>,
    pub skipped: Vec<SkippedRow>,
    pub log: Vec<AuditLogEntry>,
}

impl RecalculationReport {
    pub fn outcome(&self) -> Outcome {
        if !self.skipped.is_empty() {
            Outcome::Incomplete
        } else if self.changed.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Updated
        }
    }
}

#[derive(Error, Debug)]
pub enum RecalculationError {
    #[error("tournament {0} does not exist")]
    UnknownTournament(TournamentId),
    #[error("unable to load the tournaments to recalculate")]
    Store(#[source] StoreError),
}

/// Work done by one invocation, turned into a report at the end.
#[derive(Default)]
struct Pass {
    changed: Vec<RowChange>,
    skipped: Vec<SkippedRow>,
    log: AuditLog,
    tournaments: usize,
    manual: usize,
}

impl Pass {
    fn skip_tournament(&mut self, tournament_id: TournamentId, error: &StoreError) {
        warn!(tournament_id, %error, "skipping tournament");
        self.log.warning(
            AuditAction::TournamentSkipped,
            json!({ "tournament": tournament_id, "reason": error.to_string() }),
        );
        self.skipped.push(SkippedRow {
            tournament_id,
            player_id: None,
            track: None,
            reason: error.to_string(),
            retryable: error.is_retryable(),
        });
    }

    fn finish(mut self, scope: RecalculationScope, mode: Mode) -> RecalculationReport {
        let missing_tables = self.log.count(AuditAction::MissingPointsTable);
        info!(
            %scope,
            ?mode,
            tournaments = self.tournaments,
            changed = self.changed.len(),
            skipped = self.skipped.len(),
            manual = self.manual,
            "recalculation finished"
        );
        self.log.info(
            AuditAction::Summary,
            json!({
                "scope": scope,
                "mode": mode,
                "tournaments": self.tournaments,
                "changed": self.changed.len(),
                "skipped": self.skipped.len(),
                "manualEntrySkipped": self.manual,
                "missingTables": missing_tables,
            }),
        );
        RecalculationReport {
            scope,
            mode,
            changed: self.changed,
            skipped: self.skipped,
            log: self.log.into_entries(),
        }
    }
}

/// Re-derives stored positions and points from current scores and configuration.
///
/// Passes over the same tournament are serialized; different tournaments run freely.
pub struct RecalculationService<S> {
    store: S,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl<S: ResultStore> RecalculationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn recalculate(
        &self,
        scope: RecalculationScope,
        mode: Mode,
        config: &PointsConfig,
    ) -> Result<RecalculationReport, RecalculationError> {
        match scope {
            RecalculationScope::Tournament(id) => self.recalculate_tournament(id, mode, config),
            RecalculationScope::Player(id) => self.recalculate_player(id, mode, config),
            RecalculationScope::Category(category) => {
                self.recalculate_all(Some(category), mode, config)
            }
            RecalculationScope::All => self.recalculate_all(None, mode, config),
        }
    }

    pub fn recalculate_tournament(
        &self,
        tournament_id: TournamentId,
        mode: Mode,
        config: &PointsConfig,
    ) -> Result<RecalculationReport, RecalculationError> {
        let tournament = self
            .store
            .tournament(tournament_id)
            .map_err(RecalculationError::Store)?
            .ok_or(RecalculationError::UnknownTournament(tournament_id))?;

        let mut pass = Pass::default();
        self.recalculate_rows(&mut pass, &tournament, None, mode, config);
        Ok(pass.finish(RecalculationScope::Tournament(tournament_id), mode))
    }

    /// Recalculate every tournament the player played, writing only that player's rows.
    pub fn recalculate_player(
        &self,
        player_id: PlayerId,
        mode: Mode,
        config: &PointsConfig,
    ) -> Result<RecalculationReport, RecalculationError> {
        let tournament_ids = self
            .store
            .player_tournaments(player_id)
            .map_err(RecalculationError::Store)?;

        let mut pass = Pass::default();
        for tournament_id in tournament_ids {
            match self.store.tournament(tournament_id) {
                Ok(Some(tournament)) => {
                    self.recalculate_rows(&mut pass, &tournament, Some(player_id), mode, config)
                }
                Ok(None) => pass.skip_tournament(
                    tournament_id,
                    &StoreError::MissingRow {
                        tournament_id,
                        player_id,
                    },
                ),
                Err(error) => pass.skip_tournament(tournament_id, &error),
            }
        }
        Ok(pass.finish(RecalculationScope::Player(player_id), mode))
    }

    pub fn recalculate_all(
        &self,
        category: Option<Category>,
        mode: Mode,
        config: &PointsConfig,
    ) -> Result<RecalculationReport, RecalculationError> {
        let tournaments = self
            .store
            .tournaments()
            .map_err(RecalculationError::Store)?;

        let mut pass = Pass::default();
        for tournament in tournaments
            .iter()
            .filter(|t| category.map_or(true, |category| t.category == category))
        {
            self.recalculate_rows(&mut pass, tournament, None, mode, config);
        }
        let scope = match category {
            Some(category) => RecalculationScope::Category(category),
            None => RecalculationScope::All,
        };
        Ok(pass.finish(scope, mode))
    }

    fn tournament_lock(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(tournament_id).or_default().clone()
    }

    /// Drop the tournament's lock from the map once no other pass holds or waits on it.
    fn release_lock(&self, tournament_id: TournamentId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(&tournament_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&tournament_id);
        }
    }

    fn recalculate_rows(
        &self,
        pass: &mut Pass,
        tournament: &Tournament,
        only_player: Option<PlayerId>,
        mode: Mode,
        config: &PointsConfig,
    ) {
        if tournament.manual_entry {
            info!(tournament_id = tournament.id, "manual entry, not recalculating");
            pass.manual += 1;
            pass.log.info(
                AuditAction::ManualEntrySkipped,
                json!({ "tournament": tournament.id, "name": tournament.name }),
            );
            return;
        }

        let lock = self.tournament_lock(tournament.id);
        {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.write_rows(pass, tournament, only_player, mode, config);
        }
        self.release_lock(tournament.id, lock);
    }

    fn write_rows(
        &self,
        pass: &mut Pass,
        tournament: &Tournament,
        only_player: Option<PlayerId>,
        mode: Mode,
        config: &PointsConfig,
    ) {
        let entries = match self.store.score_entries(tournament.id) {
            Ok(entries) => entries,
            Err(error) => return pass.skip_tournament(tournament.id, &error),
        };
        let stored: HashMap<PlayerId, StoredResult> = match self.store.stored_results(tournament.id)
        {
            Ok(stored) => stored.into_iter().map(|r| (r.player_id, r)).collect(),
            Err(error) => return pass.skip_tournament(tournament.id, &error),
        };
        pass.tournaments += 1;

        // players with a score first, in storage order, then rows left without a score
        let mut players: IndexSet<PlayerId> = entries.iter().map(|e| e.player_id).collect();
        let mut orphaned: Vec<PlayerId> = stored
            .keys()
            .copied()
            .filter(|p| !players.contains(p))
            .collect();
        orphaned.sort_unstable();
        players.extend(orphaned);

        for &track in mode.tracks() {
            let table_category = track.table_category(tournament.category);
            if config.table(table_category).is_none() {
                pass.log.warning(
                    AuditAction::MissingPointsTable,
                    json!({
                        "tournament": tournament.id,
                        "track": track,
                        "category": table_category,
                    }),
                );
            }

            let desired: HashMap<PlayerId, Placing> =
                resolve_track(&entries, track, tournament.category, config)
                    .into_iter()
                    .map(|r| (r.player_id, Placing::new(r.position, r.points)))
                    .collect();

            for &player_id in players
                .iter()
                .filter(|p| only_player.map_or(true, |only| **p == only))
            {
                let old = stored.get(&player_id).and_then(|r| r.placing(track));
                let new = desired.get(&player_id).copied();
                if same_placing(old, new) {
                    continue;
                }

                let change = RowChange {
                    tournament_id: tournament.id,
                    player_id,
                    track,
                    old,
                    new,
                };
                match self
                    .store
                    .write_placing(tournament.id, player_id, track, new)
                {
                    Ok(()) => {
                        pass.log.info(
                            AuditAction::RowChanged,
                            json!({
                                "tournament": change.tournament_id,
                                "player": change.player_id,
                                "track": change.track,
                                "old": change.old,
                                "new": change.new,
                            }),
                        );
                        pass.changed.push(change);
                    }
                    Err(error) => {
                        warn!(
                            tournament_id = tournament.id,
                            player_id,
                            %track,
                            %error,
                            "unable to write result"
                        );
                        pass.log.warning(
                            AuditAction::RowSkipped,
                            json!({
                                "tournament": tournament.id,
                                "player": player_id,
                                "track": track,
                                "reason": error.to_string(),
                                "retryable": error.is_retryable(),
                            }),
                        );
                        pass.skipped.push(SkippedRow {
                            tournament_id: tournament.id,
                            player_id: Some(player_id),
                            track: Some(track),
                            reason: error.to_string(),
                            retryable: error.is_retryable(),
                        });
                    }
                }
            }
        }
    }
}

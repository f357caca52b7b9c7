// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    recalc::{Placing, ResultStore, StoreError, StoredResult, Tournament},
    PlayerId, ScoreEntry, TournamentId, Track,
};

struct Row {
    entry: ScoreEntry,
    net: Option<Placing>,
    gross: Option<Placing>,
}

#[derive(Default)]
struct State {
    tournaments: Vec<Tournament>,
    rows: HashMap<TournamentId, Vec<Row>>,
    writes: usize,
}

/// Keeps everything in process memory. Safe to share between threads.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a tournament and its score entries. Stored results start empty.
    ///
    /// A player has at most one score per tournament.
    pub fn add_tournament(
        &self,
        tournament: Tournament,
        entries: Vec<ScoreEntry>,
    ) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        if let Some(entry) = entries.iter().find(|entry| !seen.insert(entry.player_id)) {
            return Err(StoreError::DuplicatePlayer {
                tournament_id: tournament.id,
                player_id: entry.player_id,
            });
        }

        let mut state = self.state();
        let rows = entries
            .into_iter()
            .map(|entry| Row {
                entry,
                net: None,
                gross: None,
            })
            .collect();
        state.rows.insert(tournament.id, rows);
        state.tournaments.retain(|t| t.id != tournament.id);
        state.tournaments.push(tournament);
        Ok(())
    }

    /// Replace a player's scores, keeping whatever results are stored for them.
    pub fn set_score(&self, tournament_id: TournamentId, entry: ScoreEntry) {
        let mut state = self.state();
        let rows = state.rows.entry(tournament_id).or_default();
        match rows.iter_mut().find(|row| row.entry.player_id == entry.player_id) {
            Some(row) => row.entry = entry,
            None => rows.push(Row {
                entry,
                net: None,
                gross: None,
            }),
        }
    }

    /// Set a stored result directly, as a manual edit would.
    pub fn set_stored(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        track: Track,
        placing: Option<Placing>,
    ) {
        let mut state = self.state();
        if let Some(row) = state
            .rows
            .get_mut(&tournament_id)
            .and_then(|rows| rows.iter_mut().find(|r| r.entry.player_id == player_id))
        {
            match track {
                Track::Net => row.net = placing,
                Track::Gross => row.gross = placing,
            }
        }
    }

    /// Number of successful `write_placing` calls so far.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }
}

impl ResultStore for InMemoryStore {
    fn tournaments(&self) -> Result<Vec<Tournament>, StoreError> {
        Ok(self.state().tournaments.clone())
    }

    fn tournament(&self, tournament_id: TournamentId) -> Result<Option<Tournament>, StoreError> {
        Ok(self
            .state()
            .tournaments
            .iter()
            .find(|t| t.id == tournament_id)
            .cloned())
    }

    fn player_tournaments(&self, player_id: PlayerId) -> Result<Vec<TournamentId>, StoreError> {
        let state = self.state();
        Ok(state
            .tournaments
            .iter()
            .filter(|t| {
                state.rows.get(&t.id).is_some_and(|rows| {
                    rows.iter().any(|row| row.entry.player_id == player_id)
                })
            })
            .map(|t| t.id)
            .collect())
    }

    fn score_entries(&self, tournament_id: TournamentId) -> Result<Vec<ScoreEntry>, StoreError> {
        Ok(self
            .state()
            .rows
            .get(&tournament_id)
            .map(|rows| rows.iter().map(|row| row.entry.clone()).collect())
            .unwrap_or_default())
    }

    fn stored_results(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<StoredResult>, StoreError> {
        Ok(self
            .state()
            .rows
            .get(&tournament_id)
            .map(|rows| {
                rows.iter()
                    .map(|row| StoredResult {
                        player_id: row.entry.player_id,
                        net: row.net,
                        gross: row.gross,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn write_placing(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        track: Track,
        placing: Option<Placing>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let row = state
            .rows
            .get_mut(&tournament_id)
            .and_then(|rows| rows.iter_mut().find(|r| r.entry.player_id == player_id))
            .ok_or(StoreError::MissingRow {
                tournament_id,
                player_id,
            })?;
        match track {
            Track::Net => row.net = placing,
            Track::Gross => row.gross = placing,
        }
        state.writes += 1;
        Ok(())
    }
}

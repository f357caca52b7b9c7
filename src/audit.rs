// Append-only record of what a recalculation did

// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RowChanged,
    RowSkipped,
    ManualEntrySkipped,
    TournamentSkipped,
    MissingPointsTable,
    Summary,
}

impl AuditAction {
    const ALL: [AuditAction; 6] = [
        AuditAction::RowChanged,
        AuditAction::RowSkipped,
        AuditAction::ManualEntrySkipped,
        AuditAction::TournamentSkipped,
        AuditAction::MissingPointsTable,
        AuditAction::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RowChanged => "row_changed",
            AuditAction::RowSkipped => "row_skipped",
            AuditAction::ManualEntrySkipped => "manual_entry_skipped",
            AuditAction::TournamentSkipped => "tournament_skipped",
            AuditAction::MissingPointsTable => "missing_points_table",
            AuditAction::Summary => "summary",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unknown audit action {0:?}")]
pub struct UnknownAuditAction(String);

impl FromStr for AuditAction {
    type Err = UnknownAuditAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAuditAction(s.to_owned()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "info",
            AuditLevel::Warning => "warning",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub level: AuditLevel,
    pub payload: Value,
}

/// Entries can be appended and read, never changed or removed.
#[derive(Clone, Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, action: AuditAction, payload: Value) -> &AuditLogEntry {
        self.append(action, AuditLevel::Info, payload)
    }

    pub fn warning(&mut self, action: AuditAction, payload: Value) -> &AuditLogEntry {
        self.append(action, AuditLevel::Warning, payload)
    }

    fn append(&mut self, action: AuditAction, level: AuditLevel, payload: Value) -> &AuditLogEntry {
        self.entries.push(AuditLogEntry {
            timestamp: Utc::now(),
            action,
            level,
            payload,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn into_entries(self) -> Vec<AuditLogEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AuditAction, AuditLevel, AuditLog};

    #[test]
    fn entries_are_appended_in_order() {
        let mut log = AuditLog::new();
        log.info(AuditAction::RowChanged, json!({"player": 1}));
        log.warning(AuditAction::MissingPointsTable, json!({"category": "supr"}));
        log.info(AuditAction::Summary, json!({}));

        let actions: Vec<AuditAction> = log.entries().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::RowChanged,
                AuditAction::MissingPointsTable,
                AuditAction::Summary
            ]
        );
        assert_eq!(log.entries()[1].level, AuditLevel::Warning);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);
        assert_eq!(log.count(AuditAction::RowChanged), 1);
    }

    #[test]
    fn action_names_round_trip() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                json!(action.as_str())
            );
        }
        assert!("dropped".parse::<AuditAction>().is_err());
    }
}

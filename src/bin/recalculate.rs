// SPDX-FileCopyrightText: 2026 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use serde::Serialize;

use golf_points::cli;
use golf_points::db::{LocalDatabase, SqliteStore};
use golf_points::recalc::Outcome;
use golf_points::{
    Category, Mode, PlayerId, RecalculationReport, RecalculationScope, RecalculationService,
    TournamentId,
};

#[derive(Parser, Debug)]
#[command(name = "recalculate")]
struct Args {
    #[arg(long, default_value = "golf.sqlite")]
    database: PathBuf,

    #[arg(long, default_value = "both", value_parser = cli::parse_mode)]
    mode: Mode,

    #[arg(long, group = "scope")]
    tournament: Option<TournamentId>,

    #[arg(long, group = "scope")]
    player: Option<PlayerId>,

    #[arg(long, group = "scope", value_parser = cli::parse_category)]
    category: Option<Category>,
}

impl Args {
    fn scope(&self) -> RecalculationScope {
        match (self.tournament, self.player, self.category) {
            (Some(id), _, _) => RecalculationScope::Tournament(id),
            (_, Some(id), _) => RecalculationScope::Player(id),
            (_, _, Some(category)) => RecalculationScope::Category(category),
            _ => RecalculationScope::All,
        }
    }
}

#[derive(Serialize)]
struct Output<'a> {
    outcome: Outcome,
    #[serde(flatten)]
    report: &'a RecalculationReport,
}

fn main() -> anyhow::Result<ExitCode> {
    cli::init_logging();
    let args = Args::parse();

    let store = SqliteStore::open(&LocalDatabase::new(args.database.clone()))?;
    let config = store.load_points_config()?;
    let service = RecalculationService::new(store);
    let report = service.recalculate(args.scope(), args.mode, &config)?;
    service.store().append_audit(&report.log)?;

    let outcome = report.outcome();
    println!(
        "{}",
        serde_json::to_string_pretty(&Output {
            outcome,
            report: &report,
        })?
    );

    Ok(match outcome {
        Outcome::Incomplete => ExitCode::from(2),
        Outcome::Unchanged | Outcome::Updated => ExitCode::SUCCESS,
    })
}

// SPDX-FileCopyrightText: 2021 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use golf_points::cli;
use golf_points::db::{LocalDatabase, SqliteStore};
use golf_points::import;

#[derive(Parser, Debug)]
#[command(name = "load")]
struct Args {
    #[arg(long, default_value = "golf.sqlite")]
    database: PathBuf,

    /// Points configuration replacing the stored one
    #[arg(long)]
    points: Option<PathBuf>,

    #[arg(name = "FILE")]
    paths: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    cli::init_logging();
    let args = Args::parse();

    let store = SqliteStore::open(&LocalDatabase::new(args.database))?;
    if let Some(path) = args.points {
        let config = import::read_points_config_json(&path)?;
        store.store_points_config(&config)?;
        info!(path = %path.display(), tables = config.tables().count(), "stored points configuration");
    }
    for path in args.paths {
        let tournament = import::read_tournament_json(&path)?;
        let id = store
            .store_tournament(&tournament)
            .with_context(|| format!("unable to store {}", path.display()))?;
        info!(id, name = %tournament.name, scores = tournament.scores.len(), "stored tournament");
    }

    Ok(())
}

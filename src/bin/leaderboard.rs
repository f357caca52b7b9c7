// SPDX-FileCopyrightText: 2021 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use golf_points::cli;
use golf_points::db::{LocalDatabase, SqliteStore};
use golf_points::leaderboard::{standings, RankedRow};
use golf_points::{Category, Track};

#[derive(Parser, Debug)]
#[command(name = "leaderboard")]
struct Args {
    #[arg(long, default_value = "golf.sqlite")]
    database: PathBuf,

    #[arg(long, default_value = "net", value_parser = cli::parse_track)]
    track: Track,

    #[arg(long, value_parser = cli::parse_category)]
    category: Option<Category>,

    /// Only count this many of each player's best finishes
    #[arg(long)]
    best_of: Option<usize>,
}

#[derive(Serialize)]
struct NamedRow<'a> {
    name: &'a str,
    #[serde(flatten)]
    row: RankedRow,
}

fn main() -> anyhow::Result<()> {
    cli::init_logging();
    let args = Args::parse();

    let store = SqliteStore::open(&LocalDatabase::new(args.database))?;
    let names = store.player_names()?;
    let finishes = store.finishes(args.track, args.category)?;

    let rows: Vec<NamedRow> = standings(finishes, args.best_of)
        .into_iter()
        .map(|row| NamedRow {
            name: names.get(&row.row.player_id).map_or("", String::as_str),
            row,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);

    Ok(())
}

// SPDX-FileCopyrightText: 2021 Jeroen Hoekx
// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Category, Mode, Track};

#[derive(Error, Debug, PartialEq)]
pub enum ArgumentsError {
    #[error("Invalid category, valid categories are: major, tour, league, supr")]
    UnknownCategory,
    #[error("Invalid mode, valid modes are: net, gross, both")]
    UnknownMode,
    #[error("Invalid track, valid tracks are: net, gross")]
    UnknownTrack,
}

pub fn parse_category(flag: &str) -> Result<Category, ArgumentsError> {
    flag.parse().map_err(|_| ArgumentsError::UnknownCategory)
}

pub fn parse_mode(flag: &str) -> Result<Mode, ArgumentsError> {
    match flag {
        "net" => Ok(Mode::Net),
        "gross" => Ok(Mode::Gross),
        "both" => Ok(Mode::Both),
        _ => Err(ArgumentsError::UnknownMode),
    }
}

pub fn parse_track(flag: &str) -> Result<Track, ArgumentsError> {
    match flag {
        "net" => Ok(Track::Net),
        "gross" => Ok(Track::Gross),
        _ => Err(ArgumentsError::UnknownTrack),
    }
}

/// Log to stderr, filtered by `RUST_LOG`. Stdout is kept for reports.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "golf_points=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{parse_category, parse_mode, parse_track, ArgumentsError};
    use crate::{Category, Mode, Track};

    #[rstest]
    #[case("major", Ok(Category::Major))]
    #[case("Tour", Ok(Category::Tour))]
    #[case("supr", Ok(Category::Supr))]
    #[case("open", Err(ArgumentsError::UnknownCategory))]
    fn category_flag(#[case] flag: &str, #[case] expected: Result<Category, ArgumentsError>) {
        assert_eq!(parse_category(flag), expected);
    }

    #[rstest]
    #[case("net", Ok(Mode::Net))]
    #[case("gross", Ok(Mode::Gross))]
    #[case("both", Ok(Mode::Both))]
    #[case("all", Err(ArgumentsError::UnknownMode))]
    fn mode_flag(#[case] flag: &str, #[case] expected: Result<Mode, ArgumentsError>) {
        assert_eq!(parse_mode(flag), expected);
    }

    #[test]
    fn track_flag() {
        assert_eq!(parse_track("gross"), Ok(Track::Gross));
        assert_eq!(parse_track("both"), Err(ArgumentsError::UnknownTrack));
    }
}

//! [`GameSource`] for the Lichess game export API.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use oxicoach_board::{PgnGame, split_games};
use oxicoach_tactics::game::{Game, GameSource, GameSourceError};
use reqwest::{StatusCode, blocking::Client, header::ACCEPT};

const PLATFORM: &str = "lichess";

#[derive(Debug, Clone, clap::Args)]
pub struct LichessArg {
    /// Base URL of the Lichess API
    #[arg(long = "lichess-url", default_value = "https://lichess.org")]
    pub base_url: String,
    /// Request timeout in seconds
    #[arg(long = "lichess-timeout", default_value_t = 30)]
    pub timeout_secs: u64,
}

pub struct LichessClient {
    client: Client,
    base_url: String,
}

impl LichessClient {
    pub fn new(arg: &LichessArg) -> Result<Self, GameSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(arg.timeout_secs))
            .build()
            .map_err(|e| GameSourceError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: arg.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

impl GameSource for LichessClient {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn fetch_games(&mut self, username: &str, limit: usize) -> Result<Vec<Game>, GameSourceError> {
        let url = format!("{}/api/games/user/{username}", self.base_url);
        let transport = |e: reqwest::Error| GameSourceError::Transport {
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/x-chess-pgn")
            .query(&[
                ("max", limit.to_string()),
                ("opening", "true".to_owned()),
                ("clocks", "false".to_owned()),
            ])
            .send()
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GameSourceError::UserNotFound {
                username: username.to_owned(),
                platform: PLATFORM.to_owned(),
            });
        }
        let body = response
            .error_for_status()
            .map_err(transport)?
            .text()
            .map_err(transport)?;

        let games = parse_export(&body, Utc::now());
        tracing::debug!(username, games = games.len(), "lichess export parsed");
        Ok(games)
    }
}

/// Splits a PGN export into games. Games without a `UTCDate`/`UTCTime` pair are
/// stamped with `fetched_at`.
fn parse_export(text: &str, fetched_at: DateTime<Utc>) -> Vec<Game> {
    split_games(text)
        .into_iter()
        .map(|chunk| {
            let pgn = PgnGame::parse(&chunk);
            let site = pgn.header("Site").unwrap_or_default();
            let game_id = match site.rsplit_once('/') {
                Some((_, id)) => id.to_owned(),
                None if site.is_empty() => "unknown".to_owned(),
                None => site.to_owned(),
            };
            let played_at = pgn
                .header("UTCDate")
                .zip(pgn.header("UTCTime"))
                .and_then(|(date, time)| {
                    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y.%m.%d %H:%M:%S").ok()
                })
                .map_or(fetched_at, |at| at.and_utc());
            let header_or = |name: &str, fallback: &str| pgn.header(name).unwrap_or(fallback).to_owned();
            Game {
                platform: PLATFORM.to_owned(),
                game_id,
                played_at,
                white: header_or("White", "white"),
                black: header_or("Black", "black"),
                result: header_or("Result", "*"),
                opening: pgn.header("Opening").map(str::to_owned),
                time_control: pgn
                    .header("TimeControl")
                    .filter(|&tc| tc != "-")
                    .map(str::to_owned),
                move_text: chunk,
            }
        })
        .collect()
}

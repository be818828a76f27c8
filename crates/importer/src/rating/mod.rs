//! Rating engine adapter.
//!
//! Turns stored matches of one population into engine game records, drives the
//! engine to convergence and flattens its per-competitor series into rating
//! samples. Every call is a full recomputation; nothing is carried over from a
//! previous run.

pub mod whr;

use thiserror::Error;
use tracing::debug;

use storage::models::{Match, Outcome, Population, RatingSample};
use storage::services::ranking::day_index;

use crate::{ImporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Rating variance gained per day between two rated days, Elo².
    pub w2: f64,
}

/// Game result in the engine's vocabulary. The first player of a game plays
/// black, the second white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameWinner {
    Black,
    White,
    Draw,
}

impl GameWinner {
    /// Side A is entered as black, so A's win is a black win.
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => Self::Black,
            Outcome::Loss => Self::White,
            Outcome::Draw => Self::Draw,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Black => "B",
            Self::White => "W",
            Self::Draw => "D",
        }
    }

    /// Score of the black player.
    pub fn black_score(&self) -> f64 {
        match self {
            Self::Black => 1.0,
            Self::White => 0.0,
            Self::Draw => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub black: String,
    pub white: String,
    pub winner: GameWinner,
    pub day: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub day: i64,
    pub rating: f64,
    pub uncertainty: f64,
}

/// Rating history of one competitor, sorted by day.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSeries {
    pub competitor: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid game: {0}")]
    InvalidGame(String),

    #[error("rating of {competitor} diverged to {rating}")]
    Unstable { competitor: String, rating: f64 },

    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
}

/// Pairwise historical rating engine.
pub trait RatingEngine: Sized {
    fn with_config(config: EngineConfig) -> std::result::Result<Self, EngineError>;

    fn create_games(&mut self, games: Vec<GameRecord>) -> std::result::Result<(), EngineError>;

    fn iterate_until_converge(&mut self) -> std::result::Result<(), EngineError>;

    /// One series per competitor, strongest final rating first.
    fn ordered_ratings(&self) -> Vec<RatingSeries>;
}

/// Singles between two distinct competitors who both belong to `population`.
pub fn is_rateable(m: &Match, population: Population) -> bool {
    let gender = Some(population.gender());
    match (m.player_a, m.player_x) {
        (Some(a), Some(x)) => {
            !m.is_doubles()
                && a != x
                && m.gender_a.as_deref() == gender
                && m.gender_x.as_deref() == gender
        }
        _ => false,
    }
}

pub fn game_records(matches: &[Match], population: Population) -> Vec<GameRecord> {
    matches
        .iter()
        .filter(|m| is_rateable(m, population))
        .filter_map(|m| {
            Some(GameRecord {
                black: m.player_a?.to_string(),
                white: m.player_x?.to_string(),
                winner: GameWinner::from_outcome(m.outcome),
                day: day_index(m.end_date),
            })
        })
        .collect()
}

/// Full rating history of `population` over `matches`, sorted by competitor
/// and day. No eligible match yields no samples.
pub fn compute_ratings<E: RatingEngine>(
    matches: &[Match],
    population: Population,
    config: EngineConfig,
) -> Result<Vec<RatingSample>> {
    let games = game_records(matches, population);
    if games.is_empty() {
        debug!("No rateable {} matches", population);
        return Ok(Vec::new());
    }
    debug!("Rating {} {} games", games.len(), population);

    let mut engine = E::with_config(config)?;
    engine.create_games(games)?;
    engine.iterate_until_converge()?;

    let mut samples = flatten(engine.ordered_ratings())?;
    samples.sort_by_key(|s| (s.competitor_id, s.day));
    Ok(samples)
}

fn flatten(series: Vec<RatingSeries>) -> Result<Vec<RatingSample>> {
    let mut samples = Vec::new();
    for s in series {
        let competitor_id = s.competitor.parse::<i64>().map_err(|_| {
            ImporterError::DataIntegrityError(format!(
                "engine returned unknown competitor '{}'",
                s.competitor
            ))
        })?;
        samples.extend(s.points.into_iter().map(|p| RatingSample {
            competitor_id,
            day: p.day,
            rating: p.rating,
            error: p.uncertainty,
        }));
    }
    Ok(samples)
}

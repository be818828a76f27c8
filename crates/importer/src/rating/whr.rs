//! Whole-History Rating (Coulom, 2008).
//!
//! Each competitor's rating is a time series over the days they played,
//! linked by a Wiener process prior. Ratings are solved jointly per competitor
//! with Newton's method on the tridiagonal Hessian of the log-posterior, and
//! competitors are swept in turn until no rating moves.
//!
//! Internally ratings are natural (`r`, with `gamma = e^r`); they are reported
//! in Elo.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::LN_10;

use tracing::debug;

use super::{EngineConfig, EngineError, GameRecord, RatingEngine, RatingSeries, SeriesPoint};

const ELO_PER_NATURAL: f64 = 400.0 / LN_10;
const ITERATION_BATCH: usize = 10;
const MAX_ITERATIONS: usize = 10_000;
/// Largest rating change, in Elo, still considered converged.
const CONVERGENCE_EPSILON: f64 = 1e-3;
/// Natural ratings beyond this are treated as divergence.
const STABILITY_BOUND: f64 = 650.0;
/// Keeps the Hessian negative definite for competitors with a single day.
const HESSIAN_DAMPING: f64 = 0.001;

#[derive(Debug, Clone, Copy)]
struct Game {
    black: usize,
    white: usize,
    /// Index into each competitor's `days`.
    black_day: usize,
    white_day: usize,
    black_score: f64,
}

#[derive(Debug, Clone)]
struct PlayerDay {
    day: i64,
    r: f64,
    variance: f64,
    games: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Player {
    name: String,
    days: Vec<PlayerDay>,
}

#[derive(Debug, Clone)]
pub struct WholeHistoryRating {
    /// Prior variance per day, natural units.
    w2: f64,
    players: Vec<Player>,
    index: HashMap<String, usize>,
    records: Vec<GameRecord>,
    games: Vec<Game>,
}

impl WholeHistoryRating {
    fn player_id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.players.len();
        self.players.push(Player {
            name: name.to_string(),
            days: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Rebuilds every competitor's day list from all recorded games.
    fn rebuild(&mut self) {
        let mut per_player: Vec<BTreeMap<i64, Vec<usize>>> =
            vec![BTreeMap::new(); self.players.len()];
        let mut pending = Vec::with_capacity(self.records.len());

        for (game_id, record) in self.records.iter().enumerate() {
            let black = self.index[&record.black];
            let white = self.index[&record.white];
            per_player[black].entry(record.day).or_default().push(game_id);
            per_player[white].entry(record.day).or_default().push(game_id);
            pending.push((black, white, record.day, record.winner.black_score()));
        }

        for (player, days) in self.players.iter_mut().zip(per_player) {
            player.days = days
                .into_iter()
                .map(|(day, games)| PlayerDay {
                    day,
                    r: 0.0,
                    variance: 0.0,
                    games,
                })
                .collect();
        }

        let day_slot = |player: &Player, day: i64| {
            player
                .days
                .binary_search_by_key(&day, |d| d.day)
                .unwrap_or_default()
        };
        self.games = pending
            .into_iter()
            .map(|(black, white, day, black_score)| Game {
                black,
                white,
                black_day: day_slot(&self.players[black], day),
                white_day: day_slot(&self.players[white], day),
                black_score,
            })
            .collect();
    }

    fn opponent_gamma(&self, game: &Game, player: usize) -> (f64, f64) {
        if game.black == player {
            let r = self.players[game.white].days[game.white_day].r;
            (r.exp(), game.black_score)
        } else {
            let r = self.players[game.black].days[game.black_day].r;
            (r.exp(), 1.0 - game.black_score)
        }
    }

    /// Gradient and Hessian (diagonal, off-diagonal) of the log-posterior.
    fn derivatives(&self, player: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let days = &self.players[player].days;
        let n = days.len();
        let mut gradient = vec![0.0; n];
        let mut diagonal = vec![0.0; n];
        let mut off = vec![0.0; n.saturating_sub(1)];

        for (i, day) in days.iter().enumerate() {
            let gamma = day.r.exp();
            let mut d1 = 0.0;
            let mut d2 = 0.0;
            for &game_id in &day.games {
                let (opponent, score) = self.opponent_gamma(&self.games[game_id], player);
                d1 += score - gamma / (gamma + opponent);
                d2 -= gamma * opponent / (gamma + opponent).powi(2);
            }
            if i == 0 {
                // One virtual win and one virtual loss against a zero-rated opponent.
                d1 += 1.0 - 2.0 * gamma / (gamma + 1.0);
                d2 -= 2.0 * gamma / (gamma + 1.0).powi(2);
            }
            gradient[i] = d1;
            diagonal[i] = d2 - HESSIAN_DAMPING;
        }

        for i in 0..n.saturating_sub(1) {
            let sigma2 = self.w2 * (days[i + 1].day - days[i].day).abs() as f64;
            let precision = 1.0 / sigma2;
            gradient[i] -= (days[i].r - days[i + 1].r) * precision;
            gradient[i + 1] -= (days[i + 1].r - days[i].r) * precision;
            diagonal[i] -= precision;
            diagonal[i + 1] -= precision;
            off[i] = precision;
        }

        (gradient, diagonal, off)
    }

    /// One Newton step over all of a competitor's days. Returns the largest
    /// change in natural units.
    fn update_player(&mut self, player: usize) -> f64 {
        let (gradient, h, off) = self.derivatives(player);
        let n = h.len();

        let mut d = vec![0.0; n];
        let mut y = vec![0.0; n];
        d[0] = h[0];
        y[0] = gradient[0];
        for i in 1..n {
            let a = off[i - 1] / d[i - 1];
            d[i] = h[i] - a * off[i - 1];
            y[i] = gradient[i] - a * y[i - 1];
        }

        let mut x = vec![0.0; n];
        x[n - 1] = y[n - 1] / d[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = (y[i] - off[i] * x[i + 1]) / d[i];
        }

        let days = &mut self.players[player].days;
        let mut largest: f64 = 0.0;
        for (day, step) in days.iter_mut().zip(&x) {
            day.r -= step;
            largest = largest.max(step.abs());
        }
        largest
    }

    /// Diagonal of the posterior covariance, i.e. minus the inverse Hessian.
    fn update_variance(&mut self, player: usize) {
        let (_, h, off) = self.derivatives(player);
        let n = h.len();

        let mut d = vec![0.0; n];
        d[0] = h[0];
        for i in 1..n {
            d[i] = h[i] - off[i - 1] / d[i - 1] * off[i - 1];
        }

        let mut dp = vec![0.0; n];
        dp[n - 1] = h[n - 1];
        for i in (0..n - 1).rev() {
            dp[i] = h[i] - off[i] / dp[i + 1] * off[i];
        }

        let days = &mut self.players[player].days;
        for i in 0..n {
            days[i].variance = if i + 1 < n {
                dp[i + 1] / (off[i] * off[i] - d[i] * dp[i + 1])
            } else {
                -1.0 / d[i]
            };
        }
    }

    fn iterate(&mut self) -> Result<f64, EngineError> {
        let mut largest: f64 = 0.0;
        for player in 0..self.players.len() {
            largest = largest.max(self.update_player(player));
            for day in &self.players[player].days {
                if day.r.is_nan() || day.r.abs() > STABILITY_BOUND {
                    return Err(EngineError::Unstable {
                        competitor: self.players[player].name.clone(),
                        rating: day.r * ELO_PER_NATURAL,
                    });
                }
            }
        }
        Ok(largest)
    }
}

impl RatingEngine for WholeHistoryRating {
    fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        if !config.w2.is_finite() || config.w2 <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "w2 must be positive, got {}",
                config.w2
            )));
        }

        Ok(Self {
            w2: config.w2 / (ELO_PER_NATURAL * ELO_PER_NATURAL),
            players: Vec::new(),
            index: HashMap::new(),
            records: Vec::new(),
            games: Vec::new(),
        })
    }

    fn create_games(&mut self, games: Vec<GameRecord>) -> Result<(), EngineError> {
        for game in games {
            if game.black == game.white {
                return Err(EngineError::InvalidGame(format!(
                    "{} cannot play against themselves",
                    game.black
                )));
            }
            self.player_id(&game.black);
            self.player_id(&game.white);
            self.records.push(game);
        }
        self.rebuild();
        Ok(())
    }

    fn iterate_until_converge(&mut self) -> Result<(), EngineError> {
        let mut iterations = 0;
        loop {
            let mut largest = self.iterate()?;
            for _ in 1..ITERATION_BATCH {
                largest = self.iterate()?;
            }
            iterations += ITERATION_BATCH;

            if largest * ELO_PER_NATURAL < CONVERGENCE_EPSILON {
                debug!("Converged after {} iterations", iterations);
                break;
            }
            if iterations >= MAX_ITERATIONS {
                return Err(EngineError::NotConverged { iterations });
            }
        }

        for player in 0..self.players.len() {
            self.update_variance(player);
        }
        Ok(())
    }

    fn ordered_ratings(&self) -> Vec<RatingSeries> {
        let mut series: Vec<RatingSeries> = self
            .players
            .iter()
            .filter(|p| !p.days.is_empty())
            .map(|p| RatingSeries {
                competitor: p.name.clone(),
                points: p
                    .days
                    .iter()
                    .map(|d| SeriesPoint {
                        day: d.day,
                        rating: d.r * ELO_PER_NATURAL,
                        uncertainty: d.variance.max(0.0).sqrt() * ELO_PER_NATURAL,
                    })
                    .collect(),
            })
            .collect();

        let last_rating = |s: &RatingSeries| s.points.last().map_or(0.0, |p| p.rating);
        series.sort_by(|a, b| {
            last_rating(b)
                .total_cmp(&last_rating(a))
                .then_with(|| a.competitor.cmp(&b.competitor))
        });
        series
    }
}

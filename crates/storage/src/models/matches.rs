use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of a match from side A's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn from_scores(score_a: i64, score_x: i64) -> Self {
        match score_a.cmp(&score_x) {
            std::cmp::Ordering::Greater => Self::Win,
            std::cmp::Ordering::Less => Self::Loss,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Win => "W",
            Self::Loss => "L",
            Self::Draw => "D",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "W" => Some(Self::Win),
            "L" => Some(Self::Loss),
            "D" => Some(Self::Draw),
            _ => None,
        }
    }
}

/// A stored match. Side A is `player_a` (+ `player_b` in doubles), side X is
/// `player_x` (+ `player_y`). Gender tags are filled in by enrichment and stay
/// `None` for competitors whose profile is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Match {
    pub match_id: i64,
    pub event_id: i64,
    pub end_date: NaiveDate,
    pub player_a: Option<i64>,
    pub player_b: Option<i64>,
    pub player_x: Option<i64>,
    pub player_y: Option<i64>,
    pub result: String,
    pub score_a: i64,
    pub score_x: i64,
    pub outcome: Outcome,
    pub gender_a: Option<String>,
    pub gender_b: Option<String>,
    pub gender_x: Option<String>,
    pub gender_y: Option<String>,
}

impl Match {
    pub fn is_doubles(&self) -> bool {
        self.player_b.is_some() || self.player_y.is_some()
    }

    /// Every competitor referenced by the four slots.
    pub fn competitor_ids(&self) -> impl Iterator<Item = i64> {
        [self.player_a, self.player_b, self.player_x, self.player_y]
            .into_iter()
            .flatten()
    }
}

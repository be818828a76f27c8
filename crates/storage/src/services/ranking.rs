//! Point-in-time leaderboard from a population's rating history.
//!
//! Only each competitor's latest sample inside the trailing window counts.
//! Its uncertainty is inflated by the days elapsed since that sample, so
//! inactive competitors show a lower conservative score. Order is by raw
//! rating, though.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::dto::competitor::CompetitorProfile;
use crate::dto::ranking::RankingEntry;
use crate::models::RatingSample;

/// Samples older than this many days before the reference day are ignored.
pub const RANKING_WINDOW_DAYS: i64 = 365;

/// Default uncertainty growth per day of inactivity, Elo².
pub const MEN_UNCERTAINTY_GROWTH: f64 = 17.4;
pub const WOMEN_UNCERTAINTY_GROWTH: f64 = 14.4;

/// Day zero of every day index. All historical match dates fall after it.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1988, 10, 1).expect("epoch is a valid calendar date")
}

pub fn day_index(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

pub fn date_for_day(day: i64) -> NaiveDate {
    epoch() + Duration::days(day)
}

/// `sqrt(error^2 + growth * days_since)`
pub fn decayed_error(error: f64, uncertainty_growth: f64, days_since: i64) -> f64 {
    (error.powi(2) + uncertainty_growth * days_since as f64).sqrt()
}

pub fn round_dp2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ranked competitor before display attributes are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub rank: i64,
    pub competitor_id: i64,
    /// Day of the sample the standing is based on.
    pub day: i64,
    pub rating: f64,
    pub decayed_error: f64,
}

impl Standing {
    pub fn adjusted_rating(&self) -> f64 {
        self.rating - self.decayed_error
    }
}

/// Ordered standings as of `reference_day`.
///
/// Ties in rating keep ascending competitor id order.
pub fn standings(
    samples: &[RatingSample],
    reference_day: i64,
    uncertainty_growth: f64,
) -> Vec<Standing> {
    let window_start = reference_day - RANKING_WINDOW_DAYS;

    let mut latest: BTreeMap<i64, RatingSample> = BTreeMap::new();
    for sample in samples
        .iter()
        .filter(|s| s.day > window_start && s.day <= reference_day)
    {
        latest
            .entry(sample.competitor_id)
            .and_modify(|current| {
                if sample.day >= current.day {
                    *current = *sample;
                }
            })
            .or_insert(*sample);
    }

    let mut ordered: Vec<RatingSample> = latest.into_values().collect();
    ordered.sort_by(|a, b| b.rating.total_cmp(&a.rating));

    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, sample)| Standing {
            rank: idx as i64 + 1,
            competitor_id: sample.competitor_id,
            day: sample.day,
            rating: sample.rating,
            decayed_error: decayed_error(
                sample.error,
                uncertainty_growth,
                reference_day - sample.day,
            ),
        })
        .collect()
}

/// Full leaderboard with display attributes.
///
/// Missing localized names fall back to the plain name, missing localized
/// associations to an empty string.
pub fn rank(
    samples: &[RatingSample],
    profiles: &HashMap<i64, CompetitorProfile>,
    reference_day: i64,
    uncertainty_growth: f64,
) -> Vec<RankingEntry> {
    standings(samples, reference_day, uncertainty_growth)
        .into_iter()
        .map(|standing| to_entry(&standing, profiles.get(&standing.competitor_id)))
        .collect()
}

fn to_entry(standing: &Standing, profile: Option<&CompetitorProfile>) -> RankingEntry {
    let name = profile.map(|p| p.name.clone()).unwrap_or_default();
    let name_zh = profile
        .and_then(|p| p.name_localized.clone())
        .unwrap_or_else(|| name.clone());

    RankingEntry {
        rank: standing.rank,
        id: standing.competitor_id,
        name,
        name_zh,
        yob: profile.and_then(|p| p.birth_year),
        association: profile
            .map(|p| p.association_code.clone())
            .unwrap_or_default(),
        association_zh: profile
            .and_then(|p| p.association_localized.clone())
            .unwrap_or_default(),
        rating: round_dp2(standing.rating),
        error: standing.decayed_error,
        adjusted_rating: round_dp2(standing.adjusted_rating()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(competitor_id: i64, day: i64, rating: f64, error: f64) -> RatingSample {
        RatingSample {
            competitor_id,
            day,
            rating,
            error,
        }
    }

    fn profile(competitor_id: i64, name: &str) -> CompetitorProfile {
        CompetitorProfile {
            competitor_id,
            name: name.to_string(),
            name_localized: None,
            gender: "M".to_string(),
            birth_year: Some(1990),
            association: "China".to_string(),
            association_code: "CHN".to_string(),
            association_localized: None,
        }
    }

    #[test]
    fn test_day_index_roundtrip_through_epoch() {
        assert_eq!(day_index(epoch()), 0);
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(date_for_day(day_index(date)), date);
    }

    #[test]
    fn test_standings_sorted_by_raw_rating_with_dense_ranks() {
        let samples = vec![
            sample(1, 10, 100.0, 50.0),
            sample(2, 10, 300.0, 200.0),
            sample(3, 10, 200.0, 10.0),
            sample(4, 10, -50.0, 10.0),
        ];

        let result = standings(&samples, 10, 17.4);

        let ids: Vec<i64> = result.iter().map(|s| s.competitor_id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
        let ranks: Vec<i64> = result.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        // Competitor 3 has the best adjusted rating but still ranks below 2.
        assert!(result[1].adjusted_rating() > result[0].adjusted_rating());
    }

    #[test]
    fn test_standings_use_latest_sample_in_window() {
        let samples = vec![
            sample(1, 100, 50.0, 20.0),
            sample(1, 300, 80.0, 15.0),
            sample(1, 200, 999.0, 15.0),
        ];

        let result = standings(&samples, 300, 10.0);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].day, 300);
        assert_eq!(result[0].rating, 80.0);
    }

    #[test]
    fn test_window_excludes_old_samples() {
        let reference_day = 1000;
        let samples = vec![
            sample(1, reference_day - RANKING_WINDOW_DAYS - 1, 500.0, 10.0),
            sample(2, reference_day - 10, 100.0, 10.0),
            sample(3, reference_day + 5, 900.0, 10.0),
        ];

        let result = standings(&samples, reference_day, 10.0);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].competitor_id, 2);
    }

    #[test]
    fn test_decay_grows_with_inactivity() {
        let samples = vec![sample(1, 100, 250.0, 30.0)];

        let mut previous_error = 0.0;
        let mut previous_adjusted = f64::INFINITY;
        for reference_day in [100, 101, 150, 300, 464] {
            let standing = &standings(&samples, reference_day, 17.4)[0];
            assert!(standing.decayed_error >= previous_error);
            assert!(standing.adjusted_rating() <= previous_adjusted);
            previous_error = standing.decayed_error;
            previous_adjusted = standing.adjusted_rating();
        }
    }

    #[test]
    fn test_decayed_error_formula() {
        assert_eq!(decayed_error(30.0, 17.4, 0), 30.0);
        let expected = (30.0f64.powi(2) + 14.4 * 50.0).sqrt();
        assert!((decayed_error(30.0, 14.4, 50) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rank_joins_display_fields_with_fallbacks() {
        let samples = vec![sample(1, 30, 123.456, 40.0), sample(2, 30, -10.0, 40.0)];
        let mut profiles = HashMap::new();
        let mut localized = profile(1, "MA Long");
        localized.name_localized = Some("马龙".to_string());
        localized.association_localized = Some("中国".to_string());
        profiles.insert(1, localized);
        profiles.insert(2, profile(2, "FAN Zhendong"));

        let entries = rank(&samples, &profiles, 30, 17.4);

        assert_eq!(entries[0].name_zh, "马龙");
        assert_eq!(entries[0].association_zh, "中国");
        assert_eq!(entries[0].association, "CHN");
        assert_eq!(entries[0].rating, 123.46);
        assert_eq!(entries[0].error, 40.0);
        assert_eq!(entries[0].adjusted_rating, 83.46);
        assert_eq!(entries[1].name_zh, "FAN Zhendong");
        assert_eq!(entries[1].association_zh, "");
    }

    #[test]
    fn test_rank_empty_samples_yields_empty_leaderboard() {
        assert!(rank(&[], &HashMap::new(), 500, 17.4).is_empty());
    }
}

//! Attaches competitor genders to matches.
//!
//! A left join of each of the four slots against the competitor table by id.
//! Unknown competitors leave the slot's gender empty, which keeps the match
//! out of every population.

use std::collections::HashMap;

use storage::models::{Competitor, Match};

pub fn enrich(matches: Vec<Match>, competitors: &[Competitor]) -> Vec<Match> {
    let genders: HashMap<i64, &str> = competitors
        .iter()
        .map(|c| (c.competitor_id, c.gender.as_str()))
        .collect();
    let gender_of =
        |slot: Option<i64>| slot.and_then(|id| genders.get(&id).map(|g| g.to_string()));

    matches
        .into_iter()
        .map(|m| Match {
            gender_a: gender_of(m.player_a),
            gender_b: gender_of(m.player_b),
            gender_x: gender_of(m.player_x),
            gender_y: gender_of(m.player_y),
            ..m
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storage::models::Outcome;

    fn competitor(competitor_id: i64, gender: &str) -> Competitor {
        Competitor {
            competitor_id,
            name: format!("Player {}", competitor_id),
            gender: gender.to_string(),
            birth_year: None,
            association: "Germany".to_string(),
            association_code: "GER".to_string(),
        }
    }

    fn doubles_match() -> Match {
        Match {
            match_id: 1,
            event_id: 10,
            end_date: NaiveDate::from_ymd_opt(2025, 2, 2).unwrap(),
            player_a: Some(1),
            player_b: Some(2),
            player_x: Some(3),
            player_y: Some(4),
            result: "3 - 2".to_string(),
            score_a: 3,
            score_x: 2,
            outcome: Outcome::Win,
            gender_a: None,
            gender_b: None,
            gender_x: None,
            gender_y: None,
        }
    }

    #[test]
    fn test_enrich_tags_every_slot() {
        let competitors = vec![
            competitor(1, "M"),
            competitor(2, "W"),
            competitor(3, "M"),
            competitor(4, "W"),
        ];

        let enriched = enrich(vec![doubles_match()], &competitors);

        assert_eq!(enriched[0].gender_a.as_deref(), Some("M"));
        assert_eq!(enriched[0].gender_b.as_deref(), Some("W"));
        assert_eq!(enriched[0].gender_x.as_deref(), Some("M"));
        assert_eq!(enriched[0].gender_y.as_deref(), Some("W"));
    }

    #[test]
    fn test_enrich_leaves_unknown_and_absent_slots_empty() {
        let mut singles = doubles_match();
        singles.player_b = None;
        singles.player_y = None;

        let enriched = enrich(vec![singles.clone()], &[competitor(1, "M")]);

        assert_eq!(enriched[0].gender_a.as_deref(), Some("M"));
        assert_eq!(enriched[0].gender_x, None);
        assert_eq!(enriched[0].gender_b, None);
        // Nothing else changes.
        assert_eq!(enriched[0].match_id, singles.match_id);
        assert_eq!(enriched[0].outcome, singles.outcome);
    }
}

//! Row shapes of the feed's JSON listings.
//!
//! Every listing endpoint answers with an array of row groups; only the first
//! group carries data. Integer columns arrive either as numbers or as strings.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

use crate::{ImporterError, Result};

/// Unwraps the `[[row, ...]]` envelope.
pub fn first_group<T>(groups: Vec<Vec<T>>) -> Result<Vec<T>> {
    groups
        .into_iter()
        .next()
        .ok_or_else(|| ImporterError::FeedFormatError("listing has no row group".to_string()))
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventRow {
    #[serde(rename = "vw_tournaments___tournament_id_raw", deserialize_with = "required_i64")]
    pub tournament_id: i64,
    #[serde(rename = "vw_tournaments___tour_end_raw")]
    pub tour_end: String,
    /// Match count wrapped in a link, e.g. `<a href="...">128</a>`.
    #[serde(rename = "vw_tournaments___matches")]
    pub matches: Value,
}

/// An event as announced by the feed listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventListing {
    pub event_id: i64,
    pub end_date: NaiveDate,
    pub match_count: u32,
}

impl TryFrom<EventRow> for EventListing {
    type Error = ImporterError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            event_id: row.tournament_id,
            end_date: parse_feed_date(&row.tour_end)?,
            match_count: parse_match_count(&row.matches)?,
        })
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    #[serde(rename = "vw_matches___id_raw", deserialize_with = "required_i64")]
    pub match_id: i64,
    #[serde(
        rename = "vw_matches___tournament_id_raw",
        default,
        deserialize_with = "lenient_id"
    )]
    pub event_id: Option<i64>,
    #[serde(rename = "vw_matches___player_a_id_raw", default, deserialize_with = "lenient_id")]
    pub player_a: Option<i64>,
    #[serde(rename = "vw_matches___player_b_id_raw", default, deserialize_with = "lenient_id")]
    pub player_b: Option<i64>,
    #[serde(rename = "vw_matches___player_x_id_raw", default, deserialize_with = "lenient_id")]
    pub player_x: Option<i64>,
    #[serde(rename = "vw_matches___player_y_id_raw", default, deserialize_with = "lenient_id")]
    pub player_y: Option<i64>,
    /// Raw score, "A - X".
    #[serde(rename = "vw_matches___res_raw")]
    pub result: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    #[serde(rename = "vw_profiles___player_id_raw", deserialize_with = "required_i64")]
    pub competitor_id: i64,
    /// Display name with the association code in parentheses.
    #[serde(rename = "vw_profiles___player_id")]
    pub name: String,
    #[serde(rename = "vw_profiles___gender_raw")]
    pub gender: String,
    /// Free-text block, see [`super::ProfileFormat`].
    #[serde(rename = "vw_profiles___profile")]
    pub profile: String,
}

/// Dates come as `YYYY-MM-DD`, optionally followed by a time.
pub fn parse_feed_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
        ImporterError::DataIntegrityError(format!("invalid event date '{}': {}", raw, e))
    })
}

/// Reads the count out of `<a ...>N</a>`; a bare number is accepted as is.
pub fn parse_match_count(value: &Value) -> Result<u32> {
    let text = match value {
        Value::Number(n) => {
            return n
                .as_u64()
                .and_then(|count| u32::try_from(count).ok())
                .ok_or_else(|| {
                    ImporterError::DataIntegrityError(format!("invalid match count {}", n))
                });
        }
        Value::String(s) => s.as_str(),
        other => {
            return Err(ImporterError::FeedFormatError(format!(
                "unexpected match count value {}",
                other
            )));
        }
    };

    let inner = match text.split_once('>') {
        Some((_, rest)) => rest.split('<').next().unwrap_or(rest),
        None => text,
    };

    inner.trim().parse::<u32>().map_err(|e| {
        ImporterError::DataIntegrityError(format!("invalid match count '{}': {}", text, e))
    })
}

/// `f` as an integer, if it is one and fits in `i64`.
fn whole_number(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn integer_from_value(value: Value) -> std::result::Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_number))
            .map(Some)
            .ok_or_else(|| format!("invalid integer {}", n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|e| format!("invalid integer '{}': {}", s, e))
        }
        other => Err(format!("expected integer, found {}", other)),
    }
}

/// Competitor slot ids: empty, null and zero all mean "no competitor".
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let id = integer_from_value(value).map_err(de::Error::custom)?;
    Ok(id.filter(|id| *id > 0))
}

fn required_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    integer_from_value(value)
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("missing required integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_row_with_markup_count() {
        let groups: Vec<Vec<EventRow>> = serde_json::from_value(json!([[{
            "vw_tournaments___tournament_id_raw": "3012",
            "vw_tournaments___tour_end_raw": "2025-03-09 00:00:00",
            "vw_tournaments___matches": "<a href=\"/index.php/matches?t=3012\">417</a>",
            "vw_tournaments___name": "WTT Champions"
        }]]))
        .unwrap();

        let listing = EventListing::try_from(first_group(groups).unwrap().remove(0)).unwrap();

        assert_eq!(listing.event_id, 3012);
        assert_eq!(listing.end_date, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(listing.match_count, 417);
    }

    #[test]
    fn test_match_count_forms() {
        assert_eq!(parse_match_count(&json!(12)).unwrap(), 12);
        assert_eq!(parse_match_count(&json!(" 7 ")).unwrap(), 7);
        assert!(parse_match_count(&json!("<a>n/a</a>")).is_err());
        assert!(parse_match_count(&json!(null)).is_err());
    }

    #[test]
    fn test_out_of_range_match_count_is_rejected() {
        let too_many = u64::from(u32::MAX) + 1;
        assert!(matches!(
            parse_match_count(&json!(too_many)),
            Err(ImporterError::DataIntegrityError(_))
        ));
        assert!(parse_match_count(&json!(-3)).is_err());
    }

    #[test]
    fn test_fractional_id_is_rejected() {
        let record: MatchRecord = serde_json::from_value(json!({
            "vw_matches___id_raw": 12.0,
            "vw_matches___res_raw": "3 - 1"
        }))
        .unwrap();
        assert_eq!(record.match_id, 12);

        let result = serde_json::from_value::<MatchRecord>(json!({
            "vw_matches___id_raw": 12.5,
            "vw_matches___res_raw": "3 - 1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_match_record_absent_slots() {
        let record: MatchRecord = serde_json::from_value(json!({
            "vw_matches___id_raw": 99001,
            "vw_matches___tournament_id_raw": "3012",
            "vw_matches___player_a_id_raw": "101",
            "vw_matches___player_b_id_raw": "",
            "vw_matches___player_x_id_raw": 202,
            "vw_matches___player_y_id_raw": null,
            "vw_matches___res_raw": "3 - 1"
        }))
        .unwrap();

        assert_eq!(record.player_a, Some(101));
        assert_eq!(record.player_b, None);
        assert_eq!(record.player_x, Some(202));
        assert_eq!(record.player_y, None);
        assert_eq!(record.event_id, Some(3012));
    }

    #[test]
    fn test_zero_competitor_id_is_absent() {
        let record: MatchRecord = serde_json::from_value(json!({
            "vw_matches___id_raw": "5",
            "vw_matches___player_a_id_raw": "0",
            "vw_matches___res_raw": "0 - 0"
        }))
        .unwrap();

        assert_eq!(record.player_a, None);
        assert_eq!(record.event_id, None);
    }

    #[test]
    fn test_missing_match_id_is_rejected() {
        let result = serde_json::from_value::<MatchRecord>(json!({
            "vw_matches___id_raw": "",
            "vw_matches___res_raw": "3 - 1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_envelope_is_feed_format_error() {
        let groups: Vec<Vec<MatchRecord>> = Vec::new();
        assert!(matches!(
            first_group(groups),
            Err(ImporterError::FeedFormatError(_))
        ));
    }

    #[test]
    fn test_feed_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(parse_feed_date("2024-12-01").unwrap(), expected);
        assert_eq!(parse_feed_date("2024-12-01 00:00:00").unwrap(), expected);
        assert!(parse_feed_date("01/12/2024").is_err());
    }
}

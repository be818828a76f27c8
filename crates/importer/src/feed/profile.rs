//! Parsing of the feed's competitor profile text.
//!
//! The profile block is position-indexed markup, so its layout is pinned to a
//! format version. A layout change upstream means a new variant here, not an
//! edit to the existing one.

use crate::{ImporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// `<br/>`-separated `Label: value` lines; association on line 1, year of
    /// birth on line 3.
    V1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub association: String,
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    pub name: String,
    pub association_code: String,
}

const V1_SEPARATOR: &str = "<br/>";
const V1_ASSOCIATION_LINE: usize = 1;
const V1_BIRTH_YEAR_LINE: usize = 3;

impl ProfileFormat {
    pub const CURRENT: ProfileFormat = ProfileFormat::V1;

    pub fn parse_profile(&self, text: &str) -> Result<ProfileFields> {
        match self {
            Self::V1 => {
                let lines: Vec<&str> = text.split(V1_SEPARATOR).collect();
                let association = labelled_value(&lines, V1_ASSOCIATION_LINE)?;
                let birth_year = labelled_value(&lines, V1_BIRTH_YEAR_LINE)?;

                Ok(ProfileFields {
                    association: association.to_string(),
                    birth_year: parse_birth_year(birth_year)?,
                })
            }
        }
    }

    /// Splits `"NAME Given (CODE)"` into name and association code.
    pub fn parse_display_name(&self, raw: &str) -> Result<DisplayName> {
        match self {
            Self::V1 => {
                let mut parts = raw.split('(');
                let name = parts.next().unwrap_or_default().trim_matches(' ');
                let code = parts.next().ok_or_else(|| {
                    ImporterError::DataIntegrityError(format!(
                        "display name '{}' has no association code",
                        raw
                    ))
                })?;

                Ok(DisplayName {
                    name: name.to_string(),
                    association_code: code.trim_end_matches(')').to_string(),
                })
            }
        }
    }
}

fn labelled_value<'t>(lines: &[&'t str], index: usize) -> Result<&'t str> {
    lines
        .get(index)
        .and_then(|line| line.split(": ").nth(1))
        .ok_or_else(|| {
            ImporterError::DataIntegrityError(format!(
                "profile line {} missing or without 'Label: value'",
                index
            ))
        })
}

fn parse_birth_year(raw: &str) -> Result<Option<i32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<i32>().map(Some).map_err(|e| {
        ImporterError::DataIntegrityError(format!("invalid year of birth '{}': {}", raw, e))
    })
}

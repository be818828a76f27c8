use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Gender-partitioned competitor pool, rated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Population {
    Men,
    Women,
}

impl Population {
    pub const ALL: [Population; 2] = [Population::Men, Population::Women];

    /// Gender tag carried by competitors of this population.
    pub fn gender(&self) -> &'static str {
        match self {
            Self::Men => "M",
            Self::Women => "W",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Men => "men",
            Self::Women => "women",
        }
    }

    pub fn from_gender(gender: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.gender() == gender)
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Population {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "men" | "m" => Ok(Self::Men),
            "women" | "w" => Ok(Self::Women),
            _ => Err(format!("Unknown population '{}'", s)),
        }
    }
}

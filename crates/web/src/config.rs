use anyhow::{Context, Result};
use storage::services::ranking::{MEN_UNCERTAINTY_GROWTH, WOMEN_UNCERTAINTY_GROWTH};

use crate::state::UncertaintyGrowth;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub growth: UncertaintyGrowth,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("PORT must be a number")?
                .parse()?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            growth: UncertaintyGrowth {
                men: optional_f64("MEN_W2", MEN_UNCERTAINTY_GROWTH)?,
                women: optional_f64("WOMEN_W2", WOMEN_UNCERTAINTY_GROWTH)?,
            },
        })
    }
}

fn optional_f64(name: &str, default: f64) -> Result<f64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a number", name)),
        Err(_) => Ok(default),
    }
}

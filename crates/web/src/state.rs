use axum::extract::FromRef;
use storage::Database;
use storage::models::Population;
use storage::services::ranking::{MEN_UNCERTAINTY_GROWTH, WOMEN_UNCERTAINTY_GROWTH};

/// Daily uncertainty growth per population, the same values the importer
/// publishes with.
#[derive(Debug, Clone, Copy)]
pub struct UncertaintyGrowth {
    pub men: f64,
    pub women: f64,
}

impl UncertaintyGrowth {
    pub fn get(&self, population: Population) -> f64 {
        match population {
            Population::Men => self.men,
            Population::Women => self.women,
        }
    }
}

impl Default for UncertaintyGrowth {
    fn default() -> Self {
        Self {
            men: MEN_UNCERTAINTY_GROWTH,
            women: WOMEN_UNCERTAINTY_GROWTH,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub growth: UncertaintyGrowth,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for UncertaintyGrowth {
    fn from_ref(state: &AppState) -> Self {
        state.growth
    }
}

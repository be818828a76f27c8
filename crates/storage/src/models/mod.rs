pub mod checkpoint;
pub mod competitor;
pub mod event;
pub mod historical_rank;
pub mod matches;
pub mod population;
pub mod rating_sample;

pub use checkpoint::Checkpoint;
pub use competitor::Competitor;
pub use event::Event;
pub use historical_rank::HistoricalRank;
pub use matches::{Match, Outcome};
pub use population::Population;
pub use rating_sample::RatingSample;

pub mod config;
pub mod enrichment;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod publish;
pub mod rating;
pub mod snapshot;
pub mod sync;
pub mod traits;

pub use config::{FeedConfig, PipelineConfig};
pub use error::{FailureKind, ImporterError, Result};
pub use feed::ResultsFeedClient;
pub use pipeline::Pipeline;
pub use rating::{RatingEngine, whr::WholeHistoryRating};
pub use traits::FeedSource;

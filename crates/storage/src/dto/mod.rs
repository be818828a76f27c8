pub mod competitor;
pub mod ranking;
pub mod snapshot;

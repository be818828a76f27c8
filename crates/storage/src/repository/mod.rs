pub mod checkpoint;
pub mod competitor;
pub mod event;
pub mod matches;
pub mod rating;
pub mod snapshot;

/// Rows per multi-row INSERT, kept well under SQLite's bind-parameter limit.
pub(crate) const INSERT_CHUNK: usize = 500;

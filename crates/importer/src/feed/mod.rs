mod client;
mod models;
pub mod profile;

pub use client::{ResultsFeedClient, find_login_token};
pub use models::*;
pub use profile::{DisplayName, ProfileFields, ProfileFormat};

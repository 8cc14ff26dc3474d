pub mod client;
pub mod query;

pub use client::{AuthUser, RestValue, SupabaseClient, SupabaseError};
pub use query::Query;

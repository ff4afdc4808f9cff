pub mod repo;
pub mod repo_types;

pub use repo::{ActivityRepository, PgActivityRepository};
pub use repo_types::{ActivityAction, ActivitySummary, NewActivity};

pub mod conditions;
pub mod conversations;
pub mod db;
pub mod exclusion_methods;
pub mod messages;
pub mod models;
pub mod qdrant;
pub mod schema;
pub mod sympgan;
pub mod time_serde;
pub mod treatment_plans;

mod error;

pub use error::{Error, Result};

/// Offset/limit window for list queries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Page {
	pub skip: i64,
	pub limit: i64,
}

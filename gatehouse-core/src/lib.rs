//! gatehouse-core: shared infrastructure for the gatehouse client crates.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;

pub use error::{AppError, ErrorKind};
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use validator;

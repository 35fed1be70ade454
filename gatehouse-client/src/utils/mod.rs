pub mod crypto;
pub mod filter;
pub mod stats;
pub mod validation;

pub use filter::Filter;

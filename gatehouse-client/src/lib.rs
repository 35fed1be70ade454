//! Client library for a residential gate and visitor-access dashboard.
//!
//! Everything goes through one [`ContextSwitcher`](services::ContextSwitcher):
//! it decides whether requests reach the default backend or an external
//! VMS project backend.

pub mod config;
pub mod context;
pub mod models;
pub mod repositories;
pub mod services;
pub mod startup;
pub mod storage;
pub mod utils;

pub use context::{BackendContext, BackendMode, IdentityInfo, Principal};
pub use startup::Gatehouse;

//! Townhall - civic engagement service
//!
//! Citizens create and sign petitions and vote in polls; officials respond
//! to petitions in their jurisdiction and read per-location reports.
//!
//! ## Layers
//!
//! - **Auth**: identity assertion (JWT) and the authorization guard
//! - **Store**: the record store seam, with MongoDB and in-memory backends
//! - **Services**: petition, poll, governance and reporting engines
//! - **Routes/Server**: a thin hyper HTTP surface over the engines

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CivicError, Result};

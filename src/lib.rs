//! gardenhub - community garden coordination API
//!
//! Members create gardens, track plants, assign tasks, schedule events and
//! chat. The garden is the aggregate root: its plant, task and event lists
//! always name exactly the children that point back at it.
//!
//! ## Layers
//!
//! - **db**: MongoDB client and document schemas
//! - **store**: `GardenStore` trait with MongoDB and in-memory backends
//! - **services**: garden aggregate, stats, task status, chat, activity
//! - **routes** / **server**: hyper HTTP API

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
pub use types::{GardenError, Result};

//! HTTP server for gardenhub

pub mod http;

pub use http::{handle, run, AppState};

//! Shared types for gardenhub

pub mod error;
pub mod form;
pub mod id;
pub mod time;

pub use error::{FieldError, GardenError, Result};
pub use id::Id;
pub use time::Timestamp;

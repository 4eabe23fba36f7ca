//! Services layer for gardenhub
//!
//! Business rules on top of the entity store.
//!
//! ## Services
//!
//! - **GardenService**: garden aggregate, membership, child entities, integrity
//! - **Stats**: derived garden statistics
//! - **Tasks**: task status rules
//! - **ChatService**: per-garden message log
//! - **ActivityService**: recent activity feed

pub mod activity;
pub mod chat;
pub mod gardens;
pub mod stats;
pub mod tasks;

pub use activity::{ActivityEntry, ActivityService};
pub use chat::ChatService;
pub use gardens::{GardenDetail, GardenService, GardenView, IntegrityReport, ListReport};
pub use stats::GardenStats;
pub use tasks::StatusChange;

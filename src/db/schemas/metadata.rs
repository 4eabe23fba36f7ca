//! Common metadata for all documents
//!
//! Tracks creation and update timestamps. Flattened into each document so
//! clients see `createdAt` / `updatedAt` at the top level.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// When the document was created
    pub created_at: Timestamp,

    /// When the document was last updated
    pub updated_at: Timestamp,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

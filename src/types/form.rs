//! Lenient deserializers for form-shaped request bodies
//!
//! Browser forms submit `""` for fields the user left blank; these helpers
//! map blanks to `None` so optional fields stay unset instead of empty.

use serde::{de, Deserialize, Deserializer};

use crate::types::Id;

/// Optional free text; blank means unset
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Optional entity reference; blank means unset, malformed is rejected
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => Id::parse(raw.trim(), "User")
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid id: {raw:?}"))),
    }
}

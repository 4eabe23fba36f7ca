//! Opaque entity identifiers
//!
//! Ids are generated as MongoDB ObjectId hex strings and written as plain
//! strings, so JSON clients and BSON documents see the same value. Documents
//! written by other services may carry a BSON ObjectId instead; both forms
//! decode to the same `Id`.

use bson::{oid::ObjectId, Bson};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::GardenError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(ObjectId::new().to_hex())
    }

    /// Parse an identifier from a path segment or token claim.
    ///
    /// `what` names the entity for the error message; a malformed id can never
    /// resolve, so it surfaces as not-found.
    pub fn parse(raw: &str, what: &str) -> Result<Self, GardenError> {
        ObjectId::parse_str(raw)
            .map(Self::from)
            .map_err(|_| GardenError::NotFound(format!("{} not found", what)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ObjectId form, when the id is a well-formed hex string
    pub fn object_id(&self) -> Option<ObjectId> {
        ObjectId::parse_str(&self.0).ok()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ObjectId> for Id {
    fn from(oid: ObjectId) -> Self {
        Self(oid.to_hex())
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::String(id.0)
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an id string or ObjectId")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        Ok(Id(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Id, E> {
        Ok(Id(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Id, E> {
        let bytes: [u8; 12] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &"12 ObjectId bytes"))?;
        Ok(ObjectId::from_bytes(bytes).into())
    }

    // BSON ObjectIds arrive as the extended-JSON map `{"$oid": "<hex>"}`
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Id, A::Error> {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::missing_field("$oid"))?;
        if key != "$oid" {
            return Err(de::Error::unknown_field(&key, &["$oid"]));
        }
        let hex: String = map.next_value()?;
        ObjectId::parse_str(&hex)
            .map(Id::from)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&hex), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_generated_ids_are_unique_and_parseable() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 24);
        assert_eq!(Id::parse(a.as_str(), "Garden").unwrap(), a);
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        let err = Id::parse("not-an-id", "Garden").unwrap_err();
        assert!(matches!(err, GardenError::NotFound(ref m) if m == "Garden not found"));
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = Id::parse("65A1B2C3D4E5F60718293A4B", "Plant").unwrap();
        assert_eq!(id.as_str(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = Id::parse("65a1b2c3d4e5f60718293a4b", "Plant").unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"65a1b2c3d4e5f60718293a4b\""
        );
        assert_eq!(Bson::from(&id), Bson::String(id.to_string()));
    }

    #[test]
    fn test_decodes_bson_object_id_and_string() {
        let oid = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();

        let from_oid: Id = bson::from_bson(Bson::ObjectId(oid)).unwrap();
        assert_eq!(from_oid.as_str(), "65a1b2c3d4e5f60718293a4b");
        assert_eq!(from_oid.object_id(), Some(oid));

        let from_str: Id = bson::from_bson(Bson::String(oid.to_hex())).unwrap();
        assert_eq!(from_str, from_oid);

        #[derive(serde::Deserialize)]
        struct Owned {
            #[serde(rename = "_id")]
            id: Id,
        }
        let owned: Owned = bson::from_document(doc! { "_id": oid }).unwrap();
        assert_eq!(owned.id, from_oid);
    }

    #[test]
    fn test_decodes_json_string() {
        let id: Id = serde_json::from_str("\"65a1b2c3d4e5f60718293a4b\"").unwrap();
        assert_eq!(id.object_id().map(|o| o.to_hex()), Some(id.to_string()));
    }
}

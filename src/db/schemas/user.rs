//! User document schema
//!
//! Accounts are written by the external auth service. This crate only reads
//! them to show who owns, joined or wrote something, so it neither indexes
//! the collection nor depends on the account timestamps.

use bson::Document;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::types::Id;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl UserDoc {
    pub fn new(username: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id: Id::new(),
            username: username.to_string(),
            email: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            profile_picture: None,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}

/// Public identity shown next to gardens and messages
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl From<&UserDoc> for UserSummary {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

/// A user reference, resolved when the account is known
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Summary(UserSummary),
    Unknown(Id),
}

impl UserRef {
    /// Resolve `id` against a batch of loaded users
    pub fn resolve(id: &Id, users: &[UserDoc]) -> Self {
        users
            .iter()
            .find(|u| &u.id == id)
            .map(|u| Self::Summary(UserSummary::from(u)))
            .unwrap_or_else(|| Self::Unknown(id.clone()))
    }

    pub fn id(&self) -> &Id {
        match self {
            Self::Summary(s) => &s.id,
            Self::Unknown(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_and_unknown() {
        let alice = UserDoc::new("alice", "Alice", "Green");
        let stranger = Id::new();
        let users = vec![alice.clone()];

        let known = UserRef::resolve(&alice.id, &users);
        assert!(matches!(known, UserRef::Summary(ref s) if s.username == "alice"));
        assert_eq!(known.id(), &alice.id);

        let unknown = UserRef::resolve(&stranger, &users);
        assert_eq!(unknown, UserRef::Unknown(stranger));
    }

    #[test]
    fn test_decodes_account_written_by_auth_service() {
        let oid = bson::oid::ObjectId::new();
        let account = bson::doc! {
            "_id": oid,
            "username": "alice",
            "email": "alice@example.org",
            "password": "$argon2id$...",
            "firstName": "Alice",
            "lastName": "Green",
            "createdAt": bson::DateTime::now(),
            "updatedAt": bson::DateTime::now(),
        };
        let user: UserDoc = bson::from_document(account).unwrap();
        assert_eq!(user.id.as_str(), oid.to_hex());
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_user_collection_is_not_indexed() {
        assert!(UserDoc::into_indices().is_empty());
    }

    #[test]
    fn test_summary_omits_private_fields() {
        let mut alice = UserDoc::new("alice", "Alice", "Green");
        alice.email = Some("alice@example.org".into());
        let json = serde_json::to_value(UserRef::resolve(&alice.id, &[alice.clone()])).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["firstName"], "Alice");
        assert!(json.get("email").is_none());
    }
}

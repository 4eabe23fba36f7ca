//! HTTP API driven through the dispatcher, backed by the in-memory store

use std::sync::Arc;

use clap::Parser;
use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};

use gardenhub::auth::JwtValidator;
use gardenhub::config::Args;
use gardenhub::db::schemas::UserDoc;
use gardenhub::routes::ApiRequest;
use gardenhub::server::{self, AppState};
use gardenhub::store::MemoryStore;

struct Api {
    state: AppState,
    jwt: JwtValidator,
    users: Vec<UserDoc>,
}

struct Caller {
    token: String,
    id: String,
}

impl Api {
    fn new() -> Self {
        let args = Args::parse_from(["gardenhub", "--dev-mode"]);
        let store = Arc::new(MemoryStore::new());
        let users = vec![
            UserDoc::new("ursula", "Ursula", "Gardener"),
            UserDoc::new("walt", "Walt", "Gardener"),
        ];
        for user in &users {
            store.insert_user(user.clone());
        }
        Self {
            state: AppState::new(args, store, JwtValidator::new_dev(), "memory"),
            jwt: JwtValidator::new_dev(),
            users,
        }
    }

    /// Token for a registered user, or for a fresh id if the name is unknown
    fn caller(&self, username: &str) -> Caller {
        let id = self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id.clone())
            .unwrap_or_default();
        Caller {
            token: self.jwt.generate_token(&id, username).unwrap(),
            id: id.to_string(),
        }
    }

    async fn send(&self, req: ApiRequest) -> (StatusCode, Value) {
        let response = server::handle(&self.state, &req).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create_garden(&self, who: &Caller) -> String {
        let (status, body) = self
            .send(
                ApiRequest::new(Method::POST, "/api/gardens")
                    .with_bearer(&who.token)
                    .with_json(&json!({
                        "name": "Elm St",
                        "description": "desc",
                        "location": "123 Elm"
                    })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["_id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let api = Api::new();
    let (status, body) = api.send(ApiRequest::new(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_preflight_is_no_content() {
    let api = Api::new();
    let req = ApiRequest::new(Method::OPTIONS, "/api/gardens");
    let response = server::handle(&api.state, &req).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let api = Api::new();
    let (status, body) = api
        .send(ApiRequest::new(Method::POST, "/api/gardens").with_json(&json!({"name": "x"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let (status, _) = api
        .send(ApiRequest::new(Method::GET, "/api/activity").with_bearer("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // public reads
    let (status, body) = api.send(ApiRequest::new(Method::GET, "/api/gardens")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_create_garden_validation() {
    let api = Api::new();
    let ursula = api.caller("ursula");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::POST, "/api/gardens")
                .with_bearer(&ursula.token)
                .with_json(&json!({"name": "Elm St"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["description", "location"]);

    let mut bad = ApiRequest::new(Method::POST, "/api/gardens").with_bearer(&ursula.token);
    bad.body = bytes::Bytes::from_static(b"{not json");
    let (status, _) = api.send(bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_garden_scenario_over_http() {
    let api = Api::new();
    let ursula = api.caller("ursula");
    let garden = api.create_garden(&ursula).await;

    let (status, body) = api
        .send(
            ApiRequest::new(Method::POST, &format!("/api/plants/garden/{garden}"))
                .with_bearer(&ursula.token)
                .with_json(&json!({"name": "Tomato", "species": "Solanum"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let plant = body["_id"].as_str().unwrap().to_string();
    assert_eq!(body["garden"], garden.as_str());
    assert_eq!(body["plantedBy"], ursula.id.as_str());

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, &format!("/api/gardens/{garden}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"]["_id"], ursula.id.as_str());
    assert_eq!(body["owner"]["username"], "ursula");
    assert_eq!(body["plants"], json!([plant]));
    assert_eq!(body["stats"]["totalPlants"], 1);

    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, &format!("/api/plants/garden/{garden}"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["_id"], plant.as_str());
    assert_eq!(body[0]["plantedBy"]["username"], "ursula");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::DELETE, &format!("/api/plants/{plant}"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Plant deleted");

    let (_, body) = api
        .send(ApiRequest::new(Method::GET, &format!("/api/gardens/{garden}")))
        .await;
    assert_eq!(body["plants"], json!([]));
    assert_eq!(body["stats"]["totalPlants"], 0);

    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, &format!("/api/gardens/{garden}/integrity"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["consistent"], true);
}

#[tokio::test]
async fn test_membership_and_delete_over_http() {
    let api = Api::new();
    let ursula = api.caller("ursula");
    let walt = api.caller("walt");
    let garden = api.create_garden(&ursula).await;

    for _ in 0..2 {
        let (status, body) = api
            .send(
                ApiRequest::new(Method::POST, &format!("/api/gardens/{garden}/members"))
                    .with_bearer(&walt.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["members"], json!([ursula.id, walt.id]));
    }

    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, "/api/gardens/user/my-gardens").with_bearer(&walt.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, "/api/gardens/user/created").with_bearer(&walt.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = api
        .send(
            ApiRequest::new(Method::POST, &format!("/api/gardens/{garden}/leave"))
                .with_bearer(&walt.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Left the garden successfully");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::DELETE, &format!("/api/gardens/{garden}"))
                .with_bearer(&walt.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::DELETE, &format!("/api/gardens/{garden}"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Garden deleted successfully");

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, &format!("/api/gardens/{garden}")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Garden not found");
}

#[tokio::test]
async fn test_malformed_ids_are_not_found() {
    let api = Api::new();
    let ursula = api.caller("ursula");

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, "/api/gardens/not-an-id"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Garden not found");

    let (status, body) = api
        .send(ApiRequest::new(Method::DELETE, "/api/tasks/nope").with_bearer(&ursula.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");

    let (status, _) = api
        .send(ApiRequest::new(Method::GET, "/api/unknown/route"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_status_and_event_attendance() {
    let api = Api::new();
    let ursula = api.caller("ursula");
    let walt = api.caller("walt");
    let garden = api.create_garden(&ursula).await;

    let (status, body) = api
        .send(
            ApiRequest::new(Method::POST, &format!("/api/tasks/garden/{garden}"))
                .with_bearer(&ursula.token)
                .with_json(&json!({"title": "Water beds"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Task type is required");

    let (_, body) = api
        .send(
            ApiRequest::new(Method::POST, &format!("/api/tasks/garden/{garden}"))
                .with_bearer(&ursula.token)
                .with_json(&json!({"title": "Water beds", "type": "watering"})),
        )
        .await;
    let task = body["_id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], "pending");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::PATCH, &format!("/api/tasks/{task}/status"))
                .with_bearer(&ursula.token)
                .with_json(&json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "status");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::PATCH, &format!("/api/tasks/{task}/status"))
                .with_bearer(&ursula.token)
                .with_json(&json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["completedDate"].is_string());

    let (_, body) = api
        .send(
            ApiRequest::new(Method::POST, &format!("/api/events/garden/{garden}"))
                .with_bearer(&ursula.token)
                .with_json(&json!({"title": "Harvest", "date": "2099-09-01"})),
        )
        .await;
    let event = body["_id"].as_str().unwrap().to_string();
    assert_eq!(body["attendees"], json!([ursula.id]));

    let attend = |who: &Caller| {
        ApiRequest::new(Method::PATCH, &format!("/api/events/{event}/attend"))
            .with_bearer(&who.token)
    };
    let (_, body) = api.send(attend(&walt)).await;
    assert_eq!(body["attendees"], json!([ursula.id, walt.id]));

    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, &format!("/api/events/garden/{garden}"))
                .with_bearer(&walt.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["createdBy"]["username"], "ursula");
    let attendees: Vec<&str> = body[0]["attendees"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["username"].as_str().unwrap())
        .collect();
    assert_eq!(attendees, vec!["ursula", "walt"]);

    let (_, body) = api.send(attend(&walt)).await;
    assert_eq!(body["attendees"], json!([ursula.id]));
    let (_, body) = api.send(attend(&ursula)).await;
    assert_eq!(body["attendees"], json!([]));

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, "/api/activity").with_bearer(&walt.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"task"));
    assert!(kinds.contains(&"event"));
}

#[tokio::test]
async fn test_chat_post_and_poll() {
    let api = Api::new();
    let ursula = api.caller("ursula");
    let garden = api.create_garden(&ursula).await;
    let path = format!("/api/chat/garden/{garden}");

    let (status, body) = api
        .send(
            ApiRequest::new(Method::POST, &path)
                .with_bearer(&ursula.token)
                .with_json(&json!({"text": "   "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Message text is required");

    let (status, first) = api
        .send(
            ApiRequest::new(Method::POST, &path)
                .with_bearer(&ursula.token)
                .with_json(&json!({"text": "Tomatoes are in"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["text"], "Tomatoes are in");
    assert_eq!(first["user"]["username"], "ursula");

    let (status, body) = api
        .send(ApiRequest::new(Method::GET, &path).with_bearer(&ursula.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let since = first["createdAt"].as_str().unwrap();
    let seen = first["_id"].as_str().unwrap();
    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, &path)
                .with_query(format!("since={since}"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["_id"], seen);

    let (status, body) = api
        .send(
            ApiRequest::new(Method::GET, &path)
                .with_query(format!("since={since}&after={seen}"))
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = api
        .send(
            ApiRequest::new(Method::GET, &path)
                .with_query("since=last-tuesday")
                .with_bearer(&ursula.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

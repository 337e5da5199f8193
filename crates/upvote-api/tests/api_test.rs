use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use upvote_api::middleware::create_token;
use upvote_api::router;
use upvote_api::state::AppStateInner;
use upvote_db::Database;

const SECRET: &str = "test-secret";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router(AppStateInner::new(db, SECRET))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn sign_up(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "Passw0rd",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_feature(app: &Router, token: &str, title: &str, description: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/features",
        Some(token),
        Some(json!({ "title": title, "description": description })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "open");
    body["id"].as_str().unwrap().to_string()
}

async fn list(app: &Router, query: &str, token: Option<&str>) -> Value {
    let (status, body) = send(app, Method::GET, &format!("/features{query}"), token, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn vote_scenario_across_two_users() {
    let app = app();
    let alice = sign_up(&app, "Alice").await;
    let bob = sign_up(&app, "Bob").await;
    let feature = create_feature(&app, &alice, "Dark Mode", "A night theme").await;
    let vote_uri = format!("/features/{feature}/vote");

    let (status, body) = send(&app, Method::POST, &vote_uri, Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voted"], true);
    assert_eq!(list(&app, "", None).await["features"][0]["vote_count"], 1);

    send(&app, Method::POST, &vote_uri, Some(bob.as_str()), None).await;
    assert_eq!(list(&app, "", None).await["features"][0]["vote_count"], 2);

    let (_, body) = send(&app, Method::POST, &vote_uri, Some(alice.as_str()), None).await;
    assert_eq!(body["voted"], false);
    assert_eq!(body["message"], "Vote removed");

    let as_alice = list(&app, "", Some(alice.as_str())).await;
    assert_eq!(as_alice["features"][0]["vote_count"], 1);
    assert_eq!(as_alice["features"][0]["voted"], false);

    let as_bob = list(&app, "", Some(bob.as_str())).await;
    assert_eq!(as_bob["features"][0]["voted"], true);

    let anonymous = list(&app, "", None).await;
    assert!(anonymous["features"][0].get("voted").is_none());
}

#[tokio::test]
async fn vote_requires_session_and_post() {
    let app = app();
    let token = sign_up(&app, "Alice").await;
    let feature = create_feature(&app, &token, "Export", "CSV export").await;
    let vote_uri = format!("/features/{feature}/vote");

    let (status, body) = send(&app, Method::POST, &vote_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authenticated");

    let (status, _) = send(&app, Method::POST, &vote_uri, Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, &vote_uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "Method not allowed");
}

#[tokio::test]
async fn vote_on_unknown_feature_is_not_found() {
    let app = app();
    let token = sign_up(&app, "Alice").await;

    let uri = format!("/features/{}/vote", uuid::Uuid::new_v4());
    let (status, _) = send(&app, Method::POST, &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/features/not-a-uuid/vote", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_feature_validation() {
    let app = app();
    let token = sign_up(&app, "Alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/features",
        None,
        Some(json!({ "title": "Dark Mode", "description": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cases = [
        (json!({ "title": "t".repeat(101), "description": "x" }), "Title must be less than 100 characters"),
        (json!({ "title": "Dark Mode", "description": "" }), "Missing required fields"),
        (json!({ "title": "Dark Mode" }), "Missing required fields"),
        (json!({ "title": "Dark Mode", "description": "d".repeat(501) }), "Description must be less than 500 characters"),
    ];
    for (body, expected) in cases {
        let (status, response) = send(&app, Method::POST, "/features", Some(token.as_str()), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], expected);
    }

    let (status, _) = send(&app, Method::DELETE, "/features", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn listing_paginates_and_searches() {
    let app = app();
    let token = sign_up(&app, "Alice").await;
    for i in 0..25 {
        create_feature(&app, &token, &format!("Feature {i}"), "Plain description").await;
    }
    create_feature(&app, &token, "Dark Mode", "Night theme").await;

    let body = list(&app, "?page=3&limit=10&search=feature", None).await;
    assert_eq!(body["pagination"], json!({ "total": 25, "pages": 3, "page": 3, "limit": 10 }));
    assert_eq!(body["features"].as_array().unwrap().len(), 5);

    for term in ["dark", "MODE"] {
        let body = list(&app, &format!("?search={term}"), None).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["features"][0]["title"], "Dark Mode");
        assert_eq!(body["features"][0]["creator_name"], "Alice");
    }

    let body = list(&app, "?page=0&limit=abc", None).await;
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 10);

    let body = list(&app, "?status=planned", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = send(&app, Method::GET, "/features?status=shipped", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/features?status=PLANNED", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_matches_accented_titles_in_any_case() {
    let app = app();
    let token = sign_up(&app, "Alice").await;
    create_feature(&app, &token, "Écran sombre", "Thème de nuit").await;

    // écran, ÉCRAN
    for term in ["%C3%A9cran", "%C3%89CRAN"] {
        let body = list(&app, &format!("?search={term}"), None).await;
        assert_eq!(body["pagination"]["total"], 1, "search {term}");
        assert_eq!(body["features"][0]["title"], "Écran sombre");
    }
}

#[tokio::test]
async fn token_for_missing_account_is_unauthenticated() {
    let app = app();
    let alice = sign_up(&app, "Alice").await;
    let feature = create_feature(&app, &alice, "Export", "CSV export").await;

    // Correctly signed, but the account is not in this database
    let ghost = create_token(SECRET, uuid::Uuid::new_v4(), "Ghost").unwrap();

    let uri = format!("/features/{feature}/vote");
    let (status, body) = send(&app, Method::POST, &uri, Some(ghost.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authenticated");

    let (status, _) = send(
        &app,
        Method::POST,
        "/features",
        Some(ghost.as_str()),
        Some(json!({ "title": "Themes", "description": "Custom colours" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let body = list(&app, "", None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["features"][0]["vote_count"], 0);
}

#[tokio::test]
async fn sign_up_and_sign_in() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "weakpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must contain at least one number");

    sign_up(&app, "Ada").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Ada Two", "email": "ADA@example.com", "password": "Passw0rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "Wr0ngpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/signin",
        None,
        Some(json!({ "email": "Ada@Example.com", "password": "Passw0rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/auth/session", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");

    let (status, _) = send(&app, Method::GET, "/auth/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

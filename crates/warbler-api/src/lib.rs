pub mod auth;
pub mod error;
pub mod guard;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod service;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ServiceError};
use crate::service::Warbler;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub warbler: Warbler,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

/// All Warbler routes, with the caller's identity resolved per request.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(messages::home))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/profile", post(users::update_profile))
        .route("/users/delete", post(users::delete_account))
        .route("/users/follow/{user_id}", post(users::follow))
        .route("/users/stop-following/{user_id}", post(users::stop_following))
        .route("/users/add_like/{message_id}", post(likes::add_like))
        .route("/users/remove_like/{message_id}", post(likes::remove_like))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/messages/new", post(messages::new_message))
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .layer(from_fn_with_state(state.clone(), middleware::identify))
        .with_state(state)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::from)
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use warbler_db::Database;
    use warbler_types::Identity;
    use warbler_types::api::SignupRequest;

    use crate::middleware::create_token;

    const SECRET: &str = "test-secret";

    struct TestApp {
        state: AppState,
    }

    impl TestApp {
        /// testuser (9999) follows abc (1111); abc has posted one message.
        fn new() -> (Self, i64) {
            let state = Arc::new(AppStateInner {
                warbler: Warbler::new(Database::open_in_memory().unwrap()),
                jwt_secret: SECRET.into(),
                token_ttl_days: 1,
            });

            for (id, name) in [(9999, "testuser"), (1111, "abc"), (2222, "efg")] {
                let req = SignupRequest {
                    username: Some(name.into()),
                    email: Some(format!("{}@test.com", name)),
                    password: Some("password".into()),
                    image_url: None,
                };
                let mut staged = Warbler::stage_signup(&req).unwrap();
                staged.id = Some(id);
                state.warbler.db().insert_user(&staged).unwrap();
            }
            state.warbler.follow(Identity::User(9999), 1111).unwrap();
            let msg = state
                .warbler
                .post_message(Identity::User(1111), "Test message")
                .unwrap();

            (Self { state }, msg.id)
        }

        fn token(&self, user_id: i64) -> String {
            create_token(SECRET, 1, user_id, "whoever").unwrap()
        }

        async fn send(&self, method: Method, uri: &str, as_user: Option<i64>, body: Option<Value>) -> (StatusCode, Value, Option<String>) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(id) = as_user {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", self.token(id)));
            }
            let req = match body {
                Some(json) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => req.body(Body::empty()).unwrap(),
            };

            let resp = router(self.state.clone()).oneshot(req).await.unwrap();
            let status = resp.status();
            let location = resp
                .headers()
                .get(header::LOCATION)
                .map(|v| v.to_str().unwrap().to_string());
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json, location)
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let (app, _) = TestApp::new();
        let before = app.state.warbler.db().count_users().unwrap();

        let body = json!({"username": "test_visitor", "email": "test_visitor@test.com", "password": "test_visitor"});
        let (status, json, _) = app.send(Method::POST, "/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["user"]["username"], "test_visitor");
        assert!(json["user"].get("password").is_none());
        assert!(json["token"].as_str().is_some());
        assert_eq!(app.state.warbler.db().count_users().unwrap(), before + 1);

        let body = json!({"username": "test_visitor", "password": "test_visitor"});
        let (status, json, _) = app.send(Method::POST, "/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["email"], "test_visitor@test.com");

        let body = json!({"username": "test_visitor", "password": "nope"});
        let (status, _, _) = app.send(Method::POST, "/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_auth_bodies_are_bad_requests() {
        let (app, _) = TestApp::new();
        let cases = [
            ("/signup", Some(json!({"username": "x", "email": "x@test.com", "password": "pw", "admin": true}))),
            ("/signup", Some(json!({"username": 7, "email": "x@test.com", "password": "pw"}))),
            ("/login", Some(json!({"username": "abc"}))),
            ("/login", None),
        ];

        for (uri, body) in cases {
            let (status, json, _) = app.send(Method::POST, uri, None, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(json["error"].as_str().is_some());
        }
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let (app, _) = TestApp::new();
        let body = json!({"username": "abc", "email": "new@test.com", "password": "password"});
        let (status, _, _) = app.send(Method::POST, "/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn visitors_are_redirected_from_graph_pages() {
        let (app, _) = TestApp::new();
        for uri in ["/users/9999/followers", "/users/9999/following"] {
            let (status, json, location) = app.send(Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::FOUND);
            assert_eq!(location.as_deref(), Some("/"));
            assert_eq!(json["error"], "Access unauthorized.");
        }

        let (status, json, _) = app.send(Method::GET, "/users/9999/following", Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["username"], "abc");

        let (status, json, _) = app.send(Method::GET, "/users/1111/followers", Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["id"], 9999);

        let (status, _, _) = app.send(Method::GET, "/users/4242/followers", Some(9999), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn follow_routes_reject_get() {
        let (app, _) = TestApp::new();
        for uri in ["/users/follow/9999", "/users/stop-following/9999"] {
            let (status, _, _) = app.send(Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[tokio::test]
    async fn follow_and_unfollow() {
        let (app, _) = TestApp::new();

        let (status, json, _) = app.send(Method::POST, "/users/follow/2222", Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["changed"], true);
        assert!(app.state.warbler.is_following(9999, 2222).unwrap());

        let (status, json, _) = app.send(Method::POST, "/users/stop-following/1111", Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["following"], false);
        assert!(!app.state.warbler.is_following(9999, 1111).unwrap());

        let (status, _, _) = app.send(Method::POST, "/users/follow/2222", None, None).await;
        assert_eq!(status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn posting_messages() {
        let (app, _) = TestApp::new();

        let (status, json, _) = app
            .send(Method::POST, "/messages/new", Some(9999), Some(json!({"text": "Hello"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["author"]["username"], "testuser");
        assert_eq!(app.state.warbler.messages_for_user(9999).unwrap().len(), 1);

        // Visitors are denied even without a body.
        let (status, json, _) = app.send(Method::POST, "/messages/new", None, None).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(json["error"], "Access unauthorized.");

        let long = "x".repeat(141);
        let (status, _, _) = app
            .send(Method::POST, "/messages/new", Some(9999), Some(json!({"text": long})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, _) = app.send(Method::POST, "/messages/new", Some(9999), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_messages() {
        let (app, msg_id) = TestApp::new();
        let uri = format!("/messages/{}/delete", msg_id);

        let (status, json, _) = app.send(Method::POST, &uri, Some(9999), None).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(json["error"], "Access unauthorized.");

        let (status, _, _) = app.send(Method::POST, &uri, None, None).await;
        assert_eq!(status, StatusCode::FOUND);
        assert!(app.state.warbler.message(msg_id).unwrap().is_some());

        let (status, _, _) = app.send(Method::POST, &uri, Some(1111), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.state.warbler.message(msg_id).unwrap().is_none());

        let (status, _, _) = app.send(Method::GET, &format!("/messages/{}", msg_id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn liking_messages() {
        let (app, msg_id) = TestApp::new();
        let uri = format!("/users/add_like/{}", msg_id);

        let (status, json, _) = app.send(Method::POST, &uri, Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["like_count"], 1);

        let (status, _, _) = app.send(Method::POST, &uri, None, None).await;
        assert_eq!(status, StatusCode::FOUND);

        // Authors cannot like their own messages.
        let (status, _, _) = app.send(Method::POST, &uri, Some(1111), None).await;
        assert_eq!(status, StatusCode::FOUND);

        let (_, json, _) = app.send(Method::GET, &format!("/messages/{}", msg_id), None, None).await;
        assert_eq!(json["like_count"], 1);

        let (_, json, _) = app.send(Method::GET, "/users/9999/likes", None, None).await;
        assert_eq!(json[0]["id"], msg_id);

        let uri = format!("/users/remove_like/{}", msg_id);
        let (status, json, _) = app.send(Method::POST, &uri, Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["like_count"], 0);
    }

    #[tokio::test]
    async fn home_and_profiles() {
        let (app, _) = TestApp::new();

        let (status, json, _) = app.send(Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([]));

        let (_, json, _) = app.send(Method::GET, "/", Some(9999), None).await;
        assert_eq!(json[0]["text"], "Test message");

        let (status, json, _) = app.send(Method::GET, "/users/1111", Some(9999), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["username"], "abc");
        assert_eq!(json["followers_count"], 1);
        assert_eq!(json["following_count"], 0);
        assert_eq!(json["likes_count"], 0);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);

        let (status, _, _) = app.send(Method::GET, "/users/4242", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json, _) = app.send(Method::GET, "/users?q=bc", None, None).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        let (_, json, _) = app.send(Method::GET, "/users", None, None).await;
        assert_eq!(json.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn profile_update() {
        let (app, _) = TestApp::new();

        let (status, json, _) = app.send(Method::POST, "/users/profile", None, None).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(json["error"], "Access unauthorized.");

        let body = json!({
            "email": "test@updated.com",
            "image_url": "/static/images/default-pic.png",
            "bio": "test bio",
            "location": "test location",
            "header_image_url": "/static/images/warbler-hero.jpg",
            "password": "password",
        });
        let (status, json, _) = app.send(Method::POST, "/users/profile", Some(9999), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["email"], "test@updated.com");
        assert_eq!(json["bio"], "test bio");
        assert_eq!(json["location"], "test location");

        let body = json!({"bio": "sneaky", "password": "wrong"});
        let (status, _, _) = app.send(Method::POST, "/users/profile", Some(9999), Some(body)).await;
        assert_eq!(status, StatusCode::FOUND);
        let user = app.state.warbler.user(9999).unwrap().unwrap();
        assert_eq!(user.bio.as_deref(), Some("test bio"));
    }

    #[tokio::test]
    async fn account_deletion() {
        let (app, msg_id) = TestApp::new();

        let (status, _, _) = app.send(Method::POST, "/users/delete", None, None).await;
        assert_eq!(status, StatusCode::FOUND);

        let (status, _, _) = app.send(Method::POST, "/users/delete", Some(1111), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.state.warbler.user(1111).unwrap().is_none());
        assert!(app.state.warbler.message(msg_id).unwrap().is_none());
        assert!(!app.state.warbler.is_following(9999, 1111).unwrap());
    }
}

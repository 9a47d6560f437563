//! End-to-end tests: drive the full router against an in-memory database.
//!
//! Each test builds its own app, so there is no shared state between them.
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use storefront_api::auth::{AppState, AppStateInner};
use storefront_api::router;
use storefront_db::Database;
use storefront_types::Price;
use storefront_types::models::{NewProduct, Role};

struct TestApp {
    app: Router,
    state: AppState,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            secure_cookies: false,
        });
        Self {
            app: router(state.clone()),
            state,
        }
    }

    fn seed_product(&self, name: &str, cents: i64, category: &str) -> i64 {
        self.state
            .db
            .insert_product(&NewProduct {
                name: name.into(),
                description: None,
                price: Price::from_cents(cents).unwrap(),
                category: category.into(),
                image: None,
            })
            .unwrap()
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        self.send_raw(method, uri, cookie, body.map(|b| b.to_string()))
            .await
    }

    /// Like `send`, but the body goes out verbatim so malformed JSON can be sent.
    async fn send_raw(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<String>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, headers, body }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::GET, uri, cookie, None).await
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, uri, cookie, Some(body)).await
    }

    /// Signs up and signs in; returns the `session_id=...` cookie pair.
    async fn login(&self, email: &str) -> String {
        let reply = self
            .post(
                "/api/auth/signup",
                None,
                json!({ "email": email, "password": "hunter22", "name": "Tester" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let reply = self
            .post("/api/auth/signin", None, json!({ "email": email, "password": "hunter22" }))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        session_cookie(&reply.headers)
    }
}

fn session_cookie(headers: &HeaderMap) -> String {
    let raw = headers
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn names(body: &Value) -> Vec<String> {
    let mut names: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let reply = app.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn session_cookie_flow() {
    let app = TestApp::new();

    let anonymous = app.get("/api/auth/me", None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.body["user"], Value::Null);

    let cookie = app.login("ada@example.com").await;
    assert!(cookie.starts_with("session_id="));

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.body["user"]["email"], "ada@example.com");
    assert!(me.body["user"].get("password").is_none());

    let out = app.post("/api/auth/signout", Some(&cookie), json!({})).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.body["success"], true);
    assert!(session_cookie(&out.headers).starts_with("session_id="));

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.body["user"], Value::Null);

    // Signing out again is harmless.
    let again = app.post("/api/auth/signout", Some(&cookie), json!({})).await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn signup_rejections() {
    let app = TestApp::new();
    app.login("ada@example.com").await;

    let duplicate = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "ada@example.com", "password": "another1", "name": "Ada" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"]["code"], "duplicate_user");

    let bad_email = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "nope", "password": "hunter22", "name": "Ada" }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let missing = app.post("/api/auth/signup", None, json!({ "email": "x@y.z" })).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signin_failures_look_the_same() {
    let app = TestApp::new();
    app.login("ada@example.com").await;

    let wrong_password = app
        .post("/api/auth/signin", None, json!({ "email": "ada@example.com", "password": "wrong!" }))
        .await;
    let unknown_email = app
        .post("/api/auth/signin", None, json!({ "email": "bob@example.com", "password": "hunter22" }))
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert!(wrong_password.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn product_listing_filters() {
    let app = TestApp::new();
    app.seed_product("Desk Lamp", 1500, "home");
    app.seed_product("Floor Lamp", 4500, "home");
    app.seed_product("Mug", 1000, "kitchen");
    app.seed_product("Kettle", 2000, "kitchen");
    app.seed_product("Toaster", 2001, "kitchen");

    let all = app.get("/api/products", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 5);
    assert_eq!(all.body[0]["rating"], json!({ "rate": 0.0, "count": 0 }));

    let ranged = app.get("/api/products?minPrice=10&maxPrice=20", None).await;
    assert_eq!(names(&ranged.body), vec!["Desk Lamp", "Kettle", "Mug"]);

    let searched = app.get("/api/products?query=lamp&category=home", None).await;
    assert_eq!(names(&searched.body), vec!["Desk Lamp", "Floor Lamp"]);

    let malformed = app.get("/api/products?minPrice=cheap", None).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["error"]["code"], "validation_error");

    let categories = app.get("/api/categories", None).await;
    assert_eq!(categories.body, json!(["home", "kitchen"]));
}

#[tokio::test]
async fn product_lookup() {
    let app = TestApp::new();
    let id = app.seed_product("Mug", 1250, "kitchen");

    let found = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["name"], "Mug");
    assert_eq!(found.body["price"], 12.5);

    let missing = app.get(&format!("/api/products/{}", id + 1), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_writes_require_admin() {
    let app = TestApp::new();
    let new_product = json!({ "name": "Kettle", "price": "34.99", "category": "kitchen" });

    let anonymous = app.post("/api/products", None, new_product.clone()).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let cookie = app.login("ada@example.com").await;
    let customer = app.post("/api/products", Some(&cookie), new_product.clone()).await;
    assert_eq!(customer.status, StatusCode::FORBIDDEN);

    app.state.db.set_user_role("ada@example.com", Role::Admin).unwrap();
    let created = app.post("/api/products", Some(&cookie), new_product).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["price"], 34.99);
    let id = created.body["id"].as_i64().unwrap();

    let updated = app
        .send(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(&cookie),
            Some(json!({ "price": 29.99 })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["price"], 29.99);
    assert_eq!(updated.body["name"], "Kettle");

    let deleted = app
        .send(Method::DELETE, &format!("/api/products/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    let deleted_again = app
        .send(Method::DELETE, &format!("/api/products/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(deleted_again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_crud_and_ownership() {
    let app = TestApp::new();
    let product = app.seed_product("Mug", 1000, "kitchen");
    let comments_uri = format!("/api/products/{product}/comments");

    let anonymous = app.post(&comments_uri, None, json!({ "content": "hi" })).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let author = app.login("author@example.com").await;
    let stranger = app.login("stranger@example.com").await;

    let blank = app.post(&comments_uri, Some(&author), json!({ "content": "   " })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    app.post(&comments_uri, Some(&author), json!({ "content": "first" })).await;
    let added = app.post(&comments_uri, Some(&author), json!({ "content": "second" })).await;
    assert_eq!(added.status, StatusCode::CREATED);
    let comment_id = added.body["id"].as_i64().unwrap();

    let listed = app.get(&comments_uri, None).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 2);
    assert_eq!(listed.body[0]["content"], "second");

    let comment_uri = format!("/api/comments/{comment_id}");
    let missing_uri = format!("/api/comments/{}", comment_id + 1000);

    let foreign_edit = app
        .send(Method::PUT, &comment_uri, Some(&stranger), Some(json!({ "content": "mine" })))
        .await;
    let missing_edit = app
        .send(Method::PUT, &missing_uri, Some(&stranger), Some(json!({ "content": "mine" })))
        .await;
    assert_eq!(foreign_edit.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_edit.status, missing_edit.status);
    assert_eq!(foreign_edit.body, missing_edit.body);

    let foreign_delete = app.send(Method::DELETE, &comment_uri, Some(&stranger), None).await;
    let missing_delete = app.send(Method::DELETE, &missing_uri, Some(&stranger), None).await;
    assert_eq!(foreign_delete.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_delete.body, missing_delete.body);

    let edited = app
        .send(Method::PUT, &comment_uri, Some(&author), Some(json!({ "content": "edited" })))
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["content"], "edited");

    let deleted = app.send(Method::DELETE, &comment_uri, Some(&author), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.get(&comments_uri, None).await.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rating_once_per_user() {
    let app = TestApp::new();
    let product = app.seed_product("Mug", 1000, "kitchen");
    let rate_uri = format!("/api/products/{product}/rate");
    let mine_uri = format!("/api/products/{product}/user-rating");

    let cookie = app.login("ada@example.com").await;

    let before = app.get(&mine_uri, Some(&cookie)).await;
    assert_eq!(before.body["rating"], Value::Null);

    let out_of_range = app.post(&rate_uri, Some(&cookie), json!({ "rating": 9 })).await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let rated = app.post(&rate_uri, Some(&cookie), json!({ "rating": 4 })).await;
    assert_eq!(rated.status, StatusCode::OK);
    assert_eq!(rated.body["rating"], json!({ "rate": 4.0, "count": 1 }));

    let twice = app.post(&rate_uri, Some(&cookie), json!({ "rating": 1 })).await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    let after = app.get(&mine_uri, Some(&cookie)).await;
    assert_eq!(after.body["rating"], 4);

    let high_rated = app.get("/api/products?minRating=4", None).await;
    assert_eq!(names(&high_rated.body), vec!["Mug"]);
    let higher = app.get("/api/products?minRating=4.5", None).await;
    assert!(higher.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn public_user_profile() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    let me = app.get("/api/auth/me", Some(&cookie)).await;
    let id = me.body["user"]["id"].as_i64().unwrap();

    let profile = app.get(&format!("/api/users/{id}"), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["name"], "Tester");
    assert_eq!(profile.body["role"], "user");
    assert!(profile.body.get("password").is_none());

    let missing = app.get(&format!("/api/users/{}", id + 1), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_use_error_envelope() {
    let app = TestApp::new();
    let product = app.seed_product("Mug", 1000, "kitchen");
    let cookie = app.login("ada@example.com").await;

    let bad_id = app.get("/api/products/abc", None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["error"]["code"], "validation_error");

    let bad_user_id = app.get("/api/users/abc", None).await;
    assert_eq!(bad_user_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_user_id.body["error"]["code"], "validation_error");

    let not_json = app
        .send_raw(Method::POST, "/api/auth/signup", None, Some("{not json".into()))
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json.body["error"]["code"], "validation_error");
    assert!(not_json.body["error"]["message"].is_string());

    let wrong_type = app.post("/api/auth/signin", None, json!({ "email": 5 })).await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.body["error"]["code"], "validation_error");

    let fractional = app
        .post(&format!("/api/products/{product}/rate"), Some(&cookie), json!({ "rating": 4.5 }))
        .await;
    assert_eq!(fractional.status, StatusCode::BAD_REQUEST);
    assert_eq!(fractional.body["error"]["code"], "validation_error");

    let bad_comment = app
        .post(&format!("/api/products/{product}/comments"), Some(&cookie), json!({ "content": 7 }))
        .await;
    assert_eq!(bad_comment.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_comment.body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn admin_can_clear_optional_product_fields() {
    let app = TestApp::new();
    let cookie = app.login("ada@example.com").await;
    app.state.db.set_user_role("ada@example.com", Role::Admin).unwrap();

    let created = app
        .post(
            "/api/products",
            Some(&cookie),
            json!({
                "name": "Kettle",
                "description": "Boils water",
                "price": 34.99,
                "category": "kitchen",
                "image": "/img/kettle.png"
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let uri = format!("/api/products/{}", created.body["id"].as_i64().unwrap());

    let cleared = app
        .send(Method::PUT, &uri, Some(&cookie), Some(json!({ "image": null })))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["image"], Value::Null);
    assert_eq!(cleared.body["description"], "Boils water");
}

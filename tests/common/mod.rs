#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use verdict::{
    mail::MemoryMailer,
    modules::{
        taxonomy::{models::Taxonomy, repo as terms},
        users::{
            models::User,
            repo::{self as users, NewUser},
        },
    },
    AppState, Prepared,
};
use verdict_authz::Role;
use verdict_kernel::Settings;

/// The full router over a private in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let db = verdict_db::connect_in_memory().await.unwrap();
        let mailer = Arc::new(MemoryMailer::new());
        let Prepared {
            registry, state, ..
        } = verdict::prepare_with(&settings, db, mailer.clone())
            .await
            .unwrap();
        let router = verdict_http::build_router(&registry, &settings);

        Self {
            router,
            state,
            mailer,
        }
    }

    pub async fn send(
        &self,
        method: &str,
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

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None).await
    }

    /// Insert an account directly and mint a token for it.
    pub async fn user(&self, username: &str, role: Role) -> (User, String) {
        let email = format!("{username}@example.com");
        let mut new_user = NewUser::member(username, &email);
        new_user.role = role;
        let user = users::insert(&self.state.db, &new_user).await.unwrap();
        let token = self.state.tokens.issue(user.id);
        (user, token)
    }

    pub async fn token_for(&self, username: &str, role: Role) -> String {
        self.user(username, role).await.1
    }

    pub async fn term(&self, taxonomy: Taxonomy, name: &str, slug: &str) {
        terms::insert(&self.state.db, taxonomy, name, slug)
            .await
            .unwrap();
    }

    /// Create a title through the API as an admin; returns its id.
    pub async fn title(&self, admin: &str, name: &str, year: i32, genres: &[&str]) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/titles/",
                Some(admin),
                json!({ "name": name, "year": year, "genre": genres }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Confirmation code from the last mail sent to `email`.
    pub fn code_for(&self, email: &str) -> String {
        let mail = self.mailer.last_to(email).expect("no mail sent");
        mail.body
            .rsplit(": ")
            .next()
            .expect("mail body carries a code")
            .trim()
            .to_string()
    }
}

pub fn field_of(body: &Value) -> &str {
    body["error"]["details"][0]["field"].as_str().unwrap_or_default()
}

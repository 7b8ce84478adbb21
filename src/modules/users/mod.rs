//! Accounts: admin management under `/users/` and the caller's own profile
//! under `/users/me/`.

pub mod models;
pub mod repo;
mod routes;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use verdict_kernel::{InitCtx, Migration, Module};

use crate::state::AppState;

pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let user_ref = json!({ "$ref": "#/components/schemas/User" });
        let error_ref = json!({ "$ref": "#/components/schemas/ErrorResponse" });
        let username_param = json!({
            "name": "username",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/users/": {
                    "get": {
                        "summary": "List users (admin)",
                        "tags": ["Users"],
                        "parameters": [
                            { "name": "search", "in": "query", "required": false, "schema": { "type": "string" } },
                            { "name": "page", "in": "query", "required": false, "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": { "description": "Page of users" },
                            "401": { "description": "Not authenticated", "content": { "application/json": { "schema": error_ref } } },
                            "403": { "description": "Not an admin", "content": { "application/json": { "schema": error_ref } } }
                        }
                    },
                    "post": {
                        "summary": "Create a user (admin)",
                        "tags": ["Users"],
                        "requestBody": { "content": { "application/json": { "schema": user_ref } } },
                        "responses": {
                            "201": { "description": "Created", "content": { "application/json": { "schema": user_ref } } },
                            "400": { "description": "Validation error", "content": { "application/json": { "schema": error_ref } } }
                        }
                    }
                },
                "/users/me/": {
                    "get": {
                        "summary": "Own profile",
                        "tags": ["Users"],
                        "responses": {
                            "200": { "description": "Profile", "content": { "application/json": { "schema": user_ref } } },
                            "401": { "description": "Not authenticated", "content": { "application/json": { "schema": error_ref } } }
                        }
                    },
                    "patch": {
                        "summary": "Update own profile (role is read-only)",
                        "tags": ["Users"],
                        "requestBody": { "content": { "application/json": { "schema": user_ref } } },
                        "responses": {
                            "200": { "description": "Profile", "content": { "application/json": { "schema": user_ref } } },
                            "400": { "description": "Validation error", "content": { "application/json": { "schema": error_ref } } }
                        }
                    }
                },
                "/users/{username}/": {
                    "get": {
                        "summary": "Get a user (admin)",
                        "tags": ["Users"],
                        "parameters": [username_param],
                        "responses": {
                            "200": { "description": "User", "content": { "application/json": { "schema": user_ref } } },
                            "404": { "description": "Not found", "content": { "application/json": { "schema": error_ref } } }
                        }
                    },
                    "patch": {
                        "summary": "Update a user (admin)",
                        "tags": ["Users"],
                        "parameters": [username_param],
                        "requestBody": { "content": { "application/json": { "schema": user_ref } } },
                        "responses": {
                            "200": { "description": "User", "content": { "application/json": { "schema": user_ref } } }
                        }
                    },
                    "delete": {
                        "summary": "Delete a user (admin)",
                        "tags": ["Users"],
                        "parameters": [username_param],
                        "responses": { "204": { "description": "Deleted" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "maxLength": 150 },
                            "email": { "type": "string", "format": "email", "maxLength": 254 },
                            "first_name": { "type": "string", "maxLength": 150 },
                            "last_name": { "type": "string", "maxLength": 150 },
                            "bio": { "type": "string" },
                            "role": { "type": "string", "enum": ["user", "moderator", "admin"] }
                        },
                        "required": ["username", "email"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE users (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    username     TEXT NOT NULL UNIQUE CHECK (username <> ''),
                    email        TEXT NOT NULL UNIQUE CHECK (email <> ''),
                    first_name   TEXT NOT NULL DEFAULT '',
                    last_name    TEXT NOT NULL DEFAULT '',
                    bio          TEXT NOT NULL DEFAULT '',
                    role         TEXT NOT NULL DEFAULT 'user'
                                 CHECK (role IN ('user', 'moderator', 'admin')),
                    is_superuser INTEGER NOT NULL DEFAULT 0,
                    last_login   TEXT,
                    date_joined  TEXT NOT NULL
                );
                "#,
        }]
    }
}

/// Create a new instance of the users module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UsersModule::new(state))
}

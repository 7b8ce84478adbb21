//! Reviews of titles and the comment threads under them. Anyone may read;
//! authors, moderators and admins may change what was written.

pub mod models;
pub mod repo;
mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use verdict_kernel::{InitCtx, Migration, Module};

use crate::state::AppState;

pub struct ReviewsModule {
    state: AppState,
}

impl ReviewsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let review_ref = json!({ "$ref": "#/components/schemas/Review" });
        let comment_ref = json!({ "$ref": "#/components/schemas/Comment" });
        let error_ref = json!({ "$ref": "#/components/schemas/ErrorResponse" });
        let id_param = |name: &str| {
            json!({ "name": name, "in": "path", "required": true, "schema": { "type": "integer" } })
        };
        let page_param = json!({
            "name": "page", "in": "query", "required": false, "schema": { "type": "integer" }
        });
        let review_params = json!([id_param("title_id"), id_param("review_id")]);
        let comment_params =
            json!([id_param("title_id"), id_param("review_id"), id_param("comment_id")]);
        let not_found = json!({
            "description": "Title, review or comment not found",
            "content": { "application/json": { "schema": error_ref } }
        });
        let forbidden = json!({
            "description": "Not the author, a moderator or an admin",
            "content": { "application/json": { "schema": error_ref } }
        });

        Some(json!({
            "paths": {
                "/titles/{title_id}/reviews/": {
                    "get": {
                        "summary": "List a title's reviews",
                        "tags": ["Reviews"],
                        "parameters": [id_param("title_id"), page_param],
                        "responses": { "200": { "description": "Page of reviews" }, "404": not_found }
                    },
                    "post": {
                        "summary": "Review a title (once per author)",
                        "tags": ["Reviews"],
                        "security": [{ "bearer": [] }],
                        "parameters": [id_param("title_id")],
                        "requestBody": { "content": { "application/json": { "schema": review_ref } } },
                        "responses": {
                            "201": { "description": "Created", "content": { "application/json": { "schema": review_ref } } },
                            "400": { "description": "Invalid or duplicate review", "content": { "application/json": { "schema": error_ref } } },
                            "404": not_found
                        }
                    }
                },
                "/titles/{title_id}/reviews/{review_id}/": {
                    "get": {
                        "summary": "Get a review",
                        "tags": ["Reviews"],
                        "parameters": review_params,
                        "responses": { "200": { "description": "Review", "content": { "application/json": { "schema": review_ref } } }, "404": not_found }
                    },
                    "patch": {
                        "summary": "Update a review",
                        "tags": ["Reviews"],
                        "security": [{ "bearer": [] }],
                        "parameters": review_params,
                        "requestBody": { "content": { "application/json": { "schema": review_ref } } },
                        "responses": { "200": { "description": "Review", "content": { "application/json": { "schema": review_ref } } }, "403": forbidden }
                    },
                    "delete": {
                        "summary": "Delete a review",
                        "tags": ["Reviews"],
                        "security": [{ "bearer": [] }],
                        "parameters": review_params,
                        "responses": { "204": { "description": "Deleted" }, "403": forbidden }
                    }
                },
                "/titles/{title_id}/reviews/{review_id}/comments/": {
                    "get": {
                        "summary": "List a review's comments",
                        "tags": ["Comments"],
                        "parameters": [id_param("title_id"), id_param("review_id"), page_param],
                        "responses": { "200": { "description": "Page of comments" }, "404": not_found }
                    },
                    "post": {
                        "summary": "Comment on a review",
                        "tags": ["Comments"],
                        "security": [{ "bearer": [] }],
                        "parameters": review_params,
                        "requestBody": { "content": { "application/json": { "schema": comment_ref } } },
                        "responses": {
                            "201": { "description": "Created", "content": { "application/json": { "schema": comment_ref } } },
                            "404": not_found
                        }
                    }
                },
                "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/": {
                    "get": {
                        "summary": "Get a comment",
                        "tags": ["Comments"],
                        "parameters": comment_params,
                        "responses": { "200": { "description": "Comment", "content": { "application/json": { "schema": comment_ref } } }, "404": not_found }
                    },
                    "patch": {
                        "summary": "Update a comment",
                        "tags": ["Comments"],
                        "security": [{ "bearer": [] }],
                        "parameters": comment_params,
                        "requestBody": { "content": { "application/json": { "schema": comment_ref } } },
                        "responses": { "200": { "description": "Comment", "content": { "application/json": { "schema": comment_ref } } }, "403": forbidden }
                    },
                    "delete": {
                        "summary": "Delete a comment",
                        "tags": ["Comments"],
                        "security": [{ "bearer": [] }],
                        "parameters": comment_params,
                        "responses": { "204": { "description": "Deleted" }, "403": forbidden }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "readOnly": true },
                            "text": { "type": "string", "minLength": 1 },
                            "author": { "type": "string", "readOnly": true },
                            "score": { "type": "integer", "minimum": 1, "maximum": 10 },
                            "pub_date": { "type": "string", "format": "date-time", "readOnly": true }
                        },
                        "required": ["text", "score"]
                    },
                    "Comment": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "readOnly": true },
                            "text": { "type": "string", "minLength": 1 },
                            "author": { "type": "string", "readOnly": true },
                            "pub_date": { "type": "string", "format": "date-time", "readOnly": true }
                        },
                        "required": ["text"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE reviews (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    title_id  INTEGER NOT NULL REFERENCES titles (id) ON DELETE CASCADE,
                    author_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                    text      TEXT NOT NULL CHECK (text <> ''),
                    score     INTEGER NOT NULL CHECK (score BETWEEN 1 AND 10),
                    pub_date  TEXT NOT NULL,
                    CONSTRAINT reviews_author_title_unique UNIQUE (author_id, title_id)
                );
                CREATE INDEX reviews_title_idx ON reviews (title_id, pub_date);

                CREATE TABLE comments (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    review_id INTEGER NOT NULL REFERENCES reviews (id) ON DELETE CASCADE,
                    author_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                    text      TEXT NOT NULL CHECK (text <> ''),
                    pub_date  TEXT NOT NULL
                );
                CREATE INDEX comments_review_idx ON comments (review_id, pub_date);
                "#,
        }]
    }
}

pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(ReviewsModule::new(state))
}

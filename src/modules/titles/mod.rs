//! Titles: the reviewable works, classified by one category and any number
//! of genres, with a rating derived from their reviews.

pub mod models;
pub mod repo;
mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use verdict_kernel::{InitCtx, Migration, Module};

use crate::state::AppState;

pub struct TitlesModule {
    state: AppState,
}

impl TitlesModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for TitlesModule {
    fn name(&self) -> &'static str {
        "titles"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "titles module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let title_ref = json!({ "$ref": "#/components/schemas/Title" });
        let write_ref = json!({ "$ref": "#/components/schemas/TitleWrite" });
        let error_ref = json!({ "$ref": "#/components/schemas/ErrorResponse" });
        let id_param = json!({
            "name": "title_id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer" }
        });
        let query_param = |name: &str, kind: &str| {
            json!({ "name": name, "in": "query", "required": false, "schema": { "type": kind } })
        };

        Some(json!({
            "paths": {
                "/titles/": {
                    "get": {
                        "summary": "List titles",
                        "tags": ["Titles"],
                        "parameters": [
                            query_param("category", "string"),
                            query_param("genre", "string"),
                            query_param("name", "string"),
                            query_param("year", "integer"),
                            query_param("page", "integer")
                        ],
                        "responses": { "200": { "description": "Page of titles" } }
                    },
                    "post": {
                        "summary": "Create a title (admin)",
                        "tags": ["Titles"],
                        "security": [{ "bearer": [] }],
                        "requestBody": { "content": { "application/json": { "schema": write_ref } } },
                        "responses": {
                            "201": { "description": "Created", "content": { "application/json": { "schema": title_ref } } },
                            "400": { "description": "Validation error", "content": { "application/json": { "schema": error_ref } } }
                        }
                    }
                },
                "/titles/{title_id}/": {
                    "get": {
                        "summary": "Get a title",
                        "tags": ["Titles"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "Title", "content": { "application/json": { "schema": title_ref } } },
                            "404": { "description": "Not found", "content": { "application/json": { "schema": error_ref } } }
                        }
                    },
                    "patch": {
                        "summary": "Update a title (admin)",
                        "tags": ["Titles"],
                        "security": [{ "bearer": [] }],
                        "parameters": [id_param],
                        "requestBody": { "content": { "application/json": { "schema": write_ref } } },
                        "responses": {
                            "200": { "description": "Title", "content": { "application/json": { "schema": title_ref } } }
                        }
                    },
                    "delete": {
                        "summary": "Delete a title (admin)",
                        "tags": ["Titles"],
                        "security": [{ "bearer": [] }],
                        "parameters": [id_param],
                        "responses": { "204": { "description": "Deleted" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Title": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" },
                            "year": { "type": "integer" },
                            "rating": { "type": ["number", "null"] },
                            "description": { "type": "string" },
                            "genre": { "type": "array", "items": { "$ref": "#/components/schemas/Genre" } },
                            "category": {
                                "oneOf": [{ "$ref": "#/components/schemas/Category" }, { "type": "null" }]
                            }
                        }
                    },
                    "TitleWrite": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "maxLength": 256 },
                            "year": { "type": "integer" },
                            "description": { "type": "string" },
                            "genre": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                            "category": { "type": ["string", "null"] }
                        },
                        "required": ["name", "year", "genre"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE titles (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    name        TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 256),
                    year        INTEGER NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    category_id INTEGER REFERENCES categories (id) ON DELETE SET NULL,
                    created     TEXT NOT NULL
                );
                CREATE INDEX titles_created_idx ON titles (created);
                CREATE INDEX titles_category_idx ON titles (category_id);

                CREATE TABLE title_genres (
                    title_id INTEGER NOT NULL REFERENCES titles (id) ON DELETE CASCADE,
                    genre_id INTEGER NOT NULL REFERENCES genres (id) ON DELETE CASCADE,
                    PRIMARY KEY (title_id, genre_id)
                );
                CREATE INDEX title_genres_genre_idx ON title_genres (genre_id);
                "#,
        }]
    }
}

pub fn create_module(state: AppState) -> Arc<dyn Module> {
    Arc::new(TitlesModule::new(state))
}

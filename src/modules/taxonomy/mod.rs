//! Categories and genres. Both are flat slug-keyed vocabularies with the
//! same rules, so one module type serves each under its own table.

pub mod models;
pub mod repo;
mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use verdict_kernel::{InitCtx, Migration, Module};

use crate::state::AppState;
use models::Taxonomy;

pub struct TaxonomyModule {
    taxonomy: Taxonomy,
    state: AppState,
}

impl TaxonomyModule {
    pub fn new(taxonomy: Taxonomy, state: AppState) -> Self {
        Self { taxonomy, state }
    }
}

#[async_trait]
impl Module for TaxonomyModule {
    fn name(&self) -> &'static str {
        self.taxonomy.table()
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "taxonomy module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.taxonomy)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let table = self.taxonomy.table();
        let schema = self.taxonomy.schema_name();
        let term_ref = json!({ "$ref": format!("#/components/schemas/{schema}") });
        let error_ref = json!({ "$ref": "#/components/schemas/ErrorResponse" });
        let tag = [schema];

        let mut paths = serde_json::Map::new();
        paths.insert(
            format!("/{table}/"),
            json!({
                "get": {
                    "summary": format!("List {table}"),
                    "tags": tag,
                    "parameters": [
                        { "name": "search", "in": "query", "required": false, "schema": { "type": "string" } },
                        { "name": "page", "in": "query", "required": false, "schema": { "type": "integer" } }
                    ],
                    "responses": { "200": { "description": format!("Page of {table}") } }
                },
                "post": {
                    "summary": format!("Create a {} (admin)", self.taxonomy.singular()),
                    "tags": tag,
                    "security": [{ "bearer": [] }],
                    "requestBody": { "content": { "application/json": { "schema": term_ref } } },
                    "responses": {
                        "201": { "description": "Created", "content": { "application/json": { "schema": term_ref } } },
                        "400": { "description": "Validation error", "content": { "application/json": { "schema": error_ref } } },
                        "403": { "description": "Not an admin", "content": { "application/json": { "schema": error_ref } } }
                    }
                }
            }),
        );
        paths.insert(
            format!("/{table}/{{slug}}/"),
            json!({
                "delete": {
                    "summary": format!("Delete a {} (admin)", self.taxonomy.singular()),
                    "tags": tag,
                    "security": [{ "bearer": [] }],
                    "parameters": [
                        { "name": "slug", "in": "path", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": { "description": "Not found", "content": { "application/json": { "schema": error_ref } } }
                    }
                }
            }),
        );

        let mut schemas = serde_json::Map::new();
        schemas.insert(
            schema.to_string(),
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "maxLength": 256 },
                    "slug": { "type": "string", "maxLength": 50, "pattern": "^[-a-zA-Z0-9_]+$" }
                },
                "required": ["name", "slug"]
            }),
        );

        Some(json!({ "paths": paths, "components": { "schemas": schemas } }))
    }

    fn migrations(&self) -> Vec<Migration> {
        let up = match self.taxonomy {
            Taxonomy::Categories => {
                r#"
                CREATE TABLE categories (
                    id   INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 256),
                    slug TEXT NOT NULL UNIQUE CHECK (length(slug) BETWEEN 1 AND 50)
                );
                "#
            }
            Taxonomy::Genres => {
                r#"
                CREATE TABLE genres (
                    id   INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 256),
                    slug TEXT NOT NULL UNIQUE CHECK (length(slug) BETWEEN 1 AND 50)
                );
                "#
            }
        };
        vec![Migration { id: "001_init", up }]
    }
}

pub fn create_module(taxonomy: Taxonomy, state: AppState) -> Arc<dyn Module> {
    Arc::new(TaxonomyModule::new(taxonomy, state))
}

//! Confirmation-code signup and token exchange.

pub mod models;
mod routes;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use verdict_kernel::{settings::MailBackend, InitCtx, Module};

use crate::state::AppState;

pub struct AuthModule {
    state: AppState,
}

impl AuthModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            mail_backend = ?ctx.settings.mail.backend,
            "auth module initialized"
        );
        if ctx.settings.mail.backend == MailBackend::Log {
            tracing::warn!(
                module = self.name(),
                "confirmation codes are written to the log, not delivered"
            );
        }
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_ref = json!({ "$ref": "#/components/schemas/ErrorResponse" });

        Some(json!({
            "paths": {
                "/auth/signup/": {
                    "post": {
                        "summary": "Register or re-request a confirmation code",
                        "tags": ["Auth"],
                        "requestBody": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SignupRequest" } } } },
                        "responses": {
                            "200": { "description": "Code sent", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SignupRequest" } } } },
                            "400": { "description": "Validation error", "content": { "application/json": { "schema": error_ref } } }
                        }
                    }
                },
                "/auth/token/": {
                    "post": {
                        "summary": "Exchange a confirmation code for an access token",
                        "tags": ["Auth"],
                        "requestBody": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/TokenRequest" } } } },
                        "responses": {
                            "200": { "description": "Access token", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/TokenResponse" } } } },
                            "400": { "description": "Invalid code", "content": { "application/json": { "schema": error_ref } } },
                            "404": { "description": "Unknown user", "content": { "application/json": { "schema": error_ref } } }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "SignupRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "maxLength": 150 },
                            "email": { "type": "string", "format": "email", "maxLength": 254 }
                        },
                        "required": ["username", "email"]
                    },
                    "TokenRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "confirmation_code": { "type": "string" }
                        },
                        "required": ["username", "confirmation_code"]
                    },
                    "TokenResponse": {
                        "type": "object",
                        "properties": { "token": { "type": "string" } },
                        "required": ["token"]
                    }
                }
            }
        }))
    }
}

/// Create a new instance of the auth module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthModule::new(state))
}

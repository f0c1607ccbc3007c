//! `POST /api/auth/attempt` - credential exchange
//!
//! Looks the email up in the optional database pool, verifies the stored
//! password hash, and answers with a freshly issued bearer token. The
//! database is an opaque collaborator: with no pool configured every email
//! is reported as unregistered.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::cipher::password_verify;
use crate::controller::{reply, Controller, ControllerConfig, EngineResponse};
use crate::error::EngineError;
use crate::token::Token;

/// Verbs this controller accepts.
#[must_use]
pub fn verbs() -> Vec<Method> {
    vec![Method::POST]
}

/// Build the controller.
#[must_use]
pub fn make() -> Arc<Controller> {
    let rules: BTreeMap<String, String> = [
        ("*", "is_object"),
        ("email", "is_string"),
        ("password", "is_string"),
    ]
    .into_iter()
    .map(|(attribute, rule)| (attribute.to_string(), rule.to_string()))
    .collect();

    Controller::make(
        |state, request, _params, _auth| {
            Box::pin(async move {
                let body = request.json()?;
                let email = body["email"].as_str().unwrap_or_default().to_string();
                let password = body["password"].as_str().unwrap_or_default().to_string();

                let Some(pool) = state.database_pool() else {
                    return Ok(unknown_email());
                };

                let row: Option<(Uuid, String)> =
                    sqlx::query_as("SELECT id, password FROM users WHERE email = $1")
                        .bind(&email)
                        .fetch_optional(pool)
                        .await
                        .map_err(EngineError::from)?;

                let Some((id, hash)) = row else {
                    return Ok(unknown_email());
                };

                if !password_verify(&password, &hash) {
                    return Ok(wrong_password());
                }

                let token = Token::issue(id, state.key())?;
                Ok(reply::json(
                    StatusCode::OK,
                    &json!({ "data": { "token": token.as_bearer() } }),
                ))
            })
        },
        ControllerConfig {
            validated: true,
            rules,
            ..ControllerConfig::default()
        },
    )
}

fn unknown_email() -> EngineResponse {
    reply::json(
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({
            "message": "The given data was invalid.",
            "errors": { "email": ["The email isn't registered."] },
        }),
    )
}

fn wrong_password() -> EngineResponse {
    reply::json(
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({
            "message": "The given data was invalid.",
            "errors": { "password": ["The password is incorrect."] },
        }),
    )
}

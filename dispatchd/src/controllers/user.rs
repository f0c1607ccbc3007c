//! `GET /api/user` - identity of the authenticated caller

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::json;

use crate::controller::{reply, Controller, ControllerConfig};
use crate::error::EngineError;

/// Verbs this controller accepts.
#[must_use]
pub fn verbs() -> Vec<Method> {
    vec![Method::GET]
}

/// Build the controller.
#[must_use]
pub fn make() -> Arc<Controller> {
    Controller::make(
        |_state, _request, _params, auth| {
            Box::pin(async move {
                let token = auth.token().ok_or_else(|| {
                    EngineError::Other(anyhow::anyhow!("authentication context missing"))
                })?;
                Ok(reply::json(
                    StatusCode::OK,
                    &json!({ "data": { "id": token.sub().to_string() } }),
                ))
            })
        },
        ControllerConfig {
            authenticated: true,
            ..ControllerConfig::default()
        },
    )
}

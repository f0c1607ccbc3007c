//! `GET /api/queues` - registered queues

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::{json, Value};

use crate::controller::{reply, Controller, ControllerConfig};

/// Verbs this controller accepts.
#[must_use]
pub fn verbs() -> Vec<Method> {
    vec![Method::GET]
}

/// Build the controller.
#[must_use]
pub fn make() -> Arc<Controller> {
    Controller::make(
        |state, _request, _params, _auth| {
            Box::pin(async move {
                let queues: Vec<Value> = state
                    .queues()
                    .into_iter()
                    .map(|(name, queue)| {
                        json!({ "id": queue.id().to_string(), "name": name })
                    })
                    .collect();

                Ok(reply::json(StatusCode::OK, &json!({ "data": queues })))
            })
        },
        ControllerConfig {
            authenticated: true,
            ..ControllerConfig::default()
        },
    )
}

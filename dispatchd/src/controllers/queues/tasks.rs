//! `GET /api/queues/{queue_name}/tasks` - registered tasks of one queue

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
        |state, _request, params, _auth| {
            Box::pin(async move {
                let queue_name = params.get("queue_name").cloned().unwrap_or_default();
                if !state.queue_exists(&queue_name) {
                    return Ok(reply::empty(StatusCode::NOT_FOUND));
                }

                let queue = state.get_queue(&queue_name);
                let tasks: Vec<Value> = queue
                    .tasks()
                    .into_iter()
                    .map(|task| {
                        json!({ "id": task.id().to_string(), "name": task.name() })
                    })
                    .collect();

                Ok(reply::json(StatusCode::OK, &json!({ "data": tasks })))
            })
        },
        ControllerConfig {
            authenticated: true,
            ..ControllerConfig::default()
        },
    )
}

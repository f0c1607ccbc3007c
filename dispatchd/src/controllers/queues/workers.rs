//! `GET /api/queues/{queue_name}/workers` - worker pool of one queue

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
                let workers: Vec<Value> = queue
                    .workers()
                    .into_iter()
                    .map(|worker| {
                        json!({
                            "id": worker.id().to_string(),
                            "number_of_tasks": worker.number_of_tasks(),
                        })
                    })
                    .collect();

                Ok(reply::json(StatusCode::OK, &json!({ "data": workers })))
            })
        },
        ControllerConfig {
            authenticated: true,
            ..ControllerConfig::default()
        },
    )
}

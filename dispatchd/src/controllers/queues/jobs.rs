//! `GET /api/queues/{queue_name}/jobs` - dispatched jobs of one queue

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
                let jobs: Vec<Value> = queue
                    .jobs()
                    .into_iter()
                    .map(|job| {
                        json!({
                            "id": job.id().to_string(),
                            "task_id": job.task().id().to_string(),
                        })
                    })
                    .collect();

                Ok(reply::json(StatusCode::OK, &json!({ "data": jobs })))
            })
        },
        ControllerConfig {
            authenticated: true,
            ..ControllerConfig::default()
        },
    )
}

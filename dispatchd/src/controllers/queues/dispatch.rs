//! `POST /api/queues/{queue_name}/dispatch` - submit one job

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{Method, StatusCode};

use crate::controller::{reply, Controller, ControllerConfig};
use crate::error::EngineError;

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
        ("task", "is_string"),
        ("data", "is_object"),
    ]
    .into_iter()
    .map(|(attribute, rule)| (attribute.to_string(), rule.to_string()))
    .collect();

    Controller::make(
        |state, request, params, _auth| {
            Box::pin(async move {
                let queue_name = params.get("queue_name").cloned().unwrap_or_default();
                let body = request.json()?;
                let task = body["task"].as_str().unwrap_or_default().to_string();

                if !state.queue_exists(&queue_name) {
                    return Ok(reply::empty(StatusCode::NOT_FOUND));
                }

                let queue = state.get_queue(&queue_name);
                match queue.dispatch(&task, body["data"].clone()) {
                    Ok(job) => {
                        tracing::debug!(queue = %queue_name, task = %task, job = %job.id(), "job dispatched");
                        Ok(reply::empty(StatusCode::OK))
                    }
                    Err(EngineError::TaskNotFound(_)) => Ok(reply::empty(StatusCode::NOT_FOUND)),
                    Err(error) => Err(error),
                }
            })
        },
        ControllerConfig {
            authenticated: true,
            validated: true,
            rules,
        },
    )
}

//! `GET /api/status` - liveness probe

use std::sync::Arc;

use http::{Method, StatusCode};

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
        |_state, _request, _params, _auth| Box::pin(async move { Ok(reply::empty(StatusCode::OK)) }),
        ControllerConfig::default(),
    )
}

//! Controllers and their policy records
//!
//! A controller is a boxed async callback plus the policy the kernel
//! enforces before invoking it: whether the caller must be authenticated and
//! whether (and how) the body must validate.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::request::Parts;
use http::Response;
use http_body_util::Full;
use serde_json::Value;

use crate::error::EngineError;
use crate::routing::PathParams;
use crate::state::State;
use crate::token::Token;

/// The response type every controller produces.
pub type EngineResponse = Response<Full<Bytes>>;

/// Controller callback signature.
pub type ControllerCallback = Arc<
    dyn Fn(
            Arc<State>,
            EngineRequest,
            PathParams,
            Auth,
        ) -> BoxFuture<'static, Result<EngineResponse, EngineError>>
        + Send
        + Sync,
>;

/// An incoming request with its body already collected.
#[derive(Debug)]
pub struct EngineRequest {
    /// Request line and headers.
    pub parts: Parts,
    /// The collected body bytes.
    pub body: Bytes,
}

impl EngineRequest {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, EngineError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| EngineError::Parse(format!("invalid json body: {err}")))
    }
}

/// Authentication context carried into controllers.
///
/// Populated by the kernel's authentication gate when the controller's
/// policy requires it; empty otherwise.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    token: Option<Token>,
}

impl Auth {
    /// Attach a verified token.
    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    /// The verified token, when the route required authentication.
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

/// Controller policy: what the kernel must enforce before dispatching.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Require a verified bearer token.
    pub authenticated: bool,
    /// Parse and validate the body before dispatch.
    pub validated: bool,
    /// Attribute name → comma-separated rule expression.
    pub rules: BTreeMap<String, String>,
}

/// A request handler plus its policy record.
pub struct Controller {
    callback: ControllerCallback,
    config: ControllerConfig,
}

impl Controller {
    /// Build a controller from a plain function or closure.
    pub fn make<C>(callback: C, config: ControllerConfig) -> Arc<Self>
    where
        C: Fn(
                Arc<State>,
                EngineRequest,
                PathParams,
                Auth,
            ) -> BoxFuture<'static, Result<EngineResponse, EngineError>>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            callback: Arc::new(callback),
            config,
        })
    }

    /// The handler callback.
    #[must_use]
    pub fn callback(&self) -> &ControllerCallback {
        &self.callback
    }

    /// The policy record.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

/// Response construction helpers shared by the kernel and the controllers.
pub mod reply {
    use http::header::CONTENT_TYPE;
    use http::StatusCode;

    use super::{Bytes, EngineResponse, Full, Value};

    /// An empty-body response with `status`.
    #[must_use]
    pub fn empty(status: StatusCode) -> EngineResponse {
        http::Response::builder()
            .status(status)
            .body(Full::new(Bytes::new()))
            .expect("static response construction cannot fail")
    }

    /// A JSON response with `status`.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> EngineResponse {
        http::Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .expect("static response construction cannot fail")
    }
}

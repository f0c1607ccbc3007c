//! The per-request pipeline
//!
//! One pass per request: CORS preflight, route lookup, validation gate,
//! authentication gate, controller dispatch, response adornment, error
//! mapping. This is the only layer that catches broadly - controllers and
//! components propagate freely and anything unclassified becomes a `500`.

use std::sync::Arc;

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION,
};
use http::{HeaderValue, Method, StatusCode};
use serde_json::{json, Value};

use crate::controller::{reply, Auth, EngineRequest, EngineResponse};
use crate::error::EngineError;
use crate::state::State;
use crate::token::Token;
use crate::validator::Validation;

const ALLOW_HEADERS: &str = "Accept,Authorization,Content-Type";
const INVALID_MESSAGE: &str = "The given data was invalid.";
const INVALID_JSON: &str = "The payload must be a valid json value.";

/// Drive one request through the pipeline and produce its response.
///
/// Never fails: every error path maps to a response, and every response that
/// leaves here carries `Access-Control-Allow-Origin: *`.
pub async fn kernel(state: Arc<State>, request: EngineRequest) -> EngineResponse {
    if request.parts.method == Method::OPTIONS {
        return preflight(&state, &request);
    }

    let path = request.parts.uri.path().to_string();
    let Ok((params, route)) = state.router().find(&request.parts.method, &path) else {
        return with_origin(reply::empty(StatusCode::NOT_FOUND));
    };

    let config = route.controller().config().clone();

    if config.validated {
        let Ok(body) = request.json() else {
            return with_origin(invalid(json!({ "*": [INVALID_JSON] })));
        };
        let validation = Validation::make(&config.rules, &body);
        if !validation.success() {
            return with_origin(invalid(Value::Object(validation.into_errors())));
        }
    }

    let mut auth = Auth::default();
    if config.authenticated {
        let bearer = request
            .parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if bearer.is_empty() {
            return with_origin(reply::empty(StatusCode::UNAUTHORIZED));
        }
        match Token::verify(bearer, state.key()) {
            Ok(token) => auth.set_token(token),
            Err(_) => return with_origin(reply::empty(StatusCode::UNAUTHORIZED)),
        }
    }

    let callback = Arc::clone(route.controller().callback());
    match callback(state, request, params, auth).await {
        Ok(response) => with_origin(response),
        Err(EngineError::NotFound) => with_origin(reply::empty(StatusCode::NOT_FOUND)),
        Err(error) => {
            tracing::error!(%path, error = %error, "controller failed");
            with_origin(reply::empty(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn preflight(state: &State, request: &EngineRequest) -> EngineResponse {
    let methods = state.router().methods_of(request.parts.uri.path()).join(",");
    let mut response = reply::empty(StatusCode::NO_CONTENT);
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_str(&methods).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn invalid(errors: Value) -> EngineResponse {
    reply::json(
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({ "message": INVALID_MESSAGE, "errors": errors }),
    )
}

fn with_origin(mut response: EngineResponse) -> EngineResponse {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::controller::{Controller, ControllerConfig};
    use crate::routing::Route;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn request(method: Method, path: &str, body: &str) -> EngineRequest {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .unwrap()
            .into_parts();
        EngineRequest {
            parts,
            body: Bytes::from(body.to_string()),
        }
    }

    fn request_with_auth(method: Method, path: &str, bearer: &str) -> EngineRequest {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(path)
            .header(AUTHORIZATION, bearer)
            .body(())
            .unwrap()
            .into_parts();
        EngineRequest {
            parts,
            body: Bytes::new(),
        }
    }

    async fn body_json(response: EngineResponse) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn test_state() -> Arc<State> {
        let state = Arc::new(State::new(&EngineConfig::default()));

        state.router().add(
            Route::new(
                vec![Method::GET],
                "/api/status",
                Controller::make(
                    |_state, _request, _params, _auth| {
                        Box::pin(async move { Ok(reply::empty(StatusCode::OK)) })
                    },
                    ControllerConfig::default(),
                ),
            )
            .unwrap(),
        );

        state.router().add(
            Route::new(
                vec![Method::GET],
                "/api/user",
                Controller::make(
                    |_state, _request, _params, auth: Auth| {
                        Box::pin(async move {
                            let sub = auth.token().map(Token::sub).unwrap_or_default();
                            Ok(reply::json(
                                StatusCode::OK,
                                &json!({"data": {"id": sub.to_string()}}),
                            ))
                        })
                    },
                    ControllerConfig {
                        authenticated: true,
                        ..ControllerConfig::default()
                    },
                ),
            )
            .unwrap(),
        );

        let mut rules = BTreeMap::new();
        rules.insert("*".to_string(), "is_object".to_string());
        rules.insert("email".to_string(), "is_string".to_string());
        rules.insert("password".to_string(), "is_string".to_string());
        state.router().add(
            Route::new(
                vec![Method::POST],
                "/api/auth/attempt",
                Controller::make(
                    |_state, _request, _params, _auth| {
                        Box::pin(async move { Ok(reply::empty(StatusCode::OK)) })
                    },
                    ControllerConfig {
                        validated: true,
                        rules,
                        ..ControllerConfig::default()
                    },
                ),
            )
            .unwrap(),
        );

        state.router().add(
            Route::new(
                vec![Method::GET],
                "/system_error",
                Controller::make(
                    |_state, _request, _params, _auth| {
                        Box::pin(async move { Err(anyhow::anyhow!("boom").into()) })
                    },
                    ControllerConfig::default(),
                ),
            )
            .unwrap(),
        );

        state
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_preflight_lists_allowed_methods() {
        let state = test_state();
        let response = kernel(state, request(Method::OPTIONS, "/api/status", "")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            ALLOW_HEADERS
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_preflight_on_unknown_path_has_empty_methods() {
        let state = test_state();
        let response = kernel(state, request(Method::OPTIONS, "/not-found", "")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ""
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unmatched_route_is_404_with_origin() {
        let state = test_state();
        let response = kernel(state, request(Method::GET, "/missing", "")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_validation_gate_rejects_invalid_json() {
        let state = test_state();
        let response = kernel(state, request(Method::POST, "/api/auth/attempt", "")).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "The given data was invalid.",
                "errors": {"*": ["The payload must be a valid json value."]},
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_validation_gate_reports_missing_attributes() {
        let state = test_state();
        let response = kernel(state, request(Method::POST, "/api/auth/attempt", "{}")).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "The given data was invalid.",
                "errors": {
                    "email": ["Attribute email is required."],
                    "password": ["Attribute password is required."],
                },
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auth_gate_rejects_missing_header() {
        let state = test_state();
        let response = kernel(state, request(Method::GET, "/api/user", "")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auth_gate_rejects_malformed_bearer() {
        let state = test_state();
        let response = kernel(
            state,
            request_with_auth(Method::GET, "/api/user", "Bearer not.a.token"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auth_gate_accepts_valid_token() {
        let state = test_state();
        let sub = Uuid::new_v4();
        let bearer = Token::issue(sub, state.key()).unwrap().as_bearer();

        let response = kernel(
            Arc::clone(&state),
            request_with_auth(Method::GET, "/api/user", &bearer),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"data": {"id": sub.to_string()}})
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller_errors_map_to_500() {
        let state = test_state();
        let response = kernel(state, request(Method::GET, "/system_error", "")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}

//! Compiled path templates

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use regex::Regex;

use crate::controller::Controller;
use crate::error::EngineError;

/// Parameter bindings captured from a matched path.
pub type PathParams = HashMap<String, String>;

/// A verb set, a compiled path template and the controller it targets.
///
/// Templates mix literal segments with `{name}` parameter tokens; a
/// parameter matches one or more of `[A-Za-z0-9_-]`. Parameter names must be
/// unique within one template. The compiled expression is anchored, so a
/// template only ever matches the full path.
pub struct Route {
    signature: String,
    expression: Regex,
    parameters: Vec<String>,
    verbs: Vec<Method>,
    controller: Arc<Controller>,
}

impl Route {
    /// Compile `signature` and build a route for `verbs`.
    ///
    /// Fails with [`EngineError::Parse`] when a parameter name repeats.
    pub fn new(
        verbs: Vec<Method>,
        signature: impl Into<String>,
        controller: Arc<Controller>,
    ) -> Result<Self, EngineError> {
        let signature = signature.into();
        let (expression, parameters) = Self::compile(&signature)?;
        Ok(Self {
            signature,
            expression,
            parameters,
            verbs,
            controller,
        })
    }

    fn compile(signature: &str) -> Result<(Regex, Vec<String>), EngineError> {
        let mut pattern = String::from("^");
        let mut parameters = Vec::new();
        let mut rest = signature;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));

            let name = &rest[open + 1..close];
            if parameters.iter().any(|existing| existing == name) {
                return Err(EngineError::Parse(format!(
                    "duplicated route parameter: {name}"
                )));
            }
            parameters.push(name.to_string());
            pattern.push_str(r"([a-zA-Z0-9\-_]+)");

            rest = &rest[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let expression = Regex::new(&pattern)
            .map_err(|err| EngineError::Parse(format!("invalid route template: {err}")))?;
        Ok((expression, parameters))
    }

    /// Match `path` against the compiled template.
    ///
    /// Returns `(true, bindings)` with one binding per declared parameter,
    /// in declaration order, or `(false, {})` when the path is rejected.
    #[must_use]
    pub fn matches(&self, path: &str) -> (bool, PathParams) {
        let mut bindings = PathParams::new();
        let Some(captures) = self.expression.captures(path) else {
            return (false, bindings);
        };

        bindings.reserve(self.parameters.len());
        for (index, name) in self.parameters.iter().enumerate() {
            if let Some(capture) = captures.get(index + 1) {
                bindings.insert(name.clone(), capture.as_str().to_string());
            }
        }
        (true, bindings)
    }

    /// The raw template this route was built from.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Verbs this route accepts.
    #[must_use]
    pub fn verbs(&self) -> &[Method] {
        &self.verbs
    }

    /// Declared parameter names, in template order.
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// The controller this route dispatches to.
    #[must_use]
    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{reply, ControllerConfig};
    use http::StatusCode;

    fn noop_controller() -> Arc<Controller> {
        Controller::make(
            |_state, _request, _params, _auth| {
                Box::pin(async move { Ok(reply::empty(StatusCode::OK)) })
            },
            ControllerConfig::default(),
        )
    }

    #[test]
    fn test_literal_route_matches_exactly() {
        let route = Route::new(vec![Method::GET], "/api/status", noop_controller()).unwrap();
        let (matched, bindings) = route.matches("/api/status");
        assert!(matched);
        assert!(bindings.is_empty());

        let (matched, _) = route.matches("/api/status/extra");
        assert!(!matched);
        let (matched, _) = route.matches("/api");
        assert!(!matched);
    }

    #[test]
    fn test_parameter_binding() {
        let route =
            Route::new(vec![Method::GET], "/parameters/{1}/{2}/{3}", noop_controller()).unwrap();

        let (matched, bindings) = route.matches("/parameters/4/5/6");
        assert!(matched);
        assert_eq!(bindings.get("1").map(String::as_str), Some("4"));
        assert_eq!(bindings.get("2").map(String::as_str), Some("5"));
        assert_eq!(bindings.get("3").map(String::as_str), Some("6"));

        let (matched, bindings) = route.matches("/parameters/7/8");
        assert!(!matched);
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_parameter_grammar() {
        let route =
            Route::new(vec![Method::GET], "/queues/{queue_name}/jobs", noop_controller()).unwrap();

        let (matched, bindings) = route.matches("/queues/mailer-01_a/jobs");
        assert!(matched);
        assert_eq!(
            bindings.get("queue_name").map(String::as_str),
            Some("mailer-01_a")
        );

        // Slashes and empty segments are not parameter material
        assert!(!route.matches("/queues//jobs").0);
        assert!(!route.matches("/queues/a/b/jobs").0);
        assert!(!route.matches("/queues/a%20b/jobs").0);
    }

    #[test]
    fn test_duplicate_parameters_are_a_construction_error() {
        let result = Route::new(vec![Method::GET], "/a/{id}/b/{id}", noop_controller());
        assert!(matches!(result, Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_trailing_literal_after_parameter() {
        let route = Route::new(vec![Method::GET], "/files/{name}.txt", noop_controller()).unwrap();
        // `.` in the literal tail must be escaped, not treated as a wildcard
        assert!(route.matches("/files/notes.txt").0);
        assert!(!route.matches("/files/notesxtxt").0);
    }
}

//! Insertion-ordered route resolution

use std::sync::Arc;

use http::Method;
use parking_lot::RwLock;

use crate::error::EngineError;
use crate::routing::route::{PathParams, Route};

/// An ordered sequence of routes; first match wins.
///
/// `add` takes `&self` so routes can be installed through a shared router
/// with call chaining:
///
/// ```rust,ignore
/// router.add(status)?.add(user)?.add(attempt)?;
/// ```
#[derive(Default)]
pub struct Router {
    routes: RwLock<Vec<Arc<Route>>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; insertion order defines resolution order.
    pub fn add(&self, route: Route) -> &Self {
        self.routes.write().push(Arc::new(route));
        self
    }

    /// Snapshot of the installed routes, in insertion order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.read().clone()
    }

    /// Resolve `(verb, path)` to the first route whose template matches and
    /// whose verb set contains `verb`.
    pub fn find(&self, verb: &Method, path: &str) -> Result<(PathParams, Arc<Route>), EngineError> {
        for route in self.routes.read().iter() {
            let (matched, params) = route.matches(path);
            if matched && route.verbs().contains(verb) {
                return Ok((params, Arc::clone(route)));
            }
        }
        Err(EngineError::NotFound)
    }

    /// Verbs of the first route whose template matches `path`, ignoring the
    /// request verb. Feeds the CORS preflight `Access-Control-Allow-Methods`
    /// header; empty when nothing matches.
    #[must_use]
    pub fn methods_of(&self, path: &str) -> Vec<String> {
        for route in self.routes.read().iter() {
            let (matched, _) = route.matches(path);
            if matched {
                return route
                    .verbs()
                    .iter()
                    .map(|verb| verb.as_str().to_string())
                    .collect();
            }
        }
        Vec::new()
    }
}

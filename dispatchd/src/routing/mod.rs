//! Route templates and request routing
//!
//! A [`Route`] compiles a brace-delimited path template into an anchored
//! matcher; a [`Router`] resolves `(verb, path)` pairs against its routes in
//! insertion order.

mod route;
mod router;

pub use route::{PathParams, Route};
pub use router::Router;

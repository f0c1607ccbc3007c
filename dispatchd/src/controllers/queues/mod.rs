//! Queue inspection and dispatch endpoints
//!
//! All of these require authentication. The list endpoints answer `404`
//! empty when the named queue does not exist; looking a queue up through
//! these controllers never creates one.

pub mod dispatch;
pub mod index;
pub mod jobs;
pub mod tasks;
pub mod workers;

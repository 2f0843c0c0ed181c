//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request tracing with status and latency)
//! 3. `Actor` extractor on mutating routes (caller identity)

pub mod actor;

pub use actor::{ACTOR_HEADER, Actor, ROLE_HEADER};

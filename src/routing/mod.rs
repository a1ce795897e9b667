//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, url)
//!     → mux.rs (entries in registration order)
//!         → middleware: url starts with prefix → run, stop if sent
//!         → route: method + matcher.rs pattern → bind params, run, stop
//!     → 404 "Page Not found" if nothing responded
//!
//! Route Compilation (at startup):
//!     "GET /users/:id/*"
//!     → handle_func splits method and pattern
//!     → matcher.rs compiles segments
//!     → Mux frozen behind Arc when served or mounted
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path
//! - Deterministic: same input always matches same entry
//! - First match wins (registration order)

pub mod handler;
pub mod matcher;
pub mod mux;

pub use handler::{handler_fn, Handler, HandlerFn};
pub use matcher::{RoutePattern, WILDCARD};
pub use mux::{Mux, RouteError, StripPrefix};

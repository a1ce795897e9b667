//! Ready-made middleware for a `Mux`.
//!
//! ```text
//! Mux entry (prefix) → ServeDir    (static assets, GET only)
//!                    → AuthContext (resolver → request extensions)
//! ```

pub mod auth;
pub mod static_files;

pub use auth::AuthContext;
pub use static_files::ServeDir;

//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns such as
//! tracing and authentication.

pub mod sync_secret;
pub mod trace;

pub use sync_secret::SyncSecret;
pub use trace::Trace;

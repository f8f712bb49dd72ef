//! Domain primitives and aggregates for the proxy fleet control plane.
//!
//! Purpose: define strongly typed domain entities used by the API and
//! persistence layers, and the pure business logic (compiler, lifecycle
//! guards, fleet identity) that must not depend on HTTP or Diesel. Keep
//! types immutable where practical and document invariants and
//! serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`] -- transport-agnostic error payload.
//! - [`User`] / [`Role`] -- operator account identity and authorisation.
//! - [`auth::LoginCredentials`] -- validated email/password inputs.
//! - [`authentication::AuthenticationService`] -- login, bearer verification, logout.
//! - [`config`] -- configurations, rules and the lifecycle state machine.
//! - [`compiler`] -- pure compilation of configurations into ATS artefacts.
//! - [`fleet`] -- proxy registry and sync protocol wire types.
//! - [`audit`] -- audit log entries.
//! - [`janitor`] -- periodic offline/log/stats sweeps.

pub mod audit;
pub mod auth;
pub mod authentication;
pub mod compiler;
pub mod config;
pub mod error;
pub mod fleet;
pub mod ids;
pub mod janitor;
pub mod lifecycle;
pub mod ports;
pub mod user;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::user::{Email, Role, User, UserId, UserValidationError};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use backend::domain::{DomainResult, Error};
///
/// fn sample_operation() -> DomainResult<()> {
///     Err(Error::not_found("missing"))
/// }
/// ```
pub type DomainResult<T> = Result<T, Error>;

//! Error types for setup-time registration and request-time handling.
//!
//! Setup errors ([`RouteError`]) fail fast when a route or middleware is
//! registered. Request-time errors travel as [`anyhow::Error`] out of handlers and
//! middleware; the central error handler downcasts to [`HttpError`] to recover a
//! status code.

use http::{Method, StatusCode};
use std::fmt;

/// Error returned while registering routes, groups or middleware.
///
/// None of these are ever produced at request time: a router that was built
/// without error serves every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The route template cannot be parsed
    MalformedTemplate {
        /// The offending template
        path: String,
        /// Short description of the problem
        reason: &'static str,
    },
    /// A catch-all segment is followed by more path
    CatchAllNotLast {
        /// The offending template
        path: String,
    },
    /// The same method and template shape is already registered
    ///
    /// Templates that only differ in parameter names (`/a/:x` vs `/a/:y`) are
    /// the same shape.
    DuplicateRoute {
        /// HTTP method of the rejected registration
        method: Method,
        /// Template of the rejected registration
        path: String,
        /// Template that already owns the slot
        existing: String,
    },
    /// A route table referenced a handler name that is not registered
    UnknownHandler(String),
    /// A route table referenced a middleware name that is not registered
    UnknownMiddleware(String),
    /// A route table contained a method that is not a valid HTTP token
    InvalidMethod(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::MalformedTemplate { path, reason } => {
                write!(f, "malformed route template '{path}': {reason}")
            }
            RouteError::CatchAllNotLast { path } => {
                write!(
                    f,
                    "malformed route template '{path}': catch-all segment must be the last segment"
                )
            }
            RouteError::DuplicateRoute {
                method,
                path,
                existing,
            } => {
                write!(
                    f,
                    "duplicate route {method} {path}: conflicts with already registered '{existing}'"
                )
            }
            RouteError::UnknownHandler(name) => write!(f, "unknown handler '{name}'"),
            RouteError::UnknownMiddleware(name) => write!(f, "unknown middleware '{name}'"),
            RouteError::InvalidMethod(method) => write!(f, "invalid HTTP method '{method}'"),
        }
    }
}

impl std::error::Error for RouteError {}

/// Typed HTTP error returned by handlers and middleware.
///
/// The default error handler maps it to its status code and message. Any other
/// error becomes a `500`.
///
/// ```
/// use radix_dispatch::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::NOT_FOUND);
/// assert_eq!(err.message(), "Not Found");
///
/// let err = HttpError::with_message(StatusCode::CONFLICT, "pet already exists");
/// assert_eq!(err.to_string(), "pet already exists");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    code: StatusCode,
    message: String,
}

impl HttpError {
    /// Create an error whose message is the canonical reason phrase
    #[must_use]
    pub fn new(code: StatusCode) -> Self {
        Self {
            code,
            message: code.canonical_reason().unwrap_or("Unknown Status").to_string(),
        }
    }

    /// Create an error with a custom message
    #[must_use]
    pub fn with_message(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Replace the status code, keeping the message
    pub fn set_code(&mut self, code: StatusCode) {
        self.code = code;
    }

    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Error raised by the response helpers on [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// `redirect` was called with a status outside 300..=308
    InvalidRedirectCode(StatusCode),
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::InvalidRedirectCode(code) => {
                write!(f, "invalid redirect status code {}", code.as_u16())
            }
        }
    }
}

impl std::error::Error for ResponseError {}

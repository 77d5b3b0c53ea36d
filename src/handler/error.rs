//! Defines the error type carried by failed handlers.

use std::fmt;

use hyper::StatusCode;

/// Describes an error which occurred while a handler was running.
///
/// The error carries the status code the router will respond with if no
/// catcher converts it into a response. Any error type convertible into
/// `anyhow::Error` can become a `HandlerError` with `?`; the status defaults
/// to 500 and can be adjusted with [`with_status`](HandlerError::with_status).
pub struct HandlerError {
    status: StatusCode,
    cause: anyhow::Error,
}

impl<E> From<E> for HandlerError
where
    E: Into<anyhow::Error> + fmt::Display,
{
    fn from(error: E) -> Self {
        HandlerError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            cause: error.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler error ({}): {}", self.status, self.cause)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("status", &self.status)
            .field("cause", &self.cause)
            .finish()
    }
}

impl HandlerError {
    /// Creates a `HandlerError` from a plain message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        HandlerError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            cause: anyhow::Error::msg(message),
        }
    }

    /// Returns this error with the given response status instead of the
    /// default 500.
    pub fn with_status(self, status: StatusCode) -> Self {
        HandlerError { status, ..self }
    }

    /// The status code the router responds with if no catcher intervenes.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Borrows the underlying cause.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

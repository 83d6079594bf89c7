use crate::Version;
use std::{io, net::SocketAddr};
use thiserror::Error;

/// Fatal errors raised while constructing the listening socket.
///
/// Each variant aborts [`ServerBuilder::build`](crate::ServerBuilder::build);
/// no connection is ever accepted after one of these.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The OS refused to create the socket.
    #[error("could not create socket: {0}")]
    SocketCreation(#[source] io::Error),
    /// `SO_REUSEADDR` (or switching to non-blocking mode) failed.
    #[error("could not set socket option: {0}")]
    SocketOption(#[source] io::Error),
    /// The address could not be bound, typically because it is already in use.
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The listen queue could not be set up.
    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),
}

/// Per-request failures. Every variant is answered with
/// `500 Internal Server Error` and the connection keeps being served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The method token is not one of `GET`, `POST`, `PUT`, `DELETE`.
    #[error("unrecognized method `{0}`")]
    UnknownMethod(String),
    /// The request bytes are not valid UTF-8.
    #[error("request is not valid UTF-8")]
    InvalidEncoding,
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// A route handler could not produce its content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler returned an error value.
    #[error("handler failed: {0}")]
    Failed(String),
    /// The handler panicked; the worker survived.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wraps any displayable error as a handler failure.
    #[inline]
    pub fn failed<E: std::fmt::Display>(err: E) -> Self {
        HandlerError::Failed(err.to_string())
    }
}

/// Responses the dispatch layer writes on its own, without a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    NotFound,
    TooManyRequests,
    Internal,
    ServiceUnavailable,
}

macro_rules! http_errors {
    ($($name:ident: $status_code:expr, $len:literal => $body:literal; )*) => {
        pub(crate) const fn as_http(&self, version: Version) -> &'static [u8] {
            match (self, version) { $(
                (Self::$name, Version::Http10) => concat!(
                    "HTTP/1.0 ", $status_code, "\r\n",
                    "Content-Type: text/plain\r\n",
                    "Content-Length: ", $len, "\r\n",
                    "Connection: close\r\n",
                    "\r\n",
                    $body
                ),
                (Self::$name, Version::Http11 | Version::Unknown) => concat!(
                    "HTTP/1.1 ", $status_code, "\r\n",
                    "Content-Type: text/plain\r\n",
                    "Content-Length: ", $len, "\r\n",
                    "Connection: close\r\n",
                    "\r\n",
                    $body
                ),
            )* }.as_bytes()
        }
    };
}

impl ErrorKind {
    http_errors! {
        NotFound: "404 Not Found", "15" => "Route not found";
        TooManyRequests: "429 Too Many Requests", "17" => "Too many requests";
        Internal: "500 Internal Server Error", "21" => "Internal server error";
        ServiceUnavailable: "503 Service Unavailable", "19" => "Service unavailable";
    }
}

impl From<&DispatchError> for ErrorKind {
    fn from(_: &DispatchError) -> Self {
        ErrorKind::Internal
    }
}

//! Handler replies and the wire form of successful responses.

use crate::{
    errors::HandlerError,
    http::types::{StatusCode, Version},
    limits::RespLimits,
};
use std::{fmt::Display, io::Write};

/// Content produced by a route handler.
///
/// The dispatch layer always answers `200 OK` unless the handler picks
/// another status itself, as a `POST` handler does with
/// [`Reply::created`].
///
/// # Examples
/// ```
/// use pool_web::{Reply, StatusCode};
///
/// let reply = Reply::created("stored");
/// assert_eq!(reply.status(), StatusCode::Created);
/// assert_eq!(reply.body(), "stored");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: StatusCode,
    body: String,
}

impl Reply {
    /// A `200 OK` reply.
    #[inline]
    pub fn ok<B: Into<String>>(body: B) -> Self {
        Self::with_status(StatusCode::Ok, body)
    }

    /// A `201 Created` reply.
    #[inline]
    pub fn created<B: Into<String>>(body: B) -> Self {
        Self::with_status(StatusCode::Created, body)
    }

    /// A reply with an explicit status.
    #[inline]
    pub fn with_status<B: Into<String>>(status: StatusCode, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Conversion from a handler's return value into a [`Reply`].
///
/// Implemented for plain strings (answered `200 OK`), for [`Reply`], and
/// for `Result`s of those whose error is displayable. An `Err` becomes a
/// [`HandlerError`] and is answered `500 Internal Server Error`.
///
/// # Examples
/// ```
/// use pool_web::{IntoReply, Reply};
///
/// assert_eq!("Hello".into_reply().unwrap(), Reply::ok("Hello"));
///
/// let failed: Result<String, std::num::ParseIntError> = "x".parse::<u8>().map(|n| n.to_string());
/// assert!(failed.into_reply().is_err());
/// ```
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, HandlerError>;
}

impl IntoReply for Reply {
    #[inline]
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(self)
    }
}

impl IntoReply for String {
    #[inline]
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::ok(self))
    }
}

impl IntoReply for &'static str {
    #[inline]
    fn into_reply(self) -> Result<Reply, HandlerError> {
        Ok(Reply::ok(self))
    }
}

impl<T: IntoReply, E: Display> IntoReply for Result<T, E> {
    #[inline]
    fn into_reply(self) -> Result<Reply, HandlerError> {
        self.map_err(HandlerError::failed)?.into_reply()
    }
}

/// Per-connection response buffer, reused between requests.
#[derive(Debug)]
pub(crate) struct Response {
    buffer: Vec<u8>,
}

impl Response {
    #[inline]
    pub(crate) fn new(limits: &RespLimits) -> Self {
        Self {
            buffer: Vec::with_capacity(limits.default_capacity),
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self, limits: &RespLimits) {
        if self.buffer.capacity() > limits.max_capacity {
            self.buffer = Vec::with_capacity(limits.default_capacity);
        } else {
            self.buffer.clear();
        }
    }

    #[inline]
    pub(crate) fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Serializes `reply` as a complete response.
    pub(crate) fn write_reply(&mut self, version: Version, reply: &Reply, keep_alive: bool) {
        let connection = match keep_alive {
            true => "keep-alive",
            false => "close",
        };

        self.buffer
            .extend_from_slice(version.response_prefix().as_bytes());
        self.buffer
            .extend_from_slice(reply.status.status_line_suffix().as_bytes());
        self.buffer
            .extend_from_slice(b"Content-Type: text/plain\r\n");
        // Writing into a Vec cannot fail
        let _ = write!(self.buffer, "Content-Length: {}\r\n", reply.body.len());
        let _ = write!(self.buffer, "Connection: {connection}\r\n\r\n");
        self.buffer.extend_from_slice(reply.body.as_bytes());
    }
}

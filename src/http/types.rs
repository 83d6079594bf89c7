//! Method, version and status code types

use crate::errors::DispatchError;
use std::fmt;

// METHOD

/// HTTP request methods accepted by the router
///
/// Matching is case-sensitive: `get` or `Get` are rejected the same way
/// as `PATCH` or `FOO`. All four methods are routed identically; the
/// handler decides what each one means for its path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`, typically paired with a [`Created`](StatusCode::Created) reply
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Classifies a method token taken from the request line.
    ///
    /// # Examples
    /// ```
    /// use pool_web::Method;
    ///
    /// assert_eq!(Method::from_token("PUT").unwrap(), Method::Put);
    /// assert!(Method::from_token("put").is_err());
    /// ```
    #[inline]
    pub fn from_token(src: &str) -> Result<Self, DispatchError> {
        match src.as_bytes() {
            b"GET" => Ok(Method::Get),
            b"POST" => Ok(Method::Post),
            b"PUT" => Ok(Method::Put),
            b"DELETE" => Ok(Method::Delete),
            _ => Err(DispatchError::UnknownMethod(src.to_owned())),
        }
    }

    /// Returns the canonical token for this method.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

/// HTTP protocol version as announced on the request line
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// HTTP/1.0 - persistent only when the client asks for `keep-alive`
    ///
    /// [RFC 1945](https://tools.ietf.org/html/rfc1945)
    Http10,

    /// HTTP/1.1 - persistent unless the client asks for `close`
    ///
    /// [RFC 7230](https://tools.ietf.org/html/rfc7230) and related
    Http11,

    /// Any other token, including an empty one. Never kept alive.
    Unknown,
}

impl Version {
    #[inline]
    pub(crate) fn from_token(src: &str) -> Self {
        match src.as_bytes() {
            b"HTTP/1.1" => Self::Http11,
            b"HTTP/1.0" => Self::Http10,
            _ => Self::Unknown,
        }
    }

    /// Version written on the status line of a response to this request.
    #[inline]
    pub(crate) const fn response_prefix(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 | Self::Unknown => "HTTP/1.1",
        }
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// HTTP status codes emitted by the server
        ///
        /// Only the codes this server can put on the wire.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            $name = $num,
        )+ }

        impl StatusCode {
            // Returns the status line without the version prefix (e.g., `" 200 OK\r\n"`).
            #[inline]
            pub(crate) const fn status_line_suffix(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => concat!(" ", $num, " ", $str, "\r\n"),
                )+ }
            }

            /// Returns the reason phrase (e.g., `"Not Found"`).
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }
        }
    }
}

set_status_codes! {
    /// Default for every handler reply.
    Ok = (200, "OK");
    /// Never produced by the dispatch layer; a handler opts in with
    /// [`Reply::created`](crate::Reply::created).
    Created = (201, "Created");
    /// No route for the `(method, path)` pair.
    NotFound = (404, "Not Found");
    /// The client address connected again before the minimum interval
    /// [[RFC6585, Section 4](https://datatracker.ietf.org/doc/html/rfc6585#section-4)]
    TooManyRequests = (429, "Too Many Requests");
    /// Unknown method, undecodable request, or a failing handler.
    InternalServerError = (500, "Internal Server Error");
    /// The bounded dispatch queue is full.
    ServiceUnavailable = (503, "Service Unavailable");
}

impl StatusCode {
    /// Numeric value of the code.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tokens() {
        #[rustfmt::skip]
        let cases = [
            ("GET", Some(Method::Get)),
            ("POST", Some(Method::Post)),
            ("PUT", Some(Method::Put)),
            ("DELETE", Some(Method::Delete)),
            ("get", None),
            ("HEAD", None),
            ("PATCH", None),
            ("FOO", None),
            ("", None),
        ];

        for (token, result) in cases {
            match result {
                Some(method) => {
                    assert_eq!(Method::from_token(token), Ok(method));
                    assert_eq!(method.as_str(), token);
                }
                None => assert_eq!(
                    Method::from_token(token),
                    Err(DispatchError::UnknownMethod(token.to_string()))
                ),
            }
        }
    }

    #[test]
    fn version_tokens() {
        assert_eq!(Version::from_token("HTTP/1.1"), Version::Http11);
        assert_eq!(Version::from_token("HTTP/1.0"), Version::Http10);
        assert_eq!(Version::from_token("HTTP/2"), Version::Unknown);
        assert_eq!(Version::from_token("http/1.1"), Version::Unknown);
        assert_eq!(Version::from_token(""), Version::Unknown);

        assert_eq!(Version::Http10.response_prefix(), "HTTP/1.0");
        assert_eq!(Version::Unknown.response_prefix(), "HTTP/1.1");
    }

    #[test]
    fn status_lines() {
        let cases = [
            (StatusCode::Ok, " 200 OK\r\n"),
            (StatusCode::Created, " 201 Created\r\n"),
            (StatusCode::NotFound, " 404 Not Found\r\n"),
            (StatusCode::TooManyRequests, " 429 Too Many Requests\r\n"),
            (StatusCode::InternalServerError, " 500 Internal Server Error\r\n"),
            (StatusCode::ServiceUnavailable, " 503 Service Unavailable\r\n"),
        ];

        for (status, line) in cases {
            assert_eq!(status.status_line_suffix(), line);
        }
        assert_eq!(StatusCode::TooManyRequests.as_u16(), 429);
        assert_eq!(StatusCode::NotFound.reason(), "Not Found");
    }
}

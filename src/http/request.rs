//! Request framing: one read in, one [`Request`] out.
//!
//! The framing assumption is that a single read off the socket carries a
//! complete request. There is no streaming parser and nothing is carried
//! over between reads.

use crate::{errors::DispatchError, http::types::Version};
use memchr::{memchr, memmem};
use std::collections::HashMap;

const HEADERS_END: &[u8] = b"\r\n\r\n";

/// A parsed request.
///
/// The method token is kept as received; it is classified into a
/// [`Method`](crate::Method) by the connection loop, so that an unknown
/// method is a dispatch error rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    method: String,
    path: String,
    version: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Request {
    /// Parses the bytes of one read.
    ///
    /// Fails only when the bytes are not valid UTF-8.
    ///
    /// # Examples
    /// ```
    /// use pool_web::Request;
    ///
    /// let req = Request::parse(b"GET /x HTTP/1.1\r\nConnection: close\r\n\r\nBODY").unwrap();
    ///
    /// assert_eq!(req.method(), "GET");
    /// assert_eq!(req.path(), "/x");
    /// assert_eq!(req.header("connection"), Some("close"));
    /// assert_eq!(req.body(), "BODY");
    /// ```
    pub fn parse(raw: &[u8]) -> Result<Self, DispatchError> {
        let text = simdutf8::basic::from_utf8(raw).map_err(|_| DispatchError::InvalidEncoding)?;

        let mut req = Request::default();
        let mut lines = Lines::new(text);

        if let Some(first_line) = lines.next() {
            req.parse_first_line(first_line);
        }

        for line in lines {
            if line.is_empty() {
                break;
            }
            req.parse_header(line);
        }

        req.body = memmem::find(raw, HEADERS_END)
            .map(|pos| text[pos + HEADERS_END.len()..].to_owned())
            .unwrap_or_default();

        Ok(req)
    }

    #[inline]
    fn parse_first_line(&mut self, line: &str) {
        let mut tokens = line.split_ascii_whitespace();

        self.method = tokens.next().unwrap_or_default().to_owned();
        self.path = tokens.next().unwrap_or_default().to_owned();
        self.version = tokens.next().unwrap_or_default().to_owned();
    }

    #[inline]
    fn parse_header(&mut self, line: &str) {
        let Some((name, value)) = line.split_once(':') else {
            return;
        };

        self.headers
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
    }
}

// Getters
impl Request {
    /// Method token exactly as received, possibly empty.
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path token exactly as received, possibly empty.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Version token exactly as received, possibly empty.
    #[inline]
    pub fn version_str(&self) -> &str {
        &self.version
    }

    /// Classified protocol version.
    #[inline]
    pub fn version(&self) -> Version {
        Version::from_token(&self.version)
    }

    /// Looks up a header by its lowercase name.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers, keys lowercased and values trimmed.
    #[inline]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Everything after the first blank line.
    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the response to this request should announce a persistent
    /// connection.
    ///
    /// - `HTTP/1.1`: yes, unless `Connection: close`
    /// - `HTTP/1.0`: only with `Connection: keep-alive`
    /// - anything else: no
    ///
    /// This only decides the `Connection` response header. The connection
    /// loop itself keeps reading until the peer stops sending.
    #[inline]
    pub fn is_keep_alive(&self) -> bool {
        let connection = self.header("connection").unwrap_or_default();

        match self.version() {
            Version::Http11 => connection != "close",
            Version::Http10 => connection == "keep-alive",
            Version::Unknown => false,
        }
    }
}

// Splits on `\n`, dropping one trailing `\r` from each line.
struct Lines<'a> {
    rest: Option<&'a str>,
}

impl<'a> Lines<'a> {
    #[inline]
    fn new(text: &'a str) -> Self {
        Self { rest: Some(text) }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;

        let line = match memchr(b'\n', rest.as_bytes()) {
            Some(end) => {
                self.rest = Some(&rest[end + 1..]);
                &rest[..end]
            }
            None => {
                self.rest = None;
                rest
            }
        };

        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}

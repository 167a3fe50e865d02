//! HTTP/1.1 request decoder and response encoder.
//!
//! Only the request head is read; the file service has no route that
//! takes a body.
//!
//! ```text
//! GET /download?file=%2Fdiagnostico_1200.txt HTTP/1.1\r\n
//! Host: 192.168.4.1\r\n
//! \r\n
//! ```
//!
//! The decoder accumulates bytes until the blank line and yields one
//! [`Request`].  A single socket read may carry part of the head or all of
//! it.

use core::fmt;
use core::fmt::Write as _;

/// Request heads larger than this are rejected.
pub const MAX_HEAD_SIZE: usize = 2048;

const HEAD_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Other(s) => s,
        }
    }
}

/// A decoded request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    /// Form-url-decoded query pairs, in order.
    pub query: Vec<(String, String)>,
}

impl Request {
    /// First value of query parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No blank line within [`MAX_HEAD_SIZE`] bytes.
    HeadTooLarge,
    /// The request line is not `METHOD SP target SP HTTP/x.y`.
    Malformed,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeadTooLarge => write!(f, "request head exceeds {MAX_HEAD_SIZE} bytes"),
            Self::Malformed => write!(f, "malformed request line"),
        }
    }
}

/// Streaming request-head decoder.
pub struct RequestDecoder {
    buf: Vec<u8>,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(512),
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns `Ok(Some(_))` once the head is complete, `Ok(None)` while
    /// more bytes are needed.  Bytes after the head are ignored.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<Request>, DecodeError> {
        // Re-scan from a few bytes back so a terminator split across
        // reads is still found.
        let scan_from = self.buf.len().saturating_sub(HEAD_END.len() - 1);
        self.buf.extend_from_slice(data);

        let Some(pos) = find(&self.buf[scan_from..], HEAD_END).map(|p| p + scan_from) else {
            if self.buf.len() > MAX_HEAD_SIZE {
                return Err(DecodeError::HeadTooLarge);
            }
            return Ok(None);
        };

        if pos + HEAD_END.len() > MAX_HEAD_SIZE {
            return Err(DecodeError::HeadTooLarge);
        }
        parse_head(&self.buf[..pos]).map(Some)
    }

    /// Drop any buffered bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a request head (request line plus headers, without the blank line).
pub fn parse_head(head: &[u8]) -> Result<Request, DecodeError> {
    let text = core::str::from_utf8(head).map_err(|_| DecodeError::Malformed)?;
    let line = text.lines().next().ok_or(DecodeError::Malformed)?;

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::Malformed);
    };

    if method.is_empty() || !version.starts_with("HTTP/1.") || !target.starts_with('/') {
        return Err(DecodeError::Malformed);
    }

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    Ok(Request {
        method: Method::parse(method),
        path: path.to_string(),
        query: url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
    })
}

/// A response ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    /// Extra headers beyond `Content-Type`, `Content-Length` and `Connection`.
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn html(body: String) -> Self {
        Self::new(200, "text/html; charset=utf-8", body)
    }

    pub fn json(body: String) -> Self {
        Self::new(200, "application/json", body)
    }

    /// Plain-text response; used for every status message.
    pub fn text(status: u16, message: &str) -> Self {
        Self::new(status, "text/plain; charset=utf-8", message)
    }

    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Status line and headers, terminated by the blank line.
    pub fn encode_head(&self) -> String {
        let mut head = String::with_capacity(160);
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("Connection: close\r\n\r\n");
        head
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

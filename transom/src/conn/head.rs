//! Parses a buffered request head (request line + headers) with `httparse`.
//!
//! `try_parse_head` is called repeatedly by `conn::Connection::read_head` as
//! more bytes arrive, since `httparse` itself is happy to be re-invoked on a
//! growing buffer until it reports [`httparse::Status::Complete`].

use http::{HeaderMap, HeaderName, HeaderValue, Method, Version};

use crate::error::ProtocolError;

/// A fully-parsed request head, plus the number of leading bytes of the
/// input buffer it consumed (the caller splits those off before reading the
/// body that follows).
pub struct ParsedHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub consumed: usize,
}

/// Attempts to parse one request head from the front of `buf`.
///
/// Returns `Ok(None)` if `buf` does not yet contain a complete head (the
/// caller should read more bytes and retry). `max_headers_count` bounds the
/// number of header fields `httparse` will accept before treating the head
/// as malformed.
pub fn try_parse_head(buf: &[u8], max_headers_count: usize) -> Result<Option<ParsedHead>, ProtocolError> {
    let mut raw_headers = vec![httparse::EMPTY_HEADER; max_headers_count];
    let mut parsed = httparse::Request::new(&mut raw_headers);

    let consumed = match parsed.parse(buf) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::TooManyHeaders) => return Err(ProtocolError::TooManyHeaders),
        Err(_) => return Err(classify_parse_failure(buf)),
    };

    let method_str = parsed.method.ok_or(ProtocolError::MalformedHead)?;
    let method = Method::from_bytes(method_str.as_bytes()).map_err(|_| ProtocolError::MalformedHead)?;

    let target = parsed.path.ok_or(ProtocolError::MalformedHead)?.to_owned();

    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(ProtocolError::UnsupportedVersion),
    };

    let mut headers = HeaderMap::with_capacity(parsed.headers.len());
    for header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|_| ProtocolError::InvalidHeaderValue)?;
        let value = HeaderValue::from_bytes(header.value).map_err(|_| ProtocolError::InvalidHeaderValue)?;
        headers.append(name, value);
    }

    Ok(Some(ParsedHead {
        method,
        target,
        version,
        headers,
        consumed,
    }))
}

/// `httparse` collapses every parse failure into one opaque `Error`; this
/// recovers the one distinction the wire protocol actually cares about
/// (unsupported HTTP version vs. any other malformed head) by inspecting
/// the request-line text directly.
fn classify_parse_failure(buf: &[u8]) -> ProtocolError {
    let line_end = buf.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(buf.len());
    let line = &buf[..line_end];
    match std::str::from_utf8(line) {
        Ok(line) => match line.rsplit_once(' ') {
            Some((_, version)) if version.starts_with("HTTP/") && version != "HTTP/1.0" && version != "HTTP/1.1" => {
                ProtocolError::UnsupportedVersion
            }
            _ => ProtocolError::MalformedHead,
        },
        Err(_) => ProtocolError::MalformedHead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_get() {
        let buf = b"GET /hello?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let head = try_parse_head(buf, 64).unwrap().unwrap();
        assert_eq!(head.method, Method::GET);
        assert_eq!(head.target, "/hello?x=1");
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.headers.get("host").unwrap(), "example.com");
        assert_eq!(head.consumed, buf.len());
    }

    #[test]
    fn partial_head_asks_for_more_bytes() {
        let buf = b"GET / HTTP/1.1\r\nHost: example";
        assert!(try_parse_head(buf, 64).unwrap().is_none());
    }

    #[test]
    fn duplicate_headers_are_preserved_in_order() {
        let buf = b"GET / HTTP/1.1\r\nX-Tag: a\r\nX-Tag: b\r\n\r\n";
        let head = try_parse_head(buf, 64).unwrap().unwrap();
        let values: Vec<_> = head.headers.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn rejects_unsupported_version() {
        let buf = b"GET / HTTP/2.0\r\n\r\n";
        assert!(matches!(
            try_parse_head(buf, 64),
            Err(ProtocolError::UnsupportedVersion)
        ));
    }

    #[test]
    fn too_many_headers_is_rejected() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..10 {
            raw.push_str(&format!("X-Field-{i}: v\r\n"));
        }
        raw.push_str("\r\n");
        assert!(matches!(
            try_parse_head(raw.as_bytes(), 4),
            Err(ProtocolError::TooManyHeaders)
        ));
    }
}

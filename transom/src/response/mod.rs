//! The outbound response: a status, a header map, and one of the three
//! body shapes described in `response::body`.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

pub mod body;

pub use body::{BodyProducer, BodyReceiver, BodySender, BodyStep, ResponseBody};

/// An outbound HTTP response.
///
/// `conn::write_response` is the only place that turns this into wire
/// bytes; it derives framing (`Content-Length` vs `Transfer-Encoding:
/// chunked`) from the `ResponseBody` variant rather than trusting
/// caller-supplied framing headers, so handlers never need to (and must
/// not) set `Content-Length`/`Transfer-Encoding` themselves.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Response {
            status,
            headers,
            body,
        }
    }

    /// A response with no body, for status codes like `204`/`304` or any
    /// other case where a handler has nothing to send back.
    pub fn empty(status: StatusCode) -> Self {
        Response::new(status, HeaderMap::new(), ResponseBody::Empty)
    }

    /// A response whose full body is already available in memory.
    pub fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response::new(status, headers, ResponseBody::Single(body.into()))
    }

    /// A response whose body is produced incrementally; see
    /// `response::body::BodyProducer`.
    pub fn streaming(status: StatusCode, content_type: &'static str, producer: BodyProducer) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response::new(status, headers, ResponseBody::Stream(producer))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_has_zero_content_length() {
        let r = Response::empty(StatusCode::NO_CONTENT);
        assert_eq!(r.body().content_length(), Some(0));
    }

    #[test]
    fn single_body_reports_its_length() {
        let r = Response::with_body(StatusCode::OK, "text/plain", "hello");
        assert_eq!(r.body().content_length(), Some(5));
    }
}

//! The inbound request: a parsed head plus a streaming body.

use http::{HeaderMap, Method, Version};

use crate::body::BodyReader;
use crate::uri::QueryParams;

/// A fully-parsed request head with a still-streaming body.
///
/// `target` is kept verbatim (for diagnostics/telemetry); `path` and
/// `query` are the split-out, percent-decoded-on-demand views produced by
/// `uri::parse_target`. Path parameters captured by the router are not
/// stored here — they live on `State`, since they are a property of the
/// *match*, not of the wire request.
pub struct Request {
    method: Method,
    target: String,
    path: String,
    query: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: BodyReader,
}

impl Request {
    pub fn new(
        method: Method,
        target: String,
        version: Version,
        headers: HeaderMap,
        body: BodyReader,
    ) -> Self {
        let (path, query) = {
            let parsed = crate::uri::parse_target(&target);
            (parsed.path.to_owned(), parsed.query.map(str::to_owned))
        };
        Request {
            method,
            target,
            path,
            query,
            version,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request-target exactly as sent on the wire.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The path portion of the target, percent-encoded (decode segments via
    /// `uri::decode_segments` when matching against the router).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Parses (and allocates) the query string on demand. Callers that hit
    /// this repeatedly per request should cache the result on `State`.
    pub fn query(&self) -> QueryParams {
        match &self.query {
            Some(raw) => QueryParams::parse(raw),
            None => QueryParams::default(),
        }
    }

    pub fn body_mut(&mut self) -> &mut BodyReader {
        &mut self.body
    }

    pub fn into_body(self) -> BodyReader {
        self.body
    }
}

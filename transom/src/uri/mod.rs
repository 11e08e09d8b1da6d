//! Splits a request target into path, query, and fragment, and provides a
//! lazily-decoded view over the query string.
//!
//! Percent-decoding is applied once, to each path segment, before the path
//! is handed to the router trie (see `router::tree`); the raw target string
//! itself is kept on `Request` unmodified for diagnostics/telemetry.

use percent_encoding::percent_decode_str;

mod query;

pub use query::QueryParams;

/// The three pieces of a request target, as defined by RFC 3986 ("origin
/// form" targets seen by an HTTP/1.1 server): `path[?query][#fragment]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

/// Splits `target` on the first `?` and `#`. A `#` found while scanning the
/// query terminates it, exactly as in a browser-originated URL: whichever
/// of `?`/`#` appears first determines whether a query is present at all.
pub fn parse_target(target: &str) -> Target<'_> {
    let (before_fragment, fragment) = match target.find('#') {
        Some(idx) => (&target[..idx], Some(&target[idx + 1..])),
        None => (target, None),
    };

    match before_fragment.find('?') {
        Some(idx) => Target {
            path: &before_fragment[..idx],
            query: Some(&before_fragment[idx + 1..]),
            fragment,
        },
        None => Target {
            path: before_fragment,
            query: None,
            fragment,
        },
    }
}

/// Error produced when a percent escape could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("malformed percent-encoding in request target")]
pub struct MalformedUri;

/// Splits a raw (still percent-encoded) path into its `/`-delimited
/// segments and percent-decodes each one.
///
/// A leading `/` is required and stripped. A trailing `/` (on any path
/// other than the bare root `/`) is preserved as an explicit empty final
/// segment, which the router trie represents as a literal empty-string
/// child — this is what makes `/x` and `/x/` distinguishable (see
/// `router::tree`).
pub fn decode_segments(path: &str) -> Result<Vec<String>, MalformedUri> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split('/')
        .map(|seg| {
            percent_decode_str(seg)
                .decode_utf8()
                .map(|cow| cow.into_owned())
                .map_err(|_| MalformedUri)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_query_fragment() {
        let t = parse_target("/a/b?x=1&y=2#frag");
        assert_eq!(t.path, "/a/b");
        assert_eq!(t.query, Some("x=1&y=2"));
        assert_eq!(t.fragment, Some("frag"));
    }

    #[test]
    fn fragment_inside_query_terminates_it() {
        let t = parse_target("/a?x=1#y=2");
        assert_eq!(t.query, Some("x=1"));
        assert_eq!(t.fragment, Some("y=2"));
    }

    #[test]
    fn no_query_or_fragment() {
        let t = parse_target("/a/b");
        assert_eq!(t.path, "/a/b");
        assert_eq!(t.query, None);
        assert_eq!(t.fragment, None);
    }

    #[test]
    fn decodes_and_splits_segments() {
        let segs = decode_segments("/%61ctivate/workflow5").unwrap();
        assert_eq!(segs, vec!["activate".to_string(), "workflow5".to_string()]);
    }

    #[test]
    fn root_has_no_segments() {
        assert!(decode_segments("/").unwrap().is_empty());
    }

    #[test]
    fn trailing_slash_is_explicit_empty_segment() {
        let segs = decode_segments("/x/").unwrap();
        assert_eq!(segs, vec!["x".to_string(), "".to_string()]);
    }
}

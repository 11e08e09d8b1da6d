//! Lazily-decoded query string parameters.

use percent_encoding::percent_decode_str;

/// A parsed `k=v&k2=v2` query string.
///
/// Repeated keys are preserved in order (all values for a key are kept, not
/// just the last). A key with no `=` maps to the empty string. Parsing is
/// deferred until a handler first asks for it (`QueryParams::parse`), then
/// cached on `Request` for the remainder of the request's processing.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses a raw (percent-encoded) query string.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return QueryParams::default();
        }
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (decode(k), decode(v)),
                None => (decode(pair), String::new()),
            })
            .collect();
        QueryParams { pairs }
    }

    /// The first value associated with `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values associated with `key`, in the order they appeared.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates all key/value pairs in the order they appeared.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8_lossy()
        .replace('+', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_keys_in_order() {
        let q = QueryParams::parse("a=1&b=2&a=3");
        assert_eq!(q.get("a"), Some("1"));
        assert_eq!(q.get_all("a").collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(q.get("b"), Some("2"));
    }

    #[test]
    fn key_with_no_equals_is_empty_string() {
        let q = QueryParams::parse("flag&b=2");
        assert_eq!(q.get("flag"), Some(""));
    }

    #[test]
    fn decodes_percent_escapes() {
        let q = QueryParams::parse("name=hello%20world");
        assert_eq!(q.get("name"), Some("hello world"));
    }
}

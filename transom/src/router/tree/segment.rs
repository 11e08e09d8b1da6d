//! Compiles a single textual path-pattern segment into a `SegmentKind`, and
//! defines the specificity ordering used to sort a node's children.

/// The kind of match a trie node performs against one path segment.
///
/// Ordered most-to-least specific; `Node::sort` relies on this `Ord` impl
/// (via a derived `Ord` over the discriminant) to place children in probe
/// order: `Static < PrefixSuffix < Param < Wildcard < Recursive`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentKind {
    /// Matched by exact string equality. Carries no capture.
    Static(String),

    /// `pre{name}` / `{name}.ext` — matches if the segment starts with
    /// `prefix` and ends with `suffix` (both may be empty, but not both at
    /// once — that would be a bare `Param`); captures the substring between
    /// them under `name`.
    PrefixSuffix {
        name: String,
        prefix: String,
        suffix: String,
    },

    /// `{name}` or `:name` — matches any single segment, captured under
    /// `name`.
    Param(String),

    /// `*` — matches any single segment; capture is anonymous/positional.
    Wildcard,

    /// `**` or `{name:path}` — matches all remaining segments (may be
    /// zero), consuming the rest of the path. `None` for `**`, `Some(name)`
    /// for `{name:path}`.
    Recursive(Option<String>),
}

impl SegmentKind {
    /// Compiles the textual form of one pattern segment (the part between
    /// two `/` characters in a route pattern).
    pub fn compile(raw: &str) -> SegmentKind {
        if raw == "**" {
            return SegmentKind::Recursive(None);
        }
        if raw == "*" {
            return SegmentKind::Wildcard;
        }
        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if let Some((name, modifier)) = inner.split_once(':') {
                if modifier == "path" {
                    return SegmentKind::Recursive(Some(name.to_owned()));
                }
            }
            return SegmentKind::Param(inner.to_owned());
        }
        if let Some(name) = raw.strip_prefix(':') {
            return SegmentKind::Param(name.to_owned());
        }
        if let Some((prefix, rest)) = raw.split_once('{') {
            if let Some((name, suffix)) = rest.split_once('}') {
                if !name.is_empty() {
                    return SegmentKind::PrefixSuffix {
                        name: name.to_owned(),
                        prefix: prefix.to_owned(),
                        suffix: suffix.to_owned(),
                    };
                }
            }
        }
        SegmentKind::Static(raw.to_owned())
    }

    /// Attempts to match `segment` against this kind, returning the
    /// captured value (if any). A `Static` match captures nothing and
    /// returns `Some("")`/ignored by the caller; callers should check the
    /// kind before deciding whether to record a capture.
    pub fn prefix_suffix_capture(&self, segment: &str) -> Option<String> {
        match self {
            SegmentKind::PrefixSuffix {
                prefix, suffix, ..
            } => {
                let after_prefix = segment.strip_prefix(prefix.as_str())?;
                let captured = after_prefix.strip_suffix(suffix.as_str())?;
                if captured.is_empty() {
                    None
                } else {
                    Some(captured.to_owned())
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_static() {
        assert_eq!(SegmentKind::compile("users"), SegmentKind::Static("users".into()));
    }

    #[test]
    fn compiles_param_brace_and_colon_forms() {
        assert_eq!(SegmentKind::compile("{id}"), SegmentKind::Param("id".into()));
        assert_eq!(SegmentKind::compile(":id"), SegmentKind::Param("id".into()));
    }

    #[test]
    fn compiles_wildcard_and_recursive() {
        assert_eq!(SegmentKind::compile("*"), SegmentKind::Wildcard);
        assert_eq!(SegmentKind::compile("**"), SegmentKind::Recursive(None));
        assert_eq!(
            SegmentKind::compile("{rest:path}"),
            SegmentKind::Recursive(Some("rest".into()))
        );
    }

    #[test]
    fn compiles_prefix_suffix_forms() {
        assert_eq!(
            SegmentKind::compile("{name}.ext"),
            SegmentKind::PrefixSuffix {
                name: "name".into(),
                prefix: "".into(),
                suffix: ".ext".into(),
            }
        );
        assert_eq!(
            SegmentKind::compile("pre{name}"),
            SegmentKind::PrefixSuffix {
                name: "name".into(),
                prefix: "pre".into(),
                suffix: "".into(),
            }
        );
    }

    #[test]
    fn prefix_suffix_capture_extracts_middle() {
        let kind = SegmentKind::compile("{name}.ext");
        assert_eq!(
            kind.prefix_suffix_capture("report.ext"),
            Some("report".to_owned())
        );
        assert_eq!(kind.prefix_suffix_capture("report.txt"), None);
    }

    #[test]
    fn specificity_ordering() {
        let mut kinds = vec![
            SegmentKind::Recursive(None),
            SegmentKind::Wildcard,
            SegmentKind::Param("x".into()),
            SegmentKind::Static("a".into()),
            SegmentKind::PrefixSuffix {
                name: "n".into(),
                prefix: "".into(),
                suffix: ".ext".into(),
            },
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Static("a".into()),
                SegmentKind::PrefixSuffix {
                    name: "n".into(),
                    prefix: "".into(),
                    suffix: ".ext".into(),
                },
                SegmentKind::Param("x".into()),
                SegmentKind::Wildcard,
                SegmentKind::Recursive(None),
            ]
        );
    }
}

//! Defines `Node`/`NodeBuilder`, the recursive members of the router
//! `Tree`, and the iterative (non-recursive) traversal that resolves a
//! path to a routable leaf plus its captured parameters.

use std::collections::HashMap;

use http::Method;

use crate::router::route::CompiledResponder;
use crate::router::tree::segment::SegmentKind;

/// A single captured value, recorded while descending the trie.
enum CaptureEntry {
    Named(String, String),
    Positional(String),
}

/// The path parameters captured while resolving one request path: an
/// ordered map of name→value for named captures (`{name}`, `:name`,
/// prefix/suffix, and `{name:path}`), plus an ordered list of anonymous
/// positional captures for `*` and bare `**`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl PathParams {
    /// The value captured under `name`, if any (first match wins, though in
    /// practice a valid pattern captures each name at most once).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `index`-th anonymous positional capture (0-based, in the order
    /// the corresponding `*`/`**` segments appear in the pattern).
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(|s| s.as_str())
    }

    /// All named captures, in the order they were matched (outermost
    /// segment first).
    pub fn iter_named(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn from_entries(entries: Vec<CaptureEntry>) -> PathParams {
        let mut named = Vec::new();
        let mut positional = Vec::new();
        for entry in entries {
            match entry {
                CaptureEntry::Named(name, value) => named.push((name, value)),
                CaptureEntry::Positional(value) => positional.push(value),
            }
        }
        PathParams { named, positional }
    }
}

/// The result of a successful `Tree::resolve`: the leaf node (which carries
/// the per-method compiled responders) and the parameters captured on the
/// way to it.
pub struct Resolved<'a> {
    pub node: &'a Node,
    pub params: PathParams,
}

/// A routable leaf or interior node, immutable after `NodeBuilder::finalize`.
pub struct Node {
    kind: SegmentKind,
    children: Vec<Node>,
    routes: HashMap<Method, CompiledResponder>,
}

impl Node {
    /// True if at least one method has a compiled responder at this node.
    pub fn is_routable(&self) -> bool {
        !self.routes.is_empty()
    }

    /// The responder registered for `method`, if any.
    pub fn responder(&self, method: &Method) -> Option<&CompiledResponder> {
        self.routes.get(method)
    }

    /// The methods with a responder registered at this node, for building
    /// an `Allow` header on a `405`.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.routes.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

/// Mutable builder for a `Node`; sorted and frozen by `finalize`.
pub struct NodeBuilder {
    kind: SegmentKind,
    children: Vec<NodeBuilder>,
    routes: HashMap<Method, CompiledResponder>,
}

impl NodeBuilder {
    pub fn new(kind: SegmentKind) -> Self {
        NodeBuilder {
            kind,
            children: Vec::new(),
            routes: HashMap::new(),
        }
    }

    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Registers a compiled responder for `method` at this node.
    ///
    /// # Panics
    ///
    /// If `method` is already registered at this exact node (ambiguous
    /// duplicate route for the same pattern and method).
    pub fn add_route(&mut self, method: Method, responder: CompiledResponder) {
        if self.routes.insert(method.clone(), responder).is_some() {
            panic!("duplicate route registered for method {method} at this pattern");
        }
    }

    /// Finds (or creates) the child matching `kind`, preserving first-added
    /// order among children of the same kind (later sorted stably).
    pub fn child_or_insert(&mut self, kind: SegmentKind) -> &mut NodeBuilder {
        if let Some(idx) = self.children.iter().position(|c| c.kind == kind) {
            return &mut self.children[idx];
        }
        self.children.push(NodeBuilder::new(kind));
        self.children.last_mut().unwrap()
    }

    /// Sorts children into probe order and recursively finalizes them.
    ///
    /// Probe order follows the resolve algorithm specified for this router:
    /// literal -> prefix/suffix -> bare parameter -> wildcard -> recursive.
    /// `Vec::sort` is stable, so children of equal kind retain insertion
    /// (first-added-wins) order.
    pub fn finalize(mut self) -> Node {
        self.children.sort_by(|a, b| a.kind.cmp(&b.kind));
        let children = self.children.into_iter().map(NodeBuilder::finalize).collect();
        Node {
            kind: self.kind,
            children,
            routes: self.routes,
        }
    }
}

struct Frame<'a> {
    node: &'a Node,
    remaining: &'a [String],
    next_child: usize,
    captures_mark: usize,
}

/// Resolves `segments` against the subtree rooted at `root`, returning the
/// matched leaf and its captured parameters.
///
/// Implemented iteratively with an explicit stack of choice points (rather
/// than recursion) so traversal depth is bounded by an allocation, not by
/// the call stack, on pathologically long request paths. Backtracking never
/// mutates the tree; it only pops stack frames and truncates the captures
/// vector back to the mark recorded when the frame was pushed.
pub fn resolve<'a>(root: &'a Node, segments: &'a [String]) -> Option<Resolved<'a>> {
    let mut captures: Vec<CaptureEntry> = Vec::new();
    let mut stack = vec![Frame {
        node: root,
        remaining: segments,
        next_child: 0,
        captures_mark: 0,
    }];

    loop {
        let frame = stack.last_mut()?;

        if frame.remaining.is_empty() {
            if frame.node.is_routable() {
                let node = frame.node;
                return Some(Resolved {
                    node,
                    params: PathParams::from_entries(captures),
                });
            }
            // A recursive segment may match zero remaining segments (e.g.
            // `/files/**` matches `/files`), so it gets one more chance
            // here before this frame backtracks.
            if let Some(child) = frame
                .node
                .children
                .iter()
                .find(|c| matches!(c.kind, SegmentKind::Recursive(_)))
            {
                if child.is_routable() {
                    if let SegmentKind::Recursive(name) = child.kind.clone() {
                        match name {
                            Some(n) => captures.push(CaptureEntry::Named(n, String::new())),
                            None => captures.push(CaptureEntry::Positional(String::new())),
                        }
                        return Some(Resolved {
                            node: child,
                            params: PathParams::from_entries(captures),
                        });
                    }
                }
            }
            captures.truncate(frame.captures_mark);
            stack.pop();
            continue;
        }

        if frame.next_child >= frame.node.children.len() {
            captures.truncate(frame.captures_mark);
            stack.pop();
            continue;
        }

        let child = &frame.node.children[frame.next_child];
        frame.next_child += 1;
        let head = &frame.remaining[0];
        let tail = &frame.remaining[1..];

        match child.kind.clone() {
            SegmentKind::Static(literal) => {
                if literal == *head {
                    let mark = captures.len();
                    stack.push(Frame {
                        node: child,
                        remaining: tail,
                        next_child: 0,
                        captures_mark: mark,
                    });
                }
            }
            SegmentKind::PrefixSuffix { .. } => {
                if let Some(value) = child.kind.prefix_suffix_capture(head) {
                    let name = match &child.kind {
                        SegmentKind::PrefixSuffix { name, .. } => name.clone(),
                        _ => unreachable!(),
                    };
                    let mark = captures.len();
                    captures.push(CaptureEntry::Named(name, value));
                    stack.push(Frame {
                        node: child,
                        remaining: tail,
                        next_child: 0,
                        captures_mark: mark,
                    });
                }
            }
            SegmentKind::Param(name) => {
                let mark = captures.len();
                captures.push(CaptureEntry::Named(name, head.clone()));
                stack.push(Frame {
                    node: child,
                    remaining: tail,
                    next_child: 0,
                    captures_mark: mark,
                });
            }
            SegmentKind::Wildcard => {
                let mark = captures.len();
                captures.push(CaptureEntry::Positional(head.clone()));
                stack.push(Frame {
                    node: child,
                    remaining: tail,
                    next_child: 0,
                    captures_mark: mark,
                });
            }
            SegmentKind::Recursive(name) => {
                // Greedy and terminal: consumes everything remaining at
                // this point and does not recurse into grandchildren. Per
                // the resolution of the parameter-vs-recursive precedence
                // question, this arm is only reached when no earlier
                // (more specific) child matched at this node or any
                // shallower one, since children are probed in specificity
                // order and `Static`/`PrefixSuffix`/`Param`/`Wildcard` are
                // all tried first.
                if child.is_routable() {
                    let joined = frame.remaining.join("/");
                    match name {
                        Some(n) => captures.push(CaptureEntry::Named(n, joined)),
                        None => captures.push(CaptureEntry::Positional(joined)),
                    }
                    return Some(Resolved {
                        node: child,
                        params: PathParams::from_entries(captures),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::route::test_support::dummy_responder;

    fn build(patterns: &[(&str, &str)]) -> Node {
        let mut root = NodeBuilder::new(SegmentKind::Static(String::new()));
        for (pattern, tag) in patterns {
            let segments: Vec<&str> = pattern
                .trim_start_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            let mut cursor = &mut root;
            for seg in &segments {
                cursor = cursor.child_or_insert(SegmentKind::compile(seg));
            }
            cursor.add_route(Method::GET, dummy_responder(tag));
        }
        root.finalize()
    }

    fn segs(path: &str) -> Vec<String> {
        crate::uri::decode_segments(path).unwrap()
    }

    #[test]
    fn literal_beats_wildcard_and_param() {
        let root = build(&[("/a/*", "glob"), ("/a/{x}", "param"), ("/a/b", "literal")]);
        let r = resolve(&root, &segs("/a/b")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "literal");

        let r = resolve(&root, &segs("/a/c")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "param");
        assert_eq!(r.params.get("x"), Some("c"));
    }

    #[test]
    fn backtracks_through_dynamic_to_find_static_sibling() {
        let root = build(&[("/seg5/:dyn/seg7", "dyn-seg7"), ("/seg5/seg6", "seg6")]);
        let r = resolve(&root, &segs("/seg5/seg6")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "seg6");

        let r = resolve(&root, &segs("/seg5/someval/seg7")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "dyn-seg7");
        assert_eq!(r.params.get("dyn"), Some("someval"));
    }

    #[test]
    fn recursive_consumes_remainder_greedily() {
        let root = build(&[("/files/**", "files")]);
        let r = resolve(&root, &segs("/files/a/b/c")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "files");
        assert_eq!(r.params.positional(0), Some("a/b/c"));
    }

    #[test]
    fn recursive_matches_zero_remaining_segments() {
        let root = build(&[("/files/**", "files")]);
        let r = resolve(&root, &segs("/files")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "files");
        assert_eq!(r.params.positional(0), Some(""));
    }

    #[test]
    fn named_recursive_capture() {
        let root = build(&[("/files/{rest:path}", "files")]);
        let r = resolve(&root, &segs("/files/a/b")).unwrap();
        assert_eq!(r.params.get("rest"), Some("a/b"));
    }

    #[test]
    fn param_beats_recursive_at_same_depth() {
        let root = build(&[("/a/**", "recursive"), ("/a/{x}", "param")]);
        let r = resolve(&root, &segs("/a/one")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "param");
    }

    #[test]
    fn recursive_wins_when_nothing_narrower_matches() {
        let root = build(&[("/a/**", "recursive"), ("/a/{x}/y", "narrow")]);
        let r = resolve(&root, &segs("/a/one/two/three")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "recursive");
    }

    #[test]
    fn trailing_slash_distinguishes_patterns() {
        let root = build(&[("/x", "no-slash"), ("/x/", "slash")]);
        let r = resolve(&root, &segs("/x")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "no-slash");
        let r = resolve(&root, &segs("/x/")).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "slash");
    }

    #[test]
    fn prefix_suffix_capture_matches() {
        let root = build(&[("/reports/{name}.csv", "csv")]);
        let r = resolve(&root, &segs("/reports/q1.csv")).unwrap();
        assert_eq!(r.params.get("name"), Some("q1"));
        assert!(resolve(&root, &segs("/reports/q1.txt")).is_none());
    }

    #[test]
    fn no_match_returns_none() {
        let root = build(&[("/a/b", "ab")]);
        assert!(resolve(&root, &segs("/a/b/c")).is_none());
        assert!(resolve(&root, &segs("/a")).is_none());
    }
}

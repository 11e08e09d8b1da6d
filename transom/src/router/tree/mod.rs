//! The path-parameterized routing trie: compiles declared patterns into a
//! `Node` tree and resolves request paths against it.

mod node;
mod segment;

pub use node::{PathParams, Resolved};
pub use segment::SegmentKind;

use http::Method;

use self::node::{Node, NodeBuilder};
use crate::router::route::CompiledResponder;

/// Splits a route pattern (e.g. `/users/{id}/posts/{post_id}.json`) into
/// its `/`-delimited segments, same convention as `uri::decode_segments`:
/// no leading segment for the initial `/`, and a trailing `/` becomes an
/// explicit empty final segment.
pub fn pattern_segments(pattern: &str) -> Vec<&str> {
    let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

/// The router's trie, built incrementally via `add_route` then queried
/// via `resolve`.
pub struct Tree {
    building: Option<NodeBuilder>,
    root: Option<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            building: Some(NodeBuilder::new(SegmentKind::Static(String::new()))),
            root: None,
        }
    }

    /// Registers `responder` for `method` at `pattern`.
    ///
    /// # Panics
    ///
    /// If called after `finalize`, or if `method` is already registered at
    /// the exact same pattern.
    pub fn add_route(&mut self, pattern: &str, method: Method, responder: CompiledResponder) {
        let mut cursor = self
            .building
            .as_mut()
            .expect("cannot add routes to a finalized Tree");
        for segment in pattern_segments(pattern) {
            cursor = cursor.child_or_insert(SegmentKind::compile(segment));
        }
        cursor.add_route(method, responder);
    }

    /// Sorts every node's children into probe order. Idempotent; routes
    /// cannot be added after this is called.
    pub fn finalize(&mut self) {
        if let Some(builder) = self.building.take() {
            self.root = Some(builder.finalize());
        }
    }

    /// Resolves `segments` (as produced by `uri::decode_segments`) against
    /// the finalized trie.
    ///
    /// # Panics
    ///
    /// If called before `finalize`.
    pub fn resolve<'a>(&'a self, segments: &'a [String]) -> Option<Resolved<'a>> {
        let root = self
            .root
            .as_ref()
            .expect("Tree::resolve called before finalize");
        node::resolve(root, segments)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::route::test_support::dummy_responder;

    #[test]
    fn builds_and_resolves_a_simple_route() {
        let mut tree = Tree::new();
        tree.add_route("/hello", Method::GET, dummy_responder("hello"));
        tree.finalize();

        let segs = crate::uri::decode_segments("/hello").unwrap();
        let r = tree.resolve(&segs).unwrap();
        assert_eq!(r.node.responder(&Method::GET).unwrap().tag(), "hello");
    }

    #[test]
    fn missing_method_is_distinguishable_from_missing_path() {
        let mut tree = Tree::new();
        tree.add_route("/hello", Method::GET, dummy_responder("hello"));
        tree.finalize();

        let segs = crate::uri::decode_segments("/hello").unwrap();
        let r = tree.resolve(&segs).unwrap();
        assert!(r.node.responder(&Method::POST).is_none());
        assert_eq!(r.node.allowed_methods(), vec![Method::GET]);

        let missing = crate::uri::decode_segments("/goodbye").unwrap();
        assert!(tree.resolve(&missing).is_none());
    }
}

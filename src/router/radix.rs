//! Radix tree implementation for HTTP route matching
//!
//! This module provides a radix tree (compact prefix tree) for O(k) route
//! matching where k is the path length.
//!
//! ## Node kinds
//!
//! - **Static** nodes hold a literal prefix. Siblings never start with the same
//!   character; inserting a path that diverges inside an existing prefix splits
//!   that node so every prefix stays the longest one shared by all routes below it.
//! - **Param** nodes match exactly one non-empty path segment.
//! - **CatchAll** nodes match whatever is left of the path, slashes included.
//!
//! Each node has at most one param child and one catch-all child. Handlers are
//! stored per HTTP method on the node where a template ends.
//!
//! ## Matching priority
//!
//! At every node the search tries the static child, then the param child, then
//! the catch-all child. A static branch that dead-ends falls back to the param
//! and catch-all alternatives, and any capture pushed on the way down is
//! truncated away before the next alternative is tried.
//!
//! ```text
//! routes: /users/new   /users/:id/edit   /users/*rest
//!
//! "" ── "/users/" ─┬─ "new"
//!                  ├─ :param ── "/edit"
//!                  └─ *catch-all
//!
//! GET /users/new/edit  →  "new" dead-ends, :param captures "new", "/edit" matches
//! GET /users/a/b       →  :param captures "a", "/b" fails, catch-all captures "a/b"
//! ```

use http::Method;
use smallvec::SmallVec;
use std::mem;
use std::sync::Arc;

use super::core::RouteInfo;
use super::template::Segment;
use crate::error::RouteError;
use crate::handler::HandlerFunc;

/// Maximum number of captures held inline before spilling to the heap.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Byte ranges of captured parameter values inside the normalized path
pub type Captures = SmallVec<[(usize, usize); MAX_INLINE_PARAMS]>;

/// Methods served on a path that did not match the request method
pub type AllowedMethods = SmallVec<[Method; 4]>;

/// A registered handler for one method on one node
#[derive(Clone)]
pub struct Endpoint {
    /// Route metadata bound into the context on a match
    pub route: Arc<RouteInfo>,
    /// The handler as registered, before any middleware
    pub(crate) raw: HandlerFunc,
    /// Index of the owning group's middleware scope, `None` outside groups
    pub(crate) scope: Option<usize>,
    /// The handler that is executed: `raw` wrapped by scope and global middleware
    pub(crate) handler: HandlerFunc,
}

impl Endpoint {
    /// The handler executed for this endpoint, middleware included
    #[must_use]
    pub fn handler(&self) -> &HandlerFunc {
        &self.handler
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Param,
    CatchAll,
}

/// Node in the radix tree
#[derive(Clone)]
pub(crate) struct RadixNode {
    kind: NodeKind,
    /// Literal prefix for static nodes, empty for param and catch-all nodes
    prefix: String,
    /// Static children; no two start with the same character
    children: Vec<RadixNode>,
    param_child: Option<Box<RadixNode>>,
    catch_all_child: Option<Box<RadixNode>>,
    /// Handlers for templates ending here, in registration order
    endpoints: Vec<(Method, Endpoint)>,
}

impl RadixNode {
    fn new(kind: NodeKind, prefix: String) -> Self {
        Self {
            kind,
            prefix,
            children: Vec::new(),
            param_child: None,
            catch_all_child: None,
            endpoints: Vec::new(),
        }
    }

    /// Create the empty static root of a tree
    pub(crate) fn root() -> Self {
        Self::new(NodeKind::Static, String::new())
    }

    /// Insert an endpoint at the node reached by `segments`
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment<'_>],
        method: Method,
        endpoint: Endpoint,
    ) -> Result<(), RouteError> {
        match segments.split_first() {
            None => self.set_endpoint(method, endpoint),
            Some((Segment::Static(literal), rest)) => {
                self.insert_static(literal, rest, method, endpoint)
            }
            Some((Segment::Param(_), rest)) => self
                .param_child
                .get_or_insert_with(|| Box::new(RadixNode::new(NodeKind::Param, String::new())))
                .insert(rest, method, endpoint),
            Some((Segment::CatchAll(_), rest)) => {
                // The template parser guarantees nothing follows a catch-all
                debug_assert!(rest.is_empty());
                self.catch_all_child
                    .get_or_insert_with(|| {
                        Box::new(RadixNode::new(NodeKind::CatchAll, String::new()))
                    })
                    .set_endpoint(method, endpoint)
            }
        }
    }

    fn insert_static(
        &mut self,
        literal: &str,
        rest: &[Segment<'_>],
        method: Method,
        endpoint: Endpoint,
    ) -> Result<(), RouteError> {
        let Some(first) = literal.chars().next() else {
            return self.insert(rest, method, endpoint);
        };

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|c| c.prefix.starts_with(first))
        {
            let common = common_prefix_len(&child.prefix, literal);
            if common < child.prefix.len() {
                child.split_at(common);
            }
            return child.insert_static(&literal[common..], rest, method, endpoint);
        }

        let mut child = RadixNode::new(NodeKind::Static, literal.to_string());
        child.insert(rest, method, endpoint)?;
        self.children.push(child);
        Ok(())
    }

    /// Move everything from `at` onwards into a new single child
    fn split_at(&mut self, at: usize) {
        let tail = RadixNode {
            kind: NodeKind::Static,
            prefix: self.prefix.split_off(at),
            children: mem::take(&mut self.children),
            param_child: self.param_child.take(),
            catch_all_child: self.catch_all_child.take(),
            endpoints: mem::take(&mut self.endpoints),
        };
        self.children.push(tail);
    }

    fn set_endpoint(&mut self, method: Method, endpoint: Endpoint) -> Result<(), RouteError> {
        if let Some((_, existing)) = self.endpoints.iter().find(|(m, _)| *m == method) {
            return Err(RouteError::DuplicateRoute {
                method,
                path: endpoint.route.template.to_string(),
                existing: existing.route.template.to_string(),
            });
        }
        self.endpoints.push((method, endpoint));
        Ok(())
    }

    /// Walk the tree for `path[pos..]`, trying static, then param, then
    /// catch-all children at every node.
    ///
    /// `self` has already consumed `path[..pos]`. On success the captures of the
    /// winning branch are left in `captures`; on failure `captures` is restored
    /// to the length it had on entry. Every node whose template matched the
    /// path but which lacks a handler for `method` adds its methods to
    /// `allowed`.
    pub(crate) fn search<'n>(
        &'n self,
        path: &str,
        pos: usize,
        method: &Method,
        captures: &mut Captures,
        allowed: &mut AllowedMethods,
    ) -> Option<&'n Endpoint> {
        let rest = &path[pos..];
        if rest.is_empty() {
            if let Some(endpoint) = self.endpoint_for(method, allowed) {
                return Some(endpoint);
            }
            // A catch-all also accepts an empty remainder
            if let Some(catch_all) = &self.catch_all_child {
                if let Some(endpoint) = catch_all.endpoint_for(method, allowed) {
                    captures.push((pos, pos));
                    return Some(endpoint);
                }
            }
            return None;
        }

        let checkpoint = captures.len();

        // Siblings differ in their first char, so at most one prefix can match
        for child in &self.children {
            if rest.starts_with(child.prefix.as_str()) {
                if let Some(endpoint) =
                    child.search(path, pos + child.prefix.len(), method, captures, allowed)
                {
                    return Some(endpoint);
                }
                captures.truncate(checkpoint);
                break;
            }
        }

        if let Some(param) = &self.param_child {
            let end = rest.find('/').unwrap_or(rest.len());
            if end > 0 {
                captures.push((pos, pos + end));
                if let Some(endpoint) = param.search(path, pos + end, method, captures, allowed)
                {
                    return Some(endpoint);
                }
                captures.truncate(checkpoint);
            }
        }

        if let Some(catch_all) = &self.catch_all_child {
            if let Some(endpoint) = catch_all.endpoint_for(method, allowed) {
                captures.push((pos, path.len()));
                return Some(endpoint);
            }
        }

        None
    }

    fn endpoint_for(&self, method: &Method, allowed: &mut AllowedMethods) -> Option<&Endpoint> {
        if let Some((_, endpoint)) = self.endpoints.iter().find(|(m, _)| m == method) {
            return Some(endpoint);
        }
        for (m, _) in &self.endpoints {
            if !allowed.contains(m) {
                allowed.push(m.clone());
            }
        }
        None
    }

    /// Visit every endpoint mutably (used to compose middleware at build time)
    pub(crate) fn for_each_endpoint_mut(&mut self, f: &mut dyn FnMut(&mut Endpoint)) {
        for (_, endpoint) in &mut self.endpoints {
            f(endpoint);
        }
        for child in &mut self.children {
            child.for_each_endpoint_mut(f);
        }
        if let Some(param) = &mut self.param_child {
            param.for_each_endpoint_mut(f);
        }
        if let Some(catch_all) = &mut self.catch_all_child {
            catch_all.for_each_endpoint_mut(f);
        }
    }

    /// Render the tree structure, one node per line, for diagnostics
    pub(crate) fn render(&self, depth: usize, out: &mut String) {
        let label = match self.kind {
            NodeKind::Static => format!("{:?}", self.prefix),
            NodeKind::Param => ":param".to_string(),
            NodeKind::CatchAll => "*catch-all".to_string(),
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&label);
        if !self.endpoints.is_empty() {
            let methods: Vec<&str> = self.endpoints.iter().map(|(m, _)| m.as_str()).collect();
            out.push_str(" [");
            out.push_str(&methods.join(","));
            out.push(']');
        }
        out.push('\n');
        let mut children: Vec<&RadixNode> = self.children.iter().collect();
        children.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        for child in children {
            child.render(depth + 1, out);
        }
        if let Some(param) = &self.param_child {
            param.render(depth + 1, out);
        }
        if let Some(catch_all) = &self.catch_all_child {
            catch_all.render(depth + 1, out);
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self, is_root: bool) {
        if self.kind == NodeKind::Static && !is_root {
            assert!(!self.prefix.is_empty(), "non-root static node with empty prefix");
        }
        let mut firsts: Vec<char> = self
            .children
            .iter()
            .filter_map(|c| c.prefix.chars().next())
            .collect();
        let count = firsts.len();
        firsts.sort_unstable();
        firsts.dedup();
        assert_eq!(count, firsts.len(), "static siblings share a first character");
        if self.kind == NodeKind::CatchAll {
            assert!(self.children.is_empty() && self.param_child.is_none());
        }
        for child in &self.children {
            assert_eq!(child.kind, NodeKind::Static);
            child.assert_invariants(false);
        }
        if let Some(param) = &self.param_child {
            param.assert_invariants(false);
        }
        if let Some(catch_all) = &self.catch_all_child {
            catch_all.assert_invariants(false);
        }
    }
}

/// Length in bytes of the longest common prefix, on a char boundary
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((idx, _), _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("/users", "/uploads"), 2);
        assert_eq!(common_prefix_len("/users", "/users/new"), 6);
        assert_eq!(common_prefix_len("abc", "xyz"), 0);
        assert_eq!(common_prefix_len("/café", "/cafè"), 4);
    }
}

//! # Identifiers, Occurrence Paths and Query Paths
//!
//! An AVP is named by its [`AvpId`], a `(vendor_id, attr_id)` pair. The same id can occur
//! many times in one message: a Credit-Control-Request carries one
//! Multiple-Services-Credit-Control group per rating group, and each of them holds its own
//! Used-Service-Unit, CC-Total-Octets and so on. The id alone cannot tell those apart, the
//! position in the tree can.
//!
//! ## Two Kinds of Path
//!
//! Both kinds are chains of ids read innermost first: the AVP itself, then its enclosing
//! group, then that group's enclosing group, and so on.
//!
//! - [`OccurrencePath`]: where one concrete AVP sits. Always complete, it ends at the message
//!   root. Built by the index builder and stored in an arena owned by the index, so every
//!   descendant of a group shares the group's node.
//! - [`QueryPath`]: what the caller asks for. Possibly partial: it anchors only as many
//!   levels as the caller cares about. Built with [`QueryPath::descend`], which allocates one
//!   `Arc` node and never touches the chain it extends.
//!
//! ## Matching
//!
//! [`matches`] is deliberately **not symmetric**. A query of length *k* pins down the *k*
//! innermost levels of the stored path and ignores everything above them:
//!
//! ```text
//! stored: 0/446 . 0/456 . (root)        Used-Service-Unit inside MSCC
//! query:  0/446 . 0/456                  -> match
//! query:  0/446                          -> match
//! query:  0/446 . 0/456 . 0/873          -> no match (stored has no third level)
//! ```
//!
//! ## Rendering
//!
//! Paths render as `"<vendor>/<attr>"` segments joined by `.`, innermost first. The
//! [`WILDCARD`] sentinel renders as `*`. Rendering is for logs and diagnostics only; the
//! matcher compares ids, never strings, and does not treat the sentinel specially.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reserved all-bits-set value for either half of an [`AvpId`].
///
/// Rendered as `*`. The matcher does not honor it: an id holding the sentinel only matches
/// another id holding the same sentinel.
pub const WILDCARD: u32 = u32::MAX;

/// The `(vendor_id, attr_id)` pair naming an AVP type, independent of tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvpId {
    pub vendor_id: u32,
    pub attr_id: u32,
}

impl AvpId {
    pub const fn new(vendor_id: u32, attr_id: u32) -> Self {
        Self { vendor_id, attr_id }
    }

    /// Id of a base-protocol (vendor 0) AVP.
    pub const fn ietf(attr_id: u32) -> Self {
        Self::new(0, attr_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.vendor_id == WILDCARD || self.attr_id == WILDCARD
    }
}

impl fmt::Display for AvpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vendor_id == WILDCARD {
            write!(f, "*/")?;
        } else {
            write!(f, "{}/", self.vendor_id)?;
        }
        if self.attr_id == WILDCARD {
            write!(f, "*")
        } else {
            write!(f, "{}", self.attr_id)
        }
    }
}

impl From<(u32, u32)> for AvpId {
    fn from((vendor_id, attr_id): (u32, u32)) -> Self {
        Self::new(vendor_id, attr_id)
    }
}

/// A chain of ids read innermost first.
///
/// Implemented by cheap copyable handles ([`OccurrencePath`] and `&QueryNode`) so the
/// matcher and the renderer can walk either kind of path.
pub trait AncestorChain: Copy {
    /// Id at this level of the chain.
    fn id(self) -> AvpId;

    /// The enclosing level, or `None` at the top of the chain.
    fn parent(self) -> Option<Self>;
}

/// Decide whether a stored path satisfies a query path.
///
/// - An absent query matches anything.
/// - Otherwise the ids at the current level must be equal, and:
///   - if the query has no parent, the rest of the stored chain is irrelevant;
///   - if it does, the stored path must have a parent that matches it under the same rule.
///
/// `matches(a, Some(b))` and `matches(b, Some(a))` differ whenever the chains have
/// different lengths.
pub fn matches<S: AncestorChain, Q: AncestorChain>(stored: S, query: Option<Q>) -> bool {
    let Some(mut query) = query else {
        return true;
    };
    let mut stored = stored;
    loop {
        if stored.id() != query.id() {
            return false;
        }
        match (stored.parent(), query.parent()) {
            (_, None) => return true,
            (None, Some(_)) => return false,
            (Some(s), Some(q)) => {
                stored = s;
                query = q;
            }
        }
    }
}

fn write_chain<C: AncestorChain>(f: &mut fmt::Formatter<'_>, chain: C) -> fmt::Result {
    write!(f, "{}", chain.id())?;
    let mut cursor = chain.parent();
    while let Some(level) = cursor {
        write!(f, ".{}", level.id())?;
        cursor = level.parent();
    }
    Ok(())
}

/// Node in the occurrence-path arena owned by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PathNode {
    pub id: AvpId,
    pub parent: Option<usize>,
}

/// Handle to one level of an occurrence path stored in an index arena.
#[derive(Clone, Copy)]
pub struct OccurrencePath<'i> {
    nodes: &'i [PathNode],
    at: usize,
}

impl<'i> OccurrencePath<'i> {
    pub(crate) fn new(nodes: &'i [PathNode], at: usize) -> Self {
        Self { nodes, at }
    }

    fn node(&self) -> PathNode {
        self.nodes[self.at]
    }

    /// Id of the AVP this path leads to.
    pub fn id(&self) -> AvpId {
        self.node().id
    }

    /// Path of the enclosing group, or `None` for a root-level AVP.
    pub fn parent(&self) -> Option<OccurrencePath<'i>> {
        self.node().parent.map(|at| Self::new(self.nodes, at))
    }

    /// Number of levels, counting the AVP itself. Root-level AVPs have depth 1.
    pub fn depth(&self) -> usize {
        self.ids().count()
    }

    /// Ids from the AVP itself up to the root-level ancestor.
    pub fn ids(&self) -> impl Iterator<Item = AvpId> + 'i {
        let nodes = self.nodes;
        let mut cursor = Some(self.at);
        std::iter::from_fn(move || {
            let node = nodes[cursor?];
            cursor = node.parent;
            Some(node.id)
        })
    }

    /// Whether this occurrence satisfies `query`. See [`matches`].
    pub fn matches(&self, query: &QueryPath) -> bool {
        matches(*self, query.head())
    }
}

impl AncestorChain for OccurrencePath<'_> {
    fn id(self) -> AvpId {
        OccurrencePath::id(&self)
    }

    fn parent(self) -> Option<Self> {
        OccurrencePath::parent(&self)
    }
}

impl fmt::Display for OccurrencePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, *self)
    }
}

impl fmt::Debug for OccurrencePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OccurrencePath({})", self)
    }
}

/// One level of a [`QueryPath`].
#[derive(Debug, PartialEq, Eq)]
pub struct QueryNode {
    id: AvpId,
    parent: Option<Arc<QueryNode>>,
}

impl QueryNode {
    pub fn id(&self) -> AvpId {
        self.id
    }

    pub fn parent(&self) -> Option<&QueryNode> {
        self.parent.as_deref()
    }
}

impl<'q> AncestorChain for &'q QueryNode {
    fn id(self) -> AvpId {
        self.id
    }

    fn parent(self) -> Option<Self> {
        self.parent.as_deref()
    }
}

/// A caller-built, possibly partial ancestor chain.
///
/// The empty path (`QueryPath::any()`) matches every occurrence. Each [`descend`] call
/// returns a new path whose innermost level is the given id and whose remaining levels are
/// the path it was called on. Paths are immutable and share their tails, so cloning or
/// extending one is a pointer copy plus at most one allocation.
///
/// [`descend`]: QueryPath::descend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPath {
    head: Option<Arc<QueryNode>>,
}

impl QueryPath {
    /// The empty path: no constraint at all.
    pub fn any() -> Self {
        Self::default()
    }

    /// A single-level path.
    pub fn new(id: AvpId) -> Self {
        Self::any().descend(id)
    }

    /// Require `id` one level inside the current path.
    pub fn descend(&self, id: AvpId) -> Self {
        Self {
            head: Some(Arc::new(QueryNode {
                id,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn is_any(&self) -> bool {
        self.head.is_none()
    }

    /// Innermost level, or `None` for the empty path.
    pub fn head(&self) -> Option<&QueryNode> {
        self.head.as_deref()
    }

    /// Innermost id, or `None` for the empty path.
    pub fn id(&self) -> Option<AvpId> {
        self.head().map(QueryNode::id)
    }

    /// The path without its innermost level.
    pub fn parent(&self) -> QueryPath {
        Self {
            head: self.head.as_ref().and_then(|node| node.parent.clone()),
        }
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.head();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent();
        }
        depth
    }
}

/// Collects ids outermost first, i.e. in the order they would be passed to
/// [`QueryPath::descend`].
impl FromIterator<AvpId> for QueryPath {
    fn from_iter<T: IntoIterator<Item = AvpId>>(iter: T) -> Self {
        iter.into_iter()
            .fold(QueryPath::any(), |path, id| path.descend(id))
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.head() {
            Some(node) => write_chain(f, node),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSCC: AvpId = AvpId::ietf(456);
    const USU: AvpId = AvpId::ietf(446);
    const TOTAL_OCTETS: AvpId = AvpId::ietf(421);
    const SERVICE_INFO: AvpId = AvpId::new(10415, 873);

    fn path(outermost_first: &[AvpId]) -> QueryPath {
        outermost_first.iter().copied().collect()
    }

    #[test]
    fn test_id_renders_vendor_and_attr() {
        assert_eq!(AvpId::new(10415, 873).to_string(), "10415/873");
        assert_eq!(AvpId::ietf(263).to_string(), "0/263");
    }

    #[test]
    fn test_wildcard_renders_as_star() {
        assert_eq!(AvpId::new(WILDCARD, 5).to_string(), "*/5");
        assert_eq!(AvpId::new(7, WILDCARD).to_string(), "7/*");
        assert_eq!(AvpId::new(WILDCARD, WILDCARD).to_string(), "*/*");
        assert!(AvpId::new(WILDCARD, 5).is_wildcard());
        assert!(!AvpId::new(0, 5).is_wildcard());
    }

    #[test]
    fn test_query_path_renders_innermost_first() {
        let q = path(&[MSCC, USU, TOTAL_OCTETS]);
        assert_eq!(q.to_string(), "0/421.0/446.0/456");
        assert_eq!(QueryPath::any().to_string(), "");
    }

    #[test]
    fn test_occurrence_path_renders_to_root() {
        let nodes = vec![
            PathNode { id: MSCC, parent: None },
            PathNode { id: USU, parent: Some(0) },
            PathNode { id: TOTAL_OCTETS, parent: Some(1) },
        ];
        let leaf = OccurrencePath::new(&nodes, 2);
        assert_eq!(leaf.to_string(), "0/421.0/446.0/456");
        assert_eq!(leaf.depth(), 3);
        assert_eq!(leaf.parent().map(|p| p.id()), Some(USU));
        assert_eq!(OccurrencePath::new(&nodes, 0).to_string(), "0/456");
        assert!(OccurrencePath::new(&nodes, 0).parent().is_none());
    }

    #[test]
    fn test_absent_query_matches_anything() {
        let stored = path(&[MSCC, USU]);
        assert!(matches(stored.head().unwrap(), None::<&QueryNode>));
    }

    #[test]
    fn test_single_level_query_ignores_ancestry() {
        let stored = path(&[SERVICE_INFO, MSCC, USU]);
        let query = QueryPath::new(USU);
        assert!(matches(stored.head().unwrap(), query.head()));
    }

    #[test]
    fn test_different_id_never_matches() {
        let stored = path(&[MSCC, USU]);
        let query = QueryPath::new(TOTAL_OCTETS);
        assert!(!matches(stored.head().unwrap(), query.head()));
    }

    #[test]
    fn test_partial_query_anchors_innermost_levels() {
        let stored = path(&[SERVICE_INFO, MSCC, USU]);
        assert!(matches(stored.head().unwrap(), path(&[MSCC, USU]).head()));
        assert!(matches(
            stored.head().unwrap(),
            path(&[SERVICE_INFO, MSCC, USU]).head()
        ));
        assert!(!matches(
            stored.head().unwrap(),
            path(&[SERVICE_INFO, USU]).head()
        ));
    }

    #[test]
    fn test_matching_is_not_symmetric() {
        let longer = path(&[SERVICE_INFO, MSCC, USU]);
        let shorter = path(&[MSCC, USU]);
        assert!(matches(longer.head().unwrap(), shorter.head()));
        assert!(!matches(shorter.head().unwrap(), longer.head()));
    }

    #[test]
    fn test_wildcard_is_not_honored_by_matcher() {
        let stored = QueryPath::new(USU);
        let query = QueryPath::new(AvpId::new(0, WILDCARD));
        assert!(!matches(stored.head().unwrap(), query.head()));
    }

    #[test]
    fn test_occurrence_path_matches_query_path() {
        let nodes = vec![
            PathNode { id: MSCC, parent: None },
            PathNode { id: USU, parent: Some(0) },
        ];
        let leaf = OccurrencePath::new(&nodes, 1);
        assert!(leaf.matches(&path(&[MSCC, USU])));
        assert!(leaf.matches(&QueryPath::new(USU)));
        assert!(leaf.matches(&QueryPath::any()));
        assert!(!leaf.matches(&path(&[SERVICE_INFO, MSCC, USU])));
    }

    #[test]
    fn test_descend_leaves_original_untouched() {
        let scope = QueryPath::new(MSCC);
        let narrowed = scope.descend(USU);
        assert_eq!(scope.depth(), 1);
        assert_eq!(narrowed.depth(), 2);
        assert_eq!(narrowed.parent(), scope);
        assert_eq!(scope.id(), Some(MSCC));
        assert_eq!(narrowed.id(), Some(USU));
    }

    #[test]
    fn test_empty_path_has_no_head() {
        let any = QueryPath::any();
        assert!(any.is_any());
        assert_eq!(any.depth(), 0);
        assert!(any.id().is_none());
        assert!(any.parent().is_any());
    }
}

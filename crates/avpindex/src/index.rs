//! # The AVP Index
//!
//! Built once per decoded message, read-only afterwards.
//!
//! ## Layout
//!
//! ```text
//! AvpIndex
//! ├── paths:   Vec<PathNode>                  one node per AVP: (id, parent node)
//! └── buckets: HashMap<AvpId, Vec<LeafEntry>> every occurrence of an id, document order
//!                 LeafEntry = (path node, &AVP)
//! ```
//!
//! Every AVP in the tree, at any depth, gets exactly one path node and exactly one leaf
//! entry. Descendants of a group point at the group's node instead of copying the chain, so
//! the arena grows linearly with the number of AVPs.
//!
//! Same-id AVPs at different positions land in the same bucket as distinct entries. Nothing
//! is merged or deduplicated; telling them apart is the job of [`crate::path::matches`].
//!
//! ## Build Order
//!
//! The builder walks the tree depth-first with an explicit stack. A grouped AVP registers
//! its own leaf entry only after all of its children have been registered, so within a
//! bucket entries follow the order in which their subtrees finish. For scalar AVPs, which
//! is what lookups are after, that is plain document order.
//!
//! The walk is bounded by [`IndexerConfig::max_depth`]; a tree nested deeper than that is
//! rejected with [`AvpIndexError::MalformedTree`] rather than exhausting memory.
//!
//! ## Sharing
//!
//! Nothing in the index is mutated after [`AvpIndex::build`] returns, and queries allocate
//! their own paths. An `AvpIndex` over `Sync` records is `Sync`, so one index can serve
//! lookups from several threads without locking.

use crate::config::IndexerConfig;
use crate::error::{AvpIndexError, Result};
use crate::model::{Avp, AvpRecord, Message};
use crate::path::{AvpId, OccurrencePath, PathNode, QueryPath};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

struct LeafEntry<'a, A> {
    path: usize,
    avp: &'a A,
}

/// One indexed occurrence: where it sits and the record itself.
pub struct Leaf<'i, 'a, A> {
    pub path: OccurrencePath<'i>,
    pub avp: &'a A,
}

impl<A> Clone for Leaf<'_, '_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Leaf<'_, '_, A> {}

impl<A> fmt::Debug for Leaf<'_, '_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf").field("path", &self.path).finish()
    }
}

/// Maps every [`AvpId`] to all of its occurrences in one decoded message.
pub struct AvpIndex<'a, A: AvpRecord = Avp> {
    paths: Vec<PathNode>,
    buckets: HashMap<AvpId, Vec<LeafEntry<'a, A>>>,
    leaves: usize,
}

impl<'a, A: AvpRecord> AvpIndex<'a, A> {
    /// Index `roots` with the default configuration.
    pub fn build(roots: &'a [A]) -> Result<Self> {
        Self::build_with(roots, &IndexerConfig::default())
    }

    pub fn build_with(roots: &'a [A], config: &IndexerConfig) -> Result<Self> {
        let index = IndexBuilder::new(config.max_depth).build(roots)?;
        debug!(
            roots = roots.len(),
            leaves = index.leaves,
            ids = index.buckets.len(),
            "built AVP index"
        );
        Ok(index)
    }

    /// Number of leaf entries, which equals the number of AVPs in the tree.
    pub fn len(&self) -> usize {
        self.leaves
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Distinct ids present in the message, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = AvpId> + '_ {
        self.buckets.keys().copied()
    }

    /// Every occurrence of `id`, in bucket order, regardless of position.
    pub fn occurrences(&self, id: AvpId) -> impl Iterator<Item = Leaf<'_, 'a, A>> + '_ {
        self.bucket(id).iter().map(move |entry| self.leaf(entry))
    }

    /// Every leaf entry in the index. Order is only meaningful within one id.
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_, 'a, A>> + '_ {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter())
            .map(move |entry| self.leaf(entry))
    }

    /// Occurrences whose path satisfies `query`, in bucket order.
    ///
    /// The bucket is chosen by the query's innermost id; the empty query names no id and
    /// yields nothing.
    pub fn matching(&self, query: &QueryPath) -> impl Iterator<Item = Leaf<'_, 'a, A>> + '_ {
        let query = query.clone();
        let bucket: &[LeafEntry<'a, A>] = match query.id() {
            Some(id) => self.bucket(id),
            None => &[],
        };
        bucket
            .iter()
            .map(move |entry| self.leaf(entry))
            .filter(move |leaf| leaf.path.matches(&query))
    }

    /// First occurrence satisfying `query`.
    pub fn first_match(&self, query: &QueryPath) -> Option<Leaf<'_, 'a, A>> {
        self.matching(query).next()
    }

    fn bucket(&self, id: AvpId) -> &[LeafEntry<'a, A>] {
        self.buckets.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn leaf(&self, entry: &LeafEntry<'a, A>) -> Leaf<'_, 'a, A> {
        Leaf {
            path: OccurrencePath::new(&self.paths, entry.path),
            avp: entry.avp,
        }
    }
}

impl<'a> AvpIndex<'a, Avp> {
    /// Index the root AVPs of a decoded message.
    pub fn from_message(message: &'a Message) -> Result<Self> {
        Self::build(&message.avps)
    }
}

impl<A: AvpRecord> fmt::Debug for AvpIndex<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvpIndex")
            .field("leaves", &self.leaves)
            .field("ids", &self.buckets.len())
            .finish()
    }
}

/// A group whose children are still being walked.
struct Frame<'a, A> {
    avp: &'a A,
    node: usize,
    next_child: usize,
}

struct IndexBuilder<'a, A> {
    paths: Vec<PathNode>,
    buckets: HashMap<AvpId, Vec<LeafEntry<'a, A>>>,
    leaves: usize,
    max_depth: usize,
}

impl<'a, A: AvpRecord> IndexBuilder<'a, A> {
    fn new(max_depth: usize) -> Self {
        Self {
            paths: Vec::new(),
            buckets: HashMap::new(),
            leaves: 0,
            max_depth,
        }
    }

    fn build(mut self, roots: &'a [A]) -> Result<AvpIndex<'a, A>> {
        let mut stack: Vec<Frame<'a, A>> = Vec::new();
        for root in roots {
            self.enter(&mut stack, root, None)?;
            while let Some(top) = stack.last_mut() {
                let children = top.avp.children();
                if let Some(child) = children.get(top.next_child) {
                    top.next_child += 1;
                    let parent = top.node;
                    self.enter(&mut stack, child, Some(parent))?;
                } else if let Some(done) = stack.pop() {
                    self.register(done.avp, done.node);
                }
            }
        }
        Ok(AvpIndex {
            paths: self.paths,
            buckets: self.buckets,
            leaves: self.leaves,
        })
    }

    /// Allocate the path node for `avp` and push it on the walk stack.
    fn enter(
        &mut self,
        stack: &mut Vec<Frame<'a, A>>,
        avp: &'a A,
        parent: Option<usize>,
    ) -> Result<()> {
        let depth = stack.len() + 1;
        if depth > self.max_depth {
            warn!(
                id = %avp.id(),
                depth,
                max_depth = self.max_depth,
                "AVP tree nested too deeply, refusing to index"
            );
            return Err(AvpIndexError::MalformedTree {
                id: avp.id(),
                depth,
                max_depth: self.max_depth,
            });
        }
        let node = self.paths.len();
        self.paths.push(PathNode {
            id: avp.id(),
            parent,
        });
        stack.push(Frame {
            avp,
            node,
            next_child: 0,
        });
        Ok(())
    }

    fn register(&mut self, avp: &'a A, node: usize) {
        self.buckets
            .entry(avp.id())
            .or_default()
            .push(LeafEntry { path: node, avp });
        self.leaves += 1;
    }
}

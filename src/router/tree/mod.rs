//! Defines a hierarchical `Tree` with subtrees of `Node`, the structure the
//! router matches request paths against.

use hyper::Method;
use log::trace;

use crate::context::Params;
use crate::error::SetupError;
use crate::helpers::http::PercentDecoded;
use crate::router::route::{Category, HandlerSeq};
use crate::router::tree::node::Node;
use crate::router::tree::segment::SegmentType;

pub(crate) mod node;
pub mod segment;

pub(crate) use self::node::Match;

/// A hierarchical structure of linked nodes representing every registered
/// route path.
///
/// The `Tree` is populated through
/// [`RouterBuilder`](crate::router::builder::RouterBuilder) and is read-only
/// once the router is finished.
#[derive(Default)]
pub(crate) struct Tree {
    root: Node,
}

impl Tree {
    pub(crate) fn new() -> Self {
        trace!(" creating new tree");
        Tree::default()
    }

    /// Places `handlers` at the position named by `segments`, in the
    /// `(method, category)` cell of the terminal node or wildcard
    /// terminator.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        segments: &[SegmentType],
        category: Category,
        handlers: HandlerSeq,
        overwrite: bool,
        path: &str,
    ) -> Result<(), SetupError> {
        trace!(" adding {} handlers at `{} {}`", category, method, path);
        self.root
            .insert(segments, method, category, handlers, overwrite, path)
    }

    /// Produces every match for the request path, ordered by specificity:
    /// exact, then parameter-bearing, then single-segment wildcards, then
    /// multi-segment globs, deeper nodes before shallower within a rank.
    pub(crate) fn lookup(&self, segments: &[PercentDecoded]) -> Vec<Match<'_>> {
        let mut matches = Vec::new();
        self.root
            .collect(segments, 0, &Params::default(), false, &mut matches);
        matches.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| b.depth.cmp(&a.depth)));
        matches
    }

    /// Walks every populated `(segments, method, category, handlers)` cell.
    pub(crate) fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&[SegmentType], &Method, Category, &HandlerSeq),
    {
        let mut prefix = Vec::new();
        self.root.visit(&mut prefix, f);
    }
}

//! Defines `Node`, the recursive member of the route trie, and the match
//! walker that collects every route applying to a request path.

use std::collections::HashMap;

use hyper::Method;

use crate::context::Params;
use crate::error::SetupError;
use crate::helpers::http::PercentDecoded;
use crate::router::route::{Category, HandlerSeq, PipelineTable};
use crate::router::tree::segment::SegmentType;

/// The specificity rank of a match, most specific first. Within a rank,
/// deeper nodes precede shallower ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MatchRank {
    /// Every segment literal-matched.
    Exact,
    /// Matched using one or more `:name` captures, no wildcard.
    Dynamic,
    /// Matched through a `*` or `.*` terminator.
    Wildcard,
    /// Matched through a `**` or `.**` terminator.
    Glob,
}

/// One route position whose pattern matches a request path, with the
/// parameters captured on the way there.
pub(crate) struct Match<'a> {
    pub(crate) table: &'a PipelineTable,
    pub(crate) params: Params,
    pub(crate) rank: MatchRank,
    pub(crate) depth: usize,
}

struct DynamicChild {
    name: String,
    node: Box<Node>,
}

/// A recursive member of the trie representing one path segment.
///
/// Literal children are keyed by segment text; at most one dynamic child may
/// exist per node, and the four wildcard forms terminate here as pipeline
/// tables rather than child nodes (the compiler guarantees they are final
/// segments).
#[derive(Default)]
pub(crate) struct Node {
    children: HashMap<String, Node>,
    dynamic: Option<DynamicChild>,
    wildcard: Option<Box<PipelineTable>>,
    wildcard_or_self: Option<Box<PipelineTable>>,
    glob: Option<Box<PipelineTable>>,
    glob_or_self: Option<Box<PipelineTable>>,
    pipelines: PipelineTable,
}

impl Node {
    pub(crate) fn insert(
        &mut self,
        segments: &[SegmentType],
        method: Method,
        category: Category,
        handlers: HandlerSeq,
        overwrite: bool,
        path: &str,
    ) -> Result<(), SetupError> {
        match segments.split_first() {
            None => self.pipelines.insert(method, category, handlers, overwrite, path),

            Some((SegmentType::Static(segment), rest)) => self
                .children
                .entry(segment.clone())
                .or_default()
                .insert(rest, method, category, handlers, overwrite, path),

            Some((SegmentType::Dynamic(name), rest)) => {
                let child = self.dynamic.get_or_insert_with(|| DynamicChild {
                    name: name.clone(),
                    node: Box::new(Node::default()),
                });
                if child.name != *name {
                    return Err(SetupError::ParameterConflict {
                        path: path.to_string(),
                        existing: child.name.clone(),
                        offered: name.clone(),
                    });
                }
                child
                    .node
                    .insert(rest, method, category, handlers, overwrite, path)
            }

            Some((SegmentType::Wildcard { or_self }, _)) => {
                let slot = if *or_self {
                    &mut self.wildcard_or_self
                } else {
                    &mut self.wildcard
                };
                slot.get_or_insert_with(Default::default)
                    .insert(method, category, handlers, overwrite, path)
            }

            Some((SegmentType::Glob { or_self }, _)) => {
                let slot = if *or_self {
                    &mut self.glob_or_self
                } else {
                    &mut self.glob
                };
                slot.get_or_insert_with(Default::default)
                    .insert(method, category, handlers, overwrite, path)
            }
        }
    }

    /// Recursively collects every match for the remaining request segments.
    ///
    /// Descent tries the literal child first, then the dynamic child
    /// (capturing the consumed segment); the current node's wildcard
    /// terminators are recorded whenever their arity accepts the remaining
    /// segment count.
    pub(crate) fn collect<'a>(
        &'a self,
        remaining: &[PercentDecoded],
        depth: usize,
        params: &Params,
        dynamic_used: bool,
        out: &mut Vec<Match<'a>>,
    ) {
        if let Some(table) = &self.glob_or_self {
            out.push(Match {
                table,
                params: params.clone(),
                rank: MatchRank::Glob,
                depth,
            });
        }
        if !remaining.is_empty() {
            if let Some(table) = &self.glob {
                out.push(Match {
                    table,
                    params: params.clone(),
                    rank: MatchRank::Glob,
                    depth,
                });
            }
        }
        if remaining.len() <= 1 {
            if let Some(table) = &self.wildcard_or_self {
                out.push(Match {
                    table,
                    params: params.clone(),
                    rank: MatchRank::Wildcard,
                    depth,
                });
            }
        }
        if remaining.len() == 1 {
            if let Some(table) = &self.wildcard {
                out.push(Match {
                    table,
                    params: params.clone(),
                    rank: MatchRank::Wildcard,
                    depth,
                });
            }
        }

        match remaining.split_first() {
            None => {
                if !self.pipelines.is_empty() {
                    out.push(Match {
                        table: &self.pipelines,
                        params: params.clone(),
                        rank: if dynamic_used {
                            MatchRank::Dynamic
                        } else {
                            MatchRank::Exact
                        },
                        depth,
                    });
                }
            }
            Some((head, tail)) => {
                if let Some(child) = self.children.get(head.as_ref()) {
                    child.collect(tail, depth + 1, params, dynamic_used, out);
                }
                if let Some(dynamic) = &self.dynamic {
                    let mut captured = params.clone();
                    captured.insert(dynamic.name.clone(), head.as_ref().to_string());
                    dynamic.node.collect(tail, depth + 1, &captured, true, out);
                }
            }
        }
    }

    /// Walks every populated cell in this subtree, handing the accumulated
    /// segment prefix to `f`. Used to copy routes during composition.
    pub(crate) fn visit<F>(&self, prefix: &mut Vec<SegmentType>, f: &mut F)
    where
        F: FnMut(&[SegmentType], &Method, Category, &HandlerSeq),
    {
        self.pipelines
            .visit(&mut |method, category, handlers| f(prefix, method, category, handlers));

        if let Some(table) = &self.wildcard {
            prefix.push(SegmentType::Wildcard { or_self: false });
            table.visit(&mut |method, category, handlers| f(prefix, method, category, handlers));
            prefix.pop();
        }
        if let Some(table) = &self.wildcard_or_self {
            prefix.push(SegmentType::Wildcard { or_self: true });
            table.visit(&mut |method, category, handlers| f(prefix, method, category, handlers));
            prefix.pop();
        }
        if let Some(table) = &self.glob {
            prefix.push(SegmentType::Glob { or_self: false });
            table.visit(&mut |method, category, handlers| f(prefix, method, category, handlers));
            prefix.pop();
        }
        if let Some(table) = &self.glob_or_self {
            prefix.push(SegmentType::Glob { or_self: true });
            table.visit(&mut |method, category, handlers| f(prefix, method, category, handlers));
            prefix.pop();
        }

        for (segment, child) in &self.children {
            prefix.push(SegmentType::Static(segment.clone()));
            child.visit(prefix, f);
            prefix.pop();
        }
        if let Some(dynamic) = &self.dynamic {
            prefix.push(SegmentType::Dynamic(dynamic.name.clone()));
            dynamic.node.visit(prefix, f);
            prefix.pop();
        }
    }
}

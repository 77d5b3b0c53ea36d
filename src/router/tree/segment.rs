//! Defines `SegmentType` for the route trie.

use std::fmt;

/// Indicates the type of segment which is being represented by one position
/// in a route path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentType {
    /// Matched exactly (string equality) against the corresponding segment
    /// of incoming request paths. Values matched by this segment are not
    /// captured.
    Static(String),

    /// Matches any single corresponding segment, capturing its value into
    /// the request params under the given name.
    Dynamic(String),

    /// Matches exactly one segment without capturing (`*`), or, with
    /// `or_self`, zero or one segments (`.*`). Only valid in terminal
    /// position.
    Wildcard {
        /// True for the `.*` form, which also matches the node itself.
        or_self: bool,
    },

    /// Matches one or more trailing segments without capturing (`**`), or,
    /// with `or_self`, zero or more (`.**`). Only valid in terminal
    /// position.
    Glob {
        /// True for the `.**` form, which also matches the node itself.
        or_self: bool,
    },
}

impl SegmentType {
    /// True for the wildcard and glob forms, which the compiler only permits
    /// as the final segment of a route path.
    pub(crate) fn is_terminal_only(&self) -> bool {
        matches!(self, SegmentType::Wildcard { .. } | SegmentType::Glob { .. })
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentType::Static(s) => f.write_str(s),
            SegmentType::Dynamic(name) => write!(f, ":{}", name),
            SegmentType::Wildcard { or_self: false } => f.write_str("*"),
            SegmentType::Wildcard { or_self: true } => f.write_str(".*"),
            SegmentType::Glob { or_self: false } => f.write_str("**"),
            SegmentType::Glob { or_self: true } => f.write_str(".**"),
        }
    }
}

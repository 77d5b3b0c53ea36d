//! Defines helper functions for processing the request path.

use crate::helpers::http::PercentDecoded;

/// Holder for request URI path segments that have been split into individual
/// segments.
///
/// Used internally by the router when walking its trie. Interior empty
/// segments are collapsed, so `/some/path/to//my/handler` splits into
/// `["some", "path", "to", "my", "handler"]`. A trailing empty segment (a
/// path ending in `/`) is preserved unless trailing-slash normalization is
/// enabled, keeping `/api` and `/api/` distinct routes by default.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestPathSegments {
    segments: Vec<PercentDecoded>,
}

impl RequestPathSegments {
    /// Creates a new `RequestPathSegments` instance by splitting a request
    /// URI path.
    pub(crate) fn new(path: &str, normalize_trailing_slash: bool) -> Self {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let pieces: Vec<&str> = trimmed.split('/').collect();
        let last = pieces.len() - 1;

        let segments = pieces
            .iter()
            .enumerate()
            .filter(|(i, piece)| !piece.is_empty() || (*i == last && !normalize_trailing_slash))
            .filter_map(|(_, piece)| PercentDecoded::new(piece))
            .collect();

        RequestPathSegments { segments }
    }

    /// Provides the split segments.
    pub(crate) fn segments(&self) -> &[PercentDecoded] {
        &self.segments
    }
}

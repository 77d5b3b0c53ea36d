//! Parses the route DSL: `"METHOD /path"` strings into method sets and
//! segment lists.

use hyper::Method;

use crate::error::SetupError;
use crate::router::tree::segment::SegmentType;

const ALL_METHODS: [Method; 7] = [
    Method::HEAD,
    Method::OPTIONS,
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

const CRUD_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// A parsed route registration: the set of methods it applies to and the
/// compiled path segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    methods: Vec<Method>,
    segments: Vec<SegmentType>,
}

impl RouteSpec {
    /// Parses a single spec string such as `"GET /api/users/:id"`.
    ///
    /// The method token may also be `ALL` (all seven methods) or `CRUD`
    /// (GET, POST, PUT, PATCH, DELETE). The bare token `"*"` is shorthand
    /// for all methods at `/.**`.
    pub fn parse(raw: &str) -> Result<RouteSpec, SetupError> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(RouteSpec {
                methods: ALL_METHODS.to_vec(),
                segments: vec![SegmentType::Glob { or_self: true }],
            });
        }

        let (token, path) = raw
            .split_once(' ')
            .ok_or_else(|| SetupError::MalformedSpec(raw.to_string()))?;

        Ok(RouteSpec {
            methods: expand_method_token(token.trim())?,
            segments: parse_path(path.trim())?,
        })
    }

    /// The methods this spec registers.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The compiled path segments.
    pub(crate) fn segments(&self) -> &[SegmentType] {
        &self.segments
    }

    pub(crate) fn into_parts(self) -> (Vec<Method>, Vec<SegmentType>) {
        (self.methods, self.segments)
    }

    /// Renders the path back to its string form. Round-trips with the parsed
    /// input, modulo trailing-slash normalization.
    pub fn path(&self) -> String {
        render_path(&self.segments)
    }

    /// Drops a trailing empty segment, collapsing `/api/` to `/api`.
    pub(crate) fn normalize(&mut self) {
        if self.segments.last() == Some(&SegmentType::Static(String::new())) {
            self.segments.pop();
        }
    }
}

/// Renders compiled segments back to a path string.
pub(crate) fn render_path(segments: &[SegmentType]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    out
}

fn expand_method_token(token: &str) -> Result<Vec<Method>, SetupError> {
    let methods = match token {
        "ALL" => ALL_METHODS.to_vec(),
        "CRUD" => CRUD_METHODS.to_vec(),
        "HEAD" => vec![Method::HEAD],
        "OPTIONS" => vec![Method::OPTIONS],
        "GET" => vec![Method::GET],
        "POST" => vec![Method::POST],
        "PUT" => vec![Method::PUT],
        "PATCH" => vec![Method::PATCH],
        "DELETE" => vec![Method::DELETE],
        other => return Err(SetupError::InvalidMethod(other.to_string())),
    };
    Ok(methods)
}

/// Compiles a path into segments, verifying the leading slash and that
/// wildcard forms only appear terminally.
pub(crate) fn parse_path(path: &str) -> Result<Vec<SegmentType>, SetupError> {
    let trimmed = path
        .strip_prefix('/')
        .ok_or_else(|| SetupError::MissingLeadingSlash(path.to_string()))?;

    let pieces: Vec<&str> = trimmed.split('/').collect();
    let last = pieces.len() - 1;
    let mut segments = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        let segment = match *piece {
            "" => {
                // Interior empty segments collapse; a trailing one is the
                // distinct `/api/` form.
                if i == last {
                    SegmentType::Static(String::new())
                } else {
                    continue;
                }
            }
            "*" => SegmentType::Wildcard { or_self: false },
            ".*" => SegmentType::Wildcard { or_self: true },
            "**" => SegmentType::Glob { or_self: false },
            ".**" => SegmentType::Glob { or_self: true },
            p if p.starts_with(':') => {
                let name = &p[1..];
                if name.is_empty() {
                    return Err(SetupError::UnnamedParameter(path.to_string()));
                }
                SegmentType::Dynamic(name.to_string())
            }
            p => SegmentType::Static(p.to_string()),
        };

        if i != last && segment.is_terminal_only() {
            return Err(SetupError::MidPathWildcard {
                path: path.to_string(),
                segment: piece.to_string(),
            });
        }

        segments.push(segment);
    }

    Ok(segments)
}

/// Conversion of registration inputs into one or more route specs.
///
/// Implemented for single spec strings, slices and vectors of them, and
/// already-parsed [`RouteSpec`] values.
pub trait IntoRouteSpecs {
    /// Parses `self` into route specs.
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError>;
}

impl IntoRouteSpecs for &str {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        Ok(vec![RouteSpec::parse(self)?])
    }
}

impl IntoRouteSpecs for String {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        self.as_str().into_route_specs()
    }
}

impl IntoRouteSpecs for &[&str] {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        self.iter().map(|raw| RouteSpec::parse(raw)).collect()
    }
}

impl<const N: usize> IntoRouteSpecs for [&str; N] {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        self[..].into_route_specs()
    }
}

impl IntoRouteSpecs for Vec<&str> {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        self.as_slice().into_route_specs()
    }
}

impl IntoRouteSpecs for RouteSpec {
    fn into_route_specs(self) -> Result<Vec<RouteSpec>, SetupError> {
        Ok(vec![self])
    }
}

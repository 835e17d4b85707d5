//! Directory-name classification for route segments
//!
//! Maps one directory name of the pages tree to a typed `SegmentKind`.

use std::fmt;

use crate::error::RouteError;

/// The kind of a route segment, derived from its directory name
///
/// # Examples
///
/// ```
/// use canopy::segment::{classify_segment, SegmentKind};
///
/// assert_eq!(classify_segment("about").unwrap(), SegmentKind::Static("about".into()));
/// assert_eq!(classify_segment("[id]").unwrap(), SegmentKind::Dynamic("id".into()));
/// assert_eq!(classify_segment("[...slug]").unwrap(), SegmentKind::CatchAll("slug".into()));
/// assert_eq!(
///     classify_segment("[[...slug]]").unwrap(),
///     SegmentKind::OptionalCatchAll("slug".into())
/// );
/// assert_eq!(classify_segment("(shop)").unwrap(), SegmentKind::Group("shop".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// The tree root; has no directory name
    Root,
    /// Fixed text matched against one path part
    Static(String),
    /// `[name]`: captures exactly one path part
    Dynamic(String),
    /// `[...name]`: captures one or more remaining parts
    CatchAll(String),
    /// `[[...name]]`: captures zero or more remaining parts
    OptionalCatchAll(String),
    /// `(name)`: organizes files without consuming a path part
    Group(String),
}

impl SegmentKind {
    /// Name of the captured parameter, if this segment captures one
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Dynamic(name) | Self::CatchAll(name) | Self::OptionalCatchAll(name) => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether this segment consumes path parts when matching
    pub fn consumes_path(&self) -> bool {
        !matches!(self, Self::Root | Self::Group(_))
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::CatchAll(_) | Self::OptionalCatchAll(_))
    }

    /// Matching precedence among siblings, lower goes first
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::Root => 0,
            Self::Static(_) => 1,
            Self::Group(_) => 2,
            Self::Dynamic(_) => 3,
            Self::CatchAll(_) => 4,
            Self::OptionalCatchAll(_) => 5,
        }
    }

    /// URL pattern fragment: `users`, `:id`, `*slug`, `*slug?`
    ///
    /// Root and groups contribute nothing to the URL.
    pub fn url_fragment(&self) -> Option<String> {
        match self {
            Self::Root | Self::Group(_) => None,
            Self::Static(name) => Some(name.clone()),
            Self::Dynamic(name) => Some(format!(":{name}")),
            Self::CatchAll(name) => Some(format!("*{name}")),
            Self::OptionalCatchAll(name) => Some(format!("*{name}?")),
        }
    }
}

/// Renders the directory name the segment was declared with
impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(""),
            Self::Static(name) => f.write_str(name),
            Self::Dynamic(name) => write!(f, "[{name}]"),
            Self::CatchAll(name) => write!(f, "[...{name}]"),
            Self::OptionalCatchAll(name) => write!(f, "[[...{name}]]"),
            Self::Group(name) => write!(f, "({name})"),
        }
    }
}

/// Classifies a directory name into a segment kind
///
/// # Parsing rules (evaluated in order)
///
/// 1. `[[...name]]` → optional catch-all
/// 2. `[...name]` → catch-all
/// 3. `[name]` → dynamic
/// 4. `(name)` → route group
/// 5. anything else → static
///
/// Brackets that do not form one of these shapes are rejected rather than
/// matched literally.
pub fn classify_segment(segment: &str) -> Result<SegmentKind, RouteError> {
    if segment.is_empty() {
        return Err(RouteError::invalid(segment, "empty segment"));
    }
    if segment.contains(['/', '\\']) {
        return Err(RouteError::invalid(segment, "segment contains a path separator"));
    }

    if let Some(inner) = segment.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
        return match inner.strip_prefix("...") {
            Some(name) => param_name(segment, name).map(SegmentKind::OptionalCatchAll),
            None => Err(RouteError::invalid(
                segment,
                "double brackets are only valid for optional catch-all `[[...name]]`",
            )),
        };
    }

    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match inner.strip_prefix("...") {
            Some(name) => param_name(segment, name).map(SegmentKind::CatchAll),
            None => param_name(segment, inner).map(SegmentKind::Dynamic),
        };
    }

    if let Some(inner) = segment.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        if inner.is_empty() || inner.starts_with('.') {
            return Err(RouteError::invalid(segment, "invalid route group name"));
        }
        return Ok(SegmentKind::Group(inner.to_string()));
    }

    if segment.contains(['[', ']']) {
        return Err(RouteError::invalid(segment, "unbalanced brackets"));
    }

    Ok(SegmentKind::Static(segment.to_string()))
}

fn param_name(segment: &str, name: &str) -> Result<String, RouteError> {
    if name.is_empty() {
        return Err(RouteError::invalid(segment, "missing parameter name"));
    }
    if name.contains(['[', ']', '.']) {
        return Err(RouteError::invalid(segment, "malformed parameter name"));
    }
    Ok(name.to_string())
}

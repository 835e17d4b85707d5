//! Nearest-first boundary lookup
//!
//! A boundary (`loading`, `error` or `not-found`) defined on a segment covers
//! every route below it. Lookup walks from the leaf of a resolved route back
//! to the root and stops at the first segment defining the requested kind,
//! so deeper definitions shadow shallower ones.

use std::fmt;

use tracing::debug;

use crate::error::RouteError;
use crate::resolve::ResolvedRoute;
use crate::tree::RouteSegment;

/// Fallback UI kinds scoped to a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Loading,
    Error,
    NotFound,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::Error => "error",
            Self::NotFound => "not-found",
        })
    }
}

/// A boundary found for a route
#[derive(Debug)]
pub struct Boundary<'t, H> {
    /// Depth of the defining segment; the root has depth 0
    pub depth: usize,
    pub segment: &'t RouteSegment<H>,
    pub handler: &'t H,
}

impl<'t, H> Clone for Boundary<'t, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'t, H> Copy for Boundary<'t, H> {}

/// Finds the nearest boundary of `kind` for the leaf of `route`
///
/// # Examples
///
/// ```
/// use canopy::{resolve_boundary, BoundaryKind, FileKind, RouteTree};
///
/// let mut builder = RouteTree::builder();
/// builder.add("/", FileKind::Loading, "root loading").unwrap();
/// builder.add("users", FileKind::Loading, "users loading").unwrap();
/// builder.add("users/[id]", FileKind::Page, "detail").unwrap();
/// let tree = builder.build().unwrap();
///
/// let route = tree.resolve("/users/42").unwrap();
/// let boundary = resolve_boundary(&route, BoundaryKind::Loading).unwrap();
/// assert_eq!(boundary.handler, &"users loading");
/// assert_eq!(boundary.depth, 1);
/// ```
pub fn resolve_boundary<'t, H>(
    route: &ResolvedRoute<'t, H>,
    kind: BoundaryKind,
) -> Result<Boundary<'t, H>, RouteError> {
    resolve_boundary_from(route, kind, route.depth())
}

/// Finds the nearest boundary of `kind` at or above `depth`
///
/// A failing layout at depth `d` is caught from `d - 1`, since a boundary
/// wraps the contents of its segment but not the segment's own layout.
/// Depths beyond the leaf are clamped to the leaf.
pub fn resolve_boundary_from<'t, H>(
    route: &ResolvedRoute<'t, H>,
    kind: BoundaryKind,
    depth: usize,
) -> Result<Boundary<'t, H>, RouteError> {
    let start = depth.min(route.depth());

    let found = route.segments()[..=start]
        .iter()
        .copied()
        .enumerate()
        .rev()
        .find_map(|(depth, segment)| {
            segment.handler(kind.into()).map(|handler| Boundary {
                depth,
                segment,
                handler,
            })
        });

    match found {
        Some(boundary) => {
            debug!(%kind, path = route.path(), at = boundary.segment.dir(), "boundary resolved");
            Ok(boundary)
        }
        None => Err(RouteError::NoBoundaryDefined {
            kind,
            path: route.path().to_string(),
        }),
    }
}

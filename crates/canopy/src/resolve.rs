//! Matching request paths against a `RouteTree`
//!
//! Resolution is a pure, synchronous walk over the immutable tree. At each
//! level children are tried in precedence order (static, group, dynamic,
//! catch-all, optional catch-all) with backtracking, so the most specific
//! route wins.

use std::collections::HashMap;

use tracing::debug;

use crate::boundary::{resolve_boundary, Boundary, BoundaryKind};
use crate::error::RouteError;
use crate::layout::{compose_layouts, LayoutChain};
use crate::path::split_path;
use crate::segment::SegmentKind;
use crate::tree::{RouteSegment, RouteTree};

/// A captured dynamic value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Captured by `[name]`
    One(String),
    /// Captured by `[...name]` or `[[...name]]`, in path order
    Many(Vec<String>),
}

impl ParamValue {
    pub fn as_one(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[String]> {
        match self {
            Self::One(_) => None,
            Self::Many(values) => Some(values),
        }
    }

    /// Single value, or the parts joined with `/`
    pub fn joined(&self) -> String {
        match self {
            Self::One(value) => value.clone(),
            Self::Many(values) => values.join("/"),
        }
    }
}

/// Dynamic values captured while resolving a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, ParamValue>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Value of a `[name]` capture
    pub fn one(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_one)
    }

    /// Parts of a catch-all capture
    pub fn many(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ParamValue::as_many)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The outcome of matching a path against the tree
///
/// Holds the segments traversed from root to leaf, borrowed from the tree,
/// and the captured parameters. Created per request and never mutated.
#[derive(Debug)]
pub struct ResolvedRoute<'t, H> {
    path: String,
    segments: Vec<&'t RouteSegment<H>>,
    params: Params,
    matched: bool,
}

impl<'t, H> Clone for ResolvedRoute<'t, H> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            segments: self.segments.clone(),
            params: self.params.clone(),
            matched: self.matched,
        }
    }
}

impl<'t, H> ResolvedRoute<'t, H> {
    /// The request path this route was resolved from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Segments from root (index 0) to leaf
    pub fn segments(&self) -> &[&'t RouteSegment<H>] {
        &self.segments
    }

    pub fn segment(&self, depth: usize) -> Option<&'t RouteSegment<H>> {
        self.segments.get(depth).copied()
    }

    pub fn leaf(&self) -> &'t RouteSegment<H> {
        // The root is always present
        self.segments[self.segments.len() - 1]
    }

    /// Depth of the leaf; the root has depth 0
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// `false` for a longest-prefix resolution of an unknown path
    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// The page to render, present only for a full match
    pub fn page(&self) -> Option<&'t H> {
        if self.matched {
            self.leaf().page()
        } else {
            None
        }
    }

    /// URL pattern of the leaf, e.g. `/users/:id`
    pub fn pattern(&self) -> &'t str {
        self.leaf().pattern()
    }

    /// Nearest boundary of `kind`, see [`resolve_boundary`]
    pub fn boundary(&self, kind: BoundaryKind) -> Result<Boundary<'t, H>, RouteError> {
        resolve_boundary(self, kind)
    }

    /// Layouts from root to leaf, see [`compose_layouts`]
    pub fn layouts(&self) -> LayoutChain<'t, H> {
        compose_layouts(self)
    }
}

impl<H> RouteTree<H> {
    /// Resolves a request path to a page
    ///
    /// Returns `None` when no page answers the path.
    ///
    /// # Examples
    ///
    /// ```
    /// use canopy::{FileKind, RouteTree};
    ///
    /// let mut builder = RouteTree::builder();
    /// builder.add("/", FileKind::Page, "home").unwrap();
    /// builder.add("users", FileKind::Page, "list").unwrap();
    /// builder.add("users/[id]", FileKind::Page, "detail").unwrap();
    /// let tree = builder.build().unwrap();
    ///
    /// let route = tree.resolve("/users/42").unwrap();
    /// assert_eq!(route.params().one("id"), Some("42"));
    /// assert_eq!(route.page(), Some(&"detail"));
    /// ```
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute<'_, H>> {
        let parts = split_path(path);
        let mut trail = vec![self.root()];
        let mut params = Params::default();

        let case_insensitive = self.is_case_insensitive();
        if match_segment(self.root(), &parts, &mut trail, &mut params, case_insensitive) {
            debug!(path, pattern = trail[trail.len() - 1].pattern(), "resolved route");
            Some(ResolvedRoute {
                path: path.to_string(),
                segments: trail,
                params,
                matched: true,
            })
        } else {
            debug!(path, "no route matched");
            None
        }
    }

    /// Resolves the deepest segment chain matching a prefix of `path`
    ///
    /// Used to scope not-found output for unknown paths: the result always
    /// contains at least the root and reports `is_match() == false`.
    pub fn resolve_partial(&self, path: &str) -> ResolvedRoute<'_, H> {
        let parts = split_path(path);
        let mut best = Prefix {
            consumed: 0,
            segments: vec![self.root()],
            params: Params::default(),
        };
        let mut trail = vec![self.root()];
        let mut params = Params::default();
        longest_prefix(
            self.root(),
            &parts,
            0,
            &mut trail,
            &mut params,
            &mut best,
            self.is_case_insensitive(),
        );

        ResolvedRoute {
            path: path.to_string(),
            segments: best.segments,
            params: best.params,
            matched: false,
        }
    }
}

fn static_eq(name: &str, part: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        name.eq_ignore_ascii_case(part)
    } else {
        name == part
    }
}

fn match_segment<'t, H>(
    segment: &'t RouteSegment<H>,
    parts: &[String],
    trail: &mut Vec<&'t RouteSegment<H>>,
    params: &mut Params,
    case_insensitive: bool,
) -> bool {
    if parts.is_empty() && segment.page().is_some() {
        return true;
    }

    for child in segment.children() {
        let (rest, capture): (&[String], Option<(&str, ParamValue)>) = match child.kind() {
            SegmentKind::Static(name) => match parts.split_first() {
                Some((first, rest)) if static_eq(name, first, case_insensitive) => (rest, None),
                _ => continue,
            },
            SegmentKind::Group(_) => (parts, None),
            SegmentKind::Dynamic(name) => match parts.split_first() {
                Some((first, rest)) => (rest, Some((name.as_str(), ParamValue::One(first.clone())))),
                None => continue,
            },
            SegmentKind::CatchAll(name) => {
                if parts.is_empty() {
                    continue;
                }
                (&[], Some((name.as_str(), ParamValue::Many(parts.to_vec()))))
            }
            SegmentKind::OptionalCatchAll(name) => {
                let capture = (!parts.is_empty())
                    .then(|| (name.as_str(), ParamValue::Many(parts.to_vec())));
                (&[], capture)
            }
            SegmentKind::Root => continue,
        };

        trail.push(child);
        let captured = capture.map(|(name, value)| {
            params.insert(name, value);
            name
        });

        if match_segment(child, rest, trail, params, case_insensitive) {
            return true;
        }

        if let Some(name) = captured {
            params.remove(name);
        }
        trail.pop();
    }

    false
}

struct Prefix<'t, H> {
    consumed: usize,
    segments: Vec<&'t RouteSegment<H>>,
    params: Params,
}

fn longest_prefix<'t, H>(
    segment: &'t RouteSegment<H>,
    parts: &[String],
    consumed: usize,
    trail: &mut Vec<&'t RouteSegment<H>>,
    params: &mut Params,
    best: &mut Prefix<'t, H>,
    case_insensitive: bool,
) {
    if consumed > best.consumed {
        best.consumed = consumed;
        best.segments = trail.clone();
        best.params = params.clone();
    }

    let Some(part) = parts.get(consumed) else {
        return;
    };

    for child in segment.children() {
        let (next, capture) = match child.kind() {
            SegmentKind::Static(name) if static_eq(name, part, case_insensitive) => {
                (consumed + 1, None)
            }
            SegmentKind::Group(_) => (consumed, None),
            SegmentKind::Dynamic(name) => (consumed + 1, Some(name.as_str())),
            _ => continue,
        };

        trail.push(child);
        if let Some(name) = capture {
            params.insert(name, ParamValue::One(part.clone()));
        }
        longest_prefix(child, parts, next, trail, params, best, case_insensitive);
        if let Some(name) = capture {
            params.remove(name);
        }
        trail.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::FileKind;

    fn tree(pages: &[&'static str]) -> RouteTree<&'static str> {
        let mut builder = RouteTree::builder();
        for dir in pages {
            builder.add(dir, FileKind::Page, *dir).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_resolve_root() {
        let tree = tree(&["/"]);
        let route = tree.resolve("/").unwrap();
        assert_eq!(route.depth(), 0);
        assert!(route.params().is_empty());
    }

    #[test]
    fn test_static_beats_dynamic() {
        let tree = tree(&["users/new", "users/[id]"]);
        assert_eq!(tree.resolve("/users/new").unwrap().page(), Some(&"users/new"));
        assert_eq!(tree.resolve("/users/7").unwrap().page(), Some(&"users/[id]"));
    }

    #[test]
    fn test_backtracks_into_dynamic_sibling() {
        // `/users/new/edit` has no static page, so `[id]/edit` answers it
        let tree = tree(&["users/new", "users/[id]/edit"]);
        let route = tree.resolve("/users/new/edit").unwrap();
        assert_eq!(route.page(), Some(&"users/[id]/edit"));
        assert_eq!(route.params().one("id"), Some("new"));
    }

    #[test]
    fn test_params_cleared_on_backtrack() {
        // `x/[a]` captures `a` before failing, then `[b]/q` answers
        let tree = tree(&["x/[a]/never", "[b]/q"]);
        let route = tree.resolve("/x/q").unwrap();
        assert_eq!(route.page(), Some(&"[b]/q"));
        assert_eq!(route.params().len(), 1);
        assert_eq!(route.params().one("b"), Some("x"));
    }

    #[test]
    fn test_catch_all_requires_one_part() {
        let tree = tree(&["docs/[...slug]"]);
        assert!(tree.resolve("/docs").is_none());
        let route = tree.resolve("/docs/guide/intro").unwrap();
        assert_eq!(
            route.params().many("slug"),
            Some(&["guide".to_string(), "intro".to_string()][..])
        );
    }

    #[test]
    fn test_optional_catch_all_matches_zero_parts() {
        let tree = tree(&["shop/[[...slug]]"]);
        let route = tree.resolve("/shop").unwrap();
        assert!(route.params().get("slug").is_none());
        assert_eq!(route.pattern(), "/shop/*slug?");

        let route = tree.resolve("/shop/a/b").unwrap();
        assert_eq!(route.params().get("slug").unwrap().joined(), "a/b");
    }

    #[test]
    fn test_group_is_transparent() {
        let tree = tree(&["(marketing)/about", "(shop)/cart"]);
        let route = tree.resolve("/cart").unwrap();
        let dirs: Vec<&str> = route.segments().iter().map(|s| s.dir()).collect();
        assert_eq!(dirs, vec!["/", "/(shop)", "/(shop)/cart"]);
        assert!(tree.resolve("/(shop)/cart").is_none());
    }

    #[test]
    fn test_segment_without_page_is_not_navigable() {
        let tree = tree(&["users/[id]"]);
        assert!(tree.resolve("/users").is_none());
    }

    #[test]
    fn test_case_insensitive_matching() {
        let mut builder = RouteTree::builder().case_insensitive(true);
        builder.add("About", FileKind::Page, "about").unwrap();
        let tree = builder.build().unwrap();
        assert!(tree.resolve("/about").is_some());
        assert!(tree.resolve("/ABOUT").is_some());

        let tree = self::tree(&["About"]);
        assert!(tree.resolve("/about").is_none());
    }

    #[test]
    fn test_malformed_paths_are_normalized() {
        let tree = tree(&["users/[id]"]);
        let route = tree.resolve("//users\\42/").unwrap();
        assert_eq!(route.params().one("id"), Some("42"));
        assert_eq!(route.path(), "//users\\42/");
    }

    #[test]
    fn test_resolve_partial_longest_prefix() {
        let tree = tree(&["users/[id]/settings", "docs"]);

        let route = tree.resolve_partial("/users/9/unknown");
        assert!(!route.is_match());
        assert_eq!(route.pattern(), "/users/:id");
        assert_eq!(route.params().one("id"), Some("9"));
        assert_eq!(route.page(), None);

        let route = tree.resolve_partial("/nothing/here");
        assert_eq!(route.depth(), 0);
    }
}

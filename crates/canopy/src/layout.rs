//! Nested layout composition
//!
//! Layouts are collected from the root to the leaf of a resolved route, so
//! the first entry is the outermost wrapper. Composition folds the other way:
//! the innermost layout receives the page output and each outer layout
//! receives the output of the layout below it.
//!
//! Each layout must place its children exactly once. The composer does not
//! check this.

use tracing::debug;

use crate::resolve::ResolvedRoute;
use crate::tree::RouteSegment;

/// One layout of a chain
#[derive(Debug)]
pub struct LayoutEntry<'t, H> {
    pub depth: usize,
    pub segment: &'t RouteSegment<H>,
    pub handler: &'t H,
}

impl<'t, H> Clone for LayoutEntry<'t, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'t, H> Copy for LayoutEntry<'t, H> {}

/// Layouts of a route, outermost first
#[derive(Debug)]
pub struct LayoutChain<'t, H> {
    entries: Vec<LayoutEntry<'t, H>>,
}

impl<'t, H> Clone for LayoutChain<'t, H> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

/// Collects the layouts of `route` from root to leaf
///
/// # Examples
///
/// ```
/// use canopy::{compose_layouts, FileKind, RouteTree};
///
/// let mut builder = RouteTree::builder();
/// builder.add("/", FileKind::Layout, "root").unwrap();
/// builder.add("users", FileKind::Layout, "users").unwrap();
/// builder.add("users/[id]", FileKind::Page, "page").unwrap();
/// let tree = builder.build().unwrap();
///
/// let route = tree.resolve("/users/42").unwrap();
/// let chain = compose_layouts(&route);
/// assert_eq!(chain.handlers(), vec![&"root", &"users"]);
///
/// let html = chain.wrap("page".to_string(), |layout, inner| format!("{}({})", layout.handler, inner));
/// assert_eq!(html, "root(users(page))");
/// ```
pub fn compose_layouts<'t, H>(route: &ResolvedRoute<'t, H>) -> LayoutChain<'t, H> {
    let entries: Vec<_> = route
        .segments()
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(depth, segment)| {
            segment.layout().map(|handler| LayoutEntry {
                depth,
                segment,
                handler,
            })
        })
        .collect();

    debug!(path = route.path(), layouts = entries.len(), "composed layouts");
    LayoutChain { entries }
}

impl<'t, H> LayoutChain<'t, H> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from the outermost layout to the innermost
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LayoutEntry<'t, H>> + '_ {
        self.entries.iter()
    }

    pub fn handlers(&self) -> Vec<&'t H> {
        self.entries.iter().map(|entry| entry.handler).collect()
    }

    /// The innermost layout at or above `depth`
    pub fn nearest(&self, depth: usize) -> Option<LayoutEntry<'t, H>> {
        self.entries.iter().rev().find(|entry| entry.depth <= depth).copied()
    }

    /// The chain restricted to layouts at or above `depth`
    ///
    /// A fallback rendered by a boundary at `depth` is wrapped by exactly
    /// these layouts.
    pub fn up_to(&self, depth: usize) -> LayoutChain<'t, H> {
        LayoutChain {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.depth <= depth)
                .copied()
                .collect(),
        }
    }

    /// Folds `content` through the layouts, innermost first
    pub fn wrap<T, F>(&self, content: T, mut f: F) -> T
    where
        F: FnMut(&LayoutEntry<'t, H>, T) -> T,
    {
        self.entries
            .iter()
            .rev()
            .fold(content, |inner, entry| f(entry, inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{FileKind, RouteTree};

    fn tree(layouts: &[&'static str]) -> RouteTree<&'static str> {
        let mut builder = RouteTree::builder();
        builder.add("users/[id]", FileKind::Page, "page").unwrap();
        builder.add("about", FileKind::Page, "about").unwrap();
        for dir in layouts {
            builder.add(dir, FileKind::Layout, *dir).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_order_is_root_to_leaf() {
        let tree = tree(&["users", "/"]);
        let route = tree.resolve("/users/42").unwrap();
        let chain = compose_layouts(&route);
        assert_eq!(chain.handlers(), vec![&"/", &"users"]);
        let depths: Vec<usize> = chain.iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn test_each_layout_wraps_the_next() {
        let tree = tree(&["/", "users", "users/[id]"]);
        let route = tree.resolve("/users/42").unwrap();
        let html = route.layouts().wrap("<p>42</p>".to_string(), |entry, inner| {
            format!("<div data-layout=\"{}\">{}</div>", entry.segment.dir(), inner)
        });
        assert_eq!(
            html,
            "<div data-layout=\"/\"><div data-layout=\"/users\">\
             <div data-layout=\"/users/[id]\"><p>42</p></div></div></div>"
        );
    }

    #[test]
    fn test_layouts_off_the_route_are_ignored() {
        let tree = tree(&["/", "users"]);
        let route = tree.resolve("/about").unwrap();
        assert_eq!(compose_layouts(&route).handlers(), vec![&"/"]);
    }

    #[test]
    fn test_no_layouts() {
        let tree = tree(&[]);
        let route = tree.resolve("/about").unwrap();
        let chain = compose_layouts(&route);
        assert!(chain.is_empty());
        assert_eq!(chain.wrap("x".to_string(), |_, inner| inner + "!"), "x");
    }

    #[test]
    fn test_nearest_and_up_to() {
        let tree = tree(&["/", "users/[id]"]);
        let route = tree.resolve("/users/42").unwrap();
        let chain = route.layouts();
        assert_eq!(chain.nearest(1).map(|e| e.depth), Some(0));
        assert_eq!(chain.nearest(2).map(|e| e.depth), Some(2));
        assert_eq!(chain.up_to(1).handlers(), vec![&"/"]);
    }
}

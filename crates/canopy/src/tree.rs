//! Route tree construction
//!
//! A `RouteTree` is built once from convention files and is read-only
//! afterwards. Each directory of the pages tree becomes exactly one
//! `RouteSegment`, which owns its children and up to five handlers.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::boundary::BoundaryKind;
use crate::error::RouteError;
use crate::segment::{classify_segment, SegmentKind};

/// Convention file names recognized inside a segment directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Page,
    Layout,
    Loading,
    Error,
    NotFound,
}

impl FileKind {
    pub const ALL: [FileKind; 5] = [
        FileKind::Page,
        FileKind::Layout,
        FileKind::Loading,
        FileKind::Error,
        FileKind::NotFound,
    ];

    /// Maps a file stem (`page`, `layout`, `loading`, `error`, `not-found`)
    pub fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "page" => Some(Self::Page),
            "layout" => Some(Self::Layout),
            "loading" => Some(Self::Loading),
            "error" => Some(Self::Error),
            "not-found" => Some(Self::NotFound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Layout => "layout",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::NotFound => "not-found",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BoundaryKind> for FileKind {
    fn from(kind: BoundaryKind) -> Self {
        match kind {
            BoundaryKind::Loading => Self::Loading,
            BoundaryKind::Error => Self::Error,
            BoundaryKind::NotFound => Self::NotFound,
        }
    }
}

/// Handler slots of one segment
#[derive(Debug, Clone)]
pub struct Handlers<H> {
    pub page: Option<H>,
    pub layout: Option<H>,
    pub loading: Option<H>,
    pub error: Option<H>,
    pub not_found: Option<H>,
}

impl<H> Default for Handlers<H> {
    fn default() -> Self {
        Self {
            page: None,
            layout: None,
            loading: None,
            error: None,
            not_found: None,
        }
    }
}

impl<H> Handlers<H> {
    pub fn get(&self, kind: FileKind) -> Option<&H> {
        match kind {
            FileKind::Page => self.page.as_ref(),
            FileKind::Layout => self.layout.as_ref(),
            FileKind::Loading => self.loading.as_ref(),
            FileKind::Error => self.error.as_ref(),
            FileKind::NotFound => self.not_found.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: FileKind) -> &mut Option<H> {
        match kind {
            FileKind::Page => &mut self.page,
            FileKind::Layout => &mut self.layout,
            FileKind::Loading => &mut self.loading,
            FileKind::Error => &mut self.error,
            FileKind::NotFound => &mut self.not_found,
        }
    }
}

/// One level of the route tree
#[derive(Debug, Clone)]
pub struct RouteSegment<H> {
    kind: SegmentKind,
    dir: String,
    pattern: String,
    children: Vec<RouteSegment<H>>,
    handlers: Handlers<H>,
}

impl<H> RouteSegment<H> {
    fn root() -> Self {
        Self {
            kind: SegmentKind::Root,
            dir: "/".to_string(),
            pattern: "/".to_string(),
            children: Vec::new(),
            handlers: Handlers::default(),
        }
    }

    fn child_of(parent: &RouteSegment<H>, kind: SegmentKind) -> Self {
        let dir = join(&parent.dir, &kind.to_string());
        let pattern = match kind.url_fragment() {
            Some(fragment) => join(&parent.pattern, &fragment),
            None => parent.pattern.clone(),
        };
        Self {
            kind,
            dir,
            pattern,
            children: Vec::new(),
            handlers: Handlers::default(),
        }
    }

    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Directory path this segment was declared at, e.g. `/(shop)/[id]`
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// URL pattern this segment serves, e.g. `/users/:id`
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn children(&self) -> &[RouteSegment<H>] {
        &self.children
    }

    pub fn handlers(&self) -> &Handlers<H> {
        &self.handlers
    }

    pub fn handler(&self, kind: FileKind) -> Option<&H> {
        self.handlers.get(kind)
    }

    pub fn page(&self) -> Option<&H> {
        self.handlers.page.as_ref()
    }

    pub fn layout(&self) -> Option<&H> {
        self.handlers.layout.as_ref()
    }

    /// A segment is navigable only if it or a descendant has a page
    pub fn is_navigable(&self) -> bool {
        self.handlers.page.is_some() || self.children.iter().any(RouteSegment::is_navigable)
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Immutable tree of route segments
#[derive(Debug, Clone)]
pub struct RouteTree<H> {
    root: RouteSegment<H>,
    case_insensitive: bool,
}

impl<H> RouteTree<H> {
    pub fn builder() -> RouteTreeBuilder<H> {
        RouteTreeBuilder::new()
    }

    pub fn root(&self) -> &RouteSegment<H> {
        &self.root
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Depth-first walk over every segment, parents before children
    pub fn walk(&self) -> Walk<'_, H> {
        Walk {
            stack: vec![&self.root],
        }
    }

    /// URL patterns of every page in the tree, in walk order
    pub fn routes(&self) -> Vec<&str> {
        self.walk()
            .filter(|segment| segment.page().is_some())
            .map(RouteSegment::pattern)
            .collect()
    }

    /// Number of segments, including the root
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.page().is_none()
    }
}

/// Depth-first iterator returned by `RouteTree::walk`
pub struct Walk<'a, H> {
    stack: Vec<&'a RouteSegment<H>>,
}

impl<'a, H> Iterator for Walk<'a, H> {
    type Item = &'a RouteSegment<H>;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.stack.pop()?;
        self.stack.extend(segment.children.iter().rev());
        Some(segment)
    }
}

/// Builder for `RouteTree`
///
/// # Examples
///
/// ```
/// use canopy::{FileKind, RouteTree};
///
/// let mut builder = RouteTree::builder();
/// builder.add("/", FileKind::Layout, "root layout").unwrap();
/// builder.add("users", FileKind::Page, "user list").unwrap();
/// builder.add("users/[id]", FileKind::Page, "user detail").unwrap();
/// let tree = builder.build().unwrap();
///
/// assert_eq!(tree.routes(), vec!["/users", "/users/:id"]);
/// ```
pub struct RouteTreeBuilder<H> {
    root: RouteSegment<H>,
    fallbacks: Handlers<H>,
    case_insensitive: bool,
}

impl<H> Default for RouteTreeBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTreeBuilder<H> {
    pub fn new() -> Self {
        Self {
            root: RouteSegment::root(),
            fallbacks: Handlers::default(),
            case_insensitive: false,
        }
    }

    /// Compare static segments ASCII-case-insensitively
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Root-level handler used when the root itself defines none of `kind`
    pub fn fallback(mut self, kind: BoundaryKind, handler: H) -> Self {
        *self.fallbacks.slot_mut(kind.into()) = Some(handler);
        self
    }

    /// Registers a handler for the directory `dir`
    ///
    /// `dir` is relative to the pages root: `""` or `"/"` for the root,
    /// `"users/[id]"` for a nested segment. Missing segments are created.
    pub fn add(&mut self, dir: &str, kind: FileKind, handler: H) -> Result<&mut Self, RouteError> {
        let names = dir
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .map(classify_segment)
            .collect::<Result<Vec<_>, _>>()?;

        let mut segment = &mut self.root;
        for name in names {
            let index = match segment.children.iter().position(|c| c.kind == name) {
                Some(index) => index,
                None => {
                    let child = RouteSegment::child_of(segment, name);
                    segment.children.push(child);
                    segment.children.len() - 1
                }
            };
            segment = &mut segment.children[index];
        }

        let slot = segment.handlers.slot_mut(kind);
        if slot.is_some() {
            let at = format!("{}/{}", segment.dir.trim_end_matches('/'), kind);
            return Err(RouteError::conflict(
                at.clone(),
                at,
                format!("`{kind}` is defined twice for the same segment"),
            ));
        }
        *slot = Some(handler);

        debug!(dir = %segment.dir, file = %kind, "registered route file");
        Ok(self)
    }

    /// Registers a handler from a file path such as `pages/users/[id]/page.html`
    ///
    /// The directory is taken relative to `pages_dir` and the file kind from
    /// the file stem.
    pub fn add_file(
        &mut self,
        file_path: impl AsRef<Path>,
        pages_dir: impl AsRef<Path>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        let file_path = file_path.as_ref();
        let relative = file_path
            .strip_prefix(pages_dir.as_ref())
            .unwrap_or(file_path);

        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let kind = FileKind::from_stem(stem)
            .ok_or_else(|| RouteError::UnknownFile(relative.display().to_string()))?;

        let dir = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        self.add(&dir, kind, handler)
    }

    /// Validates the tree and freezes it
    pub fn build(mut self) -> Result<RouteTree<H>, RouteError> {
        for kind in FileKind::ALL {
            if let Some(fallback) = self.fallbacks.slot_mut(kind).take() {
                let slot = self.root.handlers.slot_mut(kind);
                if slot.is_none() {
                    *slot = Some(fallback);
                }
            }
        }

        validate_segment(&self.root, self.case_insensitive, &mut Vec::new())?;
        check_url_conflicts(&self.root, self.case_insensitive)?;
        sort_children(&mut self.root);

        let tree = RouteTree {
            root: self.root,
            case_insensitive: self.case_insensitive,
        };
        info!(
            segments = tree.len(),
            routes = tree.routes().len(),
            "route tree built"
        );
        Ok(tree)
    }
}

fn sort_children<H>(segment: &mut RouteSegment<H>) {
    segment.children.sort_by_key(|c| c.kind.precedence());
    for child in &mut segment.children {
        sort_children(child);
    }
}

fn validate_segment<'a, H>(
    segment: &'a RouteSegment<H>,
    case_insensitive: bool,
    params: &mut Vec<&'a str>,
) -> Result<(), RouteError> {
    if let Some(name) = segment.kind.param_name() {
        if params.contains(&name) {
            return Err(RouteError::invalid(
                segment.dir.clone(),
                format!("parameter `{name}` is used twice on one path"),
            ));
        }
    }

    if segment.kind.is_catch_all() {
        if let Some(child) = first_consuming_descendant(segment) {
            return Err(RouteError::invalid(
                child.dir.clone(),
                "a catch-all segment must be the last part of a route",
            ));
        }
    }

    check_siblings(segment, case_insensitive)?;

    let pushed = segment.kind.param_name().map(|name| params.push(name)).is_some();
    for child in &segment.children {
        validate_segment(child, case_insensitive, params)?;
    }
    if pushed {
        params.pop();
    }
    Ok(())
}

fn first_consuming_descendant<H>(segment: &RouteSegment<H>) -> Option<&RouteSegment<H>> {
    segment.children.iter().find_map(|child| {
        if child.kind.consumes_path() {
            Some(child)
        } else {
            first_consuming_descendant(child)
        }
    })
}

fn check_siblings<H>(segment: &RouteSegment<H>, case_insensitive: bool) -> Result<(), RouteError> {
    let mut statics: HashMap<String, &RouteSegment<H>> = HashMap::new();
    let mut dynamic: Option<&RouteSegment<H>> = None;
    let mut catch_all: Option<&RouteSegment<H>> = None;

    for child in &segment.children {
        match &child.kind {
            SegmentKind::Static(name) => {
                let key = if case_insensitive {
                    name.to_ascii_lowercase()
                } else {
                    name.clone()
                };
                if let Some(first) = statics.insert(key, child) {
                    return Err(RouteError::conflict(
                        first.dir.clone(),
                        child.dir.clone(),
                        "sibling segments share the same static name",
                    ));
                }
            }
            SegmentKind::Dynamic(_) => {
                if let Some(first) = dynamic.replace(child) {
                    return Err(RouteError::conflict(
                        first.dir.clone(),
                        child.dir.clone(),
                        "sibling dynamic segments use different parameter names",
                    ));
                }
            }
            SegmentKind::CatchAll(_) | SegmentKind::OptionalCatchAll(_) => {
                if let Some(first) = catch_all.replace(child) {
                    return Err(RouteError::conflict(
                        first.dir.clone(),
                        child.dir.clone(),
                        "only one catch-all segment is allowed per level",
                    ));
                }
            }
            SegmentKind::Root | SegmentKind::Group(_) => {}
        }
    }
    Ok(())
}

/// Rejects pages that would answer the same URL
///
/// Parameter names are erased from the shape, so `[id]` in one route group
/// and `[slug]` in another collide. An optional catch-all also answers its
/// parent's URL.
fn check_url_conflicts<H>(root: &RouteSegment<H>, case_insensitive: bool) -> Result<(), RouteError> {
    fn visit<'a, H>(
        segment: &'a RouteSegment<H>,
        shape: &mut Vec<String>,
        seen: &mut HashMap<Vec<String>, &'a str>,
        case_insensitive: bool,
    ) -> Result<(), RouteError> {
        let fragment = match &segment.kind {
            SegmentKind::Root | SegmentKind::Group(_) => None,
            SegmentKind::Static(name) if case_insensitive => Some(name.to_ascii_lowercase()),
            SegmentKind::Static(name) => Some(name.clone()),
            SegmentKind::Dynamic(_) => Some(":".to_string()),
            SegmentKind::CatchAll(_) | SegmentKind::OptionalCatchAll(_) => Some("*".to_string()),
        };
        let pushed = fragment.map(|f| shape.push(f)).is_some();

        if segment.page().is_some() {
            let mut shapes = vec![shape.clone()];
            if matches!(segment.kind, SegmentKind::OptionalCatchAll(_)) {
                shapes.push(shape[..shape.len() - 1].to_vec());
            }
            for key in shapes {
                if let Some(first) = seen.insert(key.clone(), segment.dir.as_str()) {
                    return Err(RouteError::conflict(
                        first,
                        segment.dir.clone(),
                        format!("both pages resolve to `/{}`", key.join("/")),
                    ));
                }
            }
        }

        for child in &segment.children {
            visit(child, shape, seen, case_insensitive)?;
        }
        if pushed {
            shape.pop();
        }
        Ok(())
    }

    let mut seen = HashMap::new();
    visit(root, &mut Vec::new(), &mut seen, case_insensitive)
}

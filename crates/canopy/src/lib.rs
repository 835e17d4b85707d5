//! # Canopy
//!
//! Nested, file-convention routing for server-rendered pages:
//! - Static segments (`about/`)
//! - Dynamic segments (`[id]/` → `/users/:id`)
//! - Catch-all and optional catch-all segments (`[...slug]/`, `[[...slug]]/`)
//! - Route groups that scope files without a URL part (`(shop)/`)
//! - Nested layouts with `loading`, `error` and `not-found` boundaries
//!
//! ## Model
//!
//! A pages directory becomes an immutable [`RouteTree`]. Each directory is
//! one [`RouteSegment`] holding up to five handlers: `page`, `layout`,
//! `loading`, `error` and `not-found`. The tree is generic over the handler
//! type, so routing does not depend on how pages are rendered.
//!
//! - [`RouteTree::resolve`] matches a request path and captures [`Params`]
//! - [`resolve_boundary`] finds the nearest boundary of a kind, leaf first
//! - [`compose_layouts`] collects layouts from root to leaf
//!
//! The [`render`] module puts these together for async components.
//!
//! ## Example
//!
//! ```
//! use canopy::{compose_layouts, resolve_boundary, BoundaryKind, FileKind, RouteTree};
//!
//! let mut builder = RouteTree::builder();
//! builder.add("/", FileKind::Layout, "root").unwrap();
//! builder.add("/", FileKind::Loading, "root loading").unwrap();
//! builder.add("users", FileKind::Layout, "users").unwrap();
//! builder.add("users", FileKind::Page, "user list").unwrap();
//! builder.add("users/[id]", FileKind::Page, "user detail").unwrap();
//! let tree = builder.build().unwrap();
//!
//! let route = tree.resolve("/users/42").unwrap();
//! assert_eq!(route.params().one("id"), Some("42"));
//!
//! let loading = resolve_boundary(&route, BoundaryKind::Loading).unwrap();
//! assert_eq!(loading.handler, &"root loading");
//!
//! let chain = compose_layouts(&route);
//! assert_eq!(chain.handlers(), vec![&"root", &"users"]);
//! ```

pub mod boundary;
pub mod config;
pub mod context;
pub mod discover;
pub mod error;
pub mod layout;
pub mod path;
pub mod render;
pub mod resolve;
pub mod segment;
pub mod template;
pub mod tree;

pub use boundary::{resolve_boundary, resolve_boundary_from, Boundary, BoundaryKind};
pub use config::Config;
pub use context::RequestContext;
pub use error::{RenderError, RouteError};
pub use layout::{compose_layouts, LayoutChain, LayoutEntry};
pub use render::{Component, Frame, Html, Props, Rendered, Renderer, SharedComponent, Status};
pub use resolve::{ParamValue, Params, ResolvedRoute};
pub use segment::SegmentKind;
pub use tree::{FileKind, RouteSegment, RouteTree, RouteTreeBuilder};

//! Async rendering over a route tree
//!
//! A request is rendered in three steps:
//!
//! 1. resolve the path (or its longest prefix for unknown URLs)
//! 2. render the page, or recover its failure with the nearest boundary
//! 3. wrap the result in the layouts that survive, innermost first
//!
//! A failure at depth `d` is caught by a boundary at or above `d`, and the
//! boundary output is wrapped only by layouts at or above the boundary. A
//! failing layout at depth `d` is caught from `d - 1`. A failing boundary
//! passes its own error to the next boundary up.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use maud::{html, Markup};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::boundary::{resolve_boundary, resolve_boundary_from, BoundaryKind};
use crate::config::RenderConfig;
use crate::context::RequestContext;
use crate::error::RenderError;
use crate::resolve::{Params, ResolvedRoute};
use crate::tree::{RouteTree, RouteTreeBuilder};

/// Rendered markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Html(String);

impl Html {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Html {
    fn from(html: String) -> Self {
        Self(html)
    }
}

impl From<&str> for Html {
    fn from(html: &str) -> Self {
        Self(html.to_string())
    }
}

impl From<Markup> for Html {
    fn from(markup: Markup) -> Self {
        Self(markup.into_string())
    }
}

/// Composed output of the route below a layout
///
/// Not `Clone`: a layout places its children once.
#[derive(Debug)]
pub struct Children(Html);

impl Children {
    fn new(html: Html) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_html(self) -> Html {
        self.0
    }
}

/// Retry handle given to error boundaries
///
/// Rendering the `href` again re-runs the failed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reset {
    href: String,
}

impl Reset {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Input of a component
#[derive(Debug)]
pub struct Props<'a> {
    pub request: &'a RequestContext,
    pub params: &'a Params,
    /// Directory of the segment the component belongs to
    pub segment: &'a str,
    /// Set for layouts
    pub children: Option<Children>,
    /// Set for error and not-found boundaries
    pub error: Option<&'a RenderError>,
    /// Set for error boundaries
    pub reset: Option<Reset>,
}

impl<'a> Props<'a> {
    pub fn new(request: &'a RequestContext, params: &'a Params, segment: &'a str) -> Self {
        Self {
            request,
            params,
            segment,
            children: None,
            error: None,
            reset: None,
        }
    }

    /// Children markup, empty when none were passed
    pub fn into_children(self) -> Html {
        self.children.map(Children::into_html).unwrap_or_default()
    }
}

/// A page, layout or boundary
#[async_trait]
pub trait Component: Send + Sync {
    async fn render(&self, props: Props<'_>) -> Result<Html, RenderError>;
}

pub type SharedComponent = Arc<dyn Component>;

struct FnComponent<F>(F);

#[async_trait]
impl<F> Component for FnComponent<F>
where
    F: Fn(Props<'_>) -> Result<Html, RenderError> + Send + Sync,
{
    async fn render(&self, props: Props<'_>) -> Result<Html, RenderError> {
        (self.0)(props)
    }
}

/// Wraps a synchronous closure as a component
///
/// ```
/// use canopy::render::{from_fn, Html};
///
/// let layout = from_fn(|props| Ok(Html::new(format!("<main>{}</main>", props.into_children()))));
/// ```
pub fn from_fn<F>(f: F) -> SharedComponent
where
    F: Fn(Props<'_>) -> Result<Html, RenderError> + Send + Sync + 'static,
{
    Arc::new(FnComponent(f))
}

/// Built-in error boundary installed at the root
pub fn default_error() -> SharedComponent {
    from_fn(|props| {
        let message = props
            .error
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown error".to_string());
        let href = props.reset.as_ref().map(Reset::href).unwrap_or("/");
        Ok(html! {
            section.error {
                h1 { "Something went wrong" }
                p { (message) }
                a href=(href) { "Try again" }
            }
        }
        .into())
    })
}

/// Built-in not-found boundary installed at the root
pub fn default_not_found() -> SharedComponent {
    from_fn(|_| {
        Ok(html! {
            section.not-found {
                h1 { "404" }
                p { "This page could not be found." }
            }
        }
        .into())
    })
}

/// Installs the built-in error and not-found boundaries as root fallbacks
pub fn with_default_boundaries(
    builder: RouteTreeBuilder<SharedComponent>,
) -> RouteTreeBuilder<SharedComponent> {
    builder
        .fallback(BoundaryKind::Error, default_error())
        .fallback(BoundaryKind::NotFound, default_not_found())
}

/// Outcome class of a render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Error,
}

impl Status {
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
            Self::Error => 500,
        }
    }
}

/// A fully composed response
#[derive(Debug, Clone)]
pub struct Rendered {
    pub status: Status,
    pub html: Html,
    /// Pattern of the deepest matched segment
    pub pattern: String,
}

/// Message of a streamed render
#[derive(Debug)]
pub enum Frame {
    /// Loading fallback inside its surviving layouts
    Loading(Html),
    Complete(Rendered),
    Failed(RenderError),
}

/// Renders requests against a shared route tree
pub struct Renderer {
    tree: Arc<RouteTree<SharedComponent>>,
    config: RenderConfig,
}

impl Renderer {
    pub fn new(tree: Arc<RouteTree<SharedComponent>>, config: RenderConfig) -> Self {
        Self { tree, config }
    }

    pub fn tree(&self) -> &Arc<RouteTree<SharedComponent>> {
        &self.tree
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders a request to completion
    ///
    /// Errors only escape when no boundary can take them: a failing root
    /// layout, a failing root boundary, or a missing boundary.
    pub async fn render(&self, request: &RequestContext) -> Result<Rendered, RenderError> {
        let route = match self.tree.resolve(request.path()) {
            Some(route) => route,
            None => self.tree.resolve_partial(request.path()),
        };
        let mut status = Status::Ok;
        let leaf = route.leaf().dir();

        let content = match route.page() {
            Some(page) => {
                let props = Props::new(request, route.params(), leaf);
                self.run(page, props, leaf).await
            }
            None => Err(RenderError::not_found()),
        };

        let (mut html, mut level) = match content {
            Ok(html) => (html, route.depth()),
            Err(error) => {
                self.recover(&route, request, error, Some(route.depth()), &mut status)
                    .await?
            }
        };

        let layouts = route.layouts();
        for entry in layouts.iter().rev() {
            if entry.depth > level {
                continue;
            }
            let dir = entry.segment.dir();
            let props = Props {
                children: Some(Children::new(html)),
                ..Props::new(request, route.params(), dir)
            };
            match self.run(entry.handler, props, dir).await {
                Ok(wrapped) => {
                    html = wrapped;
                    level = entry.depth;
                }
                Err(error) => {
                    (html, level) = self
                        .recover(&route, request, error, entry.depth.checked_sub(1), &mut status)
                        .await?;
                }
            }
        }

        info!(
            path = request.path(),
            pattern = route.pattern(),
            status = status.as_u16(),
            "rendered"
        );
        Ok(Rendered {
            status,
            html,
            pattern: route.pattern().to_string(),
        })
    }

    /// Renders in a background task, streaming a loading frame first when
    /// the render outlasts `loading_threshold_ms`
    ///
    /// Dropping the returned stream cancels the render.
    pub fn stream(self: &Arc<Self>, request: RequestContext) -> ReceiverStream<Frame> {
        let (tx, rx) = mpsc::channel(self.config.stream_buffer.max(1));
        let renderer = Arc::clone(self);

        tokio::spawn(async move {
            let render = renderer.render(&request);
            tokio::pin!(render);
            let loading = async {
                tokio::time::sleep(renderer.config.loading_threshold()).await;
                renderer.loading_fallback(&request).await
            };
            tokio::pin!(loading);
            let mut loading_done = false;

            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!(path = request.path(), "stream closed, render cancelled");
                        return;
                    }
                    result = &mut render => {
                        let frame = match result {
                            Ok(rendered) => Frame::Complete(rendered),
                            Err(error) => Frame::Failed(error),
                        };
                        let _ = tx.send(frame).await;
                        return;
                    }
                    fallback = &mut loading, if !loading_done => {
                        loading_done = true;
                        if let Some(html) = fallback {
                            if tx.send(Frame::Loading(html)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        ReceiverStream::new(rx)
    }

    /// Nearest loading boundary of the request, inside its layouts
    async fn loading_fallback(&self, request: &RequestContext) -> Option<Html> {
        let route = self.tree.resolve(request.path())?;
        let boundary = resolve_boundary(&route, BoundaryKind::Loading).ok()?;
        let dir = boundary.segment.dir();

        let props = Props::new(request, route.params(), dir);
        let mut html = match self.run(boundary.handler, props, dir).await {
            Ok(html) => html,
            Err(error) => {
                debug!(path = request.path(), %error, "loading boundary failed");
                return None;
            }
        };

        let layouts = route.layouts().up_to(boundary.depth);
        for entry in layouts.iter().rev() {
            let dir = entry.segment.dir();
            let props = Props {
                children: Some(Children::new(html)),
                ..Props::new(request, route.params(), dir)
            };
            html = match self.run(entry.handler, props, dir).await {
                Ok(html) => html,
                Err(error) => {
                    debug!(path = request.path(), %error, "layout failed around loading boundary");
                    return None;
                }
            };
        }
        Some(html)
    }

    /// Renders the nearest boundary able to take `error`, starting at `from`
    ///
    /// Returns the boundary output and the depth it belongs to.
    async fn recover<'t>(
        &self,
        route: &ResolvedRoute<'t, SharedComponent>,
        request: &RequestContext,
        mut error: RenderError,
        mut from: Option<usize>,
        status: &mut Status,
    ) -> Result<(Html, usize), RenderError> {
        loop {
            let (Some(kind), Some(depth)) = (error.boundary_kind(), from) else {
                return Err(error);
            };
            let boundary = match resolve_boundary_from(route, kind, depth) {
                Ok(boundary) => boundary,
                Err(missing) => {
                    warn!(path = route.path(), %error, "no boundary can recover failure");
                    return Err(missing.into());
                }
            };

            let dir = boundary.segment.dir();
            warn!(path = route.path(), boundary = %kind, at = dir, %error, "recovering");

            let props = Props {
                error: Some(&error),
                reset: (kind == BoundaryKind::Error).then(|| Reset::new(request.target())),
                ..Props::new(request, route.params(), dir)
            };
            let result = self.run(boundary.handler, props, dir).await;
            match result {
                Ok(html) => {
                    *status = match kind {
                        BoundaryKind::NotFound => Status::NotFound,
                        _ => Status::Error,
                    };
                    return Ok((html, boundary.depth));
                }
                Err(next) => {
                    error = next;
                    from = boundary.depth.checked_sub(1);
                }
            }
        }
    }

    async fn run(
        &self,
        component: &SharedComponent,
        props: Props<'_>,
        segment: &str,
    ) -> Result<Html, RenderError> {
        let render = component.render(props);
        let result = match self.config.handler_timeout() {
            Some(limit) => match tokio::time::timeout(limit, render).await {
                Ok(result) => result,
                Err(_) => Err(RenderError::Timeout {
                    segment: segment.to_string(),
                    elapsed: limit,
                }),
            },
            None => render.await,
        };
        result.map_err(|error| error.at_segment(segment))
    }
}

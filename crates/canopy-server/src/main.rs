mod demo;
mod hot_reload;

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Router,
};
use canopy::render::with_default_boundaries;
use canopy::template::load_templates;
use canopy::{Config, Frame, RenderError, Renderer, RequestContext, RouteTree};
use futures::stream::{Stream, StreamExt};
use maud::{html, DOCTYPE};
use tokio::sync::{broadcast, RwLock};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::hot_reload::PagesWatcher;

/// Simulated data latency of the demo user pages
const DEMO_LATENCY: Duration = Duration::from_millis(400);

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    renderer: Arc<RwLock<Arc<Renderer>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load_default().unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        Config::default()
    });

    info!(
        port = config.server.port,
        pages = %config.routing.pages_dir,
        "canopy starting"
    );

    let hot_reload_enabled = std::env::var("HOT_RELOAD")
        .map(|v| v.parse::<bool>().unwrap_or(config.dev.hot_reload))
        .unwrap_or(config.dev.hot_reload);

    let renderer = build_renderer(&config)?;
    for route in renderer.tree().routes() {
        info!("  {} -> page", route);
    }
    let renderer = Arc::new(RwLock::new(Arc::new(renderer)));

    if hot_reload_enabled {
        if let Err(e) = spawn_reloader(config.clone(), Arc::clone(&renderer)) {
            error!("Failed to create file watcher: {:#}", e);
        }
    }

    let state = AppState { renderer };
    let app = Router::new()
        .nest_service("/static", ServeDir::new(&config.server.static_dir))
        .fallback(page_handler)
        .with_state(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds a renderer from the pages directory plus the code-backed pages
fn build_renderer(config: &Config) -> Result<Renderer> {
    let mut builder = with_default_boundaries(
        RouteTree::builder().case_insensitive(config.routing.case_insensitive),
    );

    let pages_dir = Path::new(&config.routing.pages_dir);
    if pages_dir.is_dir() {
        load_templates(&mut builder, pages_dir)?;
    } else {
        // Not fatal; the code-backed pages still work
        warn!("Pages directory not found: {:?}", pages_dir);
    }
    demo::register(&mut builder, DEMO_LATENCY)?;

    let tree = builder.build().context("Failed to build route tree")?;
    Ok(Renderer::new(Arc::new(tree), config.render.clone()))
}

/// Rebuilds the renderer whenever the pages directory changes
///
/// Requests in flight keep the renderer they started with. A failed rebuild
/// keeps the previous routes.
fn spawn_reloader(config: Config, renderer: Arc<RwLock<Arc<Renderer>>>) -> Result<()> {
    let watcher = PagesWatcher::new(vec![PathBuf::from(&config.routing.pages_dir)])?;
    let mut changes = watcher.subscribe();

    tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            let change = match changes.recv().await {
                Ok(change) => Some(change),
                Err(broadcast::error::RecvError::Lagged(_)) => None,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            // Editors emit bursts of events for one save
            tokio::time::sleep(Duration::from_millis(50)).await;
            while changes.try_recv().is_ok() {}

            match build_renderer(&config) {
                Ok(next) => {
                    let routes = next.tree().routes().len();
                    *renderer.write().await = Arc::new(next);
                    info!(
                        path = ?change.map(|c| c.path),
                        routes,
                        "pages reloaded"
                    );
                }
                Err(e) => error!("Reload failed, keeping previous routes: {:#}", e),
            }
        }
    });

    Ok(())
}

async fn page_handler(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let ctx = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .fold(RequestContext::new(target), |ctx, (name, value)| {
            ctx.with_header(name, value)
        });

    let renderer = Arc::clone(&*state.renderer.read().await);

    if ctx.accepts_event_stream() {
        return event_stream(&renderer, ctx).into_response();
    }

    match renderer.render(&ctx).await {
        Ok(rendered) => {
            let status = StatusCode::from_u16(rendered.status.as_u16())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(rendered.html.into_string())).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Streams `loading` and `complete` events for one render
///
/// The `complete` event carries the response status as its id.
fn event_stream(
    renderer: &Arc<Renderer>,
    ctx: RequestContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = renderer.stream(ctx).map(|frame| {
        let event = match frame {
            Frame::Loading(html) => Event::default().event("loading").data(html.into_string()),
            Frame::Complete(rendered) => Event::default()
                .event("complete")
                .id(rendered.status.as_u16().to_string())
                .data(rendered.html.into_string()),
            Frame::Failed(e) => {
                error!("Render failed: {}", e);
                Event::default().event("error").id("500").data(e.to_string())
            }
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn error_response(e: &RenderError) -> Response {
    error!("Render failed: {}", e);
    let markup = html! {
        (DOCTYPE)
        html {
            body {
                h1 { "500" }
                pre { (e.to_string()) }
            }
        }
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Html(markup.into_string())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config() -> Config {
        let mut config = Config::default();
        config.routing.pages_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../pages").to_string();
        config
    }

    #[test]
    fn test_demo_pages_build() {
        let renderer = build_renderer(&demo_config()).unwrap();
        let routes = renderer.tree().routes();
        for route in ["/", "/about", "/pricing", "/docs/*slug?", "/users", "/users/:id"] {
            assert!(routes.contains(&route), "missing {route}");
        }
    }

    #[tokio::test]
    async fn test_demo_unknown_user_uses_scoped_not_found() {
        let renderer = build_renderer(&demo_config()).unwrap();
        let rendered = renderer.render(&RequestContext::new("/users/42")).await.unwrap();
        assert_eq!(rendered.status.as_u16(), 404);
        assert!(rendered.html.as_str().contains("No user with id 42"));
        assert!(rendered.html.as_str().contains("class=\"users\""));
    }

    async fn event_body(target: &str) -> String {
        let renderer = Arc::new(build_renderer(&demo_config()).unwrap());
        let response = event_stream(&renderer, RequestContext::new(target)).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Field separators may or may not carry a space
        String::from_utf8(body.to_vec()).unwrap().replace(": ", ":")
    }

    #[tokio::test]
    async fn test_complete_event_carries_status() {
        let body = event_body("/about").await;
        assert!(body.contains("event:complete"));
        assert!(body.contains("id:200"));

        let body = event_body("/users/42").await;
        assert!(body.contains("event:complete"));
        assert!(body.contains("id:404"));
    }

    #[tokio::test]
    async fn test_error_page_markup() {
        let response = error_response(&RenderError::failure("<b>boom</b>"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("&lt;b&gt;boom&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn test_demo_group_layout_wraps_pricing() {
        let renderer = build_renderer(&demo_config()).unwrap();
        let rendered = renderer.render(&RequestContext::new("/pricing")).await.unwrap();
        assert!(rendered.html.as_str().contains("<div class=\"marketing\">"));
    }
}

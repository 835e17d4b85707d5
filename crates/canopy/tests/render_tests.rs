//! Integration tests for rendering a pages directory
//!
//! Builds trees from template files on disk plus code components and renders
//! full requests through `Renderer`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use canopy::config::RenderConfig;
use canopy::render::{from_fn, with_default_boundaries};
use canopy::template::load_templates;
use canopy::*;
use tokio_stream::StreamExt;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn pages() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "layout.html", "<html>{children}</html>");
    write(root, "page.html", "<h1>Home</h1>");
    write(root, "not-found.html", "<p>Nothing at {path}</p>");
    write(root, "about/page.html", "<h1>About</h1>");
    write(root, "users/layout.html", "<section>{children}</section>");
    write(root, "users/error.html", "<p class=\"err\">{error}</p><a href=\"{reset}\">retry</a>");
    write(root, "users/loading.html", "<p>Loading users</p>");
    write(root, "docs/[[...slug]]/page.html", "<p>doc {params.slug}</p>");
    write(root, "_partials/page.html", "private");
    dir
}

fn renderer(pages_dir: &Path, config: RenderConfig) -> Arc<Renderer> {
    let mut builder = with_default_boundaries(RouteTree::builder());
    load_templates(&mut builder, pages_dir).unwrap();
    builder
        .add(
            "users/[id]",
            FileKind::Page,
            from_fn(|props| match props.params.one("id") {
                Some("1") => Ok(Html::new("<p>Ada</p>")),
                Some("500") => Err(RenderError::failure("database unavailable")),
                _ => Err(RenderError::not_found()),
            }),
        )
        .unwrap();
    Arc::new(Renderer::new(Arc::new(builder.build().unwrap()), config))
}

#[tokio::test]
async fn test_page_inside_nested_layouts() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let rendered = renderer.render(&RequestContext::new("/users/1")).await.unwrap();
    assert_eq!(rendered.status, Status::Ok);
    assert_eq!(
        rendered.html.as_str(),
        "<html><section><p>Ada</p></section></html>"
    );

    let rendered = renderer.render(&RequestContext::new("/about")).await.unwrap();
    assert_eq!(rendered.html.as_str(), "<html><h1>About</h1></html>");
}

#[tokio::test]
async fn test_failure_renders_users_error_boundary() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let rendered = renderer.render(&RequestContext::new("/users/500")).await.unwrap();
    assert_eq!(rendered.status.as_u16(), 500);
    assert_eq!(
        rendered.html.as_str(),
        "<html><section><p class=\"err\">handler for `/users/[id]` failed: \
         database unavailable</p><a href=\"/users/500\">retry</a></section></html>"
    );
}

#[tokio::test]
async fn test_error_boundary_retry_keeps_query() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let rendered = renderer
        .render(&RequestContext::new("/users/500?page=2"))
        .await
        .unwrap();
    assert_eq!(rendered.status, Status::Error);
    assert!(rendered
        .html
        .as_str()
        .contains("<a href=\"/users/500?page=2\">retry</a>"));
}

#[tokio::test]
async fn test_not_found_signal_and_unknown_url() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let rendered = renderer.render(&RequestContext::new("/users/7")).await.unwrap();
    assert_eq!(rendered.status.as_u16(), 404);
    assert_eq!(rendered.html.as_str(), "<html><p>Nothing at /users/7</p></html>");

    let rendered = renderer.render(&RequestContext::new("/nowhere")).await.unwrap();
    assert_eq!(rendered.status, Status::NotFound);
    assert_eq!(rendered.html.as_str(), "<html><p>Nothing at /nowhere</p></html>");
}

#[tokio::test]
async fn test_private_folder_not_routable() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());
    let rendered = renderer.render(&RequestContext::new("/_partials")).await.unwrap();
    assert_eq!(rendered.status, Status::NotFound);
}

#[tokio::test]
async fn test_optional_catch_all_page() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let rendered = renderer.render(&RequestContext::new("/docs")).await.unwrap();
    assert_eq!(rendered.html.as_str(), "<html><p>doc </p></html>");

    let rendered = renderer
        .render(&RequestContext::new("/docs/guide/setup"))
        .await
        .unwrap();
    assert_eq!(rendered.html.as_str(), "<html><p>doc guide/setup</p></html>");
    assert_eq!(rendered.pattern, "/docs/*slug?");
}

#[tokio::test]
async fn test_stream_completes_fast_page_without_loading() {
    let dir = pages();
    let renderer = renderer(dir.path(), RenderConfig::default());

    let frames: Vec<Frame> = renderer.stream(RequestContext::new("/users/1")).collect().await;
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        Frame::Complete(rendered) => assert_eq!(rendered.status, Status::Ok),
        other => panic!("unexpected frame {other:?}"),
    }
}

//! File-backed components
//!
//! A template is plain markup with `{name}` placeholders:
//!
//! | Placeholder       | Value                                  |
//! | ----------------- | -------------------------------------- |
//! | `{children}`      | composed output below a layout (raw)   |
//! | `{params.name}`   | captured parameter, parts joined by `/` |
//! | `{query.name}`    | query string value                     |
//! | `{path}`          | request path                           |
//! | `{error}`         | failure message in a boundary          |
//! | `{reset}`         | retry href in an error boundary        |
//!
//! Everything except `{children}` is HTML-escaped. A `{params.name}` the
//! route did not capture, such as an empty optional catch-all, renders as
//! nothing. Other unknown placeholders are left untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use maud::html;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::discover::discover;
use crate::error::RenderError;
use crate::render::{Children, Component, Html, Props, SharedComponent};
use crate::tree::RouteTreeBuilder;

static VAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_\.\-]*)\}").unwrap());

/// Component rendering an interpolated template
#[derive(Debug, Clone)]
pub struct TemplateComponent {
    source: String,
    path: Option<PathBuf>,
}

impl TemplateComponent {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: None,
        }
    }

    /// Reads a template from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template: {:?}", path))?;
        Ok(Self {
            source,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn interpolate(&self, props: Props<'_>) -> String {
        let children = props.children.map(Children::into_html).unwrap_or_default();
        let error = props.error.map(ToString::to_string);
        let reset = props.reset.as_ref().map(|reset| reset.href().to_string());

        VAR_REGEX
            .replace_all(&self.source, |caps: &regex::Captures| {
                let name = &caps[1];
                let value = match name.split_once('.') {
                    None => match name {
                        "children" => return children.as_str().to_string(),
                        "path" => Some(props.request.path().to_string()),
                        "error" => error.clone(),
                        "reset" => reset.clone(),
                        _ => None,
                    },
                    Some(("params", key)) => Some(
                        props
                            .params
                            .get(key)
                            .map(|value| value.joined())
                            .unwrap_or_default(),
                    ),
                    Some(("query", key)) => props.request.query(key).map(str::to_string),
                    Some(_) => None,
                };
                match value {
                    Some(value) => html! { (value) }.into_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[async_trait]
impl Component for TemplateComponent {
    async fn render(&self, props: Props<'_>) -> Result<Html, RenderError> {
        Ok(Html::new(self.interpolate(props)))
    }
}

/// Registers every convention file under `pages_dir` as a template
///
/// Returns the number of files registered.
pub fn load_templates(
    builder: &mut RouteTreeBuilder<SharedComponent>,
    pages_dir: impl AsRef<Path>,
) -> Result<usize> {
    let pages_dir = pages_dir.as_ref();
    let files = discover(pages_dir)?;

    for file in &files {
        let template = TemplateComponent::load(&file.path)?;
        builder
            .add(&file.dir, file.kind, Arc::new(template))
            .with_context(|| format!("Failed to register {:?}", file.path))?;
        debug!(path = %file.path.display(), "loaded template");
    }

    info!(dir = %pages_dir.display(), templates = files.len(), "templates loaded");
    Ok(files.len())
}

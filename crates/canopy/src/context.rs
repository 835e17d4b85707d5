// Per-request context threaded through resolution and rendering

use std::collections::HashMap;

/// Request context passed to every component
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path, without query string
    path: String,

    /// Path plus query string, as requested
    target: String,

    /// Query parameters from URL (?key=value)
    query: HashMap<String, String>,

    /// Request headers, keyed by lowercase name
    headers: HashMap<String, String>,
}

impl RequestContext {
    /// Creates a context from a request target such as `/users?page=2`
    pub fn new(target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };
        let path = path.split('#').next().unwrap_or_default();
        let path = if path.is_empty() { "/" } else { path };
        let target = match target.split('#').next().and_then(|t| t.split_once('?')) {
            Some((_, query)) if !query.is_empty() => format!("{path}?{query}"),
            _ => path.to_string(),
        };

        Self {
            path: path.to_string(),
            target,
            query,
            headers: HashMap::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path and query string of the request, fragment dropped
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get a query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Get a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check if the client asked for server-sent events
    pub fn accepts_event_stream(&self) -> bool {
        self.header("accept")
            .map(|accept| accept.contains("text/event-stream"))
            .unwrap_or(false)
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_query_from_path() {
        let ctx = RequestContext::new("/users?page=2&q=jane+doe&flag");
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.query("q"), Some("jane doe"));
        assert_eq!(ctx.query("flag"), Some(""));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn test_empty_target_is_root() {
        assert_eq!(RequestContext::new("").path(), "/");
        assert_eq!(RequestContext::new("?x=1").path(), "/");
        assert_eq!(RequestContext::new("/a#top").path(), "/a");
    }

    #[test]
    fn test_target_keeps_query() {
        assert_eq!(RequestContext::new("/users?page=2").target(), "/users?page=2");
        assert_eq!(RequestContext::new("/users?page=2#top").target(), "/users?page=2");
        assert_eq!(RequestContext::new("/users#top").target(), "/users");
        assert_eq!(RequestContext::new("?x=1").target(), "/?x=1");
        assert_eq!(RequestContext::new("/users?").target(), "/users");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let ctx = RequestContext::new("/").with_header("Accept", "text/event-stream");
        assert_eq!(ctx.header("ACCEPT"), Some("text/event-stream"));
        assert!(ctx.accepts_event_stream());
        assert!(!RequestContext::new("/").accepts_event_stream());
    }
}

//! Request path utilities

use std::borrow::Cow;

/// Splits a request path into percent-decoded parts
///
/// The query string and fragment are dropped. Backslashes count as
/// separators, and empty parts from doubled or trailing slashes are skipped.
/// Parts that fail to decode are kept verbatim.
///
/// ```
/// use canopy::path::split_path;
///
/// assert_eq!(split_path("/"), Vec::<String>::new());
/// assert_eq!(split_path("/blog//hello%20world/?page=2"), vec!["blog", "hello world"]);
/// assert_eq!(split_path("\\users\\123"), vec!["users", "123"]);
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    path.split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(|part| {
            urlencoding::decode(part)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| part.to_string())
        })
        .collect()
}

//! Path, slug and JSON tree utilities.
//!
//! Source paths look like `/blog/news/hello-world/`; destination slugs look
//! like `blog/news/hello-world`. Every comparison between the two goes through
//! [`normalize_path`] so leading and trailing slashes never matter.

use serde_json::Value;

/// Strip one leading and one trailing slash.
///
/// # Example
///
/// ```
/// use content_migrator_shared::utils::normalize_path;
///
/// assert_eq!(normalize_path("/blog/news/"), "blog/news");
/// assert_eq!(normalize_path("blog"), "blog");
/// ```
pub fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Compare two paths or slugs ignoring leading and trailing slashes.
pub fn compare_slugs(a: &str, b: &str) -> bool {
    normalize_path(a) == normalize_path(b)
}

/// Non-empty segments of a path.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Number of segments of a path. The root has depth zero.
pub fn path_depth(path: &str) -> usize {
    path_segments(path).len()
}

/// Last segment of a path, if any.
pub fn last_segment(path: &str) -> Option<&str> {
    path_segments(path).last().copied()
}

/// Parent folder path (`/a/b/` -> `/a/`) of paths deeper than one segment.
pub fn parent_path(path: &str) -> Option<String> {
    let segments = path_segments(path);
    if segments.len() <= 1 {
        return None;
    }
    Some(format!("/{}/", segments[..segments.len() - 1].join("/")))
}

/// Folder holding the document at `pathname`.
///
/// When the link carries a query string the document is addressed by query
/// (`/?page_id=4`) and its folder is the pathname itself. Otherwise the last
/// segment is dropped (`/blog/hello/` -> `/blog/`, `/hello/` -> `/`). Returns
/// `None` for a pathname without any segment.
pub fn folder_of(pathname: &str, has_query: bool) -> Option<String> {
    if has_query {
        return Some(pathname.to_string());
    }
    let segments = path_segments(pathname);
    match segments.len() {
        0 => None,
        1 => Some("/".to_string()),
        n => Some(format!("/{}/", segments[..n - 1].join("/"))),
    }
}

/// Human readable folder name from a slug (`press-releases` -> `press releases`).
pub fn humanize_slug(slug: &str) -> String {
    slug.replace(['-', '_'], " ")
}

/// Resolve a dotted descendant path (`_links.wp:featuredmedia.0.href`).
///
/// Numeric segments index into arrays; any missing step yields `None`.
pub fn descendant<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Visit every string leaf of a JSON tree. Object keys are not visited.
pub fn visit_strings_mut(value: &mut Value, f: &mut dyn FnMut(&mut String)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => {
            for item in items {
                visit_strings_mut(item, f);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                visit_strings_mut(item, f);
            }
        }
        _ => {}
    }
}

/// Deterministic storage key of an asset URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKey {
    /// Last path segment, query string removed (`photo.png`).
    pub filename: String,
    /// Segment holding the file (`07` for `/uploads/2023/07/photo.png`).
    pub folder: String,
    /// Extension without the dot (`png`).
    pub ext: String,
}

impl AssetKey {
    /// Relative scratch path `folder/filename`.
    pub fn relative_path(&self) -> String {
        if self.folder.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.folder, self.filename)
        }
    }
}

/// Derive the storage key of an asset URL.
///
/// # Example
///
/// ```
/// use content_migrator_shared::utils::asset_key;
///
/// let key = asset_key("https://site.com/uploads/2023/07/photo.png?w=300");
/// assert_eq!(key.filename, "photo.png");
/// assert_eq!(key.folder, "07");
/// assert_eq!(key.ext, "png");
/// ```
pub fn asset_key(url: &str) -> AssetKey {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let mut parts = without_query.rsplit('/');
    let filename = parts.next().unwrap_or_default().to_string();
    let folder = parts.next().unwrap_or_default().to_string();
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default();
    AssetKey {
        filename,
        folder,
        ext,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_slugs() {
        assert!(compare_slugs("/blog/news/", "blog/news"));
        assert!(compare_slugs("blog/news/", "/blog/news"));
        assert!(!compare_slugs("/blog/", "/blog/news/"));
    }

    #[test]
    fn test_path_depth_and_parent() {
        assert_eq!(path_depth("/"), 0);
        assert_eq!(path_depth("/blog/"), 1);
        assert_eq!(path_depth("/blog/news/"), 2);
        assert_eq!(parent_path("/blog/news/"), Some("/blog/".to_string()));
        assert_eq!(parent_path("/a/b/c/"), Some("/a/b/".to_string()));
        assert_eq!(parent_path("/blog/"), None);
    }

    #[test]
    fn test_folder_of() {
        assert_eq!(folder_of("/blog/hello/", false), Some("/blog/".to_string()));
        assert_eq!(folder_of("/hello/", false), Some("/".to_string()));
        assert_eq!(folder_of("/", true), Some("/".to_string()));
        assert_eq!(folder_of("/", false), None);
    }

    #[test]
    fn test_descendant() {
        let record = json!({
            "title": {"rendered": "Hi"},
            "_links": {"wp:featuredmedia": [{"href": "https://x/media/1"}]}
        });
        assert_eq!(descendant(&record, "title.rendered"), Some(&json!("Hi")));
        assert_eq!(
            descendant(&record, "_links.wp:featuredmedia.0.href"),
            Some(&json!("https://x/media/1"))
        );
        assert_eq!(descendant(&record, "title.missing"), None);
        assert_eq!(descendant(&record, "_links.wp:featuredmedia.4"), None);
    }

    #[test]
    fn test_asset_key_without_folder() {
        let key = asset_key("logo.svg");
        assert_eq!(key.filename, "logo.svg");
        assert_eq!(key.folder, "");
        assert_eq!(key.relative_path(), "logo.svg");
    }

    #[test]
    fn test_humanize_slug() {
        assert_eq!(humanize_slug("press-releases_2023"), "press releases 2023");
    }
}

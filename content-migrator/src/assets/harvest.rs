//! Asset discovery and reference rewriting over the migration queue.

use std::collections::HashSet;

use content_migrator_shared::{AssetReference, MigrationEntry, UploadedAsset};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AssetSettings;
use crate::errors::MigrationError;

/// Pattern of a quoted URL ending in one of `types`.
fn asset_pattern(types: &[String]) -> Result<Regex, MigrationError> {
    let extensions: Vec<String> = types.iter().map(|t| regex::escape(t)).collect();
    let pattern = format!(
        r#""((?:https?:)?/?/[^"]*\.(?i:{}))""#,
        extensions.join("|")
    );
    Regex::new(&pattern).map_err(|e| MigrationError::config(format!("invalid asset types: {}", e)))
}

fn visit_strings(value: &Value, f: &mut dyn FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|item| visit_strings(item, f)),
        Value::Object(map) => map.values().for_each(|item| visit_strings(item, f)),
        _ => {}
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Absolute download URL of an asset URL as found in the queue.
fn resolve_url(original: &str, site_domain: Option<&str>) -> Option<String> {
    if original.starts_with("//") {
        Some(format!("https:{}", original))
    } else if original.starts_with('/') {
        site_domain.map(|domain| format!("{}{}", domain, original))
    } else {
        Some(original.to_string())
    }
}

/// Collect every asset URL referenced anywhere in `entries`.
///
/// Each string leaf is scanned as if it were a quoted JSON string, so URLs
/// inside markup attributes are found as well as plain URL values.
/// Site-rooted URLs are resolved against `site_domain` and protocol-relative
/// ones get `https:`. References are unique by original URL and keep their
/// discovery order.
pub fn harvest(
    entries: &[MigrationEntry],
    settings: &AssetSettings,
    site_domain: Option<&str>,
) -> Result<Vec<AssetReference>, MigrationError> {
    if settings.types.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = asset_pattern(&settings.types)?;
    let site_host = site_domain.and_then(host_of);

    let mut found: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for entry in entries {
        visit_strings(&entry.to_payload(), &mut |leaf: &str| {
            let quoted = format!("\"{}\"", leaf);
            for caps in pattern.captures_iter(&quoted) {
                let url = caps[1].to_string();
                if seen.insert(url.clone()) {
                    found.push(url);
                }
            }
        });
    }

    let mut references = Vec::with_capacity(found.len());
    for original in found {
        let site_rooted = original.starts_with('/') && !original.starts_with("//");
        let Some(resolved) = resolve_url(&original, site_domain) else {
            warn!(url = %original, "Site-rooted asset found but SITE_DOMAIN is not set, skipping");
            continue;
        };
        if settings.restrict_domain && !site_rooted && host_of(&resolved) != site_host {
            debug!(url = %original, "Asset hosted outside the site domain, skipping");
            continue;
        }
        references.push(AssetReference::new(original, resolved));
    }

    info!(count = references.len(), "Harvested assets");
    Ok(references)
}

/// Substitute every uploaded asset's original URL with its new URL across
/// every string leaf of the queue.
///
/// Longer URLs are substituted first so a site-rooted URL never rewrites the
/// inside of an absolute one that contains it.
pub fn rewrite(entries: &mut [MigrationEntry], uploaded: &[UploadedAsset]) -> usize {
    let mut assets: Vec<&UploadedAsset> = uploaded.iter().collect();
    assets.sort_by(|a, b| b.original_url.len().cmp(&a.original_url.len()));

    let mut rewritten = 0;
    for entry in entries.iter_mut() {
        entry.for_each_string_mut(&mut |leaf: &mut String| {
            for asset in &assets {
                if leaf.contains(asset.original_url.as_str()) {
                    *leaf = leaf.replace(asset.original_url.as_str(), &asset.new_url);
                    rewritten += 1;
                }
            }
        });
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(body: serde_json::Value) -> MigrationEntry {
        let mut entry = MigrationEntry::new("Post", "post", "post");
        entry.content.insert("body".to_string(), body);
        entry
    }

    #[test]
    fn test_harvest_dedups_and_resolves() {
        let entries = vec![
            entry(json!({
                "html": r#"<img src="/wp-content/uploads/2023/07/a.png"> <a href="https://cdn.example.com/doc.PDF">doc</a>"#,
                "image": "/wp-content/uploads/2023/07/a.png"
            })),
            entry(json!(["//example.com/b.jpg", "not an asset", "https://example.com/page/"])),
        ];

        let refs = harvest(
            &entries,
            &AssetSettings::default(),
            Some("https://example.com"),
        )
        .unwrap();

        assert_eq!(
            refs,
            vec![
                AssetReference::new(
                    "/wp-content/uploads/2023/07/a.png",
                    "https://example.com/wp-content/uploads/2023/07/a.png"
                ),
                AssetReference::new(
                    "https://cdn.example.com/doc.PDF",
                    "https://cdn.example.com/doc.PDF"
                ),
                AssetReference::new("//example.com/b.jpg", "https://example.com/b.jpg"),
            ]
        );
    }

    #[test]
    fn test_harvest_restrict_domain() {
        let entries = vec![entry(json!([
            "https://example.com/a.png",
            "https://elsewhere.com/b.png",
            "/c.png"
        ]))];
        let settings = AssetSettings {
            restrict_domain: true,
            ..AssetSettings::default()
        };

        let refs = harvest(&entries, &settings, Some("https://example.com")).unwrap();
        let originals: Vec<&str> = refs.iter().map(|r| r.original_url.as_str()).collect();
        assert_eq!(originals, vec!["https://example.com/a.png", "/c.png"]);
    }

    #[test]
    fn test_site_rooted_without_domain_is_skipped() {
        let entries = vec![entry(json!("/a.png"))];
        let refs = harvest(&entries, &AssetSettings::default(), None).unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_rewrite_prefers_longest_url() {
        let mut entries = vec![entry(json!({
            "a": "https://example.com/up/a.png",
            "b": "<img src=\"/up/a.png\">"
        }))];
        let uploaded = vec![
            UploadedAsset {
                original_url: "/up/a.png".to_string(),
                new_url: "https://a.storyblok.com/f/1/a.png".to_string(),
                id: Some(1),
            },
            UploadedAsset {
                original_url: "https://example.com/up/a.png".to_string(),
                new_url: "https://a.storyblok.com/f/2/a.png".to_string(),
                id: Some(2),
            },
        ];

        assert_eq!(rewrite(&mut entries, &uploaded), 2);
        assert_eq!(
            entries[0].content["body"]["a"],
            json!("https://a.storyblok.com/f/2/a.png")
        );
        assert_eq!(
            entries[0].content["body"]["b"],
            json!("<img src=\"https://a.storyblok.com/f/1/a.png\">")
        );
    }
}

//! Extract a [`PageDocument`] from static HTML.
//!
//! This is a scanner, not a parser: it finds the page-key `<meta>`, the
//! links inside `<nav>` and every start tag carrying a feature key, which
//! is all the site's hand-written pages need.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::page::{ElementKind, FEATURE_ATTR, FeatureElement, NavLink, PAGE_KEY_META, PageDocument};

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").expect("Invalid meta regex"));

static NAV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<nav\b[^>]*>(.*?)</nav\s*>").expect("Invalid nav regex"));

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("Invalid anchor regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<([a-z][a-z0-9-]*)\b([^>]*)>").expect("Invalid start tag regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("Invalid attribute regex")
});

/// Attributes of one start tag, names lower-cased.
fn attributes(raw: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            Some((name, value.to_string()))
        })
        .collect()
}

/// Page key declared by `<meta name="anw-acl-key" content="...">`.
pub fn page_key(html: &str) -> Option<String> {
    let html = COMMENT_RE.replace_all(html, "");
    META_RE.captures_iter(&html).find_map(|caps| {
        let attrs = attributes(caps.get(1)?.as_str());
        if !attrs.get("name")?.trim().eq_ignore_ascii_case(PAGE_KEY_META) {
            return None;
        }
        attrs
            .get("content")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
    })
}

/// Links with an `href` inside any `<nav>`.
pub fn nav_links(html: &str) -> Vec<NavLink> {
    let html = COMMENT_RE.replace_all(html, "");
    NAV_RE
        .captures_iter(&html)
        .filter_map(|caps| caps.get(1))
        .flat_map(|nav| {
            ANCHOR_RE
                .captures_iter(nav.as_str())
                .filter_map(|a| attributes(a.get(1)?.as_str()).remove("href"))
                .map(NavLink::new)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Elements tagged with a non-blank feature key.
pub fn features(html: &str) -> Vec<FeatureElement> {
    let html = COMMENT_RE.replace_all(html, "");
    TAG_RE
        .captures_iter(&html)
        .filter_map(|caps| {
            let tag = caps.get(1)?.as_str();
            let mut attrs = attributes(caps.get(2)?.as_str());
            let key = attrs.remove(FEATURE_ATTR)?.trim().to_string();
            if key.is_empty() {
                return None;
            }
            let kind = ElementKind::from_tag(tag);
            let mut element = FeatureElement::new(key, kind);
            if kind == ElementKind::Link
                && let Some(href) = attrs.remove("href")
            {
                element = element.with_href(href);
            }
            Some(element)
        })
        .collect()
}

/// Scan a whole page loaded from `location`.
pub fn scan_page(location: &str, html: &str) -> PageDocument {
    PageDocument {
        location: location.to_string(),
        page_key: page_key(html),
        nav_links: nav_links(html),
        features: features(html),
    }
}

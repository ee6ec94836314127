//! The page model the gates operate on.
//!
//! A [`PageDocument`] holds just what gating reads and writes: the page key,
//! the navigation links and the feature-tagged elements. Redirects go
//! through a [`Navigator`].

use std::collections::BTreeMap;

/// Name of the `<meta>` element carrying the page key.
pub const PAGE_KEY_META: &str = "anw-acl-key";

/// Attribute carrying an element's feature key.
pub const FEATURE_ATTR: &str = "data-acl-feature";

/// Element kind, as far as gating cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `<button>`
    Button,
    /// `<a>`
    Link,
    /// `<input>`
    Input,
    /// `<select>`
    Select,
    /// `<textarea>`
    TextArea,
    /// Anything else.
    Other,
}

impl ElementKind {
    /// Kind for an HTML tag name.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "button" => ElementKind::Button,
            "a" => ElementKind::Link,
            "input" => ElementKind::Input,
            "select" => ElementKind::Select,
            "textarea" => ElementKind::TextArea,
            _ => ElementKind::Other,
        }
    }

    /// Whether the element can be activated and so must be disabled too.
    pub fn is_interactive(self) -> bool {
        self != ElementKind::Other
    }
}

/// A link inside the page navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    /// Raw `href`.
    pub href: String,
    /// Marked as locked for the current session.
    pub locked: bool,
}

impl NavLink {
    /// An unlocked link.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            locked: false,
        }
    }
}

/// An element tagged with a feature key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureElement {
    /// Feature key.
    pub key: String,
    /// Element kind.
    pub kind: ElementKind,
    /// Current `href` (links only).
    pub href: Option<String>,
    /// Hidden.
    pub hidden: bool,
    /// `aria-hidden`.
    pub aria_hidden: bool,
    /// `disabled`.
    pub disabled: bool,
    /// `aria-disabled`.
    pub aria_disabled: bool,
    saved_href: Option<String>,
}

impl FeatureElement {
    /// A visible, enabled element.
    pub fn new(key: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            key: key.into(),
            kind,
            href: None,
            hidden: false,
            aria_hidden: false,
            disabled: false,
            aria_disabled: false,
            saved_href: None,
        }
    }

    /// Set the link target.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Hide the element; interactive elements are disabled as well and
    /// links lose their target.
    pub fn deny(&mut self) {
        self.hidden = true;
        self.aria_hidden = true;
        if self.kind.is_interactive() {
            self.disabled = true;
            self.aria_disabled = true;
        }
        if self.kind == ElementKind::Link && self.href.as_deref() != Some("#") {
            self.saved_href = self.href.take();
            self.href = Some("#".to_string());
        }
    }

    /// Undo [`deny`](Self::deny).
    pub fn allow(&mut self) {
        self.hidden = false;
        self.aria_hidden = false;
        self.disabled = false;
        self.aria_disabled = false;
        if let Some(href) = self.saved_href.take() {
            self.href = Some(href);
        }
    }
}

/// One page, reduced to its gated parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    /// Location the page was loaded from (URL or path).
    pub location: String,
    /// Page key from the page metadata, if declared.
    pub page_key: Option<String>,
    /// Navigation links.
    pub nav_links: Vec<NavLink>,
    /// Feature-tagged elements.
    pub features: Vec<FeatureElement>,
}

impl PageDocument {
    /// An empty page at `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Set the page key; blank keys count as undeclared.
    pub fn with_page_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        self.page_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Add a navigation link.
    pub fn with_nav_link(mut self, href: impl Into<String>) -> Self {
        self.nav_links.push(NavLink::new(href));
        self
    }

    /// Add a feature element.
    pub fn with_feature(mut self, element: FeatureElement) -> Self {
        self.features.push(element);
        self
    }

    /// Local preview: opened from the filesystem, with no identity or store.
    pub fn is_preview(&self) -> bool {
        self.location
            .trim_start()
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"))
    }

    /// Path part of the location, without scheme, host, query or fragment.
    pub fn path(&self) -> &str {
        let loc = self.location.trim();
        let loc = match loc.find("://") {
            Some(i) => {
                let rest = &loc[i + 3..];
                rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
            }
            None => loc,
        };
        strip_suffixes(loc)
    }
}

fn strip_suffixes(s: &str) -> &str {
    let end = s.find(['?', '#']).unwrap_or(s.len());
    &s[..end]
}

/// Last path segment of an href or path; the site root is `index.html`.
pub fn page_file(href: &str) -> &str {
    let path = strip_suffixes(href.trim());
    let file = path.rsplit('/').next().unwrap_or("");
    if file.is_empty() { "index.html" } else { file }
}

/// Whether `current` already shows `target`.
pub fn same_page(current: &str, target: &str) -> bool {
    page_file(current).eq_ignore_ascii_case(page_file(target))
}

/// Where the gates send the browser.
pub trait Navigator {
    /// Replace the current page with `target`.
    fn replace(&mut self, target: &str);
}

/// A [`Navigator`] that records redirects instead of performing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    /// Redirect targets, in order.
    pub redirects: Vec<String>,
}

impl RecordingNavigator {
    /// A navigator with no redirects yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent redirect.
    pub fn last(&self) -> Option<&str> {
        self.redirects.last().map(String::as_str)
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&mut self, target: &str) {
        self.redirects.push(target.to_string());
    }
}

/// Page file to page key table used by the navigation filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    map: BTreeMap<String, String>,
}

impl Default for Routes {
    fn default() -> Self {
        let map = [
            ("index.html", "page:home"),
            ("about.html", "page:about"),
            ("privacy.html", "page:privacy"),
            ("login.html", "page:login"),
            ("dashboard.html", "page:dashboard"),
            ("report.html", "page:report"),
            ("report-map.html", "page:report-map"),
            ("alerts.html", "page:alerts"),
            ("projects.html", "page:projects"),
            ("handbook.html", "page:handbook"),
            ("household.html", "page:household"),
            ("admin.html", "page:admin"),
        ]
        .into_iter()
        .map(|(f, k)| (f.to_string(), k.to_string()))
        .collect();
        Self { map }
    }
}

impl Routes {
    /// Built-in routes extended (or overridden) by `extra`.
    pub fn with_overrides(extra: &BTreeMap<String, String>) -> Self {
        let mut routes = Self::default();
        for (href, key) in extra {
            routes
                .map
                .insert(page_file(href).to_ascii_lowercase(), key.trim().to_string());
        }
        routes
    }

    /// Page key for an href. External and in-page links have none.
    pub fn page_key(&self, href: &str) -> Option<&str> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.contains("://") {
            return None;
        }
        self.map
            .get(&page_file(href).to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All routes, by page file.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(f, k)| (f.as_str(), k.as_str()))
    }
}

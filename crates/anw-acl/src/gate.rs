//! Page gate, navigation filter and feature gate.
//!
//! Gating is fail-open: a page without a rule renders, and a feature
//! without a rule follows the configured [`UnknownFeaturePolicy`].
//! Navigation links are marked locked, never removed.

use anw_core::{AclConfig, UnknownFeaturePolicy};

use crate::evaluator::{AccessContext, Decision};
use crate::page::{FeatureElement, NavLink, Navigator, PageDocument, Routes, same_page};

/// What the page gate decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    /// Show the page.
    Render,
    /// Leave for `target`.
    Redirect(String),
}

/// Decide whether the page at `current_path` with `page_key` may render.
///
/// Denied anonymous visitors go to the login path, denied signed-in
/// visitors to the landing path. A redirect to the page already shown is
/// dropped with a warning.
pub fn page_decision(
    ctx: &AccessContext,
    config: &AclConfig,
    page_key: Option<&str>,
    current_path: &str,
) -> PageDecision {
    let Some(key) = page_key.map(str::trim).filter(|k| !k.is_empty()) else {
        return PageDecision::Render;
    };

    match ctx.decide(key) {
        Decision::Allow => PageDecision::Render,
        Decision::Unlisted => {
            log::warn!("No ACL rule for page '{key}'; rendering");
            PageDecision::Render
        }
        Decision::Deny => {
            let target = if ctx.is_logged_in() {
                &config.landing_path
            } else {
                &config.login_path
            };
            if same_page(current_path, target) {
                log::warn!(
                    "Page '{key}' denies role {} but already on '{target}'; not redirecting",
                    ctx.role()
                );
                PageDecision::Render
            } else {
                log::info!("Page '{key}' denies role {}; redirecting to '{target}'", ctx.role());
                PageDecision::Redirect(target.clone())
            }
        }
    }
}

/// Mark each routed link locked or unlocked. Returns how many are locked.
///
/// Links whose href has no route are left as they are.
pub fn filter_nav(ctx: &AccessContext, routes: &Routes, links: &mut [NavLink]) -> usize {
    let mut locked = 0;
    for link in links.iter_mut() {
        let Some(key) = routes.page_key(&link.href) else {
            continue;
        };
        link.locked = !ctx.decide(key).permits(true);
        if link.locked {
            locked += 1;
        }
    }
    locked
}

/// Hide and disable denied features, restore allowed ones. Returns how many
/// are hidden.
pub fn gate_features(
    ctx: &AccessContext,
    policy: UnknownFeaturePolicy,
    elements: &mut [FeatureElement],
) -> usize {
    let mut hidden = 0;
    for element in elements.iter_mut() {
        let key = element.key.trim();
        if key.is_empty() {
            continue;
        }
        let decision = ctx.decide(key);
        if decision == Decision::Unlisted {
            log::warn!("No ACL rule for feature '{key}'; policy is {policy:?}");
        }
        if decision.permits(policy == UnknownFeaturePolicy::Show) {
            element.allow();
        } else {
            element.deny();
            hidden += 1;
        }
    }
    hidden
}

/// Result of gating one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    /// Page gate decision.
    pub decision: PageDecision,
    /// Locked navigation links.
    pub locked_links: usize,
    /// Hidden feature elements.
    pub hidden_features: usize,
    /// The page was a local preview and left alone.
    pub preview: bool,
}

impl GateOutcome {
    /// Outcome for an ungated preview page.
    pub fn preview() -> Self {
        Self {
            decision: PageDecision::Render,
            locked_links: 0,
            hidden_features: 0,
            preview: true,
        }
    }

    /// Whether the page renders.
    pub fn renders(&self) -> bool {
        self.decision == PageDecision::Render
    }
}

/// Run all three gates over `page`, redirecting through `navigator` when
/// the page gate denies.
pub fn apply(
    ctx: &AccessContext,
    config: &AclConfig,
    routes: &Routes,
    page: &mut PageDocument,
    navigator: &mut dyn Navigator,
) -> GateOutcome {
    if page.is_preview() {
        log::debug!("Preview page '{}'; ACL not enforced", page.location);
        return GateOutcome::preview();
    }

    let locked_links = filter_nav(ctx, routes, &mut page.nav_links);
    let hidden_features = gate_features(ctx, config.unknown_feature, &mut page.features);
    let decision = page_decision(ctx, config, page.page_key.as_deref(), page.path());
    if let PageDecision::Redirect(target) = &decision {
        navigator.replace(target);
    }

    GateOutcome {
        decision,
        locked_links,
        hidden_features,
        preview: false,
    }
}

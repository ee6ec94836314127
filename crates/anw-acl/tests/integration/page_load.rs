//! Whole page loads: redirects, loop prevention and feature gating.

use anw_acl::{ElementKind, FeatureElement, PageDecision, PageDocument, RecordingNavigator, Role};
use serde_json::json;

use crate::common::{MASTER_EMAIL, SiteHarness};

const SITE: &str = "https://aderrignw.ie";

fn page(file: &str, key: &str) -> PageDocument {
    PageDocument::new(format!("{SITE}/{file}")).with_page_key(key)
}

#[tokio::test]
async fn test_anonymous_redirected_to_login_without_loop() {
    let site = SiteHarness::new().with_acl(json!({"page:household": ["resident", "owner"]}));
    let guard = site.anonymous();

    let mut nav = RecordingNavigator::new();
    let outcome = guard
        .guard(&mut page("household.html", "page:household"), &mut nav)
        .await;
    assert_eq!(outcome.decision, PageDecision::Redirect("login.html".into()));
    assert_eq!(nav.redirects, vec!["login.html".to_string()]);

    // A login page that carries the same restricted key must not bounce.
    let mut nav = RecordingNavigator::new();
    let outcome = guard
        .guard(&mut page("login.html", "page:household"), &mut nav)
        .await;
    assert!(outcome.renders());
    assert!(nav.redirects.is_empty());
}

#[tokio::test]
async fn test_unregistered_member_sent_to_landing_not_login() {
    let site = SiteHarness::new().with_acl(json!({"page:handbook": ["owner"]}));
    let guard = site.signed_in("newcomer@aderrignw.ie");

    let ctx = guard.context().await;
    assert_eq!(ctx.role(), Role::Resident);

    let mut nav = RecordingNavigator::new();
    guard
        .guard(&mut page("handbook.html", "page:handbook"), &mut nav)
        .await;
    assert_eq!(nav.last(), Some("index.html"));
}

#[tokio::test]
async fn test_feature_override_hides_for_volunteer_not_owner() {
    let site = SiteHarness::new().with_acl(json!({"feature:alerts:tab_contacts": ["admin"]}));
    let alerts = || {
        page("alerts.html", "page:alerts")
            .with_feature(FeatureElement::new("feature:alerts:tab_contacts", ElementKind::Button))
            .with_feature(
                FeatureElement::new("feature:alerts:tab_contacts", ElementKind::Link)
                    .with_href("#contacts"),
            )
    };

    let mut volunteer_page = alerts();
    let outcome = site
        .signed_in("volunteer@aderrignw.ie")
        .guard(&mut volunteer_page, &mut RecordingNavigator::new())
        .await;
    assert!(outcome.renders());
    assert_eq!(outcome.hidden_features, 2);
    for el in &volunteer_page.features {
        assert!(el.hidden && el.aria_hidden, "{el:?}");
        assert!(el.disabled && el.aria_disabled, "{el:?}");
    }
    assert_eq!(volunteer_page.features[1].href.as_deref(), Some("#"));

    let mut owner_page = alerts();
    let outcome = site
        .signed_in("owner@aderrignw.ie")
        .guard(&mut owner_page, &mut RecordingNavigator::new())
        .await;
    assert_eq!(outcome.hidden_features, 0);
    assert!(owner_page.features.iter().all(|el| !el.hidden && !el.disabled));
}

#[tokio::test]
async fn test_master_email_is_owner_without_record() {
    let site = SiteHarness::new().with_acl(json!({"page:admin": ["admin"]}));
    let guard = site.signed_in(MASTER_EMAIL);

    let mut nav = RecordingNavigator::new();
    let outcome = guard.guard(&mut page("admin.html", "page:admin"), &mut nav).await;
    assert!(outcome.renders());
    assert_eq!(guard.context().await.role(), Role::Owner);
}

#[tokio::test]
async fn test_nav_links_marked_locked_not_removed() {
    let site = SiteHarness::new();
    let mut doc = page("index.html", "page:home")
        .with_nav_link("index.html")
        .with_nav_link("dashboard.html")
        .with_nav_link("admin.html");

    let outcome = site
        .signed_in("coord@aderrignw.ie")
        .guard(&mut doc, &mut RecordingNavigator::new())
        .await;
    assert_eq!(outcome.locked_links, 1);
    assert_eq!(doc.nav_links.len(), 3);
    let locked: Vec<_> = doc
        .nav_links
        .iter()
        .filter(|l| l.locked)
        .map(|l| l.href.as_str())
        .collect();
    assert_eq!(locked, vec!["admin.html"]);
}

#[tokio::test]
async fn test_authenticated_rule_ignores_role() {
    let site = SiteHarness::new().with_acl(json!({"page:report": "authenticated"}));

    let mut nav = RecordingNavigator::new();
    site.signed_in("newcomer@aderrignw.ie")
        .guard(&mut page("report.html", "page:report"), &mut nav)
        .await;
    assert!(nav.redirects.is_empty());

    site.anonymous()
        .guard(&mut page("report.html", "page:report"), &mut nav)
        .await;
    assert_eq!(nav.last(), Some("login.html"));
}

#[tokio::test]
async fn test_repeat_loads_within_ttl_fetch_once() {
    let site = SiteHarness::new();
    let guard = site.signed_in("resident@aderrignw.ie");

    for _ in 0..3 {
        guard
            .guard(&mut page("dashboard.html", "page:dashboard"), &mut RecordingNavigator::new())
            .await;
    }
    assert_eq!(site.backend.get_count("anw_users"), 1);
    assert_eq!(site.backend.get_count("anw_acl"), 1);
}

#[tokio::test]
async fn test_anonymous_repeat_loads_do_not_retry_private_directory() {
    let site = SiteHarness::new();
    let guard = site.anonymous();

    for _ in 0..3 {
        let outcome = guard
            .guard(&mut page("index.html", "page:home"), &mut RecordingNavigator::new())
            .await;
        assert!(outcome.renders());
    }
    assert_eq!(site.backend.get_count("anw_users"), 1);
    assert_eq!(site.backend.get_count("anw_acl"), 1);
}

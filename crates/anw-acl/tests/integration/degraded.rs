//! Page loads while the store or identity provider misbehaves.

use std::time::Duration;

use anw_acl::{PageDocument, RecordingNavigator, Role, Rule};
use serde_json::json;

use crate::common::{SiteHarness, StalledIdentity};

fn page(file: &str, key: &str) -> PageDocument {
    PageDocument::new(format!("https://aderrignw.ie/{file}")).with_page_key(key)
}

#[tokio::test]
async fn test_acl_fetch_failure_still_renders() {
    // The stored matrix would lock residents out of the handbook.
    let site = SiteHarness::new().with_acl(json!({"page:handbook": ["admin"]}));
    site.backend.fail_key("anw_acl");

    let guard = site.signed_in("resident@aderrignw.ie");
    let mut nav = RecordingNavigator::new();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        guard.guard(&mut page("handbook.html", "page:handbook"), &mut nav),
    )
    .await
    .expect("page load must not hang");

    assert!(outcome.renders());
    assert!(nav.redirects.is_empty());
}

#[tokio::test]
async fn test_unlisted_page_renders_for_anonymous() {
    let site = SiteHarness::new();
    site.backend.fail_key("anw_acl");
    site.backend.fail_key("anw_users");

    let mut nav = RecordingNavigator::new();
    let outcome = site
        .anonymous()
        .guard(&mut page("events.html", "page:events"), &mut nav)
        .await;
    assert!(outcome.renders());
}

#[tokio::test]
async fn test_directory_failure_degrades_to_resident() {
    let site = SiteHarness::new();
    site.backend.fail_key("anw_users");

    let ctx = site.signed_in("admin@aderrignw.ie").context().await;
    assert!(ctx.is_logged_in());
    assert_eq!(ctx.role(), Role::Resident);
}

#[tokio::test]
async fn test_cached_data_survives_later_failures() {
    let site = SiteHarness::new().with_acl(json!({"page:projects": ["volunteer"]}));
    let guard = site.signed_in("volunteer@aderrignw.ie");
    guard.context().await;

    site.backend.fail_key("anw_acl");
    site.backend.fail_key("anw_users");
    guard.initializer().invalidate().await;

    let ctx = guard.context().await;
    assert_eq!(ctx.role(), Role::Volunteer);
    assert_eq!(ctx.matrix.get("page:projects"), Some(&Rule::roles([Role::Volunteer])));
}

#[tokio::test]
async fn test_malformed_remote_matrix_uses_default() {
    let site = SiteHarness::new().with_acl(json!(["page:admin", "owner"]));
    let guard = site.signed_in("admin@aderrignw.ie");

    let mut nav = RecordingNavigator::new();
    let outcome = guard.guard(&mut page("admin.html", "page:admin"), &mut nav).await;
    assert!(outcome.renders());
}

#[tokio::test(start_paused = true)]
async fn test_identity_restore_timeout_is_anonymous() {
    let site = SiteHarness::new();
    let guard = site.guard(StalledIdentity {
        delay: Duration::from_secs(30),
    });

    let mut nav = RecordingNavigator::new();
    guard
        .guard(&mut page("dashboard.html", "page:dashboard"), &mut nav)
        .await;
    assert_eq!(nav.last(), Some("login.html"));
}

#[tokio::test]
async fn test_preview_skips_store_entirely() {
    let site = SiteHarness::new();
    let mut doc = PageDocument::new("file:///home/me/site/admin.html").with_page_key("page:admin");

    let outcome = site
        .anonymous()
        .guard(&mut doc, &mut RecordingNavigator::new())
        .await;
    assert!(outcome.preview);
    assert_eq!(site.backend.get_count("anw_acl"), 0);
}

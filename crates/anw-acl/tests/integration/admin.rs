//! ACL administration across independent clients.

use anw_acl::{PageLabel, Role, Rule};
use serde_json::json;

use crate::common::SiteHarness;

#[tokio::test]
async fn test_grant_is_seen_by_other_sessions() {
    let site = SiteHarness::new();
    let admin = site.signed_in("admin@aderrignw.ie");
    admin.grant("page:admin", Role::Coordinator).await.unwrap();

    let coordinator = site.signed_in("coord@aderrignw.ie");
    let ctx = coordinator.context().await;
    assert!(ctx.allows_key("page:admin"));
}

#[tokio::test]
async fn test_concurrent_admin_edits_conflict() {
    let site = SiteHarness::new().with_acl(json!({"page:report": ["resident"]}));
    let first = site.signed_in("admin@aderrignw.ie");
    let second = site.signed_in("owner@aderrignw.ie");

    let mut from_first = first.acl_fresh().await;
    let mut from_second = second.acl_fresh().await;

    from_first.set("page:report", Rule::roles([Role::Volunteer]));
    first.set_acl(&from_first).await.unwrap();

    from_second.set("page:report", Rule::Authenticated);
    let err = second.set_acl(&from_second).await.unwrap_err();
    assert!(err.is_conflict(), "{err}");

    // after a refresh the second admin can apply the edit
    let mut refreshed = second.acl_fresh().await;
    assert_eq!(refreshed.get("page:report"), Some(&Rule::roles([Role::Volunteer])));
    refreshed.set("page:report", Rule::Authenticated);
    second.set_acl(&refreshed).await.unwrap();
    assert_eq!(site.backend.stored("anw_acl").unwrap()["page:report"], json!("Authenticated"));
}

#[tokio::test]
async fn test_edits_store_only_non_default_rules() {
    // page:admin repeats the default; page:report is a real override
    let site = SiteHarness::new().with_acl(json!({
        "page:admin": ["admin", "owner"],
        "page:report": ["coordinator"]
    }));
    let admin = site.signed_in("admin@aderrignw.ie");
    let matrix = admin.revoke("page:dashboard", Role::Resident).await.unwrap();

    let stored = site.backend.stored("anw_acl").unwrap();
    let mut keys: Vec<_> = stored.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["page:dashboard", "page:report"]);
    assert_eq!(admin.acl_fresh().await, matrix);
    assert_eq!(matrix.classify_page("page:dashboard"), PageLabel::Exclusive);
    assert_eq!(matrix.classify_page("page:alerts"), PageLabel::Private);
    assert_eq!(matrix.classify_page("page:admin"), PageLabel::Exclusive);
}

#[tokio::test]
async fn test_revoke_sentinel_rejected() {
    let site = SiteHarness::new();
    let err = site
        .signed_in("admin@aderrignw.ie")
        .revoke("page:home", Role::Public)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("page:home"), "{err}");
    assert_eq!(site.backend.put_count("anw_acl"), 0);
}

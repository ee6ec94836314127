//! Gating pages read from HTML.

use anw_acl::scan::scan_page;
use anw_acl::{PageDecision, RecordingNavigator};
use serde_json::json;

use crate::common::SiteHarness;

const DASHBOARD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta name="anw-acl-key" content="page:dashboard">
  <title>Dashboard</title>
</head>
<body>
  <nav>
    <a href="index.html">Home</a>
    <a href="dashboard.html">Dashboard</a>
    <a href="admin.html">Admin</a>
  </nav>
  <div class="tabs">
    <button data-acl-feature="dashboard:incidents">Incidents</button>
    <button data-acl-feature="dashboard:members">Members</button>
    <a href="report.html" data-acl-feature="feature:report:submit">Report</a>
  </div>
</body>
</html>"#;

#[tokio::test]
async fn test_volunteer_dashboard() {
    let site = SiteHarness::new();
    let mut page = scan_page("https://aderrignw.ie/dashboard.html", DASHBOARD);

    let outcome = site
        .signed_in("volunteer@aderrignw.ie")
        .guard(&mut page, &mut RecordingNavigator::new())
        .await;

    assert_eq!(outcome.decision, PageDecision::Render);
    assert_eq!(outcome.locked_links, 1);
    assert_eq!(outcome.hidden_features, 1);
    let hidden: Vec<_> = page
        .features
        .iter()
        .filter(|f| f.hidden)
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(hidden, vec!["dashboard:members"]);
}

#[tokio::test]
async fn test_anonymous_dashboard_redirects_and_gates() {
    let site = SiteHarness::new().with_acl(json!({"feature:report:submit": "Public"}));
    let mut page = scan_page("https://aderrignw.ie/dashboard.html", DASHBOARD);
    let mut nav = RecordingNavigator::new();

    let outcome = site.anonymous().guard(&mut page, &mut nav).await;

    assert_eq!(nav.last(), Some("login.html"));
    assert_eq!(outcome.locked_links, 2);
    let report = page
        .features
        .iter()
        .find(|f| f.key == "feature:report:submit")
        .unwrap();
    assert!(!report.hidden);
    assert_eq!(report.href.as_deref(), Some("report.html"));
}

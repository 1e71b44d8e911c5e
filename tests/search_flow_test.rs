//! End-to-end search flows against the in-memory marketplace.

mod common;

use chaser_probe::data::FixtureData;
use chaser_probe::diagnostics::DiagnosticLevel;
use chaser_probe::runner::{RunFilter, Runner};
use chaser_probe::scenario::Verdict;
use chaser_probe::scenarios::{self, motors, property};

use common::SiteOptions;

#[tokio::test]
async fn test_motors_flow_reaches_last_listing() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, browser) = common::provisioner(common::marketplace(SiteOptions::default()), dir.path());

    let report = motors::scenario(common::motors_filters()).run(&provisioner).await;

    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.events);
    let history = browser.pages()[0].history();
    assert!(history.iter().any(|url| url.ends_with("/a/motors/cars?page=4")));
    assert_eq!(history.last().map(String::as_str), Some("https://mock.test/a/motors/listing/43"));

    let details = report
        .events
        .iter()
        .find(|e| e.message == "Vehicle details")
        .and_then(|e| e.payload.clone())
        .unwrap();
    assert_eq!(details["title"], "2017 Mazda 3 GSX Hatch");
    assert_eq!(details["price"], "$16,500");
    assert_eq!(details["listingId"], "4821337");
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_zero_motors_results_skip_with_filters() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::marketplace(SiteOptions {
        motors_results: 0,
        ..SiteOptions::default()
    });
    let (provisioner, browser) = common::provisioner(site, dir.path());

    let report = motors::scenario(common::motors_filters()).run(&provisioner).await;

    assert!(matches!(report.verdict, Verdict::Skipped { .. }));
    let skip = report
        .events
        .iter()
        .find(|e| e.level == DiagnosticLevel::Skip)
        .unwrap();
    let payload = skip.payload.as_ref().unwrap();
    assert_eq!(payload["location"], "Auckland");
    assert_eq!(payload["bodyStyle"], "Hatchback");
    assert_eq!(payload["priceMax"], "$50k");
    assert!(report.screenshot.is_none());
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_property_flow_uses_numbered_pagination() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, browser) = common::provisioner(common::marketplace(SiteOptions::default()), dir.path());

    let data = chaser_probe::data::PropertyData {
        common: common::property_filters(),
        bedroom_options: vec!["4 +".into()],
    };
    let scenario = property::scenarios(&data).pop().unwrap();
    let report = scenario.run(&provisioner).await;

    assert_eq!(report.verdict, Verdict::Passed, "{:?}", report.events);
    let mock = &browser.pages()[0];
    assert!(mock.selections().contains(&("Bedrooms".to_string(), "4 +".to_string())));
    assert!(mock
        .history()
        .iter()
        .any(|url| url.ends_with("/a/property/residential/sale/auckland/search?page=3")));
    assert_eq!(mock.current_url(), "https://mock.test/a/property/listing/33");
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_failure_names_step_and_keeps_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::marketplace(SiteOptions {
        motors_price: false,
        ..SiteOptions::default()
    });
    let (provisioner, browser) = common::provisioner(site, dir.path());

    let report = motors::scenario(common::motors_filters()).run(&provisioner).await;

    match &report.verdict {
        Verdict::Failed { step, error } => {
            assert_eq!(step.as_deref(), Some("validate detail page"));
            assert!(error.contains("price"));
        }
        other => panic!("unexpected verdict: {:?}", other),
    }
    assert!(report.screenshot.as_ref().unwrap().exists());
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_refused_session_fails_without_leaking() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, browser) = common::provisioner(common::marketplace(SiteOptions::default()), dir.path());
    browser.refuse_next_page();

    let report = motors::scenario(common::motors_filters()).run(&provisioner).await;

    assert!(report.verdict.is_failure());
    assert!(browser.pages().is_empty());
}

#[tokio::test]
async fn test_full_catalogue_against_marketplace() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, browser) = common::provisioner(common::marketplace(SiteOptions::default()), dir.path());
    let data = FixtureData::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data")).unwrap();

    let runner = Runner::new(provisioner);
    let report = runner.run(scenarios::catalogue(&data)).await;

    let failures: Vec<_> = report
        .scenarios
        .iter()
        .filter(|r| r.verdict.is_failure())
        .map(|r| (&r.name, &r.verdict))
        .collect();
    assert!(failures.is_empty(), "{:?}", failures);
    assert_eq!(report.summary.total, 13);
    assert!(report.success());

    let path = runner.write_report(&report).await.unwrap();
    assert!(path.exists());
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_tag_filter_selects_regression_only() {
    let data = FixtureData::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data")).unwrap();
    let filter = RunFilter {
        tags: vec!["@property".into()],
        grep: None,
    };

    let selected = filter.select(scenarios::catalogue(&data));
    assert_eq!(selected.len(), data.property.bedroom_options.len());
    assert!(selected.iter().all(|s| s.info.has_tag("regression")));
}

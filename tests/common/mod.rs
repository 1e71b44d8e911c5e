//! Shared fixtures for integration tests: an in-memory marketplace site and
//! a provisioner bound to it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chaser_probe::config::{Config, Timeouts};
use chaser_probe::data::{MotorsFilters, PropertyFilters};
use chaser_probe::fixture::Provisioner;
use chaser_probe::session::{MockBrowser, MockDocument, MockNode, MockSite};

pub const ORIGIN: &str = "https://mock.test";

const MOTORS_RESULTS: &str = "/a/motors/cars";
const PROPERTY_RESULTS: &str = "/a/property/residential/sale/auckland/search";

/// Knobs for the generated site
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub motors_results: u32,
    pub property_results: u32,
    /// Render the asking price on vehicle detail pages
    pub motors_price: bool,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            motors_results: 62,
            property_results: 37,
            motors_price: true,
        }
    }
}

pub fn timeouts() -> Timeouts {
    Timeouts {
        page_load_ms: 500,
        probe_ms: 200,
        action_ms: 500,
        scenario_ms: 5_000,
        poll_interval_ms: 10,
    }
}

pub fn config(artifacts: &Path) -> Config {
    Config {
        base_url: ORIGIN.to_string(),
        artifacts_dir: artifacts.to_path_buf(),
        workers: 4,
        timeouts: timeouts(),
        ..Config::default()
    }
}

pub fn provisioner(site: MockSite, artifacts: &Path) -> (Provisioner, Arc<MockBrowser>) {
    let browser = Arc::new(MockBrowser::new(site));
    let provisioner = Provisioner::new(browser.clone(), Arc::new(config(artifacts)));
    (provisioner, browser)
}

pub fn motors_filters() -> MotorsFilters {
    MotorsFilters {
        make: "Any make".into(),
        location: "Auckland".into(),
        year_from: "2015".into(),
        price_max: "$50k".into(),
        body_style: "Hatchback".into(),
        fuel: "Petrol".into(),
    }
}

pub fn property_filters() -> PropertyFilters {
    PropertyFilters {
        region: "Auckland".into(),
        district: "Rodney".into(),
        suburb: "Millwater".into(),
        property_type: "House".into(),
        max_price: "$1.5M".into(),
        min_price: None,
        bedrooms: Some("4 +".into()),
    }
}

fn home() -> MockDocument {
    MockDocument::new("Trade Me: Buy online, sell online")
        .with(MockNode::nav("navigation bar").children([
            MockNode::link("Marketplace", "/marketplace"),
            MockNode::link("Property", "/property"),
            MockNode::link("Motors", "/motors"),
            MockNode::link("Jobs", "/jobs"),
            MockNode::link("Services", "/services"),
            MockNode::link("Sign up", "/register"),
            MockNode::link("Log in", "/login"),
        ]))
        .with(MockNode::searchbox())
        .with(MockNode::button("Search").navigates_to("/search?search_string=laptop"))
        .with(MockNode::button("Categories"))
        .with(MockNode::link(
            "Electronics & photography",
            "/a/marketplace/electronics-photography",
        ))
        .with(MockNode::link("Home & living", "/a/marketplace/home-living"))
        .with(MockNode::new("footer").child(MockNode::link("Contact Us", "/help/contact")))
}

fn cards(prefix: &str, page: u32, count: u32) -> Vec<MockNode> {
    (1..=count)
        .map(|i| MockNode::link(&format!("Listing {}-{}", page, i), &format!("{}/listing/{}{}", prefix, page, i)))
        .collect()
}

fn motors_form() -> MockDocument {
    MockDocument::new("Motors")
        .with(MockNode::link("Cars", "/motors/cars"))
        .with(MockNode::select("Make", &["Any make", "Mazda", "Toyota"]))
        .with(MockNode::select("Location", &["All locations", "Auckland", "Wellington"]))
        .with(MockNode::select("Start Year", &["Any", "2010", "2015"]))
        .with(MockNode::select("Maximum Price", &["Any", "$20k", "$50k"]))
        .with(MockNode::button("Any body style"))
        .with(MockNode::new("label").text("Hatchback"))
        .with(MockNode::new("label").text("Sedan"))
        .with(MockNode::button("Any fuel type"))
        .with(MockNode::new("label").text("Petrol"))
        .with(MockNode::new("label").text("Diesel"))
        .with(MockNode::button("View listings").navigates_to(MOTORS_RESULTS))
}

fn motors_results(total: u32, current: u32, last: u32) -> MockDocument {
    let doc = MockDocument::new("Cars").with(MockNode::div().child(MockNode::span(&format!("Showing {} results", total))));
    if total == 0 {
        return doc;
    }
    let mut pager = MockNode::new("ul").child(MockNode::span(&current.to_string()).attr("aria-current", "page"));
    if current < last {
        pager = pager.child(
            MockNode::link(&last.to_string(), &format!("{}?page={}", MOTORS_RESULTS, last))
                .aria_label(&format!("Last page, page {}", last)),
        );
    }
    doc.with_all(cards("/a/motors", current, 3)).with(pager)
}

fn motors_detail(with_price: bool) -> MockDocument {
    let doc = MockDocument::new("2017 Mazda 3").with(MockNode::heading(1, "2017 Mazda 3 GSX Hatch"));
    let doc = if with_price { doc.with(MockNode::span("$16,500")) } else { doc };
    doc.with(MockNode::new("tm-vehicle-attributes").child(MockNode::span("72,000km")))
        .with(MockNode::span("Listing #4821337"))
}

fn property_form() -> MockDocument {
    MockDocument::new("Property")
        .with(MockNode::link("For sale", "/a/property/residential/sale"))
        .with(MockNode::link("For rent", "/a/property/residential/rent"))
        .with(MockNode::select("Location", &["All regions", "Auckland", "Canterbury"]))
        .with(MockNode::select("District", &["All districts", "Rodney"]).appears_after(Duration::from_millis(30)))
        .with(MockNode::button("All suburbs"))
        .with(MockNode::new("label").text("Millwater"))
        .with(MockNode::button("Property type"))
        .with(MockNode::new("label").text("House"))
        .with(MockNode::select("Min price", &["Any", "$500k"]))
        .with(MockNode::select("Max price", &["Any", "$1M", "$1.5M"]))
        .with(MockNode::select("Bedrooms", &["Any", "3 +", "4 +", "5 +"]))
        .with(MockNode::button("Search").navigates_to(PROPERTY_RESULTS))
}

fn property_results(total: u32, current: u32, last: u32) -> MockDocument {
    let doc = MockDocument::new("Houses for sale").with(MockNode::heading(3, &format!("Showing {} results", total)));
    if total == 0 {
        return doc;
    }
    let mut nav = MockNode::nav("Pagination").child(MockNode::link("Previous", &format!("{}?page=1", PROPERTY_RESULTS)));
    for n in 1..=last {
        let mut link = MockNode::link(&n.to_string(), &format!("{}?page={}", PROPERTY_RESULTS, n));
        if n == current {
            link = link.aria_label(&format!("{}, current page", n));
        }
        nav = nav.child(link);
    }
    nav = nav.child(MockNode::link("Next", &format!("{}?page={}", PROPERTY_RESULTS, (current + 1).min(last))));
    doc.with_all(cards("/a/property", current, 3)).with(nav)
}

fn property_detail() -> MockDocument {
    MockDocument::new("12 Example Street")
        .with(MockNode::heading(2, "Listing description"))
        .with(MockNode::heading(1, "12 Example Street, Millwater"))
        .with(MockNode::heading(2, "Family home with views"))
        .with(MockNode::heading(2, "Asking price $1,250,000"))
        .with(MockNode::span("Listed: Mon 6 Oct"))
        .with(MockNode::span("4 Bedrooms"))
        .with(MockNode::span("2 Bathrooms"))
        .with(MockNode::span("210m² Floor area"))
        .with(MockNode::new("table").child(MockNode::cell("Property type")).child(MockNode::cell("House")))
        .with(MockNode::button("Show more"))
        .with(MockNode::img("gallery carousel image 1 of 12"))
        .with(MockNode::heading(3, "Agent's details"))
        .with(MockNode::heading(3, "Open home times"))
        .with(MockNode::heading(3, "Share this listing"))
        .with(MockNode::button("Back to search results"))
        .with(MockNode::span("Listing #5017722"))
}

/// Whole marketplace: home, section landings, both search flows and detail pages
pub fn marketplace(options: SiteOptions) -> MockSite {
    MockSite::new(ORIGIN)
        .page("/", home())
        .page(
            "/search?search_string=laptop",
            MockDocument::new("laptop | Trade Me")
                .with_all(cards("/a/marketplace/computers/laptops", 1, 2)),
        )
        .page("/a/marketplace/electronics-photography", MockDocument::new("Electronics & photography"))
        .page("/jobs", MockDocument::new("Jobs").with(MockNode::button("Search jobs")))
        .page("/motors", motors_form())
        .page(MOTORS_RESULTS, motors_results(options.motors_results, 1, 4))
        .page(&format!("{}?page=4", MOTORS_RESULTS), motors_results(options.motors_results, 4, 4))
        .page("/a/motors/listing/43", motors_detail(options.motors_price))
        .page("/property", property_form())
        .page(PROPERTY_RESULTS, property_results(options.property_results, 1, 3))
        .page(&format!("{}?page=1", PROPERTY_RESULTS), property_results(options.property_results, 1, 3))
        .page(&format!("{}?page=3", PROPERTY_RESULTS), property_results(options.property_results, 3, 3))
        .page("/a/property/listing/33", property_detail())
}

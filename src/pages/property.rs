//! Property section: real-estate search form, results and listing detail.

use tracing::{debug, info, instrument};

use crate::components::{ListingCollection, NavigationHeader};
use crate::data::PropertyFilters;
use crate::locator::{Locator, Role, TextMatch};
use crate::pages::detail::{validate_elements, ElementCheck, Validation};
use crate::pages::results::{parse_listing_id, read_result_count};
use crate::pages::LoadWaiter;
use crate::pagination::{go_to_last_page, NumberedLinks, PageTurn};
use crate::session::{LoadState, Session, WaitState};
use crate::Result;

#[derive(Debug, Clone)]
pub struct PropertySearchPage {
    session: Session,
    pub header: NavigationHeader,
    loader: LoadWaiter,
}

impl PropertySearchPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::DomContentLoaded),
            session,
        }
    }

    fn submit_button() -> Locator {
        Locator::role(Role::Button).name_exact("Search").first()
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    /// For sale / For rent tabs and the search button render
    pub async fn is_ready(&self) -> Result<bool> {
        let budget = self.session.timeouts().probe();
        for locator in [
            Locator::role(Role::Link).name(TextMatch::substring("For sale")).first(),
            Locator::role(Role::Link).name(TextMatch::substring("For rent")).first(),
            Self::submit_button(),
        ] {
            if !self.session.locator(locator).is_visible_within(budget).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn select(&self, label: &str, option: &str) -> Result<()> {
        debug!("Selecting {:?} in {}", option, label);
        self.session
            .locator(Locator::label_exact(label))
            .select_option(option)
            .await
    }

    async fn pick(&self, opener: &str, option: &str) -> Result<()> {
        debug!("Picking {:?} from {}", option, opener);
        self.session
            .locator(Locator::role(Role::Button).name_exact(opener))
            .click()
            .await?;
        self.session.locator(Locator::text_exact(option)).click().await?;
        self.session.press_key("Escape").await
    }

    pub async fn select_region(&self, region: &str) -> Result<()> {
        self.select("Location", region).await
    }

    /// District renders only once a region is chosen
    pub async fn select_district(&self, district: &str) -> Result<()> {
        self.session
            .locator(Locator::label_exact("District"))
            .wait_for(WaitState::Visible, self.session.timeouts().action())
            .await?;
        self.select("District", district).await
    }

    pub async fn select_suburb(&self, suburb: &str) -> Result<()> {
        self.pick("All suburbs", suburb).await
    }

    pub async fn select_property_type(&self, property_type: &str) -> Result<()> {
        self.pick("Property type", property_type).await
    }

    pub async fn select_bedrooms(&self, bedrooms: &str) -> Result<()> {
        self.select("Bedrooms", bedrooms).await
    }

    pub async fn select_max_price(&self, price: &str) -> Result<()> {
        self.select("Max price", price).await
    }

    pub async fn select_min_price(&self, price: &str) -> Result<()> {
        self.select("Min price", price).await
    }

    #[instrument(skip(self))]
    pub async fn apply(&self, filters: &PropertyFilters) -> Result<()> {
        self.select_region(&filters.region).await?;
        self.select_district(&filters.district).await?;
        self.select_suburb(&filters.suburb).await?;
        self.select_property_type(&filters.property_type).await?;
        self.select_max_price(&filters.max_price).await?;
        if let Some(min_price) = &filters.min_price {
            self.select_min_price(min_price).await?;
        }
        if let Some(bedrooms) = &filters.bedrooms {
            self.select_bedrooms(bedrooms).await?;
        }
        Ok(())
    }

    pub async fn submit(&self) -> Result<()> {
        self.session.locator(Self::submit_button()).click().await
    }
}

#[derive(Debug, Clone)]
pub struct PropertyResultsPage {
    session: Session,
    pub header: NavigationHeader,
    listings: ListingCollection,
    pagination: NumberedLinks,
    loader: LoadWaiter,
}

impl PropertyResultsPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            listings: ListingCollection::new(session.clone()),
            pagination: NumberedLinks::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::DomContentLoaded),
            session,
        }
    }

    pub fn caption() -> Locator {
        Locator::role(Role::Heading)
            .level(3)
            .has_text(TextMatch::pattern(r"Showing [\d,]+ results"))
            .first()
    }

    pub fn listings(&self) -> &ListingCollection {
        &self.listings
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    pub async fn wait_for_results(&self) -> Result<()> {
        self.listings.wait_for_any(self.session.timeouts().page_load()).await
    }

    pub async fn result_count(&self) -> Result<u64> {
        let count = read_result_count(&self.session, Self::caption()).await?;
        info!("Property search shows {} results", count);
        Ok(count)
    }

    pub async fn go_to_last_page(&self) -> Result<PageTurn> {
        go_to_last_page(&self.listings, &self.pagination, self.session.timeouts()).await
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDetailPage {
    session: Session,
    pub header: NavigationHeader,
    loader: LoadWaiter,
}

impl PropertyDetailPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::Load),
            session,
        }
    }

    fn address_heading() -> Locator {
        Locator::css("h1").first()
    }

    /// Marketing title is the second level-2 heading
    fn listing_title() -> Locator {
        Locator::role(Role::Heading).level(2).nth(1)
    }

    fn price_display() -> Locator {
        Locator::role(Role::Heading)
            .level(2)
            .has_text(TextMatch::pattern(r"negotiation|asking|tender|auction|deadline|\$"))
            .first()
    }

    fn listing_number() -> Locator {
        Locator::text(TextMatch::pattern_cs("Listing #")).first()
    }

    fn heading_named(name: &str) -> Locator {
        Locator::role(Role::Heading).name(TextMatch::substring(name))
    }

    pub fn checks() -> Vec<ElementCheck> {
        vec![
            ElementCheck::required("address", Self::address_heading()).with_text(),
            ElementCheck::required("listed date", Locator::text(TextMatch::pattern_cs("Listed:")).first()),
            ElementCheck::required("listing title", Self::listing_title()),
            ElementCheck::required("price", Self::price_display()),
            ElementCheck::required("bedrooms", Locator::text_pattern(r"\d+\s*Bed").first()),
            ElementCheck::required("bathrooms", Locator::text_pattern(r"\d+\s*Bath").first()),
            ElementCheck::conditional("floor area", Locator::text_pattern(r"\d+m²\s*Floor").first()),
            ElementCheck::required(
                "property type",
                Locator::role(Role::Cell).name(TextMatch::substring("Property type")).first(),
            ),
            ElementCheck::required("description", Locator::role(Role::Button).name_pattern("show more")),
            ElementCheck::required("gallery", Locator::css(r#"img[alt^="gallery carousel"]"#).first()),
            ElementCheck::required("agent details", Self::heading_named("Agent's details")),
            ElementCheck::required("open homes", Self::heading_named("Open home times")),
            ElementCheck::required("share", Self::heading_named("Share this listing")),
            ElementCheck::required("back to search", Locator::role(Role::Button).name_pattern("back to search")),
            ElementCheck::required("listing number", Self::listing_number()),
        ]
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    /// The address heading renders within the page load budget
    pub async fn wait_for_page_load(&self) -> Result<()> {
        self.session
            .locator(Self::address_heading())
            .wait_for(WaitState::Visible, self.session.timeouts().page_load())
            .await
    }

    #[instrument(skip(self))]
    pub async fn validate_main_elements(&self) -> Result<Validation> {
        validate_elements(&self.session, &Self::checks(), self.session.timeouts().probe()).await
    }

    pub async fn address(&self) -> Result<String> {
        self.session
            .locator(Self::address_heading())
            .inner_text(self.session.timeouts().probe())
            .await
    }

    pub async fn title(&self) -> Result<String> {
        self.session
            .locator(Self::listing_title())
            .inner_text(self.session.timeouts().probe())
            .await
    }

    pub async fn price(&self) -> Result<String> {
        self.session
            .locator(Self::price_display())
            .inner_text(self.session.timeouts().probe())
            .await
    }

    pub async fn listing_id(&self) -> Result<String> {
        let text = self
            .session
            .locator(Self::listing_number())
            .inner_text(self.session.timeouts().probe())
            .await?;
        Ok(parse_listing_id(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::session::{BrowserContext, MockBrowser, MockDocument, MockNode, MockSite, PageOptions};
    use crate::Error;
    use std::sync::Arc;
    use std::time::Duration;

    fn timeouts() -> Timeouts {
        Timeouts {
            page_load_ms: 300,
            probe_ms: 150,
            action_ms: 300,
            scenario_ms: 2_000,
            poll_interval_ms: 10,
        }
    }

    async fn open(site: MockSite, path: &str) -> (Session, Arc<MockBrowser>) {
        let browser = Arc::new(MockBrowser::new(site));
        let page = browser.new_page(PageOptions::default()).await.unwrap();
        let session = Session::new(page, "https://mock.test", timeouts(), Duration::ZERO).unwrap();
        session.goto(path).await.unwrap();
        (session, browser)
    }

    fn form() -> MockDocument {
        MockDocument::new("Property")
            .with(MockNode::link("For sale", "/a/property/residential/sale"))
            .with(MockNode::link("For rent", "/a/property/residential/rent"))
            .with(MockNode::select("Location", &["All regions", "Auckland"]))
            .with(MockNode::select("District", &["All districts", "Rodney"]).appears_after(Duration::from_millis(40)))
            .with(MockNode::button("All suburbs"))
            .with(MockNode::new("label").text("Millwater"))
            .with(MockNode::button("Property type"))
            .with(MockNode::new("label").text("House"))
            .with(MockNode::select("Min price", &["Any", "$500k"]))
            .with(MockNode::select("Max price", &["Any", "$1.5M"]))
            .with(MockNode::select("Bedrooms", &["Any", "3 +", "4 +"]))
            .with(MockNode::button("Search").navigates_to("/homes"))
    }

    pub(crate) fn detail_document() -> MockDocument {
        MockDocument::new("12 Example Street")
            .with(MockNode::heading(2, "Listing description"))
            .with(MockNode::heading(1, "12 Example Street, Millwater"))
            .with(MockNode::heading(2, "Family home with views"))
            .with(MockNode::heading(2, "Asking price $1,250,000"))
            .with(MockNode::span("Listed: Mon 6 Oct"))
            .with(MockNode::span("4 Bedrooms"))
            .with(MockNode::span("2 Bathrooms"))
            .with(MockNode::new("table").child(MockNode::cell("Property type")).child(MockNode::cell("House")))
            .with(MockNode::button("Show more"))
            .with(MockNode::img("gallery carousel image 1 of 12"))
            .with(MockNode::heading(3, "Agent's details"))
            .with(MockNode::heading(3, "Open home times"))
            .with(MockNode::heading(3, "Share this listing"))
            .with(MockNode::button("Back to search results"))
            .with(MockNode::span("Listing #5017722"))
    }

    fn filters() -> PropertyFilters {
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

    #[tokio::test]
    async fn test_apply_waits_for_district_then_submits() {
        let (session, browser) = open(MockSite::new("https://mock.test").page("/property", form()), "/property").await;
        let page = PropertySearchPage::new(session.clone());

        assert!(page.is_ready().await.unwrap());
        page.apply(&filters()).await.unwrap();
        page.submit().await.unwrap();

        let mock = &browser.pages()[0];
        let selected: Vec<String> = mock.selections().into_iter().map(|(_, v)| v).collect();
        assert_eq!(selected, vec!["Auckland", "Rodney", "$1.5M", "4 +"]);
        assert_eq!(mock.keys(), vec!["Escape", "Escape"]);
        session.expect_url("/homes$").await.unwrap();
    }

    #[tokio::test]
    async fn test_result_count_reads_level_three_heading() {
        let site = MockSite::new("https://mock.test").page(
            "/homes",
            MockDocument::new("Homes")
                .with(MockNode::heading(2, "Showing 999 results nearby"))
                .with(MockNode::heading(3, "Showing 37 results")),
        );
        let (session, _) = open(site, "/homes").await;
        assert_eq!(PropertyResultsPage::new(session).result_count().await.unwrap(), 37);
    }

    #[tokio::test]
    async fn test_detail_validation_and_accessors() {
        let site = MockSite::new("https://mock.test").page("/listing/5017722", detail_document());
        let (session, _) = open(site, "/listing/5017722").await;
        let page = PropertyDetailPage::new(session);

        page.wait_for_page_load().await.unwrap();
        let validation = page.validate_main_elements().await.unwrap();
        assert_eq!(validation.absent, vec!["floor area"]);
        assert_eq!(validation.present.len(), 14);

        assert_eq!(page.address().await.unwrap(), "12 Example Street, Millwater");
        assert_eq!(page.title().await.unwrap(), "Family home with views");
        assert_eq!(page.price().await.unwrap(), "Asking price $1,250,000");
        assert_eq!(page.listing_id().await.unwrap(), "5017722");
    }

    #[tokio::test]
    async fn test_missing_required_element_fails() {
        let mut doc = detail_document();
        doc.body.retain(|n| n.text != "Show more");
        let site = MockSite::new("https://mock.test").page("/listing/1", doc);
        let (session, _) = open(site, "/listing/1").await;

        let err = PropertyDetailPage::new(session).validate_main_elements().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("description"));
    }

    #[tokio::test]
    async fn test_district_never_rendering_times_out() {
        let doc = MockDocument::new("Property").with(MockNode::select("Location", &["Auckland"]));
        let (session, _) = open(MockSite::new("https://mock.test").page("/property", doc), "/property").await;

        let err = PropertySearchPage::new(session).select_district("Rodney").await.unwrap_err();
        match err {
            Error::Timeout { element, .. } => assert!(element.contains("District")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

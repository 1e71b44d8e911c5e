//! Motors section: vehicle search form, results and listing detail.

use tracing::{debug, info, instrument};

use crate::components::{ListingCollection, NavigationHeader};
use crate::data::MotorsFilters;
use crate::locator::{Locator, Role, TextMatch};
use crate::pages::detail::{validate_elements, ElementCheck, Validation};
use crate::pages::results::{parse_listing_id, read_result_count};
use crate::pages::LoadWaiter;
use crate::pagination::{go_to_last_page, LastPageControl, PageTurn};
use crate::session::{LoadState, Session, WaitState};
use crate::Result;

/// Default make option; selecting it is a no-op
pub const ANY_MAKE: &str = "Any make";

#[derive(Debug, Clone)]
pub struct MotorsSearchPage {
    session: Session,
    pub header: NavigationHeader,
    loader: LoadWaiter,
}

impl MotorsSearchPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::NetworkIdle),
            session,
        }
    }

    fn submit_button() -> Locator {
        Locator::role(Role::Button).name_exact("View listings")
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    /// Make, Location and the submit button all render
    pub async fn is_ready(&self) -> Result<bool> {
        let budget = self.session.timeouts().probe();
        for locator in [
            Locator::label_exact("Make"),
            Locator::label_exact("Location"),
            Self::submit_button(),
        ] {
            if !self.session.locator(locator).is_visible_within(budget).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn is_cars_tab_visible(&self) -> Result<bool> {
        self.session
            .locator(Locator::role(Role::Link).name(TextMatch::substring("Cars")).first())
            .is_visible_within(self.session.timeouts().probe())
            .await
    }

    async fn select(&self, label: &str, option: &str) -> Result<()> {
        debug!("Selecting {:?} in {}", option, label);
        self.session
            .locator(Locator::label_exact(label))
            .select_option(option)
            .await
    }

    /// Open a multi-select overlay, tick one option and dismiss it
    async fn pick(&self, opener: &str, option: &str) -> Result<()> {
        debug!("Picking {:?} from {}", option, opener);
        self.session
            .locator(Locator::role(Role::Button).name_exact(opener))
            .click()
            .await?;
        self.session.locator(Locator::text_exact(option)).click().await?;
        self.session.press_key("Escape").await
    }

    pub async fn select_make(&self, make: &str) -> Result<()> {
        if make == ANY_MAKE {
            return Ok(());
        }
        self.select("Make", make).await
    }

    pub async fn select_location(&self, location: &str) -> Result<()> {
        self.select("Location", location).await
    }

    pub async fn select_year_from(&self, year: &str) -> Result<()> {
        self.select("Start Year", year).await
    }

    pub async fn select_max_price(&self, price: &str) -> Result<()> {
        self.select("Maximum Price", price).await
    }

    pub async fn select_body_style(&self, body_style: &str) -> Result<()> {
        self.pick("Any body style", body_style).await
    }

    pub async fn select_fuel_type(&self, fuel: &str) -> Result<()> {
        self.pick("Any fuel type", fuel).await
    }

    #[instrument(skip(self))]
    pub async fn apply(&self, filters: &MotorsFilters) -> Result<()> {
        self.select_make(&filters.make).await?;
        self.select_location(&filters.location).await?;
        self.select_year_from(&filters.year_from).await?;
        self.select_max_price(&filters.price_max).await?;
        self.select_body_style(&filters.body_style).await?;
        self.select_fuel_type(&filters.fuel).await
    }

    pub async fn submit(&self) -> Result<()> {
        self.session.locator(Self::submit_button()).click().await
    }
}

#[derive(Debug, Clone)]
pub struct MotorsResultsPage {
    session: Session,
    pub header: NavigationHeader,
    listings: ListingCollection,
    pagination: LastPageControl,
    loader: LoadWaiter,
}

impl MotorsResultsPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            listings: ListingCollection::new(session.clone()),
            pagination: LastPageControl::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::NetworkIdle),
            session,
        }
    }

    pub fn caption() -> Locator {
        Locator::text_pattern(r"Showing [\d,]+ results").first()
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
        info!("Motors search shows {} results", count);
        Ok(count)
    }

    pub async fn go_to_last_page(&self) -> Result<PageTurn> {
        go_to_last_page(&self.listings, &self.pagination, self.session.timeouts()).await
    }
}

#[derive(Debug, Clone)]
pub struct MotorsDetailPage {
    session: Session,
    pub header: NavigationHeader,
    loader: LoadWaiter,
}

impl MotorsDetailPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::Load),
            session,
        }
    }

    fn title_heading() -> Locator {
        Locator::css("h1").first()
    }

    fn price_display() -> Locator {
        Locator::text_pattern(r"asking price|\$[\d,]+").first()
    }

    fn listing_number() -> Locator {
        Locator::text(TextMatch::pattern_cs("Listing #")).first()
    }

    pub fn checks() -> Vec<ElementCheck> {
        vec![
            ElementCheck::required("title", Self::title_heading()).with_text(),
            ElementCheck::required("price", Self::price_display()),
            ElementCheck::conditional("vehicle attributes", Locator::css("tm-vehicle-attributes").first()),
            ElementCheck::conditional("listing number", Self::listing_number()),
        ]
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    /// The title heading renders within the page load budget
    pub async fn wait_for_page_load(&self) -> Result<()> {
        self.session
            .locator(Self::title_heading())
            .wait_for(WaitState::Visible, self.session.timeouts().page_load())
            .await
    }

    #[instrument(skip(self))]
    pub async fn validate_main_elements(&self) -> Result<Validation> {
        validate_elements(&self.session, &Self::checks(), self.session.timeouts().probe()).await
    }

    pub async fn title(&self) -> Result<String> {
        self.session
            .locator(Self::title_heading())
            .inner_text(self.session.timeouts().probe())
            .await
    }

    pub async fn price(&self) -> Result<String> {
        self.session
            .locator(Self::price_display())
            .inner_text(self.session.timeouts().probe())
            .await
    }

    /// Listing number if the page shows one
    pub async fn listing_id(&self) -> Result<Option<String>> {
        let text = self.session.locator(Self::listing_number()).text_content().await?;
        Ok(text.map(|t| parse_listing_id(&t)))
    }
}

//! Home page at `/`.

use tracing::instrument;

use crate::components::{NavigationHeader, SearchBar};
use crate::locator::{Locator, Role, TextMatch};
use crate::pages::LoadWaiter;
use crate::session::{LoadState, Session};
use crate::Result;

#[derive(Debug, Clone)]
pub struct HomePage {
    session: Session,
    pub header: NavigationHeader,
    pub search: SearchBar,
    loader: LoadWaiter,
}

impl HomePage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            search: SearchBar::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::NetworkIdle),
            session,
        }
    }

    fn categories_button() -> Locator {
        Locator::role(Role::Button).name_exact("Categories")
    }

    fn category_link(name: &str) -> Locator {
        Locator::role(Role::Link).name(TextMatch::substring(name)).first()
    }

    fn contact_us() -> Locator {
        Locator::role(Role::Link).name_pattern("Contact Us").first()
    }

    #[instrument(skip(self))]
    pub async fn goto(&self) -> Result<()> {
        self.session.goto("/").await?;
        self.wait_for_load().await
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    pub async fn title(&self) -> Result<String> {
        self.session.title().await
    }

    pub async fn is_search_visible(&self) -> Result<bool> {
        self.search.is_visible().await
    }

    pub async fn open_categories(&self) -> Result<()> {
        self.session.locator(Self::categories_button()).click().await
    }

    pub async fn is_category_visible(&self, name: &str) -> Result<bool> {
        self.session
            .locator(Self::category_link(name))
            .is_visible_within(self.session.timeouts().probe())
            .await
    }

    #[instrument(skip(self))]
    pub async fn open_category(&self, name: &str) -> Result<()> {
        self.session.locator(Self::category_link(name)).click().await
    }

    pub async fn is_contact_us_visible(&self) -> Result<bool> {
        self.session
            .locator(Self::contact_us())
            .is_visible_within(self.session.timeouts().probe())
            .await
    }
}

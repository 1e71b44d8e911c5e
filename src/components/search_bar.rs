//! Global keyword search box in the site header.

use tracing::{info, instrument};

use crate::locator::{Locator, Role};
use crate::session::Session;
use crate::Result;

#[derive(Debug, Clone)]
pub struct SearchBar {
    session: Session,
}

impl SearchBar {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn input() -> Locator {
        Locator::role(Role::Searchbox).first()
    }

    pub fn submit_button() -> Locator {
        Locator::role(Role::Button).name_exact("Search").first()
    }

    /// Fill the search box and submit
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<()> {
        info!("Searching for {:?}", query);
        self.session.locator(Self::input()).fill(query).await?;
        self.session.locator(Self::submit_button()).click().await
    }

    pub async fn is_visible(&self) -> Result<bool> {
        self.session
            .locator(Self::input())
            .is_visible_within(self.session.timeouts().probe())
            .await
    }
}

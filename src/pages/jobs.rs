//! Jobs landing page.

use crate::components::NavigationHeader;
use crate::locator::{Locator, Role};
use crate::pages::LoadWaiter;
use crate::session::{LoadState, Session};
use crate::Result;

#[derive(Debug, Clone)]
pub struct JobsSearchPage {
    session: Session,
    pub header: NavigationHeader,
    loader: LoadWaiter,
}

impl JobsSearchPage {
    pub fn new(session: Session) -> Self {
        Self {
            header: NavigationHeader::new(session.clone()),
            loader: LoadWaiter::new(session.clone(), LoadState::DomContentLoaded),
            session,
        }
    }

    pub async fn wait_for_load(&self) -> Result<()> {
        self.loader.wait_for_load().await
    }

    /// The jobs search button renders
    pub async fn is_ready(&self) -> Result<bool> {
        self.session
            .locator(Locator::role(Role::Button).name_pattern("Search jobs"))
            .is_visible_within(self.session.timeouts().probe())
            .await
    }
}

//! Site-wide navigation header: section tabs and authentication links.

use tracing::{debug, instrument};

use crate::locator::{Locator, Role};
use crate::session::Session;
use crate::Result;

/// Top-level marketplace sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Marketplace,
    Property,
    Motors,
    Jobs,
    Services,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Marketplace,
        Section::Property,
        Section::Motors,
        Section::Jobs,
        Section::Services,
    ];

    /// Visible tab label
    pub fn label(&self) -> &'static str {
        match self {
            Section::Marketplace => "Marketplace",
            Section::Property => "Property",
            Section::Motors => "Motors",
            Section::Jobs => "Jobs",
            Section::Services => "Services",
        }
    }
}

/// Account actions in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignUp,
    LogIn,
}

impl AuthAction {
    pub fn label(&self) -> &'static str {
        match self {
            AuthAction::SignUp => "Sign up",
            AuthAction::LogIn => "Log in",
        }
    }
}

/// Header shared by every page
#[derive(Debug, Clone)]
pub struct NavigationHeader {
    session: Session,
}

impl NavigationHeader {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn section_tab(section: Section) -> Locator {
        Locator::role(Role::Link).name_exact(section.label()).first()
    }

    /// Auth links live inside the navbar; the footer repeats them
    fn auth_link(action: AuthAction) -> Locator {
        Locator::role(Role::Link)
            .name_exact(action.label())
            .within(&Locator::label_exact("navigation bar"))
    }

    #[instrument(skip(self))]
    pub async fn open_section(&self, section: Section) -> Result<()> {
        debug!("Opening {} tab", section.label());
        self.session.locator(Self::section_tab(section)).click().await
    }

    pub async fn open_marketplace(&self) -> Result<()> {
        self.open_section(Section::Marketplace).await
    }

    pub async fn open_property(&self) -> Result<()> {
        self.open_section(Section::Property).await
    }

    pub async fn open_motors(&self) -> Result<()> {
        self.open_section(Section::Motors).await
    }

    pub async fn open_jobs(&self) -> Result<()> {
        self.open_section(Section::Jobs).await
    }

    pub async fn open_services(&self) -> Result<()> {
        self.open_section(Section::Services).await
    }

    #[instrument(skip(self))]
    pub async fn click_auth(&self, action: AuthAction) -> Result<()> {
        self.session.locator(Self::auth_link(action)).click().await
    }

    pub async fn click_sign_up(&self) -> Result<()> {
        self.click_auth(AuthAction::SignUp).await
    }

    pub async fn click_log_in(&self) -> Result<()> {
        self.click_auth(AuthAction::LogIn).await
    }

    /// Whether the tab renders within the probe budget
    pub async fn is_section_visible(&self, section: Section) -> Result<bool> {
        self.session
            .locator(Self::section_tab(section))
            .is_visible_within(self.session.timeouts().probe())
            .await
    }

    pub async fn is_auth_visible(&self, action: AuthAction) -> Result<bool> {
        self.session
            .locator(Self::auth_link(action))
            .is_visible_within(self.session.timeouts().probe())
            .await
    }
}

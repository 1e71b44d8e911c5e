//! Sanity checks over the home page and section landing pages.

use crate::components::{AuthAction, ListingCollection, Section};
use crate::fixture::PageBundle;
use crate::scenario::{step, Outcome};
use crate::scenarios::{ensure, Scenario};
use crate::Result;

const TAGS: &[&str] = &["@sanity"];

async fn open_home(bundle: &PageBundle) -> Result<()> {
    step("open home page", bundle.home.goto()).await
}

async fn check_auth_links(bundle: &PageBundle) -> Result<()> {
    for action in [AuthAction::SignUp, AuthAction::LogIn] {
        let visible = bundle.home.header.is_auth_visible(action).await?;
        ensure(visible, &format!("{:?} link in the navigation bar", action.label()))?;
    }
    Ok(())
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("TC-SAN-001: home page core elements", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            let title = bundle.home.title().await?;
            step("check title", async { ensure(!title.trim().is_empty(), "a page title") }).await?;
            step("check search box", async {
                ensure(bundle.home.is_search_visible().await?, "the global search box")
            })
            .await?;
            step("check section tabs", async {
                for section in Section::ALL {
                    let visible = bundle.home.header.is_section_visible(section).await?;
                    ensure(visible, &format!("the {} tab", section.label()))?;
                }
                Ok(())
            })
            .await?;
            step("check auth links", check_auth_links(&bundle)).await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-002: global keyword search", TAGS, |bundle, diagnostics| async move {
            open_home(&bundle).await?;
            step("search for laptop", bundle.home.search.search("laptop")).await?;
            step("check search URL", bundle.session.expect_url("/search")).await?;

            let listings = ListingCollection::new(bundle.session.clone());
            let budget = bundle.session.timeouts().page_load();
            step("check listings", async {
                ensure(listings.has_any(budget).await?, "listings for \"laptop\"")
            })
            .await?;
            diagnostics.info(format!("{} listings on first page", listings.count().await?), None);
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-003: property tab", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("open property tab", bundle.home.header.open_property()).await?;
            step("check property URL", bundle.session.expect_url("/property")).await?;
            step("wait for property page", bundle.property_search.wait_for_load()).await?;
            step("check property search form", async {
                ensure(bundle.property_search.is_ready().await?, "For sale, For rent and Search")
            })
            .await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-004: motors tab", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("open motors tab", bundle.home.header.open_motors()).await?;
            step("check motors URL", bundle.session.expect_url("/motors")).await?;
            step("wait for motors page", bundle.motors_search.wait_for_load()).await?;
            step("check motors search form", async {
                ensure(bundle.motors_search.is_cars_tab_visible().await?, "the Cars tab")?;
                ensure(bundle.motors_search.is_ready().await?, "Make, Location and View listings")
            })
            .await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-005: jobs tab", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("open jobs tab", bundle.home.header.open_jobs()).await?;
            step("check jobs URL", bundle.session.expect_url("/jobs")).await?;
            step("wait for jobs page", bundle.jobs_search.wait_for_load()).await?;
            step("check jobs search", async {
                ensure(bundle.jobs_search.is_ready().await?, "the Search jobs button")
            })
            .await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-006: categories dropdown", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("open categories", bundle.home.open_categories()).await?;
            step("check categories", async {
                for name in ["Electronics & photography", "Home & living"] {
                    ensure(bundle.home.is_category_visible(name).await?, &format!("the {} category", name))?;
                }
                Ok(())
            })
            .await?;
            step("open electronics", bundle.home.open_category("Electronics & photography")).await?;
            step("check category URL", bundle.session.expect_url("/electronics-photography")).await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-007: footer contact link", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("check Contact Us", async {
                ensure(bundle.home.is_contact_us_visible().await?, "the Contact Us link")
            })
            .await?;
            Ok(Outcome::Passed)
        }),
        Scenario::new("TC-SAN-008: auth links", TAGS, |bundle, _| async move {
            open_home(&bundle).await?;
            step("check auth links", check_auth_links(&bundle)).await?;
            Ok(Outcome::Passed)
        }),
    ]
}

//! Vehicle search regression.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::MotorsFilters;
use crate::diagnostics::Diagnostics;
use crate::fixture::PageBundle;
use crate::pagination::PageTurn;
use crate::scenario::{run_search_flow, SearchSection};
use crate::scenarios::{ensure, Scenario};
use crate::Result;

/// Motors section driven through the search flow
pub struct MotorsSearch {
    bundle: PageBundle,
    filters: MotorsFilters,
}

impl MotorsSearch {
    pub fn new(bundle: PageBundle, filters: MotorsFilters) -> Self {
        Self { bundle, filters }
    }
}

#[async_trait]
impl SearchSection for MotorsSearch {
    fn name(&self) -> &str {
        "motors"
    }

    fn filters(&self) -> Value {
        serde_json::to_value(&self.filters).unwrap_or(Value::Null)
    }

    async fn navigate(&self) -> Result<()> {
        self.bundle.home.goto().await?;
        self.bundle.home.header.open_motors().await?;
        self.bundle.session.expect_url("/motors").await?;
        self.bundle.motors_search.wait_for_load().await
    }

    async fn apply_filters(&self) -> Result<()> {
        self.bundle.motors_search.apply(&self.filters).await
    }

    async fn submit(&self) -> Result<()> {
        self.bundle.motors_search.submit().await?;
        self.bundle.motors_results.wait_for_load().await
    }

    async fn result_count(&self) -> Result<u64> {
        self.bundle.motors_results.result_count().await
    }

    async fn go_to_last_page(&self) -> Result<PageTurn> {
        self.bundle.motors_results.go_to_last_page().await
    }

    async fn open_last_listing(&self) -> Result<()> {
        self.bundle.motors_results.listings().open_last().await?;
        self.bundle.session.expect_url("/listing/").await?;
        self.bundle.motors_detail.wait_for_page_load().await
    }

    async fn validate_detail(&self, diagnostics: &Diagnostics) -> Result<()> {
        let detail = &self.bundle.motors_detail;
        let validation = detail.validate_main_elements().await?;

        let title = detail.title().await?;
        ensure(!title.is_empty(), "a non-empty vehicle title")?;
        let price = detail.price().await?;
        let listing_id = detail.listing_id().await?;

        diagnostics.info(
            "Vehicle details",
            Some(json!({
                "title": title,
                "price": price,
                "listingId": listing_id,
                "absent": validation.absent,
            })),
        );
        Ok(())
    }
}

pub fn scenario(filters: MotorsFilters) -> Scenario {
    Scenario::new(
        "TC-MOTORS-001: filtered vehicle search opens last listing",
        &["@regression", "@motors"],
        move |bundle, diagnostics| {
            let section = MotorsSearch::new(bundle, filters.clone());
            async move { run_search_flow(&section, &diagnostics).await }
        },
    )
}

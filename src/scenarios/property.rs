//! Real-estate search regression, one scenario per bedroom option.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::{PropertyData, PropertyFilters};
use crate::diagnostics::Diagnostics;
use crate::fixture::PageBundle;
use crate::pagination::PageTurn;
use crate::scenario::{run_search_flow, SearchSection};
use crate::scenarios::{ensure, Scenario};
use crate::Result;

/// Property section driven through the search flow
pub struct PropertySearch {
    bundle: PageBundle,
    filters: PropertyFilters,
}

impl PropertySearch {
    pub fn new(bundle: PageBundle, filters: PropertyFilters) -> Self {
        Self { bundle, filters }
    }
}

#[async_trait]
impl SearchSection for PropertySearch {
    fn name(&self) -> &str {
        "property"
    }

    fn filters(&self) -> Value {
        serde_json::to_value(&self.filters).unwrap_or(Value::Null)
    }

    async fn navigate(&self) -> Result<()> {
        self.bundle.home.goto().await?;
        self.bundle.home.header.open_property().await?;
        self.bundle.session.expect_url("/property").await?;
        self.bundle.property_search.wait_for_load().await
    }

    async fn apply_filters(&self) -> Result<()> {
        self.bundle.property_search.apply(&self.filters).await
    }

    async fn submit(&self) -> Result<()> {
        self.bundle.property_search.submit().await?;
        self.bundle.property_results.wait_for_load().await
    }

    async fn result_count(&self) -> Result<u64> {
        self.bundle.property_results.result_count().await
    }

    async fn go_to_last_page(&self) -> Result<PageTurn> {
        self.bundle.property_results.go_to_last_page().await
    }

    async fn open_last_listing(&self) -> Result<()> {
        self.bundle.property_results.listings().open_last().await?;
        self.bundle.session.expect_url("/listing/").await?;
        self.bundle.property_detail.wait_for_page_load().await
    }

    async fn validate_detail(&self, diagnostics: &Diagnostics) -> Result<()> {
        let detail = &self.bundle.property_detail;
        let validation = detail.validate_main_elements().await?;

        let address = detail.address().await?;
        ensure(!address.is_empty(), "a non-empty address")?;

        diagnostics.info(
            "Property details",
            Some(json!({
                "address": address,
                "title": detail.title().await?,
                "price": detail.price().await?,
                "listingId": detail.listing_id().await?,
                "absent": validation.absent,
            })),
        );
        Ok(())
    }
}

pub fn scenarios(data: &PropertyData) -> Vec<Scenario> {
    data.bedroom_options
        .iter()
        .map(|bedrooms| {
            let filters = data.common.with_bedrooms(bedrooms);
            Scenario::new(
                format!("TC-PROP-001 [{}]: filtered property search opens last listing", bedrooms),
                &["@regression", "@property"],
                move |bundle, diagnostics| {
                    let section = PropertySearch::new(bundle, filters.clone());
                    async move { run_search_flow(&section, &diagnostics).await }
                },
            )
        })
        .collect()
}

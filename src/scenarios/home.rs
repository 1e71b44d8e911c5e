//! Home page smoke check.

use regex::RegexBuilder;

use crate::scenario::{step, Outcome};
use crate::scenarios::{ensure, Scenario};
use crate::Error;

pub fn title_scenario() -> Scenario {
    Scenario::new("TC-HOME-001: home page title", &["@smoke"], |bundle, diagnostics| async move {
        step("open home page", bundle.home.goto()).await?;

        let title = step("read title", bundle.home.title()).await?;
        let pattern = RegexBuilder::new("Trade Me")
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::internal(e.to_string()))?;
        step("check title", async { ensure(pattern.is_match(&title), &format!("title matching /Trade Me/, got {:?}", title)) }).await?;

        diagnostics.info(format!("Home page title: {}", title), None);
        Ok(Outcome::Passed)
    })
}

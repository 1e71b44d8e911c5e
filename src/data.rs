//! Filter parameter sets loaded from JSON fixture files.
//!
//! Every value is the exact visible label of an option on the live form.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{Error, Result};

/// Vehicle search filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorsFilters {
    pub make: String,
    pub location: String,
    pub year_from: String,
    pub price_max: String,
    pub body_style: String,
    pub fuel: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MotorsFile {
    common: MotorsFilters,
}

/// Real-estate search filters; bedrooms vary per scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilters {
    pub region: String,
    pub district: String,
    pub suburb: String,
    pub property_type: String,
    pub max_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<String>,
}

impl PropertyFilters {
    /// Same filters with a bedroom option
    pub fn with_bedrooms(&self, bedrooms: &str) -> Self {
        Self {
            bedrooms: Some(bedrooms.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyData {
    pub common: PropertyFilters,
    pub bedroom_options: Vec<String>,
}

/// Everything the scenario catalogue reads from `data_dir`
#[derive(Debug, Clone)]
pub struct FixtureData {
    pub motors: MotorsFilters,
    pub property: PropertyData,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::fixture(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| Error::fixture(format!("Invalid {}: {}", path.display(), e)))
}

impl FixtureData {
    /// Load `motors.json` and `property.json` from `dir`
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let motors: MotorsFile = read_json(&dir.join("motors.json"))?;
        let property: PropertyData = read_json(&dir.join("property.json"))?;

        if property.bedroom_options.is_empty() {
            return Err(Error::fixture("property.json lists no bedroom options"));
        }

        debug!(
            "Loaded fixture data from {} ({} bedroom options)",
            dir.display(),
            property.bedroom_options.len()
        );
        Ok(Self {
            motors: motors.common,
            property,
        })
    }
}

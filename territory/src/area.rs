//! Territories and the streets inside them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::validate::{require_id, require_text, Validate};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub last_visit: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
}

impl Territory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Validate for Territory {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_text(&mut errors, &self.name, "Territory name");
        errors
    }
}

/// Coverage figures for one territory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerritoryStatistics {
    pub total_streets: i64,
    pub total_properties: i64,
    pub total_service_records: i64,
    pub served_properties: i64,
    /// Percentage of properties with at least one service record.
    pub coverage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Street {
    pub id: Option<i64>,
    pub territory_id: i64,
    pub name: String,
    /// Filled by joined lookups only.
    pub territory_name: Option<String>,
}

impl Street {
    pub fn new(territory_id: i64, name: impl Into<String>) -> Self {
        Self {
            territory_id,
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Validate for Street {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.territory_id, "Territory");
        require_text(&mut errors, &self.name, "Street name");
        errors
    }
}

/// Share of `part` in `whole` as a percentage rounded to two decimals.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
}

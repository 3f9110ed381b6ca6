//! Service records: what happened when a property or unit was visited.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::codes::{Outcome, PropertyKind};
use crate::validate::{require_id, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: Option<i64>,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub date: NaiveDate,
    pub outcome: Option<Outcome>,
    pub notes: Option<String>,
    pub recorded_at: Option<NaiveDateTime>,
    pub property_number: Option<String>,
    pub property_kind: Option<PropertyKind>,
    pub street_name: Option<String>,
    pub territory_name: Option<String>,
    pub unit_label: Option<String>,
}

impl ServiceRecord {
    pub fn new(property_id: i64, date: NaiveDate) -> Self {
        Self {
            id: None,
            property_id,
            unit_id: None,
            date,
            outcome: None,
            notes: None,
            recorded_at: None,
            property_number: None,
            property_kind: None,
            street_name: None,
            territory_name: None,
            unit_label: None,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn for_unit(mut self, unit_id: i64) -> Self {
        self.unit_id = Some(unit_id);
        self
    }
}

impl Validate for ServiceRecord {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.property_id, "Property");
        if matches!(self.unit_id, Some(id) if id <= 0) {
            errors.push("Invalid unit".to_string());
        }
        errors
    }
}

/// Service record counts, grouped the way reports show them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatistics {
    pub total: i64,
    /// Keyed by outcome code; records without an outcome are not counted here.
    pub by_outcome: BTreeMap<String, i64>,
    pub by_property_kind: BTreeMap<String, i64>,
    pub by_territory: BTreeMap<String, i64>,
    /// Keyed by `YYYY-MM` of the visit date.
    pub by_month: BTreeMap<String, i64>,
}

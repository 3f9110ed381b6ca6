//! Properties, their units and the history kept for multi-unit ones.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::codes::{AccessType, GateType, PropertyKind};
use crate::validate::{require_id, require_text, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Option<i64>,
    pub street_id: i64,
    /// Street number as written on the facade, e.g. "127-A".
    pub number: String,
    pub kind: PropertyKind,
    pub name: Option<String>,
    pub total_units: Option<i64>,
    pub gate: Option<GateType>,
    pub access: Option<AccessType>,
    pub notes: Option<String>,
    pub street_name: Option<String>,
    pub territory_name: Option<String>,
}

impl Property {
    pub fn new(street_id: i64, number: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            id: None,
            street_id,
            number: number.into(),
            kind,
            name: None,
            total_units: None,
            gate: None,
            access: None,
            notes: None,
            street_name: None,
            territory_name: None,
        }
    }

    /// A building or village-block with a name and unit count.
    pub fn multi_unit(
        street_id: i64,
        number: impl Into<String>,
        kind: PropertyKind,
        name: impl Into<String>,
        total_units: i64,
    ) -> Self {
        let mut property = Self::new(street_id, number, kind);
        property.name = Some(name.into());
        property.total_units = Some(total_units);
        property
    }

    /// Labels of the units generated when this property is first stored.
    ///
    /// Empty unless the kind owns units and the count is positive.
    pub fn initial_unit_labels(&self) -> Vec<String> {
        match self.total_units {
            Some(n) if n > 0 => unit_labels(self.kind, n),
            _ => Vec::new(),
        }
    }
}

impl Validate for Property {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.street_id, "Street");
        require_text(&mut errors, &self.number, "Property number");
        if self.kind.is_multi_unit() && self.total_units.map_or(true, |n| n < 1) {
            errors.push("Total units is required for buildings and village-blocks".to_string());
        }
        errors
    }
}

/// Sequential unit labels for a multi-unit kind: "Apt 01".. or "Casa 01"..
pub fn unit_labels(kind: PropertyKind, count: i64) -> Vec<String> {
    let prefix = match kind {
        PropertyKind::Building => "Apt",
        PropertyKind::VillageBlock => "Casa",
        PropertyKind::Residential | PropertyKind::Commercial => return Vec::new(),
    };
    (1..=count).map(|n| format!("{prefix} {n:02}")).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Option<i64>,
    pub property_id: i64,
    pub label: String,
    pub notes: Option<String>,
}

impl Unit {
    pub fn new(property_id: i64, label: impl Into<String>) -> Self {
        Self {
            property_id,
            label: label.into(),
            ..Default::default()
        }
    }
}

impl Validate for Unit {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.property_id, "Property");
        require_text(&mut errors, &self.label, "Unit label");
        errors
    }
}

/// A dated note on a building or village-block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyHistory {
    pub id: Option<i64>,
    pub property_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub recorded_at: Option<NaiveDateTime>,
}

impl PropertyHistory {
    pub fn new(property_id: i64, date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: None,
            property_id,
            date,
            description: description.into(),
            recorded_at: None,
        }
    }
}

impl Validate for PropertyHistory {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.property_id, "Property");
        require_text(&mut errors, &self.description, "Description");
        errors
    }
}

/// Unit coverage of one multi-unit property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingStatistics {
    pub property_id: i64,
    pub number: String,
    pub name: Option<String>,
    pub kind: PropertyKind,
    pub street_name: String,
    pub territory_name: String,
    pub total_units: i64,
    pub served_units: i64,
    pub coverage: f64,
    pub has_active_assignment: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_labels_are_zero_padded() {
        assert_eq!(
            unit_labels(PropertyKind::Building, 3),
            vec!["Apt 01", "Apt 02", "Apt 03"]
        );
        assert_eq!(unit_labels(PropertyKind::VillageBlock, 12)[11], "Casa 12");
    }

    #[test]
    fn simple_kinds_never_get_units() {
        let mut house = Property::new(1, "123", PropertyKind::Residential);
        house.total_units = Some(4);
        assert!(house.initial_unit_labels().is_empty());
        assert!(unit_labels(PropertyKind::Commercial, 2).is_empty());
    }

    #[test]
    fn multi_unit_requires_unit_count() {
        let mut building = Property::new(1, "127", PropertyKind::Building);
        assert_eq!(
            building.validate(),
            vec!["Total units is required for buildings and village-blocks".to_string()]
        );
        building.total_units = Some(0);
        assert!(!building.is_valid());
        building.total_units = Some(5);
        assert!(building.is_valid());
        assert_eq!(building.initial_unit_labels().len(), 5);
    }

    #[test]
    fn property_requires_street_and_number() {
        let errors = Property::new(0, "", PropertyKind::Commercial).validate();
        assert_eq!(errors, vec!["Street is required", "Property number is required"]);
    }
}

//! Field trips and the assignments that hand territories or buildings to them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::codes::{weekday_name, AssignmentStatus, PropertyKind, WEEKDAY_NAMES};
use crate::validate::{require_id, require_text, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTrip {
    pub id: Option<i64>,
    pub name: String,
    pub date: NaiveDate,
    pub weekday: String,
    pub time: NaiveTime,
    pub leader: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl FieldTrip {
    /// A trip on `date` with the weekday name derived from it.
    pub fn new(name: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            id: None,
            name: name.into(),
            date,
            weekday: weekday_name(date).to_string(),
            time,
            leader: None,
            created_at: None,
        }
    }

    pub fn led_by(mut self, leader: impl Into<String>) -> Self {
        self.leader = Some(leader.into());
        self
    }
}

impl Validate for FieldTrip {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_text(&mut errors, &self.name, "Field trip name");
        if self.weekday.trim().is_empty() {
            errors.push("Weekday is required".to_string());
        } else if !WEEKDAY_NAMES.contains(&self.weekday.as_str()) {
            errors.push(format!("Invalid weekday: {}", self.weekday));
        }
        if self.time.nanosecond() != 0 {
            errors.push("Field trip time must be whole seconds".to_string());
        }
        errors
    }
}

/// A territory handed to a field trip for a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Option<i64>,
    pub territory_id: i64,
    pub field_trip_id: i64,
    pub assigned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub responsible: Option<String>,
    pub status: AssignmentStatus,
    pub territory_name: Option<String>,
    pub field_trip_name: Option<String>,
}

impl Assignment {
    pub fn new(territory_id: i64, field_trip_id: i64, assigned_on: NaiveDate) -> Self {
        Self {
            id: None,
            territory_id,
            field_trip_id,
            assigned_on,
            due_on: None,
            responsible: None,
            status: AssignmentStatus::Active,
            territory_name: None,
            field_trip_name: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }

    /// Whether `day` falls inside the assignment window.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.assigned_on <= day && self.due_on.map_or(true, |due| day <= due)
    }
}

impl Validate for Assignment {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.territory_id, "Territory");
        require_id(&mut errors, self.field_trip_id, "Field trip");
        if let Some(due) = self.due_on {
            if due < self.assigned_on {
                errors.push("Return date cannot be before the assignment date".to_string());
            }
        }
        errors
    }
}

/// A single building or village-block handed to a responsible person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingAssignment {
    pub id: Option<i64>,
    pub property_id: i64,
    pub responsible: String,
    pub field_trip_id: Option<i64>,
    pub assigned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub property_number: Option<String>,
    pub property_name: Option<String>,
    pub property_kind: Option<PropertyKind>,
    pub field_trip_name: Option<String>,
    pub street_name: Option<String>,
    pub territory_name: Option<String>,
}

impl BuildingAssignment {
    pub fn new(property_id: i64, responsible: impl Into<String>, assigned_on: NaiveDate) -> Self {
        Self {
            id: None,
            property_id,
            responsible: responsible.into(),
            field_trip_id: None,
            assigned_on,
            due_on: None,
            status: AssignmentStatus::Active,
            property_number: None,
            property_name: None,
            property_kind: None,
            field_trip_name: None,
            street_name: None,
            territory_name: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }
}

impl Validate for BuildingAssignment {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.property_id, "Property");
        require_text(&mut errors, &self.responsible, "Responsible person");
        if let Some(due) = self.due_on {
            if due < self.assigned_on {
                errors.push("Return date cannot be before the assignment date".to_string());
            }
        }
        errors
    }
}

/// Counts over assignments, grouped the way reports show them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStatistics {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub by_territory: BTreeMap<String, i64>,
    /// Keyed by `YYYY-MM` of the assignment date.
    pub by_month: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn field_trip_derives_weekday() {
        let trip = FieldTrip::new("Saída 1", day(4), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(trip.weekday, "Terça-feira");
        assert!(trip.is_valid());
    }

    #[test]
    fn field_trip_rejects_unknown_weekday() {
        let mut trip = FieldTrip::new("Saída", day(4), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        trip.weekday = "Tuesday".to_string();
        assert_eq!(trip.validate(), vec!["Invalid weekday: Tuesday"]);
        trip.weekday.clear();
        assert_eq!(trip.validate(), vec!["Weekday is required"]);
    }

    #[test]
    fn field_trip_rejects_fractional_seconds() {
        let time = NaiveTime::from_hms_milli_opt(9, 30, 15, 250).unwrap();
        let trip = FieldTrip::new("Saída", day(4), time);
        assert_eq!(trip.validate(), vec!["Field trip time must be whole seconds"]);
    }

    #[test]
    fn assignment_window() {
        let mut a = Assignment::new(1, 1, day(3));
        assert!(a.covers(day(20)));
        a.due_on = Some(day(10));
        assert!(a.covers(day(10)));
        assert!(!a.covers(day(11)));
        assert!(!a.covers(day(2)));
    }

    #[test]
    fn assignment_requires_references() {
        let errors = Assignment::new(0, 0, day(3)).validate();
        assert_eq!(errors, vec!["Territory is required", "Field trip is required"]);
    }

    #[test]
    fn building_assignment_requires_responsible() {
        let a = BuildingAssignment::new(7, "", day(3));
        assert_eq!(a.validate(), vec!["Responsible person is required"]);
        assert!(a.is_active());
    }
}

//! Domain model for territory canvassing: territories, properties, field
//! trips, assignments, service records and the people who manage them.
//!
//! Types here carry no storage concerns. Each entity validates itself through
//! [`Validate`] and every closed value set has a stable stored code.

pub mod area;
pub mod codes;
pub mod people;
pub mod property;
pub mod report;
pub mod schedule;
pub mod service;
pub mod validate;

pub use area::{percentage, Street, Territory, TerritoryStatistics};
pub use codes::{
    weekday_name, AccessType, ActivityKind, AssignmentStatus, GateType, NotificationKind,
    NotificationStatus, Outcome, ParseCodeError, PermissionLevel, PropertyKind, ReportKind,
    WEEKDAY_NAMES,
};
pub use people::{ActivityLog, Notification, User};
pub use property::{unit_labels, BuildingStatistics, Property, PropertyHistory, Unit};
pub use report::SavedReport;
pub use schedule::{Assignment, AssignmentStatistics, BuildingAssignment, FieldTrip};
pub use service::{ServiceRecord, ServiceStatistics};
pub use validate::Validate;

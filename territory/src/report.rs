//! Saved report definitions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::codes::ReportKind;
use crate::validate::{require_text, Validate};

/// A report a user configured once and can run again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: Option<i64>,
    pub name: String,
    pub kind: ReportKind,
    /// Free-form filter document, stored as JSON text.
    pub filters: serde_json::Value,
    pub user_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub last_run: Option<NaiveDateTime>,
}

impl SavedReport {
    pub fn new(name: impl Into<String>, kind: ReportKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            filters: serde_json::Value::Object(Default::default()),
            user_id: None,
            created_at: None,
            last_run: None,
        }
    }
}

impl Validate for SavedReport {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_text(&mut errors, &self.name, "Report name");
        if !self.filters.is_object() {
            errors.push("Report filters must be a JSON object".to_string());
        }
        errors
    }
}

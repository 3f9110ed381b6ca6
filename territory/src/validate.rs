/// Required-field and domain checks run before any record is stored.
///
/// Returns every problem found, as human-readable messages. An empty list
/// means the record may be written.
pub trait Validate {
    fn validate(&self) -> Vec<String>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

pub(crate) fn require_text(errors: &mut Vec<String>, value: &str, field: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

pub(crate) fn require_id(errors: &mut Vec<String>, value: i64, field: &str) {
    if value <= 0 {
        errors.push(format!("{field} is required"));
    }
}

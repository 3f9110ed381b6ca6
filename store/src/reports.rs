//! Report assembly from the repositories' statistics queries.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use territory::{
    Assignment, BuildingAssignment, Property, ReportKind, SavedReport, ServiceRecord, Territory,
};

use crate::error::{StoreError, StoreResult};
use crate::persistence::sqlite::helpers::now;
use crate::persistence::{Database, Record};

/// One titled table inside a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportSection {
    fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn counts(title: &str, label: &str, value: &str, counts: &BTreeMap<String, i64>) -> Self {
        let mut section = Self::new(title, &[label, value]);
        for (key, total) in counts {
            section.push(vec![key.clone(), total.to_string()]);
        }
        section
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub title: String,
    pub generated_at: NaiveDateTime,
    /// Summary figures in display order.
    pub totals: Vec<(String, String)>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    fn new(kind: ReportKind, title: &str, generated_at: NaiveDateTime) -> Self {
        Self {
            kind,
            title: title.to_string(),
            generated_at,
            totals: Vec::new(),
            sections: Vec::new(),
        }
    }

    fn total(&mut self, label: &str, value: impl ToString) {
        self.totals.push((label.to_string(), value.to_string()));
    }

    /// The summary value for `label`, if present.
    pub fn total_for(&self, label: &str) -> Option<&str> {
        self.totals
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

pub struct ReportBuilder {
    db: Database,
}

impl ReportBuilder {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn build(&self, kind: ReportKind) -> StoreResult<Report> {
        self.build_at(kind, now()).await
    }

    /// Build a report as of `at`. Month-scoped figures use `at`'s month.
    pub async fn build_at(&self, kind: ReportKind, at: NaiveDateTime) -> StoreResult<Report> {
        let report = match kind {
            ReportKind::ServiceRecords => self.service_records(at).await?,
            ReportKind::Territories => self.territories(at).await?,
            ReportKind::Assignments => self.assignments(at).await?,
            ReportKind::Buildings => self.buildings(at).await?,
        };
        tracing::debug!(kind = %kind, sections = report.sections.len(), "report built");
        Ok(report)
    }

    /// Build a saved report and stamp its last run.
    ///
    /// Only the kind and name are used. [`SavedReport::filters`] is stored
    /// for the UI that edits the definition and is not applied here; the
    /// figures are the same as [`ReportBuilder::build`] for that kind.
    pub async fn run_saved(&self, report_id: i64) -> StoreResult<Report> {
        let reports = self.db.table::<SavedReport>();
        let saved = reports
            .get_by_id(report_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: SavedReport::ENTITY,
                id: report_id,
            })?;
        let mut report = self.build(saved.kind).await?;
        report.title = saved.name;
        reports.mark_run(report_id).await?;
        Ok(report)
    }

    async fn service_records(&self, at: NaiveDateTime) -> StoreResult<Report> {
        let stats = self.db.table::<ServiceRecord>().statistics().await?;
        let mut report = Report::new(ReportKind::ServiceRecords, "Service records report", at);
        report.total("Total service records", stats.total);
        for (outcome, count) in &stats.by_outcome {
            report.total(&format!("Outcome: {outcome}"), count);
        }

        report.sections = vec![
            ReportSection::counts("Service records by outcome", "Outcome", "Total", &stats.by_outcome),
            ReportSection::counts(
                "Service records by property kind",
                "Property kind",
                "Total",
                &stats.by_property_kind,
            ),
            ReportSection::counts(
                "Service records by territory",
                "Territory",
                "Total",
                &stats.by_territory,
            ),
            ReportSection::counts("Service records by month", "Month", "Total", &stats.by_month),
        ];
        Ok(report)
    }

    async fn territories(&self, at: NaiveDateTime) -> StoreResult<Report> {
        let month = at.format("%Y-%m").to_string();
        let rows = self.db.table::<Territory>().report_rows(&month).await?;

        let mut report = Report::new(ReportKind::Territories, "Territories report", at);
        let properties: i64 = rows.iter().map(|r| r.statistics.total_properties).sum();
        let records: i64 = rows.iter().map(|r| r.statistics.total_service_records).sum();
        let this_month: i64 = rows.iter().map(|r| r.records_this_month).sum();
        report.total("Total territories", rows.len());
        report.total("Total properties", properties);
        report.total("Total service records", records);
        report.total("Service records this month", this_month);

        let mut details = ReportSection::new(
            "Territory details",
            &[
                "Territory",
                "Streets",
                "Properties",
                "Service records",
                "This month",
                "Coverage (%)",
                "Last visit",
            ],
        );
        for row in &rows {
            details.push(vec![
                row.territory.name.clone(),
                row.statistics.total_streets.to_string(),
                row.statistics.total_properties.to_string(),
                row.statistics.total_service_records.to_string(),
                row.records_this_month.to_string(),
                format!("{:.2}", row.statistics.coverage),
                row.territory
                    .last_visit
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "Not set".to_string()),
            ]);
        }
        report.sections.push(details);
        Ok(report)
    }

    async fn assignments(&self, at: NaiveDateTime) -> StoreResult<Report> {
        let stats = self.db.table::<Assignment>().statistics().await?;
        let buildings = self.db.table::<BuildingAssignment>().statistics().await?;

        let mut report = Report::new(ReportKind::Assignments, "Assignments report", at);
        report.total("Total assignments", stats.total);
        report.total("Active", stats.active);
        report.total("Completed", stats.completed);
        report.total("Active building assignments", buildings.active);

        let mut by_status = ReportSection::new("Assignments by status", &["Status", "Total"]);
        by_status.push(vec!["Active".to_string(), stats.active.to_string()]);
        by_status.push(vec!["Completed".to_string(), stats.completed.to_string()]);
        report.sections = vec![
            by_status,
            ReportSection::counts(
                "Assignments by territory",
                "Territory",
                "Total",
                &stats.by_territory,
            ),
            ReportSection::counts("Assignments by month", "Month", "Total", &stats.by_month),
        ];
        Ok(report)
    }

    async fn buildings(&self, at: NaiveDateTime) -> StoreResult<Report> {
        let stats = self.db.table::<Property>().building_statistics().await?;

        let mut report = Report::new(ReportKind::Buildings, "Buildings and village-blocks report", at);
        let units: i64 = stats.iter().map(|s| s.total_units).sum();
        let served: i64 = stats.iter().map(|s| s.served_units).sum();
        report.total("Total buildings and village-blocks", stats.len());
        report.total("Total units", units);
        report.total("Units served", served);
        report.total(
            "Overall coverage (%)",
            format!("{:.2}", territory::percentage(served, units)),
        );

        let mut details = ReportSection::new(
            "Building and village-block details",
            &[
                "Name",
                "Kind",
                "Address",
                "Territory",
                "Units",
                "Units served",
                "Coverage (%)",
                "Active assignment",
            ],
        );
        for s in &stats {
            details.push(vec![
                s.name.clone().unwrap_or_else(|| format!("No. {}", s.number)),
                s.kind.as_str().to_string(),
                format!("{}, {}", s.street_name, s.number),
                s.territory_name.clone(),
                s.total_units.to_string(),
                s.served_units.to_string(),
                format!("{:.2}", s.coverage),
                if s.has_active_assignment { "Yes" } else { "No" }.to_string(),
            ]);
        }
        report.sections.push(details);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use territory::Outcome;

    async fn seeded() -> Database {
        let db = Database::new_in_memory().await.unwrap();
        db.setup().await.unwrap();
        db
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[tokio::test]
    async fn test_service_records_report() {
        let db = seeded().await;
        let properties = db.table::<Property>().get_all(&Default::default()).await.unwrap();
        let house = properties.iter().find(|p| p.number == "123").unwrap();
        let records = db.table::<ServiceRecord>();
        for outcome in [Outcome::Positive, Outcome::Positive, Outcome::Declined] {
            let mut record = ServiceRecord::new(house.id.unwrap(), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
                .with_outcome(outcome);
            records.save(&mut record).await.unwrap();
        }

        let report = ReportBuilder::new(&db)
            .build_at(ReportKind::ServiceRecords, at("2024-05-31 10:00:00"))
            .await
            .unwrap();
        assert_eq!(report.total_for("Total service records"), Some("3"));
        assert_eq!(report.total_for("Outcome: positivo"), Some("2"));
        assert_eq!(report.sections.len(), 4);
        assert_eq!(report.sections[3].rows, vec![vec!["2024-05".to_string(), "3".to_string()]]);
    }

    #[tokio::test]
    async fn test_territories_report_counts_this_month() {
        let db = seeded().await;
        let properties = db.table::<Property>().get_all(&Default::default()).await.unwrap();
        let records = db.table::<ServiceRecord>();
        let mut may = ServiceRecord::new(properties[0].id.unwrap(), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        records.save(&mut may).await.unwrap();
        let mut april = ServiceRecord::new(properties[1].id.unwrap(), NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        records.save(&mut april).await.unwrap();

        let report = ReportBuilder::new(&db)
            .build_at(ReportKind::Territories, at("2024-05-31 10:00:00"))
            .await
            .unwrap();
        assert_eq!(report.total_for("Total territories"), Some("1"));
        assert_eq!(report.total_for("Total properties"), Some("4"));
        assert_eq!(report.total_for("Service records this month"), Some("1"));
        let row = &report.sections[0].rows[0];
        assert_eq!(row[0], "Território 1");
        assert_eq!(row[5], "50.00");
        assert_eq!(row[6], "Not set");
    }

    #[tokio::test]
    async fn test_buildings_report() {
        let db = seeded().await;
        let report = ReportBuilder::new(&db)
            .build(ReportKind::Buildings)
            .await
            .unwrap();
        assert_eq!(report.total_for("Total buildings and village-blocks"), Some("2"));
        assert_eq!(report.total_for("Total units"), Some("20"));
        assert_eq!(report.total_for("Overall coverage (%)"), Some("0.00"));
        assert_eq!(report.sections[0].rows.len(), 2);
    }

    #[tokio::test]
    async fn test_run_saved_report_stamps_last_run() {
        let db = seeded().await;
        let mut saved = SavedReport::new("Monthly assignments", ReportKind::Assignments);
        let id = db.table::<SavedReport>().save(&mut saved).await.unwrap();

        let report = ReportBuilder::new(&db).run_saved(id).await.unwrap();
        assert_eq!(report.title, "Monthly assignments");
        assert_eq!(report.total_for("Total assignments"), Some("0"));

        let stored = db.table::<SavedReport>().get_by_id(id).await.unwrap().unwrap();
        assert!(stored.last_run.is_some());

        let missing = ReportBuilder::new(&db).run_saved(id + 100).await.unwrap_err();
        assert!(matches!(missing, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_saved_filters_are_kept_but_not_applied() {
        let db = seeded().await;
        let filters = serde_json::json!({ "territory": "Centro", "month": "2024-06" });
        let mut saved = SavedReport::new("Centro em junho", ReportKind::ServiceRecords);
        saved.filters = filters.clone();
        let id = db.table::<SavedReport>().save(&mut saved).await.unwrap();

        let builder = ReportBuilder::new(&db);
        let report = builder.run_saved(id).await.unwrap();
        let plain = builder.build(ReportKind::ServiceRecords).await.unwrap();
        assert_eq!(report.totals, plain.totals);
        assert_eq!(report.sections, plain.sections);

        let stored = db.table::<SavedReport>().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.filters, filters);
    }
}

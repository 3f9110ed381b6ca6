//! CSV export of row sets and built reports.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::error::StoreResult;
use crate::reports::Report;

/// Write `rows` as UTF-8 CSV with `headers` as the first line.
///
/// Cells are taken from each row by header name; missing keys are written
/// empty and keys not in `headers` are ignored.
pub fn write_csv(
    path: &Path,
    headers: &[&str],
    rows: &[BTreeMap<String, String>],
) -> StoreResult<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| row.get(*h).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "CSV exported");
    Ok(())
}

/// Write a report: title, generation time, summary totals, then each
/// section as a titled table. Blocks are separated by blank lines.
pub fn write_report_csv(report: &Report, path: &Path) -> StoreResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(create(path)?);

    writer.write_record([report.title.as_str()])?;
    writer.write_record([format!(
        "Generated at: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    )])?;
    writer.write_record([""])?;

    writer.write_record(["Summary"])?;
    for (label, value) in &report.totals {
        writer.write_record([label, value])?;
    }

    for section in &report.sections {
        writer.write_record([""])?;
        writer.write_record([section.title.as_str()])?;
        writer.write_record(&section.headers)?;
        for row in &section.rows {
            writer.write_record(row)?;
        }
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), kind = %report.kind, "report exported");
    Ok(())
}

fn create(path: &Path) -> StoreResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ReportSection;
    use chrono::NaiveDate;
    use territory::ReportKind;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_write_csv_uses_header_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("rows.csv");
        let rows = vec![
            row(&[("nome", "Rua das Flores"), ("numero", "12")]),
            row(&[("numero", "7, fundos"), ("extra", "ignored")]),
        ];
        write_csv(&path, &["numero", "nome"], &rows).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "numero,nome\n12,Rua das Flores\n\"7, fundos\",\n");
    }

    #[test]
    fn test_write_report_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let report = Report {
            kind: ReportKind::Assignments,
            title: "Assignments report".to_string(),
            generated_at: NaiveDate::from_ymd_opt(2024, 5, 31)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            totals: vec![("Active".to_string(), "2".to_string())],
            sections: vec![ReportSection {
                title: "Assignments by month".to_string(),
                headers: vec!["Month".to_string(), "Total".to_string()],
                rows: vec![vec!["2024-05".to_string(), "2".to_string()]],
            }],
        };
        write_report_csv(&report, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        // A lone empty field is written quoted.
        let lines: Vec<&str> = written.lines().map(|l| l.trim_matches('"')).collect();
        assert_eq!(
            lines,
            vec![
                "Assignments report",
                "Generated at: 2024-05-31 10:00:00",
                "",
                "Summary",
                "Active,2",
                "",
                "Assignments by month",
                "Month,Total",
                "2024-05,2",
            ]
        );
    }
}

use crate::report::ReadReport;
use crate::types::SeriesSet;
use std::fmt;

/// Text report of one read: series, their filter outcomes, skipped files
pub struct TextReport<'a> {
    report: &'a ReadReport,
    series_set: &'a SeriesSet,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a ReadReport, series_set: &'a SeriesSet) -> Self {
        Self { report, series_set }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series Read Report")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "DICOMDIR:       {}", self.report.dicomdir)?;
        if let Some(reason) = &self.report.dicomdir_fallback {
            writeln!(f, "  Fallback:     {}", reason)?;
        }
        writeln!(f, "Files scanned:  {}", self.report.files_scanned)?;
        writeln!(
            f,
            "Series:         {} read, {} in output",
            self.report.series.len(),
            self.report.output_count()
        )?;
        writeln!(f)?;

        for (uid, entry) in &self.report.series {
            writeln!(f, "{}", uid)?;
            writeln!(
                f,
                "  Modality: {}",
                if entry.modality.is_empty() { "unknown" } else { &entry.modality }
            )?;
            writeln!(f, "  Instances: {}", entry.instances)?;
            if let Some(series) = self.series_set.get(uid) {
                if let Some(image) = series.as_image() {
                    let (slices, rows, columns) = image.dim();
                    writeln!(
                        f,
                        "  Volume: {}x{}x{} (spacing {:.3} x {:.3} x {:.3})",
                        slices,
                        rows,
                        columns,
                        image.spacing[0],
                        image.spacing[1],
                        image.spacing[2]
                    )?;
                }
                if let Some(model) = series.as_model() {
                    writeln!(f, "  Surfaces: {}", model.reconstructions.len())?;
                }
            }
            for (filter, outcome) in &entry.filters {
                writeln!(f, "  {}: {}", filter, outcome)?;
            }
            writeln!(f, "  Status: {}", entry.status)?;
            writeln!(f)?;
        }

        if !self.report.file_issues.is_empty() {
            writeln!(f, "Skipped Files")?;
            writeln!(f, "-------------")?;
            for issue in &self.report.file_issues {
                writeln!(f, "{} [{}] {}", issue.path.display(), issue.kind, issue.message)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FileIssue, FilterOutcome, IssueKind, SeriesStatus};
    use crate::testing::generic_series;

    #[test]
    fn test_text_report_format() {
        let mut report = ReadReport::new();
        report.files_scanned = 3;
        report.series_entry("1.2.3").modality = "CT".into();
        report.series_entry("1.2.3").instances = 2;
        report.record_filter("1.2.3", "instance-number-sorter", FilterOutcome::Applied);
        report.set_status("1.2.3", SeriesStatus::Generic);
        report.add_file_issue(FileIssue::new(
            "/data/junk.dcm",
            IssueKind::FileUnreadable,
            "not DICOM",
        ));

        let mut series_set = SeriesSet::new();
        series_set.merge(generic_series("1.2.3", 2));
        let output = TextReport::new(&report, &series_set).to_string();

        assert!(output.contains("Series Read Report"));
        assert!(output.contains("Files scanned:  3"));
        assert!(output.contains("Series:         1 read, 1 in output"));
        assert!(output.contains("  Modality: CT"));
        assert!(output.contains("  instance-number-sorter: applied"));
        assert!(output.contains("  Status: generic"));
        assert!(output.contains("/data/junk.dcm [FileUnreadable] not DICOM"));
    }
}

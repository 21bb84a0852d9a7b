use serde::{Deserialize, Serialize};

/// Number of error samples kept in a migration report.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// A failed record in a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationErrorEntry {
    pub file: String,
    pub error: String,
}

/// Per-record result of a migration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Migrated,
    SkippedNoUrlOrCloud,
    SkippedNotLocalUrl,
    SkippedFileNotFound,
    SkippedOther,
    Failed(MigrationErrorEntry),
}

/// Summary of a bulk migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub total: usize,
    pub skipped: usize,
    pub skipped_no_url_or_cloud: usize,
    pub skipped_not_local_url: usize,
    pub skipped_file_not_found: usize,
    pub skipped_other: usize,
    pub errors: Vec<MigrationErrorEntry>,
}

impl MigrationReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: MigrationOutcome) {
        match outcome {
            MigrationOutcome::Migrated => self.migrated += 1,
            MigrationOutcome::SkippedNoUrlOrCloud => self.skipped_no_url_or_cloud += 1,
            MigrationOutcome::SkippedNotLocalUrl => self.skipped_not_local_url += 1,
            MigrationOutcome::SkippedFileNotFound => self.skipped_file_not_found += 1,
            MigrationOutcome::SkippedOther => self.skipped_other += 1,
            MigrationOutcome::Failed(entry) => {
                self.skipped_other += 1;
                if self.errors.len() < MAX_REPORTED_ERRORS {
                    self.errors.push(entry);
                }
            }
        }
        self.skipped = self.skipped_no_url_or_cloud
            + self.skipped_not_local_url
            + self.skipped_file_not_found
            + self.skipped_other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_is_sum_of_categories() {
        let mut report = MigrationReport::new(5);
        report.record(MigrationOutcome::Migrated);
        report.record(MigrationOutcome::SkippedNoUrlOrCloud);
        report.record(MigrationOutcome::SkippedNotLocalUrl);
        report.record(MigrationOutcome::SkippedFileNotFound);
        report.record(MigrationOutcome::SkippedOther);

        assert_eq!(report.migrated, 1);
        assert_eq!(report.skipped, 4);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_error_samples_are_capped() {
        let mut report = MigrationReport::new(25);
        for i in 0..25 {
            report.record(MigrationOutcome::Failed(MigrationErrorEntry {
                file: format!("f-{i}"),
                error: "boom".to_string(),
            }));
        }

        assert_eq!(report.skipped_other, 25);
        assert_eq!(report.skipped, 25);
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(report.errors[0].file, "f-0");
    }

    #[test]
    fn test_report_json_shape() {
        let json = serde_json::to_value(MigrationReport::new(0)).unwrap();
        for field in [
            "migrated",
            "total",
            "skipped",
            "skipped_no_url_or_cloud",
            "skipped_not_local_url",
            "skipped_file_not_found",
            "skipped_other",
            "errors",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}

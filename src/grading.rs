//! Band resolution: marks → percentage → letter grade.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::GradeBand;
use crate::storage::Repository;

/// Default bands written by `gradebook init`.
pub const DEFAULT_BANDS: [(&str, f64, f64); 5] = [
    ("A", 70.0, 100.0),
    ("B", 60.0, 69.0),
    ("C", 50.0, 59.0),
    ("D", 40.0, 49.0),
    ("F", 0.0, 39.0),
];

/// An ordered band table. The first band containing a percentage wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandTable {
    bands: Vec<GradeBand>,
}

impl BandTable {
    #[must_use]
    pub const fn new(bands: Vec<GradeBand>) -> Self {
        Self { bands }
    }

    /// Load from the primary band file, or the legacy one when only it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the band file exists and cannot be read.
    pub fn load(repo: &Repository) -> Result<Self> {
        Ok(Self::new(repo.list_bands()?))
    }

    #[must_use]
    pub fn defaults() -> Self {
        Self::new(
            DEFAULT_BANDS
                .iter()
                .map(|&(label, min, max)| GradeBand {
                    label: label.to_string(),
                    min_percent: min,
                    max_percent: max,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// `marks / total * 100` clamped to `[0, 100]`; `None` when `total <= 0`.
    #[must_use]
    pub fn percent(marks: f64, total: f64) -> Option<f64> {
        if total <= 0.0 || !total.is_finite() || !marks.is_finite() {
            return None;
        }
        Some((marks / total * 100.0).clamp(0.0, 100.0))
    }

    #[must_use]
    pub fn resolve(&self, marks: f64, total: f64) -> Option<&GradeBand> {
        let percent = Self::percent(marks, total)?;
        let band = self.bands.iter().find(|b| b.contains(percent));
        if band.is_none() {
            debug!(percent, "No band covers percentage");
        }
        band
    }

    /// Band label, or empty for "no grade".
    #[must_use]
    pub fn label_for(&self, marks: f64, total: f64) -> String {
        self.resolve(marks, total)
            .map(|b| b.label.clone())
            .unwrap_or_default()
    }
}

/// Letter for `marks` on an assessment, against its max marks.
///
/// An assessment without max marks yields an empty label.
///
/// # Errors
///
/// Returns `Error::AssessmentNotFound` if no assessment has the id.
pub fn letter_for(repo: &Repository, assessment_id: &str, marks: f64) -> Result<String> {
    let assessment = repo
        .find_assessment(assessment_id)?
        .ok_or_else(|| Error::AssessmentNotFound {
            id: assessment_id.to_string(),
        })?;
    let total = assessment.max_marks.unwrap_or(0.0);
    Ok(BandTable::load(repo)?.label_for(marks, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::model::Assessment;
    use crate::storage::Table;
    use std::fs;
    use tempfile::TempDir;

    fn two_bands() -> BandTable {
        BandTable::new(vec![
            GradeBand {
                label: "A".into(),
                min_percent: 70.0,
                max_percent: 100.0,
            },
            GradeBand {
                label: "B".into(),
                min_percent: 60.0,
                max_percent: 69.0,
            },
        ])
    }

    #[test]
    fn test_resolve_basic() {
        let table = two_bands();
        assert_eq!(table.label_for(85.0, 100.0), "A");
        assert_eq!(table.label_for(69.5, 100.0), "B");
        assert_eq!(table.label_for(50.0, 100.0), "");
    }

    #[test]
    fn test_zero_total_is_no_grade() {
        assert_eq!(two_bands().label_for(10.0, 0.0), "");
        assert_eq!(two_bands().label_for(10.0, -4.0), "");
    }

    #[test]
    fn test_clamps_into_range() {
        let table = BandTable::defaults();
        assert_eq!(table.label_for(-5.0, 100.0), "F");
        assert_eq!(table.label_for(130.0, 100.0), "A");
    }

    #[test]
    fn test_first_band_in_file_order_wins() {
        let table = BandTable::new(vec![
            GradeBand {
                label: "Pass".into(),
                min_percent: 40.0,
                max_percent: 100.0,
            },
            GradeBand {
                label: "A".into(),
                min_percent: 70.0,
                max_percent: 100.0,
            },
        ]);
        assert_eq!(table.label_for(90.0, 100.0), "Pass");
    }

    #[test]
    fn test_letter_for_uses_assessment_max_marks() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(StoreConfig::new(temp_dir.path()));
        fs::write(temp_dir.path().join("grading_system.txt"), "A|70|100\nB|60|69\n").unwrap();
        repo.save_assessment(&Assessment {
            assessment_id: "A1".into(),
            module_id: "M001".into(),
            title: "Quiz".into(),
            kind: "QUIZ".into(),
            max_marks: Some(20.0),
            weight: Some(10.0),
            date: String::new(),
        })
        .unwrap();

        assert_eq!(letter_for(&repo, "A1", 15.0).unwrap(), "A");
        assert_eq!(letter_for(&repo, "A1", 12.5).unwrap(), "B");
        assert!(matches!(
            letter_for(&repo, "A9", 1.0),
            Err(Error::AssessmentNotFound { .. })
        ));
        assert!(!repo.path(Table::GradeBands).exists());
    }
}

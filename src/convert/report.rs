//! Conversion report: what was written, copied and dropped.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use serde::Serialize;

/// Why an annotation produced no label line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `image_id` has no matching image record.
    MissingImage,
    /// `category_id` is not in the category map.
    UnmappedCategory,
    /// Image width or height is zero and could not be read from the file.
    InvalidImageSize,
    /// Image file name is empty, absolute, or escapes the image directory.
    InvalidFileName,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingImage => "missing image",
            SkipReason::UnmappedCategory => "unmapped category",
            SkipReason::InvalidImageSize => "invalid image size",
            SkipReason::InvalidFileName => "invalid file name",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts read from the annotation document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InputCounts {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
}

/// Summary of a single conversion run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Annotation document the run read from (empty for in-memory datasets).
    pub source: String,
    /// Output root the run wrote into.
    pub output: String,
    pub input: InputCounts,
    /// Label lines appended.
    pub labels_written: usize,
    /// Distinct label files touched.
    pub label_files: usize,
    pub images_copied: usize,
    /// Referenced images whose source file does not exist.
    pub copy_source_missing: usize,
    /// Referenced images already present in the output.
    pub copy_destination_exists: usize,
    /// Label files found in the output before the run started.
    pub preexisting_label_files: usize,
    /// Dropped annotations by reason.
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl ConversionReport {
    pub fn new(source: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Logs the summary through the `log` facade.
    pub fn log_summary(&self) {
        info!("=== Conversion Summary ({}) ===", self.output);
        info!(
            "Input: {} images, {} categories, {} annotations",
            self.input.images, self.input.categories, self.input.annotations
        );
        info!(
            "Wrote {} label line(s) into {} label file(s)",
            self.labels_written, self.label_files
        );
        info!(
            "Copied {} image(s) ({} already present, {} missing at source)",
            self.images_copied, self.copy_destination_exists, self.copy_source_missing
        );

        let skipped = self.skipped_total();
        if skipped > 0 {
            let breakdown: Vec<String> = self
                .skipped
                .iter()
                .map(|(reason, count)| format!("{reason}: {count}"))
                .collect();
            warn!(
                "Dropped {} annotation(s) ({})",
                skipped,
                breakdown.join(", ")
            );
        }
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source.is_empty() {
            writeln!(f, "{} -> {}", self.source, self.output)?;
        } else {
            writeln!(f, "-> {}", self.output)?;
        }
        writeln!(
            f,
            "  input: {} images, {} categories, {} annotations",
            self.input.images, self.input.categories, self.input.annotations
        )?;
        writeln!(
            f,
            "  labels: {} line(s) in {} file(s)",
            self.labels_written, self.label_files
        )?;
        writeln!(
            f,
            "  images: {} copied, {} already present, {} missing at source",
            self.images_copied, self.copy_destination_exists, self.copy_source_missing
        )?;

        if self.preexisting_label_files > 0 {
            writeln!(
                f,
                "  note: {} label file(s) existed before this run; lines were appended",
                self.preexisting_label_files
            )?;
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Dropped ({}):", self.skipped_total())?;
            for (reason, count) in &self.skipped {
                writeln!(f, "  - {reason}: {count}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_are_counted_per_reason() {
        let mut report = ConversionReport::new("a.json", "out");
        report.record_skip(SkipReason::MissingImage);
        report.record_skip(SkipReason::UnmappedCategory);
        report.record_skip(SkipReason::UnmappedCategory);

        assert_eq!(report.skipped_count(SkipReason::MissingImage), 1);
        assert_eq!(report.skipped_count(SkipReason::UnmappedCategory), 2);
        assert_eq!(report.skipped_count(SkipReason::InvalidImageSize), 0);
        assert_eq!(report.skipped_total(), 3);
    }

    #[test]
    fn display_lists_drops() {
        let mut report = ConversionReport::new("a.json", "out");
        report.labels_written = 4;
        report.label_files = 2;
        report.record_skip(SkipReason::UnmappedCategory);

        let text = report.to_string();
        assert!(text.starts_with("a.json -> out\n"));
        assert!(text.contains("labels: 4 line(s) in 2 file(s)"));
        assert!(text.contains("Dropped (1):"));
        assert!(text.contains("- unmapped category: 1"));
    }

    #[test]
    fn clean_report_has_no_drop_section() {
        let report = ConversionReport::new("a.json", "out");
        assert!(!report.to_string().contains("Dropped"));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = ConversionReport::new("a.json", "out");
        report.images_copied = 3;
        report.record_skip(SkipReason::MissingImage);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"source\":\"a.json\""));
        assert!(json.contains("\"images_copied\":3"));
        assert!(json.contains("\"skipped\":{\"missing_image\":1}"));
    }
}

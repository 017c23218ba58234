use std::path::{Path, PathBuf};

use csv::Writer;

use crate::pipeline::task::ConversionOutcome;
use crate::{AudioFile, Result};

/// A single per-file failure, kept for the end-of-run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub file: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failures: Vec<Failure>,
    /// Files never picked up because the run was cancelled.
    pub not_attempted: usize,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize(
        &self,
        total: usize,
        outcomes: impl IntoIterator<Item = (AudioFile, ConversionOutcome)>,
    ) -> RunSummary {
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };
        let mut seen = 0;

        for (file, outcome) in outcomes {
            seen += 1;
            match outcome {
                ConversionOutcome::Converted => summary.converted += 1,
                ConversionOutcome::Skipped => summary.skipped += 1,
                ConversionOutcome::Failed(message) => summary.failures.push(Failure {
                    file: file.path,
                    message,
                }),
            }
        }

        summary.failures.sort_by(|a, b| a.file.cmp(&b.file));
        summary.not_attempted = total.saturating_sub(seen);
        summary
    }

    pub fn print_summary(&self, summary: &RunSummary) {
        if summary.has_failures() {
            println!("\n{} files failed to process", summary.failed());
            for failure in &summary.failures {
                println!("  - {}: {}", failure.file.display(), failure.message);
            }
        }

        println!(
            "\nConverted: {}, Skipped: {}, Failed: {}",
            summary.converted,
            summary.skipped,
            summary.failed()
        );
        if summary.not_attempted > 0 {
            println!("Not attempted (cancelled): {}", summary.not_attempted);
        }

        println!("\n✓ All tasks completed");
    }

    pub fn generate_failure_report(
        &self,
        summary: &RunSummary,
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record(["File", "Error"])?;
        for failure in &summary.failures {
            writer.write_record([failure.file.display().to_string(), failure.message.clone()])?;
        }

        writer.write_record(["", ""])?;
        writer.write_record(["Summary", ""])?;
        let totals = [
            ("Total Files", summary.total),
            ("Converted", summary.converted),
            ("Skipped", summary.skipped),
            ("Failed", summary.failed()),
            ("Not Attempted", summary.not_attempted),
        ];
        for (label, count) in totals {
            writer.write_record([label.to_string(), count.to_string()])?;
        }

        writer.flush()?;
        println!("Report generated: {}", output_path_ref.display());
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

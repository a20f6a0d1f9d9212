//! Run accumulator and end-of-run summary.
//!
//! `RunStats` is a plain value created when the batch loop starts and
//! threaded through it, so there is no process-global run state. Turning it
//! into a `RunSummary` is pure formatting and arithmetic, so a reporting
//! problem can never disturb the counts already accumulated.

use crate::ingest::FileOutcome;
use std::fmt;
use std::time::{Duration, Instant};

/// How many failure records the rendered summary lists before eliding.
const SUMMARY_FAILURE_LINES: usize = 5;

#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub file: String,
    pub reason: String,
}

/// Counters for one ingestion run.
#[derive(Debug)]
pub struct RunStats {
    pub total_seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    failures: Vec<FailureRecord>,
    started: Instant,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            total_seen: 0,
            inserted: 0,
            duplicates: 0,
            failed: 0,
            failures: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Record the terminal outcome for one file.
    pub fn record(&mut self, file: &str, outcome: &FileOutcome) {
        self.total_seen += 1;
        match outcome {
            FileOutcome::Inserted => self.inserted += 1,
            FileOutcome::Duplicate => self.duplicates += 1,
            FileOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    file: file.to_string(),
                    reason: failure.reason(),
                });
            }
        }
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Close out the run, folding in the live collection count when the
    /// cross-check query succeeded.
    pub fn finish(self, collection_total: Option<u64>) -> RunSummary {
        let elapsed = self.started.elapsed();
        RunSummary {
            total_seen: self.total_seen,
            inserted: self.inserted,
            duplicates: self.duplicates,
            failed: self.failed,
            elapsed,
            collection_total,
            failures: self.failures,
        }
    }
}

/// Final, immutable account of a run.
#[derive(Debug)]
pub struct RunSummary {
    pub total_seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub collection_total: Option<u64>,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    /// Successfully processed documents per second of wall-clock time.
    pub fn docs_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.inserted as f64 / seconds
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "INGESTION SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "files seen:        {}", self.total_seen)?;
        writeln!(f, "inserted:          {}", self.inserted)?;
        writeln!(f, "duplicates:        {}", self.duplicates)?;
        writeln!(f, "failed:            {}", self.failed)?;
        writeln!(f, "elapsed:           {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "throughput:        {:.2} docs/s", self.docs_per_second())?;
        match self.collection_total {
            Some(total) => writeln!(f, "collection total:  {total}")?,
            None => writeln!(f, "collection total:  unavailable")?,
        }
        if !self.failures.is_empty() {
            writeln!(f, "{rule}")?;
            writeln!(f, "failures:")?;
            for record in self.failures.iter().take(SUMMARY_FAILURE_LINES) {
                writeln!(f, "  - {}: {}", record.file, record.reason)?;
            }
            let hidden = self.failures.len().saturating_sub(SUMMARY_FAILURE_LINES);
            if hidden > 0 {
                writeln!(f, "  ... and {hidden} more")?;
            }
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FileFailure;

    #[test]
    fn record_routes_outcomes_to_counters() {
        let mut stats = RunStats::start();
        stats.record("a.txt", &FileOutcome::Inserted);
        stats.record("b.txt", &FileOutcome::Inserted);
        stats.record("c.txt", &FileOutcome::Duplicate);
        stats.record("d.txt", &FileOutcome::Failed(FileFailure::EmptyText));

        assert_eq!(stats.total_seen, 4);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.failures().len(), 1);
        assert_eq!(stats.failures()[0].file, "d.txt");
    }

    #[test]
    fn summary_carries_counts_and_collection_total() {
        let mut stats = RunStats::start();
        stats.record("a.txt", &FileOutcome::Inserted);
        let summary = stats.finish(Some(41));

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.collection_total, Some(41));

        let rendered = summary.to_string();
        assert!(rendered.contains("inserted:          1"));
        assert!(rendered.contains("collection total:  41"));
    }

    #[test]
    fn throughput_is_zero_for_zero_elapsed() {
        let summary = RunSummary {
            total_seen: 0,
            inserted: 0,
            duplicates: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            collection_total: None,
            failures: Vec::new(),
        };
        assert_eq!(summary.docs_per_second(), 0.0);
    }

    #[test]
    fn summary_elides_long_failure_lists() {
        let mut stats = RunStats::start();
        for index in 0..8 {
            stats.record(
                &format!("bad_{index}.txt"),
                &FileOutcome::Failed(FileFailure::EmptyText),
            );
        }
        let rendered = stats.finish(None).to_string();
        assert!(rendered.contains("bad_0.txt"));
        assert!(rendered.contains("... and 3 more"));
    }
}

use tokio::time::{Duration, Instant};
use tracing::info;

use super::state::LoopStats;

/// Periodic progress log with per-second rates since the previous report.
///
/// A zero interval disables reporting.
pub(crate) struct ProgressReporter {
    interval: Duration,
    last_report: Instant,
    last_stats: LoopStats,
}

impl ProgressReporter {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: Instant::now(),
            last_stats: LoopStats::default(),
        }
    }

    /// Log progress if the interval has elapsed. Returns whether a line was logged.
    pub(crate) fn maybe_report(&mut self, stats: &LoopStats) -> bool {
        if self.interval.is_zero() {
            return false;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_report);
        if elapsed < self.interval {
            return false;
        }

        let elapsed_secs = elapsed.as_secs_f64();
        let rate = |current: u64, previous: u64| {
            if elapsed_secs > 0.0 {
                (current.saturating_sub(previous) as f64) / elapsed_secs
            } else {
                0.0
            }
        };

        let records_per_sec = rate(stats.records_received, self.last_stats.records_received);
        let documents_per_sec = rate(stats.documents_upserted, self.last_stats.documents_upserted);

        info!(
            batches = stats.batches,
            records_received = stats.records_received,
            documents_upserted = stats.documents_upserted,
            records_skipped = stats.records_skipped,
            upserts_failed = stats.upserts_failed,
            records_per_sec = format!("{:.2}", records_per_sec),
            documents_per_sec = format!("{:.2}", documents_per_sec),
            "Processing progress"
        );

        self.last_report = now;
        self.last_stats = *stats;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reports_after_interval() {
        let mut reporter = ProgressReporter::new(Duration::from_secs(10));
        let stats = LoopStats {
            records_received: 5,
            ..Default::default()
        };

        assert!(!reporter.maybe_report(&stats));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(reporter.maybe_report(&stats));
        assert!(!reporter.maybe_report(&stats));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables_reporting() {
        let mut reporter = ProgressReporter::new(Duration::ZERO);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!reporter.maybe_report(&LoopStats::default()));
    }
}

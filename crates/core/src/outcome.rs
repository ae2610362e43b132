//! Per-archive delivery outcomes and the run summary.

use std::fmt;

/// Terminal state of one located archive. Each archive reaches exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Sent,
    SkippedStale,
    SkippedOversize,
    SkippedAttachError,
    SkippedSendError,
}

impl ArchiveOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::SkippedStale => "skipped_stale",
            Self::SkippedOversize => "skipped_oversize",
            Self::SkippedAttachError => "skipped_attach_error",
            Self::SkippedSendError => "skipped_send_error",
        }
    }
}

impl fmt::Display for ArchiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a single run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Archives found by the locator.
    pub located: usize,
    /// Archives that passed the freshness check and were handed to
    /// delivery, whatever happened next. Reported as the "emails sent"
    /// total.
    pub dispatched: usize,
    pub sent: usize,
    pub skipped_stale: usize,
    pub skipped_oversize: usize,
    pub attach_failed: usize,
    pub send_failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: ArchiveOutcome) {
        if outcome != ArchiveOutcome::SkippedStale {
            self.dispatched += 1;
        }
        match outcome {
            ArchiveOutcome::Sent => self.sent += 1,
            ArchiveOutcome::SkippedStale => self.skipped_stale += 1,
            ArchiveOutcome::SkippedOversize => self.skipped_oversize += 1,
            ArchiveOutcome::SkippedAttachError => self.attach_failed += 1,
            ArchiveOutcome::SkippedSendError => self.send_failed += 1,
        }
    }

    /// Number of archives that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.sent
            + self.skipped_stale
            + self.skipped_oversize
            + self.attach_failed
            + self.send_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_archives_are_not_dispatched() {
        let mut summary = RunSummary::default();
        summary.record(ArchiveOutcome::SkippedStale);
        summary.record(ArchiveOutcome::Sent);

        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.skipped_stale, 1);
        assert_eq!(summary.processed(), 2);
    }

    #[test]
    fn failed_sends_still_count_as_dispatched() {
        let mut summary = RunSummary::default();
        summary.record(ArchiveOutcome::SkippedSendError);
        summary.record(ArchiveOutcome::SkippedOversize);
        summary.record(ArchiveOutcome::SkippedAttachError);

        assert_eq!(summary.dispatched, 3);
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.send_failed, 1);
        assert_eq!(summary.skipped_oversize, 1);
        assert_eq!(summary.attach_failed, 1);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(ArchiveOutcome::SkippedOversize.to_string(), "skipped_oversize");
    }
}

//! The dispatch run.
//!
//! [`Dispatcher::run`] executes the whole workflow once: run the report
//! script, locate today's archives, then for each archive in order check
//! freshness and size, compose the message, transmit it and pause. Only a
//! failed report step (or an unreadable archive directory) ends the run
//! early; every per-archive problem is logged and the next archive is
//! processed.

use std::time::SystemTime;

use chrono::{Local, NaiveDate};

use dispatch_core::archive::{self, ArchiveRef, LocateError};
use dispatch_core::config::{ArchiveSettings, BYTES_PER_MB};
use dispatch_core::{ArchiveOutcome, DispatchConfig, ReportError, ReportScript, RunSummary};
use dispatch_mail::{ComposeError, MailComposer, MailTransport, SendPacer};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failures that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Locate(#[from] LocateError),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher<T, P> {
    report: ReportScript,
    archives: ArchiveSettings,
    composer: MailComposer,
    transport: T,
    pacer: P,
}

impl<T, P> Dispatcher<T, P>
where
    T: MailTransport,
    P: SendPacer,
{
    /// Build a dispatcher from `config`. Fails if a configured address
    /// cannot be parsed.
    pub fn new(config: &DispatchConfig, transport: T, pacer: P) -> Result<Self, ComposeError> {
        Ok(Self {
            report: ReportScript::new(config.report.clone()),
            archives: config.archives.clone(),
            composer: MailComposer::new(&config.mail, &config.archives.extension)?,
            transport,
            pacer,
        })
    }

    /// Run once against the current local date and wall clock.
    pub async fn run(&self) -> Result<RunSummary, DispatchError> {
        self.run_at(Local::now().date_naive(), SystemTime::now()).await
    }

    /// Run once, treating `today` as the archive date and `now` as the
    /// reference point for freshness.
    pub async fn run_at(
        &self,
        today: NaiveDate,
        now: SystemTime,
    ) -> Result<RunSummary, DispatchError> {
        match self.report.run().await {
            Ok(output) => {
                tracing::debug!(
                    duration_ms = output.duration_ms,
                    stdout = %output.stdout.trim(),
                    stderr = %output.stderr.trim(),
                    "Report script output",
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Report generation failed, aborting run");
                return Err(e.into());
            }
        }

        let archives = archive::locate(&self.archives, today)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Archive lookup failed"))?;

        let mut summary = RunSummary {
            located: archives.len(),
            ..RunSummary::default()
        };

        if archives.is_empty() {
            tracing::info!(
                directory = %self.archives.directory.display(),
                date = %today,
                "No ZIP files found for today. Email not sent.",
            );
            return Ok(summary);
        }

        for archive in &archives {
            let outcome = self.process(archive, today, now).await;
            tracing::debug!(file = %archive.file_name, outcome = %outcome, "Archive processed");
            summary.record(outcome);
        }

        tracing::info!(
            total = summary.dispatched,
            processed = summary.processed(),
            delivered = summary.sent,
            stale = summary.skipped_stale,
            oversize = summary.skipped_oversize,
            attach_failed = summary.attach_failed,
            send_failed = summary.send_failed,
            "Total emails sent: {}",
            summary.dispatched
        );

        Ok(summary)
    }

    async fn process(
        &self,
        listed: &ArchiveRef,
        today: NaiveDate,
        now: SystemTime,
    ) -> ArchiveOutcome {
        let archive = match listed.refresh().await {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(
                    file = %listed.path.display(),
                    error = %e,
                    "Archive vanished before sending",
                );
                return ArchiveOutcome::SkippedAttachError;
            }
        };

        if archive.is_stale(now, self.archives.stale_after) {
            tracing::info!(
                file = %archive.path.display(),
                age_secs = archive.age_at(now).as_secs(),
                "Skipping stale file older than {}s",
                self.archives.stale_after.as_secs()
            );
            return ArchiveOutcome::SkippedStale;
        }

        tracing::info!(file = %archive.path.display(), "Sending email");

        let limit_mb = self.archives.max_size_bytes as f64 / BYTES_PER_MB as f64;
        if archive.exceeds_size(self.archives.max_size_bytes) {
            tracing::warn!(
                file = %archive.path.display(),
                "Skipped file (exceeds size limit): {:.2} MB > {:.2} MB limit",
                archive.size_mb(),
                limit_mb
            );
            return ArchiveOutcome::SkippedOversize;
        }
        tracing::info!(
            file = %archive.path.display(),
            "File within size limit ({:.2} MB)",
            archive.size_mb()
        );

        let message = match self.composer.compose(&archive, today).await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(file = %archive.file_name, error = %e, "Error attaching file");
                return ArchiveOutcome::SkippedAttachError;
            }
        };

        let outcome = match self.transport.send(message).await {
            Ok(()) => {
                tracing::info!(
                    file = %archive.file_name,
                    recipients = self.composer.recipient_count(),
                    "Email sent",
                );
                ArchiveOutcome::Sent
            }
            Err(e) if e.is_authentication() => {
                tracing::error!(
                    file = %archive.file_name,
                    error = %e,
                    "SMTP authentication failed",
                );
                ArchiveOutcome::SkippedSendError
            }
            Err(e) => {
                tracing::error!(file = %archive.file_name, error = %e, "Failed to send email");
                ArchiveOutcome::SkippedSendError
            }
        };

        self.pacer.pause().await;
        outcome
    }
}

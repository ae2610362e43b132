//! `report-dispatch` -- daily report archive mailer.
//!
//! Runs the report-generation script, then emails each of today's archive
//! parts to the distribution list. Configuration is read from the
//! environment (a `.env` file is loaded first if present); see
//! [`dispatch_core::config`] for the full variable table.
//!
//! | Variable            | Required | Default         | Description                     |
//! |---------------------|----------|-----------------|---------------------------------|
//! | `DISPATCH_LOG_FILE` | no       | `smtp_mail.log` | Append-only log file            |
//! | `RUST_LOG`          | no       | debug for the dispatch crates | Log filter        |
//!
//! Exits with status 1 when the report step fails or configuration is
//! invalid. Failed individual sends do not change the exit status.

use anyhow::Context;

use dispatch_core::DispatchConfig;
use dispatch_mail::{FixedPause, SmtpMailer};
use dispatch_runner::{logging, Dispatcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_path = logging::log_path_from_env();
    logging::init(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let config = DispatchConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    tracing::info!(
        directory = %config.archives.directory.display(),
        base_name = %config.archives.base_name,
        recipients = config.mail.recipients.len(),
        "Starting report-dispatch",
    );

    let mailer = SmtpMailer::new(config.smtp.clone());
    let pacer = FixedPause::new(config.send_pause);
    let dispatcher = Dispatcher::new(&config, mailer, pacer)
        .inspect_err(|e| tracing::error!(error = %e, "Invalid mail settings"))?;

    dispatcher.run().await?;
    Ok(())
}

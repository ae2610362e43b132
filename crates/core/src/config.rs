//! Dispatcher configuration.
//!
//! [`DispatchConfig`] is built once at startup and handed to each component
//! by reference. Values come from environment variables (optionally seeded
//! from a `.env` file by the binary); [`DispatchConfig::from_lookup`] takes
//! any key lookup so tests can supply values without touching the process
//! environment.
//!
//! | Variable              | Required | Default                         |
//! |-----------------------|----------|---------------------------------|
//! | `REPORT_SCRIPT`       | yes      | --                              |
//! | `REPORT_INTERPRETER`  | no       | `powershell`                    |
//! | `REPORT_ARGS`         | no       | `-ExecutionPolicy Bypass -File` |
//! | `REPORT_TIMEOUT_SECS` | no       | no timeout                      |
//! | `ARCHIVE_DIR`         | yes      | --                              |
//! | `ARCHIVE_BASE_NAME`   | yes      | --                              |
//! | `ARCHIVE_EXTENSION`   | no       | `.7z`                           |
//! | `STALE_AFTER_SECS`    | no       | `3600`                          |
//! | `MAX_ATTACHMENT_MB`   | no       | `10`                            |
//! | `SMTP_HOST`           | yes      | --                              |
//! | `SMTP_PORT`           | no       | `587`                           |
//! | `SMTP_USER`           | yes      | --                              |
//! | `SMTP_PASSWORD`       | yes      | --                              |
//! | `SMTP_FROM`           | yes      | --                              |
//! | `MAIL_RECIPIENTS`     | yes      | -- (comma-separated)            |
//! | `MAIL_SUBJECT_PREFIX` | no       | `Data Dump`                     |
//! | `REPORT_NAME`         | no       | `ARCHIVE_BASE_NAME`             |
//! | `MAIL_CONTACT`        | no       | --                              |
//! | `MAIL_SIGNATURE`      | no       | `Report Dispatch`               |
//! | `SEND_PAUSE_SECS`     | no       | `10`                            |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_INTERPRETER: &str = "powershell";
pub const DEFAULT_INTERPRETER_ARGS: &[&str] = &["-ExecutionPolicy", "Bypass", "-File"];
pub const DEFAULT_ARCHIVE_EXTENSION: &str = ".7z";
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;
pub const DEFAULT_MAX_ATTACHMENT_MB: u64 = 10;
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SUBJECT_PREFIX: &str = "Data Dump";
pub const DEFAULT_SIGNATURE: &str = "Report Dispatch";
pub const DEFAULT_SEND_PAUSE_SECS: u64 = 10;

/// Bytes per megabyte for attachment limits (MiB).
pub const BYTES_PER_MB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Settings groups
// ---------------------------------------------------------------------------

/// How to launch the report-generation script.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Program that executes the script, e.g. `powershell` or `bash`.
    pub interpreter: String,
    /// Arguments placed between the interpreter and the script path.
    pub interpreter_args: Vec<String>,
    pub script_path: PathBuf,
    /// Kill the script after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Where archives live and which ones qualify for sending.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub directory: PathBuf,
    /// File name prefix before the `_YYYY-MM-DD` date stamp.
    pub base_name: String,
    /// Extension including the leading dot, e.g. `.7z`.
    pub extension: String,
    pub stale_after: Duration,
    pub max_size_bytes: u64,
}

/// SMTP submission endpoint and static credentials.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Message addressing and template text.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    /// Ordered distribution list. Never empty.
    pub recipients: Vec<String>,
    pub subject_prefix: String,
    pub report_name: String,
    pub contact: Option<String>,
    pub signature: String,
}

/// Complete dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub report: ReportSettings,
    pub archives: ArchiveSettings,
    pub smtp: SmtpSettings,
    pub mail: MailSettings,
    /// Pause applied after every transmission attempt.
    pub send_pause: Duration,
}

impl DispatchConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. Numeric values that fail to parse
    /// are rejected rather than replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let interpreter_args = match vars.optional("REPORT_ARGS") {
            Some(raw) => raw.split_whitespace().map(str::to_string).collect(),
            None => DEFAULT_INTERPRETER_ARGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let report = ReportSettings {
            interpreter: vars
                .optional("REPORT_INTERPRETER")
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            interpreter_args,
            script_path: PathBuf::from(vars.required("REPORT_SCRIPT")?),
            timeout: vars
                .parsed::<u64>("REPORT_TIMEOUT_SECS")?
                .map(Duration::from_secs),
        };

        let base_name = vars.required("ARCHIVE_BASE_NAME")?;
        let extension = vars
            .optional("ARCHIVE_EXTENSION")
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .unwrap_or_else(|| DEFAULT_ARCHIVE_EXTENSION.to_string());

        let max_mb = vars
            .parsed::<u64>("MAX_ATTACHMENT_MB")?
            .unwrap_or(DEFAULT_MAX_ATTACHMENT_MB);
        let max_size_bytes = max_mb.checked_mul(BYTES_PER_MB).ok_or_else(|| ConfigError::Invalid {
            key: "MAX_ATTACHMENT_MB",
            reason: format!("{max_mb} MB overflows the byte limit"),
        })?;

        let archives = ArchiveSettings {
            directory: PathBuf::from(vars.required("ARCHIVE_DIR")?),
            base_name: base_name.clone(),
            extension,
            stale_after: Duration::from_secs(
                vars.parsed("STALE_AFTER_SECS")?
                    .unwrap_or(DEFAULT_STALE_AFTER_SECS),
            ),
            max_size_bytes,
        };

        let smtp = SmtpSettings {
            host: vars.required("SMTP_HOST")?,
            port: vars.parsed("SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT),
            username: vars.required("SMTP_USER")?,
            password: vars.required("SMTP_PASSWORD")?,
        };

        let recipients = parse_recipients(&vars.required("MAIL_RECIPIENTS")?);
        if recipients.is_empty() {
            return Err(ConfigError::Invalid {
                key: "MAIL_RECIPIENTS",
                reason: "at least one recipient is required".to_string(),
            });
        }

        let mail = MailSettings {
            from: vars.required("SMTP_FROM")?,
            recipients,
            subject_prefix: vars
                .optional("MAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
            report_name: vars.optional("REPORT_NAME").unwrap_or(base_name),
            contact: vars.optional("MAIL_CONTACT"),
            signature: vars
                .optional("MAIL_SIGNATURE")
                .unwrap_or_else(|| DEFAULT_SIGNATURE.to_string()),
        };

        Ok(Self {
            report,
            archives,
            smtp,
            mail,
            send_pause: Duration::from_secs(
                vars.parsed("SEND_PAUSE_SECS")?
                    .unwrap_or(DEFAULT_SEND_PAUSE_SECS),
            ),
        })
    }
}

/// Split a comma-separated recipient list, dropping blank entries.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                    key,
                    reason: format!("{raw:?}: {e}"),
                })
            })
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Message composition.
//!
//! [`MailComposer`] parses the sender and recipient addresses once at
//! construction, then builds one `multipart/mixed` message per archive: a
//! plain-text body followed by the raw archive bytes as an attachment under
//! the archive's own file name.

use chrono::NaiveDate;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;

use dispatch_core::config::MailSettings;
use dispatch_core::naming::{part_label, PartLabel};
use dispatch_core::ArchiveRef;

/// Date format used in the mail body, e.g. `07-Mar-2026`.
const BODY_DATE_FORMAT: &str = "%d-%b-%Y";

/// MIME type used for every archive attachment.
const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A configured sender or recipient address could not be parsed.
    #[error("Invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// The archive could not be read for attaching.
    #[error("Could not attach {file}: {source}")]
    Attachment {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// MailComposer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MailComposer {
    from: Mailbox,
    to: Vec<Mailbox>,
    settings: MailSettings,
    extension: String,
}

impl MailComposer {
    /// Validate addresses and capture the template settings.
    ///
    /// `extension` is the archive extension (e.g. `.7z`) stripped when
    /// deriving part labels and named in the body.
    pub fn new(settings: &MailSettings, extension: &str) -> Result<Self, ComposeError> {
        let from = parse_mailbox(&settings.from)?;
        let to = settings
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            from,
            to,
            settings: settings.clone(),
            extension: extension.to_string(),
        })
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len()
    }

    pub fn subject(&self, label: &PartLabel) -> String {
        format!("{} || File_Number: {label}", self.settings.subject_prefix)
    }

    pub fn body(&self, date: NaiveDate) -> String {
        let name = &self.settings.report_name;
        let mut body = format!(
            "Hi Team,\n\n\
             Please find attached the {name} data dump for today.\n\n\
             Details:\n\
             - Report Name: {name}\n\
             - Date: {date}\n\
             - Format: {ext} (extract with 7-Zip, WinRAR or a compatible tool)\n\n",
            date = date.format(BODY_DATE_FORMAT),
            ext = self.extension,
        );

        if let Some(contact) = &self.settings.contact {
            body.push_str(&format!(
                "If you have any queries or require further assistance, \
                 feel free to reach out to {contact}.\n\n"
            ));
        }

        body.push_str(&format!(
            "Regards,\n{}\n\n\
             -----------------------------\n\
             Note: This is a system-generated email. Please do not reply.",
            self.settings.signature
        ));
        body
    }

    /// Build the message for `archive`, reading its bytes from disk.
    pub async fn compose(
        &self,
        archive: &ArchiveRef,
        date: NaiveDate,
    ) -> Result<Message, ComposeError> {
        let label = part_label(&archive.file_name, &self.extension);

        let bytes = tokio::fs::read(&archive.path)
            .await
            .map_err(|source| ComposeError::Attachment {
                file: archive.file_name.clone(),
                source,
            })?;

        let content_type = ContentType::parse(ATTACHMENT_CONTENT_TYPE)
            .map_err(|e| ComposeError::Build(e.to_string()))?;
        let attachment = Attachment::new(archive.file_name.clone()).body(bytes, content_type);

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject(&label));
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let message = builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.body(date)))
                    .singlepart(attachment),
            )
            .map_err(|e| ComposeError::Build(e.to_string()))?;

        tracing::info!(file = %archive.file_name, part = %label, "Attached file");
        Ok(message)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ComposeError> {
    address.parse().map_err(|source| ComposeError::Address {
        address: address.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

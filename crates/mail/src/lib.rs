//! Mail side of the report dispatcher.
//!
//! - [`MailComposer`] turns an archive into a multipart message with the
//!   archive attached.
//! - [`MailTransport`] is the delivery seam; [`SmtpMailer`] implements it
//!   with one STARTTLS session per message.
//! - [`SendPacer`] is the pause applied after every transmission attempt.

pub mod composer;
pub mod pacer;
pub mod transport;

pub use composer::{ComposeError, MailComposer};
pub use pacer::{FixedPause, SendPacer};
pub use transport::{MailTransport, SmtpMailer, TransmitError};

/// Re-exported so callers can name composed messages without a direct
/// `lettre` dependency.
pub use lettre::Message;

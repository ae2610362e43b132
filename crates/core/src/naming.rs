//! Archive naming conventions.
//!
//! Daily archives are named `{base}_{YYYY-MM-DD}{anything}Part{N}{ext}`.
//! [`date_prefix`] builds the prefix the locator matches on and
//! [`part_label`] recovers the part identifier shown in mail subjects.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Token that introduces the part identifier in an archive name.
pub const PART_TOKEN: &str = "Part";

/// Greedy prefix so the capture starts after the *last* `Part` token.
static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^.*{}(?P<label>.*)$", regex::escape(PART_TOKEN))).expect("valid regex")
});

/// Date format embedded in archive names.
pub const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Build the `{base}_{YYYY-MM-DD}` prefix for archives produced on `date`.
///
/// ```
/// use chrono::NaiveDate;
/// use dispatch_core::naming::date_prefix;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
/// assert_eq!(date_prefix("Billing", date), "Billing_2026-03-07");
/// ```
pub fn date_prefix(base_name: &str, date: NaiveDate) -> String {
    format!("{base_name}_{}", date.format(ARCHIVE_DATE_FORMAT))
}

/// Identifier of one archive part, as shown in the mail subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartLabel {
    /// Text following the last `Part` token, e.g. `"3"` for `..._Part3.7z`.
    Numbered(String),
    /// No `Part` token: the extension-stripped file name.
    Whole(String),
}

impl PartLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Numbered(s) | Self::Whole(s) => s,
        }
    }
}

impl fmt::Display for PartLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the part label from an archive file name.
///
/// The `extension` suffix (e.g. `.7z`) is stripped first. If the remaining
/// stem contains [`PART_TOKEN`], the label is everything after its last
/// occurrence; otherwise the label is the stem itself.
pub fn part_label(file_name: &str, extension: &str) -> PartLabel {
    let stem = file_name.strip_suffix(extension).unwrap_or(file_name);

    match PART_RE.captures(stem).and_then(|c| c.name("label")) {
        Some(label) => PartLabel::Numbered(label.as_str().to_string()),
        None => PartLabel::Whole(stem.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_part() {
        assert_eq!(
            part_label("Billing_2026-03-07_Part2.7z", ".7z"),
            PartLabel::Numbered("2".to_string())
        );
    }

    #[test]
    fn multi_digit_part() {
        assert_eq!(part_label("Billing_2026-03-07_Part12.7z", ".7z").as_str(), "12");
    }

    #[test]
    fn last_part_token_wins() {
        assert_eq!(
            part_label("PartnerFeed_2026-03-07_Part4.7z", ".7z"),
            PartLabel::Numbered("4".to_string())
        );
    }

    #[test]
    fn no_part_token_falls_back_to_stem() {
        assert_eq!(
            part_label("Billing_2026-03-07.7z", ".7z"),
            PartLabel::Whole("Billing_2026-03-07".to_string())
        );
    }

    #[test]
    fn empty_suffix_after_token() {
        assert_eq!(
            part_label("Billing_2026-03-07_Part.7z", ".7z"),
            PartLabel::Numbered(String::new())
        );
    }

    #[test]
    fn other_extension_is_left_alone() {
        assert_eq!(
            part_label("Billing_2026-03-07_Part1.zip", ".7z").as_str(),
            "1.zip"
        );
    }

    #[test]
    fn display_matches_label() {
        let label = part_label("Billing_Part7.7z", ".7z");
        assert_eq!(label.to_string(), "7");
    }

    #[test]
    fn prefix_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).expect("date");
        assert_eq!(date_prefix("Dump", date), "Dump_2026-01-05");
    }
}

//! Archive discovery and per-archive guards.
//!
//! [`locate`] lists today's archive parts in the configured directory.
//! The freshness and size checks live on [`ArchiveRef`] and are pure
//! functions of the metadata captured in the reference; call
//! [`ArchiveRef::refresh`] to re-read metadata right before checking.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;

use crate::config::{ArchiveSettings, BYTES_PER_MB};
use crate::naming::date_prefix;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// The archive directory could not be listed.
    #[error("Cannot read archive directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// ArchiveRef
// ---------------------------------------------------------------------------

/// One archive on disk, with metadata as of the last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
    pub size_bytes: u64,
}

impl ArchiveRef {
    /// Read metadata for `path`.
    pub async fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            file_name,
            modified: metadata.modified()?,
            size_bytes: metadata.len(),
            path,
        })
    }

    /// Re-read metadata so later checks see the file as it is now.
    pub async fn refresh(&self) -> std::io::Result<Self> {
        Self::from_path(self.path.clone()).await
    }

    /// Time elapsed since the last modification. Future timestamps count as
    /// zero age.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or(Duration::ZERO)
    }

    /// `true` when the archive is strictly older than `stale_after`.
    pub fn is_stale(&self, now: SystemTime, stale_after: Duration) -> bool {
        self.age_at(now) > stale_after
    }

    /// `true` when the archive is strictly larger than `max_bytes`.
    pub fn exceeds_size(&self, max_bytes: u64) -> bool {
        self.size_bytes > max_bytes
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB as f64
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// `true` if `file_name` belongs to the archive set for `date`.
pub fn matches_archive(file_name: &str, base_name: &str, extension: &str, date: NaiveDate) -> bool {
    file_name.starts_with(&date_prefix(base_name, date)) && file_name.ends_with(extension)
}

/// List the archive parts produced on `date`, sorted by file name.
///
/// Only direct children of the directory are considered. Symlinks are
/// followed. Entries that do not resolve to a regular file, have non-UTF-8
/// names, or vanish while listing are skipped. Ordering is plain
/// lexicographic, so `Part10` sorts before `Part2`.
pub async fn locate(
    settings: &ArchiveSettings,
    date: NaiveDate,
) -> Result<Vec<ArchiveRef>, LocateError> {
    let dir_err = |source| LocateError::Directory {
        path: settings.directory.clone(),
        source,
    };

    let mut entries = tokio::fs::read_dir(&settings.directory)
        .await
        .map_err(dir_err)?;

    let mut archives = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if !matches_archive(&file_name, &settings.base_name, &settings.extension, date) {
            continue;
        }

        // Follows symlinks, so a link to an archive counts as the archive.
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => continue,
        }

        match ArchiveRef::from_path(path).await {
            Ok(archive) => archives.push(archive),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "Could not read archive metadata");
            }
        }
    }

    archives.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    tracing::debug!(
        directory = %settings.directory.display(),
        count = archives.len(),
        "Archive listing complete"
    );

    Ok(archives)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;

    const BASE: &str = "Billing";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).expect("date")
    }

    fn settings(dir: &Path) -> ArchiveSettings {
        ArchiveSettings {
            directory: dir.to_path_buf(),
            base_name: BASE.to_string(),
            extension: ".7z".to_string(),
            stale_after: Duration::from_secs(3600),
            max_size_bytes: 10 * BYTES_PER_MB,
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"archive").expect("write fixture");
    }

    fn archive(modified: SystemTime, size_bytes: u64) -> ArchiveRef {
        ArchiveRef {
            path: PathBuf::from("/tmp/Billing_2026-03-07_Part1.7z"),
            file_name: "Billing_2026-03-07_Part1.7z".to_string(),
            modified,
            size_bytes,
        }
    }

    #[tokio::test]
    async fn locate_filters_by_date_and_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Billing_2026-03-07_Part2.7z");
        touch(dir.path(), "Billing_2026-03-07_Part1.7z");
        touch(dir.path(), "Billing_2026-03-06_Part1.7z");
        touch(dir.path(), "Billing_2026-03-07_Part1.zip");
        touch(dir.path(), "Other_2026-03-07_Part1.7z");
        touch(dir.path(), "notes.txt");

        let found = locate(&settings(dir.path()), day()).await.expect("locate");
        let names: Vec<_> = found.iter().map(|a| a.file_name.as_str()).collect();

        assert_eq!(
            names,
            vec!["Billing_2026-03-07_Part1.7z", "Billing_2026-03-07_Part2.7z"]
        );
        assert!(found.iter().all(|a| a.size_bytes == 7));
    }

    #[tokio::test]
    async fn locate_sorts_lexicographically() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Billing_2026-03-07_Part2.7z");
        touch(dir.path(), "Billing_2026-03-07_Part10.7z");
        touch(dir.path(), "Billing_2026-03-07_Part1.7z");

        let found = locate(&settings(dir.path()), day()).await.expect("locate");
        let names: Vec<_> = found.iter().map(|a| a.file_name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "Billing_2026-03-07_Part1.7z",
                "Billing_2026-03-07_Part10.7z",
                "Billing_2026-03-07_Part2.7z",
            ]
        );
    }

    #[tokio::test]
    async fn locate_ignores_subdirectories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("Billing_2026-03-07_Part1.7z")).expect("mkdir");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).expect("mkdir");
        touch(&nested, "Billing_2026-03-07_Part2.7z");

        let found = locate(&settings(dir.path()), day()).await.expect("locate");
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn locate_follows_symlinks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = tempfile::tempdir().expect("staging");
        touch(staging.path(), "built.7z");
        std::os::unix::fs::symlink(
            staging.path().join("built.7z"),
            dir.path().join("Billing_2026-03-07_Part1.7z"),
        )
        .expect("symlink");
        std::os::unix::fs::symlink(
            staging.path().join("missing.7z"),
            dir.path().join("Billing_2026-03-07_Part2.7z"),
        )
        .expect("dangling symlink");

        let found = locate(&settings(dir.path()), day()).await.expect("locate");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name, "Billing_2026-03-07_Part1.7z");
        assert_eq!(found[0].size_bytes, 7);
    }

    #[tokio::test]
    async fn locate_empty_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let found = locate(&settings(dir.path()), day()).await.expect("locate");
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn locate_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent");
        let result = locate(&settings(&missing), day()).await;
        assert_matches!(result, Err(LocateError::Directory { .. }));
    }

    #[test]
    fn freshness_boundary() {
        let now = SystemTime::now();
        let threshold = Duration::from_secs(3600);

        let stale = archive(now - Duration::from_secs(3601), 1);
        let fresh = archive(now - Duration::from_secs(3599), 1);
        let exact = archive(now - Duration::from_secs(3600), 1);

        assert!(stale.is_stale(now, threshold));
        assert!(!fresh.is_stale(now, threshold));
        assert!(!exact.is_stale(now, threshold));
    }

    #[test]
    fn future_mtime_is_fresh() {
        let now = SystemTime::now();
        let ahead = archive(now + Duration::from_secs(120), 1);
        assert_eq!(ahead.age_at(now), Duration::ZERO);
        assert!(!ahead.is_stale(now, Duration::from_secs(3600)));
    }

    #[test]
    fn size_boundary() {
        let limit = 10 * BYTES_PER_MB;
        let now = SystemTime::now();

        assert!(!archive(now, limit).exceeds_size(limit));
        assert!(archive(now, limit + 1).exceeds_size(limit));
    }

    #[test]
    fn size_in_megabytes() {
        let a = archive(SystemTime::now(), 5 * BYTES_PER_MB / 2);
        assert!((a.size_mb() - 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn refresh_sees_new_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Billing_2026-03-07_Part1.7z");
        std::fs::write(&path, b"abc").expect("write");

        let first = ArchiveRef::from_path(&path).await.expect("metadata");
        std::fs::write(&path, b"abcdef").expect("rewrite");
        let second = first.refresh().await.expect("refresh");

        assert_eq!(first.size_bytes, 3);
        assert_eq!(second.size_bytes, 6);
        assert_eq!(second.file_name, "Billing_2026-03-07_Part1.7z");
    }
}

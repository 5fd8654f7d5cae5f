//! Capture session: duplicate detection and the append-only export file.
//!
//! A session starts lazily on the first accepted fragment and lasts until
//! [`CaptureSession::reset`]. Every accepted fragment is written to the
//! session's export file as one line, and the two in-memory sets remember
//! what has already been written so repeats are rejected.
//!
//! Both sets grow for the whole life of a session. That is fine for a local
//! scraping run but nothing bounds them.

use chrono::{Local, NaiveDateTime, TimeDelta};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Number of normalized characters kept in a fingerprint.
pub const FINGERPRINT_PREFIX_CHARS: usize = 100;

/// Preview length used in HTTP replies.
pub const REPLY_PREVIEW_CHARS: usize = 50;

/// Preview length used in log lines.
pub const LOG_PREVIEW_CHARS: usize = 80;

const SESSION_FILE_FORMAT: &str = "messenger_export_%Y%m%d_%H%M%S.txt";

/// Lower-cases and trims a fragment before it is compared.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

/// Near-duplicate key: the first 100 normalized characters plus the length.
///
/// Two long fragments sharing a prefix and a length collide even when their
/// tails differ.
pub fn fingerprint(normalized: &str) -> String {
    let prefix: String = normalized.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
    format!("{prefix}_{}", normalized.chars().count())
}

/// Truncates `text` to `limit` characters, appending `...` when cut.
pub fn preview(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Export file name for a session started at `started_at`.
pub fn session_file_name(started_at: NaiveDateTime) -> String {
    started_at.format(SESSION_FILE_FORMAT).to_string()
}

/// Why a fragment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// The normalized text was already recorded.
    Exact,
    /// A recorded fragment shares the fingerprint.
    Similar,
}

impl DuplicateKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "Exact",
            Self::Similar => "Similar",
        }
    }
}

/// Result of submitting one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved {
        session_file: String,
        total_lines: usize,
        started_session: bool,
    },
    Duplicate(DuplicateKind),
}

/// Snapshot of the session used by health checks and the shutdown report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_file: Option<String>,
    pub total_lines: usize,
}

/// Dedup state plus the currently attached export file.
#[derive(Debug)]
pub struct CaptureSession {
    export_dir: PathBuf,
    session_file: Option<String>,
    last_started: Option<NaiveDateTime>,
    seen: HashSet<String>,
    fingerprints: HashSet<String>,
}

impl CaptureSession {
    /// Creates an inactive session writing into `export_dir`.
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            session_file: None,
            last_started: None,
            seen: HashSet::new(),
            fingerprints: HashSet::new(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Name of the attached export file, if a session is active.
    pub fn session_file(&self) -> Option<&str> {
        self.session_file.as_deref()
    }

    /// Full path of the attached export file, if a session is active.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .as_ref()
            .map(|name| self.export_dir.join(name))
    }

    pub fn is_active(&self) -> bool {
        self.session_file.is_some()
    }

    /// Number of fragments recorded in the current session.
    pub fn total_lines(&self) -> usize {
        self.seen.len()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_file: self.session_file.clone(),
            total_lines: self.total_lines(),
        }
    }

    /// Exact matches win over fingerprint matches.
    fn classify(&self, normalized: &str, key: &str) -> Option<DuplicateKind> {
        if self.seen.contains(normalized) {
            Some(DuplicateKind::Exact)
        } else if self.fingerprints.contains(key) {
            Some(DuplicateKind::Similar)
        } else {
            None
        }
    }

    /// Start time for a new session. File names have one-second resolution,
    /// so a session never reuses the second of the one before it.
    fn next_start(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self.last_started {
            Some(previous) if previous >= now => previous + TimeDelta::seconds(1),
            _ => now,
        }
    }

    /// Records `text` unless it duplicates something already in the session.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome> {
        self.submit_at(text, Local::now().naive_local()).await
    }

    /// Same as [`submit`](Self::submit) with an explicit clock reading, used
    /// to name a new session file.
    pub async fn submit_at(&mut self, text: &str, now: NaiveDateTime) -> Result<SubmitOutcome> {
        let normalized = normalize(text);
        let key = fingerprint(&normalized);
        if let Some(kind) = self.classify(&normalized, &key) {
            return Ok(SubmitOutcome::Duplicate(kind));
        }

        let (session_file, started_at) = match &self.session_file {
            Some(name) => (name.clone(), None),
            None => {
                let started_at = self.next_start(now);
                (session_file_name(started_at), Some(started_at))
            }
        };
        let started_session = started_at.is_some();

        // Write before remembering the fragment so a failed append leaves the
        // sets and the file in agreement.
        append_line(&self.export_dir.join(&session_file), text).await?;

        self.seen.insert(normalized);
        self.fingerprints.insert(key);
        self.session_file = Some(session_file.clone());
        if started_at.is_some() {
            self.last_started = started_at;
        }

        Ok(SubmitOutcome::Saved {
            session_file,
            total_lines: self.seen.len(),
            started_session,
        })
    }

    /// Forgets every recorded fragment and detaches the export file.
    ///
    /// The file itself stays on disk.
    pub fn reset(&mut self) -> SessionSummary {
        let previous = self.summary();
        self.seen.clear();
        self.fingerprints.clear();
        self.session_file = None;
        previous
    }
}

async fn append_line(path: &Path, text: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 26)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_normalize_folds_case_and_trims() {
        assert_eq!(normalize("  Hello World \n"), "hello world");
        assert_eq!(normalize("ÉCOLE"), "école");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_fingerprint_uses_prefix_and_char_length() {
        assert_eq!(fingerprint("abc"), "abc_3");

        let long = "x".repeat(150);
        assert_eq!(fingerprint(&long), format!("{}_150", "x".repeat(100)));

        // Lengths are counted in characters, not bytes.
        assert_eq!(fingerprint("héllo"), "héllo_5");
    }

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview(&"a".repeat(50), 50), "a".repeat(50));
        assert_eq!(preview(&"a".repeat(51), 50), format!("{}...", "a".repeat(50)));
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_session_file_name_pattern() {
        assert_eq!(
            session_file_name(at(15, 30, 5)),
            "messenger_export_20250126_153005.txt"
        );
    }

    #[tokio::test]
    async fn test_first_submission_starts_session_and_writes_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());
        assert!(!session.is_active());

        let outcome = session.submit_at("Hello there!", at(10, 0, 0)).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Saved {
                session_file: "messenger_export_20250126_100000.txt".to_string(),
                total_lines: 1,
                started_session: true,
            }
        );
        assert!(session.is_active());

        let path = session.session_path().unwrap();
        assert_eq!(read_lines(&path), vec!["Hello there!"]);
    }

    #[tokio::test]
    async fn test_exact_duplicate_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        session.submit_at("Hello", at(10, 0, 0)).await.unwrap();
        let outcome = session.submit_at("  hello ", at(10, 0, 1)).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Duplicate(DuplicateKind::Exact));
        assert_eq!(session.total_lines(), 1);
        assert_eq!(read_lines(&session.session_path().unwrap()), vec!["Hello"]);
    }

    #[tokio::test]
    async fn test_similar_duplicate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        let prefix = "p".repeat(100);
        let a = format!("{prefix}AAAA");
        let b = format!("{prefix}BBBB");

        session.submit_at(&a, at(10, 0, 0)).await.unwrap();
        let outcome = session.submit_at(&b, at(10, 0, 1)).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Duplicate(DuplicateKind::Similar));
        assert_eq!(read_lines(&session.session_path().unwrap()), vec![a]);
    }

    #[tokio::test]
    async fn test_exact_check_runs_before_similar_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        session.submit_at("same", at(10, 0, 0)).await.unwrap();
        let outcome = session.submit_at("SAME", at(10, 0, 1)).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Duplicate(DuplicateKind::Exact));
    }

    #[tokio::test]
    async fn test_session_file_is_kept_across_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        session.submit_at("one", at(10, 0, 0)).await.unwrap();
        let outcome = session.submit_at("two", at(11, 0, 0)).await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Saved {
                session_file: "messenger_export_20250126_100000.txt".to_string(),
                total_lines: 2,
                started_session: false,
            }
        );
    }

    #[tokio::test]
    async fn test_reset_detaches_file_and_accepts_text_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        session.submit_at("Hello", at(10, 0, 0)).await.unwrap();
        let first_path = session.session_path().unwrap();

        let previous = session.reset();
        assert_eq!(
            previous,
            SessionSummary {
                session_file: Some("messenger_export_20250126_100000.txt".to_string()),
                total_lines: 1,
            }
        );
        assert!(!session.is_active());
        assert_eq!(session.total_lines(), 0);
        assert!(first_path.exists());

        let outcome = session.submit_at("Hello", at(10, 5, 0)).await.unwrap();
        match outcome {
            SubmitOutcome::Saved {
                session_file,
                total_lines,
                started_session,
            } => {
                assert_eq!(session_file, "messenger_export_20250126_100500.txt");
                assert_eq!(total_lines, 1);
                assert!(started_session);
            }
            other => panic!("expected saved, got {other:?}"),
        }
        assert_eq!(read_lines(&first_path), vec!["Hello"]);
    }

    #[tokio::test]
    async fn test_reset_within_same_second_uses_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());
        let now = at(18, 51, 19);

        session.submit_at("before reset", now).await.unwrap();
        let first = session.session_path().unwrap();
        session.reset();

        session.submit_at("after reset", now).await.unwrap();
        let second = session.session_path().unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap(),
            "messenger_export_20250126_185120.txt"
        );
        assert_eq!(read_lines(&first), vec!["before reset"]);
        assert_eq!(read_lines(&second), vec!["after reset"]);

        // A third session in the same wall-clock second keeps moving forward.
        session.reset();
        session.submit_at("third", now).await.unwrap();
        assert_eq!(
            session.session_file(),
            Some("messenger_export_20250126_185121.txt")
        );
    }

    #[tokio::test]
    async fn test_new_session_uses_clock_once_it_moves_past_last_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        session.submit_at("one", at(10, 0, 0)).await.unwrap();
        session.reset();
        session.submit_at("two", at(10, 0, 30)).await.unwrap();

        assert_eq!(
            session.session_file(),
            Some("messenger_export_20250126_100030.txt")
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(dir.path());

        let first = session.submit_at("", at(10, 0, 0)).await.unwrap();
        assert!(matches!(first, SubmitOutcome::Saved { total_lines: 1, .. }));

        let second = session.submit_at("   ", at(10, 0, 1)).await.unwrap();
        assert_eq!(second, SubmitOutcome::Duplicate(DuplicateKind::Exact));
    }

    #[tokio::test]
    async fn test_write_failure_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut session = CaptureSession::new(&missing);

        let result = session.submit_at("Hello", at(10, 0, 0)).await;
        assert!(result.is_err());
        assert!(!session.is_active());
        assert_eq!(session.total_lines(), 0);
        assert!(session.seen.is_empty());
        assert!(session.fingerprints.is_empty());
    }
}

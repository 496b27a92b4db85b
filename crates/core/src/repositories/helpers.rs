//! Storage utilities shared by the file-backed store.
//!
//! Covers the sharded directory walk, staged atomic writes, the per-patient advisory lock and
//! the enrolment clock.

use crate::{TriageError, TriageResult};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::Serialize;
use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tempfile::NamedTempFile;

/// Collects every `<root>/<s1>/<s2>/<id>/<file_name>` that exists.
///
/// Unreadable shard directories are skipped; a missing root yields an empty list.
pub(crate) fn sharded_files(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(s1_iter) = fs::read_dir(root) else {
        return files;
    };

    for s1 in s1_iter.flatten() {
        let Ok(s2_iter) = fs::read_dir(s1.path()) else {
            continue;
        };
        for s2 in s2_iter.flatten() {
            let Ok(id_iter) = fs::read_dir(s2.path()) else {
                continue;
            };
            for id_ent in id_iter.flatten() {
                let candidate = id_ent.path().join(file_name);
                if candidate.is_file() {
                    files.push(candidate);
                }
            }
        }
    }

    files
}

/// Serialises `value` as pretty JSON and atomically replaces `dir/file_name` with it.
///
/// The bytes are staged in a temporary file inside `dir`, flushed and fsynced, then renamed over
/// the target, so readers see either the old file or the new one and never a torn write.
///
/// # Errors
///
/// Returns `TriageError::Serialization` if encoding fails, or `TriageError::FileWrite` for any
/// I/O failure while staging, syncing or renaming.
pub(crate) fn write_json_atomic<T: Serialize>(
    dir: &Path,
    file_name: &str,
    value: &T,
) -> TriageResult<()> {
    let mut staged = NamedTempFile::new_in(dir).map_err(TriageError::FileWrite)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value).map_err(TriageError::Serialization)?;
        writer.flush().map_err(TriageError::FileWrite)?;
    }
    staged.as_file().sync_all().map_err(TriageError::FileWrite)?;
    staged
        .persist(dir.join(file_name))
        .map_err(|e| TriageError::FileWrite(e.error))?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> TriageResult<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(TriageError::FileWrite)
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> TriageResult<()> {
    Ok(())
}

/// Exclusive advisory lock on a patient directory, released on drop.
#[derive(Debug)]
pub(crate) struct RecordLock {
    file: File,
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release record lock: {}", e);
        }
    }
}

/// Attempts to take the lock file in `dir` without blocking.
///
/// Returns `Ok(None)` when another holder (thread or process) has it.
///
/// # Errors
///
/// Returns `TriageError::Lock` if the lock file cannot be opened or locking fails for a reason
/// other than contention.
pub(crate) fn try_lock_dir(dir: &Path, lock_name: &str) -> TriageResult<Option<RecordLock>> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(lock_name))
        .map_err(TriageError::Lock)?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(RecordLock { file })),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(TriageError::Lock(e)),
    }
}

static LAST_ENROLMENT: Mutex<Option<DateTime<Utc>>> = Mutex::new(None);

/// Current time, nudged forward so that successive calls in this process never repeat.
pub(crate) fn next_enrolment_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    let mut last = LAST_ENROLMENT
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let next = match *last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    };
    *last = Some(next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_atomic_replaces_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_json_atomic(temp_dir.path(), "doc.json", &vec![1, 2, 3]).unwrap();
        write_json_atomic(temp_dir.path(), "doc.json", &vec![4]).unwrap();

        let contents = fs::read_to_string(temp_dir.path().join("doc.json")).unwrap();
        let parsed: Vec<i32> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, vec![4]);

        let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "staging file should have been renamed away");
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let first = try_lock_dir(temp_dir.path(), ".lock").unwrap();
        assert!(first.is_some());
        assert!(try_lock_dir(temp_dir.path(), ".lock").unwrap().is_none());
        drop(first);
        assert!(try_lock_dir(temp_dir.path(), ".lock").unwrap().is_some());
    }

    #[test]
    fn test_enrolment_timestamps_strictly_increase() {
        let stamps: Vec<_> = (0..100).map(|_| next_enrolment_timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sharded_files_missing_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        assert!(sharded_files(&temp_dir.path().join("absent"), "record.json").is_empty());
    }
}

//! Per-project action locking for ideaforge
//!
//! At most one stage action may be in flight for a given project. A second
//! request for the same project is rejected immediately rather than queued.
//! Locks for different projects never contend with each other beyond the
//! brief critical section that inserts or removes the table entry.
//!
//! An in-process table covers tasks sharing one [`ActionLocks`]. When lock
//! files are enabled with [`ActionLocks::with_lock_files`], each acquisition
//! also takes an exclusive `fd_lock` on `<base>.<project_id>.action.lock`, so
//! separate processes working on the same store exclude each other too.
//!
//! The lock is released when the returned [`ActionGuard`] is dropped, which
//! covers success, error, timeout and panic unwinding alike.

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Information about an in-flight action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockInfo {
    /// Project the action runs against
    pub project_id: String,
    /// Human-readable action name (e.g. "requirements", "generation")
    pub action: String,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
    /// Process holding the lock
    #[serde(default)]
    pub pid: u32,
}

/// Lock errors for action locking
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LockError {
    #[error(
        "A stage action is already in progress for project '{project_id}' ({action}, started {held_for} ago)"
    )]
    ActionInProgress {
        project_id: String,
        action: String,
        held_for: String,
    },

    #[error("Invalid project id for locking: {reason}")]
    InvalidProjectId { reason: String },

    #[error("Failed to use lock file {path}: {reason}")]
    LockFile { path: String, reason: String },
}

/// Table of in-flight project actions, optionally backed by lock files
///
/// Cloning an `ActionLocks` yields a handle onto the same table.
#[derive(Debug, Clone, Default)]
pub struct ActionLocks {
    held: Arc<Mutex<HashMap<String, LockInfo>>>,
    file_base: Option<PathBuf>,
}

impl ActionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks that also take an OS file lock next to `base`
    ///
    /// `base` is usually the artifact store path, so every process opening the
    /// same store agrees on the lock file names.
    pub fn with_lock_files(base: impl Into<PathBuf>) -> Self {
        Self {
            held: Arc::default(),
            file_base: Some(base.into()),
        }
    }

    /// Path of the lock file for `project_id`, when lock files are enabled
    pub fn lock_file_path(&self, project_id: &str) -> Option<PathBuf> {
        let base = self.file_base.as_ref()?;
        let mut name = base.as_os_str().to_owned();
        name.push(format!(".{project_id}.action.lock"));
        Some(PathBuf::from(name))
    }

    /// Try to take the action lock for `project_id`
    ///
    /// # Errors
    ///
    /// Returns [`LockError::ActionInProgress`] if another action currently
    /// holds the lock for this project, in this process or another one.
    pub fn try_acquire(&self, project_id: &str, action: &str) -> Result<ActionGuard, LockError> {
        validate_project_id(project_id)?;

        let mut held = self.table();
        if let Some(existing) = held.get(project_id) {
            return Err(in_progress(existing));
        }

        let info = LockInfo {
            project_id: project_id.to_string(),
            action: action.to_string(),
            acquired_at: Utc::now(),
            pid: std::process::id(),
        };
        let file_lock = match self.lock_file_path(project_id) {
            Some(path) => Some(lock_file(&path, &info)?),
            None => None,
        };
        held.insert(project_id.to_string(), info.clone());

        Ok(ActionGuard {
            locks: self.clone(),
            info,
            _file_lock: file_lock,
        })
    }

    /// Whether an action is currently running for `project_id`
    pub fn is_held(&self, project_id: &str) -> bool {
        self.holder(project_id).is_some()
    }

    /// Snapshot of the in-flight action for `project_id`, if any
    ///
    /// With lock files enabled this also sees actions held by other processes.
    pub fn holder(&self, project_id: &str) -> Option<LockInfo> {
        if let Some(info) = self.table().get(project_id).cloned() {
            return Some(info);
        }
        if validate_project_id(project_id).is_err() {
            return None;
        }
        let path = self.lock_file_path(project_id)?;
        peek_lock_holder(&path, project_id)
    }

    /// Number of projects with an action in flight in this process
    pub fn held_count(&self) -> usize {
        self.table().len()
    }

    fn release(&self, project_id: &str) {
        self.table().remove(project_id);
    }

    // A panic while holding the table mutex leaves the map itself consistent,
    // so a poisoned mutex is recovered rather than propagated.
    fn table(&self) -> MutexGuard<'_, HashMap<String, LockInfo>> {
        self.held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn validate_project_id(project_id: &str) -> Result<(), LockError> {
    if project_id.trim().is_empty() {
        return Err(LockError::InvalidProjectId {
            reason: "project id is empty".to_string(),
        });
    }
    if project_id.contains(['/', '\\']) || project_id.contains("..") {
        return Err(LockError::InvalidProjectId {
            reason: format!("'{project_id}' contains path separators"),
        });
    }
    Ok(())
}

fn in_progress(info: &LockInfo) -> LockError {
    LockError::ActionInProgress {
        project_id: info.project_id.clone(),
        action: info.action.clone(),
        held_for: format_duration(Utc::now() - info.acquired_at),
    }
}

fn file_error(path: &Path, err: impl std::fmt::Display) -> LockError {
    LockError::LockFile {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// Best-effort read of the holder record another process wrote
fn read_holder(path: &Path, project_id: &str) -> LockInfo {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<LockInfo>(&content).ok())
        .unwrap_or_else(|| LockInfo {
            project_id: project_id.to_string(),
            action: "unknown".to_string(),
            acquired_at: Utc::now(),
            pid: 0,
        })
}

/// Take the exclusive OS lock on `path` and record `info` in it
fn lock_file(path: &Path, info: &LockInfo) -> Result<RwLock<File>, LockError> {
    let file = open_lock_file(path).map_err(|e| file_error(path, e))?;
    let mut rw_lock = RwLock::new(file);
    match rw_lock.try_write() {
        Ok(guard) => {
            let json = serde_json::to_string_pretty(info).map_err(|e| file_error(path, e))?;
            let mut file_ref: &File = &guard;
            file_ref
                .set_len(0)
                .and_then(|_| file_ref.seek(SeekFrom::Start(0)))
                .and_then(|_| file_ref.write_all(json.as_bytes()))
                .and_then(|_| file_ref.flush())
                .map_err(|e| file_error(path, e))?;
            // The OS lock belongs to the open descriptor and is released when
            // the `File` inside `rw_lock` is closed on guard drop.
            std::mem::forget(guard);
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            return Err(in_progress(&read_holder(path, &info.project_id)));
        }
        Err(e) => return Err(file_error(path, e)),
    }
    Ok(rw_lock)
}

/// Holder of `path` if some other descriptor has it locked
fn peek_lock_holder(path: &Path, project_id: &str) -> Option<LockInfo> {
    if !path.exists() {
        return None;
    }
    let mut rw_lock = RwLock::new(open_lock_file(path).ok()?);
    let contended = match rw_lock.try_write() {
        Ok(_) => false,
        Err(e) => e.kind() == io::ErrorKind::WouldBlock,
    };
    contended.then(|| read_holder(path, project_id))
}

/// RAII guard for a held project action lock
#[derive(Debug)]
pub struct ActionGuard {
    locks: ActionLocks,
    info: LockInfo,
    _file_lock: Option<RwLock<File>>,
}

impl ActionGuard {
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn project_id(&self) -> &str {
        &self.info.project_id
    }
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        self._file_lock.take();
        self.locks.release(&self.info.project_id);
    }
}

fn format_duration(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}

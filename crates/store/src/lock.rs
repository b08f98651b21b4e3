// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process session locks.
//!
//! Ownership is a `.lock` file carrying pid, hostname, a random per-
//! acquisition instance id, and a heartbeat refreshed by a background
//! thread. A lock is stealable when its heartbeat is stale, its owner pid is
//! dead on this host, or the caller escalates (force on idle, interrupt on
//! anything). Release stops the heartbeat *first* and removes the file only
//! if it still carries our instance id, so a thief's lock is never deleted.

use crate::error::StoreError;
use crate::fsutil::{read_json_opt, write_json_atomic};
use crate::registry;
use crate::store::SessionStore;
use chrono::Utc;
use mitto_core::clock::Clock;
use mitto_core::lock::{ClientStatus, LockRecord, LockStatus};
use mitto_core::session::SessionId;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Lock timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct LockSettings {
    /// How often the heartbeat thread refreshes the lock file.
    pub heartbeat_interval: Duration,
    /// Heartbeats older than this make the lock stealable.
    pub stale_timeout: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self { heartbeat_interval: Duration::from_secs(10), stale_timeout: Duration::from_secs(60) }
    }
}

impl LockSettings {
    pub(crate) fn stale_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_timeout.as_secs() as i64)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AcquireMode {
    Try,
    Force,
    Interrupt,
}

/// Exclusive ownership of one session, held until [`release`](SessionLock::release)
/// or process exit (the signal hook releases every registered lock).
pub struct SessionLock {
    inner: Arc<LockInner>,
}

pub(crate) struct LockInner {
    session_id: SessionId,
    path: PathBuf,
    instance_id: String,
    stale_timeout: chrono::Duration,
    record: Mutex<LockRecord>,
    released: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    done_subs: Mutex<Vec<Sender<()>>>,
}

impl LockInner {
    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn read_current(&self) -> Option<LockRecord> {
        read_json_opt::<LockRecord>(&self.path).ok().flatten()
    }

    fn is_valid_now(&self) -> bool {
        match self.read_current() {
            Some(current) => {
                current.instance_id == self.instance_id
                    && !current.is_stale(Utc::now(), self.stale_timeout)
            }
            None => false,
        }
    }

    /// True while the on-disk record still carries our instance id.
    fn still_owns_file(&self) -> bool {
        matches!(self.read_current(), Some(current) if current.instance_id == self.instance_id)
    }

    fn refresh_heartbeat(&self) {
        // Never write over a thief's record or resurrect a removed file.
        if !self.still_owns_file() {
            tracing::debug!(session_id = %self.session_id, "skipping heartbeat, lock no longer ours");
            return;
        }
        let mut record = self.record.lock();
        record.heartbeat = Utc::now();
        if let Err(err) = write_json_atomic(&self.path, &*record) {
            tracing::warn!(session_id = %self.session_id, %err, "heartbeat write failed");
        }
    }

    /// Idempotent release: stop the heartbeat, wait for it to exit, then
    /// remove the lock file if it is still ours.
    pub(crate) fn release(&self) -> Result<(), StoreError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Closing the stop channel wakes the heartbeat; joining guarantees
        // it cannot recreate the file after we remove it.
        drop(self.stop_tx.lock().take());
        if let Some(handle) = self.heartbeat.lock().take() {
            let _ = handle.join();
        }

        if let Some(current) = self.read_current() {
            if current.instance_id == self.instance_id {
                match std::fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        registry::unregister(&self.instance_id);
                        return Err(err.into());
                    }
                }
            }
        }

        registry::unregister(&self.instance_id);
        // Dropping the senders closes every `done()` subscription.
        self.done_subs.lock().clear();
        tracing::debug!(session_id = %self.session_id, "released lock");
        Ok(())
    }
}

impl SessionLock {
    fn start(
        session_id: SessionId,
        path: PathBuf,
        record: LockRecord,
        settings: &LockSettings,
    ) -> Self {
        let inner = Arc::new(LockInner {
            session_id,
            path,
            instance_id: record.instance_id.clone(),
            stale_timeout: settings.stale_chrono(),
            record: Mutex::new(record),
            released: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
            heartbeat: Mutex::new(None),
            done_subs: Mutex::new(Vec::new()),
        });

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        *inner.stop_tx.lock() = Some(stop_tx);
        let beat = Arc::clone(&inner);
        let interval = settings.heartbeat_interval;
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => beat.refresh_heartbeat(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        });
        *inner.heartbeat.lock() = Some(handle);

        registry::register(&inner);
        SessionLock { inner }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    /// Snapshot of the lock record as last written by this process.
    pub fn info(&self) -> LockRecord {
        self.inner.record.lock().clone()
    }

    /// Update the holder status (idle / processing / waiting_for_permission)
    /// and rewrite the lock file.
    pub fn set_status(
        &self,
        status: ClientStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.inner.released.load(Ordering::SeqCst) || !self.inner.still_owns_file() {
            return Err(StoreError::LockNotHeld);
        }
        let mut record = self.inner.record.lock();
        record.status = status;
        record.status_message = message.map(str::to_string);
        record.last_activity = Utc::now();
        write_json_atomic(&self.inner.path, &*record)?;
        Ok(())
    }

    /// Whether the lock file still carries this acquisition's instance id
    /// with a fresh heartbeat.
    pub fn is_valid(&self) -> bool {
        if self.inner.released.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.is_valid_now()
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// A channel that disconnects when the lock is released.
    pub fn done(&self) -> Receiver<()> {
        let (tx, rx) = mpsc::channel();
        if !self.inner.released.load(Ordering::SeqCst) {
            self.inner.done_subs.lock().push(tx);
        }
        rx
    }

    /// Poll validity on `interval`; the receiver gets one `true` when
    /// ownership is lost, then the channel closes. Releasing the lock closes
    /// the channel without a signal.
    pub fn start_watcher(&self, interval: Duration) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if inner.released.load(Ordering::SeqCst) {
                return;
            }
            if !inner.is_valid_now() {
                tracing::info!(session_id = %inner.session_id, "lock was stolen");
                let _ = tx.send(true);
                return;
            }
        });
        rx
    }

    /// Release the lock. Idempotent; tolerates an already-removed file.
    pub fn release(&self) -> Result<(), StoreError> {
        self.inner.release()
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(err) = self.inner.release() {
            tracing::warn!(session_id = %self.inner.session_id, %err, "release on drop failed");
        }
    }
}

/// True when a pid is running on this host. EPERM still means alive.
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn local_hostname() -> String {
    hostname::get().map(|h| h.to_string_lossy().into_owned()).unwrap_or_else(|_| "unknown".into())
}

impl<C: Clock> SessionStore<C> {
    /// Acquire the session lock; fails with `SessionLocked` while another
    /// holder's lock is valid and its process not known dead.
    pub fn try_acquire_lock(
        &self,
        id: &SessionId,
        client_type: &str,
    ) -> Result<SessionLock, StoreError> {
        self.acquire(id, client_type, AcquireMode::Try)
    }

    /// Acquire, stealing idle or stale locks. Fails with `SessionProcessing`
    /// / `SessionWaitingPermission` while the holder is mid-task.
    pub fn force_acquire_lock(
        &self,
        id: &SessionId,
        client_type: &str,
    ) -> Result<SessionLock, StoreError> {
        self.acquire(id, client_type, AcquireMode::Force)
    }

    /// Acquire regardless of holder status. For user-confirmed takeover.
    pub fn force_interrupt_lock(
        &self,
        id: &SessionId,
        client_type: &str,
    ) -> Result<SessionLock, StoreError> {
        self.acquire(id, client_type, AcquireMode::Interrupt)
    }

    fn acquire(
        &self,
        id: &SessionId,
        client_type: &str,
        mode: AcquireMode,
    ) -> Result<SessionLock, StoreError> {
        let _guard = self.write_guard()?;
        if !self.metadata_path(id).exists() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }

        let now = self.now();
        let hostname = local_hostname();
        let current = match read_json_opt::<LockRecord>(&self.lock_path(id)) {
            Ok(current) => current,
            // An unreadable lock file only yields to a user-confirmed
            // interrupt, mirroring CheckLockStatus's capability flags.
            Err(StoreError::Json(err)) if mode == AcquireMode::Interrupt => {
                tracing::warn!(session_id = %id, %err, "interrupting past unreadable lock file");
                None
            }
            Err(StoreError::Json(_)) => return Err(StoreError::SessionLocked(id.clone())),
            Err(err) => return Err(err),
        };
        if let Some(current) = current {
            let dead = current.hostname == hostname && !process_alive(current.pid);
            let stale = current.is_stale(now, self.lock_settings().stale_chrono());
            let stealable = match mode {
                AcquireMode::Try => dead || stale,
                AcquireMode::Force => match current.status {
                    _ if dead || stale => true,
                    ClientStatus::Idle => true,
                    ClientStatus::Processing => {
                        return Err(StoreError::SessionProcessing(id.clone()));
                    }
                    ClientStatus::WaitingForPermission => {
                        return Err(StoreError::SessionWaitingPermission(id.clone()));
                    }
                },
                AcquireMode::Interrupt => true,
            };
            if !stealable {
                return Err(StoreError::SessionLocked(id.clone()));
            }
            tracing::info!(
                session_id = %id,
                previous_pid = current.pid,
                previous_client = %current.client_type,
                dead,
                stale,
                "taking over session lock"
            );
        }

        let record = LockRecord {
            pid: std::process::id(),
            hostname,
            instance_id: uuid::Uuid::new_v4().to_string(),
            client_type: client_type.to_string(),
            started_at: now,
            heartbeat: now,
            last_activity: now,
            status: ClientStatus::Idle,
            status_message: None,
        };
        write_json_atomic(&self.lock_path(id), &record)?;

        Ok(SessionLock::start(id.clone(), self.lock_path(id), record, self.lock_settings()))
    }

    /// The current lock record, if any.
    pub fn get_lock_info(&self, id: &SessionId) -> Result<Option<LockRecord>, StoreError> {
        let _guard = self.read_guard()?;
        read_json_opt::<LockRecord>(&self.lock_path(id))
    }

    pub fn is_locked(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.get_lock_info(id)?.is_some())
    }

    /// Classify the session's lock without attempting acquisition.
    pub fn check_lock_status(&self, id: &SessionId) -> Result<LockStatus, StoreError> {
        let _guard = self.read_guard()?;
        let lock_path = self.lock_path(id);
        let record = match read_json_opt::<LockRecord>(&lock_path) {
            Ok(record) => record,
            Err(StoreError::Json(err)) => {
                tracing::debug!(session_id = %id, %err, "unreadable lock file");
                return Ok(LockStatus::unreadable());
            }
            Err(err) => return Err(err),
        };

        let holder_alive = record
            .as_ref()
            .filter(|r| r.hostname == local_hostname())
            .map(|r| process_alive(r.pid));

        Ok(LockStatus::classify(
            record,
            holder_alive,
            self.now(),
            self.lock_settings().stale_chrono(),
        ))
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

//! Single-instance guard and bot lifecycle.
//!
//! Only one process at a time should own the webhook registration. Ownership is claimed by
//! creating a lock file with `create_new` (an atomic test-and-set on the filesystem); the file
//! records the owner's PID and start time so an operator can tell a live lock from a stale one.
//! A crash leaves the lock behind, and it has to be removed by hand.
//!
//! The HTTP server is never gated on the lock: an instance that finds the lock taken keeps
//! serving images and stays in [`BotState::Inactive`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::telegram::{TelegramApi, TelegramError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Not handling updates: lock held elsewhere, registration failed, or shut down
    Inactive,
    /// Webhook registered; updates are being handled
    Running,
}

/// Ownership metadata written into the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl LockOwner {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub enum StartOutcome {
    /// Another instance holds the lock; `owner` is `None` if the file has no readable metadata
    AlreadyLocked { owner: Option<LockOwner> },
    Registered,
    /// Registration failed and the lock was released again
    RegistrationFailed(TelegramError),
    /// The lock file itself could not be created
    LockFailed(std::io::Error),
}

pub struct LifecycleGuard {
    lock_path: PathBuf,
    telegram: Arc<dyn TelegramApi>,
    webhook_endpoint: String,
    delete_webhook_on_shutdown: bool,
    running: AtomicBool,
    owns_lock: AtomicBool,
}

impl LifecycleGuard {
    /// `webhook_endpoint` is the full URL registered with the platform, token included.
    pub fn new(lock_path: impl Into<PathBuf>, telegram: Arc<dyn TelegramApi>, webhook_endpoint: impl Into<String>) -> Self {
        Self {
            lock_path: lock_path.into(),
            telegram,
            webhook_endpoint: webhook_endpoint.into(),
            delete_webhook_on_shutdown: false,
            running: AtomicBool::new(false),
            owns_lock: AtomicBool::new(false),
        }
    }

    /// Also call `deleteWebhook` when a running bot shuts down.
    pub fn delete_webhook_on_shutdown(mut self, enabled: bool) -> Self {
        self.delete_webhook_on_shutdown = enabled;
        self
    }

    pub fn state(&self) -> BotState {
        if self.running.load(Ordering::Acquire) {
            BotState::Running
        } else {
            BotState::Inactive
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == BotState::Running
    }

    /// Claim the lock and register the webhook.
    pub async fn start(&self) -> StartOutcome {
        match self.acquire_lock().await {
            Ok(true) => {}
            Ok(false) => {
                let owner = read_owner(&self.lock_path).await;
                match &owner {
                    Some(owner) => info!(pid = owner.pid, started_at = %owner.started_at, "Bot is already running"),
                    None => info!(lock_file = %self.lock_path.display(), "Bot is already running"),
                }
                return StartOutcome::AlreadyLocked { owner };
            }
            Err(e) => {
                error!(lock_file = %self.lock_path.display(), error = %e, "Failed to create lock file");
                return StartOutcome::LockFailed(e);
            }
        }

        match self.telegram.set_webhook(&self.webhook_endpoint).await {
            Ok(()) => {
                self.running.store(true, Ordering::Release);
                info!("Telegram bot started with webhook");
                StartOutcome::Registered
            }
            Err(e) => {
                error!(error = %e, "Failed to set webhook");
                self.release_lock().await;
                StartOutcome::RegistrationFailed(e)
            }
        }
    }

    /// Stop handling updates and release the lock if this instance holds it.
    ///
    /// The lock file is not removed unconditionally: a lock created by another instance stays in
    /// place even when this instance shuts down.
    pub async fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Stopping Telegram bot");
            if self.delete_webhook_on_shutdown {
                if let Err(e) = self.telegram.delete_webhook().await {
                    warn!(error = %e, "Failed to delete webhook on shutdown");
                }
            }
        }
        self.release_lock().await;
    }

    async fn acquire_lock(&self) -> std::io::Result<bool> {
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&self.lock_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };
        self.owns_lock.store(true, Ordering::Release);

        // The lock is already held at this point; metadata is informational only
        let owner = serde_json::to_vec(&LockOwner::current()).map_err(std::io::Error::other)?;
        if let Err(e) = file.write_all(&owner).await {
            warn!(error = %e, "Failed to write lock owner metadata");
        }
        Ok(true)
    }

    async fn release_lock(&self) {
        if !self.owns_lock.swap(false, Ordering::AcqRel) {
            return;
        }
        match fs::remove_file(&self.lock_path).await {
            Ok(()) => info!(lock_file = %self.lock_path.display(), "Removed lock file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(lock_file = %self.lock_path.display(), error = %e, "Failed to remove lock file"),
        }
    }
}

async fn read_owner(path: &Path) -> Option<LockOwner> {
    let content = fs::read(path).await.ok()?;
    serde_json::from_slice(&content).ok()
}

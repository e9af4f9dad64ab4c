//! One-off screen and delete commands.
//!
//! Each command class has a single in-flight slot. The slot is claimed
//! synchronously when a command is begun, so a second request is rejected
//! before any I/O, and released when the request future completes or is
//! dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::CommandError;
use crate::model::{file_name, CommandClass, GalleryEntry, InFlightFlags, ScreenPower};
use crate::transport::StatusTransport;

pub type CommandFuture<T> = BoxFuture<'static, Result<T, CommandError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The backend had already removed the photo; no new effect.
    AlreadyDeleted,
}

#[derive(Clone)]
pub struct CommandDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn StatusTransport>,
    armed: AtomicBool,
    screen_control: AtomicBool,
    delete_photo: AtomicBool,
    /// Paths acknowledged as deleted that the last poll still listed.
    deleted: Mutex<HashSet<String>>,
}

impl Inner {
    fn slot(&self, class: CommandClass) -> &AtomicBool {
        match class {
            CommandClass::ScreenControl => &self.screen_control,
            CommandClass::DeletePhoto => &self.delete_photo,
        }
    }
}

struct InFlightGuard {
    inner: Arc<Inner>,
    class: CommandClass,
}

impl InFlightGuard {
    fn acquire(inner: &Arc<Inner>, class: CommandClass) -> Result<Self, CommandError> {
        inner
            .slot(class)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CommandError::AlreadyInFlight(class))?;
        Ok(Self {
            inner: Arc::clone(inner),
            class,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.slot(self.class).store(false, Ordering::Release);
    }
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn StatusTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                armed: AtomicBool::new(false),
                screen_control: AtomicBool::new(false),
                delete_photo: AtomicBool::new(false),
                deleted: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Accept commands. Called when the session reaches `LoggedIn`.
    pub fn arm(&self) {
        self.inner.armed.store(true, Ordering::Release);
    }

    /// Reject further commands and forget remembered deletions.
    pub fn disarm(&self) {
        self.inner.armed.store(false, Ordering::Release);
        self.inner.deleted.lock().clear();
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> InFlightFlags {
        InFlightFlags {
            screen_control: self.inner.screen_control.load(Ordering::Acquire),
            delete_photo: self.inner.delete_photo.load(Ordering::Acquire),
        }
    }

    pub fn was_deleted(&self, path: &str) -> bool {
        self.inner.deleted.lock().contains(path)
    }

    /// Drop remembered deletions the backend no longer lists.
    pub fn reconcile(&self, gallery: &[GalleryEntry]) {
        let mut deleted = self.inner.deleted.lock();
        let before = deleted.len();
        deleted.retain(|path| gallery.iter().any(|entry| entry.path == *path));
        if deleted.len() != before {
            debug!(target: "frame::command", pruned = before - deleted.len(), "deletions confirmed by poll");
        }
    }

    pub fn begin_screen_power(&self, power: ScreenPower) -> Result<CommandFuture<()>, CommandError> {
        self.ensure_armed()?;
        let guard = InFlightGuard::acquire(&self.inner, CommandClass::ScreenControl)?;
        info!(target: "frame::command", %power, "screen command sent");

        Ok(async move {
            let result = guard.inner.transport.screen_control(power).await;
            drop(guard);
            result.map_err(|err| {
                warn!(target: "frame::command", %power, error = %err, kind = err.kind(), "screen command failed");
                CommandError::from(err)
            })
        }
        .boxed())
    }

    pub async fn set_screen_power(&self, power: ScreenPower) -> Result<(), CommandError> {
        self.begin_screen_power(power)?.await
    }

    /// Validate `path` against `gallery` and claim the delete slot. Only the
    /// final path segment is sent to the backend.
    pub fn begin_delete(
        &self,
        gallery: &[GalleryEntry],
        path: &str,
    ) -> Result<CommandFuture<DeleteOutcome>, CommandError> {
        self.ensure_armed()?;
        if self.was_deleted(path) {
            debug!(target: "frame::command", path, "photo already deleted");
            return Ok(future::ready(Ok(DeleteOutcome::AlreadyDeleted)).boxed());
        }
        if !gallery.iter().any(|entry| entry.path == path) {
            return Err(CommandError::NotInGallery(path.to_string()));
        }
        let photo = file_name(path)
            .ok_or_else(|| CommandError::InvalidPath(path.to_string()))?
            .to_string();
        let guard = InFlightGuard::acquire(&self.inner, CommandClass::DeletePhoto)?;
        let path = path.to_string();
        info!(target: "frame::command", %path, %photo, "delete sent");

        Ok(async move {
            let result = guard.inner.transport.delete_photo(&photo).await;
            let outcome = match result {
                Ok(()) => Ok(DeleteOutcome::Deleted),
                Err(err) if err.is_not_found() => {
                    debug!(target: "frame::command", %path, "backend reports photo already gone");
                    Ok(DeleteOutcome::AlreadyDeleted)
                }
                Err(err) => {
                    warn!(target: "frame::command", %path, error = %err, kind = err.kind(), "delete failed");
                    Err(CommandError::from(err))
                }
            };
            if outcome.is_ok() && guard.inner.armed.load(Ordering::Acquire) {
                guard.inner.deleted.lock().insert(path);
            }
            drop(guard);
            outcome
        }
        .boxed())
    }

    pub async fn delete_photo(
        &self,
        gallery: &[GalleryEntry],
        path: &str,
    ) -> Result<DeleteOutcome, CommandError> {
        self.begin_delete(gallery, path)?.await
    }

    fn ensure_armed(&self) -> Result<(), CommandError> {
        if self.is_armed() {
            Ok(())
        } else {
            Err(CommandError::NotLoggedIn)
        }
    }
}

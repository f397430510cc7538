//! In-memory views shared between the front end and background refreshes.
//!
//! Each view is a [`Versioned`] slot: a refresh takes a ticket before it
//! starts and may only publish if no refresh started after it has already
//! published. Overlapping refreshes therefore settle on the newest request
//! instead of whichever finished last.
//!
//! This is for front ends that keep both views alive and refresh them from
//! background tasks. The one-shot CLI commands query the fetcher and the
//! install directory directly.

use crate::core::github::{GitHubClient, Release};
use crate::core::installed;
use crate::error::Result;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Generation handed out when a refresh begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

struct Slot<T> {
    published: u64,
    value: Arc<T>,
}

pub struct Versioned<T> {
    next: AtomicU64,
    slot: Mutex<Slot<T>>,
}

impl<T: Default> Default for Versioned<T> {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            slot: Mutex::new(Slot {
                published: 0,
                value: Arc::new(T::default()),
            }),
        }
    }
}

impl<T> Versioned<T> {
    pub fn begin(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // the slot only ever holds a complete value, so poisoning is ignored
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes `value` unless a newer ticket already did. Returns whether it landed.
    pub fn publish(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.lock();
        if ticket.0 < slot.published {
            debug!(ticket = ticket.0, current = slot.published, "dropping stale refresh");
            return false;
        }
        slot.published = ticket.0;
        slot.value = Arc::new(value);
        true
    }

    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.lock().value)
    }
}

/// The "available releases" and "installed folders" views.
#[derive(Default)]
pub struct Session {
    available: Versioned<Vec<Release>>,
    installed: Versioned<Vec<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available(&self) -> Arc<Vec<Release>> {
        self.available.get()
    }

    pub fn installed(&self) -> Arc<Vec<String>> {
        self.installed.get()
    }

    pub async fn refresh_available(
        &self,
        client: &GitHubClient,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Release>>> {
        let ticket = self.available.begin();
        let releases = client.fetch_catalog(cancel).await?;
        self.available.publish(ticket, releases);
        Ok(self.available())
    }

    pub fn refresh_installed(&self, install_dir: &Path) -> Result<Arc<Vec<String>>> {
        let ticket = self.installed.begin();
        let names = installed::list_installed(install_dir)?;
        self.installed.publish(ticket, names);
        Ok(self.installed())
    }
}

//! Windowed registration of large trees.
//!
//! A [`RegistrationBatch`] buffers rows and hands them to
//! [`ReleaseRegistry::register_files`] every `batch_size` rows. Each window
//! commits on its own: when one fails, earlier windows stay committed and the
//! failing one leaves nothing behind in the registry. Its rows stay pending
//! and can be taken back with [`RegistrationBatch::into_pending`]. Re-running a partially completed
//! registration duplicates the rows that already landed.

use tracing::{debug, warn};

use crate::error::RegistryResult;
use crate::record::NewFileRelease;
use crate::traits::ReleaseRegistry;

/// Rows per committed window unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Progress reported after each committed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationProgress {
    /// Rows committed so far.
    pub committed: usize,
    /// Rows expected in total, when the caller announced it.
    pub total: Option<usize>,
}

impl RegistrationProgress {
    /// Completion percentage, if the total is known.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.committed.min(total) * 100) / total) as u8),
            None => None,
        }
    }
}

type Observer<'a> = Box<dyn FnMut(RegistrationProgress) + 'a>;

/// Scope for a multi-window registration.
///
/// Rows pushed after the last full window are only written by
/// [`finish`](Self::finish); dropping the batch without finishing discards
/// them.
pub struct RegistrationBatch<'a> {
    registry: &'a dyn ReleaseRegistry,
    batch_size: usize,
    pending: Vec<NewFileRelease>,
    committed: usize,
    total: Option<usize>,
    observer: Option<Observer<'a>>,
}

impl<'a> RegistrationBatch<'a> {
    /// A batch writing windows of `batch_size` rows (at least one).
    pub fn new(registry: &'a dyn ReleaseRegistry, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            registry,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            committed: 0,
            total: None,
            observer: None,
        }
    }

    /// Announce how many rows will be pushed, for percentage reporting.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Call `observer` synchronously after every committed window.
    pub fn with_observer(mut self, observer: impl FnMut(RegistrationProgress) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Rows committed so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Rows queued but not yet committed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Give up on the batch and take back the uncommitted rows.
    pub fn into_pending(mut self) -> Vec<NewFileRelease> {
        std::mem::take(&mut self.pending)
    }

    /// Queue a row, committing a window when it fills up.
    pub fn push(&mut self, row: NewFileRelease) -> RegistryResult<()> {
        self.pending.push(row);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit the remaining rows and return the total committed.
    pub fn finish(mut self) -> RegistryResult<usize> {
        if !self.pending.is_empty() {
            self.flush()?;
        }
        Ok(self.committed)
    }

    fn flush(&mut self) -> RegistryResult<()> {
        let window = std::mem::take(&mut self.pending);
        let written = match self.registry.register_files(&window) {
            Ok(written) => written,
            Err(e) => {
                self.pending = window;
                return Err(e);
            }
        };
        self.committed += written;
        let progress = RegistrationProgress {
            committed: self.committed,
            total: self.total,
        };
        debug!(
            committed = progress.committed,
            percent = ?progress.percent(),
            "registration window committed"
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(progress);
        }
        Ok(())
    }
}

impl Drop for RegistrationBatch<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                discarded = self.pending.len(),
                committed = self.committed,
                "registration batch dropped with uncommitted rows"
            );
        }
    }
}

impl std::fmt::Debug for RegistrationBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationBatch")
            .field("batch_size", &self.batch_size)
            .field("pending", &self.pending.len())
            .field("committed", &self.committed)
            .field("total", &self.total)
            .finish()
    }
}

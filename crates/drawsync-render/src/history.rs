//! Local undo/redo over full-canvas snapshots.
//!
//! History is per client and never touches the network. The manager keeps
//! the last committed snapshot as a baseline: committing pushes the
//! baseline onto the undo stack and captures the surface as the new one.
//! Every commit, undo and redo overwrites the persisted canvas so a
//! restart resumes from the latest state.

use crate::renderer::RenderError;
use crate::snapshot::Snapshot;
use crate::surface::Surface;
use drawsync_core::storage::{CANVAS_KEY, SnapshotStore, StorageError};
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Undo/redo stacks plus the persisted canvas.
pub struct HistoryManager<S: SnapshotStore> {
    store: Arc<S>,
    committed: Snapshot,
    /// Most recent last.
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
}

impl<S: SnapshotStore> HistoryManager<S> {
    /// Restore the persisted canvas onto `surface`, if there is one, and
    /// start with empty stacks.
    ///
    /// A stored value that cannot be decoded is logged and ignored; the
    /// canvas then starts blank. Storage failures are returned.
    pub fn open(store: Arc<S>, surface: &mut Surface) -> HistoryResult<Self> {
        match store.load(CANVAS_KEY) {
            Ok(url) => match Snapshot::from_data_url(&url).and_then(|s| s.decode()) {
                Ok(image) => {
                    log::info!(
                        "Restored persisted canvas ({}x{})",
                        image.width(),
                        image.height()
                    );
                    surface.load_image(&image);
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable persisted canvas: {}", e);
                    surface.clear();
                }
            },
            Err(StorageError::NotFound(_)) => {
                log::debug!("No persisted canvas, starting blank");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            store,
            committed: Snapshot::capture(surface)?,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    /// Bound the undo stack. The oldest entries are discarded first.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self.trim();
        self
    }

    /// Record the surface as a completed local action.
    pub fn commit(&mut self, surface: &Surface) -> HistoryResult<()> {
        let current = Snapshot::capture(surface)?;
        let previous = std::mem::replace(&mut self.committed, current);
        self.push_undo(previous);
        self.redo_stack.clear();
        self.persist()
    }

    /// Step back one committed action. Returns `false` if there was
    /// nothing to undo.
    pub fn undo(&mut self, surface: &mut Surface) -> HistoryResult<bool> {
        let Some(target) = self.undo_stack.last() else {
            return Ok(false);
        };
        let image = target.decode()?;
        let current = Snapshot::capture(surface)?;

        if let Some(target) = self.undo_stack.pop() {
            self.redo_stack.push(current);
            surface.load_image(&image);
            self.committed = target;
        }
        self.persist()?;
        Ok(true)
    }

    /// Re-apply the most recently undone action. Returns `false` if there
    /// was nothing to redo.
    pub fn redo(&mut self, surface: &mut Surface) -> HistoryResult<bool> {
        let Some(target) = self.redo_stack.last() else {
            return Ok(false);
        };
        let image = target.decode()?;
        let current = Snapshot::capture(surface)?;

        if let Some(target) = self.redo_stack.pop() {
            self.push_undo(current);
            surface.load_image(&image);
            self.committed = target;
        }
        self.persist()?;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        self.trim();
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }

    fn persist(&self) -> HistoryResult<()> {
        self.store.save(CANVAS_KEY, &self.committed.to_data_url())?;
        Ok(())
    }
}

impl<S: SnapshotStore> std::fmt::Debug for HistoryManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("limit", &self.limit)
            .finish()
    }
}

//! Auto-save dialog controller.
//!
//! Bridges one open form dialog to a [`DraftStore`]. Owns the save-state
//! view, the cached record id and the single-slot [`SaveQueue`], so that a
//! dialog never creates duplicate records and never issues overlapping
//! writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use super::queue::SaveQueue;
use super::state::{SaveStateView, SaveStatus};
use super::store::{DraftStore, DraftWrite, SavedDraft};
use super::{AutoSaveError, ERROR_CLEAR_DELAY, SAVED_MESSAGE, SAVING_MESSAGE};
use crate::eastern_time::format_eastern;
use crate::error::CoreError;
use crate::form_status::FormStatus;
use crate::forms::{FormSchema, FormSnapshot};
use crate::types::DbId;

/// Result of handing a snapshot to [`AutoSaveController::on_auto_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSaveOutcome {
    /// Nothing representative was filled in; no write issued.
    Skipped,
    /// A write was in flight; the snapshot now occupies the pending slot.
    Queued,
    /// This call drove the queue until it went idle.
    Flushed { writes: usize },
}

/// What [`AutoSaveController::enqueue`] did with a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// Nothing representative was filled in.
    Skipped,
    /// Parked in the pending slot behind an in-flight write.
    Queued,
    /// The queue was idle; this snapshot must be written via `drain`.
    Ready(FormSnapshot),
}

/// Pick the record id a write should target.
///
/// The synchronous cache wins over the reactive state, which wins over an id
/// carried in the snapshot. The cache is updated before any reactive
/// subscriber can observe the new id, so back-to-back saves always see it.
pub fn resolve_record_id(
    cached: Option<DbId>,
    reactive: Option<DbId>,
    embedded: Option<DbId>,
) -> Option<DbId> {
    cached.or(reactive).or(embedded)
}

/// Controller for a single form dialog instance.
pub struct AutoSaveController<S: DraftStore + ?Sized> {
    schema: &'static FormSchema,
    store: Arc<S>,
    queue: Mutex<SaveQueue<FormSnapshot>>,
    /// Synchronous record-id reference.
    record_ref: Mutex<Option<DbId>>,
    /// Serializes auto-save writes with submit.
    write_lock: tokio::sync::Mutex<()>,
    state: Arc<watch::Sender<SaveStateView>>,
    /// Bumped on open/close; results of writes started in an older session
    /// are not applied to the view or the cache.
    session: AtomicU64,
    /// Bumped on every state transition that supersedes an error banner.
    error_epoch: Arc<AtomicU64>,
    error_clear_delay: Duration,
}

impl<S: DraftStore + ?Sized> AutoSaveController<S> {
    pub fn new(schema: &'static FormSchema, store: Arc<S>) -> Self {
        let (state, _) = watch::channel(SaveStateView::default());
        Self {
            schema,
            store,
            queue: Mutex::new(SaveQueue::new()),
            record_ref: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
            state: Arc::new(state),
            session: AtomicU64::new(0),
            error_epoch: Arc::new(AtomicU64::new(0)),
            error_clear_delay: ERROR_CLEAR_DELAY,
        }
    }

    /// Override how long an error banner stays up.
    pub fn with_error_clear_delay(mut self, delay: Duration) -> Self {
        self.error_clear_delay = delay;
        self
    }

    pub fn schema(&self) -> &'static FormSchema {
        self.schema
    }

    /// Current save-state view.
    pub fn state(&self) -> SaveStateView {
        self.state.borrow().clone()
    }

    /// Receiver that observes every save-state change.
    pub fn subscribe(&self) -> watch::Receiver<SaveStateView> {
        self.state.subscribe()
    }

    /// The record id the next write would target, ignoring snapshot ids.
    pub fn record_id(&self) -> Option<DbId> {
        let cached = *self.lock_record_ref();
        let reactive = self.state.borrow().record_id;
        resolve_record_id(cached, reactive, None)
    }

    /// Closed -> open transition.
    ///
    /// Resets all save-state and seeds the cached id strictly from
    /// `initial`, never from a previous session.
    pub fn open(&self, initial: Option<&FormSnapshot>) {
        let seed = initial.and_then(FormSnapshot::record_id);
        self.session.fetch_add(1, Ordering::SeqCst);
        self.error_epoch.fetch_add(1, Ordering::SeqCst);
        self.lock_queue().discard_pending();
        *self.lock_record_ref() = seed;
        self.state.send_replace(SaveStateView::opened(seed));
        tracing::debug!(form_kind = %self.schema.kind, record_id = ?seed, "Form dialog opened");
    }

    /// Open -> closed transition.
    ///
    /// Clears transient save-state. In-flight writes are not aborted, but
    /// their results no longer reach this dialog. The cached id survives
    /// until the next [`open`](Self::open) re-seeds it.
    pub fn close(&self) {
        self.session.fetch_add(1, Ordering::SeqCst);
        self.error_epoch.fetch_add(1, Ordering::SeqCst);
        let dropped = self.lock_queue().discard_pending().is_some();
        self.state.send_modify(|s| {
            s.status = SaveStatus::Idle;
            s.message.clear();
            s.dirty = false;
        });
        tracing::debug!(form_kind = %self.schema.kind, dropped_pending = dropped, "Form dialog closed");
    }

    /// Background save of the current form snapshot.
    ///
    /// Never fails: errors surface in the save-state view and clear
    /// themselves after the error delay. Equivalent to [`enqueue`] followed
    /// by [`drain`] when the queue was idle.
    ///
    /// [`enqueue`]: Self::enqueue
    /// [`drain`]: Self::drain
    pub async fn on_auto_save(&self, snapshot: FormSnapshot) -> AutoSaveOutcome {
        match self.enqueue(snapshot) {
            Enqueued::Skipped => AutoSaveOutcome::Skipped,
            Enqueued::Queued => AutoSaveOutcome::Queued,
            Enqueued::Ready(first) => self.drain(first).await,
        }
    }

    /// Offer a snapshot to the save queue without writing.
    ///
    /// Callers that receive edits in order and write on other tasks must
    /// enqueue on the receiving task, so the pending slot always holds the
    /// latest edit. [`Enqueued::Ready`] hands the snapshot back; the caller
    /// then owns the write and must pass it to [`drain`](Self::drain).
    pub fn enqueue(&self, snapshot: FormSnapshot) -> Enqueued {
        if self.schema.is_empty_snapshot(&snapshot) {
            tracing::trace!(form_kind = %self.schema.kind, "Skipping auto-save of empty snapshot");
            return Enqueued::Skipped;
        }

        self.state.send_modify(|s| s.dirty = true);

        match self.lock_queue().offer(snapshot) {
            Some(first) => Enqueued::Ready(first),
            None => Enqueued::Queued,
        }
    }

    /// Write `first`, then every snapshot that lands in the pending slot
    /// meanwhile, until the queue goes idle.
    pub async fn drain(&self, first: FormSnapshot) -> AutoSaveOutcome {
        let mut next = first;
        let mut writes = 0;
        loop {
            writes += 1;
            // Failures are already reflected in the state view.
            let _ = self.persist(&next, FormStatus::Draft).await;

            let pending = self.lock_queue().complete();
            match pending {
                Some(snapshot) => next = snapshot,
                None => break,
            }
        }
        AutoSaveOutcome::Flushed { writes }
    }

    /// Final submission with the form's terminal status.
    ///
    /// Waits for any in-flight auto-save, discards the pending slot (this
    /// snapshot supersedes it) and propagates failures to the caller.
    pub async fn on_submit(&self, snapshot: FormSnapshot) -> Result<SavedDraft, AutoSaveError> {
        self.schema
            .validate_submission(&snapshot)
            .map_err(AutoSaveError::Validation)?;

        self.lock_queue().discard_pending();

        let saved = self
            .persist(&snapshot, self.schema.submit_status)
            .await
            .map_err(AutoSaveError::Store)?;

        tracing::info!(
            form_kind = %self.schema.kind,
            record_id = saved.id,
            status = %saved.status,
            "Form submitted"
        );
        Ok(saved)
    }

    /// Resolve the target id and perform one write.
    async fn persist(
        &self,
        snapshot: &FormSnapshot,
        status: FormStatus,
    ) -> Result<SavedDraft, CoreError> {
        let _write = self.write_lock.lock().await;
        let session = self.session.load(Ordering::SeqCst);

        let cached = *self.lock_record_ref();
        let reactive = self.state.borrow().record_id;
        let existing_id = resolve_record_id(cached, reactive, snapshot.record_id());

        self.error_epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.status = SaveStatus::Saving;
            s.message = SAVING_MESSAGE.to_string();
        });

        let result = self
            .store
            .upsert(DraftWrite {
                schema: self.schema,
                snapshot,
                existing_id,
                status,
                expected_version: None,
            })
            .await;

        if self.session.load(Ordering::SeqCst) != session {
            tracing::debug!(
                form_kind = %self.schema.kind,
                "Dialog closed or reopened during save; result not applied"
            );
            return result;
        }

        match &result {
            Ok(saved) => {
                *self.lock_record_ref() = Some(saved.id);
                let still_dirty = self.lock_queue().has_pending();
                self.state.send_modify(|s| {
                    s.status = SaveStatus::Saved;
                    s.message = SAVED_MESSAGE.to_string();
                    s.last_saved_at = Some(saved.updated_at);
                    s.last_saved_display = Some(format_eastern(saved.updated_at));
                    s.record_id = Some(saved.id);
                    s.dirty = still_dirty;
                });
                tracing::debug!(
                    form_kind = %self.schema.kind,
                    record_id = saved.id,
                    created = saved.created,
                    "Draft saved"
                );
            }
            Err(e) => {
                tracing::warn!(
                    form_kind = %self.schema.kind,
                    record_id = ?existing_id,
                    error = %e,
                    "Draft save failed"
                );
                self.show_error(format!("Save failed: {e}"));
            }
        }

        result
    }

    /// Show an error banner and schedule it to clear.
    fn show_error(&self, message: String) {
        let epoch = self.error_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.status = SaveStatus::Error;
            s.message = message;
        });

        let state = Arc::clone(&self.state);
        let error_epoch = Arc::clone(&self.error_epoch);
        let delay = self.error_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if error_epoch.load(Ordering::SeqCst) == epoch {
                state.send_modify(|s| {
                    if s.status == SaveStatus::Error {
                        s.status = SaveStatus::Idle;
                        s.message.clear();
                    }
                });
            }
        });
    }

    fn lock_queue(&self) -> MutexGuard<'_, SaveQueue<FormSnapshot>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_record_ref(&self) -> MutexGuard<'_, Option<DbId>> {
        self.record_ref.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Per-connection form dialog sessions.
//!
//! Each open dialog owns one [`AutoSaveController`] and one worker task.
//! Auto-save snapshots enter the controller's save queue on the task that
//! reads the socket, in message order; the worker performs the writes and
//! submits in the order they were requested. The save-state view is
//! streamed back to the client as `dialog.state` messages for as long as
//! the session exists.

use std::collections::HashMap;
use std::sync::Arc;

use chairside_core::autosave::{AutoSaveController, DraftStore, Enqueued, SaveStateView};
use chairside_core::forms::{FormKind, FormSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::ws::manager::WsSender;
use crate::ws::messages::ServerMessage;

pub type DialogController = AutoSaveController<dyn DraftStore>;

/// Work handed to a dialog's worker.
enum DialogCommand {
    /// Write this snapshot, then whatever reaches the pending slot meanwhile.
    Drain(FormSnapshot),
    Submit(FormSnapshot),
}

struct DialogSession {
    controller: Arc<DialogController>,
    commands: mpsc::UnboundedSender<DialogCommand>,
    forwarder: JoinHandle<()>,
}

/// Dialogs opened on one WebSocket connection, keyed by client-chosen id.
pub struct DialogRegistry {
    sender: WsSender,
    store: Arc<dyn DraftStore>,
    sessions: HashMap<String, DialogSession>,
}

impl DialogRegistry {
    pub fn new(sender: WsSender, store: Arc<dyn DraftStore>) -> Self {
        Self {
            sender,
            store,
            sessions: HashMap::new(),
        }
    }

    /// Open a dialog, reusing its controller when the id and kind match.
    ///
    /// Reopening re-seeds the record id strictly from `initial`.
    pub fn open(&mut self, dialog_id: &str, kind: FormKind, initial: Option<&FormSnapshot>) {
        if let Some(session) = self.sessions.get(dialog_id) {
            if session.controller.schema().kind == kind {
                session.controller.open(initial);
                return;
            }
        }
        // Dropping the old command sender lets its worker finish queued
        // writes and exit.
        if let Some(old) = self.sessions.remove(dialog_id) {
            old.forwarder.abort();
        }

        let controller: Arc<DialogController> =
            Arc::new(AutoSaveController::new(kind.schema(), Arc::clone(&self.store)));
        controller.open(initial);

        let forwarder = spawn_state_forwarder(
            dialog_id.to_string(),
            controller.subscribe(),
            self.sender.clone(),
        );
        let (commands, rx) = mpsc::unbounded_channel();
        spawn_worker(
            dialog_id.to_string(),
            Arc::clone(&controller),
            rx,
            self.sender.clone(),
        );

        self.sessions.insert(
            dialog_id.to_string(),
            DialogSession {
                controller,
                commands,
                forwarder,
            },
        );
    }

    pub fn controller(&self, dialog_id: &str) -> Option<Arc<DialogController>> {
        self.sessions
            .get(dialog_id)
            .map(|session| Arc::clone(&session.controller))
    }

    /// Queue an auto-save. Returns `false` for an unknown dialog.
    ///
    /// The snapshot is offered to the save queue before this returns; only
    /// the write itself happens on the dialog's worker.
    pub fn auto_save(&self, dialog_id: &str, snapshot: FormSnapshot) -> bool {
        let Some(session) = self.sessions.get(dialog_id) else {
            return false;
        };
        if let Enqueued::Ready(first) = session.controller.enqueue(snapshot) {
            session.send(dialog_id, DialogCommand::Drain(first));
        }
        true
    }

    /// Queue a submit behind every auto-save requested before it. The
    /// outcome is sent to the client as `dialog.submitted` or
    /// `dialog.submit_failed`. Returns `false` for an unknown dialog.
    pub fn submit(&self, dialog_id: &str, snapshot: FormSnapshot) -> bool {
        match self.sessions.get(dialog_id) {
            Some(session) => {
                session.send(dialog_id, DialogCommand::Submit(snapshot));
                true
            }
            None => false,
        }
    }

    /// Close a dialog. The session stays registered so a reopen reuses it.
    pub fn close(&self, dialog_id: &str) -> bool {
        match self.sessions.get(dialog_id) {
            Some(session) => {
                session.controller.close();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl DialogSession {
    fn send(&self, dialog_id: &str, command: DialogCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!(dialog_id = %dialog_id, "Dialog worker stopped, command dropped");
        }
    }
}

impl Drop for DialogRegistry {
    fn drop(&mut self) {
        // Workers drain what they were given; only the state stream stops.
        for session in self.sessions.values() {
            session.forwarder.abort();
        }
    }
}

/// Run one dialog's writes strictly in request order.
fn spawn_worker(
    dialog_id: String,
    controller: Arc<DialogController>,
    mut commands: mpsc::UnboundedReceiver<DialogCommand>,
    sender: WsSender,
) {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                DialogCommand::Drain(first) => {
                    controller.drain(first).await;
                }
                DialogCommand::Submit(snapshot) => {
                    let message = match controller.on_submit(snapshot).await {
                        Ok(record) => ServerMessage::DialogSubmitted {
                            dialog_id: dialog_id.clone(),
                            record,
                        },
                        Err(e) => ServerMessage::DialogSubmitFailed {
                            dialog_id: dialog_id.clone(),
                            error: e.to_string(),
                        },
                    };
                    let _ = sender.send(message.to_ws());
                }
            }
        }
        tracing::trace!(dialog_id = %dialog_id, "Dialog worker stopped");
    });
}

/// Push the current view, then every change, until the controller or the
/// connection goes away.
fn spawn_state_forwarder(
    dialog_id: String,
    mut rx: watch::Receiver<SaveStateView>,
    sender: WsSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let state = rx.borrow_and_update().clone();
            let message = ServerMessage::DialogState {
                dialog_id: dialog_id.clone(),
                state,
            };
            if sender.send(message.to_ws()).is_err() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        tracing::trace!(dialog_id = %dialog_id, "Dialog state forwarder stopped");
    })
}

// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connected-client session registry.
//!
//! One [`Session`] per live WebSocket connection. A session owns the
//! sending half of its bounded event channel and an atomic job slot:
//! at most one download job may be active per session, and the slot is
//! claimed with [`Session::try_begin_job`] before a job starts.
//!
//! Sessions are created on connect and removed on disconnect; nothing
//! persists across reconnects. Removing a session does not cancel its
//! running job; the job keeps its sink and simply loses its audience.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::relay::{SessionEvent, SessionSink};
use crate::security::{resilient_read, resilient_write};
use crate::utils::random_id;

/// Capacity of each session's event channel. A client that falls this far
/// behind starts losing progress events rather than slowing the download.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One connected client.
#[derive(Debug)]
pub struct Session {
    id: String,
    events: mpsc::Sender<SessionEvent>,
    busy: AtomicBool,
}

impl Session {
    fn new(events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            id: random_id(),
            events,
            busy: AtomicBool::new(false),
        }
    }

    /// Opaque server-assigned session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A fire-and-forget sink feeding this session's event channel.
    pub fn sink(&self) -> SessionSink {
        SessionSink::new(self.events.clone())
    }

    /// Whether a job is currently active for this session.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Atomically claim the session's job slot.
    ///
    /// Returns a guard that releases the slot on drop, or `None` when a job
    /// is already in flight.
    pub fn try_begin_job(self: &Arc<Self>) -> Option<JobGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(JobGuard {
                session: Arc::clone(self),
            })
        } else {
            None
        }
    }
}

/// Holds a session's job slot for the lifetime of one job.
#[derive(Debug)]
pub struct JobGuard {
    session: Arc<Session>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.session.busy.store(false, Ordering::SeqCst);
    }
}

/// Registry of live sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session around the given event sender.
    pub fn register(&self, events: mpsc::Sender<SessionEvent>) -> Arc<Session> {
        let session = Arc::new(Session::new(events));
        let mut sessions = resilient_write(&self.sessions);
        sessions.insert(session.id.clone(), Arc::clone(&session));
        tracing::info!(session_id = %session.id, "Client connected");
        session
    }

    /// Remove a session on disconnect.
    pub fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        let removed = resilient_write(&self.sessions).remove(session_id);
        if removed.is_some() {
            tracing::info!(session_id = %session_id, "Client disconnected");
        }
        removed
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        resilient_read(&self.sessions).get(session_id).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        resilient_read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

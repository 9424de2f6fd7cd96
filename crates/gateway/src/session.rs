//! Session lifecycle — one live tutoring session per connected student.
//!
//! A session is created by `POST /session/start`, bound to a socket by
//! `GET /ws/{session_id}`, and torn down by `POST /session/{id}/stop` or
//! by the socket closing. Sessions are fully independent: each owns its
//! working state, pending-request table, and loop control channels.

use oxtutor_bridge::PendingRequests;
use oxtutor_core::error::StoreError;
use oxtutor_core::{SessionState, StudentModel, StudentRepository};
use oxtutor_tools::ObservationState;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify, RwLock, watch};
use tracing::info;

/// Everything one session owns.
pub struct SessionHandle {
    pub session_id: String,
    pub student_id: String,
    pub session: Arc<Mutex<SessionState>>,
    pub student: Arc<Mutex<StudentModel>>,
    pub observation: Arc<Mutex<ObservationState>>,
    pub pending: Arc<PendingRequests>,

    /// Stop signal for the observation loop.
    pub stop: watch::Sender<bool>,

    /// Early-wake signal the trigger evaluation fires.
    pub wake: Arc<Notify>,

    /// Whether a socket is currently bound to this session.
    connected: AtomicBool,
}

impl SessionHandle {
    /// Mark the session connected. Returns false if a socket already is —
    /// a session takes exactly one client — or if the session has been
    /// shut down; a stopped loop never observes again, so rebinding a
    /// socket to it would only produce a dead session.
    pub fn try_connect(&self) -> bool {
        if *self.stop.borrow() {
            return false;
        }
        !self.connected.swap(true, Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Signal the loop to stop and fail every in-flight request.
    pub fn shut_down(&self) {
        let _ = self.stop.send(true);
        self.pending.fail_all();
    }
}

/// The live session table.
#[derive(Default)]
pub struct SessionManager {
    inner: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `student_id`: load their model (or create a
    /// default one for a new student) and set up fresh working state.
    pub async fn start(
        &self,
        student_id: &str,
        interval_seconds: f64,
        repository: &dyn StudentRepository,
    ) -> Result<Arc<SessionHandle>, StoreError> {
        let student = match repository.load(student_id).await? {
            Some(model) => model,
            None => repository.create_default(student_id).await?,
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        let (stop, _) = watch::channel(false);

        let handle = Arc::new(SessionHandle {
            session_id: session_id.clone(),
            student_id: student_id.to_string(),
            session: Arc::new(Mutex::new(SessionState::new(&session_id, student_id))),
            student: Arc::new(Mutex::new(student)),
            observation: Arc::new(Mutex::new(ObservationState::new(interval_seconds))),
            pending: Arc::new(PendingRequests::new()),
            stop,
            wake: Arc::new(Notify::new()),
            connected: AtomicBool::new(false),
        });

        self.inner
            .write()
            .await
            .insert(session_id.clone(), handle.clone());
        info!(session_id = %session_id, student_id, "Session started");
        Ok(handle)
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.inner.read().await.get(session_id).cloned()
    }

    /// Remove and shut down a session. Returns false if it did not exist.
    pub async fn stop(&self, session_id: &str) -> bool {
        let handle = self.inner.write().await.remove(session_id);
        match handle {
            Some(handle) => {
                handle.shut_down();
                info!(session_id, "Session stopped");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

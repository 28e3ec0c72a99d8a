//! In-memory session map keyed by session id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::funnel::Session;

/// Owns every live [`Session`]. Contents are lost on restart.
///
/// Each session sits behind its own lock so one conversation never waits on
/// another.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fetch the session for `id`, creating an idle one on first contact.
    pub async fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.get(id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id = %id, "New session");
            Arc::new(Mutex::new(Session::new()))
        });
        Arc::clone(session)
    }

    /// Copy of the session for `id`, if one exists.
    pub async fn snapshot(&self, id: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(id).cloned()?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

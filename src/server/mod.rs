//! The host's side of every document link.
//!
//! [`JupiterServer`] keeps one [`JupiterDocumentServer`] per document, created the first time an
//! activity mentions the document. Each document server holds one proxy engine per session
//! participant. The host is a participant like any other: its own editor talks to its proxy
//! through a local [`JupiterClient`](crate::JupiterClient).
//!
//! Locking is two-level. The registry lock is only held long enough to find (or create) a
//! document, then the document's own lock serialises work on that document. Different documents
//! can be transformed in parallel.

mod document;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, warn};
use crate::{ChecksumActivity, JupiterActivity, ResourcePath, ServerError, SessionContext, UserId};

pub use document::JupiterDocumentServer;

#[derive(Debug, Default)]
struct ServerState {
    documents: HashMap<ResourcePath, Arc<Mutex<JupiterDocumentServer>>>,
    users: HashSet<UserId>,
}

impl ServerState {
    fn get_or_create(&mut self, path: &ResourcePath) -> Arc<Mutex<JupiterDocumentServer>> {
        if let Some(doc) = self.documents.get(path) {
            return doc.clone();
        }

        debug!(%path, users = self.users.len(), "creating document server");
        let mut doc = JupiterDocumentServer::new(path.clone());
        for user in self.users.iter() {
            doc.add_proxy_client(user.clone());
        }
        let doc = Arc::new(Mutex::new(doc));
        self.documents.insert(path.clone(), doc.clone());
        doc
    }
}

#[derive(Debug)]
pub struct JupiterServer {
    session: SessionContext,
    state: Mutex<ServerState>,
}

impl JupiterServer {
    pub fn new(session: SessionContext) -> Self {
        let mut state = ServerState::default();
        state.users.insert(session.host.clone());
        Self { session, state: Mutex::new(state) }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The server for `path`, created (and seeded with every connected user) if needed.
    pub fn get(&self, path: &ResourcePath) -> Arc<Mutex<JupiterDocumentServer>> {
        self.state.lock().get_or_create(path)
    }

    /// `user` joined the session. They get a proxy in every existing document, and in every
    /// document created from now on.
    pub fn add_proxy_client(&self, user: UserId) {
        let mut state = self.state.lock();
        if !state.users.insert(user.clone()) {
            warn!(%user, "user is already connected");
        }
        for doc in state.documents.values() {
            doc.lock().add_proxy_client(user.clone());
        }
    }

    /// `user` left the session. Their proxies are dropped.
    pub fn remove_proxy_client(&self, user: &UserId) {
        if *user == self.session.host {
            warn!(%user, "refusing to remove the host");
            return;
        }

        let mut state = self.state.lock();
        state.users.remove(user);
        for doc in state.documents.values() {
            doc.lock().remove_proxy_client(user);
        }
    }

    pub fn is_connected(&self, user: &UserId) -> bool {
        self.state.lock().users.contains(user)
    }

    /// Every user connected to the session, the host included.
    pub fn users(&self) -> Vec<UserId> {
        self.state.lock().users.iter().cloned().collect()
    }

    /// Transform an operation from a participant and fan it out to everyone else.
    pub fn transform(&self, activity: &JupiterActivity) -> Result<HashMap<UserId, JupiterActivity>, ServerError> {
        let doc = {
            let mut state = self.state.lock();
            if !state.users.contains(&activity.source) {
                return Err(ServerError::UnknownUser(activity.source.clone()));
            }
            state.get_or_create(&activity.path)
        };

        let mut doc = doc.lock();
        doc.transform(activity)
    }

    /// Stamp the host's checksum for each other participant.
    ///
    /// The checksum of a document which no longer exists isn't stamped, and doesn't bring a
    /// document server for it back to life.
    pub fn with_timestamp(&self, checksum: &ChecksumActivity) -> HashMap<UserId, ChecksumActivity> {
        let doc = {
            let mut state = self.state.lock();
            if checksum.is_missing() && !state.documents.contains_key(&checksum.path) {
                return state.users.iter()
                    .filter(|user| **user != checksum.source)
                    .map(|user| (user.clone(), checksum.clone()))
                    .collect();
            }
            state.get_or_create(&checksum.path)
        };

        let doc = doc.lock();
        doc.with_timestamp(checksum)
    }

    /// Start `user`'s link for `path` over. Returns false if there was nothing to reset.
    pub fn reset(&self, path: &ResourcePath, user: &UserId) -> bool {
        let doc = self.state.lock().documents.get(path).cloned();
        match doc {
            Some(doc) => doc.lock().reset(user),
            None => false,
        }
    }

    /// Drop all state for `path`. The next activity for it starts from scratch.
    pub fn remove_path(&self, path: &ResourcePath) -> bool {
        let removed = self.state.lock().documents.remove(path).is_some();
        if removed {
            debug!(%path, "removed document server");
        }
        removed
    }

    pub fn paths(&self) -> Vec<ResourcePath> {
        self.state.lock().documents.keys().cloned().collect()
    }
}

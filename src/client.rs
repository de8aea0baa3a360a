use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, warn};
use crate::{ChecksumActivity, Config, Jupiter, JupiterActivity, Operation, ResourcePath, SessionContext, TransformationError, VectorTime};

/// The client ends of every document link a participant has with the host.
///
/// Engines are created lazily the first time a document is touched, in either direction. That
/// doesn't involve the network at all - the host creates its matching engine just as lazily.
#[derive(Debug)]
pub struct JupiterClient {
    session: SessionContext,
    config: Config,
    documents: Mutex<HashMap<ResourcePath, Arc<Mutex<Jupiter>>>>,
}

impl JupiterClient {
    pub fn new(session: SessionContext, config: Config) -> Self {
        Self {
            session,
            config,
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The engine for `path`, created if this is the first we've heard of it.
    pub fn get(&self, path: &ResourcePath) -> Arc<Mutex<Jupiter>> {
        let mut documents = self.documents.lock();
        documents.entry(path.clone())
            .or_insert_with(|| {
                debug!(%path, "creating client engine");
                Arc::new(Mutex::new(Jupiter::new_client()))
            })
            .clone()
    }

    /// Stamp a locally generated operation for sending to the host. The operation must already
    /// have been applied to the local document.
    pub fn generate(&self, path: &ResourcePath, operation: Operation) -> JupiterActivity {
        let jupiter = self.get(path);
        let mut jupiter = jupiter.lock();
        let timestamp = jupiter.generate(&operation);

        let pending = jupiter.unacknowledged_len();
        if pending > self.config.ack_queue_warn_len {
            warn!(%path, pending, "host hasn't acknowledged our operations");
        }

        JupiterActivity::new(self.session.local_user.clone(), path.clone(), timestamp, operation)
    }

    /// Like [`generate`](Self::generate), but only for documents which already have an engine.
    /// The registry stays locked throughout, so a concurrent [`reset`](Self::reset) either
    /// happens first (and nothing is generated) or afterwards.
    pub fn generate_existing(&self, path: &ResourcePath, operation: Operation) -> Option<JupiterActivity> {
        let documents = self.documents.lock();
        let mut jupiter = documents.get(path)?.lock();
        let timestamp = jupiter.generate(&operation);
        Some(JupiterActivity::new(self.session.local_user.clone(), path.clone(), timestamp, operation))
    }

    /// Transform an operation from the host so it applies to our copy of the document.
    pub fn receive(&self, activity: &JupiterActivity) -> Result<Operation, TransformationError> {
        let jupiter = self.get(&activity.path);
        let mut jupiter = jupiter.lock();
        jupiter.receive(activity.timestamp, &activity.operation)
    }

    pub fn with_timestamp(&self, checksum: &ChecksumActivity) -> ChecksumActivity {
        self.get(&checksum.path).lock().with_timestamp(checksum)
    }

    /// Was `checksum` computed by the host at the document state we're at right now? If not,
    /// comparing it against our document would report differences which will sort themselves out
    /// once the messages in flight arrive.
    pub fn is_current(&self, checksum: &ChecksumActivity) -> bool {
        match checksum.timestamp {
            Some(timestamp) => self.get(&checksum.path).lock().is_current(&timestamp),
            None => false,
        }
    }

    /// Our timestamp for `path`, if we're tracking it.
    pub fn timestamp(&self, path: &ResourcePath) -> Option<VectorTime> {
        self.documents.lock().get(path).map(|j| j.lock().timestamp())
    }

    /// Forget `path`. Returns false if it wasn't tracked.
    pub fn reset(&self, path: &ResourcePath) -> bool {
        let removed = self.documents.lock().remove(path).is_some();
        if removed {
            debug!(%path, "reset client engine");
        }
        removed
    }

    pub fn reset_all(&self) {
        let mut documents = self.documents.lock();
        debug!(count = documents.len(), "resetting all client engines");
        documents.clear();
    }

    /// Every document with an engine.
    pub fn paths(&self) -> Vec<ResourcePath> {
        self.documents.lock().keys().cloned().collect()
    }
}

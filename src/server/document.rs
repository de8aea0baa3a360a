use std::collections::HashMap;
use tracing::{debug, trace};
use crate::{ChecksumActivity, Jupiter, JupiterActivity, ResourcePath, ServerError, UserId};

/// The host's side of one document. There is one proxy engine per participant (the host's own
/// editor included), each modelling what that participant has seen so far.
#[derive(Debug, Clone)]
pub struct JupiterDocumentServer {
    path: ResourcePath,
    proxies: HashMap<UserId, Jupiter>,
}

impl JupiterDocumentServer {
    pub fn new(path: ResourcePath) -> Self {
        Self { path, proxies: HashMap::new() }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Start tracking `user`. A new participant starts from the host's current content, so its
    /// proxy starts from zero too. Returns false (and keeps the existing proxy) if `user` is
    /// already tracked.
    pub fn add_proxy_client(&mut self, user: UserId) -> bool {
        if self.proxies.contains_key(&user) { return false; }
        debug!(path = %self.path, %user, "adding proxy");
        self.proxies.insert(user, Jupiter::new_server());
        true
    }

    pub fn remove_proxy_client(&mut self, user: &UserId) -> bool {
        let removed = self.proxies.remove(user).is_some();
        if removed {
            debug!(path = %self.path, %user, "removed proxy");
        }
        removed
    }

    /// Start `user`'s proxy over from scratch. Returns false if `user` isn't tracked.
    pub fn reset(&mut self, user: &UserId) -> bool {
        match self.proxies.get_mut(user) {
            Some(proxy) => {
                debug!(path = %self.path, %user, "resetting proxy");
                proxy.reset();
                true
            }
            None => false,
        }
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.proxies.keys()
    }

    pub fn proxy(&self, user: &UserId) -> Option<&Jupiter> {
        self.proxies.get(user)
    }

    /// Apply an operation from one participant and produce the copy of it each other
    /// participant should receive.
    ///
    /// The operation is first transformed into the host's current document state through the
    /// sender's proxy. Every other proxy then generates it, which stamps it for that recipient.
    /// Nothing changes if the sender's proxy rejects the operation.
    pub fn transform(&mut self, activity: &JupiterActivity) -> Result<HashMap<UserId, JupiterActivity>, ServerError> {
        let source = &activity.source;
        let proxy = self.proxies.get_mut(source)
            .ok_or_else(|| ServerError::UnknownUser(source.clone()))?;

        let operation = proxy.receive(activity.timestamp, &activity.operation)
            .map_err(|e| ServerError::Transformation {
                user: source.clone(),
                path: self.path.clone(),
                source: e,
            })?;

        let mut result = HashMap::with_capacity(self.proxies.len().saturating_sub(1));
        for (user, proxy) in self.proxies.iter_mut() {
            if user == source { continue; }
            let timestamp = proxy.generate(&operation);
            result.insert(user.clone(), JupiterActivity::new(
                source.clone(),
                self.path.clone(),
                timestamp,
                operation.clone(),
            ));
        }

        trace!(path = %self.path, %source, %operation, recipients = result.len(), "fanned out");
        Ok(result)
    }

    /// Stamp the host's checksum for every participant other than whoever computed it.
    pub fn with_timestamp(&self, checksum: &ChecksumActivity) -> HashMap<UserId, ChecksumActivity> {
        self.proxies.iter()
            .filter(|(user, _)| **user != checksum.source)
            .map(|(user, proxy)| (user.clone(), proxy.with_timestamp(checksum)))
            .collect()
    }
}

use std::collections::HashSet;
use parking_lot::Mutex;
use tracing::{debug, error, warn};
use crate::{Activity, FileActivityKind, JupiterServer, ResourceActivityFilter, ResourcePath, ServerError, SessionContext, UserId};

/// An activity together with who it should be delivered to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QueueItem {
    pub recipients: Vec<UserId>,
    pub activity: Activity,
}

impl QueueItem {
    pub fn new(recipients: Vec<UserId>, activity: Activity) -> Self {
        Self { recipients, activity }
    }
}

/// Split delivery instructions into the activities `local_user` should apply directly and the
/// ones which need to go over the network. `local_user` is removed from the recipients of the
/// latter, and items with nobody left to deliver to are dropped.
pub fn split_local(items: Vec<QueueItem>, local_user: &UserId) -> (Vec<Activity>, Vec<QueueItem>) {
    let mut local = Vec::new();
    let mut remote = Vec::new();

    for mut item in items {
        let before = item.recipients.len();
        item.recipients.retain(|user| user != local_user);

        if item.recipients.len() == before {
            remote.push(item);
        } else if item.recipients.is_empty() {
            local.push(item.activity);
        } else {
            local.push(item.activity.clone());
            remote.push(item);
        }
    }

    (local, remote)
}

/// The host's entry point for activities coming from participants (and from the host's own
/// [`ConcurrentDocumentClient`](crate::ConcurrentDocumentClient)).
///
/// Activities go through the deletion filter, then jupiter activities are transformed and fanned
/// out. Other activities are forwarded to everyone except their source.
#[derive(Debug)]
pub struct ConcurrentDocumentServer {
    server: JupiterServer,
    filter: Mutex<ResourceActivityFilter>,
    inconsistent: Mutex<HashSet<(UserId, ResourcePath)>>,
}

impl ConcurrentDocumentServer {
    pub fn new(session: SessionContext) -> Self {
        if !session.is_host() {
            warn!(local_user = %session.local_user, host = %session.host, "document server created by a non-host");
        }
        Self {
            server: JupiterServer::new(session),
            filter: Mutex::new(ResourceActivityFilter::new()),
            inconsistent: Mutex::new(HashSet::new()),
        }
    }

    pub fn jupiter(&self) -> &JupiterServer {
        &self.server
    }

    fn host(&self) -> &UserId {
        &self.server.session().host
    }

    /// Everyone but `source`.
    fn others(&self, source: &UserId) -> Vec<UserId> {
        let mut users = self.server.users();
        users.retain(|user| user != source);
        users.sort();
        users
    }

    /// Process one activity. Returns the deliveries it results in, which may be none.
    pub fn transform_incoming(&self, activity: Activity) -> Vec<QueueItem> {
        let path = activity.path().clone();
        let source = activity.source().clone();

        if let Activity::DeletionAcknowledgment(_) = activity {
            self.filter.lock().acknowledge(&path, &source);
            return Vec::new();
        }

        // Held until the activity is processed. A deletion must not land between the filter check
        // and the transform.
        let mut filter = self.filter.lock();
        if filter.is_filtered(&activity) {
            debug!(%path, %source, kind = activity.kind_name(), "dropping activity for deleted resource");
            return Vec::new();
        }

        if let Activity::File(file) = &activity {
            match file.kind {
                FileActivityKind::Removed => {
                    let users = self.server.users();
                    filter.resource_deleted(&path, &source, self.host(), users.iter());
                    self.server.remove_path(&path);
                }
                FileActivityKind::Created => filter.resource_created(&path),
            }
        }

        match activity {
            Activity::Jupiter(jupiter_activity) => match self.server.transform(&jupiter_activity) {
                Ok(outgoing) => {
                    let mut items: Vec<QueueItem> = outgoing.into_iter()
                        .map(|(user, a)| QueueItem::new(vec![user], a.into()))
                        .collect();
                    items.sort_by(|a, b| a.recipients.cmp(&b.recipients));
                    items
                }
                Err(ServerError::UnknownUser(user)) => {
                    warn!(%path, %user, "dropping operation from a user who isn't in the session");
                    Vec::new()
                }
                Err(e) if matches!(e.transformation_error(), Some(t) if t.is_duplicate()) => {
                    warn!(%path, %source, "dropping duplicate operation: {}", e);
                    Vec::new()
                }
                Err(e) => {
                    error!(%path, %source, "dropping operation: {}", e);
                    self.inconsistent.lock().insert((source, path));
                    Vec::new()
                }
            },

            Activity::Checksum(checksum) => {
                let mut items: Vec<QueueItem> = self.server.with_timestamp(&checksum)
                    .into_iter()
                    .map(|(user, c)| QueueItem::new(vec![user], c.into()))
                    .collect();
                items.sort_by(|a, b| a.recipients.cmp(&b.recipients));
                items
            }

            Activity::TextEdit(_) => {
                warn!(%path, %source, "text edits must be converted to jupiter activities before reaching the host");
                Vec::new()
            }

            other => {
                let recipients = self.others(&source);
                if recipients.is_empty() { Vec::new() } else { vec![QueueItem::new(recipients, other)] }
            }
        }
    }

    /// `user` joined and is ready to receive activities.
    pub fn user_started_queuing(&self, user: UserId) {
        debug!(%user, "user joined");
        self.server.add_proxy_client(user);
    }

    pub fn user_left(&self, user: &UserId) {
        debug!(%user, "user left");
        self.server.remove_proxy_client(user);
        self.filter.lock().user_left(user);
    }

    /// Start `user`'s link for `path` over, eg after they resynchronised the document.
    pub fn reset(&self, path: &ResourcePath, user: &UserId) -> bool {
        self.server.reset(path, user)
    }

    pub fn is_filtering(&self, path: &ResourcePath) -> bool {
        self.filter.lock().is_filtering(path)
    }

    /// Drain the (user, document) links which failed to transform since the last call.
    pub fn take_inconsistent_paths(&self) -> HashSet<(UserId, ResourcePath)> {
        std::mem::take(&mut *self.inconsistent.lock())
    }
}

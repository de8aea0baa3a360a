use std::collections::HashSet;
use parking_lot::Mutex;
use tracing::{debug, error, warn};
use crate::{Activity, ChecksumActivity, Config, FileActivityKind, HeartbeatSource, JupiterActivity, JupiterClient, Operation, ResourcePath, SessionContext, TextEditActivity};

/// Translates between editor activities and jupiter activities on a participant's side of the
/// session. The host runs one of these too, for its own editor.
///
/// Nothing here returns errors. Operations which can't be transformed are logged, dropped, and
/// their document is recorded as inconsistent until someone calls
/// [`take_inconsistent_paths`](Self::take_inconsistent_paths).
#[derive(Debug)]
pub struct ConcurrentDocumentClient {
    jupiter: JupiterClient,
    inconsistent: Mutex<HashSet<ResourcePath>>,
}

impl ConcurrentDocumentClient {
    pub fn new(session: SessionContext) -> Self {
        Self::with_config(session, Config::default())
    }

    pub fn with_config(session: SessionContext, config: Config) -> Self {
        Self {
            jupiter: JupiterClient::new(session, config),
            inconsistent: Mutex::new(HashSet::new()),
        }
    }

    pub fn jupiter(&self) -> &JupiterClient {
        &self.jupiter
    }

    /// Prepare a local activity for sending to the host. Text edits become jupiter activities and
    /// checksums are stamped. Anything else is passed through.
    ///
    /// Text edits must already be applied to the local document.
    pub fn transform_to_jupiter(&self, activity: Activity) -> Activity {
        match activity {
            Activity::TextEdit(edit) => {
                Activity::Jupiter(self.jupiter.generate(&edit.path, edit.to_operation()))
            }
            Activity::Checksum(checksum) => {
                Activity::Checksum(self.jupiter.with_timestamp(&checksum))
            }
            Activity::File(file) if file.kind == FileActivityKind::Removed => {
                self.jupiter.reset(&file.path);
                Activity::File(file)
            }
            other => other,
        }
    }

    /// Turn an activity from the host into the activities to apply locally.
    ///
    /// A jupiter activity becomes zero or more text edits, applied in order. Checksums which were
    /// computed at a different document state than ours are dropped, since comparing them would
    /// report differences which are still in flight.
    pub fn transform_from_jupiter(&self, activity: Activity) -> Vec<Activity> {
        match activity {
            Activity::Jupiter(jupiter_activity) => self.receive(&jupiter_activity),

            Activity::Checksum(checksum) if checksum.is_missing() => {
                // The document is gone. Whatever we knew about it is useless now.
                self.jupiter.reset(&checksum.path);
                vec![Activity::Checksum(checksum)]
            }
            Activity::Checksum(checksum) => {
                if self.jupiter.is_current(&checksum) {
                    vec![Activity::Checksum(checksum)]
                } else {
                    debug!(path = %checksum.path, "dropping stale checksum");
                    Vec::new()
                }
            }

            Activity::File(file) if file.kind == FileActivityKind::Removed => {
                self.jupiter.reset(&file.path);
                vec![Activity::File(file)]
            }

            other => vec![other],
        }
    }

    fn receive(&self, activity: &JupiterActivity) -> Vec<Activity> {
        let path = &activity.path;
        match self.jupiter.receive(activity) {
            Ok(operation) => operation.text_edits()
                .into_iter()
                .map(|edit| TextEditActivity::from_edit(activity.source.clone(), path.clone(), edit).into())
                .collect(),
            Err(e) if e.is_duplicate() => {
                warn!(%path, source = %activity.source, timestamp = %activity.timestamp, "dropping duplicate operation: {}", e);
                Vec::new()
            }
            Err(e) => {
                error!(%path, source = %activity.source, timestamp = %activity.timestamp, "dropping operation: {}", e);
                self.inconsistent.lock().insert(path.clone());
                Vec::new()
            }
        }
    }

    /// Compute the authoritative checksum of `content`, or of a missing document if `content` is
    /// `None`. Only the host's checksums mean anything.
    pub fn checksum(&self, path: &ResourcePath, content: Option<&str>) -> ChecksumActivity {
        let session = self.jupiter.session();
        if !session.is_host() {
            warn!(%path, "only the host should compute authoritative checksums");
        }
        let checksum = match content {
            Some(content) => ChecksumActivity::new(session.local_user.clone(), path.clone(), content),
            None => ChecksumActivity::missing(session.local_user.clone(), path.clone()),
        };
        self.jupiter.with_timestamp(&checksum)
    }

    /// The activity to send to the host once we've processed the deletion of `path`.
    pub fn acknowledge_deletion(&self, path: &ResourcePath) -> Activity {
        self.jupiter.reset(path);
        Activity::deletion_acknowledgment(self.jupiter.session().local_user.clone(), path.clone())
    }

    pub fn reset(&self, path: &ResourcePath) -> bool {
        self.jupiter.reset(path)
    }

    pub fn reset_all(&self) {
        self.jupiter.reset_all();
    }

    /// Our write access changed. Engines from before the change can't be trusted afterwards,
    /// since edits we couldn't make were never counted.
    pub fn permission_changed(&self, can_write: bool) {
        debug!(can_write, "write permission changed, resetting all documents");
        self.reset_all();
    }

    /// Drain the documents which failed to transform since the last call. These need a
    /// consistency check.
    pub fn take_inconsistent_paths(&self) -> HashSet<ResourcePath> {
        std::mem::take(&mut *self.inconsistent.lock())
    }
}

impl HeartbeatSource for ConcurrentDocumentClient {
    fn heartbeat(&self) -> Vec<Activity> {
        let paths = self.jupiter.paths();
        if paths.is_empty() { return Vec::new(); }

        debug!(count = paths.len(), "sending heartbeat");
        // Documents reset since the snapshot are skipped rather than recreated.
        paths.iter()
            .filter_map(|path| self.jupiter.generate_existing(path, Operation::NoOperation))
            .map(Activity::Jupiter)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use tracing_test::traced_test;
    use crate::{UserId, VectorTime};
    use super::*;

    fn alice() -> ConcurrentDocumentClient {
        ConcurrentDocumentClient::new(SessionContext::new(UserId::from("alice"), UserId::from("host")))
    }

    #[test]
    fn edits_become_jupiter_activities() {
        let client = alice();
        let path = ResourcePath::from("/doc.txt");
        let edit = TextEditActivity::new(UserId::from("alice"), path.clone(), 0, "ab", "xyz");

        let Activity::Jupiter(a) = client.transform_to_jupiter(edit.into()) else { panic!("expected a jupiter activity") };
        assert_eq!(a.timestamp, VectorTime::ZERO);
        assert_eq!(a.operation, Operation::from_replace(0, "ab", "xyz"));

        // Other activities pass straight through.
        let save = Activity::editor(UserId::from("alice"), path, crate::EditorActivityKind::Saved);
        assert_eq!(client.transform_to_jupiter(save.clone()), save);
    }

    #[test]
    fn incoming_operations_become_edits() {
        let client = alice();
        let host = UserId::from("host");
        let path = ResourcePath::from("/doc.txt");

        let op = Operation::new_split(Operation::new_delete(5, "xx"), Operation::new_insert(0, "yy"));
        let incoming = JupiterActivity::new(host.clone(), path.clone(), VectorTime::ZERO, op);
        let edits = client.transform_from_jupiter(incoming.into());
        assert_eq!(edits, vec![
            TextEditActivity::delete(host.clone(), path.clone(), 5, "xx").into(),
            TextEditActivity::insert(host.clone(), path.clone(), 0, "yy").into(),
        ]);

        let noop = JupiterActivity::new(host, path, VectorTime::new(1, 0), Operation::NoOperation);
        assert!(client.transform_from_jupiter(noop.into()).is_empty());
    }

    #[test]
    #[traced_test]
    fn failures_are_recorded_not_raised() {
        let client = alice();
        let path = ResourcePath::from("/doc.txt");

        let bad = JupiterActivity::new(UserId::from("host"), path.clone(), VectorTime::new(4, 0), Operation::new_insert(0, "x"));
        assert!(client.transform_from_jupiter(bad.into()).is_empty());
        assert!(logs_contain("dropping operation"));

        let inconsistent = client.take_inconsistent_paths();
        assert!(inconsistent.contains(&path));
        assert!(client.take_inconsistent_paths().is_empty());
    }

    #[test]
    #[traced_test]
    fn duplicates_are_dropped_quietly() {
        let client = alice();
        let path = ResourcePath::from("/doc.txt");

        let first = JupiterActivity::new(UserId::from("host"), path.clone(), VectorTime::ZERO, Operation::new_insert(0, "x"));
        assert_eq!(client.transform_from_jupiter(first.clone().into()).len(), 1);
        assert!(client.transform_from_jupiter(first.into()).is_empty());

        assert!(logs_contain("dropping duplicate operation"));
        assert!(client.take_inconsistent_paths().is_empty());
        assert_eq!(client.jupiter().timestamp(&path), Some(VectorTime::new(0, 1)));
    }

    #[test]
    fn stale_checksums_are_dropped() {
        let client = alice();
        let host = UserId::from("host");
        let path = ResourcePath::from("/doc.txt");

        let checksum = ChecksumActivity::new(host.clone(), path.clone(), "x");
        let current = checksum.with_timestamp(VectorTime::ZERO);
        assert_eq!(client.transform_from_jupiter(current.clone().into()).len(), 1);

        // We've made an edit the host hasn't seen.
        client.transform_to_jupiter(TextEditActivity::insert(UserId::from("alice"), path.clone(), 0, "y").into());
        assert!(client.transform_from_jupiter(current.into()).is_empty());

        // The missing-document checksum always gets through, and resets the document.
        let gone = ChecksumActivity::missing(host, path.clone()).with_timestamp(VectorTime::new(9, 9));
        assert_eq!(client.transform_from_jupiter(gone.into()).len(), 1);
        assert_eq!(client.jupiter().timestamp(&path), None);
    }

    #[test]
    fn removal_resets() {
        let client = alice();
        let path = ResourcePath::from("/doc.txt");
        client.transform_to_jupiter(TextEditActivity::insert(UserId::from("alice"), path.clone(), 0, "y").into());

        let removed = Activity::file(UserId::from("bob"), path.clone(), FileActivityKind::Removed);
        assert_eq!(client.transform_from_jupiter(removed.clone()), vec![removed]);
        assert_eq!(client.jupiter().timestamp(&path), None);

        let ack = client.acknowledge_deletion(&path);
        assert_eq!(ack, Activity::deletion_acknowledgment(UserId::from("alice"), path));
    }

    #[test]
    fn heartbeat_covers_every_document() {
        let client = alice();
        assert!(client.heartbeat().is_empty());

        let a = ResourcePath::from("/a.txt");
        let b = ResourcePath::from("/b.txt");
        client.transform_to_jupiter(TextEditActivity::insert(UserId::from("alice"), a.clone(), 0, "y").into());
        client.jupiter().get(&b);

        let beats = client.heartbeat();
        assert_eq!(beats.len(), 2);
        for beat in beats {
            let Activity::Jupiter(j) = beat else { panic!("expected a jupiter activity") };
            assert_eq!(j.operation, Operation::NoOperation);
        }
        assert_eq!(client.jupiter().timestamp(&a), Some(VectorTime::new(2, 0)));
    }

    #[test]
    fn host_checksums() {
        let host = ConcurrentDocumentClient::new(SessionContext::host(UserId::from("host")));
        let path = ResourcePath::from("/doc.txt");
        let checksum = host.checksum(&path, Some("abc"));
        assert!(checksum.matches(Some("abc")));
        assert_eq!(checksum.timestamp, Some(VectorTime::ZERO));
        assert!(host.checksum(&path, None).is_missing());
    }

    #[test]
    fn permission_change_resets_everything() {
        let client = alice();
        client.jupiter().get(&ResourcePath::from("/a.txt"));
        client.permission_changed(false);
        assert!(client.jupiter().paths().is_empty());
    }
}

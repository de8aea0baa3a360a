//! Suppress activities for documents which are being deleted.
//!
//! When a document is deleted, every participant tears down its engine for it when the deletion
//! reaches them. Until then they can still send edits made against the old engine, and the host
//! must not feed those into the fresh engine it would otherwise create. So the host drops
//! activities for the path until every participant has acknowledged the deletion.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use crate::{Activity, EditorActivityKind, FileActivityKind, ResourcePath, UserId};

#[derive(Debug, Clone, Default)]
pub struct ResourceActivityFilter {
    /// Path -> users who haven't acknowledged the deletion yet. Paths are only present while
    /// filtering.
    deleted: HashMap<ResourcePath, HashSet<UserId>>,
}

impl ResourceActivityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `deleter` deleted `path`. Everyone in `users` other than the host and the deleter has to
    /// acknowledge the deletion before activities for `path` are let through again.
    pub fn resource_deleted<'a, I>(&mut self, path: &ResourcePath, deleter: &UserId, host: &UserId, users: I)
        where I: IntoIterator<Item = &'a UserId>
    {
        let pending: HashSet<UserId> = users.into_iter()
            .filter(|user| *user != host && *user != deleter)
            .cloned()
            .collect();

        if pending.is_empty() {
            debug!(%path, "deleted with nobody to wait for");
            self.deleted.remove(path);
        } else {
            debug!(%path, pending = pending.len(), "filtering deleted resource");
            self.deleted.insert(path.clone(), pending);
        }
    }

    /// `path` exists again. Stop filtering it.
    pub fn resource_created(&mut self, path: &ResourcePath) {
        if self.deleted.remove(path).is_some() {
            debug!(%path, "resource recreated, no longer filtering");
        }
    }

    pub fn acknowledge(&mut self, path: &ResourcePath, user: &UserId) {
        let Some(pending) = self.deleted.get_mut(path) else { return; };
        pending.remove(user);
        if pending.is_empty() {
            debug!(%path, "all deletion acknowledgments received");
            self.deleted.remove(path);
        } else {
            debug!(%path, %user, remaining = pending.len(), "deletion acknowledged");
        }
    }

    /// `user` left the session. Nobody waits for their acknowledgments anymore.
    pub fn user_left(&mut self, user: &UserId) {
        self.deleted.retain(|path, pending| {
            pending.remove(user);
            if pending.is_empty() {
                debug!(%path, "remaining users left, no longer filtering");
            }
            !pending.is_empty()
        });
    }

    pub fn is_filtering(&self, path: &ResourcePath) -> bool {
        self.deleted.contains_key(path)
    }

    /// Users we're still waiting on for `path`.
    pub fn pending(&self, path: &ResourcePath) -> Option<&HashSet<UserId>> {
        self.deleted.get(path)
    }

    /// Should `activity` be dropped? Only the activities which let the deletion finish get through:
    /// the checksum confirming the document is gone, editors closing it, acknowledgments, and
    /// the document being created again.
    pub fn is_filtered(&self, activity: &Activity) -> bool {
        if !self.is_filtering(activity.path()) { return false; }

        let passes = match activity {
            Activity::Checksum(c) => c.is_missing(),
            Activity::Editor(e) => e.kind == EditorActivityKind::Closed,
            Activity::DeletionAcknowledgment(_) => true,
            Activity::File(f) => f.kind == FileActivityKind::Created,
            Activity::TextEdit(_) | Activity::Jupiter(_) => false,
        };
        !passes
    }
}

#[cfg(test)]
mod test {
    use crate::{ChecksumActivity, JupiterActivity, Operation, TextEditActivity, VectorTime};
    use super::*;

    struct Users { host: UserId, alice: UserId, bob: UserId, carol: UserId }

    fn users() -> Users {
        Users {
            host: UserId::from("host"),
            alice: UserId::from("alice"),
            bob: UserId::from("bob"),
            carol: UserId::from("carol"),
        }
    }

    #[test]
    fn filters_until_everyone_acknowledges() {
        let u = users();
        let path = ResourcePath::from("/doc.txt");
        let mut filter = ResourceActivityFilter::new();

        filter.resource_deleted(&path, &u.alice, &u.host, [&u.host, &u.alice, &u.bob, &u.carol]);
        let pending = filter.pending(&path).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&u.bob) && pending.contains(&u.carol));

        let edit = Activity::Jupiter(JupiterActivity::new(u.bob.clone(), path.clone(), VectorTime::ZERO, Operation::new_insert(0, "x")));
        assert!(filter.is_filtered(&edit));

        filter.acknowledge(&path, &u.bob);
        assert!(filter.is_filtered(&edit));
        filter.acknowledge(&path, &u.carol);
        assert!(!filter.is_filtering(&path));
        assert!(!filter.is_filtered(&edit));
    }

    #[test]
    fn teardown_activities_pass() {
        let u = users();
        let path = ResourcePath::from("/doc.txt");
        let mut filter = ResourceActivityFilter::new();
        filter.resource_deleted(&path, &u.host, &u.host, [&u.host, &u.alice]);

        let passing = [
            Activity::from(ChecksumActivity::missing(u.host.clone(), path.clone())),
            Activity::editor(u.alice.clone(), path.clone(), EditorActivityKind::Closed),
            Activity::deletion_acknowledgment(u.alice.clone(), path.clone()),
            Activity::file(u.alice.clone(), path.clone(), FileActivityKind::Created),
        ];
        for a in passing.iter() {
            assert!(!filter.is_filtered(a), "{:?}", a);
        }

        let dropped = [
            Activity::from(ChecksumActivity::new(u.host.clone(), path.clone(), "old content")),
            Activity::editor(u.alice.clone(), path.clone(), EditorActivityKind::Saved),
            Activity::file(u.alice.clone(), path.clone(), FileActivityKind::Removed),
            TextEditActivity::insert(u.alice.clone(), path.clone(), 0, "x").into(),
        ];
        for a in dropped.iter() {
            assert!(filter.is_filtered(a), "{:?}", a);
        }

        // Other paths are unaffected.
        let other = TextEditActivity::insert(u.alice.clone(), ResourcePath::from("/other.txt"), 0, "x");
        assert!(!filter.is_filtered(&other.into()));
    }

    #[test]
    fn recreating_or_leaving_clears() {
        let u = users();
        let path = ResourcePath::from("/doc.txt");
        let mut filter = ResourceActivityFilter::new();

        filter.resource_deleted(&path, &u.host, &u.host, [&u.host, &u.alice, &u.bob]);
        filter.resource_created(&path);
        assert!(!filter.is_filtering(&path));

        filter.resource_deleted(&path, &u.host, &u.host, [&u.host, &u.alice, &u.bob]);
        filter.user_left(&u.alice);
        assert!(filter.is_filtering(&path));
        filter.user_left(&u.bob);
        assert!(!filter.is_filtering(&path));

        // Nobody to wait for.
        filter.resource_deleted(&path, &u.alice, &u.host, [&u.host, &u.alice]);
        assert!(!filter.is_filtering(&path));
    }
}

//! Real-time collaborative plain text editing using the Jupiter operational transformation
//! algorithm in a star topology.
//!
//! One participant (the *host*) holds the authoritative copy of every document. Every other
//! participant only talks to the host. Each link between a participant and the host, for each
//! document, is tracked on both ends by a [`Jupiter`] engine: a pair of operation counters and a
//! queue of operations the other end hasn't seen yet. Concurrent edits are reconciled by
//! transforming them past each other, so editing never blocks and every replica converges.
//!
//! The crate is organised in layers:
//!
//! 1. [`Operation`] and [`transform`] - positional text edits and the inclusion transformation
//!    between them.
//! 2. [`Jupiter`] - the two-party engine for one document.
//! 3. [`JupiterClient`] / [`JupiterServer`] - registries of engines, keyed by document (and on the
//!    host, by participant).
//! 4. [`ConcurrentDocumentClient`] / [`ConcurrentDocumentServer`] - translate [`Activity`] values
//!    from the session layer into engine calls and back. Failures are logged and dropped here.
//!
//! Nothing here talks to the network. The transport is expected to deliver activities from each
//! sender exactly once and in order.
//!
//! ## Example
//!
//! ```
//! use jupiter_ot::*;
//!
//! let host = UserId::from("host");
//! let alice = UserId::from("alice");
//! let path = ResourcePath::from("/notes.txt");
//!
//! let server = ConcurrentDocumentServer::new(SessionContext::host(host.clone()));
//! server.user_started_queuing(alice.clone());
//!
//! let alice_client = ConcurrentDocumentClient::new(SessionContext::new(alice.clone(), host.clone()));
//! let edit = TextEditActivity::insert(alice.clone(), path.clone(), 0, "hi");
//! let outgoing = alice_client.transform_to_jupiter(edit.into());
//!
//! // The host's own replica gets the edit, transformed for it.
//! let items = server.transform_incoming(outgoing);
//! let (local, remote) = split_local(items, &host);
//! assert_eq!(local.len(), 1);
//! assert!(remote.is_empty());
//! ```

use std::fmt::{Display, Formatter};
use smartstring::alias::String as SmartString;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use ot::{EditableText, Operation, TextEdit, transform};
pub use vector_time::VectorTime;
pub use error::{ServerError, TransformationError};
pub use activity::*;
pub use config::{Config, SessionContext};
pub use jupiter::Jupiter;
pub use client::JupiterClient;
pub use server::{JupiterDocumentServer, JupiterServer};
pub use concurrent::{ConcurrentDocumentClient, ConcurrentDocumentServer, QueueItem, split_local};
pub use filter::ResourceActivityFilter;
pub use heartbeat::{ActivitySink, HeartbeatDispatcher, HeartbeatSource, send_heartbeat};

mod unicount;
mod vector_time;
mod error;
mod ot;
mod activity;
mod config;
mod jupiter;
mod client;
mod server;
mod concurrent;
mod filter;
mod heartbeat;

#[cfg(test)]
mod fuzzer_tools;

/// Identifies a session participant.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserId(SmartString);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A shared document, named by its project-relative path.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourcePath(SmartString);

impl ResourcePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self(path.into())
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

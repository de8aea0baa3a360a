//! The boundary between the session layer's activities and the jupiter engines. Errors stop here.

mod client;
mod server;

pub use client::ConcurrentDocumentClient;
pub use server::{ConcurrentDocumentServer, QueueItem, split_local};

//! Periodic no-op operations for idle documents.
//!
//! A [`Jupiter`](crate::Jupiter) engine only forgets its queued operations once the other side
//! acknowledges them, and acknowledgements only travel with operations. If the other side never
//! edits, the queue never shrinks. Sending a [`NoOperation`](crate::Operation::NoOperation) for
//! every tracked document every so often fixes that.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{debug, warn};
use crate::{Activity, Config};

/// Something which can produce heartbeat activities.
pub trait HeartbeatSource {
    fn heartbeat(&self) -> Vec<Activity>;
}

/// Where heartbeat activities go. Usually the network.
pub trait ActivitySink {
    fn send(&self, activity: Activity);
}

impl<F: Fn(Activity) + Send + Sync> ActivitySink for F {
    fn send(&self, activity: Activity) {
        self(activity)
    }
}

/// Owns the heartbeat thread. The thread stops when [`stop`](Self::stop) is called or this is
/// dropped.
#[derive(Debug)]
pub struct HeartbeatDispatcher {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl HeartbeatDispatcher {
    pub fn start<S, K>(source: Arc<S>, sink: K, interval: Duration) -> std::io::Result<Self>
        where S: HeartbeatSource + Send + Sync + 'static, K: ActivitySink + Send + 'static
    {
        let (shutdown, shutdown_rx) = bounded::<()>(0);
        let ticker = tick(interval);

        let thread = thread::Builder::new()
            .name("jupiter-heartbeat".into())
            .spawn(move || {
                debug!(?interval, "heartbeat started");
                loop {
                    select! {
                        recv(ticker) -> _ => send_heartbeat(&*source, &sink),
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                debug!("heartbeat stopped");
            })?;

        Ok(Self { shutdown: Some(shutdown), thread: Some(thread) })
    }

    /// Start with the interval from `config`.
    pub fn start_with_config<S, K>(source: Arc<S>, sink: K, config: &Config) -> std::io::Result<Self>
        where S: HeartbeatSource + Send + Sync + 'static, K: ActivitySink + Send + 'static
    {
        Self::start(source, sink, config.heartbeat_interval)
    }

    /// Stop the thread and wait for it to finish.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the thread.
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("heartbeat thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for HeartbeatDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send one round of heartbeats.
pub fn send_heartbeat<S: HeartbeatSource + ?Sized, K: ActivitySink + ?Sized>(source: &S, sink: &K) {
    for activity in source.heartbeat() {
        sink.send(activity);
    }
}

//! The Jupiter algorithm for a single pair of communicating sites.
//!
//! Each engine sits on one end of a client <-> host link for one document. Operations we
//! generate locally are applied immediately, stamped with our vector timestamp, sent, and kept
//! in an acknowledgement queue. When the other side's operations arrive they were made against
//! some older state of ours - the timestamp tells us which of our queued operations they hadn't
//! seen yet. We transform the incoming operation past those, and also transform the queued
//! operations past the incoming one so they stay relative to the newest state.
//!
//! ```text
//!        ours    theirs
//!    * ------> * (queued op q)
//!    |         |
//!  r |         | r' = transform(r, q)
//!    v         v
//!    * ------> *
//!        q' = transform(q, r)
//! ```
//!
//! Queued operations are dropped once the other side's timestamp shows it has seen them. If the
//! other side never sends anything the queue grows without bound, which is why idle sites send
//! heartbeat no-ops.

use std::collections::VecDeque;
use tracing::trace;
use crate::{ChecksumActivity, Operation, TransformationError, VectorTime};
use crate::ot::transform;

#[derive(Debug, Clone)]
struct QueuedOperation {
    /// Our local op count when this operation was generated.
    generated_at: usize,
    operation: Operation,
}

#[derive(Debug, Clone)]
pub struct Jupiter {
    /// Concurrent inserts at the same position are ordered host-side first. So the two ends of a
    /// link need to know which end they are.
    is_client_side: bool,
    vector_time: VectorTime,
    ack_queue: VecDeque<QueuedOperation>,
}

impl Jupiter {
    pub fn new(is_client_side: bool) -> Self {
        Self {
            is_client_side,
            vector_time: VectorTime::ZERO,
            ack_queue: VecDeque::new(),
        }
    }

    pub fn new_client() -> Self { Self::new(true) }
    pub fn new_server() -> Self { Self::new(false) }

    pub fn is_client_side(&self) -> bool {
        self.is_client_side
    }

    /// Our current timestamp. `local` counts operations we generated, `remote` counts operations
    /// we've received.
    pub fn timestamp(&self) -> VectorTime {
        self.vector_time
    }

    /// Number of generated operations the other side hasn't acknowledged yet.
    pub fn unacknowledged_len(&self) -> usize {
        self.ack_queue.len()
    }

    /// Record a locally generated (and already locally applied) operation. Returns the timestamp
    /// to send it with.
    pub fn generate(&mut self, operation: &Operation) -> VectorTime {
        let timestamp = self.vector_time;
        self.ack_queue.push_back(QueuedOperation {
            generated_at: timestamp.local,
            operation: operation.clone(),
        });
        self.vector_time = timestamp.next_local();
        trace!(%timestamp, %operation, "generated");
        timestamp
    }

    fn check_preconditions(&self, timestamp: VectorTime) -> Result<(), TransformationError> {
        let expected = self.vector_time.remote;
        if timestamp.local < expected {
            return Err(TransformationError::DuplicateOperation { expected, received: timestamp.local });
        }
        if timestamp.local > expected {
            return Err(TransformationError::OperationFromFuture { expected, received: timestamp.local });
        }

        if timestamp.remote > self.vector_time.local {
            return Err(TransformationError::AcknowledgedUnknown {
                acked: timestamp.remote,
                generated: self.vector_time.local,
            });
        }
        if let Some(oldest) = self.ack_queue.front() {
            if timestamp.remote < oldest.generated_at {
                return Err(TransformationError::AcknowledgementRegressed {
                    acked: timestamp.remote,
                    oldest_unacked: oldest.generated_at,
                });
            }
        }

        Ok(())
    }

    /// Receive an operation sent by the other side with `timestamp` (as the sender saw it).
    /// Returns the operation transformed so it can be applied to our current document.
    ///
    /// Operations must arrive exactly once and in the order they were generated. Anything else
    /// is rejected and leaves the engine untouched.
    pub fn receive(&mut self, timestamp: VectorTime, operation: &Operation) -> Result<Operation, TransformationError> {
        self.check_preconditions(timestamp)?;

        // Everything generated before the sender's remote count has been seen by the sender.
        while self.ack_queue.front().is_some_and(|q| q.generated_at < timestamp.remote) {
            self.ack_queue.pop_front();
        }

        // The incoming operation wins insert ties on the client (it came from the host).
        let incoming_first = self.is_client_side;
        let mut incoming = operation.clone();
        for queued in self.ack_queue.iter_mut() {
            let transformed = transform(&incoming, &queued.operation, incoming_first);
            queued.operation = transform(&queued.operation, &incoming, !incoming_first);
            incoming = transformed;
        }

        self.vector_time = self.vector_time.next_remote();
        trace!(%timestamp, %operation, transformed = %incoming, "received");
        Ok(incoming)
    }

    /// Stamp a checksum with our current timestamp without changing any state.
    pub fn with_timestamp(&self, checksum: &ChecksumActivity) -> ChecksumActivity {
        checksum.with_timestamp(self.vector_time)
    }

    /// Was `timestamp`, produced by the other side's engine, taken at exactly the document
    /// state we're at now?
    pub fn is_current(&self, timestamp: &VectorTime) -> bool {
        self.vector_time.is_current(&timestamp.mirrored())
    }

    /// Forget everything. The engine behaves as if it was just created.
    pub fn reset(&mut self) {
        self.vector_time = VectorTime::ZERO;
        self.ack_queue.clear();
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;
    use crate::fuzzer_tools::random_op;
    use super::*;

    #[test]
    fn generate_advances_local() {
        let mut j = Jupiter::new_client();
        let t0 = j.generate(&Operation::new_insert(0, "hello"));
        let t1 = j.generate(&Operation::NoOperation);
        assert_eq!(t0, VectorTime::new(0, 0));
        assert_eq!(t1, VectorTime::new(1, 0));
        assert_eq!(j.timestamp(), VectorTime::new(2, 0));
        assert_eq!(j.unacknowledged_len(), 2);
    }

    #[test]
    fn causal_acceptance() {
        let mut server = Jupiter::new_server();
        let op = Operation::new_insert(0, "a");

        // From the future.
        assert_eq!(
            server.receive(VectorTime::new(1, 0), &op),
            Err(TransformationError::OperationFromFuture { expected: 0, received: 1 })
        );
        // Acknowledges something we never sent.
        assert_eq!(
            server.receive(VectorTime::new(0, 1), &op),
            Err(TransformationError::AcknowledgedUnknown { acked: 1, generated: 0 })
        );
        assert_eq!(server.timestamp(), VectorTime::ZERO);

        assert_eq!(server.receive(VectorTime::new(0, 0), &op), Ok(op.clone()));
        assert_eq!(server.timestamp(), VectorTime::new(0, 1));

        // Same thing again is a duplicate.
        assert_eq!(
            server.receive(VectorTime::new(0, 0), &op),
            Err(TransformationError::DuplicateOperation { expected: 1, received: 0 })
        );
        assert_eq!(server.timestamp(), VectorTime::new(0, 1));
    }

    #[test]
    fn regressed_ack_is_rejected() {
        let mut client = Jupiter::new_client();
        client.generate(&Operation::new_insert(0, "a"));
        client.generate(&Operation::new_insert(1, "b"));

        // Server saw both of our ops.
        client.receive(VectorTime::new(0, 2), &Operation::NoOperation).unwrap();
        assert_eq!(client.unacknowledged_len(), 0);

        client.generate(&Operation::new_insert(2, "c"));
        assert_eq!(
            client.receive(VectorTime::new(1, 1), &Operation::NoOperation),
            Err(TransformationError::AcknowledgementRegressed { acked: 1, oldest_unacked: 2 })
        );
    }

    #[test]
    fn ack_shrinks_log() {
        let mut client = Jupiter::new_client();
        let mut server = Jupiter::new_server();

        let op = Operation::new_insert(0, "hi");
        let t = client.generate(&op);
        assert_eq!(client.unacknowledged_len(), 1);

        server.receive(t, &op).unwrap();

        // The server replies with a no-op, which carries its acknowledgement.
        let t = server.generate(&Operation::NoOperation);
        assert_eq!(t, VectorTime::new(0, 1));
        client.receive(t, &Operation::NoOperation).unwrap();
        assert_eq!(client.unacknowledged_len(), 0);
        assert_eq!(client.timestamp(), VectorTime::new(1, 1));
    }

    #[test]
    fn reset_starts_from_zero() {
        let mut j = Jupiter::new_client();
        j.generate(&Operation::new_insert(0, "x"));
        j.reset();
        assert_eq!(j.timestamp(), VectorTime::ZERO);
        assert_eq!(j.unacknowledged_len(), 0);
        j.reset();
        assert_eq!(j.timestamp(), VectorTime::ZERO);
    }

    #[test]
    fn checksum_staleness() {
        use crate::{ResourcePath, UserId};

        let mut client = Jupiter::new_client();
        let mut server = Jupiter::new_server();

        let op = Operation::new_insert(0, "x");
        let t = server.generate(&op);

        let checksum = ChecksumActivity::new(UserId::from("host"), ResourcePath::from("/a"), "x");
        let stamped = server.with_timestamp(&checksum);
        assert_eq!(server.timestamp(), VectorTime::new(1, 0));

        // The client hasn't seen the server's op yet.
        assert!(!client.is_current(&stamped.timestamp.unwrap()));
        client.receive(t, &op).unwrap();
        assert!(client.is_current(&stamped.timestamp.unwrap()));

        // And a local edit makes it stale again.
        client.generate(&Operation::new_insert(1, "y"));
        assert!(!client.is_current(&stamped.timestamp.unwrap()));
    }

    /// Run a client and a server against each other, with messages in flight in both directions.
    /// Both documents must end up identical.
    #[test]
    fn fuzz_two_sites_converge() {
        for seed in 0..300 {
            let mut rng = SmallRng::seed_from_u64(seed);

            let mut sites = [
                (Jupiter::new_client(), String::from("initial"), Vec::new()),
                (Jupiter::new_server(), String::from("initial"), Vec::new()),
            ];

            for _i in 0..30 {
                let idx = rng.gen_range(0..2);
                if rng.gen_bool(0.5) {
                    let (jupiter, doc, outbox) = &mut sites[idx];
                    let op = random_op(doc, &mut rng);
                    op.apply(doc);
                    let t = jupiter.generate(&op);
                    outbox.push((t, op));
                } else {
                    // Deliver the oldest pending message from the other side.
                    let other = 1 - idx;
                    if sites[other].2.is_empty() { continue; }
                    let (t, op) = sites[other].2.remove(0);
                    let (jupiter, doc, _) = &mut sites[idx];
                    let op = jupiter.receive(t, &op).unwrap();
                    op.apply(doc);
                }
            }

            // Flush.
            for idx in [0, 1, 0] {
                let other = 1 - idx;
                for (t, op) in std::mem::take(&mut sites[other].2) {
                    let (jupiter, doc, _) = &mut sites[idx];
                    let op = jupiter.receive(t, &op).unwrap();
                    op.apply(doc);
                }
            }

            assert_eq!(sites[0].1, sites[1].1, "seed {}", seed);
        }
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::observability::metrics;
use crate::wal::{DedupeWal, WalError};

/// Kind of deferred WAL mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
	Add,
	Remove,
}

/// One WAL mutation waiting for Central to acknowledge the send that caused
/// it. Lives only inside the acker's queue: born when an event is forwarded,
/// gone once flushed.
#[derive(Debug, Clone)]
pub struct PendingOp {
	pub seq: u64,
	pub id: String,
	pub hash: u64,
	pub kind: OpKind,
}

struct AckerQueue {
	next_seq: u64,
	queue: VecDeque<PendingOp>,
}

/// Ordered, ack-gated queue decoupling "sent to Central" from "durably
/// remembered".
///
/// Persisting on every send would put an fsync on the network hot path, so
/// sends only append an in-memory op here; once Central confirms a sequence
/// point the acknowledged prefix is replayed against the WAL in insertion
/// order. Ordering matters per id: a later op overwrites or negates an
/// earlier one (Add then Remove must net to "absent").
///
/// Many producers may call [`insert`](Self::insert) concurrently; a single
/// consumer (the checkpoint handler) calls [`ack`](Self::ack). The lock
/// covers only the in-memory queue; WAL I/O runs unlocked so a slow disk
/// never blocks producers.
pub struct MessageAcker {
	wal: Arc<DedupeWal>,
	inner: Mutex<AckerQueue>,
}

impl MessageAcker {
	pub fn new(wal: Arc<DedupeWal>) -> Self {
		Self {
			wal,
			inner: Mutex::new(AckerQueue {
				next_seq: 0,
				queue: VecDeque::new(),
			}),
		}
	}

	/// Queues a pending WAL op and returns the sequence number assigned to
	/// it. No WAL access happens here.
	pub fn insert(&self, id: String, hash: u64, kind: OpKind) -> u64 {
		let mut inner = self.inner.lock().expect("acker lock poisoned");
		inner.next_seq += 1;
		let seq = inner.next_seq;
		inner.queue.push_back(PendingOp {
			seq,
			id,
			hash,
			kind,
		});
		metrics().acker_queue_depth.set(inner.queue.len() as i64);
		seq
	}

	/// Flushes every queued op with `seq <= upto_seq` to the WAL, in
	/// insertion order.
	///
	/// The queue is seq-ordered by construction, so the acknowledged ops are
	/// a simple prefix drain. If a WAL write fails, the failing op and
	/// everything after it are pushed back onto the queue front (order
	/// preserved) and the error is returned: a later ack retries them, and
	/// no popped-but-unwritten entry is ever lost.
	pub fn ack(&self, upto_seq: u64) -> Result<(), WalError> {
		let batch = {
			let mut inner = self.inner.lock().expect("acker lock poisoned");
			let mut batch = Vec::new();
			while inner
				.queue
				.front()
				.is_some_and(|op| op.seq <= upto_seq)
			{
				batch.push(inner.queue.pop_front().expect("front checked above"));
			}
			metrics().acker_queue_depth.set(inner.queue.len() as i64);
			batch
		};

		if batch.is_empty() {
			debug!("checkpoint {} acknowledged nothing new", upto_seq);
			return Ok(());
		}

		// Replay unlocked: producers keep appending while the disk works.
		for (index, op) in batch.iter().enumerate() {
			let result = match op.kind {
				OpKind::Add => self.wal.insert(&op.id, op.hash),
				OpKind::Remove => self.wal.delete(&op.id),
			};
			if let Err(e) = result {
				warn!(
					"wal flush failed at {} ({} of {} acked ops); requeueing the rest",
					op.id,
					index + 1,
					batch.len()
				);
				metrics().wal_flush_failures_total.inc();
				self.requeue_front(&batch[index..]);
				return Err(e);
			}
			metrics().wal_ops_flushed_total.inc();
		}

		debug!("flushed {} ops up to seq {}", batch.len(), upto_seq);
		Ok(())
	}

	fn requeue_front(&self, unflushed: &[PendingOp]) {
		let mut inner = self.inner.lock().expect("acker lock poisoned");
		for op in unflushed.iter().rev() {
			inner.queue.push_front(op.clone());
		}
		metrics().acker_queue_depth.set(inner.queue.len() as i64);
	}

	/// Number of ops still waiting for an acknowledgement.
	pub fn pending(&self) -> usize {
		self.inner.lock().expect("acker lock poisoned").queue.len()
	}
}

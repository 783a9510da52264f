//! The bounded ring of recently-seen ack uuids (§4.2, §8 invariant 2).

use std::collections::VecDeque;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 100;

/// A bounded FIFO of uuids a transport client has already acknowledged.
/// Used to make a duplicate `OK` frame a no-op instead of re-signaling a
/// waiter that has already completed (§8 S4).
#[derive(Debug)]
pub struct AckRing {
	seen: VecDeque<Uuid>,
	capacity: usize,
}

impl AckRing {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			seen: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	/// Record that `uuid` was just acknowledged. Returns `true` the first
	/// time a uuid is recorded, `false` if it was already present (a
	/// duplicate ack, which the caller should treat as a no-op).
	pub fn record(&mut self, uuid: Uuid) -> bool {
		if self.seen.contains(&uuid) {
			return false;
		}
		if self.seen.len() >= self.capacity {
			self.seen.pop_front();
		}
		self.seen.push_back(uuid);
		return true;
	}
}

impl Default for AckRing {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn duplicate_uuid_is_a_no_op() {
		let mut ring = AckRing::new();
		let id = Uuid::new_v4();
		assert!(ring.record(id));
		assert!(!ring.record(id));
	}

	#[test]
	fn ring_evicts_oldest_once_full() {
		let mut ring = AckRing::with_capacity(2);
		let a = Uuid::new_v4();
		let b = Uuid::new_v4();
		let c = Uuid::new_v4();
		assert!(ring.record(a));
		assert!(ring.record(b));
		assert!(ring.record(c));
		// `a` was evicted, so it is no longer considered "seen".
		assert!(ring.record(a));
	}
}

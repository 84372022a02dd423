//! Timer queue for macrotasks.
//!
//! A min-heap ordered by `(due, seq)` so the earliest due timer fires first
//! and timers with equal due times fire in the order they were scheduled.
//! Cancellation removes the timer's slot; its heap entry is skipped lazily.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;
use std::time::Duration;

/// Handle identifying a scheduled timer; doubles as its cancel token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for TimerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "timer#{}", self.0)
	}
}

/// Shortest period accepted for a repeating timer.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub(crate) enum TimerCallback {
	Once(Box<dyn FnOnce()>),
	Repeat(Box<dyn FnMut()>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct TimerEntry {
	due: Duration,
	seq: u64,
	id: TimerId,
}

impl Ord for TimerEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		// Reversed for a min-heap: earliest due first, then lowest sequence
		other
			.due
			.cmp(&self.due)
			.then_with(|| other.seq.cmp(&self.seq))
	}
}

impl PartialOrd for TimerEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

struct TimerSlot {
	callback: Option<TimerCallback>,
	period: Option<Duration>,
	seq: u64,
}

/// A timer whose due time has arrived, detached from the queue while it runs
pub(crate) struct DueTimer {
	pub(crate) id: TimerId,
	pub(crate) due: Duration,
	pub(crate) callback: TimerCallback,
}

#[derive(Default)]
pub(crate) struct TimerQueue {
	heap: BinaryHeap<TimerEntry>,
	slots: BTreeMap<TimerId, TimerSlot>,
	next_id: u64,
	next_seq: u64,
}

impl TimerQueue {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Number of live (not cancelled, not fired one-shot) timers
	pub(crate) fn len(&self) -> usize {
		self.slots.len()
	}

	pub(crate) fn allocate_id(&mut self) -> TimerId {
		let id = TimerId(self.next_id);
		self.next_id += 1;
		id
	}

	fn push(&mut self, id: TimerId, due: Duration) -> u64 {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.heap.push(TimerEntry { due, seq, id });
		seq
	}

	pub(crate) fn insert_once(&mut self, due: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
		let id = self.allocate_id();
		let seq = self.push(id, due);
		self.slots.insert(
			id,
			TimerSlot {
				callback: Some(TimerCallback::Once(callback)),
				period: None,
				seq,
			},
		);
		id
	}

	pub(crate) fn insert_repeating(
		&mut self,
		due: Duration,
		period: Duration,
		callback: Box<dyn FnMut()>,
	) -> TimerId {
		let id = self.allocate_id();
		let seq = self.push(id, due);
		self.slots.insert(
			id,
			TimerSlot {
				callback: Some(TimerCallback::Repeat(callback)),
				period: Some(period.max(MIN_PERIOD)),
				seq,
			},
		);
		id
	}

	/// Remove a timer, handing back its callback so the caller can drop it
	/// outside any borrow of the queue
	///
	/// `None` if it already fired or was cancelled; `Some(None)` if it is a
	/// repeating timer that is running right now.
	pub(crate) fn cancel(&mut self, id: TimerId) -> Option<Option<TimerCallback>> {
		self.slots.remove(&id).map(|slot| slot.callback)
	}

	fn discard_stale(&mut self) {
		while let Some(entry) = self.heap.peek() {
			let live = self
				.slots
				.get(&entry.id)
				.is_some_and(|slot| slot.seq == entry.seq);
			if live {
				break;
			}
			self.heap.pop();
		}
	}

	/// Earliest due time among live timers
	pub(crate) fn next_due(&mut self) -> Option<Duration> {
		self.discard_stale();
		self.heap.peek().map(|entry| entry.due)
	}

	/// Detach the earliest timer whose due time is `<= now`
	///
	/// One-shot timers leave the queue; repeating timers keep their slot
	/// (so they can still be cancelled while running) and must be handed
	/// back through [`TimerQueue::rearm`].
	pub(crate) fn pop_due(&mut self, now: Duration) -> Option<DueTimer> {
		self.discard_stale();
		let entry = self.heap.peek()?;
		if entry.due > now {
			return None;
		}
		let entry = self.heap.pop()?;
		let repeating = self
			.slots
			.get(&entry.id)
			.is_some_and(|slot| slot.period.is_some());
		let callback = if repeating {
			self.slots.get_mut(&entry.id)?.callback.take()?
		} else {
			self.slots.remove(&entry.id)?.callback?
		};
		Some(DueTimer {
			id: entry.id,
			due: entry.due,
			callback,
		})
	}

	/// Put a repeating timer back after it ran
	///
	/// A timer cancelled while running is handed back for the caller to drop.
	pub(crate) fn rearm(&mut self, fired: DueTimer, now: Duration) -> Option<DueTimer> {
		let Some(period) = self.slots.get(&fired.id).and_then(|slot| slot.period) else {
			return Some(fired);
		};
		let mut next = fired.due + period;
		if next <= now {
			next = now + period;
		}
		let seq = self.push(fired.id, next);
		if let Some(slot) = self.slots.get_mut(&fired.id) {
			slot.callback = Some(fired.callback);
			slot.seq = seq;
		}
		None
	}

}

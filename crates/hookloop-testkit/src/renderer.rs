//! Renderer that records every commit

use std::cell::RefCell;
use std::rc::Rc;

use hookloop_reactive::{InstanceId, ViewRenderer};

#[derive(Debug)]
struct RecordingLog<V> {
	commits: Vec<(InstanceId, V)>,
	unmounted: Vec<InstanceId>,
}

/// A [`ViewRenderer`] whose clones share one commit log
///
/// Hand one clone to the scheduler and keep another for assertions.
///
/// # Example
///
/// ```
/// use hookloop_core::{EventLoop, LoopSettings};
/// use hookloop_reactive::{component, Scheduler, SchedulerSettings};
/// use hookloop_testkit::RecordingRenderer;
///
/// let event_loop = EventLoop::virtual_time(LoopSettings::default());
/// event_loop.start().unwrap();
/// let recorder = RecordingRenderer::new();
/// let scheduler = Scheduler::new(&event_loop.handle(), SchedulerSettings::default(), recorder.clone());
///
/// let id = scheduler.mount(component("Hello", |_hooks| Ok("hello"))).unwrap();
/// event_loop.run_until_idle().unwrap();
///
/// assert_eq!(recorder.views_of(id), vec!["hello"]);
/// ```
#[derive(Debug)]
pub struct RecordingRenderer<V> {
	log: Rc<RefCell<RecordingLog<V>>>,
}

impl<V> Clone for RecordingRenderer<V> {
	fn clone(&self) -> Self {
		Self {
			log: Rc::clone(&self.log),
		}
	}
}

impl<V> Default for RecordingRenderer<V> {
	fn default() -> Self {
		Self {
			log: Rc::new(RefCell::new(RecordingLog {
				commits: Vec::new(),
				unmounted: Vec::new(),
			})),
		}
	}
}

impl<V: Clone> RecordingRenderer<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every commit in order
	pub fn commits(&self) -> Vec<(InstanceId, V)> {
		self.log.borrow().commits.clone()
	}

	/// Views committed for one instance, in order
	pub fn views_of(&self, instance: InstanceId) -> Vec<V> {
		self.log
			.borrow()
			.commits
			.iter()
			.filter(|(id, _)| *id == instance)
			.map(|(_, view)| view.clone())
			.collect()
	}

	pub fn last_view(&self, instance: InstanceId) -> Option<V> {
		self.log
			.borrow()
			.commits
			.iter()
			.rev()
			.find(|(id, _)| *id == instance)
			.map(|(_, view)| view.clone())
	}

	pub fn commit_count(&self) -> usize {
		self.log.borrow().commits.len()
	}

	pub fn unmounted(&self) -> Vec<InstanceId> {
		self.log.borrow().unmounted.clone()
	}

	pub fn clear(&self) {
		let mut log = self.log.borrow_mut();
		log.commits.clear();
		log.unmounted.clear();
	}
}

impl<V> ViewRenderer<V> for RecordingRenderer<V> {
	fn commit(&mut self, instance: InstanceId, view: V) {
		self.log.borrow_mut().commits.push((instance, view));
	}

	fn unmount(&mut self, instance: InstanceId) {
		self.log.borrow_mut().unmounted.push(instance);
	}
}

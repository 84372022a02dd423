//! Hook Store
//!
//! The ordered slot sequence behind a component instance. Each hook call
//! claims the slot at the current cursor position; on the first render the
//! slot is created, afterwards the existing one is read back. Nothing but
//! call order links a hook call to its slot, so the store checks the shape
//! of every render against the previous one.

use std::any::{Any, type_name};
use std::rc::Rc;

use tracing::trace;

use crate::error::{HookError, HookKind, HookResult};
use crate::hooks::effect::{Cleanup, DepValue, Deps};
use crate::hooks::state::{PendingUpdates, StateCell};

pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

pub(crate) struct StateSlot {
	cell: Rc<dyn Any>,
	updates: Rc<dyn PendingUpdates>,
	type_name: &'static str,
}

#[derive(Default)]
pub(crate) struct EffectSlot {
	/// Dependencies seen by the last run; `None` until the first run
	last_deps: Option<Vec<DepValue>>,
	/// Run requested by the current render, waiting for commit
	pending: Option<(Vec<DepValue>, EffectFn)>,
	cleanup: Option<Cleanup>,
}

pub(crate) enum HookSlot {
	State(StateSlot),
	Effect(EffectSlot),
}

impl HookSlot {
	fn kind(&self) -> HookKind {
		match self {
			HookSlot::State(_) => HookKind::State,
			HookSlot::Effect(_) => HookKind::Effect,
		}
	}
}

/// An effect run taken out of the store for commit
pub(crate) struct ScheduledEffect {
	pub(crate) index: usize,
	pub(crate) deps: Vec<DepValue>,
	pub(crate) run: EffectFn,
	/// Cleanup of the previous run, to fire before any new run
	pub(crate) cleanup: Option<Cleanup>,
}

/// Per-instance hook slots
pub struct HookStore {
	slots: Vec<HookSlot>,
	cursor: usize,
	rendering: bool,
	/// Slot count fixed by the first complete render
	committed_len: Option<usize>,
	validate_shape: bool,
}

impl HookStore {
	/// With `validate_shape` off, renders may append hooks and skip trailing
	/// ones. Kind and type mismatches are always errors.
	pub fn new(validate_shape: bool) -> Self {
		Self {
			slots: Vec::new(),
			cursor: 0,
			rendering: false,
			committed_len: None,
			validate_shape,
		}
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn is_rendering(&self) -> bool {
		self.rendering
	}

	/// Reset the cursor and apply queued state updates
	///
	/// Returns the number of updates applied.
	pub fn begin_render(&mut self) -> usize {
		self.cursor = 0;
		self.rendering = true;
		let applied = self
			.slots
			.iter()
			.map(|slot| match slot {
				HookSlot::State(state) => state.updates.apply_pending(),
				HookSlot::Effect(_) => 0,
			})
			.sum();
		if applied > 0 {
			trace!(applied, "state updates applied");
		}
		applied
	}

	/// Check that the render called as many hooks as the previous one
	pub fn finish_render(&mut self) -> HookResult<()> {
		self.rendering = false;
		match self.committed_len {
			Some(expected) if self.validate_shape && self.cursor != expected => {
				self.discard_pending_effects();
				Err(HookError::SlotCountMismatch {
					expected,
					found: self.cursor,
				})
			}
			_ => {
				self.committed_len = Some(self.slots.len());
				Ok(())
			}
		}
	}

	/// End a render that failed; its effects never run
	pub(crate) fn abort_render(&mut self) {
		self.rendering = false;
		self.discard_pending_effects();
	}

	fn discard_pending_effects(&mut self) {
		for slot in &mut self.slots {
			if let HookSlot::Effect(effect) = slot {
				effect.pending = None;
			}
		}
	}

	/// Claim the slot at the cursor. `Ok(true)` means it already existed.
	fn claim(&mut self, kind: HookKind) -> HookResult<(usize, bool)> {
		if !self.rendering {
			return Err(HookError::OutsideRender);
		}
		let index = self.cursor;
		self.cursor += 1;
		if let Some(slot) = self.slots.get(index) {
			if slot.kind() != kind {
				return Err(HookError::KindMismatch {
					index,
					expected: slot.kind(),
					found: kind,
				});
			}
			return Ok((index, true));
		}
		if self.validate_shape && self.committed_len.is_some() {
			return Err(HookError::SlotCountMismatch {
				expected: self.slots.len(),
				found: index + 1,
			});
		}
		Ok((index, false))
	}

	pub(crate) fn state<T, F>(&mut self, init: F) -> HookResult<Rc<StateCell<T>>>
	where
		T: 'static,
		F: FnOnce() -> T,
	{
		let (index, existing) = self.claim(HookKind::State)?;
		if !existing {
			let cell = Rc::new(StateCell::new(init()));
			self.slots.push(HookSlot::State(StateSlot {
				cell: cell.clone(),
				updates: cell.clone(),
				type_name: type_name::<T>(),
			}));
			return Ok(cell);
		}
		let HookSlot::State(slot) = &self.slots[index] else {
			return Err(HookError::KindMismatch {
				index,
				expected: HookKind::Effect,
				found: HookKind::State,
			});
		};
		Rc::clone(&slot.cell)
			.downcast::<StateCell<T>>()
			.map_err(|_| HookError::TypeMismatch {
				index,
				expected: slot.type_name,
				found: type_name::<T>(),
			})
	}

	/// Register an effect; returns whether it will run at the next commit
	pub(crate) fn effect(&mut self, deps: Deps, run: EffectFn) -> HookResult<bool> {
		let (index, existing) = self.claim(HookKind::Effect)?;
		if !existing {
			self.slots.push(HookSlot::Effect(EffectSlot::default()));
		}
		let HookSlot::Effect(slot) = &mut self.slots[index] else {
			return Err(HookError::KindMismatch {
				index,
				expected: HookKind::State,
				found: HookKind::Effect,
			});
		};
		let should_run = deps.should_run(slot.last_deps.as_deref());
		slot.pending = should_run.then(|| (deps.into_values(), run));
		Ok(should_run)
	}

	/// Take every effect scheduled by the last render, in slot order
	pub(crate) fn take_scheduled_effects(&mut self) -> Vec<ScheduledEffect> {
		self.slots
			.iter_mut()
			.enumerate()
			.filter_map(|(index, slot)| match slot {
				HookSlot::Effect(effect) => {
					let (deps, run) = effect.pending.take()?;
					Some(ScheduledEffect {
						index,
						deps,
						run,
						cleanup: effect.cleanup.take(),
					})
				}
				HookSlot::State(_) => None,
			})
			.collect()
	}

	/// Record the outcome of an effect run
	pub(crate) fn settle_effect(&mut self, index: usize, deps: Vec<DepValue>, cleanup: Option<Cleanup>) {
		if let Some(HookSlot::Effect(slot)) = self.slots.get_mut(index) {
			slot.last_deps = Some(deps);
			slot.cleanup = cleanup;
		} else if let Some(cleanup) = cleanup {
			// Slot vanished during the run; nothing will ever call this later
			cleanup.run();
		}
	}

	/// Drop every slot, running outstanding cleanups in slot order
	///
	/// State cells are released, so setters held elsewhere turn into no-ops.
	pub(crate) fn teardown(&mut self) -> usize {
		let slots = std::mem::take(&mut self.slots);
		self.cursor = 0;
		self.committed_len = None;
		let mut ran = 0;
		for slot in slots {
			if let HookSlot::Effect(EffectSlot {
				cleanup: Some(cleanup),
				..
			}) = slot
			{
				cleanup.run();
				ran += 1;
			}
		}
		ran
	}
}

impl std::fmt::Debug for HookStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let kinds: Vec<HookKind> = self.slots.iter().map(HookSlot::kind).collect();
		f.debug_struct("HookStore")
			.field("slots", &kinds)
			.field("cursor", &self.cursor)
			.field("rendering", &self.rendering)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn no_cleanup() -> EffectFn {
		Box::new(|| None)
	}

	fn render<F>(store: &mut HookStore, body: F) -> HookResult<()>
	where
		F: FnOnce(&mut HookStore) -> HookResult<()>,
	{
		store.begin_render();
		match body(store) {
			Ok(()) => store.finish_render(),
			Err(err) => {
				store.abort_render();
				Err(err)
			}
		}
	}

	#[rstest]
	fn test_state_persists_by_position() {
		let mut store = HookStore::new(true);
		render(&mut store, |s| {
			s.state(|| 1u8)?;
			s.state(|| "b")?;
			Ok(())
		})
		.unwrap();

		let mut seen = None;
		render(&mut store, |s| {
			let first = s.state(|| 99u8)?;
			let second = s.state(|| "zz")?;
			seen = Some((first.get(), second.get()));
			Ok(())
		})
		.unwrap();

		assert_eq!(seen, Some((1, "b")));
		assert_eq!(store.len(), 2);
	}

	#[rstest]
	fn test_lazy_initialiser_runs_once() {
		let mut store = HookStore::new(true);
		let calls = Cell::new(0);
		for _ in 0..3 {
			render(&mut store, |s| {
				s.state(|| {
					calls.set(calls.get() + 1);
					0
				})?;
				Ok(())
			})
			.unwrap();
		}

		assert_eq!(calls.get(), 1);
	}

	#[rstest]
	fn test_extra_hook_is_count_mismatch() {
		let mut store = HookStore::new(true);
		render(&mut store, |s| s.state(|| 0).map(|_| ())).unwrap();

		let err = render(&mut store, |s| {
			s.state(|| 0)?;
			s.state(|| 0)?;
			Ok(())
		})
		.unwrap_err();

		assert_eq!(err, HookError::SlotCountMismatch { expected: 1, found: 2 });
	}

	#[rstest]
	fn test_missing_hook_is_count_mismatch() {
		let mut store = HookStore::new(true);
		render(&mut store, |s| {
			s.state(|| 0)?;
			s.effect(Deps::Always, no_cleanup())?;
			Ok(())
		})
		.unwrap();

		let err = render(&mut store, |s| s.state(|| 0).map(|_| ())).unwrap_err();

		assert_eq!(err, HookError::SlotCountMismatch { expected: 2, found: 1 });
		assert!(store.take_scheduled_effects().is_empty());
	}

	#[rstest]
	fn test_kind_mismatch() {
		let mut store = HookStore::new(true);
		render(&mut store, |s| s.state(|| 0).map(|_| ())).unwrap();

		let err = render(&mut store, |s| s.effect(Deps::Always, no_cleanup()).map(|_| ())).unwrap_err();

		assert_eq!(
			err,
			HookError::KindMismatch {
				index: 0,
				expected: HookKind::State,
				found: HookKind::Effect,
			}
		);
	}

	#[rstest]
	fn test_type_mismatch() {
		let mut store = HookStore::new(true);
		render(&mut store, |s| s.state(|| 0i32).map(|_| ())).unwrap();

		let err = render(&mut store, |s| s.state(|| "text").map(|_| ())).unwrap_err();

		assert!(matches!(err, HookError::TypeMismatch { index: 0, expected: "i32", .. }));
	}

	#[rstest]
	fn test_hooks_outside_render_are_rejected() {
		let mut store = HookStore::new(true);

		assert_eq!(store.state(|| 0).map(|_| ()), Err(HookError::OutsideRender));
	}

	#[rstest]
	fn test_shape_validation_can_be_disabled() {
		let mut store = HookStore::new(false);
		render(&mut store, |s| s.state(|| 0).map(|_| ())).unwrap();

		render(&mut store, |s| {
			s.state(|| 0)?;
			s.state(|| 1)?;
			Ok(())
		})
		.unwrap();
		render(&mut store, |_| Ok(())).unwrap();

		assert_eq!(store.len(), 2);
	}

	#[rstest]
	fn test_effect_scheduling_follows_deps() {
		let mut store = HookStore::new(true);
		let mut scheduled = Vec::new();
		for value in [1, 1, 2] {
			render(&mut store, |s| {
				s.effect(crate::deps![value], no_cleanup())?;
				Ok(())
			})
			.unwrap();
			let effects = store.take_scheduled_effects();
			scheduled.push(effects.len());
			for effect in effects {
				let cleanup = (effect.run)();
				store.settle_effect(effect.index, effect.deps, cleanup);
			}
		}

		assert_eq!(scheduled, vec![1, 0, 1]);
	}

	#[rstest]
	fn test_teardown_runs_cleanups() {
		let mut store = HookStore::new(true);
		let cleaned = Rc::new(Cell::new(0));
		let counter = cleaned.clone();
		render(&mut store, |s| {
			s.effect(
				Deps::Once,
				Box::new(move || Some(Cleanup::new(move || counter.set(counter.get() + 1)))),
			)?;
			Ok(())
		})
		.unwrap();
		for effect in store.take_scheduled_effects() {
			let cleanup = (effect.run)();
			store.settle_effect(effect.index, effect.deps, cleanup);
		}

		assert_eq!(store.teardown(), 1);
		assert_eq!(cleaned.get(), 1);
		assert!(store.is_empty());
	}
}

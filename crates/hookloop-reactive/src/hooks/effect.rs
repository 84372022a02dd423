//! Effect hook building blocks: dependency lists and cleanups
//!
//! An effect declared during render runs after the instance's view is
//! committed, and only when its dependency list says so:
//!
//! | deps | runs |
//! |------|------|
//! | [`Deps::Always`] | after every commit |
//! | [`Deps::Once`] (`deps![]`) | after the first commit only |
//! | [`Deps::Values`] (`deps![a, b]`) | after the first commit and whenever any value changed |
//!
//! The cleanup returned by a run fires right before the next run of the same
//! effect, or when the instance unmounts. A skipped run leaves the previous
//! cleanup in place.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

trait DepCompare {
	fn as_any(&self) -> &dyn Any;
	fn eq_dep(&self, other: &dyn DepCompare) -> bool;
	fn fmt_dep(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> DepCompare for T
where
	T: PartialEq + fmt::Debug + 'static,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn eq_dep(&self, other: &dyn DepCompare) -> bool {
		other
			.as_any()
			.downcast_ref::<T>()
			.is_some_and(|other| self == other)
	}

	fn fmt_dep(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// One entry of a dependency list, compared by value
///
/// Values of different types never compare equal.
#[derive(Clone)]
pub struct DepValue(Rc<dyn DepCompare>);

impl DepValue {
	pub fn new<T>(value: T) -> Self
	where
		T: PartialEq + fmt::Debug + 'static,
	{
		Self(Rc::new(value))
	}
}

impl PartialEq for DepValue {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_dep(other.0.as_ref())
	}
}

impl fmt::Debug for DepValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt_dep(f)
	}
}

/// When an effect runs
#[derive(Debug, Clone, PartialEq)]
pub enum Deps {
	/// After every commit
	Always,
	/// After the first commit only
	Once,
	/// After the first commit and whenever a value differs from the last run
	Values(Vec<DepValue>),
}

impl Deps {
	pub fn always() -> Self {
		Deps::Always
	}

	pub fn once() -> Self {
		Deps::Once
	}

	/// The values recorded after a run
	pub(crate) fn into_values(self) -> Vec<DepValue> {
		match self {
			Deps::Values(values) => values,
			Deps::Always | Deps::Once => Vec::new(),
		}
	}

	/// Decide whether an effect whose last run saw `last` must run again
	///
	/// `last` is `None` until the effect has run once.
	pub fn should_run(&self, last: Option<&[DepValue]>) -> bool {
		match (self, last) {
			(_, None) => true,
			(Deps::Always, Some(_)) => true,
			(Deps::Once, Some(last)) => !last.is_empty(),
			(Deps::Values(values), Some(last)) => values.as_slice() != last,
		}
	}
}

/// Build a [`Deps`] list
///
/// `deps![]` is [`Deps::Once`]; `deps![a, b]` is [`Deps::Values`] holding
/// the given values.
///
/// ```
/// use hookloop_reactive::{deps, Deps};
///
/// assert_eq!(deps![], Deps::Once);
/// let id = 7u32;
/// assert!(matches!(deps![id, "name"], Deps::Values(ref v) if v.len() == 2));
/// ```
#[macro_export]
macro_rules! deps {
	() => {
		$crate::Deps::Once
	};
	($($value:expr),+ $(,)?) => {
		$crate::Deps::Values(vec![$($crate::DepValue::new($value)),+])
	};
}

/// A cleanup returned by an effect run
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
	pub fn new<F>(cleanup: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self(Box::new(cleanup))
	}

	pub(crate) fn run(self) {
		(self.0)()
	}
}

impl fmt::Debug for Cleanup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Cleanup")
	}
}

/// Values an effect may return
///
/// `()` and `None::<fn()>` mean no cleanup; `Some(f)` and [`Cleanup`]
/// register one.
pub trait EffectCleanup {
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl EffectCleanup for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl EffectCleanup for Cleanup {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(self)
	}
}

impl<F> EffectCleanup for Option<F>
where
	F: FnOnce() + 'static,
{
	fn into_cleanup(self) -> Option<Cleanup> {
		self.map(Cleanup::new)
	}
}

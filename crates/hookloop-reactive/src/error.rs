//! Hook and scheduler errors

use std::fmt;

use hookloop_core::LoopError;

use crate::component::InstanceId;

/// Kind of a hook slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
	State,
	Effect,
}

impl fmt::Display for HookKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HookKind::State => write!(f, "use_state"),
			HookKind::Effect => write!(f, "use_effect"),
		}
	}
}

/// Violations of the hook call-order contract
///
/// Hooks are matched to slots purely by call position, so any render that
/// calls a different number, kind or type of hooks than the previous one
/// fails instead of reading another hook's value.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
	#[error("hook count changed between renders: expected {expected}, found {found}")]
	SlotCountMismatch { expected: usize, found: usize },

	#[error("hook {index} changed kind: expected {expected}, found {found}")]
	KindMismatch {
		index: usize,
		expected: HookKind,
		found: HookKind,
	},

	#[error("state hook {index} changed type: expected {expected}, found {found}")]
	TypeMismatch {
		index: usize,
		expected: &'static str,
		found: &'static str,
	},

	#[error("hooks called outside of a render")]
	OutsideRender,
}

pub type HookResult<T> = Result<T, HookError>;

/// Errors reported by the [`Scheduler`](crate::Scheduler)
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
	#[error("{instance} failed to render: {source}")]
	Hook {
		instance: InstanceId,
		#[source]
		source: HookError,
	},

	#[error("unknown component instance {0}")]
	UnknownInstance(InstanceId),

	#[error("{instance} kept re-rendering for more than {limit} consecutive passes")]
	RenderLoopLimit { instance: InstanceId, limit: u32 },

	#[error("scheduler has been shut down")]
	ShutDown,

	#[error(transparent)]
	Loop(#[from] LoopError),
}

impl SchedulerError {
	/// The instance the error is about, if any
	pub fn instance(&self) -> Option<InstanceId> {
		match self {
			SchedulerError::Hook { instance, .. } | SchedulerError::RenderLoopLimit { instance, .. } => {
				Some(*instance)
			}
			SchedulerError::UnknownInstance(instance) => Some(*instance),
			SchedulerError::ShutDown | SchedulerError::Loop(_) => None,
		}
	}
}

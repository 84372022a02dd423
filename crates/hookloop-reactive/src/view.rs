//! View renderer contract

use crate::component::InstanceId;

/// Receives committed views
///
/// The scheduler calls [`commit`](ViewRenderer::commit) exactly once per
/// successful render, before any of that render's effects run.
pub trait ViewRenderer<V> {
	fn commit(&mut self, instance: InstanceId, view: V);

	/// Called once when an instance is unmounted
	fn unmount(&mut self, instance: InstanceId) {
		let _ = instance;
	}
}

impl<V, F> ViewRenderer<V> for F
where
	F: FnMut(InstanceId, V),
{
	fn commit(&mut self, instance: InstanceId, view: V) {
		self(instance, view)
	}
}

/// Renderer that drops every view
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl<V> ViewRenderer<V> for NullRenderer {
	fn commit(&mut self, _instance: InstanceId, _view: V) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_closure_renderer_receives_commits() {
		let mut seen = Vec::new();
		{
			let mut renderer = |id: InstanceId, view: &'static str| seen.push((id, view));
			renderer.commit(InstanceId::new(1), "a");
			ViewRenderer::<&'static str>::unmount(&mut renderer, InstanceId::new(1));
		}

		assert_eq!(seen, vec![(InstanceId::new(1), "a")]);
	}
}

//! Per-binding cleanup records.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use crate::reconcile::KeyedNodes;

/// Cleanup function of a binding.
pub type Cleanup = Box<dyn FnOnce()>;

/// State of one reactive binding site: an attribute, an event listener or a
/// children slot.
///
/// Tracks are keyed by [`track_key`] and owned by the template or component
/// that created them.
#[derive(Default)]
pub struct NodeTrack {
	cleanup: Option<Cleanup>,
	/// Children rendered by this binding, kept across re-patches so that
	/// reconciliation can reuse them
	pub last_nodes: Option<Rc<RefCell<KeyedNodes>>>,
	/// Whether the binding targets the mount parent (index 0)
	pub is_root: bool,
}

impl NodeTrack {
	pub fn new(is_root: bool) -> Self {
		Self {
			is_root,
			..Self::default()
		}
	}

	/// Replaces the cleanup, running the previous one first.
	pub fn set_cleanup(&mut self, cleanup: Cleanup) {
		self.run_cleanup();
		self.cleanup = Some(cleanup);
	}

	/// Runs the cleanup. Calling it again does nothing.
	pub fn run_cleanup(&mut self) {
		if let Some(cleanup) = self.cleanup.take() {
			cleanup();
		}
	}

	pub fn has_cleanup(&self) -> bool {
		self.cleanup.is_some()
	}

	/// Shared children state, created on first use.
	pub fn last_nodes(&mut self) -> Rc<RefCell<KeyedNodes>> {
		self.last_nodes
			.get_or_insert_with(|| Rc::new(RefCell::new(KeyedNodes::default())))
			.clone()
	}
}

impl fmt::Debug for NodeTrack {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeTrack")
			.field("has_cleanup", &self.cleanup.is_some())
			.field("has_children", &self.last_nodes.is_some())
			.field("is_root", &self.is_root)
			.finish()
	}
}

/// `"<index>:<name>:<sub>"`
pub fn track_key(index: usize, name: &str, sub: usize) -> String {
	format!("{}:{}:{}", index, name, sub)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn test_cleanup_is_idempotent() {
		let calls = Rc::new(Cell::new(0));
		let mut track = NodeTrack::new(false);
		let c = calls.clone();
		track.set_cleanup(Box::new(move || c.set(c.get() + 1)));

		track.run_cleanup();
		track.run_cleanup();
		assert_eq!(calls.get(), 1);
		assert!(!track.has_cleanup());
	}

	#[test]
	fn test_set_cleanup_runs_previous() {
		let calls = Rc::new(Cell::new(0));
		let mut track = NodeTrack::default();
		for _ in 0..3 {
			let c = calls.clone();
			track.set_cleanup(Box::new(move || c.set(c.get() + 1)));
		}
		assert_eq!(calls.get(), 2);
	}

	#[test]
	fn test_track_key() {
		assert_eq!(track_key(3, "children", 1), "3:children:1");
	}
}

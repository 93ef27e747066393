//! Ownership of mounted instances.
//!
//! A mounted instance is held by the thread's owner table until it is
//! unmounted or handed over through `inherit_node`. Dropping the handle
//! `mount` was called on leaves the instance and its bindings running.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::render_node::RenderNode;

thread_local! {
	static LIVE: RefCell<HashMap<usize, RenderNode>> = RefCell::new(HashMap::new());
}

/// Holds `node` until [`release`] is called with its address.
pub(crate) fn retain(node: RenderNode) {
	let addr = node.addr();
	let replaced = LIVE
		.try_with(|live| live.borrow_mut().insert(addr, node))
		.ok()
		.flatten();
	// dropped outside the table borrow
	drop(replaced);
}

pub(crate) fn release(addr: usize) {
	let removed = LIVE
		.try_with(|live| live.borrow_mut().remove(&addr))
		.ok()
		.flatten();
	drop(removed);
}

/// Number of instances mounted on this thread and not yet unmounted.
pub fn live_count() -> usize {
	LIVE.try_with(|live| live.borrow().len()).unwrap_or(0)
}

/// Returns true while `node` is held by the owner table.
pub fn is_live(node: &RenderNode) -> bool {
	let addr = node.addr();
	LIVE.try_with(|live| live.borrow().contains_key(&addr))
		.unwrap_or(false)
}

//! Side effects that re-run when the signals they read change.
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//! use stencil_runtime::{Effect, Signal};
//!
//! let count = Signal::new(1);
//! let doubled = Rc::new(Cell::new(0));
//!
//! let (c, d) = (count.clone(), doubled.clone());
//! let _effect = Effect::new(move || d.set(c.get() * 2));
//!
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Frame, FrameGuard, ReactiveId, try_with_graph, with_graph};

type Body = Rc<RefCell<Box<dyn FnMut()>>>;

thread_local! {
	static BODIES: RefCell<HashMap<ReactiveId, Body>> = RefCell::new(HashMap::new());
}

/// Runs the body of effect `id`, relinking its reads.
///
/// The body is cloned out of the registry first, so the body itself may
/// create or dispose effects. A body that is already on the stack is skipped
/// rather than re-entered.
fn run(id: ReactiveId) {
	let Some(body) = BODIES.with(|bodies| bodies.borrow().get(&id).cloned()) else {
		return;
	};
	let Ok(mut body) = body.try_borrow_mut() else {
		tracing::trace!(?id, "effect already running");
		return;
	};
	with_graph(|graph| graph.unlink_sources(id));
	let _frame = FrameGuard::enter(Frame::Effect(id));
	body();
}

/// Re-runs every effect reading `source`, oldest link first.
pub(crate) fn run_readers(source: ReactiveId) {
	for reader in with_graph(|graph| graph.readers(source)) {
		run(reader);
	}
}

/// A running effect. Dropping it disposes it.
pub struct Effect {
	id: ReactiveId,
}

impl Effect {
	/// Registers `f` and runs it once.
	pub fn new(f: impl FnMut() + 'static) -> Self {
		let id = ReactiveId::next();
		let body: Body = Rc::new(RefCell::new(Box::new(f)));
		BODIES.with(|bodies| bodies.borrow_mut().insert(id, body));
		run(id);
		Self { id }
	}

	pub fn id(&self) -> ReactiveId {
		self.id
	}

	/// True until the effect is dropped.
	pub fn is_active(&self) -> bool {
		BODIES
			.try_with(|bodies| bodies.borrow().contains_key(&self.id))
			.unwrap_or(false)
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		let _ = try_with_graph(|graph| graph.forget(self.id));
		// The body may be the caller (an effect dropping its own handle), so
		// it is released after the registry borrow ends.
		let body = BODIES
			.try_with(|bodies| bodies.borrow_mut().remove(&self.id))
			.ok()
			.flatten();
		drop(body);
	}
}

impl fmt::Debug for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Effect").field(&self.id).finish()
	}
}

/// Starts an effect and returns its disposer.
pub fn effect(f: impl FnMut() + 'static) -> impl FnOnce() {
	let effect = Effect::new(f);
	move || drop(effect)
}

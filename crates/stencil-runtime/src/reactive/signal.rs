//! Reactive values.
//!
//! ```
//! use stencil_runtime::Signal;
//!
//! let count = Signal::new(0);
//! count.set(42);
//! count.update(|n| *n += 1);
//! assert_eq!(count.get(), 43);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::effect;
use super::runtime::{ReactiveId, try_with_graph, with_graph};

/// A value whose reads are tracked and whose writes re-run the effects that
/// read it.
///
/// Clones are handles to the same signal.
pub struct Signal<T: 'static> {
	id: ReactiveId,
	cell: Rc<RefCell<T>>,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			cell: Rc::clone(&self.cell),
		}
	}
}

impl<T: 'static> Signal<T> {
	pub fn new(value: T) -> Self {
		Self {
			id: ReactiveId::next(),
			cell: Rc::new(RefCell::new(value)),
		}
	}

	/// Tracked read.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.cell.borrow().clone()
	}

	/// Tracked read through a borrow.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		with_graph(|graph| graph.record_read(self.id));
		f(&self.cell.borrow())
	}

	/// Replaces the value and re-runs the effects reading it.
	pub fn set(&self, value: T) {
		self.update(|slot| *slot = value);
	}

	/// Mutates the value in place, then re-runs the effects reading it once.
	pub fn update(&self, f: impl FnOnce(&mut T)) {
		f(&mut self.cell.borrow_mut());
		effect::run_readers(self.id);
	}

	pub fn id(&self) -> ReactiveId {
		self.id
	}

	/// True when both handles refer to the same signal.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.cell, &other.cell)
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		if Rc::strong_count(&self.cell) == 1 {
			let _ = try_with_graph(|graph| graph.forget(self.id));
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.cell.try_borrow() {
			Ok(value) => f.debug_tuple("Signal").field(&*value).finish(),
			Err(_) => f.write_str("Signal(<borrowed>)"),
		}
	}
}

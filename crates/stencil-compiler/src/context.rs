//! Per-compilation state.

use crate::options::CompilerOptions;

/// State threaded through building and partitioning.
///
/// Holds the positional index counter of the unit currently being built and
/// the counter used to name hoisted templates. Nothing here is global, so
/// independent compilations never interfere.
#[derive(Debug, Clone)]
pub struct CompilerContext {
	options: CompilerOptions,
	next_index: usize,
	next_template: usize,
}

impl CompilerContext {
	/// Creates a context for one compilation.
	pub fn new(options: CompilerOptions) -> Self {
		Self {
			options,
			next_index: 1,
			next_template: 1,
		}
	}

	/// Returns the compiler options.
	pub fn options(&self) -> &CompilerOptions {
		&self.options
	}

	/// Restarts index assignment for a new root. Index 0 is the mount parent.
	pub fn reset_index(&mut self) {
		self.next_index = 1;
	}

	/// Assigns the next positional index.
	pub fn next_index(&mut self) -> usize {
		let index = self.next_index;
		self.next_index += 1;
		index
	}

	/// Number of indices handed out since the last reset.
	pub fn assigned(&self) -> usize {
		self.next_index - 1
	}

	/// Allocates the id of the next hoisted template.
	pub fn next_template_id(&mut self) -> usize {
		let id = self.next_template;
		self.next_template += 1;
		id
	}

	/// Runs `f` with a fresh index space, restoring the current one after.
	///
	/// Used for subtrees that become their own compiled unit (component
	/// children, fragments, `.map` callback bodies).
	pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
		let saved = self.next_index;
		self.next_index = 1;
		let out = f(self);
		self.next_index = saved;
		out
	}
}

impl Default for CompilerContext {
	fn default() -> Self {
		Self::new(CompilerOptions::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nested_restores_counter() {
		let mut ctx = CompilerContext::default();
		assert_eq!(ctx.next_index(), 1);
		assert_eq!(ctx.next_index(), 2);

		let inner = ctx.nested(|ctx| (ctx.next_index(), ctx.next_index()));
		assert_eq!(inner, (1, 2));
		assert_eq!(ctx.next_index(), 3);
	}

	#[test]
	fn test_template_ids_are_unique() {
		let mut ctx = CompilerContext::default();
		let a = ctx.next_template_id();
		let b = ctx.nested(|ctx| ctx.next_template_id());
		assert_ne!(a, b);
	}
}

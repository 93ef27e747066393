//! Dependency graph shared by signals and effects.
//!
//! Reading a signal while an effect runs links the signal to that effect.
//! Writing the signal re-runs its linked effects in link order, on the
//! writer's stack, before the write returns. An effect drops its links before
//! each run so that only the reads of the latest run count.
//!
//! The graph is thread-local. Nothing here is `Send`, and nothing needs to
//! be: mounting and patching happen on the thread that owns the DOM.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Identity of a signal or effect in the thread's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactiveId(u64);

impl ReactiveId {
	pub(crate) fn next() -> Self {
		thread_local! {
			static NEXT: Cell<u64> = const { Cell::new(0) };
		}
		NEXT.with(|next| {
			let id = next.get();
			next.set(id + 1);
			Self(id)
		})
	}
}

/// What reads are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
	Effect(ReactiveId),
	Untracked,
}

#[derive(Debug, Default)]
struct Links {
	/// Effects that read this signal, oldest first
	readers: Vec<ReactiveId>,
	/// Signals this effect read during its last run
	sources: Vec<ReactiveId>,
}

/// Links between signals and the effects reading them.
#[derive(Debug, Default)]
pub struct Graph {
	frames: RefCell<Vec<Frame>>,
	links: RefCell<HashMap<ReactiveId, Links>>,
}

impl Graph {
	/// The effect reads are currently attributed to.
	pub fn tracking(&self) -> Option<ReactiveId> {
		match self.frames.borrow().last() {
			Some(Frame::Effect(id)) => Some(*id),
			_ => None,
		}
	}

	pub(crate) fn enter(&self, frame: Frame) {
		self.frames.borrow_mut().push(frame);
	}

	pub(crate) fn leave(&self) {
		self.frames.borrow_mut().pop();
	}

	/// Links `source` to the tracking effect, once.
	pub(crate) fn record_read(&self, source: ReactiveId) {
		let Some(reader) = self.tracking() else {
			return;
		};
		let mut links = self.links.borrow_mut();
		let readers = &mut links.entry(source).or_default().readers;
		if readers.contains(&reader) {
			return;
		}
		readers.push(reader);
		links.entry(reader).or_default().sources.push(source);
	}

	/// Effects linked to `source`, copied so that running them may relink.
	pub(crate) fn readers(&self, source: ReactiveId) -> Vec<ReactiveId> {
		self.links
			.borrow()
			.get(&source)
			.map(|links| links.readers.clone())
			.unwrap_or_default()
	}

	/// Drops every link from a signal to `reader`.
	pub(crate) fn unlink_sources(&self, reader: ReactiveId) {
		let mut links = self.links.borrow_mut();
		let sources = match links.get_mut(&reader) {
			Some(entry) => std::mem::take(&mut entry.sources),
			None => return,
		};
		for source in sources {
			if let Some(entry) = links.get_mut(&source) {
				entry.readers.retain(|&id| id != reader);
			}
		}
	}

	/// Removes `id` and every link touching it.
	pub(crate) fn forget(&self, id: ReactiveId) {
		self.unlink_sources(id);
		let mut links = self.links.borrow_mut();
		if let Some(entry) = links.remove(&id) {
			for reader in entry.readers {
				if let Some(reader) = links.get_mut(&reader) {
					reader.sources.retain(|&source| source != id);
				}
			}
		}
	}

	pub fn contains(&self, id: ReactiveId) -> bool {
		self.links.borrow().contains_key(&id)
	}

	/// Number of effects currently reading `source`.
	pub fn reader_count(&self, source: ReactiveId) -> usize {
		self.links
			.borrow()
			.get(&source)
			.map_or(0, |links| links.readers.len())
	}
}

thread_local! {
	static GRAPH: Graph = Graph::default();
}

/// Runs `f` against the thread's graph.
pub fn with_graph<R>(f: impl FnOnce(&Graph) -> R) -> R {
	GRAPH.with(f)
}

/// Like [`with_graph`], but `None` once thread-local storage is torn down.
pub(crate) fn try_with_graph<R>(f: impl FnOnce(&Graph) -> R) -> Option<R> {
	GRAPH.try_with(f).ok()
}

/// Pops its frame when dropped, so a panicking effect body cannot leave a
/// stale frame behind.
pub(crate) struct FrameGuard(());

impl FrameGuard {
	pub(crate) fn enter(frame: Frame) -> Self {
		with_graph(|graph| graph.enter(frame));
		Self(())
	}
}

impl Drop for FrameGuard {
	fn drop(&mut self) {
		let _ = try_with_graph(Graph::leave);
	}
}

/// Runs `f` without linking the signals it reads.
///
/// Children mounted from inside an effect go through here, otherwise their
/// reads would subscribe the parent effect.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
	let _frame = FrameGuard::enter(Frame::Untracked);
	f()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reading(graph: &Graph, reader: ReactiveId, sources: &[ReactiveId]) {
		graph.enter(Frame::Effect(reader));
		for &source in sources {
			graph.record_read(source);
		}
		graph.leave();
	}

	#[test]
	fn test_ids_are_distinct() {
		assert_ne!(ReactiveId::next(), ReactiveId::next());
	}

	#[test]
	fn test_frames_nest() {
		let graph = Graph::default();
		let effect = ReactiveId::next();
		assert_eq!(graph.tracking(), None);

		graph.enter(Frame::Effect(effect));
		assert_eq!(graph.tracking(), Some(effect));
		graph.enter(Frame::Untracked);
		assert_eq!(graph.tracking(), None);
		graph.leave();
		assert_eq!(graph.tracking(), Some(effect));
	}

	#[test]
	fn test_reads_link_once_in_order() {
		let graph = Graph::default();
		let source = ReactiveId::next();
		let (first, second) = (ReactiveId::next(), ReactiveId::next());

		reading(&graph, first, &[source, source]);
		reading(&graph, second, &[source]);
		assert_eq!(graph.readers(source), vec![first, second]);
	}

	#[test]
	fn test_unlink_and_forget() {
		let graph = Graph::default();
		let (a, b) = (ReactiveId::next(), ReactiveId::next());
		let effect = ReactiveId::next();
		reading(&graph, effect, &[a, b]);

		graph.unlink_sources(effect);
		assert_eq!(graph.reader_count(a), 0);
		assert_eq!(graph.reader_count(b), 0);

		reading(&graph, effect, &[a]);
		graph.forget(a);
		assert!(!graph.contains(a));
		graph.forget(effect);
		assert!(!graph.contains(effect));
	}

	#[test]
	fn test_untrack_hides_reads() {
		let source = ReactiveId::next();
		let effect = ReactiveId::next();
		with_graph(|graph| graph.enter(Frame::Effect(effect)));
		untrack(|| with_graph(|graph| graph.record_read(source)));
		with_graph(|graph| {
			graph.leave();
			assert_eq!(graph.reader_count(source), 0);
		});
	}
}

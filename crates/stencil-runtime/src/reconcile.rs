//! Keyed Children Reconciler.
//!
//! Given the entries rendered for a children slot last time and the next
//! child list, [`reconcile`] updates the DOM with as few operations as it
//! can:
//!
//! - children are keyed by their explicit key, or by position;
//! - an entry whose key survives is reused; text entries only update their
//!   data, render entries inherit the previous instance;
//! - surviving entries that form the longest increasing run of old
//!   positions stay where they are, the others are moved;
//! - new entries are mounted before the next placed entry (or the slot
//!   anchor), stale entries are unmounted.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::dom::Node;
use crate::error::Result;
use crate::props::Child;
use crate::reactive::untrack;
use crate::render_node::RenderNode;

/// Reconciliation key of a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	/// Key given by the child
	Explicit(String),
	/// Position in the child list
	Index(usize),
}

/// A rendered child.
#[derive(Debug, Clone)]
pub enum Entry {
	/// Text node created from a primitive value
	Text(Node),
	/// Mounted render node
	Render(RenderNode),
}

impl Entry {
	fn fresh(child: Child) -> Self {
		match child {
			Child::Value(value) => Self::Text(Node::text(text_of(&value))),
			Child::Render(node) => Self::Render(node),
		}
	}

	/// First DOM node of the entry.
	pub fn first_node(&self) -> Option<Node> {
		match self {
			Self::Text(node) => Some(node.clone()),
			Self::Render(node) => node.first_child(),
		}
	}

	/// DOM nodes of the entry in order.
	pub fn nodes(&self) -> Vec<Node> {
		match self {
			Self::Text(node) => vec![node.clone()],
			Self::Render(node) => node.nodes(),
		}
	}

	fn place(&self, parent: &Node, before: Option<&Node>) -> Result<()> {
		match self {
			Self::Text(node) => {
				parent.insert_before(node, before);
				Ok(())
			}
			Self::Render(node) => node.mount(parent, before).map(|_| ()),
		}
	}

	fn unmount(self) {
		match self {
			Self::Text(node) => node.remove(),
			Self::Render(node) => node.unmount(),
		}
	}
}

/// Entries of one children slot in DOM order.
#[derive(Debug, Default)]
pub struct KeyedNodes {
	entries: Vec<(Key, Entry)>,
}

impl KeyedNodes {
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &Key> {
		self.entries.iter().map(|(key, _)| key)
	}

	pub fn entries(&self) -> impl Iterator<Item = &Entry> {
		self.entries.iter().map(|(_, entry)| entry)
	}

	/// All DOM nodes of all entries, in order.
	pub fn nodes(&self) -> Vec<Node> {
		self.entries.iter().flat_map(|(_, e)| e.nodes()).collect()
	}

	pub fn first_node(&self) -> Option<Node> {
		self.entries.iter().find_map(|(_, e)| e.first_node())
	}

	/// Unmounts every entry.
	pub fn unmount_all(&mut self) {
		for (_, entry) in self.entries.drain(..) {
			entry.unmount();
		}
	}
}

/// Text a primitive renders as.
pub fn text_of(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null | Value::Bool(_) => String::new(),
		other => other.to_string(),
	}
}

/// Flattens arrays and drops values that render nothing.
pub fn flatten_children(children: Vec<Child>) -> Vec<Child> {
	let mut out = Vec::with_capacity(children.len());
	flatten_into(children, &mut out);
	out
}

fn flatten_into(children: Vec<Child>, out: &mut Vec<Child>) {
	for child in children {
		match child {
			Child::Value(Value::Array(items)) => {
				flatten_into(items.into_iter().map(Child::Value).collect(), out)
			}
			Child::Value(Value::Null | Value::Bool(_)) => {}
			other => out.push(other),
		}
	}
}

/// Reconciles `prev` against `next` under `parent`, inserting before
/// `before` (appending when `None`). Returns the new entries.
///
/// Mount failures of individual children are logged and the child is
/// skipped; the rest of the list is still reconciled.
pub fn reconcile(
	parent: &Node,
	prev: KeyedNodes,
	next: Vec<Child>,
	before: Option<&Node>,
) -> KeyedNodes {
	let next = flatten_children(next);
	let prev_len = prev.len();
	let mut by_key: HashMap<Key, (usize, Entry)> = prev
		.entries
		.into_iter()
		.enumerate()
		.map(|(position, (key, entry))| (key, (position, entry)))
		.collect();

	let mut seen: HashSet<Key> = HashSet::with_capacity(next.len());
	let mut placed: Vec<(Key, Entry, Option<usize>)> = Vec::with_capacity(next.len());
	let mut stale: Vec<(usize, Entry)> = Vec::new();

	for (position, child) in next.into_iter().enumerate() {
		let mut key = match &child {
			Child::Render(node) => node.key().map_or(Key::Index(position), Key::Explicit),
			Child::Value(_) => Key::Index(position),
		};
		if !seen.insert(key.clone()) {
			tracing::warn!(?key, "duplicate child key, falling back to position");
			key = Key::Index(position);
			seen.insert(key.clone());
		}

		let (entry, old_position) = match (by_key.remove(&key), child) {
			(Some((old, Entry::Text(node))), Child::Value(value)) => {
				let text = text_of(&value);
				if node.text_content() != text {
					node.set_text_content(text);
				}
				(Entry::Text(node), Some(old))
			}
			(Some((old, Entry::Render(prev_node))), Child::Render(node))
				if prev_node.ptr_eq(&node) =>
			{
				(Entry::Render(prev_node), Some(old))
			}
			(Some((old, Entry::Render(prev_node))), Child::Render(node))
				if node.can_inherit(&prev_node) =>
			{
				match untrack(|| node.inherit_node(&prev_node)) {
					Ok(()) => (Entry::Render(node), Some(old)),
					Err(err) => {
						tracing::warn!(%err, ?key, "failed to inherit child, remounting");
						stale.push((old, Entry::Render(prev_node)));
						(Entry::Render(node), None)
					}
				}
			}
			(Some((old, entry)), child) => {
				stale.push((old, entry));
				(Entry::fresh(child), None)
			}
			(None, child) => (Entry::fresh(child), None),
		};
		placed.push((key, entry, old_position));
	}

	stale.extend(by_key.into_values());
	stale.sort_by_key(|(position, _)| *position);
	let removed = stale.len();
	for (_, entry) in stale {
		entry.unmount();
	}

	let old_positions: Vec<Option<usize>> = placed.iter().map(|(_, _, old)| *old).collect();
	let stable = stable_positions(&old_positions);

	let mut moved = 0usize;
	let mut anchor: Option<Node> = before.cloned();
	let mut entries = Vec::with_capacity(placed.len());
	for (i, (key, entry, old)) in placed.into_iter().enumerate().rev() {
		if old.is_none() || !stable[i] {
			if old.is_some() {
				moved += 1;
			}
			if let Err(err) = untrack(|| entry.place(parent, anchor.as_ref())) {
				tracing::warn!(%err, ?key, "failed to mount child");
				continue;
			}
		}
		if let Some(first) = entry.first_node() {
			anchor = Some(first);
		}
		entries.push((key, entry));
	}
	entries.reverse();

	tracing::trace!(
		prev = prev_len,
		next = entries.len(),
		removed,
		moved,
		"reconciled children"
	);
	KeyedNodes { entries }
}

/// Marks the entries that keep their place: the longest subsequence whose
/// old positions increase. `None` (new entries) never belongs to it.
fn stable_positions(old_positions: &[Option<usize>]) -> Vec<bool> {
	let candidates: Vec<(usize, usize)> = old_positions
		.iter()
		.enumerate()
		.filter_map(|(i, old)| old.map(|old| (i, old)))
		.collect();

	// tails[k] = candidate index ending the best run of length k + 1
	let mut tails: Vec<usize> = Vec::new();
	let mut predecessor: Vec<Option<usize>> = vec![None; candidates.len()];
	for (c, &(_, old)) in candidates.iter().enumerate() {
		let k = tails.partition_point(|&t| candidates[t].1 < old);
		if k > 0 {
			predecessor[c] = Some(tails[k - 1]);
		}
		if k == tails.len() {
			tails.push(c);
		} else {
			tails[k] = c;
		}
	}

	let mut stable = vec![false; old_positions.len()];
	let mut cursor = tails.last().copied();
	while let Some(c) = cursor {
		stable[candidates[c].0] = true;
		cursor = predecessor[c];
	}
	stable
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn values(items: &[&str]) -> Vec<Child> {
		items.iter().map(|s| Child::Value(json!(s))).collect()
	}

	#[test]
	fn test_stable_positions() {
		let mask = stable_positions(&[Some(2), Some(0), None, Some(1), Some(3)]);
		assert_eq!(mask, vec![false, true, false, true, true]);
		assert!(stable_positions(&[]).is_empty());
	}

	#[test]
	fn test_values_reuse_text_nodes_by_position() {
		let parent = Node::element("p");
		let anchor = Node::comment("");
		parent.append_child(&anchor);

		let first = reconcile(&parent, KeyedNodes::default(), values(&["a", "b"]), Some(&anchor));
		assert_eq!(parent.inner_html(), "ab<!>");
		let a = first.nodes()[0].clone();

		let second = reconcile(&parent, first, values(&["c"]), Some(&anchor));
		assert_eq!(parent.inner_html(), "c<!>");
		assert!(second.nodes()[0].ptr_eq(&a));
	}

	#[test]
	fn test_empty_transitions() {
		let parent = Node::element("ul");
		let filled = reconcile(&parent, KeyedNodes::default(), values(&["x", "y", "z"]), None);
		assert_eq!(parent.text_content(), "xyz");
		let emptied = reconcile(&parent, filled, Vec::new(), None);
		assert!(emptied.is_empty());
		assert_eq!(parent.child_count(), 0);
	}

	#[test]
	fn test_arrays_flatten_and_nulls_vanish() {
		let parent = Node::element("div");
		let children = vec![
			Child::Value(json!(["a", 1, null])),
			Child::Value(json!(false)),
			Child::Value(json!(2.5)),
		];
		let nodes = reconcile(&parent, KeyedNodes::default(), children, None);
		assert_eq!(nodes.len(), 3);
		assert_eq!(parent.text_content(), "a12.5");
	}

	proptest! {
		/// Property: after reconciling any list against any other, the DOM
		/// shows exactly the next list, in order, before the anchor
		#[test]
		fn prop_dom_matches_next(
			first in proptest::collection::vec("[a-c]{1,2}", 0..6),
			second in proptest::collection::vec("[a-c]{1,2}", 0..6),
		) {
			let parent = Node::element("div");
			let anchor = Node::comment("");
			parent.append_child(&anchor);
			let to_children = |items: &Vec<String>| items.iter().map(|s| Child::Value(json!(s))).collect::<Vec<_>>();

			let prev = reconcile(&parent, KeyedNodes::default(), to_children(&first), Some(&anchor));
			let next = reconcile(&parent, prev, to_children(&second), Some(&anchor));

			prop_assert_eq!(next.len(), second.len());
			prop_assert_eq!(parent.inner_html(), format!("{}<!>", second.concat()));
		}
	}
}

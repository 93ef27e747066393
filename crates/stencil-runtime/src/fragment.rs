//! Fragments: child content without a wrapping element.

use core::fmt;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::dom::Node;
use crate::error::{Result, RuntimeError};
use crate::owner;
use crate::props::Children;
use crate::reconcile::KeyedNodes;
use crate::template::bind_children;
use crate::track::Cleanup;

struct FragmentState {
	children: Children,
	key: Option<String>,
	parent: Option<Node>,
	/// End marker, present for reactive content so that re-renders have a
	/// stable insertion point
	anchor: Option<Node>,
	last: Rc<RefCell<KeyedNodes>>,
	cleanup: Option<Cleanup>,
	mounted: bool,
}

/// Mountable list of children.
#[derive(Clone)]
pub struct FragmentNode(Rc<RefCell<FragmentState>>);

impl FragmentNode {
	pub fn new(children: Children, key: Option<String>) -> Self {
		Self(Rc::new(RefCell::new(FragmentState {
			children,
			key,
			parent: None,
			anchor: None,
			last: Rc::default(),
			cleanup: None,
			mounted: false,
		})))
	}

	pub fn key(&self) -> Option<String> {
		self.0.borrow().key.clone()
	}

	pub fn ptr_eq(&self, other: &FragmentNode) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	pub fn is_reactive(&self) -> bool {
		self.0.borrow().children.is_reactive()
	}

	pub fn is_connected(&self) -> bool {
		self.0.borrow().mounted && self.first_child().is_none_or(|node| node.is_connected())
	}

	/// Rendered nodes followed by the anchor, if any.
	pub fn nodes(&self) -> Vec<Node> {
		let state = self.0.borrow();
		let mut nodes = state.last.borrow().nodes();
		nodes.extend(state.anchor.clone());
		nodes
	}

	pub fn first_child(&self) -> Option<Node> {
		self.nodes().into_iter().next()
	}

	pub fn mount(&self, parent: &Node, before: Option<&Node>) -> Result<Vec<Node>> {
		if !parent.is_container() {
			return Err(RuntimeError::MissingContainer);
		}
		if self.0.borrow().mounted {
			for node in self.nodes() {
				parent.insert_before(&node, before);
			}
			self.0.borrow_mut().parent = Some(parent.clone());
			return Ok(self.nodes());
		}

		let (children, last) = {
			let state = self.0.borrow();
			(state.children.clone(), state.last.clone())
		};
		let anchor = if children.is_reactive() {
			let anchor = Node::comment("");
			parent.insert_before(&anchor, before);
			Some(anchor)
		} else {
			None
		};
		{
			let mut state = self.0.borrow_mut();
			state.parent = Some(parent.clone());
			state.anchor = anchor.clone();
			state.mounted = true;
		}
		owner::retain(self.clone().into());
		let insert_before = anchor.or_else(|| before.cloned());
		let cleanup = bind_children(parent.clone(), insert_before, children, last);
		self.0.borrow_mut().cleanup = cleanup;
		tracing::trace!(entries = self.0.borrow().last.borrow().len(), "mounted fragment");
		Ok(self.nodes())
	}

	pub fn unmount(&self) {
		let (cleanup, last, anchor) = {
			let mut state = self.0.borrow_mut();
			if !state.mounted {
				return;
			}
			state.mounted = false;
			state.parent = None;
			(state.cleanup.take(), state.last.clone(), state.anchor.take())
		};
		owner::release(self.addr());
		if let Some(cleanup) = cleanup {
			cleanup();
		}
		let mut rendered = mem::take(&mut *last.borrow_mut());
		rendered.unmount_all();
		if let Some(anchor) = anchor {
			anchor.remove();
		}
	}

	/// Takes over the rendered entries of `prev` and reconciles this
	/// fragment's children against them.
	pub fn inherit_node(&self, prev: &FragmentNode) -> Result<()> {
		if self.ptr_eq(prev) {
			return Ok(());
		}
		let (parent, anchor, last, cleanup, mounted) = {
			let mut old = prev.0.borrow_mut();
			let mounted = mem::replace(&mut old.mounted, false);
			(
				old.parent.take(),
				old.anchor.take(),
				mem::take(&mut old.last),
				old.cleanup.take(),
				mounted,
			)
		};
		if let Some(cleanup) = cleanup {
			cleanup();
		}
		let Some(parent) = parent.filter(|_| mounted) else {
			return Ok(());
		};
		owner::retain(self.clone().into());
		owner::release(prev.addr());

		// static content has no anchor; insert before whatever follows it
		let insert_before = anchor.clone().or_else(|| {
			last.borrow()
				.nodes()
				.last()
				.and_then(Node::next_sibling)
		});
		let children = {
			let mut state = self.0.borrow_mut();
			state.parent = Some(parent.clone());
			state.anchor = anchor;
			state.last = last.clone();
			state.mounted = true;
			state.children.clone()
		};
		let cleanup = bind_children(parent, insert_before, children, last);
		self.0.borrow_mut().cleanup = cleanup;
		Ok(())
	}
}

impl fmt::Debug for FragmentNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.0.borrow();
		f.debug_struct("FragmentNode")
			.field("key", &state.key)
			.field("reactive", &state.children.is_reactive())
			.field("mounted", &state.mounted)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::props::Child;
	use crate::reactive::Signal;
	use serde_json::{Value, json};
	use serial_test::serial;

	#[test]
	#[serial(reactive)]
	fn test_reactive_fragment_keeps_position() {
		let items = Signal::new(json!(["a", "b"]));
		let i = items.clone();
		let fragment = FragmentNode::new(Children::reactive(move || vec![Child::Value(i.get())]), None);

		let root = Node::element("div");
		let tail = Node::text("!");
		root.append_child(&tail);
		fragment.mount(&root, Some(&tail)).unwrap();
		assert_eq!(root.inner_html(), "ab<!>!");

		items.set(json!(["c"]));
		assert_eq!(root.inner_html(), "c<!>!");

		fragment.unmount();
		assert_eq!(root.inner_html(), "!");
	}

	#[test]
	#[serial(reactive)]
	fn test_static_fragment_inherit() {
		let root = Node::element("div");
		let first = FragmentNode::new(Children::Static(vec![json!("x").into()]), Some("f".into()));
		first.mount(&root, None).unwrap();
		let text = root.first_child().unwrap();

		let second = FragmentNode::new(Children::Static(vec![Value::from("y").into()]), Some("f".into()));
		second.inherit_node(&first).unwrap();
		assert_eq!(root.inner_html(), "y");
		assert!(root.first_child().unwrap().ptr_eq(&text));
		assert!(first.nodes().is_empty());
	}
}

//! A minimal document tree.
//!
//! The mount/patch engine only needs a handful of DOM operations: clone a
//! template, walk it, insert and remove nodes, set attributes and text, and
//! listen to events. [`Node`] provides exactly those over a reference-counted
//! tree so that the engine can run (and be tested) outside a browser.
//!
//! Parents hold their children strongly and children point back weakly, so
//! a detached subtree is freed once the last handle to it is dropped.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

use crate::html::{escape_attr, escape_text, is_void_element};

/// Identifies a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event delivered to listeners.
#[derive(Clone)]
pub struct Event {
	/// Event type, e.g. `click` or `input`
	pub kind: String,
	/// Node the event was dispatched on
	pub target: Node,
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("kind", &self.kind)
			.field("target", &self.target.describe())
			.finish()
	}
}

/// Event handler.
pub type Handler = Rc<dyn Fn(&Event)>;

struct Listener {
	id: ListenerId,
	kind: String,
	handler: Handler,
}

enum NodeKind {
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
	Fragment,
}

struct NodeData {
	kind: NodeKind,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<Node>,
	listeners: Vec<Listener>,
	next_listener: u64,
}

/// A node handle. Cloning the handle does not clone the node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
	fn with_kind(kind: NodeKind) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
			listeners: Vec::new(),
			next_listener: 0,
		})))
	}

	/// Creates an element.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Element {
			tag: tag.into(),
			attrs: Vec::new(),
		})
	}

	/// Creates a text node.
	pub fn text(data: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Text(data.into()))
	}

	/// Creates a comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Comment(data.into()))
	}

	/// Creates a document fragment. Inserting a fragment moves its children.
	pub fn fragment() -> Self {
		Self::with_kind(NodeKind::Fragment)
	}

	/// Returns true when both handles refer to the same node.
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn is_element(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Element { .. })
	}

	pub fn is_text(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Text(_))
	}

	pub fn is_comment(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Comment(_))
	}

	pub fn is_fragment(&self) -> bool {
		matches!(self.0.borrow().kind, NodeKind::Fragment)
	}

	/// Whether the node can have children.
	pub fn is_container(&self) -> bool {
		matches!(
			self.0.borrow().kind,
			NodeKind::Element { .. } | NodeKind::Fragment
		)
	}

	/// Tag name of an element.
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Data of a comment node.
	pub fn comment_data(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Comment(data) => Some(data.clone()),
			_ => None,
		}
	}

	/// Parent node, if attached.
	pub fn parent(&self) -> Option<Node> {
		self.0.borrow().parent.upgrade().map(Node)
	}

	/// Whether the node is attached to a parent.
	pub fn is_connected(&self) -> bool {
		self.parent().is_some()
	}

	/// Children in order.
	pub fn children(&self) -> Vec<Node> {
		self.0.borrow().children.clone()
	}

	pub fn child_count(&self) -> usize {
		self.0.borrow().children.len()
	}

	pub fn first_child(&self) -> Option<Node> {
		self.0.borrow().children.first().cloned()
	}

	/// Position among the parent's children.
	pub fn index_in_parent(&self) -> Option<usize> {
		let parent = self.parent()?;
		let data = parent.0.borrow();
		data.children.iter().position(|c| c.ptr_eq(self))
	}

	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent()?;
		let index = self.index_in_parent()?;
		let data = parent.0.borrow();
		data.children.get(index + 1).cloned()
	}

	/// Appends `child`, moving it from its current parent.
	pub fn append_child(&self, child: &Node) {
		self.insert_before(child, None);
	}

	/// Inserts `child` before `before`, or appends when `before` is `None`
	/// or not a child of this node.
	pub fn insert_before(&self, child: &Node, before: Option<&Node>) {
		if child.is_fragment() {
			for grandchild in child.children() {
				self.insert_before(&grandchild, before);
			}
			return;
		}
		if child.ptr_eq(self) || before.is_some_and(|b| b.ptr_eq(child)) {
			return;
		}

		child.remove();
		{
			let mut data = self.0.borrow_mut();
			let position = before
				.and_then(|b| data.children.iter().position(|c| c.ptr_eq(b)))
				.unwrap_or(data.children.len());
			data.children.insert(position, child.clone());
		}
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
	}

	/// Detaches the node from its parent.
	pub fn remove(&self) {
		if let Some(parent) = self.parent() {
			parent.0.borrow_mut().children.retain(|c| !c.ptr_eq(self));
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	/// Removes every child.
	pub fn clear_children(&self) {
		for child in self.children() {
			child.remove();
		}
	}

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.clone()),
			_ => None,
		}
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	/// Sets an attribute, keeping its position when it already exists.
	pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
		if let NodeKind::Element { attrs, .. } = &mut self.0.borrow_mut().kind {
			let value = value.into();
			match attrs.iter_mut().find(|(n, _)| n == name) {
				Some((_, v)) => *v = value,
				None => attrs.push((name.to_string(), value)),
			}
		}
	}

	pub fn remove_attribute(&self, name: &str) {
		if let NodeKind::Element { attrs, .. } = &mut self.0.borrow_mut().kind {
			attrs.retain(|(n, _)| n != name);
		}
	}

	/// Attributes in order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs.clone(),
			_ => Vec::new(),
		}
	}

	/// Text of a text or comment node, or the concatenated descendant text
	/// of an element or fragment.
	pub fn text_content(&self) -> String {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
			NodeKind::Element { .. } | NodeKind::Fragment => data
				.children
				.iter()
				.filter(|c| !c.is_comment())
				.map(Node::text_content)
				.collect(),
		}
	}

	/// Sets the data of a text or comment node. For containers, replaces the
	/// children with one text node.
	pub fn set_text_content(&self, text: impl Into<String>) {
		let text = text.into();
		let is_container = {
			let mut data = self.0.borrow_mut();
			match &mut data.kind {
				NodeKind::Text(current) | NodeKind::Comment(current) => {
					*current = text.clone();
					false
				}
				_ => true,
			}
		};
		if is_container {
			self.clear_children();
			if !text.is_empty() {
				self.append_child(&Node::text(text));
			}
		}
	}

	/// Copies the node and its descendants. Listeners are not copied.
	pub fn deep_clone(&self) -> Node {
		let data = self.0.borrow();
		let kind = match &data.kind {
			NodeKind::Element { tag, attrs } => NodeKind::Element {
				tag: tag.clone(),
				attrs: attrs.clone(),
			},
			NodeKind::Text(text) => NodeKind::Text(text.clone()),
			NodeKind::Comment(text) => NodeKind::Comment(text.clone()),
			NodeKind::Fragment => NodeKind::Fragment,
		};
		let copy = Node::with_kind(kind);
		for child in &data.children {
			copy.append_child(&child.deep_clone());
		}
		copy
	}

	/// Registers `handler` for events of type `kind`.
	pub fn add_event_listener(&self, kind: &str, handler: Handler) -> ListenerId {
		let mut data = self.0.borrow_mut();
		let id = ListenerId(data.next_listener);
		data.next_listener += 1;
		data.listeners.push(Listener {
			id,
			kind: kind.to_string(),
			handler,
		});
		id
	}

	pub fn remove_event_listener(&self, id: ListenerId) {
		self.0.borrow_mut().listeners.retain(|l| l.id != id);
	}

	/// Number of registered listeners, for all event types.
	pub fn listener_count(&self) -> usize {
		self.0.borrow().listeners.len()
	}

	/// Calls every listener for `kind` on this node, in registration order.
	pub fn dispatch_event(&self, kind: &str) {
		let handlers: Vec<Handler> = self
			.0
			.borrow()
			.listeners
			.iter()
			.filter(|l| l.kind == kind)
			.map(|l| l.handler.clone())
			.collect();
		let event = Event {
			kind: kind.to_string(),
			target: self.clone(),
		};
		for handler in handlers {
			handler(&event);
		}
	}

	/// Serializes the node.
	pub fn outer_html(&self) -> String {
		let mut out = String::new();
		self.write_html(&mut out);
		out
	}

	/// Serializes the children.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		for child in self.0.borrow().children.iter() {
			child.write_html(&mut out);
		}
		out
	}

	fn write_html(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs {
					out.push(' ');
					out.push_str(name);
					if !value.is_empty() {
						out.push_str("=\"");
						out.push_str(&escape_attr(value));
						out.push('"');
					}
				}
				if data.children.is_empty() && is_void_element(tag) {
					out.push_str("/>");
					return;
				}
				out.push('>');
				for child in &data.children {
					child.write_html(out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
			NodeKind::Text(text) => out.push_str(&escape_text(text)),
			NodeKind::Comment(text) if text.is_empty() => out.push_str("<!>"),
			NodeKind::Comment(text) if text == "$" => out.push_str("<!$>"),
			NodeKind::Comment(text) => {
				out.push_str("<!--");
				out.push_str(text);
				out.push_str("-->");
			}
			NodeKind::Fragment => {
				for child in &data.children {
					child.write_html(out);
				}
			}
		}
	}

	pub(crate) fn describe(&self) -> String {
		match &self.0.borrow().kind {
			NodeKind::Element { tag, .. } => format!("<{}>", tag),
			NodeKind::Text(text) => format!("#text {:?}", text),
			NodeKind::Comment(text) => format!("#comment {:?}", text),
			NodeKind::Fragment => "#fragment".to_string(),
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.describe())
	}
}

/// A slot that receives the node an element was mounted as.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<Node>>>);

impl NodeRef {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self) -> Option<Node> {
		self.0.borrow().clone()
	}

	pub fn set(&self, node: Option<Node>) {
		*self.0.borrow_mut() = node;
	}

	pub fn ptr_eq(&self, other: &NodeRef) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("NodeRef").field(&self.get()).finish()
	}
}

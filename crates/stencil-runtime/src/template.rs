//! Template instances: clone, index, patch.
//!
//! A [`Template`] is compiled markup parsed once into a prototype tree. A
//! [`TemplateNode`] is one instance of it together with its props, keyed by
//! template index. Mounting clones the prototype, records every node of the
//! clone in document order (index 0 is the mount parent) and applies each
//! prop to the node at its index.
//!
//! Every applied prop leaves a [`NodeTrack`] behind so that it can be torn
//! down before it is applied again, when the instance is re-patched or
//! unmounted.

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;

use serde_json::Value;

use crate::attr::{apply_attribute, bound_event, read_bound_value};
use crate::dom::{Event, Handler, Node};
use crate::error::{Result, RuntimeError};
use crate::html::parse_html;
use crate::hydration;
use crate::owner;
use crate::props::{
	CHILDREN_KEY, ChildSlot, Children, IndexProps, PropBag, PropValue, event_name, is_update_key,
	updated_attr,
};
use crate::reactive::{Effect, untrack};
use crate::reconcile::{KeyedNodes, reconcile};
use crate::track::{Cleanup, NodeTrack, track_key};

struct TemplateInner {
	html: String,
	prototype: Vec<Node>,
}

/// Compiled template markup, parsed once and cloned per mount.
#[derive(Clone)]
pub struct Template(Rc<TemplateInner>);

impl Template {
	pub fn new(html: impl Into<String>) -> Result<Self> {
		let html = html.into();
		let prototype = parse_html(&html)?;
		tracing::trace!(len = html.len(), roots = prototype.len(), "parsed template");
		Ok(Self(Rc::new(TemplateInner { html, prototype })))
	}

	pub fn html(&self) -> &str {
		&self.0.html
	}

	pub fn ptr_eq(&self, other: &Template) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn prototype(&self) -> &[Node] {
		&self.0.prototype
	}

	fn instantiate(&self) -> Vec<Node> {
		self.0.prototype.iter().map(Node::deep_clone).collect()
	}
}

impl fmt::Debug for Template {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Template").field(&self.0.html).finish()
	}
}

struct TemplateState {
	template: Template,
	props: IndexProps,
	key: Option<String>,
	tree_map: Vec<Node>,
	track_map: BTreeMap<String, NodeTrack>,
	nodes: Vec<Node>,
	mounted: bool,
}

/// A mountable template instance.
#[derive(Clone)]
pub struct TemplateNode(Rc<RefCell<TemplateState>>);

impl TemplateNode {
	pub fn new(template: Template, props: IndexProps, key: Option<String>) -> Self {
		Self(Rc::new(RefCell::new(TemplateState {
			template,
			props,
			key,
			tree_map: Vec::new(),
			track_map: BTreeMap::new(),
			nodes: Vec::new(),
			mounted: false,
		})))
	}

	pub fn template(&self) -> Template {
		self.0.borrow().template.clone()
	}

	pub fn key(&self) -> Option<String> {
		self.0.borrow().key.clone()
	}

	pub fn ptr_eq(&self, other: &TemplateNode) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn is_mounted(&self) -> bool {
		self.0.borrow().mounted
	}

	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	/// Node at template index `index`, once mounted.
	pub fn tree_node(&self, index: usize) -> Option<Node> {
		self.0.borrow().tree_map.get(index).cloned()
	}

	/// Runs `f` on the track of a binding site, keyed by [`track_key`].
	pub fn get_node_track<R>(&self, key: &str, f: impl FnOnce(&NodeTrack) -> R) -> Option<R> {
		self.0.borrow().track_map.get(key).map(f)
	}

	/// Number of live binding tracks.
	pub fn track_count(&self) -> usize {
		self.0.borrow().track_map.len()
	}

	pub fn is_connected(&self) -> bool {
		let state = self.0.borrow();
		state.mounted && state.nodes.first().is_none_or(Node::is_connected)
	}

	/// Clones the template under `parent` before `before` and patches all
	/// props. When already mounted, moves the existing nodes instead.
	///
	/// Inside [`hydration::hydrate`] the first mount adopts the parent's
	/// existing children.
	pub fn mount(&self, parent: &Node, before: Option<&Node>) -> Result<Vec<Node>> {
		if !parent.is_container() {
			return Err(RuntimeError::MissingContainer);
		}
		if self.is_connected() {
			for node in self.nodes() {
				parent.insert_before(&node, before);
			}
			tracing::trace!("moved mounted template");
			return Ok(self.nodes());
		}

		let template = self.template();
		let (tree_map, nodes) = if hydration::take_hydration() {
			hydration::adopt(template.prototype(), parent)?
		} else {
			let nodes = template.instantiate();
			let mut tree_map = vec![parent.clone()];
			for node in &nodes {
				collect_tree(node, &mut tree_map);
			}
			for node in &nodes {
				parent.insert_before(node, before);
			}
			(tree_map, nodes)
		};

		let indexed = tree_map.len();
		let props = {
			let mut state = self.0.borrow_mut();
			state.tree_map = tree_map;
			state.nodes = nodes;
			state.mounted = true;
			state.props.clone()
		};
		owner::retain(self.clone().into());
		self.apply_props(&props);
		tracing::debug!(nodes = indexed, props = props.len(), "mounted template");
		Ok(self.nodes())
	}

	/// Replaces the props of the given indices and re-applies them.
	/// Bindings of a replaced index are torn down first.
	pub fn patch_props(&self, props: IndexProps) {
		let mounted = {
			let mut state = self.0.borrow_mut();
			for (index, bag) in &props {
				state.props.insert(*index, bag.clone());
			}
			state.mounted
		};
		if mounted {
			self.apply_props(&props);
		}
	}

	/// Tears down every binding, unmounts rendered children and removes the
	/// template's nodes. Calling it again does nothing.
	pub fn unmount(&self) {
		let (tracks, nodes) = {
			let mut state = self.0.borrow_mut();
			if !state.mounted {
				return;
			}
			state.mounted = false;
			state.tree_map.clear();
			(mem::take(&mut state.track_map), mem::take(&mut state.nodes))
		};
		owner::release(self.addr());
		let bindings = tracks.len();
		for (_, mut track) in tracks {
			track.run_cleanup();
			if let Some(last) = track.last_nodes {
				let mut rendered = mem::take(&mut *last.borrow_mut());
				rendered.unmount_all();
			}
		}
		for node in nodes {
			node.remove();
		}
		tracing::debug!(bindings, "unmounted template");
	}

	/// Takes over the DOM and bindings of `prev` (an instance of the same
	/// template) and re-applies only the props that changed.
	pub fn inherit_node(&self, prev: &TemplateNode) -> Result<()> {
		if self.ptr_eq(prev) {
			return Ok(());
		}
		let (old_props, mounted) = {
			let mut old = prev.0.borrow_mut();
			let mut state = self.0.borrow_mut();
			state.tree_map = mem::take(&mut old.tree_map);
			state.track_map = mem::take(&mut old.track_map);
			state.nodes = mem::take(&mut old.nodes);
			state.mounted = mem::replace(&mut old.mounted, false);
			(mem::take(&mut old.props), state.mounted)
		};
		if !mounted {
			return Ok(());
		}
		owner::retain(self.clone().into());
		owner::release(prev.addr());

		let new_props = self.0.borrow().props.clone();
		for (index, old_bag) in &old_props {
			for (name, old) in old_bag.iter() {
				let kept = new_props.get(index).and_then(|bag| bag.get(name));
				if kept.is_none() {
					self.remove_prop(*index, name, old);
				}
			}
		}

		let diff = changed_props(&old_props, &new_props);
		tracing::trace!(changed = diff.len(), "inherited template");
		self.apply_props(&diff);
		Ok(())
	}

	/// Nodes between the first and last node this instance owns at the
	/// mount site, including children rendered directly into the parent.
	pub fn nodes(&self) -> Vec<Node> {
		let state = self.0.borrow();
		if !state.mounted {
			return Vec::new();
		}
		let mut owned = state.nodes.clone();
		for track in state.track_map.values().filter(|t| t.is_root) {
			if let Some(last) = &track.last_nodes {
				owned.extend(last.borrow().nodes());
			}
		}
		let Some(parent) = state.tree_map.first() else {
			return owned;
		};
		let positions: Vec<usize> = owned
			.iter()
			.filter(|node| node.parent().is_some_and(|p| p.ptr_eq(parent)))
			.filter_map(Node::index_in_parent)
			.collect();
		match (positions.iter().min(), positions.iter().max()) {
			(Some(&first), Some(&last)) => parent.children()[first..=last].to_vec(),
			_ => owned,
		}
	}

	pub fn first_child(&self) -> Option<Node> {
		self.nodes().into_iter().next()
	}

	fn apply_props(&self, props: &IndexProps) {
		for (index, bag) in props {
			let Some(node) = self.tree_node(*index) else {
				tracing::warn!(index, "prop targets a missing template index");
				continue;
			};
			let updates: BTreeMap<String, Rc<dyn Fn(Value)>> = bag
				.iter()
				.filter_map(|(name, value)| match value {
					PropValue::Update(f) if is_update_key(name) => Some((updated_attr(name), f.clone())),
					_ => None,
				})
				.collect();
			for (name, value) in bag.iter() {
				self.apply_prop(*index, &node, name, value, &updates);
			}
		}
	}

	fn apply_prop(
		&self,
		index: usize,
		node: &Node,
		name: &str,
		value: &PropValue,
		updates: &BTreeMap<String, Rc<dyn Fn(Value)>>,
	) {
		match value {
			PropValue::Update(_) => {}
			PropValue::Children(slots) => self.bind_slots(index, node, slots),
			PropValue::Event(handler) => {
				let key = track_key(index, name, 0);
				let mut track = self.take_track(&key, index);
				let kind = event_name(name);
				let id = node.add_event_listener(&kind, handler.clone());
				let target = node.clone();
				track.set_cleanup(Box::new(move || target.remove_event_listener(id)));
				tracing::trace!(index, event = %kind, "bound listener");
				self.put_track(key, track);
			}
			PropValue::Ref(node_ref) => {
				let key = track_key(index, name, 0);
				let mut track = self.take_track(&key, index);
				node_ref.set(Some(node.clone()));
				let node_ref = node_ref.clone();
				track.set_cleanup(Box::new(move || node_ref.set(None)));
				self.put_track(key, track);
			}
			value => {
				let key = track_key(index, name, 0);
				let mut track = self.take_track(&key, index);
				let mut cleanups: Vec<Cleanup> = Vec::with_capacity(2);
				cleanups.push(bind_attribute(node.clone(), name.to_string(), value.clone()));
				if let Some(update) = updates.get(name) {
					cleanups.push(bind_update(node, name, update.clone()));
				}
				track.set_cleanup(Box::new(move || {
					for cleanup in cleanups {
						cleanup();
					}
				}));
				self.put_track(key, track);
			}
		}
	}

	fn bind_slots(&self, index: usize, node: &Node, slots: &[ChildSlot]) {
		for (sub, slot) in slots.iter().enumerate() {
			let key = track_key(index, CHILDREN_KEY, sub);
			let mut track = self.take_track(&key, index);
			let anchor = match slot.before {
				Some(before) => {
					let anchor = self.tree_node(before);
					if anchor.is_none() {
						tracing::warn!(index, before, "children anchor is missing, appending");
					}
					anchor
				}
				None => None,
			};
			let last = track.last_nodes();
			if let Some(cleanup) = bind_children(node.clone(), anchor, slot.content.clone(), last) {
				track.set_cleanup(cleanup);
			}
			self.put_track(key, track);
		}

		// slots that disappeared
		let prefix = format!("{}:{}:", index, CHILDREN_KEY);
		let stale: Vec<String> = self
			.0
			.borrow()
			.track_map
			.keys()
			.filter(|key| {
				key.strip_prefix(&prefix)
					.and_then(|sub| sub.parse::<usize>().ok())
					.is_some_and(|sub| sub >= slots.len())
			})
			.cloned()
			.collect();
		for key in stale {
			self.drop_track(&key);
		}
	}

	fn remove_prop(&self, index: usize, name: &str, old: &PropValue) {
		let prefix = format!("{}:{}:", index, name);
		let keys: Vec<String> = self
			.0
			.borrow()
			.track_map
			.keys()
			.filter(|key| key.starts_with(&prefix))
			.cloned()
			.collect();
		for key in keys {
			self.drop_track(&key);
		}
		if old.is_value() {
			if let Some(node) = self.tree_node(index) {
				node.remove_attribute(name);
			}
		}
	}

	/// Removes a track, runs its cleanup and unmounts its children.
	fn drop_track(&self, key: &str) {
		let track = self.0.borrow_mut().track_map.remove(key);
		if let Some(mut track) = track {
			track.run_cleanup();
			if let Some(last) = track.last_nodes {
				let mut rendered = mem::take(&mut *last.borrow_mut());
				rendered.unmount_all();
			}
		}
	}

	/// Takes the track for `key` out of the map with its cleanup already
	/// run. The map is not borrowed while the binding is rebuilt.
	fn take_track(&self, key: &str, index: usize) -> NodeTrack {
		let existing = self.0.borrow_mut().track_map.remove(key);
		match existing {
			Some(mut track) => {
				track.run_cleanup();
				track
			}
			None => NodeTrack::new(index == 0),
		}
	}

	fn put_track(&self, key: String, track: NodeTrack) {
		self.0.borrow_mut().track_map.insert(key, track);
	}
}

impl fmt::Debug for TemplateNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.0.borrow();
		f.debug_struct("TemplateNode")
			.field("template", &state.template)
			.field("key", &state.key)
			.field("mounted", &state.mounted)
			.field("tracks", &state.track_map.len())
			.finish()
	}
}

/// Appends `node` and its descendants in document order.
fn collect_tree(node: &Node, out: &mut Vec<Node>) {
	out.push(node.clone());
	for child in node.children() {
		collect_tree(&child, out);
	}
}

/// Props of `next` that differ from `prev`. An index that changes at all
/// carries its update handlers along, and a changed update handler re-binds
/// its attribute.
fn changed_props(prev: &IndexProps, next: &IndexProps) -> IndexProps {
	let mut diff = IndexProps::new();
	for (index, bag) in next {
		let old_bag = prev.get(index);
		let mut changed = PropBag::new();
		for (name, value) in bag.iter() {
			let same = old_bag
				.and_then(|old| old.get(name))
				.is_some_and(|old| old.same(value));
			if same {
				continue;
			}
			if let PropValue::Update(_) = value {
				let attr = updated_attr(name);
				if let Some(bound) = bag.get(&attr) {
					changed.insert(attr, bound.clone());
				}
			}
			changed.insert(name, value.clone());
		}
		if changed.is_empty() {
			continue;
		}
		for (name, value) in bag.iter() {
			if let PropValue::Update(_) = value {
				changed.insert(name, value.clone());
			}
		}
		diff.insert(*index, changed);
	}
	diff
}

/// Applies `value` to `name` now and again whenever a signal it reads
/// changes. Unchanged values are not re-applied.
fn bind_attribute(node: Node, name: String, value: PropValue) -> Cleanup {
	let mut last: Option<Value> = None;
	let effect = Effect::new(move || {
		let next = value.read();
		if last.as_ref() == Some(&next) {
			return;
		}
		untrack(|| apply_attribute(&node, &name, &next));
		last = Some(next);
	});
	Box::new(move || drop(effect))
}

/// Reports user edits of `name` to `update`.
fn bind_update(node: &Node, name: &str, update: Rc<dyn Fn(Value)>) -> Cleanup {
	let attr = name.to_string();
	let handler: Handler = Rc::new(move |event: &Event| update(read_bound_value(&event.target, &attr)));
	let id = node.add_event_listener(bound_event(name), handler);
	let target = node.clone();
	Box::new(move || target.remove_event_listener(id))
}

/// Renders `content` into `parent` before `anchor`, reusing the entries in
/// `last`. Reactive content re-renders from an effect, which the returned
/// cleanup disposes. The rendered entries stay in `last` either way.
pub(crate) fn bind_children(
	parent: Node,
	anchor: Option<Node>,
	content: Children,
	last: Rc<RefCell<KeyedNodes>>,
) -> Option<Cleanup> {
	match content {
		Children::Static(children) => {
			let prev = mem::take(&mut *last.borrow_mut());
			let next = untrack(|| reconcile(&parent, prev, children, anchor.as_ref()));
			*last.borrow_mut() = next;
			None
		}
		Children::Reactive(render) => {
			let effect = Effect::new(move || {
				let children = render();
				let prev = mem::take(&mut *last.borrow_mut());
				let next = untrack(|| reconcile(&parent, prev, children, anchor.as_ref()));
				*last.borrow_mut() = next;
			});
			Some(Box::new(move || drop(effect)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::NodeRef;
	use crate::reactive::Signal;
	use serde_json::json;
	use serial_test::serial;
	use std::cell::Cell;

	fn props(entries: Vec<(usize, PropBag)>) -> IndexProps {
		entries.into_iter().collect()
	}

	#[test]
	#[serial(reactive)]
	fn test_mount_static_template() {
		let template = Template::new(r#"<div data-idx="0-1">Hello<span data-idx="0-3">World</span></div>"#).unwrap();
		let node = TemplateNode::new(template, IndexProps::new(), None);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();

		assert_eq!(root.inner_html(), r#"<div data-idx="0-1">Hello<span data-idx="0-3">World</span></div>"#);
		assert!(node.tree_node(0).unwrap().ptr_eq(&root));
		assert_eq!(node.tree_node(3).unwrap().tag_name().as_deref(), Some("span"));
		assert!(node.tree_node(5).is_none());
	}

	#[test]
	fn test_mount_requires_container() {
		let template = Template::new("<p></p>").unwrap();
		let node = TemplateNode::new(template, IndexProps::new(), None);
		let text = Node::text("x");
		assert!(matches!(node.mount(&text, None), Err(RuntimeError::MissingContainer)));
	}

	#[test]
	#[serial(reactive)]
	fn test_reactive_attribute() {
		let class = Signal::new(json!("a"));
		let template = Template::new(r#"<p data-idx="0-1"></p>"#).unwrap();
		let node = TemplateNode::new(
			template,
			props(vec![(1, PropBag::new().with("class", class.clone()))]),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		let p = node.tree_node(1).unwrap();
		assert_eq!(p.get_attribute("class").as_deref(), Some("a"));

		class.set(json!({"b": true}));
		assert_eq!(p.get_attribute("class").as_deref(), Some("b"));
		class.set(json!(null));
		assert!(!p.has_attribute("class"));
	}

	#[test]
	#[serial(reactive)]
	fn test_events_refs_and_teardown() {
		let clicks = Rc::new(Cell::new(0));
		let c = clicks.clone();
		let node_ref = NodeRef::new();
		let template = Template::new(r#"<button data-idx="0-1">go</button>"#).unwrap();
		let node = TemplateNode::new(
			template,
			props(vec![(
				1,
				PropBag::new()
					.with("onClick", PropValue::Event(Rc::new(move |_: &Event| c.set(c.get() + 1))))
					.with("ref", PropValue::Ref(node_ref.clone())),
			)]),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		let button = node_ref.get().unwrap();
		button.dispatch_event("click");
		assert_eq!(clicks.get(), 1);
		assert_eq!(node.get_node_track("1:onClick:0", NodeTrack::has_cleanup), Some(true));

		node.unmount();
		node.unmount();
		button.dispatch_event("click");
		assert_eq!(clicks.get(), 1);
		assert!(node_ref.get().is_none());
		assert_eq!(root.child_count(), 0);
		assert_eq!(button.listener_count(), 0);
	}

	#[test]
	#[serial(reactive)]
	fn test_two_way_binding() {
		let value = Signal::new(json!("a"));
		let v = value.clone();
		let template = Template::new(r#"<input data-idx="0-1"/>"#).unwrap();
		let node = TemplateNode::new(
			template,
			props(vec![(
				1,
				PropBag::new()
					.with("value", value.clone())
					.with("updateValue", PropValue::Update(Rc::new(move |next| v.set(next)))),
			)]),
			None,
		);
		let root = Node::element("form");
		node.mount(&root, None).unwrap();
		let input = node.tree_node(1).unwrap();

		input.set_attribute("value", "typed");
		input.dispatch_event("input");
		assert_eq!(value.get_untracked(), json!("typed"));
		assert_eq!(input.get_attribute("value").as_deref(), Some("typed"));
	}

	#[test]
	#[serial(reactive)]
	fn test_children_slot_before_anchor() {
		let name = Signal::new(json!("Bob"));
		let n = name.clone();
		let template = Template::new(r#"<p data-idx="0-1">x <!> z</p>"#).unwrap();
		let mut bag = PropBag::new();
		bag.push_children(ChildSlot {
			content: Children::reactive(move || vec![n.get().into()]),
			before: Some(3),
		});
		let node = TemplateNode::new(template, props(vec![(1, bag)]), None);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		assert_eq!(root.inner_html(), r#"<p data-idx="0-1">x Bob<!> z</p>"#);

		let text = node.tree_node(1).unwrap().children()[1].clone();
		name.set(json!("Ann"));
		assert_eq!(root.inner_html(), r#"<p data-idx="0-1">x Ann<!> z</p>"#);
		assert!(node.tree_node(1).unwrap().children()[1].ptr_eq(&text));
	}

	#[test]
	#[serial(reactive)]
	fn test_missing_index_is_skipped() {
		let template = Template::new(r#"<p data-idx="0-1"></p>"#).unwrap();
		let node = TemplateNode::new(
			template,
			props(vec![
				(9, PropBag::new().with("id", json!("x"))),
				(1, PropBag::new().with("id", json!("y"))),
			]),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		assert_eq!(node.tree_node(1).unwrap().get_attribute("id").as_deref(), Some("y"));
	}

	#[test]
	#[serial(reactive)]
	fn test_patch_props_tears_down_first() {
		let clicks = Rc::new(Cell::new(0));
		let handler = |c: Rc<Cell<i32>>| PropValue::Event(Rc::new(move |_: &Event| c.set(c.get() + 1)));
		let template = Template::new(r#"<a data-idx="0-1"></a>"#).unwrap();
		let node = TemplateNode::new(
			template,
			props(vec![(1, PropBag::new().with("onClick", handler(clicks.clone())))]),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		node.patch_props(props(vec![(1, PropBag::new().with("onClick", handler(clicks.clone())))]));

		let a = node.tree_node(1).unwrap();
		assert_eq!(a.listener_count(), 1);
		a.dispatch_event("click");
		assert_eq!(clicks.get(), 1);
	}

	#[test]
	#[serial(reactive)]
	fn test_inherit_reapplies_only_changes() {
		let template = Template::new(r#"<div data-idx="0-1"></div>"#).unwrap();
		let first = TemplateNode::new(
			template.clone(),
			props(vec![(1, PropBag::new().with("id", json!("a")).with("title", json!("t")))]),
			Some("k".into()),
		);
		let root = Node::element("main");
		first.mount(&root, None).unwrap();
		let div = first.tree_node(1).unwrap();

		let second = TemplateNode::new(
			template,
			props(vec![(1, PropBag::new().with("id", json!("b")))]),
			Some("k".into()),
		);
		second.inherit_node(&first).unwrap();

		assert!(second.tree_node(1).unwrap().ptr_eq(&div));
		assert_eq!(div.get_attribute("id").as_deref(), Some("b"));
		assert!(!div.has_attribute("title"));
		assert!(!first.is_mounted());
		assert!(second.is_connected());
	}
}

//! Prop values passed to templates and components.
//!
//! A template receives an [`IndexProps`]: one [`PropBag`] per template
//! index. A component receives a single [`PropBag`]. Bag keys follow a
//! naming convention that decides how a value is applied:
//!
//! | key              | value                  | effect                          |
//! |------------------|------------------------|---------------------------------|
//! | `on<Event>`      | [`PropValue::Event`]   | event listener                  |
//! | `update<Attr>`   | [`PropValue::Update`]  | two-way binding for `attr`      |
//! | `ref`            | [`PropValue::Ref`]     | receives the node               |
//! | `children`       | [`PropValue::Children`]| reconciled child content        |
//! | anything else    | value, signal, getter  | attribute, re-applied on change |

use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::{Event, NodeRef};
use crate::reactive::Signal;
use crate::render_node::RenderNode;

/// Key prefix of event handlers.
pub const EVENT_PREFIX: &str = "on";
/// Key prefix of two-way binding handlers.
pub const UPDATE_PREFIX: &str = "update";
/// Key of child content.
pub const CHILDREN_KEY: &str = "children";
/// Key of node refs.
pub const REF_KEY: &str = "ref";
/// Key under which spread attributes arrive.
pub const SPREAD_KEY: &str = "_$spread$";

/// Returns true for `onClick`-style keys.
pub fn is_event_key(name: &str) -> bool {
	name.strip_prefix(EVENT_PREFIX)
		.and_then(|rest| rest.chars().next())
		.is_some_and(char::is_uppercase)
}

/// Returns true for `updateValue`-style keys.
pub fn is_update_key(name: &str) -> bool {
	name.strip_prefix(UPDATE_PREFIX)
		.and_then(|rest| rest.chars().next())
		.is_some_and(char::is_uppercase)
}

/// `onClick` -> `click`
pub fn event_name(key: &str) -> String {
	key.strip_prefix(EVENT_PREFIX).unwrap_or(key).to_lowercase()
}

/// `updateValue` -> `value`
pub fn updated_attr(key: &str) -> String {
	let rest = key.strip_prefix(UPDATE_PREFIX).unwrap_or(key);
	let mut chars = rest.chars();
	match chars.next() {
		Some(first) => format!("{}{}", first.to_lowercase(), chars.as_str()),
		None => String::new(),
	}
}

/// One child item.
#[derive(Clone)]
pub enum Child {
	/// Primitive rendered as text; arrays are flattened, `null` and booleans
	/// render nothing
	Value(Value),
	/// Mountable node
	Render(RenderNode),
}

impl From<Value> for Child {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<RenderNode> for Child {
	fn from(node: RenderNode) -> Self {
		Self::Render(node)
	}
}

impl fmt::Debug for Child {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Render(node) => f.debug_tuple("Render").field(node).finish(),
		}
	}
}

/// Child content of one slot.
#[derive(Clone)]
pub enum Children {
	/// Inserted once
	Static(Vec<Child>),
	/// Recomputed and reconciled whenever a signal it reads changes
	Reactive(Rc<dyn Fn() -> Vec<Child>>),
}

impl Children {
	/// Reactive children from a closure.
	pub fn reactive(f: impl Fn() -> Vec<Child> + 'static) -> Self {
		Self::Reactive(Rc::new(f))
	}

	/// Evaluates the content.
	pub fn resolve(&self) -> Vec<Child> {
		match self {
			Self::Static(children) => children.clone(),
			Self::Reactive(f) => f(),
		}
	}

	pub fn is_reactive(&self) -> bool {
		matches!(self, Self::Reactive(_))
	}
}

impl fmt::Debug for Children {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Static(children) => f.debug_tuple("Static").field(children).finish(),
			Self::Reactive(_) => f.write_str("Reactive(..)"),
		}
	}
}

/// Children inserted under a template index, before an anchor.
#[derive(Debug, Clone)]
pub struct ChildSlot {
	/// Content
	pub content: Children,
	/// Template index of the node to insert before; `None` appends
	pub before: Option<usize>,
}

/// A prop value.
#[derive(Clone)]
pub enum PropValue {
	/// Plain value
	Static(Value),
	/// Value read from a signal
	Signal(Signal<Value>),
	/// Value computed by a tracked getter
	Getter(Rc<dyn Fn() -> Value>),
	/// Event handler
	Event(Rc<dyn Fn(&Event)>),
	/// Receives new values for a two-way bound attribute
	Update(Rc<dyn Fn(Value)>),
	/// Receives the node
	Ref(NodeRef),
	/// Child slots
	Children(Vec<ChildSlot>),
}

impl PropValue {
	/// Reads the current value, tracking signal reads. Handlers, refs and
	/// children read as `null`.
	pub fn read(&self) -> Value {
		match self {
			Self::Static(value) => value.clone(),
			Self::Signal(signal) => signal.get(),
			Self::Getter(getter) => getter(),
			_ => Value::Null,
		}
	}

	/// Returns true for values an attribute can be derived from.
	pub fn is_value(&self) -> bool {
		matches!(self, Self::Static(_) | Self::Signal(_) | Self::Getter(_))
	}

	/// Identity comparison used when deciding whether to re-patch.
	///
	/// Static values compare structurally, everything else by identity.
	/// Children never compare equal: the reconciler decides what to keep.
	pub fn same(&self, other: &PropValue) -> bool {
		match (self, other) {
			(Self::Static(a), Self::Static(b)) => a == b,
			(Self::Signal(a), Self::Signal(b)) => a.ptr_eq(b),
			(Self::Getter(a), Self::Getter(b)) => Rc::ptr_eq(a, b),
			(Self::Event(a), Self::Event(b)) => Rc::ptr_eq(a, b),
			(Self::Update(a), Self::Update(b)) => Rc::ptr_eq(a, b),
			(Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for PropValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
			Self::Signal(signal) => f.debug_tuple("Signal").field(&signal.id()).finish(),
			Self::Getter(_) => f.write_str("Getter(..)"),
			Self::Event(_) => f.write_str("Event(..)"),
			Self::Update(_) => f.write_str("Update(..)"),
			Self::Ref(r) => f.debug_tuple("Ref").field(r).finish(),
			Self::Children(slots) => f.debug_tuple("Children").field(slots).finish(),
		}
	}
}

impl From<Value> for PropValue {
	fn from(value: Value) -> Self {
		Self::Static(value)
	}
}

impl From<Signal<Value>> for PropValue {
	fn from(signal: Signal<Value>) -> Self {
		Self::Signal(signal)
	}
}

/// Ordered props of one node or component.
#[derive(Debug, Clone, Default)]
pub struct PropBag(Vec<(String, PropValue)>);

impl PropBag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `name`, replacing an existing entry in place.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
		let name = name.into();
		let value = value.into();
		match self.0.iter_mut().find(|(n, _)| *n == name) {
			Some((_, v)) => *v = value,
			None => self.0.push((name, value)),
		}
	}

	/// Builder form of [`PropBag::insert`].
	pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
		self.insert(name, value);
		self
	}

	/// Adds a child slot to the `children` entry.
	pub fn push_children(&mut self, slot: ChildSlot) {
		match self.0.iter_mut().find(|(n, _)| n == CHILDREN_KEY) {
			Some((_, PropValue::Children(slots))) => slots.push(slot),
			_ => self.insert(CHILDREN_KEY, PropValue::Children(vec![slot])),
		}
	}

	pub fn get(&self, name: &str) -> Option<&PropValue> {
		self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
	}

	pub fn remove(&mut self, name: &str) -> Option<PropValue> {
		let position = self.0.iter().position(|(n, _)| n == name)?;
		Some(self.0.remove(position).1)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
		self.0.iter().map(|(n, v)| (n.as_str(), v))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for PropBag {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut bag = Self::new();
		for (name, value) in iter {
			bag.insert(name, value);
		}
		bag
	}
}

/// Props of a template, keyed by template index.
pub type IndexProps = BTreeMap<usize, PropBag>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("onClick", true, false)]
	#[case("onclick", false, false)]
	#[case("updateValue", false, true)]
	#[case("update", false, false)]
	#[case("online", false, false)]
	#[case("class", false, false)]
	fn test_key_classification(#[case] key: &str, #[case] event: bool, #[case] update: bool) {
		assert_eq!(is_event_key(key), event);
		assert_eq!(is_update_key(key), update);
	}

	#[test]
	fn test_names() {
		assert_eq!(event_name("onDoubleClick"), "doubleclick");
		assert_eq!(updated_attr("updateValue"), "value");
		assert_eq!(updated_attr("updateChecked"), "checked");
	}

	#[test]
	fn test_bag_insert_replaces_in_place() {
		let mut bag = PropBag::new()
			.with("id", json!("a"))
			.with("class", json!("b"));
		bag.insert("id", json!("c"));
		let keys: Vec<&str> = bag.iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec!["id", "class"]);
		assert!(matches!(bag.get("id"), Some(PropValue::Static(v)) if v == "c"));
	}

	#[test]
	fn test_push_children_accumulates() {
		let mut bag = PropBag::new();
		for before in [Some(3), None] {
			bag.push_children(ChildSlot {
				content: Children::Static(vec![json!("x").into()]),
				before,
			});
		}
		assert!(matches!(bag.get(CHILDREN_KEY), Some(PropValue::Children(s)) if s.len() == 2));
	}

	#[test]
	fn test_same() {
		let getter: Rc<dyn Fn() -> Value> = Rc::new(|| json!(1));
		let a = PropValue::Getter(getter.clone());
		assert!(a.same(&PropValue::Getter(getter)));
		assert!(!a.same(&PropValue::Getter(Rc::new(|| json!(1)))));
		assert!(PropValue::Static(json!({"a": 1})).same(&PropValue::Static(json!({"a": 1}))));
	}
}

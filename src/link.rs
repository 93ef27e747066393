//! Binding compiled units to live values.
//!
//! The compiler leaves every dynamic value as expression source text. A
//! [`Bindings`] table maps that text to what it stands for at runtime: a
//! plain value, a signal, a getter, an event handler, child content, a
//! component or a list of per-item bindings. [`instantiate`] resolves the
//! slots of a [`CompiledUnit`] through the table into a mountable
//! [`RenderNode`]; [`render_to_string`] does the same for server markup.
//!
//! Props are keyed by template index (the slot's `parent_index`), which is
//! what the runtime's tree map is addressed by.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use stencil_compiler::{CompiledUnit, ComponentCall, DynamicSlot, ListRender, Literal, SlotKind, SlotValue};
use stencil_runtime::attr::truthy;
use stencil_runtime::html::escape_text;
use stencil_runtime::props::SPREAD_KEY;
use stencil_runtime::reconcile::{flatten_children, text_of};
use stencil_runtime::{
	Child, ChildSlot, Children, Component, ComponentNode, Event, IndexProps, Node, PropBag,
	PropValue, RenderNode, RuntimeError, Signal, SsrValue, Template, TemplateNode, render_static,
	untrack,
};

/// Errors raised while linking a unit.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
	/// Runtime failure, e.g. invalid template markup
	#[error(transparent)]
	Runtime(#[from] RuntimeError),

	/// An expression has no binding
	#[error("no binding for `{0}`")]
	Unbound(String),

	/// A `bind:` target is not bound to a signal
	#[error("`{0}` is the target of a two-way binding but is not bound to a signal")]
	NotASignal(String),

	/// A binding is used where its kind makes no sense
	#[error("`{name}` is bound to {found} but is used as {expected}")]
	Unsupported {
		/// Expression source
		name: String,
		/// What the slot needs
		expected: &'static str,
		/// What the binding is
		found: &'static str,
	},
}

/// Result type of the link layer.
pub type Result<T> = core::result::Result<T, LinkError>;

/// What an expression stands for.
#[derive(Clone)]
pub enum Binding {
	/// Plain value
	Value(Value),
	/// Reactive value
	Signal(Signal<Value>),
	/// Tracked computation
	Getter(Rc<dyn Fn() -> Value>),
	/// Event handler
	Handler(Rc<dyn Fn(&Event)>),
	/// Child content
	Children(Children),
	/// Component
	Component(Component),
	/// Receiver of a `.map(...)`: one binding table per item, merged over
	/// the enclosing table
	List(Rc<dyn Fn() -> Vec<Bindings>>),
}

impl Binding {
	fn kind(&self) -> &'static str {
		match self {
			Self::Value(_) => "a value",
			Self::Signal(_) => "a signal",
			Self::Getter(_) => "a getter",
			Self::Handler(_) => "a handler",
			Self::Children(_) => "children",
			Self::Component(_) => "a component",
			Self::List(_) => "a list",
		}
	}
}

impl fmt::Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Signal(signal) => f.debug_tuple("Signal").field(signal).finish(),
			Self::Component(component) => f.debug_tuple("Component").field(component).finish(),
			other => f.write_str(other.kind()),
		}
	}
}

/// Expression source text to [`Binding`].
#[derive(Clone, Default, Debug)]
pub struct Bindings {
	entries: HashMap<String, Binding>,
}

impl Bindings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, source: impl Into<String>, binding: Binding) {
		self.entries.insert(source.into(), binding);
	}

	pub fn get(&self, source: &str) -> Option<&Binding> {
		self.entries.get(source)
	}

	pub fn value(mut self, source: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(source, Binding::Value(value.into()));
		self
	}

	pub fn signal(mut self, source: impl Into<String>, signal: Signal<Value>) -> Self {
		self.insert(source, Binding::Signal(signal));
		self
	}

	pub fn getter(mut self, source: impl Into<String>, getter: impl Fn() -> Value + 'static) -> Self {
		self.insert(source, Binding::Getter(Rc::new(getter)));
		self
	}

	pub fn handler(mut self, source: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
		self.insert(source, Binding::Handler(Rc::new(handler)));
		self
	}

	pub fn children(mut self, source: impl Into<String>, children: Children) -> Self {
		self.insert(source, Binding::Children(children));
		self
	}

	pub fn component(mut self, component: Component) -> Self {
		self.insert(component.name().to_string(), Binding::Component(component));
		self
	}

	pub fn list(mut self, source: impl Into<String>, items: impl Fn() -> Vec<Bindings> + 'static) -> Self {
		self.insert(source, Binding::List(Rc::new(items)));
		self
	}

	/// `self` overlaid with `other`.
	pub fn merged(&self, other: &Bindings) -> Bindings {
		let mut merged = self.clone();
		merged
			.entries
			.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
		merged
	}

	fn lookup(&self, source: &str) -> Result<&Binding> {
		self.get(source)
			.ok_or_else(|| LinkError::Unbound(source.to_string()))
	}
}

thread_local! {
	// Instances of one unit must share a Template so that the reconciler can
	// inherit between them.
	static TEMPLATES: RefCell<HashMap<String, Template>> = RefCell::new(HashMap::new());
}

fn cached_template(html: &str) -> Result<Template> {
	if let Some(template) = TEMPLATES.with(|cache| cache.borrow().get(html).cloned()) {
		return Ok(template);
	}
	let template = Template::new(html)?;
	TEMPLATES.with(|cache| cache.borrow_mut().insert(html.to_string(), template.clone()));
	Ok(template)
}

/// Turns a compiled unit into a mountable node.
pub fn instantiate(unit: &CompiledUnit, bindings: &Bindings) -> Result<RenderNode> {
	let template = cached_template(&unit.template)?;
	let mut props = IndexProps::new();
	for slot in &unit.slots {
		let bag = props.entry(slot.parent_index).or_default();
		match slot.kind {
			SlotKind::Attr => bag.insert(attr_name(slot), prop_value(&slot.value, bindings)?),
			SlotKind::Text => bag.push_children(ChildSlot {
				content: children_of(&slot.value, bindings)?,
				before: slot.before_index,
			}),
		}
	}
	let key = unit.key.as_ref().map(|k| key_of(k, bindings)).transpose()?;
	tracing::trace!(id = unit.id, slots = unit.slots.len(), ?key, "instantiated unit");
	Ok(TemplateNode::new(template, props, key).into())
}

/// Renders a compiled unit to server markup with hydration markers.
pub fn render_to_string(unit: &CompiledUnit, bindings: &Bindings) -> Result<String> {
	let values = untrack(|| {
		unit.slots
			.iter()
			.map(|slot| ssr_value(slot, bindings))
			.collect::<Result<Vec<_>>>()
	})?;
	Ok(render_static(&unit.chunks, &unit.hydration_key, &values)?)
}

fn attr_name(slot: &DynamicSlot) -> String {
	slot.attr_name.clone().unwrap_or_else(|| SPREAD_KEY.to_string())
}

fn literal_value(literal: &Literal) -> Value {
	match literal {
		Literal::Str(s) => Value::String(s.clone()),
		Literal::Number(digits) => digits
			.parse::<serde_json::Number>()
			.map(Value::Number)
			.unwrap_or_else(|_| Value::String(digits.clone())),
		Literal::Bool(b) => Value::Bool(*b),
		Literal::Null => Value::Null,
	}
}

/// A value-like binding for `source`.
fn source_value(source: &str, bindings: &Bindings) -> Result<PropValue> {
	match bindings.lookup(source)? {
		Binding::Value(value) => Ok(PropValue::Static(value.clone())),
		Binding::Signal(signal) => Ok(PropValue::Signal(signal.clone())),
		Binding::Getter(getter) => Ok(PropValue::Getter(getter.clone())),
		other => Err(LinkError::Unsupported {
			name: source.to_string(),
			expected: "a value",
			found: other.kind(),
		}),
	}
}

fn prop_value(value: &SlotValue, bindings: &Bindings) -> Result<PropValue> {
	match value {
		SlotValue::Literal(literal) => Ok(PropValue::Static(literal_value(literal))),
		SlotValue::Expr(expr) => match bindings.lookup(&expr.source)? {
			Binding::Handler(handler) => Ok(PropValue::Event(handler.clone())),
			_ => source_value(&expr.source, bindings),
		},
		SlotValue::Conditional {
			test,
			consequent,
			alternate,
		} => {
			let test = source_value(test, bindings)?;
			let consequent = prop_value(consequent, bindings)?;
			let alternate = prop_value(alternate, bindings)?;
			Ok(PropValue::Getter(Rc::new(move || {
				if truthy(&test.read()) {
					consequent.read()
				} else {
					alternate.read()
				}
			})))
		}
		SlotValue::Setter(target) => match bindings.lookup(target)? {
			Binding::Signal(signal) => {
				let signal = signal.clone();
				Ok(PropValue::Update(Rc::new(move |value: Value| signal.set(value))))
			}
			_ => Err(LinkError::NotASignal(target.clone())),
		},
		SlotValue::Spread(exprs) => {
			let parts = exprs
				.iter()
				.map(|expr| source_value(&expr.source, bindings))
				.collect::<Result<Vec<_>>>()?;
			Ok(PropValue::Getter(Rc::new(move || {
				let mut merged = Map::new();
				for part in &parts {
					if let Value::Object(entries) = part.read() {
						merged.extend(entries);
					}
				}
				Value::Object(merged)
			})))
		}
		SlotValue::List(list) => Err(markup_as_value(&list.receiver)),
		SlotValue::Unit(unit) => Err(markup_as_value(&format!("unit {}", unit.id))),
		SlotValue::Component(call) => Err(markup_as_value(&call.name)),
	}
}

fn markup_as_value(name: &str) -> LinkError {
	LinkError::Unsupported {
		name: name.to_string(),
		expected: "a value",
		found: "markup",
	}
}

fn children_of(value: &SlotValue, bindings: &Bindings) -> Result<Children> {
	match value {
		SlotValue::Literal(literal) => Ok(Children::Static(vec![literal_value(literal).into()])),
		SlotValue::Expr(expr) => match bindings.lookup(&expr.source)? {
			Binding::Value(value) => Ok(Children::Static(vec![value.clone().into()])),
			Binding::Signal(signal) => {
				let signal = signal.clone();
				Ok(Children::reactive(move || vec![signal.get().into()]))
			}
			Binding::Getter(getter) => {
				let getter = getter.clone();
				Ok(Children::reactive(move || vec![getter().into()]))
			}
			Binding::Children(children) => Ok(children.clone()),
			Binding::Component(component) => {
				let node = ComponentNode::new(component.clone(), PropBag::new(), None);
				Ok(Children::Static(vec![Child::Render(node.into())]))
			}
			other => Err(LinkError::Unsupported {
				name: expr.source.clone(),
				expected: "children",
				found: other.kind(),
			}),
		},
		SlotValue::Conditional {
			test,
			consequent,
			alternate,
		} => {
			let test = source_value(test, bindings)?;
			let consequent = children_of(consequent, bindings)?;
			let alternate = children_of(alternate, bindings)?;
			Ok(Children::reactive(move || {
				if truthy(&test.read()) {
					consequent.resolve()
				} else {
					alternate.resolve()
				}
			}))
		}
		SlotValue::Unit(unit) => Ok(Children::Static(vec![Child::Render(instantiate(unit, bindings)?)])),
		SlotValue::Component(call) => Ok(Children::Static(vec![Child::Render(component_node(call, bindings)?)])),
		SlotValue::List(list) => list_children(list, bindings),
		SlotValue::Setter(target) => Err(LinkError::Unsupported {
			name: target.clone(),
			expected: "children",
			found: "a two-way binding",
		}),
		SlotValue::Spread(_) => Err(LinkError::Unsupported {
			name: SPREAD_KEY.to_string(),
			expected: "children",
			found: "a spread",
		}),
	}
}

/// Re-instantiates the list body for every item whenever the item list
/// changes. Keys on the body let the reconciler keep unchanged rows.
fn list_children(list: &ListRender, bindings: &Bindings) -> Result<Children> {
	let items = match bindings.lookup(&list.receiver)? {
		Binding::List(items) => items.clone(),
		other => {
			return Err(LinkError::Unsupported {
				name: list.receiver.clone(),
				expected: "a list",
				found: other.kind(),
			});
		}
	};
	let body = list.body.clone();
	let receiver = list.receiver.clone();
	let scope = bindings.clone();
	Ok(Children::reactive(move || {
		items()
			.into_iter()
			.filter_map(|item| match instantiate(&body, &scope.merged(&item)) {
				Ok(node) => Some(Child::Render(node)),
				Err(err) => {
					tracing::warn!(%err, receiver = %receiver, "skipping list item");
					None
				}
			})
			.collect()
	}))
}

fn component_node(call: &ComponentCall, bindings: &Bindings) -> Result<RenderNode> {
	let component = match bindings.lookup(&call.name)? {
		Binding::Component(component) => component.clone(),
		_ => {
			return Err(RuntimeError::NotAComponent {
				name: call.name.clone(),
			}
			.into());
		}
	};
	let mut props = PropBag::new();
	for prop in &call.props {
		props.insert(prop.name.clone(), prop_value(&prop.value, bindings)?);
	}
	if let Some(children) = &call.children {
		props.push_children(ChildSlot {
			content: Children::Static(vec![Child::Render(instantiate(children, bindings)?)]),
			before: None,
		});
	}
	let key = call.key.as_deref().map(|k| key_of(k, bindings)).transpose()?;
	Ok(ComponentNode::new(component, props, key).into())
}

fn key_of(value: &SlotValue, bindings: &Bindings) -> Result<String> {
	let value = untrack(|| prop_value(value, bindings).map(|v| v.read()))?;
	Ok(text_of(&value))
}

fn ssr_value(slot: &DynamicSlot, bindings: &Bindings) -> Result<SsrValue> {
	match slot.kind {
		SlotKind::Attr => {
			let value = prop_value(&slot.value, bindings)?.read();
			Ok(SsrValue::attr(attr_name(slot), value))
		}
		SlotKind::Text => {
			let children = flatten_children(children_of(&slot.value, bindings)?.resolve());
			if children.iter().all(|child| matches!(child, Child::Value(_))) {
				let values = children
					.into_iter()
					.filter_map(|child| match child {
						Child::Value(value) => Some(value),
						Child::Render(_) => None,
					})
					.collect();
				return Ok(SsrValue::text(slot.parent_index, Value::Array(values)));
			}
			let mut html = String::new();
			for child in children {
				match child {
					Child::Value(value) => html.push_str(&escape_text(&text_of(&value))),
					Child::Render(node) => html.push_str(&node_html(&node)?),
				}
			}
			Ok(SsrValue::html(slot.parent_index, html))
		}
	}
}

/// Markup of a render node, produced by mounting it into a detached
/// fragment.
fn node_html(node: &RenderNode) -> Result<String> {
	let scratch = Node::fragment();
	node.mount(&scratch, None)?;
	let html = scratch.inner_html();
	node.unmount();
	Ok(html)
}

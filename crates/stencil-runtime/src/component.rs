//! Component hosting.
//!
//! A [`Component`] is a render function from a [`ComponentScope`] to a
//! [`RenderNode`]. The scope exposes the props as component-owned signals,
//! so a component reads `scope.get("title")` and re-renders exactly the
//! bindings that depend on it when the parent passes a new value.
//!
//! Props are split by key:
//!
//! - `on*` handlers and `ref` attach to the first element the component
//!   renders;
//! - `update*` handlers are available through [`ComponentScope::update`];
//! - `children` is exposed as reactive content via
//!   [`ComponentScope::children`];
//! - everything else becomes a proxied signal.

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::{Event, Node};
use crate::error::Result;
use crate::owner;
use crate::props::{
	CHILDREN_KEY, Child, Children, PropBag, PropValue, REF_KEY, event_name, is_event_key,
	is_update_key,
};
use crate::reactive::{Effect, Signal, untrack};
use crate::render_node::RenderNode;
use crate::track::Cleanup;

type RenderFn = dyn Fn(&ComponentScope) -> Result<RenderNode>;

/// A named render function.
#[derive(Clone)]
pub struct Component {
	name: Rc<str>,
	render: Rc<RenderFn>,
}

impl Component {
	pub fn new<F>(name: &str, render: F) -> Self
	where
		F: Fn(&ComponentScope) -> Result<RenderNode> + 'static,
	{
		Self {
			name: Rc::from(name),
			render: Rc::new(render),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Two components are the same when they share the render function.
	pub fn ptr_eq(&self, other: &Component) -> bool {
		Rc::ptr_eq(&self.render, &other.render)
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Component").field(&self.name).finish()
	}
}

/// Proxied props and the effects keeping them in sync with their sources.
struct Proxies {
	signals: BTreeMap<String, Signal<Value>>,
	effects: Vec<Effect>,
}

/// Wraps every value prop of `bag` in a component-owned signal.
///
/// Static values seed the signal. Signals and getters are followed by an
/// effect that writes their current value into the proxy. Handlers, refs
/// and children are not proxied.
fn create_proxy_props(bag: &PropBag) -> Proxies {
	let mut proxies = Proxies {
		signals: BTreeMap::new(),
		effects: Vec::new(),
	};
	sync_proxies(&mut proxies, bag);
	proxies
}

fn is_proxied(name: &str) -> bool {
	!(is_event_key(name) || is_update_key(name) || name == CHILDREN_KEY || name == REF_KEY)
}

/// Points the proxies at the values of `bag`, replacing all follow effects.
fn sync_proxies(proxies: &mut Proxies, bag: &PropBag) {
	proxies.effects.clear();
	for (name, value) in bag.iter().filter(|(name, _)| is_proxied(name)) {
		let proxy = proxies
			.signals
			.entry(name.to_string())
			.or_insert_with(|| Signal::new(Value::Null))
			.clone();
		match value {
			PropValue::Static(value) => {
				if proxy.get_untracked() != *value {
					proxy.set(value.clone());
				}
			}
			PropValue::Signal(_) | PropValue::Getter(_) => {
				let source = value.clone();
				proxies.effects.push(Effect::new(move || {
					let next = source.read();
					if proxy.get_untracked() != next {
						proxy.set(next);
					}
				}));
			}
			_ => {}
		}
	}
	for (name, proxy) in &proxies.signals {
		if bag.get(name).is_none() && !proxy.get_untracked().is_null() {
			proxy.set(Value::Null);
		}
	}
}

struct ScopeInner {
	name: Rc<str>,
	props: RefCell<BTreeMap<String, Signal<Value>>>,
	bag: RefCell<PropBag>,
	children_version: Signal<u64>,
	mount_hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
	destroy_hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// What a component's render function sees.
#[derive(Clone)]
pub struct ComponentScope(Rc<ScopeInner>);

impl ComponentScope {
	fn new(name: Rc<str>, props: BTreeMap<String, Signal<Value>>, bag: PropBag) -> Self {
		Self(Rc::new(ScopeInner {
			name,
			props: RefCell::new(props),
			bag: RefCell::new(bag),
			children_version: Signal::new(0),
			mount_hooks: RefCell::new(Vec::new()),
			destroy_hooks: RefCell::new(Vec::new()),
		}))
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	/// Proxy signal of a value prop.
	pub fn prop(&self, name: &str) -> Option<Signal<Value>> {
		self.0.props.borrow().get(name).cloned()
	}

	/// Tracked read of a value prop, `null` when absent.
	pub fn get(&self, name: &str) -> Value {
		self.prop(name).map(|s| s.get()).unwrap_or(Value::Null)
	}

	/// Event handler passed as `on<Event>`, by event name or key.
	pub fn handler(&self, name: &str) -> Option<Rc<dyn Fn(&Event)>> {
		let bag = self.0.bag.borrow();
		bag.iter().find_map(|(key, value)| match value {
			PropValue::Event(handler) if key == name || (is_event_key(key) && event_name(key) == name) => {
				Some(handler.clone())
			}
			_ => None,
		})
	}

	/// Two-way binding handler passed as `update<Attr>`.
	pub fn update(&self, key: &str) -> Option<Rc<dyn Fn(Value)>> {
		match self.0.bag.borrow().get(key) {
			Some(PropValue::Update(update)) => Some(update.clone()),
			_ => None,
		}
	}

	/// The children passed by the parent, as reactive content. Re-renders
	/// when the parent re-renders the component with new children.
	pub fn children(&self) -> Children {
		let inner = self.0.clone();
		Children::reactive(move || {
			inner.children_version.get();
			let slots = match inner.bag.borrow().get(CHILDREN_KEY) {
				Some(PropValue::Children(slots)) => slots.clone(),
				_ => Vec::new(),
			};
			slots
				.iter()
				.flat_map(|slot| slot.content.resolve())
				.collect::<Vec<Child>>()
		})
	}

	/// Runs `f` once the component's DOM is in place.
	pub fn on_mount(&self, f: impl FnOnce() + 'static) {
		self.0.mount_hooks.borrow_mut().push(Box::new(f));
	}

	/// Runs `f` before the component's DOM is torn down.
	pub fn on_destroy(&self, f: impl FnOnce() + 'static) {
		self.0.destroy_hooks.borrow_mut().push(Box::new(f));
	}

	fn run_mount_hooks(&self) {
		let hooks = mem::take(&mut *self.0.mount_hooks.borrow_mut());
		for hook in hooks {
			hook();
		}
	}

	fn run_destroy_hooks(&self) {
		let hooks = mem::take(&mut *self.0.destroy_hooks.borrow_mut());
		for hook in hooks {
			hook();
		}
	}
}

impl fmt::Debug for ComponentScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentScope")
			.field("name", &self.0.name)
			.field("props", &self.0.props.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}

struct Instance {
	scope: ComponentScope,
	rendered: RenderNode,
	proxies: Proxies,
	host: Vec<Cleanup>,
}

struct ComponentState {
	component: Component,
	props: PropBag,
	key: Option<String>,
	instance: Option<Instance>,
}

/// A mountable component instance.
#[derive(Clone)]
pub struct ComponentNode(Rc<RefCell<ComponentState>>);

impl ComponentNode {
	pub fn new(component: Component, props: PropBag, key: Option<String>) -> Self {
		Self(Rc::new(RefCell::new(ComponentState {
			component,
			props,
			key,
			instance: None,
		})))
	}

	pub fn component(&self) -> Component {
		self.0.borrow().component.clone()
	}

	pub fn key(&self) -> Option<String> {
		self.0.borrow().key.clone()
	}

	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	pub fn ptr_eq(&self, other: &ComponentNode) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// What the render function returned, once mounted.
	pub fn rendered(&self) -> Option<RenderNode> {
		self.0.borrow().instance.as_ref().map(|i| i.rendered.clone())
	}

	/// Scope of the mounted instance.
	pub fn scope(&self) -> Option<ComponentScope> {
		self.0.borrow().instance.as_ref().map(|i| i.scope.clone())
	}

	pub fn is_connected(&self) -> bool {
		self.rendered().is_some_and(|r| r.is_connected())
	}

	pub fn nodes(&self) -> Vec<Node> {
		self.rendered().map(|r| r.nodes()).unwrap_or_default()
	}

	pub fn first_child(&self) -> Option<Node> {
		self.rendered().and_then(|r| r.first_child())
	}

	/// Renders the component and mounts the result. A mounted component is
	/// moved instead.
	pub fn mount(&self, parent: &Node, before: Option<&Node>) -> Result<Vec<Node>> {
		if let Some(rendered) = self.rendered() {
			return rendered.mount(parent, before);
		}

		let (component, bag) = {
			let state = self.0.borrow();
			(state.component.clone(), state.props.clone())
		};
		let proxies = create_proxy_props(&bag);
		let scope = ComponentScope::new(component.name.clone(), proxies.signals.clone(), bag.clone());
		let rendered = untrack(|| (component.render)(&scope))?;
		rendered.mount(parent, before)?;
		let host = attach_host_props(&rendered, &bag);

		self.0.borrow_mut().instance = Some(Instance {
			scope: scope.clone(),
			rendered,
			proxies,
			host,
		});
		owner::retain(self.clone().into());
		tracing::debug!(component = component.name(), "mounted component");
		untrack(|| scope.run_mount_hooks());
		Ok(self.nodes())
	}

	/// Runs destroy hooks, then tears down the rendered tree and the
	/// listeners attached for the parent. Calling it again does nothing.
	pub fn unmount(&self) {
		let instance = self.0.borrow_mut().instance.take();
		let Some(instance) = instance else {
			return;
		};
		owner::release(self.addr());
		untrack(|| instance.scope.run_destroy_hooks());
		for cleanup in instance.host {
			cleanup();
		}
		drop(instance.proxies);
		instance.rendered.unmount();
		tracing::debug!(component = %instance.scope.name(), "unmounted component");
	}

	/// Takes over the mounted instance of `prev` and pushes this node's
	/// props into it. The render function does not run again.
	pub fn inherit_node(&self, prev: &ComponentNode) -> Result<()> {
		if self.ptr_eq(prev) {
			return Ok(());
		}
		let instance = prev.0.borrow_mut().instance.take();
		let Some(mut instance) = instance else {
			return Ok(());
		};
		owner::retain(self.clone().into());
		owner::release(prev.addr());
		let bag = self.0.borrow().props.clone();

		sync_proxies(&mut instance.proxies, &bag);
		*instance.scope.0.props.borrow_mut() = instance.proxies.signals.clone();
		*instance.scope.0.bag.borrow_mut() = bag.clone();

		for cleanup in mem::take(&mut instance.host) {
			cleanup();
		}
		instance.host = attach_host_props(&instance.rendered, &bag);

		let version = instance.scope.0.children_version.clone();
		self.0.borrow_mut().instance = Some(instance);
		if bag.get(CHILDREN_KEY).is_some() {
			version.update(|v| *v += 1);
		}
		tracing::trace!(component = %self.component().name(), "inherited component");
		Ok(())
	}
}

impl fmt::Debug for ComponentNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.0.borrow();
		f.debug_struct("ComponentNode")
			.field("component", &state.component)
			.field("key", &state.key)
			.field("mounted", &state.instance.is_some())
			.finish()
	}
}

/// Attaches the parent's handlers and ref to the first element rendered.
fn attach_host_props(rendered: &RenderNode, bag: &PropBag) -> Vec<Cleanup> {
	let Some(root) = rendered.nodes().into_iter().find(Node::is_element) else {
		return Vec::new();
	};
	let mut cleanups: Vec<Cleanup> = Vec::new();
	for (name, value) in bag.iter() {
		match value {
			PropValue::Event(handler) if is_event_key(name) => {
				let id = root.add_event_listener(&event_name(name), handler.clone());
				let target = root.clone();
				cleanups.push(Box::new(move || target.remove_event_listener(id)));
			}
			PropValue::Ref(node_ref) => {
				node_ref.set(Some(root.clone()));
				let node_ref = node_ref.clone();
				cleanups.push(Box::new(move || node_ref.set(None)));
			}
			_ => {}
		}
	}
	cleanups
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::props::{ChildSlot, IndexProps};
	use crate::template::{Template, TemplateNode};
	use serde_json::json;
	use serial_test::serial;
	use std::cell::Cell;

	/// `<h1>{props.title}</h1>` rendered through a child slot.
	fn title_component() -> Component {
		Component::new("Title", |scope| {
			let template = Template::new(r#"<h1 data-idx="0-1"></h1>"#)?;
			let title = scope.prop("title");
			let mut bag = PropBag::new();
			bag.push_children(ChildSlot {
				content: Children::reactive(move || {
					vec![title.as_ref().map(|t| t.get()).unwrap_or(Value::Null).into()]
				}),
				before: None,
			});
			let props: IndexProps = [(1, bag)].into_iter().collect();
			Ok(TemplateNode::new(template, props, None).into())
		})
	}

	#[test]
	#[serial(reactive)]
	fn test_mount_and_prop_signal() {
		let title = Signal::new(json!("One"));
		let node = ComponentNode::new(
			title_component(),
			PropBag::new().with("title", title.clone()),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		assert_eq!(root.inner_html(), r#"<h1 data-idx="0-1">One</h1>"#);

		title.set(json!("Two"));
		assert_eq!(root.inner_html(), r#"<h1 data-idx="0-1">Two</h1>"#);
	}

	#[test]
	#[serial(reactive)]
	fn test_inherit_pushes_props_without_rerender() {
		let renders = Rc::new(Cell::new(0));
		let r = renders.clone();
		let inner = title_component();
		let counting = Component::new("Counting", move |scope| {
			r.set(r.get() + 1);
			(inner.render)(scope)
		});

		let root = Node::element("main");
		let first = ComponentNode::new(counting.clone(), PropBag::new().with("title", json!("a")), None);
		first.mount(&root, None).unwrap();
		let h1 = root.first_child().unwrap();

		let second = ComponentNode::new(counting, PropBag::new().with("title", json!("b")), None);
		second.inherit_node(&first).unwrap();

		assert_eq!(renders.get(), 1);
		assert!(root.first_child().unwrap().ptr_eq(&h1));
		assert_eq!(root.text_content(), "b");
		assert!(first.rendered().is_none());
	}

	#[test]
	#[serial(reactive)]
	fn test_hooks_and_host_listeners() {
		let log = Rc::new(RefCell::new(Vec::<&str>::new()));
		let (m, d) = (log.clone(), log.clone());
		let component = Component::new("Hooked", move |scope| {
			let (m, d) = (m.clone(), d.clone());
			scope.on_mount(move || m.borrow_mut().push("mount"));
			scope.on_destroy(move || d.borrow_mut().push("destroy"));
			Ok(TemplateNode::new(Template::new("<button>x</button>")?, IndexProps::new(), None).into())
		});
		let clicks = Rc::new(Cell::new(0));
		let c = clicks.clone();
		let node = ComponentNode::new(
			component,
			PropBag::new().with("onClick", PropValue::Event(Rc::new(move |_: &Event| c.set(c.get() + 1)))),
			None,
		);
		let root = Node::element("main");
		node.mount(&root, None).unwrap();
		let button = root.first_child().unwrap();
		button.dispatch_event("click");
		assert_eq!(clicks.get(), 1);

		node.unmount();
		node.unmount();
		assert_eq!(*log.borrow(), vec!["mount", "destroy"]);
		assert_eq!(button.listener_count(), 0);
		assert_eq!(root.child_count(), 0);
	}

	#[test]
	#[serial(reactive)]
	fn test_scope_children_follow_parent() {
		let component = Component::new("Box", |scope| {
			let mut bag = PropBag::new();
			bag.push_children(ChildSlot {
				content: scope.children(),
				before: None,
			});
			let props: IndexProps = [(1, bag)].into_iter().collect();
			Ok(TemplateNode::new(Template::new(r#"<div data-idx="0-1"></div>"#)?, props, None).into())
		});
		let with_children = |text: &str| {
			let mut bag = PropBag::new();
			bag.push_children(ChildSlot {
				content: Children::Static(vec![json!(text).into()]),
				before: None,
			});
			bag
		};

		let root = Node::element("main");
		let first = ComponentNode::new(component.clone(), with_children("a"), None);
		first.mount(&root, None).unwrap();
		assert_eq!(root.text_content(), "a");

		let second = ComponentNode::new(component, with_children("b"), None);
		second.inherit_node(&first).unwrap();
		assert_eq!(root.text_content(), "b");
	}

	#[test]
	fn test_proxies_skip_handlers() {
		let bag = PropBag::new()
			.with("title", json!("x"))
			.with("onClick", PropValue::Event(Rc::new(|_: &Event| {})))
			.with("updateValue", PropValue::Update(Rc::new(|_: Value| {})))
			.with("ref", PropValue::Ref(crate::dom::NodeRef::new()));
		let proxies = create_proxy_props(&bag);
		assert_eq!(proxies.signals.keys().collect::<Vec<_>>(), vec!["title"]);
	}
}

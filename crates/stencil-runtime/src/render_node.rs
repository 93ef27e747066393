//! The mountable unit handed to the reconciler.

use core::fmt;

use crate::component::ComponentNode;
use crate::dom::Node;
use crate::error::Result;
use crate::fragment::FragmentNode;
use crate::template::TemplateNode;

/// A template instance, a component instance or a fragment.
///
/// Render nodes are cheap handles; clones refer to the same instance.
#[derive(Clone)]
pub enum RenderNode {
	Template(TemplateNode),
	Component(ComponentNode),
	Fragment(FragmentNode),
}

impl RenderNode {
	/// Inserts the node's DOM before `before` under `parent`. A node that is
	/// already mounted is moved instead of rebuilt.
	pub fn mount(&self, parent: &Node, before: Option<&Node>) -> Result<Vec<Node>> {
		match self {
			Self::Template(node) => node.mount(parent, before),
			Self::Component(node) => node.mount(parent, before),
			Self::Fragment(node) => node.mount(parent, before),
		}
	}

	/// Tears the node down. Calling it twice is harmless.
	pub fn unmount(&self) {
		match self {
			Self::Template(node) => node.unmount(),
			Self::Component(node) => node.unmount(),
			Self::Fragment(node) => node.unmount(),
		}
	}

	/// Returns true if `self` can take over the DOM of `prev`: same kind and
	/// same template or component function.
	pub fn can_inherit(&self, prev: &RenderNode) -> bool {
		match (self, prev) {
			(Self::Template(a), Self::Template(b)) => a.template().ptr_eq(&b.template()),
			(Self::Component(a), Self::Component(b)) => a.component().ptr_eq(&b.component()),
			(Self::Fragment(a), Self::Fragment(b)) => a.is_reactive() == b.is_reactive(),
			_ => false,
		}
	}

	/// Takes over the mounted state of `prev` and re-patches what differs.
	/// `prev` is left unmounted without touching the DOM.
	pub fn inherit_node(&self, prev: &RenderNode) -> Result<()> {
		match (self, prev) {
			(Self::Template(a), Self::Template(b)) => a.inherit_node(b),
			(Self::Component(a), Self::Component(b)) => a.inherit_node(b),
			(Self::Fragment(a), Self::Fragment(b)) => a.inherit_node(b),
			_ => {
				tracing::warn!(next = ?self, prev = ?prev, "cannot inherit across node kinds");
				Ok(())
			}
		}
	}

	pub fn ptr_eq(&self, other: &RenderNode) -> bool {
		match (self, other) {
			(Self::Template(a), Self::Template(b)) => a.ptr_eq(b),
			(Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
			(Self::Fragment(a), Self::Fragment(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Reconciliation key.
	pub fn key(&self) -> Option<String> {
		match self {
			Self::Template(node) => node.key(),
			Self::Component(node) => node.key(),
			Self::Fragment(node) => node.key(),
		}
	}

	pub fn first_child(&self) -> Option<Node> {
		match self {
			Self::Template(node) => node.first_child(),
			Self::Component(node) => node.first_child(),
			Self::Fragment(node) => node.first_child(),
		}
	}

	/// DOM nodes owned by this node at the mount site, in order.
	pub fn nodes(&self) -> Vec<Node> {
		match self {
			Self::Template(node) => node.nodes(),
			Self::Component(node) => node.nodes(),
			Self::Fragment(node) => node.nodes(),
		}
	}

	pub fn is_connected(&self) -> bool {
		match self {
			Self::Template(node) => node.is_connected(),
			Self::Component(node) => node.is_connected(),
			Self::Fragment(node) => node.is_connected(),
		}
	}

	/// Address of the shared instance; equal for clones.
	pub(crate) fn addr(&self) -> usize {
		match self {
			Self::Template(node) => node.addr(),
			Self::Component(node) => node.addr(),
			Self::Fragment(node) => node.addr(),
		}
	}
}

impl From<TemplateNode> for RenderNode {
	fn from(node: TemplateNode) -> Self {
		Self::Template(node)
	}
}

impl From<ComponentNode> for RenderNode {
	fn from(node: ComponentNode) -> Self {
		Self::Component(node)
	}
}

impl From<FragmentNode> for RenderNode {
	fn from(node: FragmentNode) -> Self {
		Self::Fragment(node)
	}
}

impl fmt::Debug for RenderNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Template(node) => fmt::Debug::fmt(node, f),
			Self::Component(node) => fmt::Debug::fmt(node, f),
			Self::Fragment(node) => fmt::Debug::fmt(node, f),
		}
	}
}

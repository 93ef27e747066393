//! Index-addressed template runtime.
//!
//! A compiled template is cloned once per mount; the nodes of the clone are
//! recorded in document order so that every dynamic prop addresses its
//! target by template index. Props stay in sync with reactive state through
//! one effect per binding, and child lists go through a keyed reconciler
//! that preserves DOM identity.
//!
//! - [`dom`]: the in-memory document the runtime mounts into
//! - [`reactive`]: signals and effects
//! - [`template`], [`component`], [`fragment`]: the three [`RenderNode`]s
//! - [`reconcile`]: keyed children reconciliation
//! - [`ssr`] and [`hydration`]: server markup and adopting it on the client
//! - [`owner`]: mounted instances stay alive until unmounted
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use stencil_runtime::{
//!     ChildSlot, Children, IndexProps, Node, PropBag, Signal, Template, TemplateNode,
//! };
//!
//! let name = Signal::new(json!("Bob"));
//! let n = name.clone();
//! let mut bag = PropBag::new();
//! bag.push_children(ChildSlot {
//!     content: Children::reactive(move || vec![n.get().into()]),
//!     before: None,
//! });
//! let props: IndexProps = [(1, bag)].into_iter().collect();
//!
//! let template = Template::new(r#"<div data-idx="0-1"></div>"#).unwrap();
//! let root = Node::element("main");
//! TemplateNode::new(template, props, None).mount(&root, None).unwrap();
//! assert_eq!(root.inner_html(), r#"<div data-idx="0-1">Bob</div>"#);
//!
//! name.set(json!("Ann"));
//! assert_eq!(root.text_content(), "Ann");
//! ```

pub mod attr;
pub mod component;
pub mod dom;
pub mod error;
pub mod fragment;
pub mod html;
pub mod hydration;
pub mod owner;
pub mod props;
pub mod reactive;
pub mod reconcile;
pub mod render_node;
pub mod ssr;
pub mod template;
pub mod track;

pub use component::{Component, ComponentNode, ComponentScope};
pub use dom::{Event, Handler, ListenerId, Node, NodeRef};
pub use error::{Result, RuntimeError};
pub use fragment::FragmentNode;
pub use hydration::hydrate;
pub use props::{Child, ChildSlot, Children, IndexProps, PropBag, PropValue};
pub use reactive::{Effect, Signal, effect, untrack};
pub use reconcile::{Key, KeyedNodes, reconcile};
pub use render_node::RenderNode;
pub use ssr::{SsrOptions, SsrValue, render_static};
pub use template::{Template, TemplateNode};
pub use track::{NodeTrack, track_key};

/// Mounts `node` as the content of `parent`, appending after existing
/// children.
pub fn render(node: impl Into<RenderNode>, parent: &Node) -> Result<RenderNode> {
	let node = node.into();
	node.mount(parent, None)?;
	Ok(node)
}

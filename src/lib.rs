//! # Stencil
//!
//! JSX compiled to static templates, mounted by an index-addressed reactive
//! runtime.
//!
//! The workspace is split the way the pipeline runs:
//!
//! - [`ast`]: JSX parser
//! - [`compiler`]: template extraction, dynamic slot partitioning and code
//!   emission
//! - [`runtime`]: the mount/patch runtime, keyed reconciler, components,
//!   static rendering and hydration
//! - [`link`]: binds the expressions of a compiled unit to live values
//!
//! This crate ties them together: [`mount`], [`render_to_html`] and
//! [`hydrate`] take JSX source straight to DOM or markup.
//!
//! ## Quick Example
//!
//! ```
//! use serde_json::json;
//! use stencil::prelude::*;
//!
//! let name = Signal::new(json!("Bob"));
//! let bindings = Bindings::new().signal("name", name.clone());
//! let root = Node::element("main");
//!
//! stencil::mount("<div>Hello {name}!</div>", &CompilerOptions::default(), &bindings, &root).unwrap();
//! assert_eq!(root.text_content(), "Hello Bob!");
//!
//! name.set(json!("Ann"));
//! assert_eq!(root.text_content(), "Hello Ann!");
//! ```

pub use stencil_ast as ast;
pub use stencil_compiler as compiler;
pub use stencil_runtime as runtime;

pub mod link;

pub use link::{Binding, Bindings, LinkError, instantiate, render_to_string};

use stencil_compiler::{CompileError, CompilerOptions};
use stencil_runtime::{Node, RenderNode};

/// Errors of the source-to-DOM helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Compile(#[from] CompileError),

	#[error(transparent)]
	Link(#[from] LinkError),
}

impl From<stencil_runtime::RuntimeError> for Error {
	fn from(err: stencil_runtime::RuntimeError) -> Self {
		Self::Link(LinkError::Runtime(err))
	}
}

/// Compiles `source`, binds it and mounts it into `parent`.
pub fn mount(
	source: &str,
	options: &CompilerOptions,
	bindings: &Bindings,
	parent: &Node,
) -> Result<RenderNode, Error> {
	let unit = stencil_compiler::compile(source, options)?;
	let node = instantiate(&unit, bindings)?;
	node.mount(parent, None)?;
	Ok(node)
}

/// Compiles `source` and renders it to markup with hydration markers.
pub fn render_to_html(source: &str, options: &CompilerOptions, bindings: &Bindings) -> Result<String, Error> {
	let unit = stencil_compiler::compile(source, options)?;
	Ok(render_to_string(&unit, bindings)?)
}

/// Compiles `source` and mounts it over server markup already in `parent`.
///
/// `options` must match the ones the markup was rendered with, otherwise the
/// `data-idx` check fails with a hydration mismatch.
pub fn hydrate(
	source: &str,
	options: &CompilerOptions,
	bindings: &Bindings,
	parent: &Node,
) -> Result<RenderNode, Error> {
	let unit = stencil_compiler::compile(source, options)?;
	let node = instantiate(&unit, bindings)?;
	stencil_runtime::hydrate(parent, |parent| node.mount(parent, None))?;
	tracing::debug!(id = unit.id, key = %unit.hydration_key, "hydrated unit");
	Ok(node)
}

pub mod prelude {
	pub use crate::compiler::{CompiledUnit, CompilerOptions, Target, compile};
	pub use crate::link::{Binding, Bindings, LinkError, instantiate, render_to_string};
	pub use crate::runtime::{
		Child, Children, Component, ComponentNode, ComponentScope, Effect, Event, Node, NodeRef,
		PropBag, PropValue, RenderNode, Signal, effect, untrack,
	};
	pub use crate::{Error, hydrate, mount, render_to_html};
}

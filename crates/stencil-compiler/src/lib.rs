//! JSX to template compiler.
//!
//! Compilation runs in four stages:
//!
//! 1. [`tree::build`] turns the JSX AST into a [`TreeNode`] tree, assigning
//!    positional indices and inserting `<!>` markers between dynamic
//!    siblings.
//! 2. [`partition::partition`] splits the tree into static markup chunks and
//!    an ordered list of [`DynamicSlot`]s.
//! 3. [`index_map::collect_index_map`] reduces the indices to those the
//!    slots reference.
//! 4. [`emit`] produces client code (`render(...)`) or static rendering code
//!    (`ssg(...)`).
//!
//! ## Example
//!
//! ```
//! use stencil_compiler::{CompilerOptions, compile};
//!
//! let unit = compile("<div>Hello <b>{name}</b></div>", &CompilerOptions::default()).unwrap();
//! assert_eq!(
//!     unit.template,
//!     r#"<div data-idx="0-1">Hello <b data-idx="0-3"></b></div>"#
//! );
//! assert_eq!(unit.slots[0].parent_index, 3);
//! ```

pub mod context;
pub mod emit;
pub mod error;
pub mod html;
pub mod index_map;
pub mod options;
pub mod partition;
pub mod tree;
pub mod unit;

pub use context::CompilerContext;
pub use emit::{ClientOutput, StaticOutput, emit_client, emit_static};
pub use error::{CompileError, Result};
pub use index_map::{collect_index_map, find_index_position, index_position_or_missing};
pub use options::{CompilerOptions, Target};
pub use partition::{
	ComponentCall, DynamicSlot, ListRender, Literal, Partition, Prop, SlotKind, SlotValue,
};
pub use tree::{AttrValue, Attribute, Content, NodeKind, SPREAD_KEY, TreeNode};
pub use unit::CompiledUnit;

use stencil_ast::JsxNode;

/// Emitted code for the configured target.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
	/// Client target
	Client(ClientOutput),
	/// Static target
	Static(StaticOutput),
}

impl Output {
	/// The emitted expression.
	pub fn code(&self) -> &str {
		match self {
			Self::Client(out) => &out.code,
			Self::Static(out) => &out.code,
		}
	}
}

/// A compiler bound to one set of options.
///
/// Each call compiles with a fresh [`CompilerContext`], so template ids
/// restart at 1 for every source.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
	options: CompilerOptions,
}

impl Compiler {
	/// Creates a compiler.
	pub fn new(options: CompilerOptions) -> Self {
		Self { options }
	}

	/// Returns the options.
	pub fn options(&self) -> &CompilerOptions {
		&self.options
	}

	/// Parses and compiles `source`.
	pub fn compile(&self, source: &str) -> Result<CompiledUnit> {
		if source.trim().is_empty() {
			return Err(CompileError::EmptyJsx);
		}
		let node = stencil_ast::parse(source)?;
		self.compile_node(&node)
	}

	/// Compiles an already parsed JSX root.
	pub fn compile_node(&self, node: &JsxNode) -> Result<CompiledUnit> {
		let mut ctx = CompilerContext::new(self.options.clone());
		let tree = tree::build(&mut ctx, node)?;
		unit::compile_tree(&mut ctx, &tree)
	}

	/// Emits code for the configured target.
	pub fn emit(&self, unit: &CompiledUnit) -> Output {
		match self.options.target {
			Target::Client => Output::Client(emit_client(unit, &self.options)),
			Target::Static => Output::Static(emit_static(unit, &self.options)),
		}
	}
}

/// Compiles `source` with `options`.
pub fn compile(source: &str, options: &CompilerOptions) -> Result<CompiledUnit> {
	Compiler::new(options.clone()).compile(source)
}

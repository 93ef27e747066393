//! Static/Dynamic Partitioner.
//!
//! Walks a [`TreeNode`] tree depth-first and splits it into static template
//! markup and an ordered list of [`DynamicSlot`]s. Every slot breaks the
//! template, so `template_chunks.len() == slots.len() + 1` and chunk `i + 1`
//! follows slot `i` in document order. Attribute slots of an element are
//! recorded when its open tag is written, before any slot of its children.

use stencil_ast::{Expr, ExprKind};

use crate::context::CompilerContext;
use crate::error::Result;
use crate::html::{escape_attr, escape_text, is_void_element};
use crate::tree::{AttrValue, Attribute, Content, NodeKind, TreeNode, build_nested};
use crate::unit::{CompiledUnit, compile_tree};

/// Whether a slot fills an attribute or a child position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
	/// Child content inserted under `parent_index`
	Text,
	/// Attribute `attr_name` of the element at `parent_index`
	Attr,
}

/// A value known at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
	/// String, unescaped
	Str(String),
	/// Number, as written
	Number(String),
	/// Boolean
	Bool(bool),
	/// `null` / `undefined`
	Null,
}

/// The value a slot is filled with.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
	/// Primitive literal
	Literal(Literal),
	/// Expression evaluated at runtime
	Expr(Expr),
	/// `test ? consequent : alternate`
	Conditional {
		/// Condition source
		test: String,
		/// Value when the condition holds
		consequent: Box<SlotValue>,
		/// Value otherwise
		alternate: Box<SlotValue>,
	},
	/// Setter generated for `bind:`; holds the assignment target
	Setter(String),
	/// Spread attributes
	Spread(Vec<Expr>),
	/// `.map` call whose callback body is compiled as a unit
	List(ListRender),
	/// Nested unit (fragment or JSX value)
	Unit(Box<CompiledUnit>),
	/// Component construction
	Component(ComponentCall),
}

/// A rewritten `receiver.map((params) => <body/>)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRender {
	/// Source of the mapped collection
	pub receiver: String,
	/// Callback parameters without parentheses
	pub params: String,
	/// Unit constructed for each item
	pub body: Box<CompiledUnit>,
}

/// A component construction call.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentCall {
	/// Component name as written
	pub name: String,
	/// Props in source order, without `key`
	pub props: Vec<Prop>,
	/// Children compiled as their own unit
	pub children: Option<Box<CompiledUnit>>,
	/// Value of the `key` prop
	pub key: Option<Box<SlotValue>>,
}

/// A named prop of a [`ComponentCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
	/// Prop name
	pub name: String,
	/// Prop value
	pub value: SlotValue,
}

/// One point of dynamic content.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSlot {
	/// Attribute or child slot
	pub kind: SlotKind,
	/// Index of the element the slot belongs to (0 is the mount parent)
	pub parent_index: usize,
	/// Index of the nearest following static sibling or marker; `None`
	/// appends to the parent
	pub before_index: Option<usize>,
	/// Value expression
	pub value: SlotValue,
	/// Attribute name for `Attr` slots
	pub attr_name: Option<String>,
}

/// Result of partitioning one unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
	/// Static markup around the slots
	pub template_chunks: Vec<String>,
	/// Slots in document order
	pub slots: Vec<DynamicSlot>,
	/// Reconciliation key of the root element or sole root component
	pub key: Option<SlotValue>,
}

/// Partitions a unit's tree.
pub fn partition(ctx: &mut CompilerContext, tree: &TreeNode) -> Result<Partition> {
	let mut partitioner = Partitioner {
		ctx,
		chunks: vec![String::new()],
		slots: Vec::new(),
	};
	match tree.kind {
		NodeKind::Normal | NodeKind::Svg => partitioner.node(tree, 0, None)?,
		NodeKind::Fragment => partitioner.children(&tree.children, 0)?,
		_ => partitioner.children(std::slice::from_ref(tree), 0)?,
	}

	let key = match tree.attribute("key") {
		Some(value) if matches!(tree.kind, NodeKind::Normal | NodeKind::Svg) => {
			Some(partitioner.attr_value(value)?)
		}
		_ => root_component_key(&partitioner.slots),
	};
	Ok(Partition {
		template_chunks: partitioner.chunks,
		slots: partitioner.slots,
		key,
	})
}

fn root_component_key(slots: &[DynamicSlot]) -> Option<SlotValue> {
	match slots {
		[
			DynamicSlot {
				parent_index: 0,
				value: SlotValue::Component(call),
				..
			},
		] => call.key.as_deref().cloned(),
		_ => None,
	}
}

struct Partitioner<'c> {
	ctx: &'c mut CompilerContext,
	chunks: Vec<String>,
	slots: Vec<DynamicSlot>,
}

impl Partitioner<'_> {
	fn push_str(&mut self, s: &str) {
		if let Some(chunk) = self.chunks.last_mut() {
			chunk.push_str(s);
		}
	}

	fn push_slot(&mut self, slot: DynamicSlot) {
		self.slots.push(slot);
		self.chunks.push(String::new());
	}

	fn children(&mut self, children: &[TreeNode], parent_index: usize) -> Result<()> {
		for (i, child) in children.iter().enumerate() {
			let before = children[i + 1..]
				.iter()
				.find(|sibling| sibling.kind.is_positional())
				.and_then(|sibling| sibling.index);
			self.node(child, parent_index, before)?;
		}
		Ok(())
	}

	fn node(&mut self, node: &TreeNode, parent_index: usize, before: Option<usize>) -> Result<()> {
		match node.kind {
			NodeKind::Normal | NodeKind::Svg => self.element(node)?,
			NodeKind::Text => {
				if let Content::Text(text) = &node.content {
					self.push_str(&escape_text(text));
				}
			}
			NodeKind::Comment => self.push_str("<!>"),
			NodeKind::Expression | NodeKind::Spread => {
				if let Content::Expr(expr) = &node.content {
					let value = self.expr_value(expr)?;
					self.text_slot(parent_index, before, value);
				}
			}
			NodeKind::Component => {
				let call = self.component(node)?;
				self.text_slot(parent_index, before, SlotValue::Component(call));
			}
			NodeKind::Fragment => {
				let unit = compile_tree(self.ctx, node)?;
				self.text_slot(parent_index, before, SlotValue::Unit(Box::new(unit)));
			}
		}
		Ok(())
	}

	fn text_slot(&mut self, parent_index: usize, before_index: Option<usize>, value: SlotValue) {
		self.push_slot(DynamicSlot {
			kind: SlotKind::Text,
			parent_index,
			before_index,
			value,
			attr_name: None,
		});
	}

	fn element(&mut self, node: &TreeNode) -> Result<()> {
		let index = node.index.unwrap_or_default();
		self.push_str(&format!("<{}", node.tag));

		let mut dynamic: Vec<&Attribute> = Vec::new();
		for attr in &node.attributes {
			if attr.name == "key" {
				continue;
			}
			let name = html_attr_name(&attr.name);
			match &attr.value {
				AttrValue::Bool(true) => self.push_str(&format!(" {}", name)),
				AttrValue::Bool(false) | AttrValue::Null => {}
				AttrValue::Str(value) => {
					self.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)))
				}
				AttrValue::Number(digits) => self.push_str(&format!(" {}=\"{}\"", name, digits)),
				_ => dynamic.push(attr),
			}
		}

		if self.ctx.options().data_idx {
			let key = self.ctx.options().hydration_key.clone();
			self.push_str(&format!(" data-idx=\"{}-{}\"", key, index));
		}

		for attr in dynamic {
			let value = self.attr_value(&attr.value)?;
			self.push_slot(DynamicSlot {
				kind: SlotKind::Attr,
				parent_index: index,
				before_index: None,
				value,
				attr_name: Some(html_attr_name(&attr.name).to_string()),
			});
		}

		let self_closing_svg =
			node.kind == NodeKind::Svg && node.self_closing && node.children.is_empty();
		if is_void_element(&node.tag) || self_closing_svg {
			self.push_str("/>");
			return Ok(());
		}

		self.push_str(">");
		self.children(&node.children, index)?;
		self.push_str(&format!("</{}>", node.tag));
		Ok(())
	}

	fn component(&mut self, node: &TreeNode) -> Result<ComponentCall> {
		let mut props = Vec::with_capacity(node.attributes.len());
		let mut key = None;
		for attr in &node.attributes {
			let value = self.attr_value(&attr.value)?;
			if attr.name == "key" {
				key = Some(Box::new(value));
			} else {
				props.push(Prop {
					name: attr.name.clone(),
					value,
				});
			}
		}

		let children = if node.children.is_empty() {
			None
		} else {
			let fragment = TreeNode::fragment(node.children.clone());
			Some(Box::new(compile_tree(self.ctx, &fragment)?))
		};

		Ok(ComponentCall {
			name: node.tag.clone(),
			props,
			children,
			key,
		})
	}

	fn attr_value(&mut self, value: &AttrValue) -> Result<SlotValue> {
		let value = match value {
			AttrValue::Bool(b) => SlotValue::Literal(Literal::Bool(*b)),
			AttrValue::Str(s) => SlotValue::Literal(Literal::Str(s.clone())),
			AttrValue::Number(digits) => SlotValue::Literal(Literal::Number(digits.clone())),
			AttrValue::Null => SlotValue::Literal(Literal::Null),
			AttrValue::Expr(expr) | AttrValue::Conditional(expr) => self.expr_value(expr)?,
			AttrValue::Setter(target) => SlotValue::Setter(target.clone()),
			AttrValue::Spread(exprs) => SlotValue::Spread(exprs.clone()),
			AttrValue::Element(tree) => SlotValue::Unit(Box::new(compile_tree(self.ctx, tree)?)),
		};
		Ok(value)
	}

	fn expr_value(&mut self, expr: &Expr) -> Result<SlotValue> {
		let value = match &expr.kind {
			ExprKind::StringLit(s) => SlotValue::Literal(Literal::Str(s.clone())),
			ExprKind::NumberLit(digits) => SlotValue::Literal(Literal::Number(digits.clone())),
			ExprKind::BoolLit(b) => SlotValue::Literal(Literal::Bool(*b)),
			ExprKind::Nullish => SlotValue::Literal(Literal::Null),
			ExprKind::Conditional {
				test,
				consequent,
				alternate,
			} => SlotValue::Conditional {
				test: test.clone(),
				consequent: Box::new(self.expr_value(consequent)?),
				alternate: Box::new(self.expr_value(alternate)?),
			},
			ExprKind::Map(call) => {
				let tree = build_nested(self.ctx, &call.body)?;
				SlotValue::List(ListRender {
					receiver: call.receiver.clone(),
					params: call.params.clone(),
					body: Box::new(compile_tree(self.ctx, &tree)?),
				})
			}
			ExprKind::Jsx(node) => {
				let tree = build_nested(self.ctx, node)?;
				SlotValue::Unit(Box::new(compile_tree(self.ctx, &tree)?))
			}
			_ => SlotValue::Expr(expr.clone()),
		};
		Ok(value)
	}
}

/// Maps JSX attribute names to their HTML spelling.
pub fn html_attr_name(name: &str) -> &str {
	match name {
		"className" => "class",
		"htmlFor" => "for",
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tree::build;
	use stencil_ast::parse;

	fn partition_source(source: &str) -> Partition {
		let mut ctx = CompilerContext::default();
		let tree = build(&mut ctx, &parse(source).unwrap()).unwrap();
		partition(&mut ctx, &tree).unwrap()
	}

	#[test]
	fn test_static_tree() {
		let p = partition_source("<div>Hello<span>World</span></div>");
		assert_eq!(
			p.template_chunks,
			vec![r#"<div data-idx="0-1">Hello<span data-idx="0-3">World</span></div>"#]
		);
		assert!(p.slots.is_empty());
	}

	#[test]
	fn test_text_slot_between_chunks() {
		let p = partition_source("<div>Hello {name}!</div>");
		assert_eq!(
			p.template_chunks,
			vec![r#"<div data-idx="0-1">Hello "#, "<!>!</div>"]
		);
		assert_eq!(p.slots.len(), 1);
		let slot = &p.slots[0];
		assert_eq!(slot.kind, SlotKind::Text);
		assert_eq!(slot.parent_index, 1);
		assert_eq!(slot.before_index, Some(3));
		assert!(matches!(&slot.value, SlotValue::Expr(e) if e.source == "name"));
	}

	#[test]
	fn test_attribute_slots_precede_child_slots() {
		let p = partition_source(r#"<a href={url} class="link" onClick={go}>{label}</a>"#);
		let kinds: Vec<_> = p.slots.iter().map(|s| s.kind).collect();
		assert_eq!(kinds, vec![SlotKind::Attr, SlotKind::Attr, SlotKind::Text]);
		assert_eq!(p.slots[0].attr_name.as_deref(), Some("href"));
		assert_eq!(p.slots[1].attr_name.as_deref(), Some("onClick"));
		assert_eq!(p.template_chunks[0], r#"<a class="link" data-idx="0-1""#);
		assert_eq!(p.template_chunks.len(), p.slots.len() + 1);
	}

	#[test]
	fn test_void_and_boolean_attributes() {
		let p = partition_source(r#"<input type="checkbox" checked disabled={false} />"#);
		assert_eq!(
			p.template_chunks,
			vec![r#"<input type="checkbox" checked data-idx="0-1"/>"#]
		);
	}

	#[test]
	fn test_text_is_escaped() {
		let p = partition_source("<p>a &lt; b {\"<b>\"}</p>");
		assert_eq!(
			p.template_chunks,
			vec![r#"<p data-idx="0-1">a &amp;lt; b &lt;b&gt;</p>"#]
		);
	}

	#[test]
	fn test_component_slot_carries_props_and_children() {
		let p = partition_source(r#"<div><Card title="x" key={id}><p>{body}</p></Card></div>"#);
		assert_eq!(p.slots.len(), 1);
		let SlotValue::Component(call) = &p.slots[0].value else {
			panic!("expected component");
		};
		assert_eq!(call.name, "Card");
		assert_eq!(call.props.len(), 1);
		assert!(matches!(call.key.as_deref(), Some(SlotValue::Expr(e)) if e.source == "id"));
		let children = call.children.as_ref().unwrap();
		assert_eq!(children.template, r#"<p data-idx="0-1"></p>"#);
		assert_eq!(children.slots[0].parent_index, 1);
	}

	#[test]
	fn test_map_is_rewritten_to_list() {
		let p = partition_source("<ul>{items.map((item) => <li key={item.id}>{item.name}</li>)}</ul>");
		let SlotValue::List(list) = &p.slots[0].value else {
			panic!("expected list");
		};
		assert_eq!(list.receiver, "items");
		assert_eq!(list.params, "item");
		assert_eq!(list.body.template, r#"<li data-idx="0-1"></li>"#);
		assert!(list.body.key.is_some());
	}

	#[test]
	fn test_conditional_branches_compile_jsx() {
		let p = partition_source("<div>{ok ? <b>yes</b> : 'no'}</div>");
		let SlotValue::Conditional {
			test,
			consequent,
			alternate,
		} = &p.slots[0].value
		else {
			panic!("expected conditional");
		};
		assert_eq!(test, "ok");
		assert!(matches!(**consequent, SlotValue::Unit(_)));
		assert_eq!(**alternate, SlotValue::Literal(Literal::Str("no".into())));
	}

	#[test]
	fn test_root_fragment_slots_use_mount_parent() {
		let p = partition_source("<><h1>Title</h1>{body}</>");
		assert_eq!(p.slots[0].parent_index, 0);
		assert_eq!(p.slots[0].before_index, Some(3));
		assert_eq!(p.template_chunks, vec![r#"<h1 data-idx="0-1">Title</h1>"#, "<!>"]);
	}
}

//! Tree Builder.
//!
//! Converts a JSX AST into a uniform [`TreeNode`] tree: resolves each node's
//! kind, merges adjacent text, inserts comment markers between ambiguous
//! siblings and assigns positional indices in document order.
//!
//! ## Indices
//!
//! Every node that occupies a real DOM position (elements, text, comment
//! markers) receives the next index of the current unit. Index 0 is the
//! mount parent, so the first positional node of a unit is always 1.
//! Component and fragment nodes carry no index; their children are built in
//! a fresh index space because they are compiled as separate units.

use stencil_ast::{
	Expr, ExprKind, JsxAttrName, JsxAttrValue, JsxAttribute, JsxElement, JsxExpression, JsxName,
	JsxNode,
};

use crate::context::CompilerContext;
use crate::error::{CompileError, Result};
use crate::html::is_svg_element;

/// Reserved attribute key collecting spread attributes.
pub const SPREAD_KEY: &str = "_$spread$";

/// Kind of a [`TreeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	/// An HTML element
	Normal,
	/// A component call
	Component,
	/// Static text
	Text,
	/// A fragment (`<>...</>` or `<Fragment>`)
	Fragment,
	/// A dynamic expression child
	Expression,
	/// An SVG element
	Svg,
	/// A synthetic `<!>` marker
	Comment,
	/// A spread child
	Spread,
}

impl NodeKind {
	/// Returns true for nodes whose rendered content is only known at runtime.
	pub fn is_dynamic(self) -> bool {
		matches!(
			self,
			Self::Expression | Self::Fragment | Self::Component | Self::Spread
		)
	}

	/// Returns true for nodes that occupy a DOM position in the template.
	pub fn is_positional(self) -> bool {
		matches!(self, Self::Normal | Self::Svg | Self::Text | Self::Comment)
	}
}

/// Attribute value after building.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	/// Valueless attribute (`true`) or boolean literal
	Bool(bool),
	/// String literal
	Str(String),
	/// Number literal, as written
	Number(String),
	/// `null` / `undefined`
	Null,
	/// Dynamic expression
	Expr(Expr),
	/// Conditional expression, evaluated on the dynamic path
	Conditional(Expr),
	/// Generated setter for a `bind:` attribute; holds the assignment target
	Setter(String),
	/// Spread attributes in source order
	Spread(Vec<Expr>),
	/// JSX used as an attribute value, built as its own unit
	Element(Box<TreeNode>),
}

impl AttrValue {
	/// Returns true when the value is known at compile time.
	pub fn is_static(&self) -> bool {
		matches!(
			self,
			Self::Bool(_) | Self::Str(_) | Self::Number(_) | Self::Null
		)
	}
}

/// A named attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	/// Attribute or prop name
	pub name: String,
	/// Value
	pub value: AttrValue,
}

/// Payload carried by text and expression nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
	/// Elements, components, fragments and markers
	#[default]
	None,
	/// Text of a `Text` node
	Text(String),
	/// Expression of an `Expression` node
	Expr(Expr),
}

/// A node of the uniform tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
	/// Node kind
	pub kind: NodeKind,
	/// Tag name; empty for text, expressions and markers
	pub tag: String,
	/// Attributes or component props in source order
	pub attributes: Vec<Attribute>,
	/// Children in document order
	pub children: Vec<TreeNode>,
	/// Positional index, `None` for non-positional nodes
	pub index: Option<usize>,
	/// Whether this is the last child of its parent
	pub is_last_child: bool,
	/// Whether the element was written self-closing
	pub self_closing: bool,
	/// Whether this node is the root of a compiled unit
	pub root: bool,
	/// Text or expression payload
	pub content: Content,
}

impl TreeNode {
	fn new(kind: NodeKind, tag: impl Into<String>) -> Self {
		Self {
			kind,
			tag: tag.into(),
			attributes: Vec::new(),
			children: Vec::new(),
			index: None,
			is_last_child: false,
			self_closing: false,
			root: false,
			content: Content::None,
		}
	}

	/// A static text node.
	pub fn text(index: usize, value: impl Into<String>) -> Self {
		Self {
			index: Some(index),
			content: Content::Text(value.into()),
			..Self::new(NodeKind::Text, "")
		}
	}

	/// A root fragment holding `children`.
	pub fn fragment(children: Vec<TreeNode>) -> Self {
		Self {
			children,
			root: true,
			..Self::new(NodeKind::Fragment, "")
		}
	}

	/// A comment marker.
	pub fn comment(index: usize) -> Self {
		Self {
			index: Some(index),
			..Self::new(NodeKind::Comment, "")
		}
	}

	/// A dynamic expression child.
	pub fn expression(expr: Expr) -> Self {
		Self {
			content: Content::Expr(expr),
			..Self::new(NodeKind::Expression, "")
		}
	}

	/// Finds an attribute by name.
	pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
		self.attributes
			.iter()
			.find(|attr| attr.name == name)
			.map(|attr| &attr.value)
	}

	/// Positional indices of this unit in document order.
	///
	/// Children of component and fragment nodes belong to other units and
	/// are not visited.
	pub fn indices(&self) -> Vec<usize> {
		let mut out = Vec::new();
		self.collect_indices(&mut out, true);
		out
	}

	fn collect_indices(&self, out: &mut Vec<usize>, is_unit_root: bool) {
		out.extend(self.index);
		let descend = matches!(self.kind, NodeKind::Normal | NodeKind::Svg)
			|| (is_unit_root && self.kind == NodeKind::Fragment);
		if descend {
			for child in &self.children {
				child.collect_indices(out, false);
			}
		}
	}
}

/// Builds the tree of a new unit from a JSX root.
///
/// The index counter restarts at 1. Component roots are wrapped in a root
/// fragment so that the component output is a slot of the mount parent.
pub fn build(ctx: &mut CompilerContext, node: &JsxNode) -> Result<TreeNode> {
	ctx.reset_index();
	let tree = build_root(ctx, node)?;
	tracing::trace!(positions = ctx.assigned(), kind = ?tree.kind, "built tree");
	Ok(tree)
}

/// Builds a subtree that becomes its own unit, without disturbing the
/// index space of the unit being built.
pub fn build_nested(ctx: &mut CompilerContext, node: &JsxNode) -> Result<TreeNode> {
	ctx.nested(|ctx| build_root(ctx, node))
}

fn build_root(ctx: &mut CompilerContext, node: &JsxNode) -> Result<TreeNode> {
	let mut tree = match node {
		JsxNode::Element(el) => match resolve_kind(&el.name, false) {
			NodeKind::Normal | NodeKind::Svg => build_element(ctx, el, false)?,
			NodeKind::Fragment => fragment_root(ctx, &el.children)?,
			_ => fragment_root(ctx, std::slice::from_ref(node))?,
		},
		JsxNode::Fragment(fragment) => fragment_root(ctx, &fragment.children)?,
		_ => fragment_root(ctx, std::slice::from_ref(node))?,
	};
	tree.root = true;
	Ok(tree)
}

fn fragment_root(ctx: &mut CompilerContext, children: &[JsxNode]) -> Result<TreeNode> {
	let mut node = TreeNode::new(NodeKind::Fragment, "");
	node.children = build_children(ctx, children, false, true)?;
	Ok(node)
}

/// Resolves the kind of an element name.
///
/// Component takes precedence over Fragment, Fragment over Svg and Svg over
/// Normal. The exact tag `Fragment` is a fragment.
pub fn resolve_kind(name: &JsxName, in_svg: bool) -> NodeKind {
	match name {
		JsxName::Ident(tag) if tag == "Fragment" => NodeKind::Fragment,
		JsxName::Ident(tag) if is_component_name(tag) => NodeKind::Component,
		JsxName::Ident(tag) if is_svg_element(tag, in_svg) => NodeKind::Svg,
		JsxName::Ident(_) => NodeKind::Normal,
		JsxName::Member(parts) if parts.iter().any(|p| starts_uppercase(p)) => NodeKind::Component,
		JsxName::Member(_) => NodeKind::Normal,
		JsxName::Namespaced { namespace, name }
			if starts_uppercase(namespace) || starts_uppercase(name) =>
		{
			NodeKind::Component
		}
		JsxName::Namespaced { name, .. } if is_svg_element(name, true) => NodeKind::Svg,
		JsxName::Namespaced { .. } => NodeKind::Normal,
	}
}

fn is_component_name(tag: &str) -> bool {
	tag.chars().next().is_some_and(|c| !c.is_ascii_lowercase())
}

fn starts_uppercase(s: &str) -> bool {
	s.chars().next().is_some_and(char::is_uppercase)
}

/// A child after literal merging.
enum Item<'a> {
	Text(String),
	Expr(&'a Expr),
	Spread(&'a Expr),
	Node(&'a JsxNode),
}

impl Item<'_> {
	fn is_dynamic(&self) -> bool {
		match self {
			Item::Text(_) => false,
			Item::Expr(_) | Item::Spread(_) => true,
			Item::Node(JsxNode::Element(el)) => matches!(
				resolve_kind(&el.name, false),
				NodeKind::Component | NodeKind::Fragment
			),
			Item::Node(_) => true,
		}
	}
}

/// Merges adjacent text and string/number literal expressions.
///
/// Boolean, nullish and empty expressions render nothing and are dropped.
fn merge_children(children: &[JsxNode]) -> Vec<Item<'_>> {
	let mut items = Vec::with_capacity(children.len());
	let mut pending: Option<String> = None;

	for child in children {
		let literal = match child {
			JsxNode::Text(text) => Some(text.value.clone()),
			JsxNode::Expression(JsxExpression { expr: None }) => continue,
			JsxNode::Expression(JsxExpression { expr: Some(expr) }) => match &expr.kind {
				ExprKind::StringLit(value) => Some(value.clone()),
				ExprKind::NumberLit(digits) => Some(format_number(digits)),
				ExprKind::BoolLit(_) | ExprKind::Nullish => continue,
				_ => None,
			},
			_ => None,
		};

		if let Some(text) = literal {
			pending.get_or_insert_with(String::new).push_str(&text);
			continue;
		}
		if let Some(text) = pending.take() {
			items.push(Item::Text(text));
		}
		items.push(match child {
			JsxNode::Expression(JsxExpression { expr: Some(expr) }) => Item::Expr(expr),
			JsxNode::SpreadChild(expr) => Item::Spread(expr),
			node => Item::Node(node),
		});
	}

	if let Some(text) = pending.take() {
		items.push(Item::Text(text));
	}
	items.retain(|item| !matches!(item, Item::Text(text) if text.is_empty()));
	items
}

/// Renders a number literal the way JavaScript stringifies it.
fn format_number(digits: &str) -> String {
	match digits.parse::<f64>() {
		Ok(value) => value.to_string(),
		Err(_) => digits.to_string(),
	}
}

fn build_children(
	ctx: &mut CompilerContext,
	children: &[JsxNode],
	in_svg: bool,
	root_level: bool,
) -> Result<Vec<TreeNode>> {
	let items = merge_children(children);
	let mut out: Vec<TreeNode> = Vec::with_capacity(items.len());

	for item in items {
		let needs_anchor = matches!(item, Item::Text(_)) || item.is_dynamic();
		if needs_anchor && out.last().is_some_and(|prev| prev.kind.is_dynamic()) {
			out.push(TreeNode::comment(ctx.next_index()));
		}

		let node = match item {
			Item::Text(text) => TreeNode::text(ctx.next_index(), text),
			Item::Expr(expr) => TreeNode::expression(expr.clone()),
			Item::Spread(expr) => {
				tracing::warn!(
					expr = %expr.source,
					"spread children are not supported, rendering as an expression"
				);
				TreeNode::expression(expr.clone())
			}
			Item::Node(JsxNode::Element(el)) => build_element(ctx, el, in_svg)?,
			Item::Node(JsxNode::Fragment(fragment)) => {
				let mut node = TreeNode::new(NodeKind::Fragment, "");
				node.children =
					ctx.nested(|ctx| build_children(ctx, &fragment.children, in_svg, true))?;
				node
			}
			Item::Node(other) => {
				tracing::warn!(node = ?other, "unsupported JSX child, skipping");
				continue;
			}
		};
		out.push(node);
	}

	// A root-level dynamic child would otherwise append to whatever parent
	// the unit is mounted into.
	if root_level && out.last().is_some_and(|last| last.kind.is_dynamic()) {
		out.push(TreeNode::comment(ctx.next_index()));
	}
	if let Some(last) = out.last_mut() {
		last.is_last_child = true;
	}
	Ok(out)
}

fn build_element(ctx: &mut CompilerContext, el: &JsxElement, in_svg: bool) -> Result<TreeNode> {
	let kind = resolve_kind(&el.name, in_svg);
	let tag = el.name.to_string();

	let mut node = TreeNode::new(kind, tag);
	node.self_closing = el.self_closing;

	match kind {
		NodeKind::Component | NodeKind::Fragment => {
			node.attributes = build_attributes(ctx, el, &node.tag)?;
			node.children = ctx.nested(|ctx| build_children(ctx, &el.children, false, true))?;
		}
		_ => {
			node.index = Some(ctx.next_index());
			node.attributes = build_attributes(ctx, el, &node.tag)?;
			let child_svg = kind == NodeKind::Svg && node.tag != "foreignObject";
			node.children = build_children(ctx, &el.children, child_svg, false)?;
		}
	}
	Ok(node)
}

fn build_attributes(ctx: &mut CompilerContext, el: &JsxElement, tag: &str) -> Result<Vec<Attribute>> {
	let mut out: Vec<Attribute> = Vec::with_capacity(el.attributes.len());

	for attr in &el.attributes {
		match attr {
			JsxAttribute::Spread(expr) => {
				match out.iter_mut().find(|a| a.name == SPREAD_KEY) {
					Some(Attribute {
						value: AttrValue::Spread(exprs),
						..
					}) => exprs.push(expr.clone()),
					_ => out.push(Attribute {
						name: SPREAD_KEY.to_string(),
						value: AttrValue::Spread(vec![expr.clone()]),
					}),
				}
			}
			JsxAttribute::Named {
				name: JsxAttrName::Namespaced { namespace, name },
				value,
			} if namespace == "bind" => {
				let target = match value {
					Some(JsxAttrValue::Expression(JsxExpression { expr: Some(expr) }))
						if expr.is_assignable() =>
					{
						expr
					}
					other => {
						return Err(CompileError::InvalidBindTarget {
							attr: name.clone(),
							target: value_source(other.as_ref()),
						});
					}
				};
				out.push(Attribute {
					name: name.clone(),
					value: AttrValue::Expr(target.clone()),
				});
				out.push(Attribute {
					name: setter_name(name),
					value: AttrValue::Setter(target.source.clone()),
				});
			}
			JsxAttribute::Named { name, value } => {
				let name = name.to_string();
				validate_attr_name(tag, &name)?;
				let value = attr_value(ctx, &name, value.as_ref())?;
				out.push(Attribute { name, value });
			}
		}
	}
	Ok(out)
}

fn validate_attr_name(tag: &str, name: &str) -> Result<()> {
	let invalid_start = name
		.chars()
		.next()
		.is_none_or(|c| c.is_ascii_digit() || c == '-');
	if invalid_start || name == SPREAD_KEY {
		return Err(CompileError::UnsupportedAttributeName {
			tag: tag.to_string(),
			name: name.to_string(),
		});
	}
	Ok(())
}

fn attr_value(
	ctx: &mut CompilerContext,
	name: &str,
	value: Option<&JsxAttrValue>,
) -> Result<AttrValue> {
	let value = match value {
		None => AttrValue::Bool(true),
		Some(JsxAttrValue::Str(s)) => AttrValue::Str(s.clone()),
		Some(JsxAttrValue::Element(node)) => AttrValue::Element(Box::new(build_nested(ctx, node)?)),
		Some(JsxAttrValue::Expression(JsxExpression { expr: None })) => {
			return Err(CompileError::EmptyAttributeValue {
				name: name.to_string(),
			});
		}
		Some(JsxAttrValue::Expression(JsxExpression { expr: Some(expr) })) => match &expr.kind {
			ExprKind::StringLit(s) => AttrValue::Str(s.clone()),
			ExprKind::NumberLit(digits) => AttrValue::Number(digits.clone()),
			ExprKind::BoolLit(b) => AttrValue::Bool(*b),
			ExprKind::Nullish => AttrValue::Null,
			ExprKind::Conditional { .. } => AttrValue::Conditional(expr.clone()),
			ExprKind::Jsx(node) => AttrValue::Element(Box::new(build_nested(ctx, node)?)),
			_ => AttrValue::Expr(expr.clone()),
		},
	};
	Ok(value)
}

/// `value` -> `updateValue`
pub fn setter_name(attr: &str) -> String {
	let mut chars = attr.chars();
	match chars.next() {
		Some(first) => format!("update{}{}", first.to_uppercase(), chars.as_str()),
		None => "update".to_string(),
	}
}

fn value_source(value: Option<&JsxAttrValue>) -> String {
	match value {
		Some(JsxAttrValue::Str(s)) => format!("\"{}\"", s),
		Some(JsxAttrValue::Expression(JsxExpression { expr: Some(expr) })) => expr.source.clone(),
		Some(JsxAttrValue::Element(node)) if node.is_root_like() => "<jsx>".to_string(),
		_ => String::new(),
	}
}

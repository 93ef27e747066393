//! JSX syntax tree node definitions.

use core::fmt;

/// A node in a JSX tree.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxNode {
	/// `<tag ...>children</tag>` or `<tag ... />`
	Element(JsxElement),
	/// `<>children</>`
	Fragment(JsxFragment),
	/// Literal text between tags, already whitespace-normalized.
	Text(JsxText),
	/// `{expr}` in child position.
	Expression(JsxExpression),
	/// `{...expr}` in child position.
	SpreadChild(Expr),
}

impl JsxNode {
	/// Returns true for nodes that can stand as the root of a JSX literal.
	pub fn is_root_like(&self) -> bool {
		matches!(self, Self::Element(_) | Self::Fragment(_))
	}
}

/// An element such as `<div class="a">...</div>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
	/// The tag name.
	pub name: JsxName,
	/// Attributes in source order.
	pub attributes: Vec<JsxAttribute>,
	/// Children in source order.
	pub children: Vec<JsxNode>,
	/// Whether the element was written as `<tag />`.
	pub self_closing: bool,
}

/// A fragment `<>...</>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxFragment {
	/// Children in source order.
	pub children: Vec<JsxNode>,
}

/// Literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxText {
	/// Normalized text content.
	pub value: String,
}

/// An expression container `{...}`.
///
/// `expr` is `None` for empty containers and containers holding only comments.
#[derive(Debug, Clone, PartialEq)]
pub struct JsxExpression {
	/// The contained expression.
	pub expr: Option<Expr>,
}

/// Element names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsxName {
	/// `div`, `MyComponent`, `my-element`
	Ident(String),
	/// `ui.Button`, `a.b.C`
	Member(Vec<String>),
	/// `svg:rect`
	Namespaced {
		/// Part before the colon.
		namespace: String,
		/// Part after the colon.
		name: String,
	},
}

impl fmt::Display for JsxName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ident(name) => f.write_str(name),
			Self::Member(parts) => f.write_str(&parts.join(".")),
			Self::Namespaced { namespace, name } => write!(f, "{}:{}", namespace, name),
		}
	}
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
	/// `name`, `name="value"`, `name={expr}`, `name=<el/>`
	Named {
		/// Attribute name.
		name: JsxAttrName,
		/// Attribute value; `None` for valueless (boolean) attributes.
		value: Option<JsxAttrValue>,
	},
	/// `{...expr}`
	Spread(Expr),
}

/// Attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsxAttrName {
	/// `class`, `onClick`, `aria-label`
	Ident(String),
	/// `bind:value`, `xlink:href`
	Namespaced {
		/// Part before the colon.
		namespace: String,
		/// Part after the colon.
		name: String,
	},
}

impl fmt::Display for JsxAttrName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ident(name) => f.write_str(name),
			Self::Namespaced { namespace, name } => write!(f, "{}:{}", namespace, name),
		}
	}
}

/// Attribute values.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttrValue {
	/// `"text"` or `'text'`
	Str(String),
	/// `{expr}`
	Expression(JsxExpression),
	/// `<el />` used directly as a value
	Element(Box<JsxNode>),
}

/// An embedded JavaScript expression.
///
/// The source text is kept verbatim; `kind` records the shapes the compiler
/// treats specially.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
	/// Trimmed source text.
	pub source: String,
	/// Classified shape.
	pub kind: ExprKind,
}

impl Expr {
	/// Returns true for string, number, boolean and nullish literals.
	pub fn is_literal(&self) -> bool {
		matches!(
			self.kind,
			ExprKind::StringLit(_) | ExprKind::NumberLit(_) | ExprKind::BoolLit(_) | ExprKind::Nullish
		)
	}

	/// Returns true for identifiers and member chains (`a`, `a.b.c`).
	pub fn is_assignable(&self) -> bool {
		matches!(self.kind, ExprKind::Ident | ExprKind::Member)
	}
}

/// The classified shape of an [`Expr`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
	/// A string literal without interpolation; holds the unquoted value.
	StringLit(String),
	/// A numeric literal; holds the source digits.
	NumberLit(String),
	/// `true` / `false`
	BoolLit(bool),
	/// `null` / `undefined`
	Nullish,
	/// A plain identifier.
	Ident,
	/// A member chain such as `state.user.name`.
	Member,
	/// `test ? consequent : alternate`
	Conditional {
		/// Condition source.
		test: String,
		/// Branch taken when the condition holds.
		consequent: Box<Expr>,
		/// Branch taken otherwise.
		alternate: Box<Expr>,
	},
	/// `receiver.map((params) => <jsx/>)`
	Map(MapCall),
	/// A JSX literal used as a value.
	Jsx(Box<JsxNode>),
	/// Arrow function or `function` expression.
	Function,
	/// Anything else.
	Other,
}

/// A `.map(...)` call whose callback returns a single JSX node.
#[derive(Debug, Clone, PartialEq)]
pub struct MapCall {
	/// Source of the expression the map is called on.
	pub receiver: String,
	/// Callback parameter list without surrounding parentheses.
	pub params: String,
	/// The JSX the callback returns.
	pub body: Box<JsxNode>,
}

//! JSX syntax tree and parser for the Stencil template compiler.
//!
//! This crate provides the Abstract Syntax Tree (AST) structures and the
//! parser for JSX literals. It is the input contract of `stencil-compiler`
//! and is kept separate so that other tools (formatters, linters) can share
//! the same tree.
//!
//! ## Supported Syntax
//!
//! ```text
//! <tag attr="text" flag prop={expr} bind:value={state} {...rest}>
//!     text
//!     {expression}
//!     {cond ? <a/> : <b/>}
//!     {items.map((item) => <li key={item.id}>{item.name}</li>)}
//!     <Component child=<span/> />
//!     <>fragment</>
//! </tag>
//! ```
//!
//! Embedded JavaScript is not parsed. Expression containers are delimited by
//! a scanner that understands string literals, template literals, comments
//! and nested JSX, and the source text is then classified into an
//! [`ExprKind`].
//!
//! ## Main Types
//!
//! - [`JsxNode`] - A node in the tree (element, fragment, text, expression)
//! - [`JsxElement`] - An element with attributes and children
//! - [`JsxAttribute`] - A named or spread attribute
//! - [`Expr`] - An embedded expression with its classified [`ExprKind`]
//!
//! ## Usage
//!
//! ```
//! use stencil_ast::{ExprKind, JsxNode, parse};
//!
//! let node = parse("<p>Hello {name}</p>").unwrap();
//! let JsxNode::Element(p) = node else { unreachable!() };
//! let JsxNode::Expression(expr) = &p.children[1] else { unreachable!() };
//! assert_eq!(expr.expr.as_ref().unwrap().kind, ExprKind::Ident);
//! ```

mod expr;
mod node;
mod parser;
mod scan;
mod text;

pub use expr::{classify, is_ident};
pub use node::{
	Expr, ExprKind, JsxAttrName, JsxAttrValue, JsxAttribute, JsxElement, JsxExpression,
	JsxFragment, JsxName, JsxNode, JsxText, MapCall,
};
pub use parser::{ParseError, parse};
pub use text::normalize_jsx_text;

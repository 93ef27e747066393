//! Code and markup emitters.
//!
//! Both targets consume a [`CompiledUnit`]. The client target produces a
//! hoisted template declaration and a `render(...)` call that wires every
//! slot to a position in the unit's index map. The static target produces
//! the chunk list and an `ssg(...)` call that renders a string on the server.
//!
//! [`CompiledUnit`]: crate::unit::CompiledUnit

mod client;
mod ssg;

pub use client::{ClientOutput, emit_client};
pub use ssg::{StaticOutput, emit_static};

use crate::partition::Literal;

/// Quotes `s` as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
	serde_json::Value::String(s.to_string()).to_string()
}

/// JavaScript source of a literal.
pub(crate) fn literal_code(literal: &Literal) -> String {
	match literal {
		Literal::Str(s) => js_string(s),
		Literal::Number(digits) => digits.clone(),
		Literal::Bool(b) => b.to_string(),
		Literal::Null => "null".to_string(),
	}
}

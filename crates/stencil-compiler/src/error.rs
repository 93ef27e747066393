//! Compile-time errors.

use stencil_ast::ParseError;

/// Errors raised while compiling JSX.
///
/// All of these indicate a bug in the source being compiled and abort the
/// compilation of the whole unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
	/// The source could not be parsed as JSX
	#[error(transparent)]
	Parse(#[from] ParseError),

	/// An attribute name the compiler cannot represent
	#[error("unsupported attribute name `{name}` on <{tag}>")]
	UnsupportedAttributeName {
		/// Element the attribute was found on
		tag: String,
		/// Attribute name as written
		name: String,
	},

	/// `bind:x` whose value is not an identifier or member expression
	#[error("invalid bind target for `bind:{attr}`: `{target}` is not assignable")]
	InvalidBindTarget {
		/// Bound attribute name (without the `bind:` prefix)
		attr: String,
		/// Source of the value expression, empty when no expression was given
		target: String,
	},

	/// An attribute written as `name={}`
	#[error("attribute `{name}` has an empty expression")]
	EmptyAttributeValue {
		/// Attribute name
		name: String,
	},

	/// The source contains no JSX root
	#[error("no JSX to compile")]
	EmptyJsx,

	/// Compiler options could not be loaded
	#[error("invalid compiler options: {0}")]
	Options(String),
}

/// Result type used throughout the compiler.
pub type Result<T> = core::result::Result<T, CompileError>;

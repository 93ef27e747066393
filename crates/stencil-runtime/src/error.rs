//! Runtime errors.

/// Errors raised while mounting, patching or rendering.
///
/// These are contract violations by the caller or the compiled artifact and
/// are returned synchronously. Unsupported values in children degrade with a
/// warning instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
	/// The mount target cannot hold children
	#[error("mount target is not a container node")]
	MissingContainer,

	/// A component binding resolved to something that cannot render
	#[error("`{name}` is not a component")]
	NotAComponent {
		/// Name used at the call site
		name: String,
	},

	/// A slot refers to an index the cloned template does not have
	#[error("template has no node at index {index}")]
	MissingNode {
		/// Template index
		index: usize,
	},

	/// Server-rendered markup does not match the template
	#[error("hydration mismatch: expected {expected}, found {found}")]
	HydrationMismatch {
		/// What the template expects at this position
		expected: String,
		/// What the server markup has
		found: String,
	},

	/// Template markup could not be parsed
	#[error("invalid template markup: {message}")]
	TemplateParse {
		/// Parser message
		message: String,
	},

	/// Chunk and value counts of a static render disagree
	#[error("static render expects {expected} values, got {found}")]
	SlotMismatch {
		/// `chunks.len() - 1`
		expected: usize,
		/// Number of values passed
		found: usize,
	},
}

/// Result type of the runtime.
pub type Result<T> = core::result::Result<T, RuntimeError>;

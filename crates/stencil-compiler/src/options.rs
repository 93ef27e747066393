//! Compiler configuration.
//!
//! Options can be built in code or loaded from a TOML document:
//!
//! ```toml
//! target = "static"
//! hydration_key = "app"
//! render_fn = "$render"
//! data_idx = true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

/// Output target of the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
	/// DOM template plus a `render(...)` call wiring the slots
	#[default]
	Client,
	/// HTML chunks plus an `ssg(...)` call producing a string
	Static,
}

/// Options controlling code generation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
	/// Output target
	#[serde(default)]
	pub target: Target,

	/// Key embedded in `data-idx` attributes and hydration markers
	#[serde(default = "default_hydration_key")]
	pub hydration_key: String,

	/// Runtime helper that mounts a template
	#[serde(default = "default_render_fn")]
	pub render_fn: String,

	/// Runtime helper that declares a template
	#[serde(default = "default_template_fn")]
	pub template_fn: String,

	/// Runtime helper that constructs a component
	#[serde(default = "default_component_fn")]
	pub component_fn: String,

	/// Runtime helper that renders static output
	#[serde(default = "default_ssg_fn")]
	pub ssg_fn: String,

	/// Whether elements carry `data-idx` attributes
	#[serde(default = "default_true")]
	pub data_idx: bool,
}

fn default_hydration_key() -> String {
	"0".to_string()
}

fn default_render_fn() -> String {
	"render".to_string()
}

fn default_template_fn() -> String {
	"template".to_string()
}

fn default_component_fn() -> String {
	"createComponent".to_string()
}

fn default_ssg_fn() -> String {
	"ssg".to_string()
}

fn default_true() -> bool {
	true
}

impl Default for CompilerOptions {
	fn default() -> Self {
		Self {
			target: Target::default(),
			hydration_key: default_hydration_key(),
			render_fn: default_render_fn(),
			template_fn: default_template_fn(),
			component_fn: default_component_fn(),
			ssg_fn: default_ssg_fn(),
			data_idx: true,
		}
	}
}

impl CompilerOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Loads options from a TOML document. Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		toml::from_str(source).map_err(|e| CompileError::Options(e.to_string()))
	}

	/// Sets the output target.
	pub fn target(mut self, target: Target) -> Self {
		self.target = target;
		self
	}

	/// Sets the hydration key.
	pub fn hydration_key(mut self, key: impl Into<String>) -> Self {
		self.hydration_key = key.into();
		self
	}

	/// Disables `data-idx` attributes.
	pub fn without_data_idx(mut self) -> Self {
		self.data_idx = false;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let options = CompilerOptions::default();
		assert_eq!(options.target, Target::Client);
		assert_eq!(options.hydration_key, "0");
		assert_eq!(options.render_fn, "render");
		assert_eq!(options.component_fn, "createComponent");
		assert!(options.data_idx);
	}

	#[test]
	fn test_from_toml_partial() {
		let options = CompilerOptions::from_toml_str(
			r#"
			target = "static"
			hydration_key = "app"
			"#,
		)
		.unwrap();
		assert_eq!(options.target, Target::Static);
		assert_eq!(options.hydration_key, "app");
		assert_eq!(options.ssg_fn, "ssg");
	}

	#[test]
	fn test_from_toml_empty_is_default() {
		assert_eq!(
			CompilerOptions::from_toml_str("").unwrap(),
			CompilerOptions::default()
		);
	}

	#[test]
	fn test_from_toml_invalid_target() {
		let err = CompilerOptions::from_toml_str(r#"target = "wasm""#).unwrap_err();
		assert!(matches!(err, CompileError::Options(_)));
	}
}

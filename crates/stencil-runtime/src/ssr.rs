//! Static rendering.
//!
//! Server output interleaves the template chunks produced by the static
//! emitter with rendered values. Dynamic text and nested markup are wrapped
//! in region markers so that hydration can find and replace them:
//!
//! ```text
//! <!--t-KEY-INDEX-->escaped text<!$>
//! <!--c-KEY-INDEX-->nested markup<!$>
//! ```
//!
//! `INDEX` is the template index of the node the value renders into.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attr::{attribute_value, expand_attributes};
use crate::error::{Result, RuntimeError};
use crate::html::{escape_attr, escape_text};
use crate::props::{CHILDREN_KEY, REF_KEY, is_event_key, is_update_key};
use crate::reconcile::text_of;

/// Options of a static render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrOptions {
	/// Prefix of region markers, matching the `data-idx` prefix of the
	/// compiled template
	pub hydration_key: String,
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			hydration_key: "0".to_string(),
		}
	}
}

/// A value filling the gap between two chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum SsrValue {
	/// Attribute written inside an opening tag
	Attr {
		/// Attribute name
		name: String,
		/// Value, converted like a client attribute
		value: Value,
	},
	/// Text content, escaped
	Text {
		/// Index of the node the text renders into
		parent_index: usize,
		/// Value, flattened like client children
		value: Value,
	},
	/// Markup rendered by a nested template or component
	Html {
		/// Index of the node the markup renders into
		parent_index: usize,
		/// Already rendered markup
		html: String,
	},
}

impl SsrValue {
	pub fn attr(name: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Attr {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn text(parent_index: usize, value: impl Into<Value>) -> Self {
		Self::Text {
			parent_index,
			value: value.into(),
		}
	}

	pub fn html(parent_index: usize, html: impl Into<String>) -> Self {
		Self::Html {
			parent_index,
			html: html.into(),
		}
	}
}

/// Start marker of a text region.
pub fn text_marker(key: &str, index: usize) -> String {
	format!("<!--t-{}-{}-->", key, index)
}

/// Start marker of a nested markup region.
pub fn html_marker(key: &str, index: usize) -> String {
	format!("<!--c-{}-{}-->", key, index)
}

/// End marker of either region.
pub const REGION_END: &str = "<!$>";

/// Joins `chunks` with the rendered `values`. There must be exactly one
/// value between each pair of chunks.
pub fn render_static(chunks: &[String], key: &str, values: &[SsrValue]) -> Result<String> {
	let expected = chunks.len().saturating_sub(1);
	if values.len() != expected {
		return Err(RuntimeError::SlotMismatch {
			expected,
			found: values.len(),
		});
	}

	let capacity = chunks.iter().map(String::len).sum::<usize>() + values.len() * 16;
	let mut out = String::with_capacity(capacity);
	for (i, chunk) in chunks.iter().enumerate() {
		out.push_str(chunk);
		if let Some(value) = values.get(i) {
			render_value(&mut out, key, value);
		}
	}
	tracing::trace!(key, len = out.len(), values = values.len(), "rendered static markup");
	Ok(out)
}

fn render_value(out: &mut String, key: &str, value: &SsrValue) {
	match value {
		SsrValue::Attr { name, value } => {
			if is_event_key(name) || is_update_key(name) || name == CHILDREN_KEY || name == REF_KEY {
				return;
			}
			for (name, value) in expand_attributes(name, value) {
				match attribute_value(name, value) {
					Some(text) if text.is_empty() => {
						out.push(' ');
						out.push_str(name);
					}
					Some(text) => {
						out.push(' ');
						out.push_str(name);
						out.push_str("=\"");
						out.push_str(&escape_attr(&text));
						out.push('"');
					}
					None => {}
				}
			}
		}
		SsrValue::Text {
			parent_index,
			value,
		} => {
			out.push_str(&text_marker(key, *parent_index));
			push_text(out, value);
			out.push_str(REGION_END);
		}
		SsrValue::Html { parent_index, html } => {
			out.push_str(&html_marker(key, *parent_index));
			out.push_str(html);
			out.push_str(REGION_END);
		}
	}
}

fn push_text(out: &mut String, value: &Value) {
	match value {
		Value::Array(items) => {
			for item in items {
				push_text(out, item);
			}
		}
		other => out.push_str(&escape_text(&text_of(other))),
	}
}

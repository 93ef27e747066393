//! Attribute value conversion shared by the client patcher and the static
//! renderer.

use serde_json::Value;

use crate::dom::Node;
use crate::props::SPREAD_KEY;

/// Returns the attribute text for `value`, or `None` when the attribute
/// should be absent.
///
/// `null` and `false` remove the attribute and `true` sets it empty.
/// `style` objects become declarations and `class` objects keep their truthy
/// keys. Other objects serialize as JSON.
pub fn attribute_value(name: &str, value: &Value) -> Option<String> {
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::Bool(true) => Some(String::new()),
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Object(map) if name == "style" => Some(
			map.iter()
				.filter(|(_, v)| !v.is_null())
				.map(|(k, v)| format!("{}: {}", k, plain(v)))
				.collect::<Vec<_>>()
				.join("; "),
		),
		Value::Object(map) if name == "class" => Some(
			map.iter()
				.filter(|(_, v)| truthy(v))
				.map(|(k, _)| k.as_str())
				.collect::<Vec<_>>()
				.join(" "),
		),
		Value::Array(items) if name == "class" => Some(
			items
				.iter()
				.filter(|v| truthy(v))
				.map(plain)
				.collect::<Vec<_>>()
				.join(" "),
		),
		other => Some(other.to_string()),
	}
}

/// Attributes a value expands to. Spread objects expand to one entry per
/// key; everything else is a single entry.
pub fn expand_attributes<'a>(name: &'a str, value: &'a Value) -> Vec<(&'a str, &'a Value)> {
	match value {
		Value::Object(map) if name == SPREAD_KEY => {
			map.iter().map(|(k, v)| (k.as_str(), v)).collect()
		}
		_ => vec![(name, value)],
	}
}

/// Sets or removes `name` on `node` according to `value`.
pub fn apply_attribute(node: &Node, name: &str, value: &Value) {
	if name == SPREAD_KEY && !value.is_object() {
		tracing::warn!(?value, "spread value is not an object");
		return;
	}
	for (name, value) in expand_attributes(name, value) {
		match attribute_value(name, value) {
			Some(text) => node.set_attribute(name, text),
			None => node.remove_attribute(name),
		}
	}
}

/// Value a two-way bound attribute reports back.
pub fn read_bound_value(node: &Node, name: &str) -> Value {
	match name {
		"checked" | "selected" | "disabled" => Value::Bool(node.has_attribute(name)),
		_ => node
			.get_attribute(name)
			.map(Value::String)
			.unwrap_or(Value::Null),
	}
}

/// Event a two-way bound attribute listens to.
pub fn bound_event(name: &str) -> &'static str {
	match name {
		"checked" | "selected" => "change",
		_ => "input",
	}
}

/// JavaScript-style truthiness.
pub fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		_ => true,
	}
}

fn plain(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

//! Static target.

use super::{js_string, literal_code};
use crate::html::escape_text;
use crate::options::CompilerOptions;
use crate::partition::{ComponentCall, DynamicSlot, Literal, SlotKind, SlotValue};
use crate::unit::CompiledUnit;

/// Output of the static emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticOutput {
	/// Static markup; `chunks.len() == slots.len() + 1`
	pub chunks: Vec<String>,
	/// Slots interleaved between the chunks
	pub slots: Vec<DynamicSlot>,
	/// `ssg([...chunks], "key", ...values)`
	pub code: String,
}

/// Emits static rendering code for `unit`.
///
/// Values are evaluated once on the server, so expressions are passed as
/// plain values rather than getters. Literal text is escaped here; the
/// runtime escapes everything else.
pub fn emit_static(unit: &CompiledUnit, options: &CompilerOptions) -> StaticOutput {
	StaticOutput {
		chunks: unit.chunks.clone(),
		slots: unit.slots.clone(),
		code: unit_code(unit, options),
	}
}

fn unit_code(unit: &CompiledUnit, options: &CompilerOptions) -> String {
	let chunks: Vec<String> = unit.chunks.iter().map(|c| js_string(c)).collect();
	let mut args = vec![
		format!("[{}]", chunks.join(", ")),
		js_string(&unit.hydration_key),
	];
	for slot in &unit.slots {
		let value = value_code(&slot.value, options);
		args.push(match slot.kind {
			SlotKind::Attr => format!(
				"[{}, {}]",
				js_string(slot.attr_name.as_deref().unwrap_or_default()),
				value
			),
			SlotKind::Text => match &slot.value {
				SlotValue::Literal(Literal::Str(s)) => js_string(&escape_text(s)),
				_ => value,
			},
		});
	}
	format!("{}({})", options.ssg_fn, args.join(", "))
}

fn value_code(value: &SlotValue, options: &CompilerOptions) -> String {
	match value {
		SlotValue::Literal(literal) => literal_code(literal),
		SlotValue::Expr(expr) => format!("({})", expr.source),
		SlotValue::Conditional {
			test,
			consequent,
			alternate,
		} => format!(
			"({}) ? {} : {}",
			test,
			value_code(consequent, options),
			value_code(alternate, options)
		),
		SlotValue::Setter(target) => format!("(value) => {{ {} = value; }}", target),
		SlotValue::Spread(exprs) => {
			let parts: Vec<String> = exprs.iter().map(|e| format!("...{}", e.source)).collect();
			format!("{{ {} }}", parts.join(", "))
		}
		SlotValue::List(list) => format!(
			"({}).map(({}) => {})",
			list.receiver,
			list.params,
			unit_code(&list.body, options)
		),
		SlotValue::Unit(unit) => unit_code(unit, options),
		SlotValue::Component(call) => component_code(call, options),
	}
}

fn component_code(call: &ComponentCall, options: &CompilerOptions) -> String {
	let mut props: Vec<String> = call
		.props
		.iter()
		.map(|prop| format!("{}: {}", js_string(&prop.name), value_code(&prop.value, options)))
		.collect();
	if let Some(children) = &call.children {
		props.push(format!("\"children\": {}", unit_code(children, options)));
	}
	if props.is_empty() {
		format!("{}({}, {{}})", options.component_fn, call.name)
	} else {
		format!("{}({}, {{ {} }})", options.component_fn, call.name, props.join(", "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::CompilerContext;
	use crate::options::Target;
	use crate::tree::build;
	use crate::unit::compile_tree;
	use stencil_ast::parse;

	fn emit(source: &str) -> StaticOutput {
		let options = CompilerOptions::new().target(Target::Static);
		let mut ctx = CompilerContext::new(options);
		let tree = build(&mut ctx, &parse(source).unwrap()).unwrap();
		let unit = compile_tree(&mut ctx, &tree).unwrap();
		emit_static(&unit, ctx.options())
	}

	#[test]
	fn test_chunks_and_values_interleave() {
		let out = emit(r#"<a href={url}>Hi {name}!</a>"#);
		assert_eq!(out.chunks.len(), out.slots.len() + 1);
		assert_eq!(
			out.code,
			r#"ssg(["<a data-idx=\"0-1\"", ">Hi ", "<!>!</a>"], "0", ["href", (url)], (name))"#
		);
	}

	#[test]
	fn test_nested_units_render_inline() {
		let out = emit(r#"<ul>{items.map((i) => <li>{i}</li>)}</ul>"#);
		assert_eq!(
			out.code,
			r#"ssg(["<ul data-idx=\"0-1\">", "</ul>"], "0", (items).map((i) => ssg(["<li data-idx=\"0-1\">", "</li>"], "0", (i))))"#
		);
	}

	#[test]
	fn test_component_call() {
		let out = emit(r#"<div><Badge count={n} /></div>"#);
		assert!(out.code.ends_with(r#""0", createComponent(Badge, { "count": (n) }))"#));
	}
}

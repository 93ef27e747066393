//! Client target.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use stencil_ast::ExprKind;

use super::{js_string, literal_code};
use crate::index_map::{find_index_position, index_position_or_missing};
use crate::options::CompilerOptions;
use crate::partition::{ComponentCall, SlotKind, SlotValue};
use crate::unit::CompiledUnit;

/// Output of the client emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOutput {
	/// Hoisted `const _tmpl$N = template(...)` declarations, outermost first
	pub declarations: Vec<String>,
	/// Template markup of the root unit
	pub template: String,
	/// Index map of the root unit
	pub index_map: Vec<usize>,
	/// Expression mounting the root unit
	pub code: String,
}

impl ClientOutput {
	/// Declarations followed by the mount expression as one module body.
	pub fn to_module(&self) -> String {
		let mut out = String::new();
		for declaration in &self.declarations {
			out.push_str(declaration);
			out.push('\n');
		}
		out.push_str(&self.code);
		out.push_str(";\n");
		out
	}
}

/// Emits client code for `unit` and every unit nested inside it.
pub fn emit_client(unit: &CompiledUnit, options: &CompilerOptions) -> ClientOutput {
	let mut emitter = ClientEmitter {
		options,
		declarations: Vec::new(),
	};
	let code = emitter.unit(unit);
	ClientOutput {
		declarations: emitter.declarations,
		template: unit.template.clone(),
		index_map: unit.index_map.clone(),
		code,
	}
}

fn template_var(id: usize) -> String {
	format!("_tmpl${}", id)
}

#[derive(Default)]
struct Group {
	attrs: Vec<(String, String)>,
	children: Vec<String>,
}

struct ClientEmitter<'o> {
	options: &'o CompilerOptions,
	declarations: Vec<String>,
}

impl ClientEmitter<'_> {
	fn declare(&mut self, unit: &CompiledUnit) {
		let map = unit
			.index_map
			.iter()
			.map(usize::to_string)
			.collect::<Vec<_>>()
			.join(", ");
		self.declarations.push(format!(
			"const {} = {}({}, [{}]);",
			template_var(unit.id),
			self.options.template_fn,
			js_string(&unit.template),
			map
		));
	}

	/// `render(_tmpl$N, "key", { ... })`
	fn unit(&mut self, unit: &CompiledUnit) -> String {
		self.declare(unit);

		// Positions ascend with indices, so a BTreeMap keyed by position keeps
		// the props in document order of their targets.
		let mut groups: BTreeMap<usize, Group> = BTreeMap::new();
		for slot in &unit.slots {
			let Some(pos) = find_index_position(slot.parent_index, &unit.index_map) else {
				continue;
			};
			let value = self.value(&slot.value);
			let group = groups.entry(pos).or_default();
			match slot.kind {
				SlotKind::Attr => {
					let name = slot.attr_name.clone().unwrap_or_default();
					group.attrs.push((name, value));
				}
				SlotKind::Text => {
					let before = match slot.before_index {
						Some(index) => match index_position_or_missing(index, &unit.index_map) {
							-1 => "null".to_string(),
							pos => pos.to_string(),
						},
						None => "null".to_string(),
					};
					group.children.push(format!("[{}, {}]", value, before));
				}
			}
		}

		let mut props = String::from("{");
		for (i, (pos, group)) in groups.iter().enumerate() {
			if i > 0 {
				props.push(',');
			}
			let _ = write!(props, " {}: {{", js_string(&pos.to_string()));
			let mut entries: Vec<String> = group
				.attrs
				.iter()
				.map(|(name, value)| format!(" {}: {}", js_string(name), value))
				.collect();
			if !group.children.is_empty() {
				entries.push(format!(" \"children\": [{}]", group.children.join(", ")));
			}
			props.push_str(&entries.join(","));
			props.push_str(" }");
		}
		props.push_str(if groups.is_empty() { "}" } else { " }" });

		format!(
			"{}({}, {}, {})",
			self.options.render_fn,
			template_var(unit.id),
			js_string(&unit.hydration_key),
			props
		)
	}

	/// Code passed to the runtime. Dynamic expressions become getters so the
	/// runtime can track them.
	fn value(&mut self, value: &SlotValue) -> String {
		match value {
			SlotValue::Literal(literal) => literal_code(literal),
			SlotValue::Expr(expr) => match expr.kind {
				ExprKind::Ident | ExprKind::Function => expr.source.clone(),
				_ => format!("() => ({})", expr.source),
			},
			SlotValue::Conditional { .. } => format!("() => {}", self.inline(value)),
			SlotValue::Setter(target) => format!("(value) => {{ {} = value; }}", target),
			SlotValue::Spread(exprs) => {
				let parts: Vec<String> = exprs.iter().map(|e| format!("...{}", e.source)).collect();
				format!("() => ({{ {} }})", parts.join(", "))
			}
			SlotValue::List(list) => {
				let body = self.unit(&list.body);
				format!(
					"() => ({}).map(({}) => {})",
					list.receiver, list.params, body
				)
			}
			SlotValue::Unit(unit) => self.unit(unit),
			SlotValue::Component(call) => self.component(call),
		}
	}

	/// Code evaluated inside an enclosing getter.
	fn inline(&mut self, value: &SlotValue) -> String {
		match value {
			SlotValue::Expr(expr) => format!("({})", expr.source),
			SlotValue::Conditional {
				test,
				consequent,
				alternate,
			} => format!(
				"({}) ? {} : {}",
				test,
				self.inline(consequent),
				self.inline(alternate)
			),
			other => self.value(other),
		}
	}

	fn component(&mut self, call: &ComponentCall) -> String {
		let mut props: Vec<String> = call
			.props
			.iter()
			.map(|prop| format!("{}: {}", js_string(&prop.name), self.value(&prop.value)))
			.collect();
		if let Some(children) = &call.children {
			props.push(format!("\"children\": {}", self.unit(children)));
		}
		let props = if props.is_empty() {
			"{}".to_string()
		} else {
			format!("{{ {} }}", props.join(", "))
		};
		match &call.key {
			Some(key) => {
				let key = self.inline(key);
				format!("{}({}, {}, {})", self.options.component_fn, call.name, props, key)
			}
			None => format!("{}({}, {})", self.options.component_fn, call.name, props),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::CompilerContext;
	use crate::tree::build;
	use crate::unit::compile_tree;
	use stencil_ast::parse;

	fn emit(source: &str) -> ClientOutput {
		let mut ctx = CompilerContext::default();
		let tree = build(&mut ctx, &parse(source).unwrap()).unwrap();
		let unit = compile_tree(&mut ctx, &tree).unwrap();
		emit_client(&unit, ctx.options())
	}

	#[test]
	fn test_static_unit_has_empty_props() {
		let out = emit("<p>hi</p>");
		assert_eq!(
			out.declarations,
			vec![r#"const _tmpl$1 = template("<p data-idx=\"0-1\">hi</p>", []);"#]
		);
		assert_eq!(out.code, r#"render(_tmpl$1, "0", {})"#);
	}

	#[test]
	fn test_attrs_precede_children_within_a_group() {
		let out = emit("<div class={cls} onClick={onClick}>Hello {name}!</div>");
		assert_eq!(out.index_map, vec![1, 3]);
		assert_eq!(
			out.code,
			r#"render(_tmpl$1, "0", { "0": { "class": cls, "onClick": onClick, "children": [[name, 1]] } })"#
		);
	}

	#[test]
	fn test_member_expressions_become_getters() {
		let out = emit("<b>{user.name}</b>");
		assert_eq!(
			out.code,
			r#"render(_tmpl$1, "0", { "0": { "children": [[() => (user.name), null]] } })"#
		);
	}

	#[test]
	fn test_bind_emits_setter() {
		let out = emit("<input bind:value={form.name} />");
		assert!(out.code.contains(r#""value": () => (form.name)"#));
		assert!(out.code.contains(r#""updateValue": (value) => { form.name = value; }"#));
	}

	#[test]
	fn test_list_and_component_hoist_nested_templates() {
		let out = emit(r#"<ul>{items.map((item) => <li key={item.id}>{item.name}</li>)}<Footer note="x"/></ul>"#);
		assert_eq!(out.declarations.len(), 2);
		assert!(out.declarations[1].starts_with("const _tmpl$2 = template("));
		assert!(out.code.contains(
			r#"() => (items).map((item) => render(_tmpl$2, "0", { "0": { "children": [[() => (item.name), null]] } }))"#
		));
		assert!(out.code.contains(r#"createComponent(Footer, { "note": "x" })"#));
	}

	#[test]
	fn test_conditional_inlines_branches() {
		let out = emit("<p>{ok ? label : 'none'}</p>");
		assert!(out.code.contains(r#"() => (ok) ? (label) : "none""#));
	}

	#[test]
	fn test_module_output() {
		let out = emit("<p>{x}</p>");
		let module = out.to_module();
		assert!(module.starts_with("const _tmpl$1"));
		assert!(module.ends_with("render(_tmpl$1, \"0\", { \"0\": { \"children\": [[x, null]] } });\n"));
	}
}

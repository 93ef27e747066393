//! Mounted markup agrees with the compiled chunks for generated trees.

use std::collections::HashMap;

use proptest::prelude::*;
use stencil::compiler::{SlotKind, SlotValue};
use stencil::prelude::*;

const TAGS: &[&str] = &["div", "span", "p", "b", "em"];

#[derive(Debug, Clone)]
enum Shape {
	Text(String),
	/// Bound expression and the string it resolves to
	Value(String),
	Element(&'static str, Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
	let leaf = prop_oneof![
		"[a-z]{1,6}".prop_map(Shape::Text),
		"[a-z]{1,5}".prop_map(Shape::Value),
	];
	leaf.prop_recursive(3, 24, 4, |inner| {
		(prop::sample::select(TAGS), prop::collection::vec(inner, 0..4))
			.prop_map(|(tag, children)| Shape::Element(tag, children))
	})
}

/// Writes `shape` as JSX, naming each bound value `v0`, `v1`, ...
fn write_source(shape: &Shape, out: &mut String, values: &mut HashMap<String, String>) {
	match shape {
		Shape::Text(text) => out.push_str(text),
		Shape::Value(value) => {
			let name = format!("v{}", values.len());
			out.push_str(&format!("{{{name}}}"));
			values.insert(name, value.clone());
		}
		Shape::Element(tag, children) => {
			out.push_str(&format!("<{tag}>"));
			for child in children {
				write_source(child, out, values);
			}
			out.push_str(&format!("</{tag}>"));
		}
	}
}

/// Static chunks with every slot replaced by the value it resolves to.
fn interleave(unit: &CompiledUnit, values: &HashMap<String, String>) -> String {
	let mut out = String::new();
	for (i, chunk) in unit.chunks.iter().enumerate() {
		out.push_str(chunk);
		if let Some(slot) = unit.slots.get(i) {
			assert_eq!(slot.kind, SlotKind::Text);
			let SlotValue::Expr(expr) = &slot.value else {
				panic!("unexpected slot value {:?}", slot.value);
			};
			out.push_str(&values[&expr.source]);
		}
	}
	out
}

proptest! {
	/// Property: mounting yields the chunks joined by the bound values
	#[test]
	fn test_mounted_markup_matches_chunks(children in prop::collection::vec(shape(), 0..4)) {
		let root_shape = Shape::Element("div", children);
		let mut source = String::new();
		let mut values = HashMap::new();
		write_source(&root_shape, &mut source, &mut values);

		let unit = compile(&source, &CompilerOptions::default()).unwrap();
		prop_assert_eq!(unit.chunks.len(), unit.slots.len() + 1);
		let expected = interleave(&unit, &values);

		let bindings = values
			.iter()
			.fold(Bindings::new(), |b, (name, value)| b.value(name.as_str(), value.as_str()));
		let root = Node::element("main");
		let node = instantiate(&unit, &bindings).unwrap();
		node.mount(&root, None).unwrap();

		prop_assert_eq!(root.inner_html(), expected);
		node.unmount();
	}
}

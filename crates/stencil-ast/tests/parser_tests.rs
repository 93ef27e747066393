//! Integration tests for the JSX parser
//!
//! These tests cover realistic component markup end to end:
//! 1. Nested elements, attributes and expression children
//! 2. Expressions containing JSX (conditionals, `.map` callbacks)
//! 3. Error positions for malformed input

use proptest::prelude::*;
use rstest::rstest;
use stencil_ast::{
	ExprKind, JsxAttrName, JsxAttrValue, JsxAttribute, JsxElement, JsxName, JsxNode, JsxText,
	normalize_jsx_text, parse,
};

fn root_element(source: &str) -> JsxElement {
	match parse(source).unwrap() {
		JsxNode::Element(el) => el,
		other => panic!("expected element root, got {:?}", other),
	}
}

fn text(value: &str) -> JsxNode {
	JsxNode::Text(JsxText {
		value: value.to_string(),
	})
}

#[test]
fn test_todo_list_markup() {
	let source = r#"
		<section class="todos">
			<h1>Todos ({items.length})</h1>
			<input bind:value={draft} placeholder="What next?" />
			<ul>
				{items.map((item) => <li key={item.id} onClick={() => toggle(item)}>{item.title}</li>)}
			</ul>
			{items.length === 0 ? <p>Nothing to do</p> : null}
		</section>
	"#;

	let section = root_element(source);
	assert_eq!(section.name, JsxName::Ident("section".into()));
	assert_eq!(section.children.len(), 4);

	let JsxNode::Element(h1) = &section.children[0] else {
		panic!("expected h1");
	};
	assert_eq!(h1.children[0], text("Todos ("));
	assert!(matches!(&h1.children[1], JsxNode::Expression(e) if e.expr.as_ref().unwrap().kind == ExprKind::Member));
	assert_eq!(h1.children[2], text(")"));

	let JsxNode::Element(input) = &section.children[1] else {
		panic!("expected input");
	};
	assert!(input.self_closing);
	assert!(matches!(
		&input.attributes[0],
		JsxAttribute::Named { name: JsxAttrName::Namespaced { namespace, .. }, .. } if namespace == "bind"
	));

	let JsxNode::Element(ul) = &section.children[2] else {
		panic!("expected ul");
	};
	let JsxNode::Expression(list) = &ul.children[0] else {
		panic!("expected list expression");
	};
	let ExprKind::Map(call) = &list.expr.as_ref().unwrap().kind else {
		panic!("expected map call");
	};
	assert_eq!(call.receiver, "items");
	assert_eq!(call.params, "item");

	let JsxNode::Expression(cond) = &section.children[3] else {
		panic!("expected conditional");
	};
	let ExprKind::Conditional {
		test,
		consequent,
		alternate,
	} = &cond.expr.as_ref().unwrap().kind
	else {
		panic!("expected conditional kind");
	};
	assert_eq!(test, "items.length === 0");
	assert!(matches!(consequent.kind, ExprKind::Jsx(_)));
	assert_eq!(alternate.kind, ExprKind::Nullish);
}

#[test]
fn test_braces_inside_strings_and_templates() {
	let el = root_element("<p title={`a {b} ${c}`}>{'}'}{\"{\"}</p>");
	let JsxAttribute::Named {
		value: Some(JsxAttrValue::Expression(expr)),
		..
	} = &el.attributes[0]
	else {
		panic!("expected expression attribute");
	};
	assert_eq!(expr.expr.as_ref().unwrap().source, "`a {b} ${c}`");
	assert!(matches!(
		&el.children[0],
		JsxNode::Expression(e) if e.expr.as_ref().unwrap().kind == ExprKind::StringLit("}".into())
	));
}

#[test]
fn test_svg_namespaced_elements() {
	let el = root_element(r##"<svg viewBox="0 0 10 10"><svg:rect xlink:href="#a" /></svg>"##);
	let JsxNode::Element(rect) = &el.children[0] else {
		panic!("expected rect");
	};
	assert_eq!(
		rect.name,
		JsxName::Namespaced {
			namespace: "svg".into(),
			name: "rect".into()
		}
	);
}

#[rstest]
#[case("<div>", 1, "expected closing tag </div>")]
#[case("<div><p></div>", 1, "mismatched closing tag")]
#[case("<>\n<a></a>", 2, "expected closing fragment")]
#[case("<div class=></div>", 1, "invalid value for attribute `class`")]
#[case("<div {rest}></div>", 1, "expected a spread attribute")]
fn test_parse_errors(#[case] source: &str, #[case] line: usize, #[case] message: &str) {
	let err = parse(source).unwrap_err();
	assert_eq!(err.line, line, "{}", err);
	assert!(err.message.contains(message), "{}", err);
}

proptest! {
	/// Property: normalized text never contains a line break
	#[test]
	fn prop_normalized_text_is_single_line(raw in "[a-z \t\n]{0,40}") {
		if let Some(value) = normalize_jsx_text(&raw) {
			prop_assert!(!value.contains('\n'));
			prop_assert!(!value.is_empty());
		}
	}

	/// Property: nested elements parse back to the same depth
	#[test]
	fn prop_nested_depth_preserved(depth in 1usize..40) {
		let source = format!("{}x{}", "<b>".repeat(depth), "</b>".repeat(depth));
		let mut node = parse(&source).unwrap();
		let mut seen = 0;
		while let JsxNode::Element(el) = node {
			seen += 1;
			node = el.children.into_iter().next().unwrap();
		}
		prop_assert_eq!(seen, depth);
		prop_assert_eq!(node, text("x"));
	}
}

//! Source to DOM and markup through the facade crate.

use rstest::rstest;
use serde_json::{Value, json};
use serial_test::serial;
use stencil::prelude::*;
use stencil::runtime::html::parse_html;
use stencil::runtime::{ChildSlot, IndexProps, Template, TemplateNode};

fn options() -> CompilerOptions {
	CompilerOptions::default()
}

#[test]
#[serial(reactive)]
fn test_text_signal_patches_in_place() {
	let name = Signal::new(json!("Bob"));
	let bindings = Bindings::new().signal("name", name.clone());
	let root = Node::element("main");
	stencil::mount("<div>Hello {name}!</div>", &options(), &bindings, &root).unwrap();

	let div = root.first_child().unwrap();
	let before = div.children();
	assert_eq!(root.inner_html(), r#"<div data-idx="0-1">Hello Bob<!>!</div>"#);

	name.set(json!("Ann"));
	assert_eq!(div.text_content(), "Hello Ann!");
	let after = div.children();
	assert_eq!(before.len(), after.len());
	assert!(before[0].ptr_eq(&after[0]));
	assert!(before[2].ptr_eq(&after[2]));
}

#[test]
#[serial(reactive)]
fn test_dropped_mount_handle_keeps_updating() {
	let name = Signal::new(json!("Bob"));
	let bindings = Bindings::new().signal("name", name.clone());
	let root = Node::element("main");
	drop(stencil::mount("<div>Hello {name}!</div>", &options(), &bindings, &root).unwrap());

	name.set(json!("Ann"));
	assert_eq!(root.text_content(), "Hello Ann!");
}

#[test]
#[serial(reactive)]
fn test_two_way_binding_writes_back() {
	let text = Signal::new(json!("hi"));
	let bindings = Bindings::new().signal("text", text.clone());
	let root = Node::element("form");
	stencil::mount("<input bind:value={text} />", &options(), &bindings, &root).unwrap();

	let input = root.first_child().unwrap();
	assert_eq!(input.get_attribute("value").as_deref(), Some("hi"));

	input.set_attribute("value", "typed");
	input.dispatch_event("input");
	assert_eq!(text.get_untracked(), json!("typed"));

	text.set(json!("reset"));
	assert_eq!(input.get_attribute("value").as_deref(), Some("reset"));
}

#[test]
#[serial(reactive)]
fn test_conditional_switches_branches() {
	let ok = Signal::new(json!(true));
	let bindings = Bindings::new().signal("ok", ok.clone());
	let root = Node::element("main");
	stencil::mount("<div>{ok ? <b>yes</b> : 'no'}</div>", &options(), &bindings, &root).unwrap();
	assert_eq!(root.text_content(), "yes");

	ok.set(json!(false));
	assert_eq!(root.text_content(), "no");

	ok.set(json!(1));
	assert_eq!(root.text_content(), "yes");
}

#[test]
#[serial(reactive)]
fn test_attribute_conditional_and_handler() {
	let active = Signal::new(json!(false));
	let a = active.clone();
	let bindings = Bindings::new()
		.signal("active", active.clone())
		.handler("toggle", move |_: &Event| a.update(|v| *v = json!(!v.as_bool().unwrap_or(false))));
	let root = Node::element("main");
	stencil::mount(
		r#"<button className={active ? "on" : "off"} onClick={toggle}>x</button>"#,
		&options(),
		&bindings,
		&root,
	)
	.unwrap();

	let button = root.first_child().unwrap();
	assert_eq!(button.get_attribute("class").as_deref(), Some("off"));
	button.dispatch_event("click");
	assert_eq!(active.get_untracked(), json!(true));
	assert_eq!(button.get_attribute("class").as_deref(), Some("on"));
}

fn rows(items: &Signal<Value>) -> impl Fn() -> Vec<Bindings> + 'static {
	let items = items.clone();
	move || {
		let Value::Array(rows) = items.get() else {
			return Vec::new();
		};
		rows.iter()
			.map(|row| {
				Bindings::new()
					.value("item.id", row["id"].clone())
					.value("item.label", row["label"].clone())
			})
			.collect()
	}
}

#[test]
#[serial(reactive)]
fn test_keyed_list_keeps_rows() {
	let items = Signal::new(json!([
		{"id": 1, "label": "a"},
		{"id": 2, "label": "b"},
		{"id": 3, "label": "c"},
	]));
	let bindings = Bindings::new().list("items", rows(&items));
	let root = Node::element("main");
	stencil::mount(
		"<ul>{items.map((item) => <li key={item.id}>{item.label}</li>)}</ul>",
		&options(),
		&bindings,
		&root,
	)
	.unwrap();

	let ul = root.first_child().unwrap();
	assert_eq!(ul.text_content(), "abc");
	let before = ul.children();

	items.set(json!([
		{"id": 3, "label": "c"},
		{"id": 1, "label": "a"},
		{"id": 4, "label": "d"},
	]));
	assert_eq!(ul.text_content(), "cad");
	let after = ul.children();
	assert!(after[0].ptr_eq(&before[2]));
	assert!(after[1].ptr_eq(&before[0]));
	assert!(!before[1].is_connected());
}

fn card() -> Component {
	Component::new("Card", |scope| {
		let title = scope.prop("title");
		let mut head = PropBag::new();
		head.push_children(ChildSlot {
			content: Children::reactive(move || {
				vec![title.as_ref().map(|t| t.get()).unwrap_or_default().into()]
			}),
			before: None,
		});
		let mut body = PropBag::new();
		body.push_children(ChildSlot {
			content: scope.children(),
			before: None,
		});
		let props: IndexProps = [(2, head), (3, body)].into_iter().collect();
		let template = Template::new("<section><h2></h2><div></div></section>")?;
		Ok(TemplateNode::new(template, props, None).into())
	})
}

#[test]
#[serial(reactive)]
fn test_component_receives_props_and_children() {
	let heading = Signal::new(json!("Cards"));
	let bindings = Bindings::new()
		.component(card())
		.signal("heading", heading.clone());
	let root = Node::element("main");
	stencil::mount(
		"<div><Card title={heading}><b>inside</b></Card></div>",
		&options(),
		&bindings,
		&root,
	)
	.unwrap();
	assert_eq!(root.text_content(), "Cardsinside");

	heading.set(json!("Deck"));
	assert_eq!(root.text_content(), "Deckinside");
}

#[test]
#[serial(reactive)]
fn test_server_markup_hydrates() {
	let source = r#"<div class="greet">Hello {name}!</div>"#;
	let name = Signal::new(json!("Bob"));
	let bindings = Bindings::new().signal("name", name.clone());

	let html = stencil::render_to_html(source, &options(), &bindings).unwrap();
	assert!(html.contains("<!--t-0-1-->Bob<!$>"), "{}", html);

	let container = Node::element("main");
	for node in parse_html(&html).unwrap() {
		container.append_child(&node);
	}
	let server_div = container.first_child().unwrap();

	stencil::hydrate(source, &options(), &bindings, &container).unwrap();
	assert!(container.first_child().unwrap().ptr_eq(&server_div));
	assert_eq!(server_div.text_content(), "Hello Bob!");

	name.set(json!("Ann"));
	assert_eq!(server_div.text_content(), "Hello Ann!");
}

#[test]
#[serial(reactive)]
fn test_list_renders_to_markup_region() {
	let items = Signal::new(json!([{"id": 1, "label": "a"}, {"id": 2, "label": "b"}]));
	let bindings = Bindings::new().list("items", rows(&items));
	let html = stencil::render_to_html(
		"<ul>{items.map((item) => <li key={item.id}>{item.label}</li>)}</ul>",
		&options(),
		&bindings,
	)
	.unwrap();
	assert!(html.contains("<!--c-0-1-->"), "{}", html);
	assert!(html.contains(">a</li>"), "{}", html);
	assert!(html.contains(">b</li>"), "{}", html);
}

#[test]
#[serial(reactive)]
fn test_spread_keeps_source_order() {
	let bindings = Bindings::new().value("a", json!({"id": "x", "hidden": true, "class": {"b": true, "a": true}}));
	let html = stencil::render_to_html("<a {...a}></a>", &options(), &bindings).unwrap();
	assert_eq!(html, r#"<a data-idx="0-1" id="x" hidden class="b a"></a>"#);
}

#[rstest]
#[case(r#"<p title="a & b">x</p>"#, r#"<p title="a &amp; b" data-idx="0-1">x</p>"#)]
#[case("<input disabled />", r#"<input disabled data-idx="0-1"/>"#)]
fn test_static_sources_render_verbatim(#[case] source: &str, #[case] expected: &str) {
	let html = stencil::render_to_html(source, &options(), &Bindings::new()).unwrap();
	assert_eq!(html, expected);
}

#[test]
fn test_unbound_expression_is_reported() {
	let root = Node::element("main");
	let err = stencil::mount("<p>{missing}</p>", &options(), &Bindings::new(), &root).unwrap_err();
	assert!(matches!(err, stencil::Error::Link(LinkError::Unbound(ref name)) if name == "missing"));
	assert_eq!(root.child_count(), 0);
}

#[test]
fn test_syntax_errors_come_from_the_compiler() {
	let root = Node::element("main");
	let err = stencil::mount("<div>", &options(), &Bindings::new(), &root).unwrap_err();
	assert!(matches!(err, stencil::Error::Compile(_)));
}

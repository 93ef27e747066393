//! Template markup parsing and HTML escaping.
//!
//! Compiled templates use a small subset of HTML: elements with quoted
//! attributes, text, comments, and the two compact markers `<!>` (slot
//! anchor) and `<!$>` (end of a server-rendered region). Server output adds
//! `<!--t-KEY-INDEX-->` region starts, which parse as ordinary comments.

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_till, take_till1, take_until, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::opt,
	multi::many0,
	sequence::{delimited, preceded},
};

use crate::dom::Node;
use crate::error::{Result, RuntimeError};

static VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

/// Returns true for elements that never have children.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

/// Escapes text content.
pub fn escape_text(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
	out
}

/// Escapes a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Decodes the entities produced by [`escape_text`] and [`escape_attr`].
pub fn unescape(s: &str) -> String {
	if !s.contains('&') {
		return s.to_string();
	}
	s.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&amp;", "&")
}

type PResult<'a, T> = IResult<&'a str, T>;

/// Parses markup into a list of detached top-level nodes.
pub fn parse_html(html: &str) -> Result<Vec<Node>> {
	match nodes(html) {
		Ok(("", nodes)) => Ok(nodes),
		Ok((rest, _)) => Err(parse_error(rest, "unexpected closing tag")),
		Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
			Err(parse_error(e.input, e.code.description()))
		}
		Err(nom::Err::Incomplete(_)) => Err(parse_error("", "incomplete input")),
	}
}

/// Parses `html` and appends the result to `parent`.
pub fn parse_into(parent: &Node, html: &str) -> Result<()> {
	for node in parse_html(html)? {
		parent.append_child(&node);
	}
	Ok(())
}

fn parse_error(rest: &str, message: &str) -> RuntimeError {
	let snippet: String = rest.chars().take(24).collect();
	RuntimeError::TemplateParse {
		message: format!("{} near `{}`", message, snippet),
	}
}

fn nodes(mut input: &str) -> PResult<'_, Vec<Node>> {
	let mut out = Vec::new();
	while !input.is_empty() && !input.starts_with("</") {
		let (rest, node) = node(input)?;
		out.push(node);
		input = rest;
	}
	Ok((input, out))
}

fn node(input: &str) -> PResult<'_, Node> {
	if input.starts_with("<!") {
		comment(input)
	} else if input.starts_with('<') {
		element(input)
	} else {
		text(input)
	}
}

fn comment(input: &str) -> PResult<'_, Node> {
	if let Some(rest) = input.strip_prefix("<!>") {
		return Ok((rest, Node::comment("")));
	}
	if let Some(rest) = input.strip_prefix("<!$>") {
		return Ok((rest, Node::comment("$")));
	}
	let (rest, data) = comment_body(input)?;
	Ok((rest, Node::comment(data)))
}

fn comment_body(input: &str) -> PResult<'_, &str> {
	delimited(tag("<!--"), take_until("-->"), tag("-->")).parse(input)
}

fn text(input: &str) -> PResult<'_, Node> {
	let (rest, raw) = text_run(input)?;
	Ok((rest, Node::text(unescape(raw))))
}

fn text_run(input: &str) -> PResult<'_, &str> {
	take_till1(|c| c == '<').parse(input)
}

fn tag_name(input: &str) -> PResult<'_, &str> {
	take_while1(|c: char| c.is_alphanumeric() || matches!(c, '-' | ':' | '_' | '.')).parse(input)
}

fn attr_name(input: &str) -> PResult<'_, &str> {
	take_while1(|c: char| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\''))
		.parse(input)
}

fn quoted(input: &str) -> PResult<'_, &str> {
	alt((
		delimited(char('"'), take_till(|c| c == '"'), char('"')),
		delimited(char('\''), take_till(|c| c == '\''), char('\'')),
	))
	.parse(input)
}

fn ws0(input: &str) -> PResult<'_, &str> {
	multispace0(input)
}

fn ws1(input: &str) -> PResult<'_, &str> {
	multispace1(input)
}

fn attribute(input: &str) -> PResult<'_, (String, String)> {
	let (input, _) = ws1(input)?;
	let (input, name) = attr_name(input)?;
	let (input, value) = opt(preceded(char('='), quoted)).parse(input)?;
	Ok((
		input,
		(name.to_string(), value.map(unescape).unwrap_or_default()),
	))
}

fn element(input: &str) -> PResult<'_, Node> {
	let (input, _) = open_angle(input)?;
	let (input, name) = tag_name(input)?;
	let (input, attrs) = many0(attribute).parse(input)?;
	let (input, _) = ws0(input)?;

	let element = Node::element(name);
	for (attr, value) in attrs {
		element.set_attribute(&attr, value);
	}

	if let Some(rest) = input.strip_prefix("/>") {
		return Ok((rest, element));
	}
	let Some(input) = input.strip_prefix('>') else {
		return Err(nom::Err::Failure(nom::error::Error::new(
			input,
			nom::error::ErrorKind::Char,
		)));
	};
	if is_void_element(name) {
		return Ok((input, element));
	}

	let (input, children) = nodes(input)?;
	for child in &children {
		element.append_child(child);
	}

	let closing = format!("</{}", name);
	let Some(input) = input.strip_prefix(closing.as_str()) else {
		return Err(nom::Err::Failure(nom::error::Error::new(
			input,
			nom::error::ErrorKind::Tag,
		)));
	};
	let (input, _) = ws0(input)?;
	let Some(input) = input.strip_prefix('>') else {
		return Err(nom::Err::Failure(nom::error::Error::new(
			input,
			nom::error::ErrorKind::Char,
		)));
	};
	Ok((input, element))
}

fn open_angle(input: &str) -> PResult<'_, char> {
	char('<').parse(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn roundtrip(html: &str) -> String {
		parse_html(html)
			.unwrap()
			.iter()
			.map(Node::outer_html)
			.collect()
	}

	#[rstest]
	#[case(r#"<div data-idx="0-1">Hello<span data-idx="0-3">World</span></div>"#)]
	#[case(r#"<img src="pic.jpg" data-idx="0-1"/>"#)]
	#[case(r#"<p data-idx="0-1">x <!> z</p>"#)]
	#[case(r#"<h1 data-idx="0-1">Title</h1><!>"#)]
	#[case(r#"<input type="checkbox" checked data-idx="0-1"/>"#)]
	#[case("<!--t-0-1-->a &lt; b<!$>")]
	fn test_roundtrip(#[case] html: &str) {
		assert_eq!(roundtrip(html), html);
	}

	#[test]
	fn test_structure() {
		let nodes = parse_html(r#"<ul class="a"><li>1</li><li>2</li></ul>tail"#).unwrap();
		assert_eq!(nodes.len(), 2);
		assert_eq!(nodes[0].get_attribute("class").as_deref(), Some("a"));
		assert_eq!(nodes[0].child_count(), 2);
		assert!(nodes[1].is_text());
		assert_eq!(nodes[0].text_content(), "12");
	}

	#[test]
	fn test_entities_are_decoded() {
		let nodes = parse_html(r#"<a title="&quot;x&quot; &amp; y">&lt;b&gt;</a>"#).unwrap();
		assert_eq!(nodes[0].get_attribute("title").as_deref(), Some("\"x\" & y"));
		assert_eq!(nodes[0].text_content(), "<b>");
	}

	#[test]
	fn test_whitespace_text_is_kept() {
		let nodes = parse_html("<p><!> <!></p>").unwrap();
		assert_eq!(nodes[0].child_count(), 3);
	}

	#[rstest]
	#[case("<div>")]
	#[case("<div></span>")]
	#[case("</div>")]
	#[case("<div class=\"x></div>")]
	fn test_errors(#[case] html: &str) {
		assert!(matches!(
			parse_html(html),
			Err(RuntimeError::TemplateParse { .. })
		));
	}

	#[test]
	fn test_escape_round_trip() {
		let raw = r#"<a href="x">&"#;
		assert_eq!(unescape(&escape_attr(raw)), raw);
		assert_eq!(unescape(&escape_text(raw)), raw);
	}
}

//! Parser for JSX literals.
//!
//! ## Parsing Strategy
//!
//! The markup side of JSX (tags, attributes, text) is parsed with `nom`
//! combinators. Embedded JavaScript is never parsed: expression containers
//! are delimited with [`crate::scan`], kept as source text, and classified
//! by [`crate::expr::classify`].
//!
//! Errors raised after a tag name has been read are committed
//! (`nom::Err::Failure`) so that a malformed element reports its own
//! problem instead of an unrelated alternative.

use std::borrow::Cow;

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_till, take_till1, take_while1},
	character::complete::{char, multispace0},
	combinator::opt,
	error::{ErrorKind, ParseError as NomParseError},
	multi::many0,
	sequence::{delimited, preceded},
};

use crate::expr::classify;
use crate::node::{
	JsxAttrName, JsxAttrValue, JsxAttribute, JsxElement, JsxExpression, JsxFragment, JsxName,
	JsxNode, JsxText,
};
use crate::scan::{find_closing_brace, is_blank};
use crate::text::normalize_jsx_text;

/// Maximum element nesting depth accepted by the parser.
const MAX_NESTING_DEPTH: usize = 256;

/// Error produced when JSX source cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
	/// Human readable description.
	pub message: String,
	/// Byte offset into the source.
	pub offset: usize,
	/// 1-based line number.
	pub line: usize,
	/// 1-based column number (in characters).
	pub column: usize,
}

impl ParseError {
	fn at(source: &str, remaining: &str, message: impl Into<String>) -> Self {
		let offset = source.len().saturating_sub(remaining.len());
		let before = &source[..offset];
		let line = before.matches('\n').count() + 1;
		let column = before
			.rsplit('\n')
			.next()
			.map_or(0, |tail| tail.chars().count())
			+ 1;
		Self {
			message: message.into(),
			offset,
			line,
			column,
		}
	}
}

/// Internal nom error carrying a message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError<'a> {
	input: &'a str,
	message: Cow<'static, str>,
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
	fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
		Self {
			input,
			message: Cow::Owned(format!("unexpected input ({})", kind.description())),
		}
	}

	fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
		other
	}
}

type PResult<'a, T> = IResult<&'a str, T, SyntaxError<'a>>;

fn ws(input: &str) -> PResult<'_, &str> {
	multispace0(input)
}

fn expect<'a>(input: &'a str, literal: &'static str) -> PResult<'a, &'a str> {
	tag(literal).parse(input)
}

fn fail<'a, T>(input: &'a str, message: impl Into<Cow<'static, str>>) -> PResult<'a, T> {
	Err(nom::Err::Failure(SyntaxError {
		input,
		message: message.into(),
	}))
}

/// Parses a complete JSX literal (one element or fragment).
///
/// # Example
///
/// ```
/// use stencil_ast::{JsxNode, parse};
///
/// let node = parse(r#"<div class="greeting">Hello {name}!</div>"#).unwrap();
/// assert!(matches!(node, JsxNode::Element(_)));
/// ```
pub fn parse(source: &str) -> Result<JsxNode, ParseError> {
	let trimmed = source.trim_start();
	if !trimmed.starts_with('<') {
		return Err(ParseError::at(source, trimmed, "expected a JSX element or fragment"));
	}

	match parse_node(trimmed, MAX_NESTING_DEPTH) {
		Ok((rest, node)) if rest.trim().is_empty() => Ok(node),
		Ok((rest, _)) => Err(ParseError::at(
			source,
			rest,
			"unexpected input after the JSX root",
		)),
		Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
			Err(ParseError::at(source, e.input, e.message))
		}
		Err(nom::Err::Incomplete(_)) => Err(ParseError::at(source, "", "unexpected end of input")),
	}
}

/// Parses an element or fragment at the start of `input`.
pub(crate) fn node_literal(input: &str) -> PResult<'_, JsxNode> {
	parse_node(input, MAX_NESTING_DEPTH)
}

fn parse_node(input: &str, depth: usize) -> PResult<'_, JsxNode> {
	if depth == 0 {
		return fail(input, "JSX nesting depth exceeded maximum limit");
	}
	if input.starts_with("<>") {
		fragment(input, depth)
	} else {
		element(input, depth)
	}
}

fn name_part(input: &str) -> PResult<'_, &str> {
	take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '$' | '-')).parse(input)
}

fn element_name(input: &str) -> PResult<'_, JsxName> {
	let (rest, first) = name_part(input)?;

	if let (rest, Some(name)) = opt(preceded(char(':'), name_part)).parse(rest)? {
		return Ok((
			rest,
			JsxName::Namespaced {
				namespace: first.to_string(),
				name: name.to_string(),
			},
		));
	}

	let (rest, members) = many0(preceded(char('.'), name_part)).parse(rest)?;
	if members.is_empty() {
		return Ok((rest, JsxName::Ident(first.to_string())));
	}
	let parts = std::iter::once(first)
		.chain(members)
		.map(str::to_string)
		.collect();
	Ok((rest, JsxName::Member(parts)))
}

fn attr_name(input: &str) -> PResult<'_, JsxAttrName> {
	let (rest, first) = name_part(input)?;
	let (rest, second) = opt(preceded(char(':'), name_part)).parse(rest)?;
	let name = match second {
		Some(name) => JsxAttrName::Namespaced {
			namespace: first.to_string(),
			name: name.to_string(),
		},
		None => JsxAttrName::Ident(first.to_string()),
	};
	Ok((rest, name))
}

fn string_literal(input: &str) -> PResult<'_, &str> {
	alt((
		delimited(char('"'), take_till(|c| c == '"'), char('"')),
		delimited(char('\''), take_till(|c| c == '\''), char('\'')),
	))
	.parse(input)
}

/// Reads `{ ... }` and returns the inner source.
fn expression_container(input: &str) -> PResult<'_, &str> {
	expect(input, "{")?;
	match find_closing_brace(input, 0) {
		Ok(close) => Ok((&input[close + 1..], &input[1..close])),
		Err(err) => fail(&input[err.offset..], "unterminated expression container"),
	}
}

fn expression(inner: &str) -> JsxExpression {
	if is_blank(inner) {
		JsxExpression { expr: None }
	} else {
		JsxExpression {
			expr: Some(classify(inner)),
		}
	}
}

fn attribute(input: &str, depth: usize) -> PResult<'_, JsxAttribute> {
	if input.starts_with('{') {
		let (rest, inner) = expression_container(input)?;
		return match inner.trim().strip_prefix("...") {
			Some(spread) => Ok((rest, JsxAttribute::Spread(classify(spread)))),
			None => fail(input, "expected a spread attribute `{...expr}`"),
		};
	}

	let (rest, name) = attr_name(input)?;
	let (after_ws, _) = ws(rest)?;
	let Some(value_input) = after_ws.strip_prefix('=') else {
		return Ok((rest, JsxAttribute::Named { name, value: None }));
	};
	let (value_input, _) = ws(value_input)?;
	match attr_value(value_input, depth) {
		Ok((rest, value)) => Ok((
			rest,
			JsxAttribute::Named {
				name,
				value: Some(value),
			},
		)),
		Err(nom::Err::Error(_)) => fail(value_input, format!("invalid value for attribute `{}`", name)),
		Err(err) => Err(err),
	}
}

fn attr_value(input: &str, depth: usize) -> PResult<'_, JsxAttrValue> {
	if input.starts_with('{') {
		let (rest, inner) = expression_container(input)?;
		return Ok((rest, JsxAttrValue::Expression(expression(inner))));
	}
	if input.starts_with('<') {
		let (rest, node) = parse_node(input, depth - 1)?;
		return Ok((rest, JsxAttrValue::Element(Box::new(node))));
	}
	let (rest, value) = string_literal(input)?;
	Ok((rest, JsxAttrValue::Str(value.to_string())))
}

fn closing_tag(input: &str) -> PResult<'_, Option<JsxName>> {
	delimited(
		(tag("</"), multispace0),
		opt(element_name),
		(multispace0, char('>')),
	)
	.parse(input)
}

fn element(input: &str, depth: usize) -> PResult<'_, JsxNode> {
	let (rest, _) = expect(input, "<")?;
	let (rest, _) = ws(rest)?;
	let (mut rest, name) = element_name(rest)?;

	let mut attributes = Vec::new();
	loop {
		let (after_ws, _) = ws(rest)?;
		rest = after_ws;
		if let Some(after) = rest.strip_prefix("/>") {
			return Ok((
				after,
				JsxNode::Element(JsxElement {
					name,
					attributes,
					children: Vec::new(),
					self_closing: true,
				}),
			));
		}
		if let Some(after) = rest.strip_prefix('>') {
			rest = after;
			break;
		}
		if rest.is_empty() {
			return fail(rest, format!("unterminated opening tag <{}>", name));
		}
		match attribute(rest, depth) {
			Ok((after, attr)) => {
				attributes.push(attr);
				rest = after;
			}
			Err(nom::Err::Error(_)) => {
				return fail(rest, format!("invalid attribute in <{}>", name));
			}
			Err(err) => return Err(err),
		}
	}

	let (rest, children) = children(rest, depth)?;
	let (rest, closing) = match closing_tag(rest) {
		Ok(ok) => ok,
		Err(nom::Err::Error(_)) => {
			return fail(rest, format!("expected closing tag </{}>", name));
		}
		Err(err) => return Err(err),
	};
	if closing.as_ref() != Some(&name) {
		return fail(
			rest,
			format!(
				"mismatched closing tag: expected </{}>, found </{}>",
				name,
				closing.map(|n| n.to_string()).unwrap_or_default()
			),
		);
	}

	Ok((
		rest,
		JsxNode::Element(JsxElement {
			name,
			attributes,
			children,
			self_closing: false,
		}),
	))
}

fn fragment(input: &str, depth: usize) -> PResult<'_, JsxNode> {
	let (rest, _) = expect(input, "<>")?;
	let (rest, children) = children(rest, depth)?;
	match closing_tag(rest) {
		Ok((rest, None)) => Ok((rest, JsxNode::Fragment(JsxFragment { children }))),
		Ok((_, Some(name))) => fail(
			rest,
			format!("mismatched closing tag: expected </>, found </{}>", name),
		),
		Err(nom::Err::Error(_)) => fail(rest, "expected closing fragment </>"),
		Err(err) => Err(err),
	}
}

fn children(mut input: &str, depth: usize) -> PResult<'_, Vec<JsxNode>> {
	let mut out = Vec::new();
	loop {
		if input.is_empty() || input.starts_with("</") {
			return Ok((input, out));
		}

		if input.starts_with('{') {
			let (rest, inner) = expression_container(input)?;
			match inner.trim().strip_prefix("...") {
				Some(spread) => out.push(JsxNode::SpreadChild(classify(spread))),
				None => out.push(JsxNode::Expression(expression(inner))),
			}
			input = rest;
			continue;
		}

		if input.starts_with('<') {
			let (rest, node) = parse_node(input, depth - 1)?;
			out.push(node);
			input = rest;
			continue;
		}

		let (rest, raw): (&str, &str) = take_till1::<_, _, SyntaxError<'_>>(|c| c == '<' || c == '{')
			.parse(input)?;
		if let Some(value) = normalize_jsx_text(raw) {
			out.push(JsxNode::Text(JsxText { value }));
		}
		input = rest;
	}
}

//! Classification of embedded expressions.

use crate::node::{Expr, ExprKind, JsxNode, MapCall};
use crate::parser::node_literal;
use crate::scan::{find_matching, top_level_chars};

/// Classifies an expression source into an [`Expr`].
pub fn classify(source: &str) -> Expr {
	let source = source.trim();
	Expr {
		source: source.to_string(),
		kind: classify_kind(source),
	}
}

fn classify_kind(source: &str) -> ExprKind {
	let inner = strip_parens(source);

	if let Some(kind) = literal_kind(inner) {
		return kind;
	}
	if let Some(node) = parse_whole_jsx(inner) {
		return ExprKind::Jsx(Box::new(node));
	}

	let top = top_level_chars(inner);
	if is_function(inner, &top) {
		return ExprKind::Function;
	}
	if let Some(call) = map_call(inner, &top) {
		return ExprKind::Map(call);
	}
	if let Some((test, consequent, alternate)) = split_conditional(inner, &top) {
		return ExprKind::Conditional {
			test: test.trim().to_string(),
			consequent: Box::new(classify(consequent)),
			alternate: Box::new(classify(alternate)),
		};
	}
	if is_ident(inner) {
		return ExprKind::Ident;
	}
	if inner.split('.').count() > 1 && inner.split('.').all(is_ident) {
		return ExprKind::Member;
	}
	ExprKind::Other
}

/// Removes parentheses that wrap the entire expression.
fn strip_parens(mut source: &str) -> &str {
	while source.starts_with('(') && find_matching(source, 0) == Some(source.len() - 1) {
		source = source[1..source.len() - 1].trim();
	}
	source
}

fn literal_kind(source: &str) -> Option<ExprKind> {
	match source {
		"true" => return Some(ExprKind::BoolLit(true)),
		"false" => return Some(ExprKind::BoolLit(false)),
		"null" | "undefined" => return Some(ExprKind::Nullish),
		_ => {}
	}

	if let Some(value) = string_literal_value(source) {
		return Some(ExprKind::StringLit(value));
	}

	let digits = source.strip_prefix('-').unwrap_or(source);
	let numeric_start = digits
		.chars()
		.next()
		.is_some_and(|c| c.is_ascii_digit() || c == '.');
	if numeric_start && digits.parse::<f64>().is_ok() {
		return Some(ExprKind::NumberLit(source.to_string()));
	}
	None
}

fn string_literal_value(source: &str) -> Option<String> {
	let quote = source.chars().next()?;
	if !matches!(quote, '"' | '\'' | '`') || source.len() < 2 || !source.ends_with(quote) {
		return None;
	}
	let body = &source[1..source.len() - 1];
	if quote == '`' && body.contains("${") {
		return None;
	}

	let mut value = String::with_capacity(body.len());
	let mut chars = body.chars();
	while let Some(c) = chars.next() {
		match c {
			'\\' => match chars.next()? {
				'n' => value.push('\n'),
				't' => value.push('\t'),
				'r' => value.push('\r'),
				other => value.push(other),
			},
			c if c == quote => return None,
			c => value.push(c),
		}
	}
	Some(value)
}

fn parse_whole_jsx(source: &str) -> Option<JsxNode> {
	if !source.starts_with('<') {
		return None;
	}
	match node_literal(source) {
		Ok((rest, node)) if rest.trim().is_empty() => Some(node),
		_ => None,
	}
}

/// Position of the first top-level `=>`.
fn arrow_position(top: &[(usize, char)]) -> Option<usize> {
	top.windows(2)
		.find(|pair| pair[0].1 == '=' && pair[1].1 == '>' && pair[1].0 == pair[0].0 + 1)
		.map(|pair| pair[0].0)
}

fn is_function(source: &str, top: &[(usize, char)]) -> bool {
	if source.starts_with("function") || source.starts_with("async function") {
		return true;
	}
	let Some(arrow) = arrow_position(top) else {
		return false;
	};
	let head = source[..arrow].trim();
	let head = head.strip_prefix("async").map_or(head, str::trim);
	is_ident(head) || (head.starts_with('(') && find_matching(head, 0) == Some(head.len() - 1))
}

fn map_call(source: &str, top: &[(usize, char)]) -> Option<MapCall> {
	let (open, _) = *top.last()?;
	if !source[..open].ends_with(".map") || find_matching(source, open) != Some(source.len() - 1) {
		return None;
	}
	let receiver = source[..open - ".map".len()].trim();
	let callback = source[open + 1..source.len() - 1].trim();

	let callback_top = top_level_chars(callback);
	let arrow = arrow_position(&callback_top)?;
	let params = callback[..arrow].trim();
	let params = strip_parens(params);
	let body = strip_parens(callback[arrow + 2..].trim());
	let body = parse_whole_jsx(body)?;

	Some(MapCall {
		receiver: receiver.to_string(),
		params: params.to_string(),
		body: Box::new(body),
	})
}

fn split_conditional<'a>(
	source: &'a str,
	top: &[(usize, char)],
) -> Option<(&'a str, &'a str, &'a str)> {
	let bytes = source.as_bytes();
	let is_question = |pos: usize| {
		bytes.get(pos) == Some(&b'?')
			&& !matches!(bytes.get(pos + 1), Some(b'.' | b'?'))
			&& (pos == 0 || bytes[pos - 1] != b'?')
	};

	let mut question = None;
	let mut nested = 0usize;
	for &(pos, c) in top {
		match (question, c) {
			(None, '?') if is_question(pos) => question = Some(pos),
			(Some(_), '?') if is_question(pos) => nested += 1,
			(Some(q), ':') => {
				if nested == 0 {
					return Some((&source[..q], &source[q + 1..pos], &source[pos + 1..]));
				}
				nested -= 1;
			}
			_ => {}
		}
	}
	None
}

/// Returns true for a JavaScript identifier.
pub fn is_ident(source: &str) -> bool {
	let mut chars = source.chars();
	chars
		.next()
		.is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
		&& chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

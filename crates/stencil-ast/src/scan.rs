//! Lexical scanning of embedded JavaScript.
//!
//! Expressions inside `{...}` are kept as opaque source text, so the parser
//! only needs to know where they end and where their top-level operators
//! are. The scanner walks the source skipping string literals, template
//! literals, comments and nested JSX literals, and reports every other
//! non-whitespace character.

use crate::parser::node_literal;

/// A significant token reported by [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
	/// A punctuation or identifier character.
	Char(char),
	/// A complete string or template literal.
	Literal,
	/// A complete JSX literal.
	Jsx,
}

/// Error raised when a literal or bracket is never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unterminated {
	/// Byte offset where the unterminated construct starts.
	pub(crate) offset: usize,
}

pub(crate) struct Scanner<'a> {
	src: &'a str,
	pos: usize,
	prev: Option<char>,
}

impl<'a> Scanner<'a> {
	pub(crate) fn new(src: &'a str) -> Self {
		Self::at(src, 0)
	}

	pub(crate) fn at(src: &'a str, pos: usize) -> Self {
		Self {
			src,
			pos,
			prev: None,
		}
	}

	fn peek_at(&self, pos: usize) -> Option<char> {
		self.src.get(pos..).and_then(|rest| rest.chars().next())
	}

	/// Returns the next significant token and its byte offset.
	pub(crate) fn next_token(&mut self) -> Result<Option<(usize, Token)>, Unterminated> {
		loop {
			let Some(c) = self.peek_at(self.pos) else {
				return Ok(None);
			};
			let start = self.pos;

			if c.is_whitespace() {
				self.pos += c.len_utf8();
				continue;
			}

			match c {
				'"' | '\'' => {
					self.pos = skip_string(self.src, start, c)?;
					self.prev = Some(c);
					return Ok(Some((start, Token::Literal)));
				}
				'`' => {
					self.pos = skip_template(self.src, start)?;
					self.prev = Some('`');
					return Ok(Some((start, Token::Literal)));
				}
				'/' if self.peek_at(start + 1) == Some('/') => {
					self.pos = self.src[start..]
						.find('\n')
						.map_or(self.src.len(), |n| start + n + 1);
					continue;
				}
				'/' if self.peek_at(start + 1) == Some('*') => {
					let end = self.src[start + 2..]
						.find("*/")
						.ok_or(Unterminated { offset: start })?;
					self.pos = start + 2 + end + 2;
					continue;
				}
				'<' if jsx_may_start(self.prev) && self.jsx_follows(start) => {
					if let Ok((rest, _)) = node_literal(&self.src[start..]) {
						self.pos = self.src.len() - rest.len();
						self.prev = Some(')');
						return Ok(Some((start, Token::Jsx)));
					}
				}
				_ => {}
			}

			self.pos += c.len_utf8();
			self.prev = Some(c);
			return Ok(Some((start, Token::Char(c))));
		}
	}

	fn jsx_follows(&self, lt: usize) -> bool {
		matches!(self.peek_at(lt + 1), Some(c) if c.is_alphabetic() || c == '>')
	}
}

fn jsx_may_start(prev: Option<char>) -> bool {
	match prev {
		None => true,
		Some(c) => "([{,;?:=!&|>}".contains(c),
	}
}

fn skip_string(src: &str, start: usize, quote: char) -> Result<usize, Unterminated> {
	let mut chars = src[start + 1..].char_indices();
	while let Some((i, c)) = chars.next() {
		match c {
			'\\' => {
				chars.next();
			}
			c if c == quote => return Ok(start + 1 + i + 1),
			'\n' => break,
			_ => {}
		}
	}
	Err(Unterminated { offset: start })
}

fn skip_template(src: &str, start: usize) -> Result<usize, Unterminated> {
	let mut pos = start + 1;
	while let Some(c) = src.get(pos..).and_then(|rest| rest.chars().next()) {
		match c {
			'\\' => {
				pos += 1;
				pos += src[pos..].chars().next().map_or(0, char::len_utf8);
			}
			'`' => return Ok(pos + 1),
			'$' if src[pos..].starts_with("${") => {
				let close = find_closing_brace(src, pos + 1)?;
				pos = close + 1;
			}
			_ => pos += c.len_utf8(),
		}
	}
	Err(Unterminated { offset: start })
}

/// Returns the offset of the `}` matching the `{` at `open`.
pub(crate) fn find_closing_brace(src: &str, open: usize) -> Result<usize, Unterminated> {
	let mut scanner = Scanner::at(src, open + 1);
	let mut depth = 0usize;
	while let Some((pos, token)) = scanner.next_token()? {
		match token {
			Token::Char('{' | '(' | '[') => depth += 1,
			Token::Char('}') if depth == 0 => return Ok(pos),
			Token::Char('}' | ')' | ']') => depth = depth.saturating_sub(1),
			_ => {}
		}
	}
	Err(Unterminated { offset: open })
}

/// Returns the offset of the bracket closing the one at `open`, if any.
pub(crate) fn find_matching(src: &str, open: usize) -> Option<usize> {
	let mut scanner = Scanner::at(src, open);
	let mut depth = 0usize;
	while let Ok(Some((pos, token))) = scanner.next_token() {
		match token {
			Token::Char('{' | '(' | '[') => depth += 1,
			Token::Char('}' | ')' | ']') => {
				depth = depth.saturating_sub(1);
				if depth == 0 {
					return Some(pos);
				}
			}
			_ => {}
		}
	}
	None
}

/// Collects the characters that sit outside every bracket pair.
///
/// Opening brackets at depth zero are included; their contents are not.
pub(crate) fn top_level_chars(src: &str) -> Vec<(usize, char)> {
	let mut scanner = Scanner::new(src);
	let mut depth = 0usize;
	let mut out = Vec::new();
	while let Ok(Some((pos, token))) = scanner.next_token() {
		let Token::Char(c) = token else {
			continue;
		};
		match c {
			'{' | '(' | '[' => {
				if depth == 0 {
					out.push((pos, c));
				}
				depth += 1;
			}
			'}' | ')' | ']' => depth = depth.saturating_sub(1),
			_ if depth == 0 => out.push((pos, c)),
			_ => {}
		}
	}
	out
}

/// Returns true when the source holds nothing but whitespace and comments.
pub(crate) fn is_blank(src: &str) -> bool {
	matches!(Scanner::new(src).next_token(), Ok(None))
}

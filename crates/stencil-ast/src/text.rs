//! JSX text whitespace handling.

/// Applies the JSX whitespace rule to raw text between tags.
///
/// Text on a single line is kept verbatim. Multi-line text has each line
/// trimmed on the sides that touch a line break, whitespace-only lines are
/// dropped and the remaining lines are joined with one space. Returns `None`
/// when nothing is left.
pub fn normalize_jsx_text(raw: &str) -> Option<String> {
	let lines: Vec<&str> = raw.split('\n').collect();
	if lines.len() == 1 {
		return (!raw.is_empty()).then(|| raw.to_string());
	}

	let last = lines.len() - 1;
	let mut kept: Vec<String> = Vec::new();
	for (i, line) in lines.iter().enumerate() {
		let line = line.replace('\t', " ");
		let line = line.trim_end_matches('\r');
		let mut trimmed: &str = line;
		if i != 0 {
			trimmed = trimmed.trim_start();
		}
		if i != last {
			trimmed = trimmed.trim_end();
		}
		if !trimmed.is_empty() {
			kept.push(trimmed.to_string());
		}
	}

	if kept.is_empty() {
		None
	} else {
		Some(kept.join(" "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("Hello", Some("Hello"))]
	#[case(" spaced ", Some(" spaced "))]
	#[case("", None)]
	#[case("\n    ", None)]
	#[case("\n  Hello\n  World\n", Some("Hello World"))]
	#[case("Hello \n   world", Some("Hello world"))]
	#[case("  a\n\n\n  b  ", Some("  a b  "))]
	fn test_normalize_jsx_text(#[case] raw: &str, #[case] expected: Option<&str>) {
		assert_eq!(normalize_jsx_text(raw).as_deref(), expected);
	}
}

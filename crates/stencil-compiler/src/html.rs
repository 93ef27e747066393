//! HTML element tables and escaping used when serializing templates.
//!
//! Element categories follow the WHATWG HTML Standard and the SVG 2
//! element index.

/// Void elements: never have children and serialize as `<tag/>`.
pub(crate) static VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

/// Elements that only exist inside `<svg>`.
pub(crate) static SVG_ELEMENTS: &[&str] = &[
	"svg",
	"animate",
	"animateMotion",
	"animateTransform",
	"circle",
	"clipPath",
	"defs",
	"desc",
	"ellipse",
	"feBlend",
	"feColorMatrix",
	"feComposite",
	"feFlood",
	"feGaussianBlur",
	"feMerge",
	"feMergeNode",
	"feOffset",
	"filter",
	"foreignObject",
	"g",
	"line",
	"linearGradient",
	"marker",
	"mask",
	"metadata",
	"mpath",
	"path",
	"pattern",
	"polygon",
	"polyline",
	"radialGradient",
	"rect",
	"stop",
	"switch",
	"symbol",
	"textPath",
	"tspan",
	"use",
	"view",
];

/// Tags shared by HTML and SVG. They are SVG only inside an SVG parent.
pub(crate) static AMBIGUOUS_SVG_ELEMENTS: &[&str] =
	&["a", "image", "script", "style", "text", "title"];

/// Returns true for void elements.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

/// Returns true when `tag` names an SVG element, given whether the parent
/// element is itself SVG.
pub fn is_svg_element(tag: &str, in_svg: bool) -> bool {
	SVG_ELEMENTS.contains(&tag) || (in_svg && AMBIGUOUS_SVG_ELEMENTS.contains(&tag))
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

/// Escapes a string for use in a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('"', "&quot;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("rect", false, true)]
	#[case("linearGradient", false, true)]
	#[case("text", false, false)]
	#[case("text", true, true)]
	#[case("div", true, false)]
	fn test_is_svg_element(#[case] tag: &str, #[case] in_svg: bool, #[case] expected: bool) {
		assert_eq!(is_svg_element(tag, in_svg), expected);
	}

	#[test]
	fn test_escape() {
		assert_eq!(escape_text("a < b && c"), "a &lt; b &amp;&amp; c");
		assert_eq!(escape_text("\"quoted\""), "\"quoted\"");
		assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
	}

	#[test]
	fn test_void_elements() {
		assert!(is_void_element("img"));
		assert!(!is_void_element("div"));
	}
}

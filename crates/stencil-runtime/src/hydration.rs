//! Adopting server-rendered markup.
//!
//! While [`hydrate`] runs, the first template mounted into the container
//! walks the existing children instead of cloning its prototype. Static
//! structure is adopted node by node. Dynamic regions written by the static
//! renderer (`<!--t-KEY-INDEX-->...<!$>` and `<!--c-KEY-INDEX-->...<!$>`)
//! are dropped and rendered again by the client, so the adopted tree has
//! exactly the shape of a fresh clone.

use std::cell::Cell;

use crate::dom::Node;
use crate::error::{Result, RuntimeError};

/// Attribute carrying the hydration key and template index.
pub const DATA_IDX: &str = "data-idx";
/// Comment data closing a server region.
pub const REGION_END: &str = "$";

thread_local! {
	static HYDRATING: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` with hydration enabled for `parent`.
///
/// Only the first mount inside `f` adopts; nested mounts clone as usual.
pub fn hydrate<T>(parent: &Node, f: impl FnOnce(&Node) -> T) -> T {
	let _restore = HydrationGuard(HYDRATING.replace(true));
	tracing::debug!(children = parent.child_count(), "hydrating container");
	f(parent)
}

/// Puts the previous flag back when dropped, so a failing or panicking
/// mount cannot leave the thread hydrating.
struct HydrationGuard(bool);

impl Drop for HydrationGuard {
	fn drop(&mut self) {
		let _ = HYDRATING.try_with(|flag| flag.set(self.0));
	}
}

pub fn is_hydrating() -> bool {
	HYDRATING.get()
}

/// Consumes the hydration flag.
pub(crate) fn take_hydration() -> bool {
	HYDRATING.replace(false)
}

fn is_region_start(data: &str) -> bool {
	data.starts_with("t-") || data.starts_with("c-")
}

/// Removes every server region under `parent`, recursively. Returns the
/// number of nodes removed.
pub fn strip_server_regions(parent: &Node) -> usize {
	let mut removed = 0;
	let mut depth = 0usize;
	for child in parent.children() {
		let data = child.comment_data();
		let starts = data.as_deref().is_some_and(is_region_start);
		if depth > 0 || starts {
			if starts {
				depth += 1;
			} else if data.as_deref() == Some(REGION_END) {
				depth -= 1;
			}
			child.remove();
			removed += 1;
			continue;
		}
		if child.is_element() {
			removed += strip_server_regions(&child);
		}
	}
	removed
}

/// Adopts the children of `parent` as an instance of `prototype`.
///
/// Returns the index map (`parent` first, then every adopted node in
/// document order) and the adopted top-level nodes.
pub(crate) fn adopt(prototype: &[Node], parent: &Node) -> Result<(Vec<Node>, Vec<Node>)> {
	let stripped = strip_server_regions(parent);
	let server = parent.children();
	if server.len() < prototype.len() {
		return Err(RuntimeError::HydrationMismatch {
			expected: format!("{} top-level nodes", prototype.len()),
			found: format!("{} top-level nodes", server.len()),
		});
	}

	let mut tree_map = vec![parent.clone()];
	for (expected, found) in prototype.iter().zip(&server) {
		adopt_node(expected, found, &mut tree_map)?;
	}
	tracing::debug!(nodes = tree_map.len() - 1, stripped, "adopted server markup");
	Ok((tree_map, server[..prototype.len()].to_vec()))
}

fn adopt_node(expected: &Node, found: &Node, tree_map: &mut Vec<Node>) -> Result<()> {
	let matches = if expected.is_element() {
		found.is_element()
			&& found.tag_name() == expected.tag_name()
			&& expected
				.get_attribute(DATA_IDX)
				.is_none_or(|idx| found.get_attribute(DATA_IDX).as_deref() == Some(idx.as_str()))
	} else if expected.is_text() {
		found.is_text()
	} else {
		found.is_comment() && found.comment_data() == expected.comment_data()
	};
	if !matches {
		return Err(mismatch(expected, found));
	}

	if expected.is_text() && found.text_content() != expected.text_content() {
		tracing::debug!(expected = ?expected, found = ?found, "static text differs from server");
		found.set_text_content(expected.text_content());
	}
	tree_map.push(found.clone());

	let expected_children = expected.children();
	let found_children = found.children();
	if expected_children.len() != found_children.len() {
		return Err(RuntimeError::HydrationMismatch {
			expected: format!("{} with {} children", expected.describe(), expected_children.len()),
			found: format!("{} with {} children", found.describe(), found_children.len()),
		});
	}
	for (e, f) in expected_children.iter().zip(&found_children) {
		adopt_node(e, f, tree_map)?;
	}
	Ok(())
}

fn mismatch(expected: &Node, found: &Node) -> RuntimeError {
	let describe = |node: &Node| match node.get_attribute(DATA_IDX) {
		Some(idx) => format!("{} [{}={}]", node.describe(), DATA_IDX, idx),
		None => node.describe(),
	};
	RuntimeError::HydrationMismatch {
		expected: describe(expected),
		found: describe(found),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::html::parse_html;
	use serial_test::serial;

	fn container(html: &str) -> Node {
		let parent = Node::element("main");
		for node in parse_html(html).unwrap() {
			parent.append_child(&node);
		}
		parent
	}

	#[test]
	fn test_strip_regions() {
		let parent = container(
			r#"<p data-idx="0-1">x <!--t-0-1-->Bob<!$><!> z</p><!--c-0-0--><b>1</b><!--t-1-0-->n<!$><!$><!>"#,
		);
		let removed = strip_server_regions(&parent);
		assert_eq!(removed, 9);
		assert_eq!(parent.inner_html(), r#"<p data-idx="0-1">x <!> z</p><!>"#);
	}

	#[test]
	fn test_adopt_keeps_server_nodes() {
		let prototype = parse_html(r#"<div data-idx="0-1">Hi<span data-idx="0-3"></span></div>"#).unwrap();
		let parent = container(r#"<div data-idx="0-1">Hi<span data-idx="0-3"><!--t-0-3-->v<!$></span></div>"#);
		let server_div = parent.first_child().unwrap();

		let (tree_map, nodes) = adopt(&prototype, &parent).unwrap();
		assert_eq!(tree_map.len(), 4);
		assert!(tree_map[0].ptr_eq(&parent));
		assert!(tree_map[1].ptr_eq(&server_div));
		assert_eq!(tree_map[3].tag_name().as_deref(), Some("span"));
		assert_eq!(nodes.len(), 1);
		assert_eq!(tree_map[3].child_count(), 0);
	}

	#[test]
	fn test_adopt_reports_mismatch() {
		let prototype = parse_html(r#"<div data-idx="0-1"></div>"#).unwrap();
		let parent = container(r#"<section data-idx="0-1"></section>"#);
		let err = adopt(&prototype, &parent).unwrap_err();
		assert!(matches!(err, RuntimeError::HydrationMismatch { .. }));
		assert!(err.to_string().contains("<div>"));

		let parent = container(r#"<div data-idx="1-1"></div>"#);
		assert!(adopt(&prototype, &parent).is_err());
	}

	#[test]
	#[serial(hydration)]
	fn test_flag_is_scoped_and_one_shot() {
		let parent = Node::element("main");
		assert!(!is_hydrating());
		hydrate(&parent, |_| {
			assert!(is_hydrating());
			assert!(take_hydration());
			assert!(!take_hydration());
		});
		assert!(!is_hydrating());
	}

	#[test]
	#[serial(hydration)]
	fn test_flag_cleared_when_nothing_mounts() {
		let parent = Node::element("main");
		let count = hydrate(&parent, |p| p.child_count());
		assert_eq!(count, 0);
		assert!(!is_hydrating());
	}

	#[test]
	#[serial(hydration)]
	fn test_flag_cleared_after_panic() {
		let parent = Node::element("main");
		let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			hydrate::<()>(&parent, |_| panic!("mount failed"));
		}));
		assert!(outcome.is_err());
		assert!(!is_hydrating());
	}
}

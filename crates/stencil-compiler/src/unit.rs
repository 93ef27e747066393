//! Compiled units.

use crate::context::CompilerContext;
use crate::error::Result;
use crate::index_map::collect_index_map;
use crate::partition::{DynamicSlot, SlotKind, SlotValue, partition};
use crate::tree::TreeNode;

/// One template with its dynamic slots.
///
/// A unit is what the runtime instantiates: `template` is parsed once and
/// cloned per mount, and `slots` are bound to the cloned nodes through
/// their positional indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
	/// Template id, unique within one compilation
	pub id: usize,
	/// Hydration key written into `data-idx` attributes
	pub hydration_key: String,
	/// Full template markup
	pub template: String,
	/// Static markup split around the slots
	pub chunks: Vec<String>,
	/// Slots in document order
	pub slots: Vec<DynamicSlot>,
	/// Sorted indices referenced by the slots
	pub index_map: Vec<usize>,
	/// Reconciliation key of the unit's root
	pub key: Option<SlotValue>,
}

impl CompiledUnit {
	/// Attribute slots in document order.
	pub fn attr_slots(&self) -> impl Iterator<Item = &DynamicSlot> {
		self.slots.iter().filter(|slot| slot.kind == SlotKind::Attr)
	}

	/// Child slots in document order.
	pub fn text_slots(&self) -> impl Iterator<Item = &DynamicSlot> {
		self.slots.iter().filter(|slot| slot.kind == SlotKind::Text)
	}

	/// Returns true when the unit has no dynamic content.
	pub fn is_static(&self) -> bool {
		self.slots.is_empty()
	}
}

/// Compiles a built tree into a unit.
///
/// The id is allocated before partitioning so that a unit always has a
/// smaller id than the units nested inside it.
pub fn compile_tree(ctx: &mut CompilerContext, tree: &TreeNode) -> Result<CompiledUnit> {
	let id = ctx.next_template_id();
	let parts = partition(ctx, tree)?;

	let (text, attrs): (Vec<DynamicSlot>, Vec<DynamicSlot>) = parts
		.slots
		.iter()
		.cloned()
		.partition(|slot| slot.kind == SlotKind::Text);
	let index_map = collect_index_map(&text, &attrs);
	let template = parts.template_chunks.concat();

	tracing::debug!(
		id,
		template_len = template.len(),
		slots = parts.slots.len(),
		"compiled unit"
	);

	Ok(CompiledUnit {
		id,
		hydration_key: ctx.options().hydration_key.clone(),
		template,
		chunks: parts.template_chunks,
		slots: parts.slots,
		index_map,
		key: parts.key,
	})
}

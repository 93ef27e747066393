//! Index-Map Collapser.
//!
//! A unit may contain many positional nodes, but the runtime only needs to
//! resolve the ones slots refer to. The index map lists those indices in
//! ascending order so generated code can address nodes by their small
//! position in the map.

use crate::partition::DynamicSlot;

/// Collects every parent and before index referenced by `slots` and
/// `prop_slots`, sorted ascending without duplicates.
pub fn collect_index_map(slots: &[DynamicSlot], prop_slots: &[DynamicSlot]) -> Vec<usize> {
	let mut map: Vec<usize> = slots
		.iter()
		.chain(prop_slots)
		.flat_map(|slot| std::iter::once(slot.parent_index).chain(slot.before_index))
		.collect();
	map.sort_unstable();
	map.dedup();
	map
}

/// Returns the position of `target` in `map`.
///
/// `None` means "argument omitted" to callers, not an error: slots without
/// a `before` anchor simply have no position.
pub fn find_index_position(target: usize, map: &[usize]) -> Option<usize> {
	map.binary_search(&target).ok()
}

/// [`find_index_position`] with `-1` for missing entries, as written into
/// generated code.
pub fn index_position_or_missing(target: usize, map: &[usize]) -> i64 {
	find_index_position(target, map)
		.and_then(|pos| i64::try_from(pos).ok())
		.unwrap_or(-1)
}

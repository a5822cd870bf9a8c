//! Flat node encoding
//!
//! A root is a `Vec<u32>` of fixed-size nodes laid out depth-first, so a
//! node's left child immediately follows it. Every node is [`NODE_WORDS`]
//! words:
//!
//! | word | internal node            | leaf node                  |
//! |------|--------------------------|----------------------------|
//! | 0..6 | bounds as `f32` bits (`min_x, min_y, min_z, max_x, max_y, max_z`) | same |
//! | 6    | word offset of right child | first triangle slot       |
//! | 7    | split axis (0, 1, 2)      | [`LEAF_FLAG`] `|` count   |
//!
//! Offsets are word offsets from the start of the root buffer.

use crate::geometry::AABB;

/// Words per node
pub const NODE_WORDS: usize = 8;

/// Bytes per node
pub const NODE_BYTES: usize = NODE_WORDS * 4;

/// High bit of word 7 marks a leaf
pub const LEAF_FLAG: u32 = 1 << 31;

/// Largest triangle count a single leaf can encode
pub const MAX_LEAF_COUNT: u32 = LEAF_FLAG - 1;

const DATA_WORD: usize = 6;
const FLAG_WORD: usize = 7;

/// Node bounds
#[inline]
pub fn bounds(buffer: &[u32], node: usize) -> AABB {
    let mut values = [0.0; 6];
    for (i, value) in values.iter_mut().enumerate() {
        *value = f32::from_bits(buffer[node + i]);
    }
    AABB::from_array(&values)
}

/// Overwrite node bounds
#[inline]
pub fn set_bounds(buffer: &mut [u32], node: usize, aabb: &AABB) {
    for (i, value) in aabb.to_array().iter().enumerate() {
        buffer[node + i] = value.to_bits();
    }
}

/// True if the node is a leaf
#[inline]
pub fn is_leaf(buffer: &[u32], node: usize) -> bool {
    buffer[node + FLAG_WORD] & LEAF_FLAG != 0
}

/// First triangle slot of a leaf
#[inline]
pub fn leaf_offset(buffer: &[u32], node: usize) -> u32 {
    buffer[node + DATA_WORD]
}

/// Triangle count of a leaf
#[inline]
pub fn leaf_count(buffer: &[u32], node: usize) -> u32 {
    buffer[node + FLAG_WORD] & !LEAF_FLAG
}

/// Left child of an internal node
#[inline]
pub fn left_child(node: usize) -> usize {
    node + NODE_WORDS
}

/// Right child of an internal node
#[inline]
pub fn right_child(buffer: &[u32], node: usize) -> usize {
    buffer[node + DATA_WORD] as usize
}

/// Split axis of an internal node
#[inline]
pub fn split_axis(buffer: &[u32], node: usize) -> usize {
    buffer[node + FLAG_WORD] as usize
}

/// Write a leaf into the slot at `node`
pub fn write_leaf(buffer: &mut [u32], node: usize, aabb: &AABB, offset: u32, count: u32) {
    set_bounds(buffer, node, aabb);
    buffer[node + DATA_WORD] = offset;
    buffer[node + FLAG_WORD] = LEAF_FLAG | count;
}

/// Write an internal node into the slot at `node`
pub fn write_internal(buffer: &mut [u32], node: usize, aabb: &AABB, right: usize, axis: usize) {
    set_bounds(buffer, node, aabb);
    buffer[node + DATA_WORD] = right as u32;
    buffer[node + FLAG_WORD] = axis as u32;
}

/// Contiguous triangle slots covered by a subtree as `(offset, count)`
///
/// Subtrees always cover a contiguous run because children are built from
/// adjacent halves of their parent's range.
pub fn subtree_range(buffer: &[u32], node: usize) -> (u32, u32) {
    let mut first = node;
    while !is_leaf(buffer, first) {
        first = left_child(first);
    }
    let mut last = node;
    while !is_leaf(buffer, last) {
        last = right_child(buffer, last);
    }
    let offset = leaf_offset(buffer, first);
    let end = leaf_offset(buffer, last) + leaf_count(buffer, last);
    (offset, end - offset)
}

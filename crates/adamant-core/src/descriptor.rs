//! Unconstrained-array descriptor decoding.
//!
//! An Ada unconstrained array travels as either a fat pointer (a record
//! holding separate data and bounds pointers) or a thin pointer (a single
//! pointer whose bounds block sits immediately before the array data).
//! This module recognizes both shapes and decodes bounds, data pointer and
//! element type, so the rest of the engine can coerce descriptors into
//! ordinary arrays.

use smallvec::SmallVec;

use crate::error::{AdamantError, Result};
use crate::names;
use crate::types::{Bound, TypeArena, TypeId, TypeKind, TypeNode};
use crate::value::{self, TargetLayout, TargetMemory, Value};

/// Data-pointer field of a fat pointer.
pub const DATA_FIELD: &str = "P_ARRAY";
/// Bounds-pointer field of a fat pointer.
pub const BOUNDS_FIELD: &str = "P_BOUNDS";
/// Bounds component of a thin-pointer target block.
pub const THIN_BOUNDS_FIELD: &str = "BOUNDS";
/// Data component of a thin-pointer target block.
pub const THIN_DATA_FIELD: &str = "ARRAY";

/// Decoded per-dimension bounds, low and high.
pub type DimBounds = SmallVec<[(i64, i64); 4]>;

/// Whether `ty` is an unconstrained-array descriptor of either shape.
#[must_use]
pub fn is_unconstrained_array(arena: &TypeArena, ty: TypeId) -> bool
{
    is_fat_pointer(arena, ty) || thin_target(arena, ty).is_some()
}

/// Whether `ty` is the fat-pointer record shape.
#[must_use]
pub fn is_fat_pointer(arena: &TypeArena, ty: TypeId) -> bool
{
    let id = arena.strip_typedefs(ty);
    arena.field_named(id, DATA_FIELD).is_some() && arena.field_named(id, BOUNDS_FIELD).is_some()
}

/// Target block of a thin pointer, recognized by its name marker.
fn thin_target(arena: &TypeArena, ty: TypeId) -> Option<TypeId>
{
    match &arena.get(arena.strip_typedefs(ty)).kind {
        TypeKind::Pointer { target } => {
            let target = arena.strip_typedefs(*target);
            let name = arena.get(target).name.as_deref()?;
            name.contains(names::XUT_SUFFIX).then_some(target)
        }
        _ => None,
    }
}

/// Record type holding the `LBk`/`UBk` bound fields.
fn bounds_record(arena: &TypeArena, ty: TypeId) -> Option<TypeId>
{
    let id = arena.strip_typedefs(ty);
    if let Some(thin) = thin_target(arena, id) {
        let field = arena.field_named(thin, THIN_BOUNDS_FIELD)?;
        return Some(arena.strip_typedefs(field.ty));
    }
    let field = arena.field_named(id, BOUNDS_FIELD)?;
    match &arena.get(arena.strip_typedefs(field.ty)).kind {
        TypeKind::Pointer { target } => Some(arena.strip_typedefs(*target)),
        _ => None,
    }
}

/// Array type holding the element layout.
fn data_array(arena: &TypeArena, ty: TypeId) -> Option<TypeId>
{
    let id = arena.strip_typedefs(ty);
    if let Some(thin) = thin_target(arena, id) {
        let field = arena.field_named(thin, THIN_DATA_FIELD)?;
        return Some(arena.strip_typedefs(field.ty));
    }
    let field = arena.field_named(id, DATA_FIELD)?;
    match &arena.get(arena.strip_typedefs(field.ty)).kind {
        TypeKind::Pointer { target } => Some(arena.strip_typedefs(*target)),
        _ => None,
    }
}

/// Number of dimensions described by `ty`: descriptor bounds pairs, or
/// nested array levels, or 0 for non-arrays.
#[must_use]
pub fn arity(arena: &TypeArena, ty: TypeId) -> usize
{
    if let Some(bounds) = bounds_record(arena, ty) {
        if let TypeKind::Record { fields } = &arena.get(bounds).kind {
            return fields.len() / 2;
        }
        return 0;
    }
    let mut id = arena.strip_typedefs(ty);
    let mut dims = 0;
    while let TypeKind::Array { element, .. } = &arena.get(id).kind {
        dims += 1;
        id = arena.strip_typedefs(*element);
    }
    dims
}

/// Element type after indexing `depth` dimensions (1 = fully indexed for a
/// one-dimensional array).
#[must_use]
pub fn element_type(arena: &TypeArena, ty: TypeId, depth: usize) -> Option<TypeId>
{
    let mut id = data_array(arena, ty).unwrap_or_else(|| arena.strip_typedefs(ty));
    for _ in 0..depth {
        match &arena.get(id).kind {
            TypeKind::Array { element, .. } => id = arena.strip_typedefs(*element),
            _ => return None,
        }
    }
    Some(id)
}

/// Address of the first array element.
pub fn data_pointer_of(
    arena: &TypeArena,
    memory: &dyn TargetMemory,
    layout: TargetLayout,
    value: &Value,
) -> Result<u64>
{
    let ty = arena.strip_typedefs(value.ty());
    if thin_target(arena, ty).is_some() {
        let ptr = value.read_scalar(arena, memory, layout.endian)?;
        return Ok(ptr as u64);
    }
    let field = arena
        .field_named(ty, DATA_FIELD)
        .ok_or_else(|| no_bounds(arena, ty))?;
    let bytes = value.contents(arena, memory)?;
    let ptr = value::field_scalar(arena, bytes, field, layout.endian)?;
    Ok(ptr as u64)
}

/// Per-dimension low and high bounds of the descriptor `value`.
pub fn bounds_of(
    arena: &TypeArena,
    memory: &dyn TargetMemory,
    layout: TargetLayout,
    value: &Value,
) -> Result<DimBounds>
{
    let ty = arena.strip_typedefs(value.ty());
    let bounds_ty = bounds_record(arena, ty).ok_or_else(|| no_bounds(arena, ty))?;
    let bounds_len = arena
        .byte_size(bounds_ty)
        .ok_or_else(|| no_bounds(arena, ty))? as usize;

    let bounds_addr = if thin_target(arena, ty).is_some() {
        // The bounds block sits immediately before the data the thin
        // pointer designates.
        let data = value.read_scalar(arena, memory, layout.endian)? as u64;
        data.wrapping_sub(bounds_len as u64)
    } else {
        let field = arena
            .field_named(ty, BOUNDS_FIELD)
            .ok_or_else(|| no_bounds(arena, ty))?;
        let bytes = value.contents(arena, memory)?;
        value::field_scalar(arena, bytes, field, layout.endian)? as u64
    };

    let raw = memory.read_memory(bounds_addr, bounds_len)?;
    decode_bounds_block(arena, bounds_ty, &raw, layout)
}

/// Low and high bound of one dimension (1-based, like Ada attributes).
pub fn array_bounds(
    arena: &TypeArena,
    memory: &dyn TargetMemory,
    layout: TargetLayout,
    value: &Value,
    dimension: usize,
) -> Result<(i64, i64)>
{
    let all = bounds_of(arena, memory, layout, value)?;
    all.get(dimension.wrapping_sub(1))
        .copied()
        .ok_or(AdamantError::IndexArityMismatch {
            expected: all.len(),
            got: dimension,
        })
}

fn decode_bounds_block(
    arena: &TypeArena,
    bounds_ty: TypeId,
    raw: &[u8],
    layout: TargetLayout,
) -> Result<DimBounds>
{
    let TypeKind::Record { fields } = &arena.get(bounds_ty).kind else {
        return Err(no_bounds(arena, bounds_ty));
    };
    // The compiler numbers bound fields from 0, some front ends from 1.
    let start: usize = if fields.iter().any(|f| f.name == "LB0") { 0 } else { 1 };
    let dims = fields.len() / 2;
    let mut out = DimBounds::new();
    for k in 0..dims {
        let lb = fields
            .iter()
            .find(|f| f.name == format!("LB{}", start + k))
            .ok_or_else(|| no_bounds(arena, bounds_ty))?;
        let ub = fields
            .iter()
            .find(|f| f.name == format!("UB{}", start + k))
            .ok_or_else(|| no_bounds(arena, bounds_ty))?;
        let low = value::field_scalar(arena, raw, lb, layout.endian)?;
        let high = value::field_scalar(arena, raw, ub, layout.endian)?;
        out.push((low, high));
    }
    Ok(out)
}

/// Materialize the descriptor `value` as a value of a concrete array type.
///
/// Returns `None` when the data pointer is null while bounds were
/// requested: a missing array is not the same thing as an empty one.
pub fn coerce_to_array(
    arena: &mut TypeArena,
    memory: &dyn TargetMemory,
    layout: TargetLayout,
    value: &Value,
) -> Result<Option<Value>>
{
    let ty = arena.strip_typedefs(value.ty());
    if !is_unconstrained_array(arena, ty) {
        return Ok(Some(value.clone()));
    }

    let bounds = bounds_of(arena, memory, layout, value)?;
    let data = data_pointer_of(arena, memory, layout, value)?;
    if data == 0 {
        return Ok(None);
    }

    let template = data_array(arena, ty).ok_or_else(|| no_bounds(arena, ty))?;
    let array_ty = constrained_array_type(arena, template, &bounds)?;
    Ok(Some(Value::from_target(array_ty, data)))
}

/// Build a concrete array type from an unconstrained template plus decoded
/// bounds, one range type per dimension.
pub(crate) fn constrained_array_type(
    arena: &mut TypeArena,
    template: TypeId,
    bounds: &[(i64, i64)],
) -> Result<TypeId>
{
    // Collect the per-dimension index types and the innermost element.
    let mut index_types = Vec::with_capacity(bounds.len());
    let mut elem = arena.strip_typedefs(template);
    let mut packed_bits = None;
    for _ in 0..bounds.len() {
        let node = arena.get(elem);
        if packed_bits.is_none() {
            packed_bits = node
                .name
                .as_deref()
                .and_then(names::packed_array_bit_size);
        }
        let TypeKind::Array { index, element, element_bit_size } = &node.kind else {
            return Err(no_bounds(arena, template));
        };
        if packed_bits.is_none() {
            packed_bits = *element_bit_size;
        }
        index_types.push(*index);
        elem = arena.strip_typedefs(*element);
    }

    let elem_bytes = arena.byte_size(elem).unwrap_or(0);
    let mut ty = elem;
    let mut bits_per_item = packed_bits.unwrap_or(elem_bytes * 8);
    for (dim, (low, high)) in bounds.iter().enumerate().rev() {
        let count = (high - low + 1).max(0) as u64;
        let base = index_base(arena, index_types[dim]);
        let range = arena.alloc(
            TypeNode::new(TypeKind::Range {
                base,
                low: Bound::Constant(*low),
                high: Bound::Constant(*high),
            })
            .sized(arena.byte_size(base).unwrap_or(0))
            .as_fixed(),
        );
        let total_bits = count * bits_per_item;
        let element_bit_size = if dim + 1 == bounds.len() { packed_bits } else { None };
        ty = arena.alloc(
            TypeNode::new(TypeKind::Array {
                index: range,
                element: ty,
                element_bit_size,
            })
            .sized((total_bits + 7) / 8)
            .as_fixed(),
        );
        bits_per_item = total_bits;
    }
    Ok(ty)
}

/// Underlying discrete type of an index type.
fn index_base(arena: &TypeArena, index: TypeId) -> TypeId
{
    let id = arena.strip_typedefs(index);
    match &arena.get(id).kind {
        TypeKind::Range { base, .. } => arena.strip_typedefs(*base),
        _ => id,
    }
}

fn no_bounds(arena: &TypeArena, ty: TypeId) -> AdamantError
{
    let name = arena
        .get(ty)
        .name
        .clone()
        .unwrap_or_else(|| "<anonymous array>".to_string());
    AdamantError::NoBoundsInformation(name)
}

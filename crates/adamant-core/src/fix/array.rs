//! Array, range and fixed-point fixing.

use crate::bits::{self, Endian};
use crate::error::Result;
use crate::names;
use crate::types::{Bound, TypeArena, TypeId, TypeKind, TypeNode};
use crate::value::{Value, ValueStorage};

use super::{fix_type_at_depth, int_var_value, record, FixCtx};

pub(super) fn fix_array(
    ctx: &mut FixCtx<'_>,
    id: TypeId,
    dval: Option<&Value>,
    depth: usize,
) -> Result<TypeId>
{
    let name = ctx.arena.get(id).name.clone();

    // Walk the nested array levels down to the element.
    let mut chain_indexes: Vec<TypeId> = Vec::new();
    let mut packed_bits = name.as_deref().and_then(names::packed_array_bit_size);
    let mut elem = id;
    while let TypeKind::Array { index, element, element_bit_size } = &ctx.arena.get(elem).kind {
        if packed_bits.is_none() {
            packed_bits = *element_bit_size;
        }
        chain_indexes.push(*index);
        elem = ctx.arena.strip_typedefs(*element);
    }
    if chain_indexes.is_empty() {
        return Ok(id);
    }

    // A parallel index descriptor supersedes the structural index types;
    // its fields carry one range type per dimension, in order.
    let dim_types: Vec<TypeId> = match ctx.arena.find_parallel(id, names::XA_SUFFIX) {
        Some(xa) => match &ctx.arena.get(xa).kind {
            TypeKind::Record { fields } if !fields.is_empty() => {
                fields.iter().map(|f| f.ty).collect()
            }
            _ => chain_indexes.clone(),
        },
        None => chain_indexes.clone(),
    };

    // With more descriptor dimensions than nested levels, the innermost
    // level folds several dimensions; the element is what is left after
    // the levels the chain really has.
    let mut fixed_ranges = Vec::with_capacity(dim_types.len());
    for dim in &dim_types {
        fixed_ranges.push(fix_range(ctx, *dim, dval)?);
    }

    // Elements are fixed without object context: an element must never
    // depend on its own contents.
    let elem_fixed = fix_type_at_depth(ctx, elem, dval, None, depth + 1)?;

    let elem_bytes = ctx.arena.byte_size(elem_fixed).unwrap_or_else(|| {
        ctx.warn.warn(&format!(
            "no size information for array element of {}",
            name.as_deref().unwrap_or("<anonymous array>")
        ));
        0
    });

    let mut ty = elem_fixed;
    let mut bits_per_item = packed_bits.unwrap_or(elem_bytes * 8);
    for (dim, range) in fixed_ranges.iter().enumerate().rev() {
        let count = match range_constants(ctx.arena, *range) {
            Some((low, high)) => (high - low + 1).max(0) as u64,
            None => {
                ctx.warn.warn("array index type has no constant bounds");
                0
            }
        };
        let total_bits = count * bits_per_item;
        let node = TypeNode {
            name: if dim == 0 { name.clone() } else { None },
            kind: TypeKind::Array {
                index: *range,
                element: ty,
                element_bit_size: if dim + 1 == fixed_ranges.len() { packed_bits } else { None },
            },
            byte_size: Some((total_bits + 7) / 8),
            fixed: true,
        };
        ty = ctx.arena.alloc(node);
        bits_per_item = total_bits;
    }
    Ok(ty)
}

/// Fix a range type into one with constant bounds.
///
/// Bounds may be compile-time constants, discriminant references resolved
/// against `dval`, named compiler variables, or `___XD` name encodings.
/// A bound that cannot be resolved degrades to 0 with a warning; that
/// keeps the rest of the object readable.
pub(super) fn fix_range(ctx: &mut FixCtx<'_>, id: TypeId, dval: Option<&Value>) -> Result<TypeId>
{
    let stripped = ctx.arena.strip_typedefs(id);
    let node = ctx.arena.get(stripped);
    if node.fixed {
        return Ok(stripped);
    }
    let name = node.name.clone();
    let TypeKind::Range { base, low, high } = &node.kind else {
        // Enumeration, character or plain integer index types are already
        // concrete.
        return Ok(stripped);
    };
    let base = *base;
    let (low, high) = (low.clone(), high.clone());
    if low.constant().is_some() && high.constant().is_some() {
        return Ok(stripped);
    }

    let xd = name.as_deref().and_then(names::xd_bound_info);
    let low_value = resolve_bound(ctx, &low, dval, xd.as_ref().map(|x| &x.low));
    let high_value = resolve_bound(ctx, &high, dval, xd.as_ref().map(|x| &x.high));

    Ok(ctx.arena.alloc(TypeNode {
        name,
        kind: TypeKind::Range {
            base,
            low: Bound::Constant(low_value),
            high: Bound::Constant(high_value),
        },
        byte_size: ctx.arena.byte_size(base),
        fixed: true,
    }))
}

fn resolve_bound(
    ctx: &mut FixCtx<'_>,
    bound: &Bound,
    dval: Option<&Value>,
    xd: Option<&names::XdBound>,
) -> i64
{
    match bound {
        Bound::Constant(v) => *v,
        Bound::Discriminant(name) => match dval {
            Some(holder) => match record::read_discriminant(ctx, holder, name) {
                Ok(v) => v,
                Err(_) => {
                    ctx.warn
                        .warn(&format!("cannot read discriminant {name}; using 0"));
                    0
                }
            },
            None => {
                ctx.warn
                    .warn(&format!("no object to read discriminant {name} from; using 0"));
                0
            }
        },
        Bound::Variable(name) => int_var_value(ctx, name).unwrap_or_else(|| {
            ctx.warn
                .warn(&format!("bound variable {name} is unavailable; using 0"));
            0
        }),
        Bound::Unresolved => match xd {
            Some(names::XdBound::Literal(v)) => *v,
            Some(names::XdBound::Variable(name)) => int_var_value(ctx, name).unwrap_or_else(|| {
                ctx.warn
                    .warn(&format!("bound variable {name} is unavailable; using 0"));
                0
            }),
            None => {
                ctx.warn.warn("unresolved range bound; using 0");
                0
            }
        },
    }
}

/// Constant bounds of a fixed range or other discrete index type.
fn range_constants(arena: &TypeArena, id: TypeId) -> Option<(i64, i64)>
{
    match &arena.get(arena.strip_typedefs(id)).kind {
        TypeKind::Range { low, high, .. } => Some((low.constant()?, high.constant()?)),
        TypeKind::Enum { literals } => {
            let first = literals.first()?.value;
            let last = literals.last()?.value;
            Some((first, last))
        }
        TypeKind::Bool => Some((0, 1)),
        TypeKind::Char => Some((0, 255)),
        _ => None,
    }
}

/// Give a fixed-point template its scaling, parsed from the `___XF_`
/// marker in its name when the debug info left the node bare.
pub(super) fn fix_fixed_point(ctx: &mut FixCtx<'_>, id: TypeId) -> Result<TypeId>
{
    let node = ctx.arena.get(id);
    let TypeKind::FixedPoint { small_num, small_den } = &node.kind else {
        return Ok(id);
    };
    if *small_num != 0 && *small_den != 0 {
        return Ok(id);
    }
    let name = node.name.clone();
    let byte_size = node.byte_size;
    let Some((num, den)) = name.as_deref().and_then(names::fixed_point_scaling) else {
        return Ok(id);
    };
    Ok(ctx.arena.alloc(TypeNode {
        name,
        kind: TypeKind::FixedPoint {
            small_num: num,
            small_den: den,
        },
        byte_size,
        fixed: true,
    }))
}

/// Normalize a packed array read out of a right-justified modular scalar.
///
/// Reinterpreting such a value through the array type needs the component
/// bits at their storage positions, which on big-endian targets means the
/// front of the buffer.
#[must_use]
pub fn left_justify_packed(ctx: &mut FixCtx<'_>, value: &Value) -> Value
{
    let ty = ctx.arena.strip_typedefs(value.ty());
    let TypeKind::Array { index, element_bit_size: Some(bits), .. } = &ctx.arena.get(ty).kind
    else {
        return value.clone();
    };
    if ctx.layout.endian != Endian::Big {
        return value.clone();
    }
    let Some((low, high)) = range_constants(ctx.arena, *index) else {
        return value.clone();
    };
    let total_bits = (high - low + 1).max(0) as u64 * bits;
    if total_bits % 8 == 0 {
        return value.clone();
    }
    let ValueStorage::Buffer(bytes) = value.storage() else {
        return value.clone();
    };
    Value::from_bytes(
        value.ty(),
        bits::left_justify(bytes, total_bits, Endian::Big),
    )
}

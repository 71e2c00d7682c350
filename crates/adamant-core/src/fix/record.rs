//! Record and variant-part fixing.
//!
//! A dynamic record is fixed field by field against one concrete object:
//! positions accumulate as earlier fields resolve, dynamic-length fields
//! are resolved through a partial view of the record built so far, and the
//! variant part is always settled last so the discriminant it needs is
//! already in place.

use tracing::debug;

use crate::error::{AdamantError, Result};
use crate::names;
use crate::types::{Field, TypeArena, TypeId, TypeKind, TypeNode, Variant};
use crate::value::{self, Value};

use super::{fix_type_at_depth, int_var_value, FixCtx};

pub(super) fn fix_record(
    ctx: &mut FixCtx<'_>,
    id: TypeId,
    dval: Option<&Value>,
    address: Option<u64>,
    depth: usize,
) -> Result<TypeId>
{
    // Prefer the dynamic template the compiler emitted alongside the
    // primary type.
    let template = match ctx.arena.find_parallel(id, names::XVE_SUFFIX) {
        Some(t) if matches!(ctx.arena.get(t).kind, TypeKind::Record { .. }) => t,
        _ => id,
    };
    let has_template = template != id;

    let TypeKind::Record { fields } = &ctx.arena.get(template).kind else {
        return Ok(id);
    };
    let src_fields: Vec<Field> = fields.clone();
    let record_name = ctx.arena.get(id).name.clone();

    // Records with a fully static layout need no new node at all.
    if !has_template && is_static_record(ctx.arena, &src_fields) {
        return Ok(id);
    }

    let mut fixed_fields: Vec<Field> = Vec::with_capacity(src_fields.len());
    let mut off: u64 = 0;
    let mut bit_len: u64 = 0;
    let mut variant_slot: Option<usize> = None;
    // Once a dynamic field moves, every later declared position is stale.
    let mut relayout = false;

    for field in &src_fields {
        let align_bits = names::field_alignment_bytes(&field.name).map_or(1, |b| b * 8);
        let pos = match field.bit_pos {
            Some(p) if !relayout => p,
            _ => align_up(off, align_bits),
        };

        if is_variant_field(ctx.arena, field) {
            // Settled after every other field, whatever its declared
            // position.
            variant_slot = Some(fixed_fields.len());
            fixed_fields.push(Field {
                name: field.name.clone(),
                ty: field.ty,
                bit_pos: Some(pos),
                bit_size: 0,
            });
            off = pos;
            continue;
        }

        let (fixed_ty, field_bits) = if let Some(target) = dynamic_field_target(ctx.arena, field) {
            relayout = true;
            let holder = discriminant_holder(ctx, dval, record_name.as_deref(), &fixed_fields, bit_len, address)?;
            let real = base_type(ctx, target);
            let field_address = address.map(|a| a + pos / 8);
            let fixed = fix_type_at_depth(ctx, real, Some(&holder), field_address, depth + 1)?;
            let bits = match ctx.arena.byte_size(fixed) {
                Some(b) => b * 8,
                None => {
                    ctx.warn
                        .warn(&format!("no size information for field {}", field.name));
                    0
                }
            };
            (fixed, bits)
        } else {
            let bits = if field.bit_size > 0 {
                field.bit_size
            } else {
                match ctx.arena.byte_size(field.ty) {
                    Some(b) => b * 8,
                    None => {
                        ctx.warn
                            .warn(&format!("no size information for field {}", field.name));
                        0
                    }
                }
            };
            (field.ty, bits)
        };

        fixed_fields.push(Field {
            name: field.name.clone(),
            ty: fixed_ty,
            bit_pos: Some(pos),
            bit_size: field.bit_size,
        });
        off = pos + field_bits;
        bit_len = bit_len.max(off);
    }

    if let Some(slot) = variant_slot {
        let union_ty = fixed_fields[slot].ty;
        let pos = fixed_fields[slot].bit_pos.unwrap_or(0);
        let holder = discriminant_holder(ctx, dval, record_name.as_deref(), &fixed_fields, bit_len, address)?;
        match select_branch(ctx, union_ty, &holder, depth)? {
            BranchOutcome::Selected(branch) => {
                let bits = ctx.arena.byte_size(branch).unwrap_or(0) * 8;
                fixed_fields[slot].ty = branch;
                bit_len = bit_len.max(pos + bits);
            }
            BranchOutcome::Unchecked => {
                let bits = ctx.arena.byte_size(union_ty).unwrap_or(0) * 8;
                bit_len = bit_len.max(pos + bits);
            }
            BranchOutcome::Removed => {
                fixed_fields.remove(slot);
            }
        }
    }

    let mut byte_len = (bit_len + 7) / 8;

    // When the compiler emitted a size variable, its word beats ours.
    if let Some(name) = record_name.as_deref() {
        let base = name.strip_suffix(names::XVE_SUFFIX).unwrap_or(name);
        let xvz = format!("{base}{}", names::XVZ_SUFFIX);
        if let Some(declared) = int_var_value(ctx, &xvz) {
            if declared >= 0 && declared as u64 != byte_len {
                debug!(
                    computed = byte_len,
                    declared, "size variable overrides computed record size"
                );
                byte_len = declared as u64;
            }
        }
    }

    Ok(ctx.arena.alloc(
        TypeNode {
            name: record_name,
            kind: TypeKind::Record { fields: fixed_fields },
            byte_size: Some(byte_len),
            fixed: true,
        },
    ))
}

/// Fix a union seen on its own: select the live branch when a
/// discriminant holder is available, otherwise hand the template back
/// unresolved.
pub(super) fn fix_union(
    ctx: &mut FixCtx<'_>,
    id: TypeId,
    dval: Option<&Value>,
    depth: usize,
) -> Result<TypeId>
{
    let Some(holder) = dval else {
        return Ok(id);
    };
    match select_branch(ctx, id, holder, depth)? {
        BranchOutcome::Selected(branch) => Ok(branch),
        BranchOutcome::Unchecked | BranchOutcome::Removed => Ok(id),
    }
}

enum BranchOutcome
{
    Selected(TypeId),
    /// No controlling discriminant is visible; the union stays unresolved.
    Unchecked,
    /// No branch matched and there is no `others`; the component vanishes.
    Removed,
}

fn select_branch(
    ctx: &mut FixCtx<'_>,
    union_ty: TypeId,
    holder: &Value,
    depth: usize,
) -> Result<BranchOutcome>
{
    let stripped = ctx.arena.strip_typedefs(union_ty);
    let uid = match ctx.arena.find_parallel(stripped, names::XVU_SUFFIX) {
        Some(t) if matches!(ctx.arena.get(t).kind, TypeKind::Union { .. }) => t,
        _ => stripped,
    };

    let (discr_name, variants): (String, Vec<Variant>) = match &ctx.arena.get(uid).kind {
        TypeKind::Union { discriminant: Some(d), variants } => (d.clone(), variants.clone()),
        TypeKind::Union { discriminant: None, variants } => {
            // The discriminant may still be spelled in the union's name.
            let named = ctx
                .arena
                .get(uid)
                .name
                .as_deref()
                .and_then(names::variant_discriminant_name)
                .map(str::to_string);
            match named {
                Some(d) => (d, variants.clone()),
                None => return Ok(BranchOutcome::Unchecked),
            }
        }
        _ => return Ok(BranchOutcome::Unchecked),
    };

    let discriminant = read_discriminant(ctx, holder, &discr_name)?;
    let Some(variant) = variants.iter().find(|v| v.matches(discriminant)) else {
        debug!(discriminant, "no variant branch matches");
        return Ok(BranchOutcome::Removed);
    };
    let fixed = fix_type_at_depth(ctx, variant.ty, Some(holder), None, depth + 1)?;
    Ok(BranchOutcome::Selected(fixed))
}

/// Read the named discriminant out of the record value built so far.
pub(super) fn read_discriminant(ctx: &mut FixCtx<'_>, holder: &Value, name: &str) -> Result<i64>
{
    let rec = ctx.arena.strip_typedefs(holder.ty());
    let field = ctx
        .arena
        .field_named(rec, name)
        .cloned()
        .ok_or_else(|| AdamantError::UndefinedComponent(name.to_string()))?;
    let bytes = holder.contents(ctx.arena, ctx.memory)?;
    value::field_scalar(ctx.arena, bytes, &field, ctx.layout.endian)
}

/// Value standing for the record under construction, used to read
/// discriminants that earlier fields already fixed.
fn discriminant_holder(
    ctx: &mut FixCtx<'_>,
    dval: Option<&Value>,
    name: Option<&str>,
    fields: &[Field],
    bit_len: u64,
    address: Option<u64>,
) -> Result<Value>
{
    if let Some(v) = dval {
        return Ok(v.clone());
    }
    let Some(addr) = address else {
        return Err(AdamantError::NoBoundsInformation(
            name.unwrap_or("<anonymous record>").to_string(),
        ));
    };
    let partial = ctx.arena.alloc(TypeNode {
        name: name.map(str::to_string),
        kind: TypeKind::Record { fields: fields.to_vec() },
        byte_size: Some((bit_len + 7) / 8),
        fixed: true,
    });
    Ok(Value::from_target(partial, addr))
}

/// Real type behind a dynamic field, following the `___XVS` naming
/// convention: a single-field parallel struct whose field references (new
/// encoding) or names (old encoding) the base type.
fn base_type(ctx: &mut FixCtx<'_>, id: TypeId) -> TypeId
{
    let stripped = ctx.arena.strip_typedefs(id);
    let Some(xvs) = ctx.arena.find_parallel(stripped, names::XVS_SUFFIX) else {
        return stripped;
    };
    let TypeKind::Record { fields } = &ctx.arena.get(xvs).kind else {
        return stripped;
    };
    if fields.len() != 1 {
        return stripped;
    }
    let field = &fields[0];
    match &ctx.arena.get(ctx.arena.strip_typedefs(field.ty)).kind {
        TypeKind::Reference { target } => ctx.arena.strip_typedefs(*target),
        _ => ctx.arena.lookup(&field.name).unwrap_or(stripped),
    }
}

fn is_variant_field(arena: &TypeArena, field: &Field) -> bool
{
    matches!(
        arena.get(arena.strip_typedefs(field.ty)).kind,
        TypeKind::Union { .. }
    )
}

/// A field whose name carries `___XVL` holds an access to its own real,
/// dynamically sized type.
fn dynamic_field_target(arena: &TypeArena, field: &Field) -> Option<TypeId>
{
    if !field.name.contains(names::XVL_MARKER) {
        return None;
    }
    match &arena.get(arena.strip_typedefs(field.ty)).kind {
        TypeKind::Pointer { target } => Some(*target),
        _ => None,
    }
}

fn is_static_record(arena: &TypeArena, fields: &[Field]) -> bool
{
    fields.iter().all(|f| {
        f.bit_pos.is_some()
            && dynamic_field_target(arena, f).is_none()
            && !is_variant_field(arena, f)
    })
}

fn align_up(value: u64, align: u64) -> u64
{
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

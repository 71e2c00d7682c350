//! Tagged-type resolution through the runtime tag.
//!
//! A class-wide object carries a tag word pointing at its dispatch table.
//! Walking from the tag to the type-specific data block recovers the name
//! of the object's dynamic type; the `offset_to_top` slot next to the tag
//! relocates a view of a secondary parent back to the primary object.

use crate::error::Result;
use crate::names;
use crate::types::{Field, TypeArena, TypeId, TypeKind};
use crate::value::Value;

use super::FixCtx;

/// Field every tagged record starts its dispatching life with.
pub const TAG_FIELD: &str = "_tag";
/// Field embedding the parent part of a derived tagged record.
const PARENT_FIELD: &str = "_parent";
/// Runtime type holding the type-specific data layout.
const TSD_TYPE_NAME: &str = "ada__tags__type_specific_data";
/// TSD field pointing at the NUL-terminated expanded type name.
const EXPANDED_NAME_FIELD: &str = "expanded_name";
/// Dispatch-table field naming the TSD in the oldest runtime layout.
const TSD_FIELD: &str = "tsd";

/// Longest expanded name the engine will read out of the runtime.
const MAX_TAG_NAME: usize = 1024;

/// Whether `ty` is a tagged record (carries a `_tag`, possibly through
/// inherited parent parts).
#[must_use]
pub fn is_tagged(arena: &TypeArena, ty: TypeId) -> bool
{
    tag_field(arena, ty).is_some()
}

/// The `_tag` field and its absolute bit position, searching inherited
/// `_parent` parts.
fn tag_field(arena: &TypeArena, ty: TypeId) -> Option<(u64, Field)>
{
    fn walk(arena: &TypeArena, ty: TypeId, acc: u64, depth: usize) -> Option<(u64, Field)>
    {
        if depth > 16 {
            return None;
        }
        let TypeKind::Record { fields } = &arena.get(arena.strip_typedefs(ty)).kind else {
            return None;
        };
        if let Some(f) = fields.iter().find(|f| f.name == TAG_FIELD) {
            return Some((acc + f.bit_pos.unwrap_or(0), f.clone()));
        }
        let parent = fields.iter().find(|f| f.name == PARENT_FIELD)?;
        walk(
            arena,
            parent.ty,
            acc + parent.bit_pos.unwrap_or(0),
            depth + 1,
        )
    }
    walk(arena, ty, 0, 0)
}

/// Relocate a tagged object to its primary base address.
///
/// The `offset_to_top` slot two words before the dispatch table says how
/// far this view sits from the start of the whole object. A zero offset
/// (the common case) leaves the value untouched. Failures to read any of
/// the involved words degrade to the unadjusted value: an uninitialized
/// object routinely has a garbage tag.
pub fn tagged_base_value(ctx: &mut FixCtx<'_>, value: &Value) -> Result<Value>
{
    let ty = ctx.arena.strip_typedefs(value.ty());
    if !is_tagged(ctx.arena, ty) {
        return Ok(value.clone());
    }
    let Some(address) = value.address() else {
        return Ok(value.clone());
    };
    let Some(tag_ptr) = read_tag_pointer(ctx, value) else {
        return Ok(value.clone());
    };

    let pointer = u64::from(ctx.layout.pointer_size);
    let Ok(mut offset) = read_offset(ctx, tag_ptr.wrapping_sub(2 * pointer)) else {
        return Ok(value.clone());
    };

    if offset == 0 {
        return Ok(value.clone());
    }
    // Ada.Tags leaves the -1 case unspecified; do not touch the object.
    if offset == -1 {
        return Ok(value.clone());
    }
    if offset == ctx.layout.storage_offset_last() {
        // Dynamic parent: the real offset is stored in the object itself,
        // in the word just after the tag.
        match read_offset(ctx, address.wrapping_add(pointer)) {
            Ok(stored) => offset = stored,
            Err(_) => return Ok(value.clone()),
        }
    }

    // Older compilers stored a positive offset to subtract; since the ABI
    // change the offset is negative and added, like C++. Keying off the
    // sign at run time is the only way to support both.
    if offset > 0 {
        offset = -offset;
    }
    let base = address.wrapping_add(offset as u64);

    // Only move when a plausible tag exists at the new address; a bogus
    // offset usually means the object is not initialized yet.
    let relocated = Value::from_target(value.ty(), base);
    if read_tag_pointer(ctx, &relocated).is_none() {
        return Ok(value.clone());
    }
    Ok(relocated)
}

/// Dynamic type of a tagged object, recovered from its runtime tag.
/// Any failure along the way degrades to `None`.
pub(super) fn derived_type_of(ctx: &mut FixCtx<'_>, value: &Value) -> Option<TypeId>
{
    let address = value.address()?;
    let ty = ctx.arena.strip_typedefs(value.ty());
    let (pos, field) = tag_field(ctx.arena, ty)?;
    let tag_value = Value::from_target(field.ty, address + pos / 8);
    tag_to_type(ctx, &tag_value).ok().flatten()
}

/// Map a tag value to the concrete type it names.
///
/// The TSD is located either through a `tsd` field of the dispatch table
/// (oldest runtimes) or one word before the address the tag points at;
/// its `expanded_name` string, re-encoded, names the type to look up.
pub fn tag_to_type(ctx: &mut FixCtx<'_>, tag: &Value) -> Result<Option<TypeId>>
{
    let tag_ptr = tag.read_scalar(ctx.arena, ctx.memory, ctx.layout.endian)? as u64;
    if tag_ptr == 0 {
        return Ok(None);
    }
    let pointer = u64::from(ctx.layout.pointer_size);

    let tsd_addr = match dispatch_tsd_field(ctx.arena, tag.ty()) {
        Some(field_pos) => read_pointer(ctx, tag_ptr + field_pos / 8)?,
        None => read_pointer(ctx, tag_ptr.wrapping_sub(pointer))?,
    };
    if tsd_addr == 0 {
        return Ok(None);
    }

    let Some(tsd_ty) = ctx.arena.lookup(TSD_TYPE_NAME) else {
        ctx.warn
            .warn("type ada__tags__type_specific_data is not in the debug info");
        return Ok(None);
    };
    let stripped = ctx.arena.strip_typedefs(tsd_ty);
    let Some(name_field) = ctx.arena.field_named(stripped, EXPANDED_NAME_FIELD).cloned() else {
        return Ok(None);
    };

    let name_ptr = read_pointer(ctx, tsd_addr + name_field.bit_pos.unwrap_or(0) / 8)?;
    if name_ptr == 0 {
        return Ok(None);
    }
    let expanded = read_cstring(ctx, name_ptr)?;
    let encoded = match names::encode(&expanded, true) {
        Ok(e) => e,
        Err(_) => return Ok(None),
    };
    Ok(ctx.arena.lookup(&encoded))
}

/// Bit position of the `tsd` field in the dispatch table the tag points
/// at, for the oldest runtime layout.
fn dispatch_tsd_field(arena: &TypeArena, tag_ty: TypeId) -> Option<u64>
{
    let TypeKind::Pointer { target } = &arena.get(arena.strip_typedefs(tag_ty)).kind else {
        return None;
    };
    let field = arena.field_named(arena.strip_typedefs(*target), TSD_FIELD)?;
    field.bit_pos
}

fn read_tag_pointer(ctx: &mut FixCtx<'_>, value: &Value) -> Option<u64>
{
    let address = value.address()?;
    let ty = ctx.arena.strip_typedefs(value.ty());
    let (pos, _) = tag_field(ctx.arena, ty)?;
    let ptr = read_pointer(ctx, address + pos / 8).ok()?;
    (ptr != 0).then_some(ptr)
}

fn read_pointer(ctx: &FixCtx<'_>, address: u64) -> Result<u64>
{
    let bytes = ctx
        .memory
        .read_memory(address, ctx.layout.pointer_size as usize)?;
    Ok(crate::bits::scalar_from_bytes(&bytes, ctx.layout.endian, false)? as u64)
}

fn read_offset(ctx: &FixCtx<'_>, address: u64) -> Result<i64>
{
    let bytes = ctx
        .memory
        .read_memory(address, ctx.layout.pointer_size as usize)?;
    crate::bits::scalar_from_bytes(&bytes, ctx.layout.endian, true)
}

fn read_cstring(ctx: &FixCtx<'_>, address: u64) -> Result<String>
{
    let mut out = Vec::new();
    for i in 0..MAX_TAG_NAME as u64 {
        let byte = ctx.memory.read_memory(address + i, 1)?;
        if byte[0] == 0 {
            break;
        }
        out.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

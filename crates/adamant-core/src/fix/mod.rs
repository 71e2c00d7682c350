//! Dynamic type resolution ("fixing").
//!
//! Compile-time descriptions of discriminated records, dynamic arrays and
//! packed data only become concrete in the presence of one specific
//! object. Fixing takes such a template type plus the object's address or
//! contents and produces a type every downstream consumer can treat as
//! ordinary: bounds resolved, the live variant branch selected, packed
//! sizes propagated.
//!
//! The walk is an explicit recursion with an accumulator (the partially
//! built field list), bounded by a depth cap: template recursion depth
//! equals the nesting depth of the Ada type, never the size of user data.

mod array;
mod record;
mod tagged;

pub use array::left_justify_packed;
pub use tagged::{tag_to_type, tagged_base_value};

use tracing::debug;

use crate::diag::WarnBudget;
use crate::error::{AdamantError, Result};
use crate::symtab::{Domain, SymbolTable};
use crate::types::{TypeArena, TypeId, TypeKind};
use crate::value::{TargetLayout, TargetMemory, Value};

/// Nesting cap; beyond this the debug information is cyclic or malformed.
const MAX_FIX_DEPTH: usize = 64;

/// Borrowed context for one fixing request.
///
/// Carries the arena the fixed nodes go into, the target access layer,
/// symbol lookup for auxiliary variables, and the evaluation's warning
/// budget. Build one per top-level evaluation.
pub struct FixCtx<'a>
{
    pub arena: &'a mut TypeArena,
    pub memory: &'a dyn TargetMemory,
    pub symbols: &'a dyn SymbolTable,
    pub layout: TargetLayout,
    pub warn: &'a mut WarnBudget,
}

impl<'a> FixCtx<'a>
{
    pub fn new(
        arena: &'a mut TypeArena,
        memory: &'a dyn TargetMemory,
        symbols: &'a dyn SymbolTable,
        layout: TargetLayout,
        warn: &'a mut WarnBudget,
    ) -> Self
    {
        Self {
            arena,
            memory,
            symbols,
            layout,
            warn,
        }
    }
}

/// Fix `template` against an optional enclosing-record value and address.
///
/// Non-aggregate types come back unchanged; so does anything already
/// fixed, making the operation idempotent.
pub fn fix_type(
    ctx: &mut FixCtx<'_>,
    template: TypeId,
    dval: Option<&Value>,
    address: Option<u64>,
) -> Result<TypeId>
{
    fix_type_at_depth(ctx, template, dval, address, 0)
}

pub(crate) fn fix_type_at_depth(
    ctx: &mut FixCtx<'_>,
    template: TypeId,
    dval: Option<&Value>,
    address: Option<u64>,
    depth: usize,
) -> Result<TypeId>
{
    if depth > MAX_FIX_DEPTH {
        return Err(AdamantError::NestingTooDeep(type_label(ctx.arena, template)));
    }
    let id = ctx.arena.strip_typedefs(template);
    let node = ctx.arena.get(id);
    if node.fixed {
        return Ok(id);
    }
    match &node.kind {
        TypeKind::Record { .. } => record::fix_record(ctx, id, dval, address, depth),
        TypeKind::Union { .. } => record::fix_union(ctx, id, dval, depth),
        TypeKind::Array { .. } => array::fix_array(ctx, id, dval, depth),
        TypeKind::FixedPoint { .. } => array::fix_fixed_point(ctx, id),
        _ => Ok(id),
    }
}

/// Fix a value: adjust a tagged object to its primary base address, switch
/// to the type its runtime tag names, then fix that type against the
/// object.
pub fn fix_value(ctx: &mut FixCtx<'_>, value: &Value) -> Result<Value>
{
    let mut value = tagged::tagged_base_value(ctx, value)?;

    if let Some(derived) = tagged::derived_type_of(ctx, &value) {
        let current = ctx.arena.strip_typedefs(value.ty());
        if derived != current {
            debug!(
                from = %type_label(ctx.arena, current),
                to = %type_label(ctx.arena, derived),
                "retyping tagged object from its runtime tag"
            );
            value = value.with_type(derived);
        }
    }

    let address = value.address();
    let fixed = fix_type(ctx, value.ty(), Some(&value), address)?;
    let fixed_value = value.with_type(fixed);
    Ok(array::left_justify_packed(ctx, &fixed_value))
}

/// Integer value of a named compiler-generated variable (bound and size
/// variables such as `x___L` or `t___XVZ`).
pub(crate) fn int_var_value(ctx: &mut FixCtx<'_>, name: &str) -> Option<i64>
{
    let symbols = ctx
        .symbols
        .global_symbols(Domain::Variable, &|linkage| linkage == name);
    let symbol = symbols.iter().find(|s| s.address.is_some())?;
    let address = symbol.address?;
    let size = symbol
        .ty
        .and_then(|ty| ctx.arena.byte_size(ty))
        .unwrap_or(u64::from(ctx.layout.pointer_size));
    let bytes = ctx.memory.read_memory(address, size as usize).ok()?;
    let signed = symbol.ty.is_none_or(|ty| ctx.arena.is_signed(ty));
    crate::bits::scalar_from_bytes(&bytes, ctx.layout.endian, signed).ok()
}

pub(crate) fn type_label(arena: &TypeArena, id: TypeId) -> String
{
    arena
        .get(id)
        .name
        .clone()
        .unwrap_or_else(|| format!("<anonymous type {}>", id.index()))
}

//! Overload and enumeration-literal disambiguation.
//!
//! Candidate filtering is deliberately loose: the debugger sees values,
//! not expressions typed by a compiler, so any discrete actual satisfies
//! any discrete formal and descriptor shapes count as arrays. Whatever
//! ambiguity survives is handed back to the caller, whose UI owns the
//! interactive choice.

use crate::descriptor;
use crate::names;
use crate::symtab::{StorageClass, Symbol};
use crate::types::{EnumLiteral, TypeArena, TypeId, TypeKind};

/// Outcome of candidate resolution.
#[derive(Debug)]
pub enum Resolution
{
    /// Exactly one candidate survived.
    Resolved(Symbol),
    /// Several plausible candidates remain, sorted for presentation by
    /// trailing disambiguation number, then name. The interactive choice
    /// happens outside the engine.
    Ambiguous(Vec<Symbol>),
    /// Nothing matched.
    NoMatch,
}

/// Resolve a call `f(a1..an)` against `candidates`.
///
/// Candidates must match the call's arity and each actual loosely; when
/// `expected_return` is known, candidates whose return type matches it are
/// preferred, but a return mismatch alone never empties the result.
#[must_use]
pub fn resolve_call(
    arena: &TypeArena,
    candidates: &[Symbol],
    actuals: &[TypeId],
    expected_return: Option<TypeId>,
) -> Resolution
{
    let arity_ok: Vec<&Symbol> = candidates
        .iter()
        .filter(|s| args_match(arena, s, actuals))
        .collect();

    let survivors = match expected_return {
        Some(expected) => {
            let strict: Vec<&Symbol> = arity_ok
                .iter()
                .copied()
                .filter(|s| return_matches(arena, s, expected))
                .collect();
            if strict.is_empty() { arity_ok } else { strict }
        }
        None => arity_ok,
    };
    finish(survivors)
}

/// Resolve a variable or enumeration-literal reference.
///
/// With an enumeration context type, a literal of that very type wins
/// outright; failing that, a literal of a structurally identical enum
/// (a type and its unconstrained subtype copy produce two) is accepted.
#[must_use]
pub fn resolve_variable(
    arena: &TypeArena,
    candidates: &[Symbol],
    context: Option<TypeId>,
) -> Resolution
{
    match candidates.len() {
        0 => return Resolution::NoMatch,
        1 => return Resolution::Resolved(candidates[0].clone()),
        _ => {}
    }

    if let Some(expected) = context {
        let expected = arena.strip_typedefs(expected);
        if matches!(arena.get(expected).kind, TypeKind::Enum { .. }) {
            if let Some(sym) = candidates
                .iter()
                .find(|s| s.ty.map(|t| arena.strip_typedefs(t)) == Some(expected))
            {
                return Resolution::Resolved(sym.clone());
            }
            if let Some(sym) = candidates.iter().find(|s| {
                s.ty.is_some_and(|t| identical_enums(arena, arena.strip_typedefs(t), expected))
            }) {
                return Resolution::Resolved(sym.clone());
            }
        }
    }
    finish(candidates.iter().collect())
}

/// Classify a symbol that stands for a renaming declaration, splitting
/// out the renamed entity and the selector expression text for the
/// expression evaluator.
#[must_use]
pub fn parse_renaming(symbol: &Symbol) -> Option<names::Renaming<'_>>
{
    match symbol.storage {
        StorageClass::Static
        | StorageClass::Local
        | StorageClass::Computed
        | StorageClass::OptimizedOut => names::parse_renaming(symbol.linkage_name()),
        _ => None,
    }
}

fn finish(survivors: Vec<&Symbol>) -> Resolution
{
    match survivors.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Resolved(survivors[0].clone()),
        _ => {
            let mut list: Vec<Symbol> = survivors.into_iter().cloned().collect();
            list.sort_by_key(|s| sort_key(s.linkage_name()));
            Resolution::Ambiguous(list)
        }
    }
}

fn sort_key(linkage: &str) -> (String, u64)
{
    let base = names::strip_homonym_digits(linkage);
    let number = linkage[base.len()..]
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0);
    (base.to_string(), number)
}

fn args_match(arena: &TypeArena, symbol: &Symbol, actuals: &[TypeId]) -> bool
{
    let Some(ty) = symbol.ty else {
        return false;
    };
    let id = arena.strip_typedefs(ty);
    match &arena.get(id).kind {
        // An enumeration literal resolves like a parameterless function.
        TypeKind::Enum { .. } if symbol.storage == StorageClass::Constant => actuals.is_empty(),
        TypeKind::Function { params, .. } => {
            params.len() == actuals.len()
                && params
                    .iter()
                    .zip(actuals)
                    .all(|(formal, actual)| type_match(arena, *formal, *actual))
        }
        _ => false,
    }
}

fn return_matches(arena: &TypeArena, symbol: &Symbol, expected: TypeId) -> bool
{
    let Some(ty) = symbol.ty else {
        return false;
    };
    let id = arena.strip_typedefs(ty);
    match &arena.get(id).kind {
        TypeKind::Function { ret: Some(ret), .. } => type_match(arena, *ret, expected),
        TypeKind::Enum { .. } => type_match(arena, id, expected),
        _ => false,
    }
}

/// Loose formal/actual compatibility.
#[must_use]
pub fn type_match(arena: &TypeArena, formal: TypeId, actual: TypeId) -> bool
{
    let mut f = arena.strip_typedefs(formal);
    let mut a = arena.strip_typedefs(actual);
    if let TypeKind::Reference { target } = &arena.get(f).kind {
        f = arena.strip_typedefs(*target);
    }
    if let TypeKind::Reference { target } = &arena.get(a).kind {
        a = arena.strip_typedefs(*target);
    }

    match (&arena.get(f).kind, &arena.get(a).kind) {
        (TypeKind::Pointer { target: ft }, TypeKind::Pointer { target: at }) => {
            type_match(arena, *ft, *at)
        }
        // A null literal reaches us typed as an integer.
        (TypeKind::Pointer { .. }, TypeKind::Integer { .. }) => true,
        (
            TypeKind::Integer { .. } | TypeKind::Range { .. } | TypeKind::Enum { .. },
            TypeKind::Integer { .. } | TypeKind::Range { .. } | TypeKind::Enum { .. },
        ) => true,
        (TypeKind::Array { .. }, _) => array_like_match(arena, f, a),
        (TypeKind::Record { .. }, _) if descriptor::is_unconstrained_array(arena, f) => {
            array_like_match(arena, f, a)
        }
        (TypeKind::Record { .. }, TypeKind::Record { .. }) => {
            !descriptor::is_unconstrained_array(arena, a)
        }
        (fk, ak) => std::mem::discriminant(fk) == std::mem::discriminant(ak),
    }
}

/// Arrays and array descriptors are interchangeable when their arity and
/// element types agree.
fn array_like_match(arena: &TypeArena, f: TypeId, a: TypeId) -> bool
{
    let actual_is_array = matches!(arena.get(a).kind, TypeKind::Array { .. })
        || descriptor::is_unconstrained_array(arena, a);
    if !actual_is_array {
        return false;
    }
    let dims = descriptor::arity(arena, f);
    if dims != descriptor::arity(arena, a) {
        return false;
    }
    match (
        descriptor::element_type(arena, f, dims),
        descriptor::element_type(arena, a, dims),
    ) {
        (Some(fe), Some(ae)) => type_match(arena, fe, ae),
        _ => false,
    }
}

/// Whether two enumerations are the same type in all but node identity:
/// same arity, same values, same literal names modulo trailing
/// disambiguation digits.
fn identical_enums(arena: &TypeArena, left: TypeId, right: TypeId) -> bool
{
    let (TypeKind::Enum { literals: l }, TypeKind::Enum { literals: r }) =
        (&arena.get(left).kind, &arena.get(right).kind)
    else {
        return false;
    };
    l.len() == r.len()
        && l.iter().zip(r).all(|(a, b)| {
            a.value == b.value && literal_stem(a) == literal_stem(b)
        })
}

fn literal_stem(literal: &EnumLiteral) -> &str
{
    names::strip_homonym_digits(&literal.name)
}

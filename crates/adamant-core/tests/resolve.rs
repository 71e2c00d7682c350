//! Tests for scoped lookup, overload resolution and renaming decode.

use adamant_core::resolve::overload::{
    parse_renaming, resolve_call, resolve_variable, Resolution,
};
use adamant_core::resolve::{lookup_symbols, SymbolCache};
use adamant_core::symtab::{
    BlockId, Domain, InMemorySymbolTable, StorageClass, Symbol,
};
use adamant_core::types::{EnumLiteral, TypeArena, TypeId, TypeKind, TypeNode};

fn int_and_float(arena: &mut TypeArena) -> (TypeId, TypeId)
{
    let int4 =
        arena.intern(TypeNode::named("standard__integer", TypeKind::Integer { signed: true }).sized(4));
    let float4 = arena.intern(TypeNode::named("standard__float", TypeKind::Float).sized(4));
    (int4, float4)
}

fn function(arena: &mut TypeArena, params: Vec<TypeId>, ret: TypeId) -> TypeId
{
    arena.intern(TypeNode::new(TypeKind::Function { params, ret: Some(ret) }))
}

#[test]
fn test_overload_selected_by_actual_type()
{
    let mut arena = TypeArena::new();
    let (int4, float4) = int_and_float(&mut arena);
    let f_int = function(&mut arena, vec![int4], int4);
    let f_float = function(&mut arena, vec![float4], float4);

    let candidates = vec![
        Symbol::new("pack__f", Domain::Function).with_type(f_int),
        Symbol::new("pack__f__2", Domain::Function).with_type(f_float),
    ];

    // One float actual and no expected return type: only the second
    // candidate fits.
    let result = resolve_call(&arena, &candidates, &[float4], None);
    let Resolution::Resolved(symbol) = result else {
        panic!("expected a unique resolution");
    };
    assert_eq!(symbol.linkage_name(), "pack__f__2");
}

#[test]
fn test_overload_return_context_breaks_ties()
{
    let mut arena = TypeArena::new();
    let (int4, float4) = int_and_float(&mut arena);
    let f_int = function(&mut arena, vec![int4], int4);
    let f_float = function(&mut arena, vec![int4], float4);

    let candidates = vec![
        Symbol::new("pack__g", Domain::Function).with_type(f_int),
        Symbol::new("pack__g__2", Domain::Function).with_type(f_float),
    ];

    // Both accept an integer actual; the expected float return decides.
    let result = resolve_call(&arena, &candidates, &[int4], Some(float4));
    let Resolution::Resolved(symbol) = result else {
        panic!("expected a unique resolution");
    };
    assert_eq!(symbol.linkage_name(), "pack__g__2");

    // Without the context both survive, sorted for presentation.
    let result = resolve_call(&arena, &candidates, &[int4], None);
    let Resolution::Ambiguous(list) = result else {
        panic!("expected an ambiguity");
    };
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].linkage_name(), "pack__g");
}

#[test]
fn test_overload_no_match_reported()
{
    let mut arena = TypeArena::new();
    let (int4, float4) = int_and_float(&mut arena);
    let f_int = function(&mut arena, vec![int4], int4);
    let candidates = vec![Symbol::new("pack__f", Domain::Function).with_type(f_int)];

    // Arity mismatch.
    assert!(matches!(
        resolve_call(&arena, &candidates, &[float4, float4], None),
        Resolution::NoMatch
    ));
}

#[test]
fn test_null_literal_matches_access_formal()
{
    let mut arena = TypeArena::new();
    let (int4, _) = int_and_float(&mut arena);
    let access = arena.intern(TypeNode::new(TypeKind::Pointer { target: int4 }).sized(8));
    let f_access = function(&mut arena, vec![access], int4);
    let candidates = vec![Symbol::new("pack__h", Domain::Function).with_type(f_access)];

    // A null literal reaches resolution typed as an integer.
    assert!(matches!(
        resolve_call(&arena, &candidates, &[int4], None),
        Resolution::Resolved(_)
    ));
}

fn enum_type(arena: &mut TypeArena, name: &str, suffix: &str) -> TypeId
{
    let literals = ["red", "green", "blue"]
        .iter()
        .enumerate()
        .map(|(i, lit)| EnumLiteral {
            name: format!("{lit}{suffix}"),
            value: i as i64,
        })
        .collect();
    arena.intern(TypeNode::named(name, TypeKind::Enum { literals }).sized(1))
}

#[test]
fn test_enum_literal_collapses_identical_copies()
{
    let mut arena = TypeArena::new();
    // A type and its subtype copy: same values, names differing only by
    // a trailing disambiguation suffix.
    let color = enum_type(&mut arena, "pack__color", "");
    let color_base = enum_type(&mut arena, "pack__color_base", "__2");

    let candidates = vec![
        Symbol::new("pack__red", Domain::Variable)
            .with_type(color)
            .with_storage(StorageClass::Constant),
        Symbol::new("pack__red__2", Domain::Variable)
            .with_type(color_base)
            .with_storage(StorageClass::Constant),
    ];

    // Context type referentially equal to one candidate's type.
    let result = resolve_variable(&arena, &candidates, Some(color_base));
    let Resolution::Resolved(symbol) = result else {
        panic!("expected a unique resolution");
    };
    assert_eq!(symbol.linkage_name(), "pack__red__2");

    // Context type identical to both but referentially equal to neither:
    // the structural identity collapses the apparent ambiguity.
    let color_copy = enum_type(&mut arena, "pack__color__copy", "");
    let result = resolve_variable(&arena, &candidates, Some(color_copy));
    assert!(matches!(result, Resolution::Resolved(_)));
}

#[test]
fn test_wild_and_full_lookup()
{
    let mut table = InMemorySymbolTable::new();
    table.add_global(Symbol::new("pack__child__counter", Domain::Variable));
    table.add_global(Symbol::new("pack__child__counter_shadow", Domain::Variable));
    table.add_global(Symbol::new("other__counter__2", Domain::Variable));

    // Unqualified: wild matching finds both package-qualified symbols.
    let hits = lookup_symbols(&table, None, "Counter", None, Domain::Variable);
    assert_eq!(hits.len(), 2);

    // Qualified: full matching pins the package.
    let hits = lookup_symbols(&table, None, "pack.child.counter", None, Domain::Variable);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].linkage_name(), "pack__child__counter");
}

#[test]
fn test_innermost_block_shadows_globals()
{
    let mut table = InMemorySymbolTable::new();
    table.add_block(BlockId(0), None, true);
    table.add_block(BlockId(1), Some(BlockId(0)), false);
    table.add_global(Symbol::new("counter", Domain::Variable));
    table.add_block_symbol(
        BlockId(1),
        Symbol::new("counter", Domain::Variable).with_storage(StorageClass::Local),
    );

    let hits = lookup_symbols(&table, None, "counter", Some(BlockId(1)), Domain::Variable);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].storage, StorageClass::Local);
}

#[test]
fn test_cache_serves_and_invalidates_global_lookups()
{
    let mut table = InMemorySymbolTable::new();
    table.add_global(Symbol::new("pack__obj", Domain::Variable));
    let mut cache = SymbolCache::new();

    let first = lookup_symbols(&table, Some(&mut cache), "pack.obj", None, Domain::Variable);
    assert_eq!(first.len(), 1);
    assert_eq!(cache.len(), 1);

    // A later module load changes what the name means.
    table.add_global(Symbol::new("pack__obj", Domain::Variable).with_address(0x10));
    let stale = lookup_symbols(&table, Some(&mut cache), "pack.obj", None, Domain::Variable);
    assert_eq!(stale.len(), 1);

    cache.invalidate();
    let fresh = lookup_symbols(&table, Some(&mut cache), "pack.obj", None, Domain::Variable);
    assert_eq!(fresh.len(), 2);
}

#[test]
fn test_local_lookups_bypass_the_cache()
{
    let mut table = InMemorySymbolTable::new();
    table.add_block(BlockId(0), None, true);
    table.add_block_symbol(BlockId(0), Symbol::new("local_obj", Domain::Variable));
    let mut cache = SymbolCache::new();

    let hits = lookup_symbols(&table, Some(&mut cache), "local_obj", Some(BlockId(0)), Domain::Variable);
    assert_eq!(hits.len(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_duplicate_stubs_collapse_to_the_defined_symbol()
{
    let mut arena = TypeArena::new();
    let (int4, _) = int_and_float(&mut arena);
    let mut table = InMemorySymbolTable::new();
    table.add_global(Symbol::new("pack__obj", Domain::Variable).with_address(0x20));
    table.add_global(
        Symbol::new("pack__obj", Domain::Variable)
            .with_address(0x20)
            .with_type(int4),
    );

    let hits = lookup_symbols(&table, None, "pack.obj", None, Domain::Variable);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].ty.is_some());
}

#[test]
fn test_renaming_symbol_is_split_for_the_evaluator()
{
    let symbol = Symbol::new(
        "pack__alias___XR_pack__target___XEall",
        Domain::Variable,
    )
    .with_storage(StorageClass::Static);

    let renaming = parse_renaming(&symbol).unwrap();
    assert_eq!(renaming.renamed_entity, "pack__target");
    assert_eq!(renaming.selector, "all");

    // Arguments are never renamings.
    let arg = Symbol::new("pack__alias___XR_pack__target___XEall", Domain::Variable)
        .with_storage(StorageClass::Argument);
    assert!(parse_renaming(&arg).is_none());
}

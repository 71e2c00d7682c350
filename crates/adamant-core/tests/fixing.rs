//! Tests for the dynamic type-fixing engine.

use adamant_core::bits::Endian;
use adamant_core::diag::WarnBudget;
use adamant_core::fix::{fix_type, fix_value, tagged_base_value, FixCtx};
use adamant_core::symtab::{Domain, InMemorySymbolTable, Symbol};
use adamant_core::types::{
    Bound, Choice, Field, TypeArena, TypeId, TypeKind, TypeNode, Variant,
};
use adamant_core::value::{BufferMemory, TargetLayout, Value};
use smallvec::smallvec;

fn layout() -> TargetLayout
{
    TargetLayout::new(Endian::Little, 8)
}

fn scalar_types(arena: &mut TypeArena) -> (TypeId, TypeId, TypeId)
{
    let bool1 = arena.intern(TypeNode::named("standard__boolean", TypeKind::Bool).sized(1));
    let int4 =
        arena.intern(TypeNode::named("standard__integer", TypeKind::Integer { signed: true }).sized(4));
    let float4 = arena.intern(TypeNode::named("standard__float", TypeKind::Float).sized(4));
    (bool1, int4, float4)
}

/// Record with a variant part selected by a leading boolean discriminant:
/// an integer payload when the discriminant is 0, a float when it is 1.
fn variant_record(arena: &mut TypeArena) -> TypeId
{
    let (bool1, int4, float4) = scalar_types(arena);
    let union = arena.intern(
        TypeNode::named(
            "pack__rec__disc___XVN",
            TypeKind::Union {
                discriminant: Some("disc".to_string()),
                variants: vec![
                    Variant { choices: smallvec![Choice::Exact(0)], ty: int4 },
                    Variant { choices: smallvec![Choice::Exact(1)], ty: float4 },
                ],
            },
        )
        .sized(4),
    );
    arena.intern(
        TypeNode::named(
            "pack__rec",
            TypeKind::Record {
                fields: vec![
                    Field::new("disc", bool1).at_bit(0),
                    Field::new("payload", union).at_bit(32),
                ],
            },
        )
        .sized(8),
    )
}

#[test]
fn test_variant_selection_follows_discriminant()
{
    let mut arena = TypeArena::new();
    let rec = variant_record(&mut arena);
    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();

    // disc = 1 selects the float branch.
    let memory = BufferMemory::new(0x100, vec![1, 0, 0, 0, 0, 0, 0x80, 0x3f]);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
    let value = Value::from_target(rec, 0x100);
    let fixed = fix_value(&mut ctx, &value).unwrap();

    let node = arena.get(fixed.ty());
    assert!(node.fixed);
    assert_eq!(node.byte_size, Some(8));
    let TypeKind::Record { fields } = &node.kind else {
        panic!("expected a record");
    };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].bit_pos, Some(0));
    assert_eq!(fields[1].bit_pos, Some(32));
    assert!(matches!(arena.get(fields[1].ty).kind, TypeKind::Float));
}

#[test]
fn test_variant_prefix_offsets_are_branch_independent()
{
    let mut arena = TypeArena::new();
    let rec = variant_record(&mut arena);
    let symbols = InMemorySymbolTable::new();

    let mut positions = Vec::new();
    for disc in [0u8, 1u8] {
        let mut warn = WarnBudget::new();
        let memory = BufferMemory::new(0x100, vec![disc, 0, 0, 0, 7, 0, 0, 0]);
        let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
        let fixed = fix_value(&mut ctx, &Value::from_target(rec, 0x100)).unwrap();
        let TypeKind::Record { fields } = &arena.get(fixed.ty()).kind else {
            panic!("expected a record");
        };
        positions.push((fields[0].bit_pos, fields[0].bit_size));
    }
    assert_eq!(positions[0], positions[1]);
}

#[test]
fn test_unmatched_variant_without_others_disappears()
{
    let mut arena = TypeArena::new();
    let rec = variant_record(&mut arena);
    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();

    // disc = 5 matches neither branch and there is no others choice.
    let memory = BufferMemory::new(0x100, vec![5, 0, 0, 0, 0, 0, 0, 0]);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
    let fixed = fix_value(&mut ctx, &Value::from_target(rec, 0x100)).unwrap();

    let node = arena.get(fixed.ty());
    let TypeKind::Record { fields } = &node.kind else {
        panic!("expected a record");
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "disc");
    // The record shrank to its prefix.
    assert_eq!(node.byte_size, Some(1));
}

#[test]
fn test_fix_type_is_idempotent()
{
    let mut arena = TypeArena::new();
    let rec = variant_record(&mut arena);
    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    let memory = BufferMemory::new(0x100, vec![0, 0, 0, 0, 9, 0, 0, 0]);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);

    let value = Value::from_target(rec, 0x100);
    let once = fix_type(&mut ctx, rec, Some(&value), Some(0x100)).unwrap();
    let twice = fix_type(&mut ctx, once, Some(&value), Some(0x100)).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_dynamic_field_resolved_through_discriminant()
{
    let mut arena = TypeArena::new();
    let (_, int4, _) = scalar_types(&mut arena);

    // type vrec (n : integer) is record data : array (1 .. n) of integer;
    let index = arena.intern(TypeNode::named(
        "pack__vrec__data__index",
        TypeKind::Range {
            base: int4,
            low: Bound::Constant(1),
            high: Bound::Discriminant("n".to_string()),
        },
    ));
    let data = arena.intern(TypeNode::named(
        "pack__vrec__data",
        TypeKind::Array {
            index,
            element: int4,
            element_bit_size: None,
        },
    ));
    let data_ptr = arena.intern(TypeNode::new(TypeKind::Pointer { target: data }).sized(8));
    let rec = arena.intern(
        TypeNode::named(
            "pack__vrec",
            TypeKind::Record {
                fields: vec![
                    Field::new("n", int4).at_bit(0),
                    Field::new("data___XVL", data_ptr).at_bit(32),
                ],
            },
        )
        .sized(16),
    );

    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    // n = 3, then three elements.
    let mut bytes = vec![3, 0, 0, 0];
    for v in [10i32, 20, 30] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    let memory = BufferMemory::new(0x200, bytes);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
    let fixed = fix_value(&mut ctx, &Value::from_target(rec, 0x200)).unwrap();

    let node = arena.get(fixed.ty());
    assert_eq!(node.byte_size, Some(16));
    let TypeKind::Record { fields } = &node.kind else {
        panic!("expected a record");
    };
    let array = arena.get(fields[1].ty);
    assert!(array.fixed);
    assert_eq!(array.byte_size, Some(12));
}

#[test]
fn test_packed_array_length_from_name_marker()
{
    let mut arena = TypeArena::new();
    let (bool1, int4, _) = scalar_types(&mut arena);
    let index = arena.intern(TypeNode::named(
        "pack__flags__index",
        TypeKind::Range {
            base: int4,
            low: Bound::Constant(1),
            high: Bound::Constant(10),
        },
    ));
    let arr = arena.intern(TypeNode::named(
        "pack__flags___XP1",
        TypeKind::Array {
            index,
            element: bool1,
            element_bit_size: None,
        },
    ));

    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    let memory = BufferMemory::new(0, vec![0; 4]);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
    let fixed = fix_type(&mut ctx, arr, None, None).unwrap();

    let node = arena.get(fixed);
    // Ten one-bit elements round up to two bytes.
    assert_eq!(node.byte_size, Some(2));
    let TypeKind::Array { element_bit_size, .. } = &node.kind else {
        panic!("expected an array");
    };
    assert_eq!(*element_bit_size, Some(1));
}

#[test]
fn test_size_variable_overrides_computed_length()
{
    let mut arena = TypeArena::new();
    let (_, int4, _) = scalar_types(&mut arena);
    // One unplaced field forces the dynamic path.
    let rec = arena.intern(TypeNode::named(
        "pack__zrec",
        TypeKind::Record {
            fields: vec![Field::new("a", int4)],
        },
    ));

    let mut symbols = InMemorySymbolTable::new();
    symbols.add_global(
        Symbol::new("pack__zrec___XVZ", Domain::Variable)
            .with_type(int4)
            .with_address(0x900),
    );
    let mut warn = WarnBudget::new();
    let mut bytes = vec![0u8; 0x100];
    bytes.extend_from_slice(&16i32.to_le_bytes()); // the XVZ variable at 0x900
    let memory = BufferMemory::new(0x800, bytes);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);

    let fixed = fix_type(&mut ctx, rec, None, Some(0x800)).unwrap();
    assert_eq!(arena.get(fixed).byte_size, Some(16));
}

#[test]
fn test_unresolved_bound_degrades_to_zero_with_warning()
{
    let mut arena = TypeArena::new();
    let (_, int4, _) = scalar_types(&mut arena);
    let index = arena.intern(TypeNode::named(
        "pack__mystery__index",
        TypeKind::Range {
            base: int4,
            low: Bound::Constant(1),
            high: Bound::Unresolved,
        },
    ));
    let arr = arena.intern(TypeNode::named(
        "pack__mystery",
        TypeKind::Array {
            index,
            element: int4,
            element_bit_size: None,
        },
    ));

    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    let memory = BufferMemory::new(0, vec![]);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);
    let fixed = fix_type(&mut ctx, arr, None, None).unwrap();

    // high = 0, low = 1: an empty array rather than a failure.
    assert_eq!(arena.get(fixed).byte_size, Some(0));
    assert_eq!(warn.emitted(), 1);
}

#[test]
fn test_zero_offset_to_top_leaves_object_in_place()
{
    let mut arena = TypeArena::new();
    let dispatch = arena.intern(TypeNode::named(
        "pack__shape__dispatch",
        TypeKind::Record { fields: vec![] },
    ));
    let tag_ptr = arena.intern(TypeNode::new(TypeKind::Pointer { target: dispatch }).sized(8));
    let shape = arena.intern(
        TypeNode::named(
            "pack__shape",
            TypeKind::Record {
                fields: vec![Field::new("_tag", tag_ptr).at_bit(0)],
            },
        )
        .sized(8),
    );

    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    // Object at 0x1000 tagged 0x1100; offset_to_top at 0x10f0 is zero.
    let mut bytes = vec![0u8; 0x200];
    bytes[0..8].copy_from_slice(&0x1100u64.to_le_bytes());
    let memory = BufferMemory::new(0x1000, bytes);
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);

    let value = Value::from_target(shape, 0x1000);
    let adjusted = tagged_base_value(&mut ctx, &value).unwrap();
    assert_eq!(adjusted.address(), Some(0x1000));
}

#[test]
fn test_tag_resolves_to_derived_type()
{
    let mut arena = TypeArena::new();
    let (_, int4, _) = scalar_types(&mut arena);
    let byte = arena.intern(TypeNode::named("standard__character", TypeKind::Char).sized(1));
    let cstr = arena.intern(TypeNode::new(TypeKind::Pointer { target: byte }).sized(8));

    let dispatch = arena.intern(TypeNode::named(
        "pack__shape__dispatch",
        TypeKind::Record { fields: vec![] },
    ));
    let tag_ptr = arena.intern(TypeNode::new(TypeKind::Pointer { target: dispatch }).sized(8));
    let shape = arena.intern(
        TypeNode::named(
            "pack__shape",
            TypeKind::Record {
                fields: vec![Field::new("_tag", tag_ptr).at_bit(0)],
            },
        )
        .sized(8),
    );
    let circle = arena.intern(
        TypeNode::named(
            "pack__circle",
            TypeKind::Record {
                fields: vec![
                    Field::new("_tag", tag_ptr).at_bit(0),
                    Field::new("radius", int4).at_bit(64),
                ],
            },
        )
        .sized(16),
    );
    arena.intern(
        TypeNode::named(
            "ada__tags__type_specific_data",
            TypeKind::Record {
                fields: vec![Field::new("expanded_name", cstr).at_bit(0)],
            },
        )
        .sized(8),
    );

    // 0x1000 object: tag = 0x1100
    // 0x10f0 offset_to_top = 0, 0x10f8 tsd pointer = 0x1200
    // 0x1200 tsd: expanded_name = 0x1300
    // 0x1300 "Pack.Circle\0"
    let mut bytes = vec![0u8; 0x400];
    bytes[0x000..0x008].copy_from_slice(&0x1100u64.to_le_bytes());
    bytes[0x0f8..0x100].copy_from_slice(&0x1200u64.to_le_bytes());
    bytes[0x200..0x208].copy_from_slice(&0x1300u64.to_le_bytes());
    bytes[0x300..0x30c].copy_from_slice(b"Pack.Circle\0");
    let memory = BufferMemory::new(0x1000, bytes);

    let symbols = InMemorySymbolTable::new();
    let mut warn = WarnBudget::new();
    let mut ctx = FixCtx::new(&mut arena, &memory, &symbols, layout(), &mut warn);

    let value = Value::from_target(shape, 0x1000);
    let fixed = fix_value(&mut ctx, &value).unwrap();
    assert_eq!(fixed.ty(), circle);
    assert_eq!(fixed.address(), Some(0x1000));
}

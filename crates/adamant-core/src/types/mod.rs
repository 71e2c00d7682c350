//! Debug-info type model.
//!
//! Types arriving from the debug-info reader form a graph: arrays reference
//! index and element types, records reference field types, and GNAT's
//! parallel types reference each other by name. Nodes live in a
//! [`TypeArena`] and point at each other through stable [`TypeId`] handles,
//! so no node ever borrows another.

use smallvec::SmallVec;

mod arena;

pub use arena::TypeArena;

/// Stable handle to a node in a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId
{
    /// Index of the node inside its arena.
    #[must_use]
    pub fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// A bound of a range or array-index type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound
{
    /// Known at compile time.
    Constant(i64),
    /// Read from a named discriminant of the enclosing record.
    Discriminant(String),
    /// Read from a named compiler-generated variable in the program.
    Variable(String),
    /// Not resolvable without a live object.
    Unresolved,
}

impl Bound
{
    #[must_use]
    pub fn constant(&self) -> Option<i64>
    {
        match self {
            Bound::Constant(v) => Some(*v),
            _ => None,
        }
    }
}

/// One enumeration literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumLiteral
{
    pub name: String,
    pub value: i64,
}

/// One component of a record or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field
{
    pub name: String,
    pub ty: TypeId,
    /// Bit position from the start of the record; `None` until the layout
    /// has been resolved against a concrete object.
    pub bit_pos: Option<u64>,
    /// Declared bit size; 0 means the natural size of the field type.
    pub bit_size: u64,
}

impl Field
{
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self
    {
        Self {
            name: name.into(),
            ty,
            bit_pos: None,
            bit_size: 0,
        }
    }

    #[must_use]
    pub fn at_bit(mut self, bit_pos: u64) -> Self
    {
        self.bit_pos = Some(bit_pos);
        self
    }

    #[must_use]
    pub fn sized_bits(mut self, bit_size: u64) -> Self
    {
        self.bit_size = bit_size;
        self
    }
}

/// A discrete choice guarding a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice
{
    /// A single discriminant value
    Exact(i64),
    /// An inclusive span of discriminant values
    Span(i64, i64),
    /// The `others` choice
    Others,
}

impl Choice
{
    #[must_use]
    pub fn matches(&self, value: i64) -> bool
    {
        match *self {
            Choice::Exact(v) => v == value,
            Choice::Span(lo, hi) => lo <= value && value <= hi,
            Choice::Others => true,
        }
    }
}

/// One member of a variant part, guarded by its discrete choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant
{
    pub choices: SmallVec<[Choice; 2]>,
    pub ty: TypeId,
}

impl Variant
{
    #[must_use]
    pub fn matches(&self, value: i64) -> bool
    {
        self.choices.iter().any(|c| c.matches(value))
    }
}

/// Structural classification of a type node.
///
/// The set is closed on purpose: every consumer dispatches through an
/// exhaustive match, so adding a kind forces every switch site through the
/// compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind
{
    Integer
    {
        signed: bool,
    },
    Float,
    /// The machine integer scaled by `small_num / small_den` gives the
    /// logical value.
    FixedPoint
    {
        small_num: i64,
        small_den: i64,
    },
    Enum
    {
        literals: Vec<EnumLiteral>,
    },
    Bool,
    Char,
    Range
    {
        base: TypeId,
        low: Bound,
        high: Bound,
    },
    Array
    {
        index: TypeId,
        element: TypeId,
        /// Per-element bit size for packed arrays; `None` when elements
        /// sit at their natural size.
        element_bit_size: Option<u64>,
    },
    Record
    {
        fields: Vec<Field>,
    },
    Union
    {
        /// Name of the controlling discriminant in the enclosing record;
        /// `None` marks an unchecked union, which stays unresolved.
        discriminant: Option<String>,
        variants: Vec<Variant>,
    },
    Pointer
    {
        target: TypeId,
    },
    Reference
    {
        target: TypeId,
    },
    Function
    {
        params: Vec<TypeId>,
        ret: Option<TypeId>,
    },
    Typedef
    {
        target: TypeId,
    },
    Undefined,
}

/// One node of the type graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode
{
    /// Display name, also the key for parallel-type lookup.
    pub name: Option<String>,
    pub kind: TypeKind,
    /// Total size in bytes when statically known.
    pub byte_size: Option<u64>,
    /// Whether every bound, variant and packing in this node is concrete.
    pub fixed: bool,
}

impl TypeNode
{
    #[must_use]
    pub fn new(kind: TypeKind) -> Self
    {
        Self {
            name: None,
            kind,
            byte_size: None,
            fixed: false,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, kind: TypeKind) -> Self
    {
        Self {
            name: Some(name.into()),
            kind,
            byte_size: None,
            fixed: false,
        }
    }

    #[must_use]
    pub fn sized(mut self, byte_size: u64) -> Self
    {
        self.byte_size = Some(byte_size);
        self
    }

    #[must_use]
    pub fn as_fixed(mut self) -> Self
    {
        self.fixed = true;
        self
    }
}

//! # adamant-core
//!
//! Debug-information resolution engine for Ada programs compiled with
//! GNAT.
//!
//! Given the compiler's type and symbol descriptions, the engine:
//! - decodes and encodes GNAT-mangled identifiers ([`names`])
//! - turns compile-time type *templates* (unresolved array bounds, variant
//!   records, packed layouts) into concrete types for one specific object
//!   ([`fix`])
//! - decodes fat- and thin-pointer array descriptors ([`descriptor`])
//! - resolves overloaded and renamed symbol references ([`resolve`])
//!
//! ## What this crate is not
//!
//! Process control, breakpoints, expression parsing and pretty-printing
//! live in the embedding debugger. So do the symbol-table substrate and
//! target memory, which the engine reaches through the [`symtab`] traits
//! and [`value::TargetMemory`].
//!
//! ## Concurrency
//!
//! The engine is single-threaded and synchronous by design: resolution
//! re-enters shared type and symbol structures freely. Serialize access
//! from outside if the host is multi-threaded.

pub mod bits;
pub mod descriptor;
pub mod diag;
pub mod error;
pub mod fix;
pub mod names;
pub mod prelude;
pub mod resolve;
pub mod symtab;
pub mod types;
pub mod value;

pub use bits::{pack, unpack, Endian};
pub use descriptor::{array_bounds, is_unconstrained_array};
pub use diag::WarnBudget;
pub use error::{AdamantError, Result};
pub use fix::{fix_type, fix_value, tag_to_type, FixCtx};
pub use names::{decode, encode, fold_name};
pub use resolve::overload::{resolve_call, resolve_variable, Resolution};
pub use resolve::SymbolCache;
pub use symtab::{BlockId, Domain, Symbol, SymbolTable};
pub use types::{TypeArena, TypeId};
pub use value::{BufferMemory, TargetLayout, TargetMemory, Value};

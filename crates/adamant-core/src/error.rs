//! # Error Types
//!
//! General error handling for the resolution engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for resolution operations.
///
/// This enum represents all the ways a resolution request can fail.
///
/// ## Error Categories
///
/// 1. **Encoding errors**: malformed operator names, bad escape sequences
/// 2. **Missing debug information**: absent bounds or parallel-type
///    information on a path with no structural fallback
/// 3. **Request errors**: wrong index arity, undefined components,
///    attempts to modify read-only values
/// 4. **Structural errors**: cyclic or pathologically deep type descriptions
/// 5. **Target errors**: failed target-memory accesses
#[derive(Error, Debug)]
pub enum AdamantError
{
    /// A quoted name does not spell any Ada operator.
    ///
    /// Raised while encoding a name like `"&&"` that is not in the
    /// operator table. The 21 valid spellings are fixed by the compiler
    /// convention and listed in [`crate::names::OPERATOR_TABLE`].
    #[error("invalid Ada operator name: {0}")]
    InvalidOperatorName(String),

    /// A bit-level copy was asked to produce more bits than the destination
    /// buffer can hold.
    #[error("bitfield of {bit_size} bits does not fit in {dest_len} bytes")]
    BitfieldTooLarge
    {
        /// Requested width of the copy in bits
        bit_size: u64,
        /// Capacity of the destination in bytes
        dest_len: usize,
    },

    /// A bit range lies outside the buffer that is supposed to contain it.
    #[error("bit range {bit_offset}+{bit_size} exceeds a {len}-byte buffer")]
    BitRangeOutOfBounds
    {
        /// First bit of the range
        bit_offset: u64,
        /// Width of the range in bits
        bit_size: u64,
        /// Length of the buffer in bytes
        len: usize,
    },

    /// Bounds of a dynamic array could not be located anywhere: no bounds
    /// fields, no parallel type, no auxiliary variables.
    ///
    /// This is a hard error because there is no sensible guess to degrade
    /// to; an array without bounds cannot be read at all.
    #[error("could not find bounds information on {0}")]
    NoBoundsInformation(String),

    /// An indexing request supplied the wrong number of indexes.
    #[error("expected {expected} index(es), got {got}")]
    IndexArityMismatch
    {
        /// Number of dimensions of the array
        expected: usize,
        /// Number of indexes supplied
        got: usize,
    },

    /// A record component referenced by name does not exist.
    #[error("component {0} is undefined")]
    UndefinedComponent(String),

    /// The value has no writable storage behind it.
    #[error("value is not modifiable")]
    NotModifiable,

    /// Resolution stopped after hitting the nesting-depth cap.
    ///
    /// Template recursion depth equals the nesting depth of the Ada type,
    /// so this only fires on cyclic or malformed debug information.
    #[error("type nesting too deep while fixing {0}")]
    NestingTooDeep(String),

    /// A scalar read was asked to produce more than 64 bits.
    #[error("scalar of {0} bytes is too wide")]
    ScalarTooWide(usize),

    /// Reading target memory failed.
    #[error("cannot read {length} bytes at {address:#x}")]
    MemoryRead
    {
        /// Start address of the failed read
        address: u64,
        /// Number of bytes requested
        length: usize,
    },

    /// Writing target memory failed.
    #[error("cannot write {length} bytes at {address:#x}")]
    MemoryWrite
    {
        /// Start address of the failed write
        address: u64,
        /// Number of bytes to be written
        length: usize,
    },

    /// The value has no contents to operate on, typically because it has
    /// neither a backing address nor materialized bytes.
    #[error("value has no readable contents")]
    NoContents,
}

/// Convenience type alias for `Result<T, AdamantError>`.
pub type Result<T> = std::result::Result<T, AdamantError>;

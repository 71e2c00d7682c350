//! Values and target storage.
//!
//! A value pairs a type with storage that is either live target memory or
//! an in-process byte buffer. Contents are fetched lazily: constructing a
//! value for an address touches no memory until something asks for bytes.

use once_cell::unsync::OnceCell;

use crate::bits::{self, Endian};
use crate::error::{AdamantError, Result};
use crate::types::{TypeArena, TypeId};

/// Byte order and pointer width of the debugged program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout
{
    pub endian: Endian,
    /// Pointer size in bytes, typically 8 or 4
    pub pointer_size: u8,
}

impl TargetLayout
{
    #[must_use]
    pub fn new(endian: Endian, pointer_size: u8) -> Self
    {
        Self { endian, pointer_size }
    }

    /// Largest positive value of a pointer-sized signed integer.
    #[must_use]
    pub fn storage_offset_last(self) -> i64
    {
        if self.pointer_size >= 8 {
            i64::MAX
        } else {
            (1i64 << (u32::from(self.pointer_size) * 8 - 1)) - 1
        }
    }
}

/// Read/write access to the debugged program's memory.
///
/// Implemented by the embedding debugger (ptrace back end, core-file
/// reader, simulator); the engine only consumes it.
pub trait TargetMemory
{
    /// Read `length` bytes starting at `address`.
    ///
    /// ## Errors
    ///
    /// Fails when any byte of the range is unmapped or unreadable.
    fn read_memory(&self, address: u64, length: usize) -> Result<Vec<u8>>;

    /// Write `bytes` starting at `address`.
    ///
    /// ## Errors
    ///
    /// Fails when any byte of the range is unmapped or read-only.
    fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<()>;
}

/// [`TargetMemory`] over one contiguous in-process block.
///
/// Used by the test suite and by hosts that resolve against captured
/// memory images instead of a live process.
#[derive(Debug, Clone)]
pub struct BufferMemory
{
    base: u64,
    bytes: Vec<u8>,
}

impl BufferMemory
{
    #[must_use]
    pub fn new(base: u64, bytes: Vec<u8>) -> Self
    {
        Self { base, bytes }
    }

    #[must_use]
    pub fn base(&self) -> u64
    {
        self.base
    }

    fn span(&self, address: u64, length: usize) -> Result<std::ops::Range<usize>>
    {
        let start = address
            .checked_sub(self.base)
            .ok_or(AdamantError::MemoryRead { address, length })? as usize;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(AdamantError::MemoryRead { address, length })?;
        Ok(start..end)
    }
}

impl TargetMemory for BufferMemory
{
    fn read_memory(&self, address: u64, length: usize) -> Result<Vec<u8>>
    {
        let span = self.span(address, length)?;
        Ok(self.bytes[span].to_vec())
    }

    fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<()>
    {
        let span = self.span(address, bytes.len()).map_err(|_| AdamantError::MemoryWrite {
            address,
            length: bytes.len(),
        })?;
        self.bytes[span].copy_from_slice(bytes);
        Ok(())
    }
}

/// Where a value's bytes live.
#[derive(Debug, Clone)]
pub enum ValueStorage
{
    /// Live target memory, possibly a bitfield within it.
    Target
    {
        address: u64,
        /// Bit displacement from `address`, for sub-byte components
        bit_offset: u64,
        /// Width in bits; `None` means whole bytes of the type's size
        bit_size: Option<u64>,
    },
    /// Bytes already in this process.
    Buffer(Vec<u8>),
}

/// A typed value of the debugged program.
#[derive(Debug, Clone)]
pub struct Value
{
    ty: TypeId,
    storage: ValueStorage,
    fetched: OnceCell<Vec<u8>>,
}

impl Value
{
    #[must_use]
    pub fn from_target(ty: TypeId, address: u64) -> Self
    {
        Self {
            ty,
            storage: ValueStorage::Target {
                address,
                bit_offset: 0,
                bit_size: None,
            },
            fetched: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_bitfield(ty: TypeId, address: u64, bit_offset: u64, bit_size: u64) -> Self
    {
        Self {
            ty,
            storage: ValueStorage::Target {
                address,
                bit_offset,
                bit_size: Some(bit_size),
            },
            fetched: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_bytes(ty: TypeId, bytes: Vec<u8>) -> Self
    {
        Self {
            ty,
            storage: ValueStorage::Buffer(bytes),
            fetched: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn ty(&self) -> TypeId
    {
        self.ty
    }

    /// The same storage seen through a different type. Any fetched
    /// contents are dropped, since the new type may have a new size.
    #[must_use]
    pub fn with_type(&self, ty: TypeId) -> Self
    {
        Self {
            ty,
            storage: self.storage.clone(),
            fetched: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Option<u64>
    {
        match &self.storage {
            ValueStorage::Target { address, .. } => Some(*address),
            ValueStorage::Buffer(_) => None,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &ValueStorage
    {
        &self.storage
    }

    /// Bytes of the value, fetched from the target on first use and cached
    /// for the value's lifetime.
    pub fn contents(&self, arena: &TypeArena, memory: &dyn TargetMemory) -> Result<&[u8]>
    {
        match &self.storage {
            ValueStorage::Buffer(bytes) => Ok(bytes),
            ValueStorage::Target { address, .. } => {
                let bytes = self.fetched.get_or_try_init(|| {
                    let length = arena.byte_size(self.ty).ok_or(AdamantError::NoContents)?;
                    memory.read_memory(*address, length as usize)
                })?;
                Ok(bytes)
            }
        }
    }

    /// The value as a signed 64-bit scalar, honoring sub-byte placement.
    pub fn read_scalar(
        &self,
        arena: &TypeArena,
        memory: &dyn TargetMemory,
        endian: Endian,
    ) -> Result<i64>
    {
        let signed = arena.is_signed(self.ty);
        match &self.storage {
            ValueStorage::Target { address, bit_offset, bit_size }
                if bit_size.is_some() || *bit_offset != 0 =>
            {
                let width = match bit_size {
                    Some(w) => *w,
                    None => arena.byte_size(self.ty).ok_or(AdamantError::NoContents)? * 8,
                };
                let lead = bit_offset % 8;
                let span = ((lead + width + 7) / 8) as usize;
                let raw = memory.read_memory(address + bit_offset / 8, span)?;
                bits::unpack_scalar_i64(&raw, lead, width, endian, signed)
            }
            _ => {
                let bytes = self.contents(arena, memory)?;
                bits::scalar_from_bytes(bytes, endian, signed)
            }
        }
    }

    /// Write the value back to the target. Sub-byte placements
    /// read-modify-write the containing bytes without touching neighbors.
    ///
    /// ## Errors
    ///
    /// Buffer-backed values are not modifiable; target writes can fail in
    /// the memory layer.
    pub fn write(
        &self,
        memory: &mut dyn TargetMemory,
        endian: Endian,
        bytes: &[u8],
    ) -> Result<()>
    {
        match &self.storage {
            ValueStorage::Buffer(_) => Err(AdamantError::NotModifiable),
            ValueStorage::Target { address, bit_offset: 0, bit_size: None } => {
                memory.write_memory(*address, bytes)
            }
            ValueStorage::Target { address, bit_offset, bit_size } => {
                let width = bit_size.unwrap_or(bytes.len() as u64 * 8);
                let lead = bit_offset % 8;
                let span = ((lead + width + 7) / 8) as usize;
                let base = address + bit_offset / 8;
                let mut window = memory.read_memory(base, span)?;
                bits::pack(&mut window, lead, bytes, 0, width, endian)?;
                memory.write_memory(base, &window)
            }
        }
    }
}

/// Extract one record field of `bytes` as a signed scalar.
///
/// `bytes` must cover the whole record; the field's declared bit position
/// and size say where to look.
pub(crate) fn field_scalar(
    arena: &TypeArena,
    bytes: &[u8],
    field: &crate::types::Field,
    endian: Endian,
) -> Result<i64>
{
    let pos = field
        .bit_pos
        .ok_or_else(|| AdamantError::UndefinedComponent(field.name.clone()))?;
    let width = if field.bit_size > 0 {
        field.bit_size
    } else {
        arena.byte_size(field.ty).ok_or(AdamantError::NoContents)? * 8
    };
    bits::unpack_scalar_i64(bytes, pos, width, endian, arena.is_signed(field.ty))
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{TypeKind, TypeNode};

    #[test]
    fn test_buffer_memory_bounds()
    {
        let mem = BufferMemory::new(0x1000, vec![1, 2, 3, 4]);
        assert_eq!(mem.read_memory(0x1001, 2).unwrap(), vec![2, 3]);
        assert!(mem.read_memory(0x0fff, 1).is_err());
        assert!(mem.read_memory(0x1003, 2).is_err());
    }

    #[test]
    fn test_lazy_contents_fetch()
    {
        let mut arena = TypeArena::new();
        let int4 = arena.intern(TypeNode::new(TypeKind::Integer { signed: true }).sized(4));
        let mem = BufferMemory::new(0x2000, vec![0x2a, 0, 0, 0]);
        let value = Value::from_target(int4, 0x2000);
        assert_eq!(value.contents(&arena, &mem).unwrap(), &[0x2a, 0, 0, 0]);
        assert_eq!(value.read_scalar(&arena, &mem, Endian::Little).unwrap(), 42);
    }

    #[test]
    fn test_bitfield_scalar_read()
    {
        let mut arena = TypeArena::new();
        let int1 = arena.intern(TypeNode::new(TypeKind::Integer { signed: false }).sized(1));
        // bits 4..7 of 0b0101_0000 hold 0b101 = 5
        let mem = BufferMemory::new(0, vec![0b0101_0000]);
        let value = Value::from_bitfield(int1, 0, 4, 3);
        assert_eq!(value.read_scalar(&arena, &mem, Endian::Little).unwrap(), 5);
    }
}

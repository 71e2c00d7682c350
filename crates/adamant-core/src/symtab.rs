//! Interfaces to the generic symbol-table substrate.
//!
//! Block structure, storage classes and per-module symbol dictionaries
//! belong to the embedding debugger. The engine sees them through the
//! [`SymbolTable`] trait and the [`Symbol`] record; a symbol's linkage
//! (encoded) name is the authoritative key, its decoded name is derived on
//! demand and cached.

use std::collections::HashMap;

use once_cell::unsync::OnceCell;

use crate::names;
use crate::types::TypeId;

/// Symbol lookup domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain
{
    /// Data symbols: objects, discriminants, compiler-generated variables
    Variable,
    /// Subprograms
    Function,
    /// Type names
    Type,
    /// Code labels
    Label,
}

/// How a symbol's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass
{
    Static,
    Local,
    Argument,
    Constant,
    Computed,
    OptimizedOut,
}

/// Handle to a lexical block owned by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Source language a symbol was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    Ada,
    C,
    Cpp,
    Unknown,
}

/// One symbol as provided by the substrate.
#[derive(Debug, Clone)]
pub struct Symbol
{
    linkage_name: String,
    decoded: OnceCell<String>,
    pub ty: Option<TypeId>,
    pub domain: Domain,
    pub storage: StorageClass,
    pub block: Option<BlockId>,
    pub address: Option<u64>,
    pub language: SymbolLanguage,
}

impl Symbol
{
    #[must_use]
    pub fn new(linkage_name: impl Into<String>, domain: Domain) -> Self
    {
        Self {
            linkage_name: linkage_name.into(),
            decoded: OnceCell::new(),
            ty: None,
            domain,
            storage: StorageClass::Static,
            block: None,
            address: None,
            language: SymbolLanguage::Ada,
        }
    }

    #[must_use]
    pub fn with_type(mut self, ty: TypeId) -> Self
    {
        self.ty = Some(ty);
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: u64) -> Self
    {
        self.address = Some(address);
        self
    }

    #[must_use]
    pub fn with_block(mut self, block: BlockId) -> Self
    {
        self.block = Some(block);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: StorageClass) -> Self
    {
        self.storage = storage;
        self
    }

    /// Encoded name as it appears in the object file.
    #[must_use]
    pub fn linkage_name(&self) -> &str
    {
        &self.linkage_name
    }

    /// Decoded Ada name, computed on first use and cached.
    #[must_use]
    pub fn natural_name(&self) -> &str
    {
        self.decoded
            .get_or_init(|| names::decode(&self.linkage_name, true, true, true))
    }
}

/// Scope queries and raw symbol search, implemented by the substrate.
///
/// `matcher` receives candidate linkage names; the engine supplies the
/// wild/full matching rules, the substrate supplies iteration.
pub trait SymbolTable
{
    /// Symbols of `domain` defined directly in `block` whose linkage name
    /// satisfies `matcher`. No parent-block traversal.
    fn symbols_in_block(
        &self,
        block: BlockId,
        domain: Domain,
        matcher: &dyn Fn(&str) -> bool,
    ) -> Vec<Symbol>;

    /// Global and file-static symbols of `domain` whose linkage name
    /// satisfies `matcher`.
    fn global_symbols(&self, domain: Domain, matcher: &dyn Fn(&str) -> bool) -> Vec<Symbol>;

    /// Enclosing block, `None` for top-level blocks.
    fn superblock(&self, block: BlockId) -> Option<BlockId>;

    /// Whether `block` is the body block of a subprogram.
    fn is_function_scope(&self, block: BlockId) -> bool;
}

#[derive(Debug, Default)]
struct BlockData
{
    parent: Option<BlockId>,
    function_scope: bool,
    symbols: Vec<Symbol>,
}

/// Simple owned [`SymbolTable`] for tests and for hosts that preload
/// symbols from their own reader.
#[derive(Debug, Default)]
pub struct InMemorySymbolTable
{
    globals: Vec<Symbol>,
    blocks: HashMap<BlockId, BlockData>,
}

impl InMemorySymbolTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add_global(&mut self, symbol: Symbol)
    {
        self.globals.push(symbol);
    }

    pub fn add_block(&mut self, id: BlockId, parent: Option<BlockId>, function_scope: bool)
    {
        self.blocks.insert(
            id,
            BlockData {
                parent,
                function_scope,
                symbols: Vec::new(),
            },
        );
    }

    pub fn add_block_symbol(&mut self, block: BlockId, symbol: Symbol)
    {
        self.blocks.entry(block).or_default().symbols.push(symbol);
    }
}

impl SymbolTable for InMemorySymbolTable
{
    fn symbols_in_block(
        &self,
        block: BlockId,
        domain: Domain,
        matcher: &dyn Fn(&str) -> bool,
    ) -> Vec<Symbol>
    {
        self.blocks
            .get(&block)
            .map(|data| {
                data.symbols
                    .iter()
                    .filter(|s| s.domain == domain && matcher(s.linkage_name()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn global_symbols(&self, domain: Domain, matcher: &dyn Fn(&str) -> bool) -> Vec<Symbol>
    {
        self.globals
            .iter()
            .filter(|s| s.domain == domain && matcher(s.linkage_name()))
            .cloned()
            .collect()
    }

    fn superblock(&self, block: BlockId) -> Option<BlockId>
    {
        self.blocks.get(&block).and_then(|data| data.parent)
    }

    fn is_function_scope(&self, block: BlockId) -> bool
    {
        self.blocks.get(&block).is_some_and(|data| data.function_scope)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_natural_name_is_cached_decode()
    {
        let sym = Symbol::new("pack__obj", Domain::Variable);
        assert_eq!(sym.natural_name(), "pack.obj");
        assert_eq!(sym.natural_name(), "pack.obj");
    }

    #[test]
    fn test_block_scoping()
    {
        let mut table = InMemorySymbolTable::new();
        table.add_block(BlockId(0), None, true);
        table.add_block(BlockId(1), Some(BlockId(0)), false);
        table.add_block_symbol(BlockId(1), Symbol::new("pack__local", Domain::Variable));

        assert_eq!(table.superblock(BlockId(1)), Some(BlockId(0)));
        assert!(table.is_function_scope(BlockId(0)));
        let hits = table.symbols_in_block(BlockId(1), Domain::Variable, &|n| n == "pack__local");
        assert_eq!(hits.len(), 1);
    }
}

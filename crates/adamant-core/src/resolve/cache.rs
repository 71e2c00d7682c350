//! # Symbol Cache
//!
//! Caching layer for global symbol lookups.
//!
//! Global lookups walk every module's dictionaries, and expression
//! evaluation repeats the same names constantly, so the resolver caches
//! both hits and misses per (encoded name, domain). Local lookups never
//! enter the cache: a local symbol's meaning depends on the frame asking.
//!
//! The cache lives as long as one debugged program's module set; call
//! [`SymbolCache::invalidate`] whenever modules are loaded or unloaded.
//!
//! ## Thread Safety
//!
//! The cache is not thread-safe. If you need concurrent access, wrap it
//! in a `Mutex` or `RwLock`.

use std::collections::HashMap;

use crate::symtab::{Domain, Symbol};

/// Cache of global lookup results keyed by (encoded name, domain).
///
/// An entry holding an empty list is a cached "not found" and saves the
/// full walk just like a hit does.
#[derive(Debug, Default)]
pub struct SymbolCache
{
    entries: HashMap<(String, Domain), Vec<Symbol>>,
}

impl SymbolCache
{
    /// Create a new empty symbol cache.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Cached result for `name` in `domain`, if any. `Some(&[])` means
    /// the name is known to be absent.
    #[must_use]
    pub fn get(&self, name: &str, domain: Domain) -> Option<&[Symbol]>
    {
        self.entries
            .get(&(name.to_string(), domain))
            .map(Vec::as_slice)
    }

    /// Record the result of a global lookup, including an empty one.
    pub fn insert(&mut self, name: &str, domain: Domain, symbols: &[Symbol])
    {
        self.entries
            .insert((name.to_string(), domain), symbols.to_vec());
    }

    /// Drop every entry. Must be called when the set of loaded modules
    /// changes; stale entries would point at unloaded definitions.
    pub fn invalidate(&mut self)
    {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

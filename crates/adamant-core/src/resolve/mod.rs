//! Scoped name lookup and candidate filtering.
//!
//! User-supplied names are folded and encoded, then matched against
//! linkage names: *full* matching for qualified names (those whose encoded
//! form contains `__`), *wild* matching for unqualified ones, where any
//! enclosing package or block prefix may be skipped as long as nothing
//! being skipped could not have come from an Ada source name.

pub mod cache;
pub mod overload;

pub use cache::SymbolCache;

use crate::names;
use crate::symtab::{BlockId, Domain, Symbol, SymbolTable};

/// Encoded key a user-supplied name is looked up by.
#[must_use]
pub fn lookup_key(name: &str) -> String
{
    if let Some(verbatim) = name.strip_prefix('\'') {
        return verbatim.strip_suffix('\'').unwrap_or(verbatim).to_string();
    }
    names::encode(name, true).unwrap_or_else(|_| names::fold_name(name))
}

/// Look up `name` in `domain`, starting at `block` and walking enclosing
/// scopes, then falling back to the globals.
///
/// The innermost block with any hit wins. Only the global leg goes
/// through `cache`: a local symbol's meaning depends on the frame asking,
/// so caching it would poison later lookups.
pub fn lookup_symbols(
    table: &dyn SymbolTable,
    cache: Option<&mut SymbolCache>,
    name: &str,
    block: Option<BlockId>,
    domain: Domain,
) -> Vec<Symbol>
{
    let key = lookup_key(name);
    let wild = !key.contains("__") && !name.starts_with('\'');
    let matcher = |candidate: &str| match_encoded(candidate, &key, wild);

    let mut current = block;
    while let Some(b) = current {
        let hits = table.symbols_in_block(b, domain, &matcher);
        if !hits.is_empty() {
            return dedup_candidates(hits);
        }
        current = table.superblock(b);
    }

    if let Some(cache) = cache {
        if let Some(hit) = cache.get(&key, domain) {
            return hit.to_vec();
        }
        let found = dedup_candidates(table.global_symbols(domain, &matcher));
        cache.insert(&key, domain, &found);
        return found;
    }
    dedup_candidates(table.global_symbols(domain, &matcher))
}

/// Whether an encoded candidate name matches an encoded pattern.
#[must_use]
pub fn match_encoded(candidate: &str, pattern: &str, wild: bool) -> bool
{
    if wild {
        wild_match(candidate, pattern)
    } else {
        full_match(candidate, pattern)
    }
}

fn full_match(candidate: &str, pattern: &str) -> bool
{
    let name = candidate.strip_prefix("_ada_").unwrap_or(candidate);
    match name.strip_prefix(pattern) {
        Some(rest) => is_name_suffix(rest),
        None => false,
    }
}

/// Match `pattern` against any package- or block-qualified suffix of
/// `candidate`.
fn wild_match(candidate: &str, pattern: &str) -> bool
{
    let mut name = candidate.strip_prefix("_ada_").unwrap_or(candidate);
    name = name.strip_prefix("___ghost_").unwrap_or(name);
    let full = name;
    loop {
        if let Some(rest) = name.strip_prefix(pattern) {
            if is_name_suffix(rest) {
                // Skipping an uppercase prefix would mean matching inside
                // a name the encoding convention never produces; only a
                // match from the very start may tolerate one.
                let skipped = &full[..full.len() - name.len()];
                if !skipped.bytes().any(|b| b.is_ascii_uppercase()) {
                    return true;
                }
            }
        }
        match name.find("__") {
            Some(at) if at + 2 < name.len() => name = &name[at + 2..],
            _ => return false,
        }
    }
}

/// Whether `text` is one of the informational suffixes the compiler
/// appends to encoded names: overloading digits, task-body markers,
/// entry-body and barrier markers, protected-object `N`, body-nested
/// package tags.
pub(crate) fn is_name_suffix(text: &str) -> bool
{
    if text.is_empty() {
        return true;
    }
    let mut t = text;

    // Overloading digits: "__12", "___12", ".12", "$12".
    for lead in ["___", "__", ".", "$"] {
        if let Some(rest) = t.strip_prefix(lead) {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 {
                if digits == rest.len() {
                    return true;
                }
                t = &rest[digits..];
                break;
            }
        }
    }

    // Entry body and barrier: "_E12b" / "_E12s".
    if let Some(rest) = t.strip_prefix("_E") {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && matches!(&rest[digits..], "b" | "s") {
            return true;
        }
    }

    if matches!(t, "TKB" | "TB" | "B" | "N") {
        return true;
    }

    // Body-nested package tag: "X", "Xb", "Xbn", ...
    if let Some(rest) = t.strip_prefix('X') {
        if rest.bytes().all(|b| b == b'b' || b == b'n') {
            return true;
        }
    }

    false
}

/// Collapse duplicates, keeping the most defined symbol for each linkage
/// name: a forward-declared stub without type information is dominated by
/// any complete symbol at the same name and address.
fn dedup_candidates(symbols: Vec<Symbol>) -> Vec<Symbol>
{
    let mut kept: Vec<Symbol> = Vec::with_capacity(symbols.len());
    for sym in symbols {
        if let Some(existing) = kept.iter_mut().find(|k| {
            k.linkage_name() == sym.linkage_name()
                && k.address == sym.address
                && k.domain == sym.domain
        }) {
            if existing.ty.is_none() && sym.ty.is_some() {
                *existing = sym;
            }
        } else {
            kept.push(sym);
        }
    }
    kept
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_wild_match_skips_packages()
    {
        assert!(wild_match("pack__child__obj", "obj"));
        assert!(wild_match("obj", "obj"));
        assert!(wild_match("pack__obj__2", "obj"));
        assert!(!wild_match("pack__object", "obj"));
        assert!(!wild_match("pack__obj", "pack"));
    }

    #[test]
    fn test_full_match_requires_whole_name()
    {
        assert!(full_match("pack__obj", "pack__obj"));
        assert!(full_match("pack__obj__3", "pack__obj"));
        assert!(full_match("_ada_pack__obj", "pack__obj"));
        assert!(!full_match("pack__obj2", "pack__obj"));
    }

    #[test]
    fn test_name_suffix_forms()
    {
        assert!(is_name_suffix(""));
        assert!(is_name_suffix("__2"));
        assert!(is_name_suffix("___10"));
        assert!(is_name_suffix("TKB"));
        assert!(is_name_suffix("_E5b"));
        assert!(is_name_suffix("Xbn"));
        assert!(!is_name_suffix("ect"));
        assert!(!is_name_suffix("_x"));
    }
}

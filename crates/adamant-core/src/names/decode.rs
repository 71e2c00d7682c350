//! Decoding linkage names back into Ada source form.

use std::collections::HashMap;

use super::OPERATOR_TABLE;

/// Decode a linkage name into its Ada source form.
///
/// The decoder strips compiler prefixes (`.`, `_ada_`, `___ghost_`) and
/// informational suffixes (nested-subprogram digits, task-body `TKB`/`TB`/`B`
/// markers, entry suffixes, `___X` encodings), turns `__` back into `.`,
/// reverses operator keywords at name-component starts when `operators` is
/// set, and reverses `U`/`W`/`WW` hex escapes when `wide` is set.
///
/// Names that do not follow the encoding convention (leading `_` or `<`,
/// stray `X[bn]` sequences, uppercase letters or spaces in the result) are
/// *suppressed*: with `wrap` set the original is returned wrapped in
/// `<...>`, otherwise the result is empty. The wrapped form is itself left
/// untouched by a second decode.
#[must_use]
pub fn decode(encoded: &str, wrap: bool, operators: bool, wide: bool) -> String
{
    let mut enc = encoded;

    // On targets with function descriptors the entry-point symbol of FN is
    // named .FN.
    if let Some(rest) = enc.strip_prefix('.') {
        enc = rest;
    }
    if let Some(rest) = enc.strip_prefix("_ada_") {
        enc = rest;
    }
    if let Some(rest) = enc.strip_prefix("___ghost_") {
        enc = rest;
    }

    if enc.starts_with('_') || enc.starts_with('<') || !enc.is_ascii() || enc.is_empty() {
        return suppressed(enc, wrap);
    }

    // A compiler-added suffix such as "[cold]" is not part of the encoding;
    // detach it here and reattach it at the very end.
    let mut bracket_suffix = "";
    if enc.ends_with(']') {
        if let Some(lb) = enc.rfind('[') {
            bracket_suffix = &enc[lb..];
            enc = &enc[..lb];
        }
    }

    let bytes = enc.as_bytes();
    let mut len0 = bytes.len();

    // Trailing digits preceded by '.', '$', "__" or "___" disambiguate
    // same-named nested subprograms and never reach the user.
    if len0 > 1 && bytes[len0 - 1].is_ascii_digit() {
        let mut i = len0 - 2;
        while i > 0 && bytes[i].is_ascii_digit() {
            i -= 1;
        }
        if bytes[i] == b'.' || bytes[i] == b'$' {
            len0 = i;
        } else if i >= 2 && &enc[i - 2..=i] == "___" {
            len0 = i - 2;
        } else if i >= 1 && &enc[i - 1..=i] == "__" {
            len0 = i - 1;
        }
    }

    // Protected-object subprograms carry a trailing "N" the user never
    // wrote.
    if len0 > 1
        && bytes[len0 - 1] == b'N'
        && (bytes[len0 - 2].is_ascii_digit() || bytes[len0 - 2].is_ascii_lowercase())
    {
        len0 -= 1;
    }

    // Everything from the first "___X" on describes the type to the
    // debugger, not to the user. A "___" followed by anything else is not a
    // valid encoding.
    if let Some(p) = enc[..len0].find("___") {
        if p + 3 < len0 {
            if bytes[p + 3] == b'X' {
                len0 = p;
            } else {
                return suppressed(enc, wrap);
            }
        }
    }

    // Task-body suffixes carry no user-visible information.
    if len0 > 3 && &enc[len0 - 3..len0] == "TKB" {
        len0 -= 3;
    }
    if len0 > 2 && &enc[len0 - 2..len0] == "TB" {
        len0 -= 2;
    }
    if len0 > 1 && &enc[len0 - 1..len0] == "B" {
        len0 -= 1;
    }

    // A second digit run can hide behind the suffixes stripped above.
    if len0 > 1 && bytes[len0 - 1].is_ascii_digit() {
        let mut i = len0 - 2;
        while (i > 0 && bytes[i].is_ascii_digit())
            || (i >= 1 && bytes[i] == b'_' && bytes[i - 1].is_ascii_digit())
        {
            i -= 1;
        }
        if i > 1 && bytes[i] == b'_' && bytes[i - 1] == b'_' {
            len0 = i - 1;
        } else if bytes[i] == b'_' {
            len0 = i;
        }
    }

    let mut out = String::with_capacity(len0 + 8);
    let mut i = 0usize;

    // Leading non-alphabetic characters take no part in any encoding.
    while i < len0 && !bytes[i].is_ascii_alphabetic() {
        out.push(bytes[i] as char);
        i += 1;
    }

    let mut at_start_name = true;
    while i < len0 {
        // Operator-function name at the start of a component.
        if operators && at_start_name && bytes[i] == b'O' {
            let mut matched = false;
            for op in &OPERATOR_TABLE {
                let op_len = op.encoded.len();
                if enc[i..len0].starts_with(op.encoded)
                    && !bytes.get(i + op_len).is_some_and(|b| b.is_ascii_alphanumeric())
                {
                    out.push_str(op.decoded);
                    i += op_len;
                    matched = true;
                    break;
                }
            }
            at_start_name = false;
            if matched {
                continue;
            }
        }
        at_start_name = false;

        // "TK__" marks a task-body scope; keep only the "__" so it becomes
        // a dot below.
        if i + 4 <= len0 && &enc[i..i + 4] == "TK__" {
            i += 2;
        }

        // "__B_{digits}__" names an anonymous block enclosing the symbol;
        // collapse it onto the following separator.
        if i + 5 < len0
            && &enc[i..i + 3] == "__B"
            && bytes[i + 3] == b'_'
            && bytes[i + 4].is_ascii_digit()
        {
            let mut k = i + 5;
            while k < len0 && bytes[k].is_ascii_digit() {
                k += 1;
            }
            if k + 2 <= len0 && bytes[k] == b'_' && bytes[k + 1] == b'_' {
                i = k;
            }
        }

        // "_E{digits}b" and "_E{digits}s" distinguish the two subprograms
        // the compiler makes for each protected entry (body and barrier).
        if i + 3 < len0 && bytes[i] == b'_' && bytes[i + 1] == b'E' && bytes[i + 2].is_ascii_digit()
        {
            let mut k = i + 3;
            while k < len0 && bytes[k].is_ascii_digit() {
                k += 1;
            }
            if k < len0 && (bytes[k] == b'b' || bytes[k] == b's') {
                k += 1;
                if k == len0 || bytes[k] == b'_' {
                    i = k;
                    if i >= len0 {
                        break;
                    }
                }
            }
        }

        // Protected-object subprograms carry an "N" the user never wrote.
        if bytes[i] == b'N'
            && i > 0
            && (bytes[i - 1].is_ascii_digit() || bytes[i - 1].is_ascii_lowercase())
            && (i + 1 == len0 || (i + 2 < len0 && bytes[i + 1] == b'_' && bytes[i + 2] == b'_'))
        {
            i += 1;
            continue;
        }

        if bytes[i] == b'X' && i != 0 && bytes[i - 1].is_ascii_alphanumeric() {
            // An X[bn]* sequence is only valid at the very end, where it
            // tags body-nested packages; anywhere else the name is not
            // properly encoded.
            let mut k = i + 1;
            while k < len0 && (bytes[k] == b'b' || bytes[k] == b'n') {
                k += 1;
            }
            if k < len0 {
                return suppressed(enc, wrap);
            }
            i = k;
        } else if i + 2 <= len0 && bytes[i] == b'_' && bytes[i + 1] == b'_' {
            out.push('.');
            at_start_name = true;
            i += 2;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    let decoded = if wide { decode_wide(&out) } else { out };

    // A decoded Ada name never contains an uppercase letter; one surviving
    // to this point means the symbol was not encoded by the convention we
    // understand.
    if operators
        && decoded.chars().any(|c| c.is_ascii_uppercase() || c == ' ')
    {
        return suppressed(enc, wrap);
    }

    if bracket_suffix.is_empty() {
        decoded
    } else {
        format!("{decoded}{bracket_suffix}")
    }
}

/// Reverse `U`/`W`/`WW` hex escapes in a decoded name.
fn decode_wide(text: &str) -> String
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let (digits, skip) = match bytes[i] {
            b'W' if bytes.get(i + 1) == Some(&b'W') => (8usize, 2usize),
            b'W' => (4, 1),
            b'U' => (2, 1),
            _ => (0, 0),
        };
        if digits > 0 && i + skip + digits <= bytes.len() {
            let hex = &text[i + skip..i + skip + digits];
            if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    out.push(c);
                    i += skip + digits;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn suppressed(encoded: &str, wrap: bool) -> String
{
    if !wrap {
        return String::new();
    }
    if encoded.starts_with('<') {
        encoded.to_string()
    } else {
        format!("<{encoded}>")
    }
}

/// Cache of decoded names, scoped to one debugged program space.
///
/// Decoding is deterministic, so entries never need invalidation; clearing
/// the cache is only a memory-pressure measure when the debugged program
/// is swapped out.
#[derive(Debug, Default)]
pub struct DecodedNameCache
{
    map: HashMap<String, String>,
}

impl DecodedNameCache
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Decoded form of `encoded`, computed on first use.
    pub fn decoded(&mut self, encoded: &str) -> &str
    {
        if !self.map.contains_key(encoded) {
            let value = decode(encoded, true, true, true);
            self.map.insert(encoded.to_string(), value);
        }
        &self.map[encoded]
    }

    pub fn clear(&mut self)
    {
        self.map.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_decode_simple_qualified_name()
    {
        assert_eq!(decode("pack__child__obj", true, true, true), "pack.child.obj");
    }

    #[test]
    fn test_decode_strips_prefixes_and_suffixes()
    {
        assert_eq!(decode("_ada_main_prog", true, true, true), "main_prog");
        assert_eq!(decode("pack__obj___XVE", true, true, true), "pack.obj");
        assert_eq!(decode("pack__run__nested__2", true, true, true), "pack.run.nested");
        assert_eq!(decode("pack__workerTKB", true, true, true), "pack.worker");
    }

    #[test]
    fn test_decode_suppresses_foreign_names()
    {
        assert_eq!(decode("_ZN3foo3barEv", true, true, true), "<_ZN3foo3barEv>");
        assert_eq!(decode("_ZN3foo3barEv", false, true, true), "");
        assert_eq!(decode("<already>", true, true, true), "<already>");
    }

    #[test]
    fn test_decode_operator_at_component_start()
    {
        assert_eq!(decode("pack__Oadd", true, true, true), "pack.\"+\"");
        assert_eq!(decode("Oexpon", true, true, true), "\"**\"");
    }

    #[test]
    fn test_decode_wide_escapes()
    {
        assert_eq!(decode("cafUe9", true, true, true), "caf\u{e9}");
        // With wide decoding off the escape letter survives and trips the
        // uppercase rejection, unless operator checking is off too.
        assert_eq!(decode("xW0394", true, true, false), "<xW0394>");
        assert_eq!(decode("xW0394", true, false, false), "xW0394");
    }

    #[test]
    fn test_cache_returns_same_value()
    {
        let mut cache = DecodedNameCache::new();
        let first = cache.decoded("pack__obj").to_string();
        assert_eq!(first, "pack.obj");
        assert_eq!(cache.decoded("pack__obj"), first);
        assert_eq!(cache.len(), 1);
    }
}

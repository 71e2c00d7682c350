//! Encoding Ada source names into their linkage form.

use crate::error::{AdamantError, Result};

use super::OPERATOR_TABLE;

/// Case-fold a name the way the compiler does before mangling.
///
/// ASCII and Latin-1 letters fold to lower case; codepoints above U+00FF
/// fold to upper case. The asymmetry is the compiler's convention, not an
/// accident, and lookups must reproduce it exactly. A name delimited by
/// single quotes passes through verbatim with the quotes stripped.
#[must_use]
pub fn fold_name(name: &str) -> String
{
    if let Some(stripped) = name.strip_prefix('\'') {
        return stripped.strip_suffix('\'').unwrap_or(stripped).to_string();
    }

    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        if u32::from(c) <= 0xFF {
            folded.extend(c.to_lowercase());
        } else {
            folded.extend(c.to_uppercase());
        }
    }
    folded
}

/// Encode a decoded Ada name into its linkage form.
///
/// Dots become `__`, quoted operator names become their `O`-prefixed
/// keywords, and characters outside ASCII become `U`/`W`/`WW` hex escapes
/// computed from the 32-bit codepoint. With `fold` set, the name is
/// case-folded first (skipped for verbatim `'...'` names, whose quotes are
/// stripped by the fold).
///
/// ## Errors
///
/// Fails with [`AdamantError::InvalidOperatorName`] when a quoted portion
/// of the name does not spell a known operator.
pub fn encode(decoded: &str, fold: bool) -> Result<String>
{
    let folded;
    let mut rest: &str = if fold && !decoded.starts_with('<') {
        folded = fold_name(decoded);
        &folded
    } else {
        decoded
    };

    let mut out = String::with_capacity(rest.len() + 8);
    while let Some(c) = rest.chars().next() {
        match c {
            '.' => {
                out.push_str("__");
                rest = &rest[1..];
            }
            '"' => {
                let Some(op) = OPERATOR_TABLE.iter().find(|op| rest.starts_with(op.decoded))
                else {
                    return Err(AdamantError::InvalidOperatorName(rest.to_string()));
                };
                out.push_str(op.encoded);
                rest = &rest[op.decoded.len()..];
            }
            c if c.is_ascii() => {
                out.push(c);
                rest = &rest[1..];
            }
            c => {
                let v = u32::from(c);
                if v <= 0xFF {
                    out.push_str(&format!("U{v:02x}"));
                } else if v <= 0xFFFF {
                    out.push_str(&format!("W{v:04x}"));
                } else {
                    out.push_str(&format!("WW{v:08x}"));
                }
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_fold_is_asymmetric()
    {
        assert_eq!(fold_name("Hello.World"), "hello.world");
        assert_eq!(fold_name("\u{c9}t\u{e9}"), "\u{e9}t\u{e9}");
        assert_eq!(fold_name("\u{3b1}"), "\u{391}");
    }

    #[test]
    fn test_fold_verbatim_passthrough()
    {
        assert_eq!(fold_name("'MixedCase'"), "MixedCase");
    }

    #[test]
    fn test_encode_dots_and_operators()
    {
        assert_eq!(encode("pack.child.obj", true).unwrap(), "pack__child__obj");
        assert_eq!(encode("pack.\"+\"", true).unwrap(), "pack__Oadd");
        assert_eq!(encode("\"**\"", false).unwrap(), "Oexpon");
    }

    #[test]
    fn test_encode_rejects_unknown_operator()
    {
        assert!(encode("\"&&\"", false).is_err());
    }

    #[test]
    fn test_encode_hex_escapes()
    {
        assert_eq!(encode("caf\u{e9}", false).unwrap(), "cafUe9");
        assert_eq!(encode("x\u{0394}", false).unwrap(), "xW0394");
        assert_eq!(encode("x\u{10400}", false).unwrap(), "xWW00010400");
    }
}

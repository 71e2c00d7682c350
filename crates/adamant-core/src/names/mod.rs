//! # GNAT Name Codec
//!
//! GNAT encodes Ada source names into linker symbols: dots become `__`,
//! operator functions become `O`-prefixed keywords, wide characters become
//! `U`/`W`/`WW` hex escapes, and a family of `___X` suffixes attaches
//! machine-level facts (bounds, packing, variant structure) to otherwise
//! opaque types. This module owns the tables and both directions of the
//! mapping.
//!
//! The constants below are an external contract shared with the compiler
//! and must match its convention bit for bit.

mod decode;
mod encode;

pub use decode::{decode, DecodedNameCache};
pub use encode::{encode, fold_name};

/// One row of the operator-name table.
#[derive(Debug, Clone, Copy)]
pub struct OpName
{
    /// Encoded spelling, e.g. `Oadd`
    pub encoded: &'static str,
    /// Source spelling including the quotes, e.g. `"+"`
    pub decoded: &'static str,
}

/// Mapping between quoted Ada operator spellings and their encoded names.
///
/// Binary and unary `+` and `-` share a source spelling, which is why
/// `Oadd` and `Osubtract` each appear twice; the duplicate rows keep the
/// table aligned with the compiler's and are harmless for both directions
/// of the mapping.
pub const OPERATOR_TABLE: [OpName; 21] = [
    OpName { encoded: "Oadd", decoded: "\"+\"" },
    OpName { encoded: "Osubtract", decoded: "\"-\"" },
    OpName { encoded: "Omultiply", decoded: "\"*\"" },
    OpName { encoded: "Odivide", decoded: "\"/\"" },
    OpName { encoded: "Omod", decoded: "\"mod\"" },
    OpName { encoded: "Orem", decoded: "\"rem\"" },
    OpName { encoded: "Oexpon", decoded: "\"**\"" },
    OpName { encoded: "Olt", decoded: "\"<\"" },
    OpName { encoded: "Ole", decoded: "\"<=\"" },
    OpName { encoded: "Ogt", decoded: "\">\"" },
    OpName { encoded: "Oge", decoded: "\">=\"" },
    OpName { encoded: "Oeq", decoded: "\"=\"" },
    OpName { encoded: "One", decoded: "\"/=\"" },
    OpName { encoded: "Oand", decoded: "\"and\"" },
    OpName { encoded: "Oor", decoded: "\"or\"" },
    OpName { encoded: "Oxor", decoded: "\"xor\"" },
    OpName { encoded: "Oconcat", decoded: "\"&\"" },
    OpName { encoded: "Oabs", decoded: "\"abs\"" },
    OpName { encoded: "Onot", decoded: "\"not\"" },
    OpName { encoded: "Oadd", decoded: "\"+\"" },
    OpName { encoded: "Osubtract", decoded: "\"-\"" },
];

/// Parallel-type suffix: record template with dynamic field layout.
pub const XVE_SUFFIX: &str = "___XVE";
/// Parallel-type suffix: index-type descriptor of a dynamic array.
pub const XA_SUFFIX: &str = "___XA";
/// Parallel-type suffix: real view of a union whose structure is dynamic.
pub const XVU_SUFFIX: &str = "___XVU";
/// Parallel-type suffix: single-field struct naming a type's real base.
pub const XVS_SUFFIX: &str = "___XVS";
/// Union-name marker carrying the variant-part discriminant name.
pub const XVN_SUFFIX: &str = "___XVN";
/// Range-type marker followed by bound information.
pub const XD_MARKER: &str = "___XD";
/// Renaming marker; followed by `_`, `E`, `P` or `S`.
pub const XR_MARKER: &str = "___XR";
/// Renaming selector separator.
pub const XE_MARKER: &str = "___XE";
/// Thin-pointer target marker for unconstrained arrays.
pub const XUT_SUFFIX: &str = "___XUT";
/// Fat-pointer type marker for unconstrained arrays.
pub const XUP_SUFFIX: &str = "___XUP";
/// Bounds-record marker for unconstrained arrays.
pub const XUB_SUFFIX: &str = "___XUB";
/// Packed-array marker; followed by the element bit size.
pub const XP_MARKER: &str = "___XP";
/// Dynamic-length field marker; the field type is an access to the
/// object's real type.
pub const XVL_MARKER: &str = "___XVL";
/// Field-alignment marker; followed by the alignment in bytes.
pub const XVA_MARKER: &str = "___XVA";
/// Suffix of the integer variable holding a dynamic record's byte size.
pub const XVZ_SUFFIX: &str = "___XVZ";
/// Fixed-point marker; followed by the scaling numerator and denominator.
pub const XF_MARKER: &str = "___XF_";

/// Kind of renaming declaration a symbol stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamingKind
{
    /// `A : T renames B.C;`
    Object,
    /// `A : exception renames B;`
    Exception,
    /// `package A renames B;`
    Package,
    /// `function A renames B;`
    Subprogram,
}

/// A renaming declaration split out of a symbol's linkage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renaming<'a>
{
    pub kind: RenamingKind,
    /// Encoded name of the renamed entity
    pub renamed_entity: &'a str,
    /// Selector expression text to apply to the renamed entity; empty for
    /// a plain renaming
    pub selector: &'a str,
}

/// Split a renaming declaration out of `linkage` if it carries one.
///
/// The compiler encodes `A renames B.C` as
/// `a___XR_b__c___XEc`: marker, kind letter, renamed entity, then the
/// selector expression after [`XE_MARKER`].
#[must_use]
pub fn parse_renaming(linkage: &str) -> Option<Renaming<'_>>
{
    let at = linkage.find(XR_MARKER)?;
    let after = &linkage[at + XR_MARKER.len()..];
    let (kind, info) = match after.as_bytes().first()? {
        b'_' => (RenamingKind::Object, &after[1..]),
        b'E' => (RenamingKind::Exception, &after[2..]),
        b'P' => (RenamingKind::Package, &after[2..]),
        b'S' => (RenamingKind::Subprogram, &after[2..]),
        _ => return None,
    };
    let sep = info.find(XE_MARKER)?;
    if sep == 0 {
        return None;
    }
    Some(Renaming {
        kind,
        renamed_entity: &info[..sep],
        selector: &info[sep + XE_MARKER.len()..],
    })
}

/// Unqualified, display-ready name of an enumeration literal.
///
/// Strips the package prefix (everything up to the last `.` or `__` run
/// that is not an overloading suffix) and decodes character-literal
/// encodings: `Qc` for a plain character, `QU<2 hex>`, `QW<4 hex>` and
/// `QWW<8 hex>` for escaped ones.
#[must_use]
pub fn enum_literal_name(name: &str) -> std::borrow::Cow<'_, str>
{
    use std::borrow::Cow;

    let mut tail = match name.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => {
            let mut rest = name;
            while let Some(at) = rest.find("__") {
                if rest[at + 2..].starts_with(|c: char| c.is_ascii_digit()) {
                    break;
                }
                rest = &rest[at + 2..];
            }
            rest
        }
    };

    if let Some(esc) = tail.strip_prefix('Q') {
        if let Some(hex) = esc.strip_prefix("WW").or_else(|| esc.strip_prefix('W')).or_else(|| esc.strip_prefix('U')) {
            if let Ok(v) = u32::from_str_radix(hex, 16) {
                if let Some(c) = char::from_u32(v) {
                    if c.is_ascii() && !c.is_ascii_control() {
                        return Cow::Owned(format!("'{c}'"));
                    }
                }
                let width = hex.len();
                return Cow::Owned(format!("[\"{v:0width$x}\"]"));
            }
        } else if esc.len() == 1
            && esc.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Cow::Owned(format!("'{esc}'"));
        }
        return Cow::Borrowed(tail);
    }

    // Trim an overloading suffix such as "__2" or "$2".
    if let Some(at) = tail.find("__").or_else(|| tail.find('$')) {
        tail = &tail[..at];
    }
    Cow::Borrowed(tail)
}

/// Element bit size of a packed array, parsed from its `___XP<n>` name.
#[must_use]
pub fn packed_array_bit_size(name: &str) -> Option<u64>
{
    let at = name.find(XP_MARKER)?;
    let digits: String = name[at + XP_MARKER.len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Field alignment in bytes, parsed from a trailing `___XVA<n>` marker on
/// the field name. Absent marker means no extra alignment constraint.
#[must_use]
pub fn field_alignment_bytes(field_name: &str) -> Option<u64>
{
    let at = field_name.rfind(XVA_MARKER)?;
    let digits = &field_name[at + XVA_MARKER.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Fixed-point scaling parsed from a `___XF_<num>_<den>` name marker.
///
/// The logical value of the type is the machine integer times
/// `num / den`.
#[must_use]
pub fn fixed_point_scaling(name: &str) -> Option<(i64, i64)>
{
    let at = name.find(XF_MARKER)?;
    let tail = &name[at + XF_MARKER.len()..];
    let mut parts = tail.splitn(2, '_');
    let num = parse_bound_literal(parts.next()?)?;
    let den = parse_bound_literal(parts.next()?)?;
    if den == 0 {
        return None;
    }
    Some((num, den))
}

/// One bound of a range type as encoded in a `___XD` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XdBound
{
    /// The bound is spelled out in the type name.
    Literal(i64),
    /// The bound lives in a compiler-generated variable of this name.
    Variable(String),
}

/// Bound information carried by a `___XD` range-type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdBounds
{
    pub low: XdBound,
    pub high: XdBound,
}

/// Parse the `___XD` convention out of a range-type name.
///
/// After the marker, the letters `L` and/or `U` say which bounds follow as
/// `__`-separated literals; a missing letter means the bound is kept in a
/// variable named `<prefix>___L` or `<prefix>___U`.
#[must_use]
pub fn xd_bound_info(name: &str) -> Option<XdBounds>
{
    let at = name.find(XD_MARKER)?;
    let prefix = &name[..at];
    let mut letters = &name[at + XD_MARKER.len()..];

    let has_low = letters.starts_with('L');
    if has_low {
        letters = &letters[1..];
    }
    let has_high = letters.starts_with('U');
    if has_high {
        letters = &letters[1..];
    }

    let mut literals = letters.strip_prefix('_').map(|rest| rest.split("__"));
    let mut next_literal = || -> Option<i64> {
        literals.as_mut().and_then(Iterator::next).and_then(parse_bound_literal)
    };

    let low = if has_low {
        XdBound::Literal(next_literal()?)
    } else {
        XdBound::Variable(format!("{prefix}___L"))
    };
    let high = if has_high {
        XdBound::Literal(next_literal()?)
    } else {
        XdBound::Variable(format!("{prefix}___U"))
    };
    Some(XdBounds { low, high })
}

/// Parse one numeric bound literal; a trailing `m` marks a negative value.
fn parse_bound_literal(text: &str) -> Option<i64>
{
    let (negative, digits) = match text.strip_suffix('m') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Discriminant name embedded in a variant-part union's `___XVN` name.
///
/// The union is named `<prefix>___<discriminant>___XVN...`; the
/// discriminant is the component between the last `___` (or `.`) and the
/// marker.
#[must_use]
pub fn variant_discriminant_name(union_name: &str) -> Option<&str>
{
    let end = union_name.find(XVN_SUFFIX)?;
    let head = &union_name[..end];
    let after_sep = head.rfind("___").map(|p| p + 3);
    let after_dot = head.rfind('.').map(|p| p + 1);
    let start = match (after_sep, after_dot) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let name = &head[start..];
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Shorten `name` past any trailing homonym digits, mirroring how the
/// compiler disambiguates same-named entities (`x__2`, `x.1`, `x$4`).
#[must_use]
pub(crate) fn strip_homonym_digits(name: &str) -> &str
{
    let bytes = name.as_bytes();
    let mut end = bytes.len();
    if end < 2 || !bytes[end - 1].is_ascii_digit() {
        return name;
    }
    while end > 0 && bytes[end - 1].is_ascii_digit() {
        end -= 1;
    }
    if end == 0 {
        return name;
    }
    match bytes[end - 1] {
        b'.' | b'$' => &name[..end - 1],
        b'_' if end >= 2 && bytes[end - 2] == b'_' => {
            if end >= 3 && bytes[end - 3] == b'_' {
                &name[..end - 3]
            } else {
                &name[..end - 2]
            }
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_renaming_object()
    {
        let r = parse_renaming("pack__handle___XR_pack__pool___XEall").unwrap();
        assert_eq!(r.kind, RenamingKind::Object);
        assert_eq!(r.renamed_entity, "pack__pool");
        assert_eq!(r.selector, "all");
    }

    #[test]
    fn test_parse_renaming_rejects_plain_names()
    {
        assert!(parse_renaming("pack__handle").is_none());
        assert!(parse_renaming("pack___XRQ_x___XEy").is_none());
    }

    #[test]
    fn test_enum_literal_char_escape()
    {
        assert_eq!(enum_literal_name("QU41"), "'A'");
        assert_eq!(enum_literal_name("colors__red__2"), "red");
        assert_eq!(enum_literal_name("Qa"), "'a'");
    }

    #[test]
    fn test_xd_literal_and_variable_bounds()
    {
        let info = xd_bound_info("pack__idx___XDLU_1__10").unwrap();
        assert_eq!(info.low, XdBound::Literal(1));
        assert_eq!(info.high, XdBound::Literal(10));

        let info = xd_bound_info("pack__idx___XDL_5m").unwrap();
        assert_eq!(info.low, XdBound::Literal(-5));
        assert_eq!(info.high, XdBound::Variable("pack__idx___U".into()));
    }

    #[test]
    fn test_packed_and_alignment_markers()
    {
        assert_eq!(packed_array_bit_size("pack__flags___XP1"), Some(1));
        assert_eq!(packed_array_bit_size("pack__flags"), None);
        assert_eq!(field_alignment_bytes("payload___XVA8"), Some(8));
        assert_eq!(field_alignment_bytes("payload"), None);
    }

    #[test]
    fn test_strip_homonym_digits()
    {
        assert_eq!(strip_homonym_digits("color__2"), "color");
        assert_eq!(strip_homonym_digits("color___12"), "color");
        assert_eq!(strip_homonym_digits("color.3"), "color");
        assert_eq!(strip_homonym_digits("color2"), "color2");
    }
}

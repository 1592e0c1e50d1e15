//! Operand syntax expansion.
//!
//! A raw operand string such as `"r:xmm {kz}, xmm/m128, ib"` names a set of
//! alternatives per position. Expansion strips annotations that do not
//! change the operand type, folds mask suffixes back onto the operand they
//! trail, and returns the cartesian product of all positions, destination
//! first.

use crate::core::diagnostics::Diagnostics;
use crate::core::error::ParseError;
use crate::isa::operand::{MaskSuffix, OperandType};

/// One lexical item of an operand string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Operand(String),
    Mask(MaskSuffix),
}

/// Expand `raw` into every concrete operand-type tuple it denotes.
///
/// Unknown operand tokens are recorded in `diagnostics` before the first
/// one is returned as an error. An empty string yields a single empty
/// tuple.
pub fn expand_operands(
    raw: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Vec<OperandType>>, ParseError> {
    let items = lex(raw)?;

    let mut positions: Vec<Vec<OperandType>> = Vec::new();
    let mut first_error = None;

    for item in items {
        match item {
            Item::Operand(word) => {
                let mut alternatives = Vec::new();
                let mut unknown = false;
                for alt in word.split(['/', '|']).filter(|a| !a.is_empty()) {
                    match OperandType::parse(alt) {
                        Some(ty) if !alternatives.contains(&ty) => alternatives.push(ty),
                        Some(_) => {}
                        None => {
                            unknown = true;
                            diagnostics.unknown_operand(alt);
                            first_error.get_or_insert(ParseError::UnknownOperand {
                                token: alt.to_string(),
                            });
                        }
                    }
                }
                // a bare separator such as "/" leaves the position empty
                if alternatives.is_empty() && !unknown {
                    diagnostics.unknown_operand(&word);
                    first_error.get_or_insert(ParseError::EmptyOperand { token: word.clone() });
                }
                positions.push(alternatives);
            }
            Item::Mask(mask) => {
                let previous = positions.last_mut().ok_or_else(|| ParseError::DanglingMask {
                    token: mask_token(mask).to_string(),
                })?;
                for ty in previous.iter_mut() {
                    match ty.with_mask(mask) {
                        Some(masked) => *ty = masked,
                        None => {
                            let token = format!("{}{}", ty.name(), mask_token(mask));
                            diagnostics.unknown_operand(&token);
                            first_error.get_or_insert(ParseError::UnknownOperand { token });
                        }
                    }
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let mut tuples: Vec<Vec<OperandType>> = vec![Vec::new()];
    for alternatives in &positions {
        let mut next = Vec::with_capacity(tuples.len() * alternatives.len());
        for prefix in &tuples {
            for &ty in alternatives {
                let mut tuple = prefix.clone();
                tuple.push(ty);
                next.push(tuple);
            }
        }
        tuples = next;
    }
    Ok(tuples)
}

fn mask_token(mask: MaskSuffix) -> &'static str {
    match mask {
        MaskSuffix::Merge => "{k}",
        MaskSuffix::Zero => "{kz}",
    }
}

/// Split `raw` into operand words and mask suffixes, dropping access
/// markers, `[...]` annotations, `<...>` pseudo operands and rounding
/// markers.
fn lex(raw: &str) -> Result<Vec<Item>, ParseError> {
    let mut items = Vec::new();
    let mut word = String::new();
    let mut chars = raw.chars().peekable();

    fn flush(word: &mut String, items: &mut Vec<Item>) {
        let text = std::mem::take(word);
        let text = strip_access_marker(&text);
        if !text.is_empty() && !text.starts_with('<') {
            items.push(Item::Operand(text.to_string()));
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            '{' => {
                flush(&mut word, &mut items);
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    inner.push(c);
                }
                brace(&inner, &mut items)?;
            }
            ',' => flush(&mut word, &mut items),
            c if c.is_whitespace() => flush(&mut word, &mut items),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut items);
    Ok(items)
}

fn brace(inner: &str, items: &mut Vec<Item>) -> Result<(), ParseError> {
    let inner = inner.trim().to_ascii_lowercase();
    let is_mask_reg =
        inner == "k" || (inner.len() == 2 && inner.starts_with('k') && inner.as_bytes()[1].is_ascii_digit());

    if is_mask_reg {
        items.push(Item::Mask(MaskSuffix::Merge));
    } else if inner == "kz" {
        items.push(Item::Mask(MaskSuffix::Zero));
    } else if inner == "z" {
        match items.last_mut() {
            Some(Item::Mask(mask)) => *mask = MaskSuffix::Zero,
            _ => {
                return Err(ParseError::DanglingMask {
                    token: "{z}".to_string(),
                })
            }
        }
    } else if inner == "er" || inner == "sae" || inner.ends_with("-sae") {
        // rounding control does not change the operand type
    } else {
        return Err(ParseError::UnknownOperand {
            token: format!("{{{inner}}}"),
        });
    }
    Ok(())
}

fn strip_access_marker(word: &str) -> &str {
    match word.split_once(':') {
        Some((marker, rest)) if matches!(marker, "r" | "w" | "x" | "R" | "W" | "X") => rest,
        _ => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperandType::*;

    fn expand(raw: &str) -> Result<Vec<Vec<OperandType>>, ParseError> {
        expand_operands(raw, &mut Diagnostics::new())
    }

    #[test]
    fn test_alternatives_cartesian_product() {
        assert_eq!(expand("r32/m32, i8").unwrap(), vec![vec![R32, I8], vec![M32, I8]]);
        assert_eq!(
            expand("r32/m32, i8|i32").unwrap(),
            vec![
                vec![R32, I8],
                vec![R32, I32],
                vec![M32, I8],
                vec![M32, I32]
            ]
        );
    }

    #[test]
    fn test_empty_operand_string() {
        assert_eq!(expand("").unwrap(), vec![Vec::<OperandType>::new()]);
        assert_eq!(expand("   ").unwrap(), vec![Vec::<OperandType>::new()]);
    }

    #[test]
    fn test_annotations_are_stripped() {
        assert_eq!(
            expand("W:xmm[31:0], r:xmm[lock], X:r64").unwrap(),
            vec![vec![Xmm, Xmm, R64]]
        );
        assert_eq!(expand("xmm, xmm, <xmm0>").unwrap(), vec![vec![Xmm, Xmm]]);
        assert_eq!(expand("zmm {er}, zmm").unwrap(), vec![vec![Zmm, Zmm]]);
    }

    #[test]
    fn test_mask_folds_onto_previous_operand() {
        assert_eq!(
            expand("xmm {kz}, xmm/m128").unwrap(),
            vec![vec![XmmKz, Xmm], vec![XmmKz, M128]]
        );
        assert_eq!(expand("zmm{k}, zmm").unwrap(), vec![vec![ZmmK, Zmm]]);
        assert_eq!(expand("ymm {k1}{z}, ymm").unwrap(), vec![vec![YmmKz, Ymm]]);
        assert_eq!(expand("k {k}, k").unwrap(), vec![vec![KK, K]]);
    }

    #[test]
    fn test_mask_leaves_memory_alternative_plain() {
        assert_eq!(
            expand("xmm/m128 {k}, xmm").unwrap(),
            vec![vec![XmmK, Xmm], vec![M128, Xmm]]
        );
    }

    #[test]
    fn test_dangling_mask() {
        assert!(matches!(expand("{kz}, xmm"), Err(ParseError::DanglingMask { .. })));
        assert!(matches!(expand("xmm, {z}"), Err(ParseError::DanglingMask { .. })));
    }

    #[test]
    fn test_unknown_operands_are_collected() {
        let mut diag = Diagnostics::new();
        let err = expand_operands("tmm, bnd/xmm, r32", &mut diag).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownOperand {
                token: "tmm".to_string()
            }
        );
        let unknown: Vec<&str> = diag.unknown_operands().collect();
        assert_eq!(unknown, vec!["bnd", "tmm"]);
    }

    #[test]
    fn test_separator_without_alternatives_is_an_error() {
        let mut diag = Diagnostics::new();
        let err = expand_operands("r32 / m32, i8", &mut diag).unwrap_err();
        assert_eq!(err, ParseError::EmptyOperand { token: "/".to_string() });
        assert!(!diag.is_clean());

        assert!(matches!(expand("r32, /"), Err(ParseError::EmptyOperand { .. })));
        assert!(matches!(expand("r32, |"), Err(ParseError::EmptyOperand { .. })));
    }

    #[test]
    fn test_unmaskable_register() {
        let mut diag = Diagnostics::new();
        assert!(expand_operands("r32 {k}, r32", &mut diag).is_err());
        assert_eq!(diag.unknown_operands().collect::<Vec<_>>(), vec!["r32{k}"]);
    }

    #[test]
    fn test_legacy_spellings() {
        assert_eq!(expand("mm, mm/m64").unwrap(), vec![vec![Mmx, Mmx], vec![Mmx, M64]]);
        assert_eq!(expand("st(0), st(i)").unwrap(), vec![vec![St0, St]]);
        assert_eq!(expand("r/m32, 1").unwrap_err(), ParseError::UnknownOperand { token: "r".to_string() });
        assert_eq!(expand("r32, 1").unwrap(), vec![vec![R32, One]]);
    }
}

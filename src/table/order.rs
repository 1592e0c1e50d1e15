//! Total order of table rows.
//!
//! Rows sort by mnemonic, then by the rank of the first and second operand
//! (a missing operand sorts before every present one), and EVEX forms sort
//! after the VEX/legacy form with the same prefix. The sort is stable, so
//! rows that compare equal keep the selector's first-seen order.

use super::select::Variant;
use crate::core::error::SchemaError;
use std::cmp::Ordering;

/// Sort key of one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowKey {
    pub name: String,
    pub first: Option<u16>,
    pub second: Option<u16>,
    pub evex: bool,
}

impl RowKey {
    /// Key of `variant`. Every operand must have a rank, not only the two
    /// that take part in the comparison.
    pub fn of(variant: &Variant) -> Result<Self, SchemaError> {
        let ranks = variant
            .operands
            .iter()
            .map(|op| op.rank())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: variant.name.clone(),
            first: ranks.first().copied(),
            second: ranks.get(1).copied(),
            evex: variant.descriptor.is_evex(),
        })
    }
}

/// Sort `variants` into table order.
pub fn sort_variants(variants: Vec<Variant>) -> Result<Vec<Variant>, SchemaError> {
    let mut keyed = variants
        .into_iter()
        .map(|v| RowKey::of(&v).map(|key| (key, v)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, v)| v).collect())
}

/// Check that adjacent rows respect the order, returning the index of the
/// first row that sorts before its predecessor.
pub fn first_misordered(rows: &[Variant]) -> Result<Option<usize>, SchemaError> {
    let mut previous: Option<RowKey> = None;
    for (i, row) in rows.iter().enumerate() {
        let key = RowKey::of(row)?;
        if let Some(prev) = &previous {
            if prev.cmp(&key) == Ordering::Greater {
                return Ok(Some(i));
            }
        }
        previous = Some(key);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingDescriptor;
    use crate::isa::OperandType::{self, *};

    fn variant(name: &str, ops: &[OperandType], enc: &str) -> Variant {
        Variant::new(name, ops.to_vec(), EncodingDescriptor::parse(enc).unwrap())
    }

    #[test]
    fn test_name_then_operand_rank() {
        let rows = sort_variants(vec![
            variant("mov", &[Xmm, M32], "66 0F 6E /r"),
            variant("add", &[R32, I32], "81 /0 id"),
            variant("mov", &[R32, I32], "B8+r id"),
            variant("mov", &[R8, I8], "B0+r ib"),
            variant("add", &[R32, I8], "83 /0 ib"),
        ])
        .unwrap();
        let got: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.operands.clone())).collect();
        assert_eq!(
            got,
            vec![
                ("add", vec![R32, I8]),
                ("add", vec![R32, I32]),
                ("mov", vec![R8, I8]),
                ("mov", vec![R32, I32]),
                ("mov", vec![Xmm, M32]),
            ]
        );
        assert_eq!(first_misordered(&rows).unwrap(), None);
    }

    #[test]
    fn test_evex_after_vex() {
        let rows = sort_variants(vec![
            variant("vaddps", &[Xmm, Xmm, M128], "EVEX.128.0F.W0 58 /r"),
            variant("vaddps", &[Xmm, Xmm, Xmm], "VEX.128.0F.WIG 58 /r"),
        ])
        .unwrap();
        assert!(!rows[0].descriptor.is_evex());
        assert!(rows[1].descriptor.is_evex());
    }

    #[test]
    fn test_fewer_operands_first() {
        let rows = sort_variants(vec![
            variant("ret", &[I16], "C2 iw"),
            variant("ret", &[], "C3"),
        ])
        .unwrap();
        assert!(rows[0].operands.is_empty());
    }

    #[test]
    fn test_misordered_detection() {
        let rows = vec![
            variant("mov", &[R32, I32], "B8+r id"),
            variant("add", &[R32, I8], "83 /0 ib"),
        ];
        assert_eq!(first_misordered(&rows).unwrap(), Some(1));
    }
}

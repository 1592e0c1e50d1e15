//! Secondary (mnemonic, operand tuple) -> row lookup.
//!
//! Kept as a sorted array so a consumer can binary search it directly from
//! the generated text without building a hash map at startup.

use super::select::Variant;
use crate::isa::operand::OperandType;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub name: String,
    pub operands: Vec<OperandType>,
    pub row: usize,
}

impl LookupEntry {
    fn cmp_key(&self, name: &str, operands: &[OperandType]) -> Ordering {
        self.name
            .as_str()
            .cmp(name)
            .then_with(|| self.operands.as_slice().cmp(operands))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Build from ordered table rows. The first row of a key is its
    /// canonical representative.
    pub fn build(rows: &[Variant]) -> Self {
        let mut entries: Vec<LookupEntry> = rows
            .iter()
            .enumerate()
            .map(|(row, v)| LookupEntry {
                name: v.name.clone(),
                operands: v.operands.clone(),
                row,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.cmp_key(&b.name, &b.operands)
                .then_with(|| a.row.cmp(&b.row))
        });
        entries.dedup_by(|b, a| a.name == b.name && a.operands == b.operands);
        Self { entries }
    }

    pub fn find(&self, name: &str, operands: &[OperandType]) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.cmp_key(name, operands))
            .ok()
            .map(|i| self.entries[i].row)
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingDescriptor;
    use OperandType::*;

    fn variant(name: &str, ops: &[OperandType], enc: &str) -> Variant {
        Variant::new(name, ops.to_vec(), EncodingDescriptor::parse(enc).unwrap())
    }

    #[test]
    fn test_find() {
        let rows = vec![
            variant("add", &[R32, I8], "83 /0 ib"),
            variant("add", &[R32, I32], "81 /0 id"),
            variant("mov", &[R32, I32], "B8+r id"),
        ];
        let lookup = LookupTable::build(&rows);
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.find("add", &[R32, I32]), Some(1));
        assert_eq!(lookup.find("mov", &[R32, I32]), Some(2));
        assert_eq!(lookup.find("mov", &[R64, I32]), None);
        assert_eq!(lookup.find("sub", &[R32, I32]), None);
    }

    #[test]
    fn test_duplicate_key_keeps_first_row() {
        let rows = vec![
            variant("add", &[R32, R32], "01 /r"),
            variant("add", &[R32, R32], "03 /r"),
        ];
        let lookup = LookupTable::build(&rows);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.find("add", &[R32, R32]), Some(0));
    }
}

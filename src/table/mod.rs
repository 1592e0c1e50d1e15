// This module assembles the encoding table from parsed records. The selector keeps the shortest
// encoding per (mnemonic, operand tuple) key, the orderer sorts the survivors into the fixed
// row order, the linker packs the three kinds of fallback links between rows, and the lookup
// table maps each key back to its row. Everything here runs single-threaded over values that
// were fully parsed beforehand, and every failure is a SchemaError.

//! Encoding table construction.

pub mod link;
pub mod lookup;
pub mod order;
pub mod select;

pub use link::{compute_links, pack_link, LinkContext, SpecialLink, MAX_ROWS, NO_LINK};
pub use lookup::{LookupEntry, LookupTable};
pub use order::{first_misordered, sort_variants, RowKey};
pub use select::{code_length, Variant, VariantKey, VariantSelector};

use crate::core::error::SchemaError;
use crate::isa::operand::OperandType;
use log::debug;

/// One row of the finished table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub variant: Variant,
    pub link: Option<SpecialLink>,
}

impl TableRow {
    /// 16-bit special index as written into the generated table.
    pub fn special_index(&self) -> u16 {
        pack_link(self.link)
    }
}

/// Ordered, linked table plus its secondary lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingTable {
    rows: Vec<TableRow>,
    lookup: LookupTable,
}

impl EncodingTable {
    /// Order `variants`, compute links and build the lookup.
    pub fn build(variants: Vec<Variant>) -> Result<Self, SchemaError> {
        let ordered = sort_variants(variants)?;
        let links = compute_links(&ordered)?;
        let lookup = LookupTable::build(&ordered);
        let rows: Vec<TableRow> = ordered
            .into_iter()
            .zip(links)
            .map(|(variant, link)| TableRow { variant, link })
            .collect();
        debug!(
            "table: {} rows, {} linked, {} lookup entries",
            rows.len(),
            rows.iter().filter(|r| r.link.is_some()).count(),
            lookup.len()
        );
        Ok(Self { rows, lookup })
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TableRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }

    /// Row index of `(name, operands)`.
    pub fn find(&self, name: &str, operands: &[OperandType]) -> Option<usize> {
        self.lookup.find(name, operands)
    }

    /// Row the link of row `index` points at.
    pub fn link_target(&self, index: usize) -> Option<&TableRow> {
        let link = self.rows.get(index)?.link?;
        self.rows.get(link.row)
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.rows.iter().map(|r| &r.variant)
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
    fn test_build_links_after_ordering() {
        let table = EncodingTable::build(vec![
            variant("mov", &[R64, I32], "REX.W B8+r id"),
            variant("mov", &[R32, I32], "B8+r id"),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        let wide = table.find("mov", &[R64, I32]).unwrap();
        let narrow = table.find("mov", &[R32, I32]).unwrap();
        assert_eq!(narrow, 0);
        assert_eq!(wide, 1);

        let row = table.row(wide).unwrap();
        assert_eq!(row.special_index(), narrow as u16);
        assert_eq!(table.link_target(wide).unwrap().variant.operands, vec![R32, I32]);
        assert_eq!(table.row(narrow).unwrap().special_index(), NO_LINK);
    }

    #[test]
    fn test_empty_table() {
        let table = EncodingTable::build(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.lookup().is_empty());
    }
}

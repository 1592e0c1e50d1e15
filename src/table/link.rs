//! Special links between table rows.
//!
//! A link tells the downstream encoder which other row to try when an
//! operand value fits a shorter form. It is packed into 16 bits: the top two
//! bits hold the [`LinkContext`], the low 14 bits the target row. `0xFFFF`
//! means "no link" and cannot collide with a real link because context 3
//! is never produced.

use super::select::Variant;
use crate::core::error::SchemaError;
use crate::isa::operand::OperandType;
use hashbrown::HashMap;
use log::trace;

/// Packed value of a row without a link.
pub const NO_LINK: u16 = 0xFFFF;

/// Largest table the 14-bit row field can address.
pub const MAX_ROWS: usize = 0x3FFF;

const ROW_MASK: u16 = 0x3FFF;

const SHIFT_MNEMONICS: [&str; 8] = ["rol", "ror", "rcl", "rcr", "shl", "shr", "sal", "sar"];

/// Why a row links to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkContext {
    /// `mov r64, i32` falls back to `mov r32, i32` for unsigned values.
    WideImmediate = 0,
    /// A shift/rotate by a count falls back to the by-one form.
    ShiftByOne = 1,
    /// Three-operand `imul` with a wide immediate falls back to `imm8`.
    NarrowImmediate = 2,
}

impl LinkContext {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(LinkContext::WideImmediate),
            1 => Some(LinkContext::ShiftByOne),
            2 => Some(LinkContext::NarrowImmediate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecialLink {
    pub context: LinkContext,
    pub row: usize,
}

impl SpecialLink {
    pub fn pack(self) -> u16 {
        ((self.context as u16) << 14) | (self.row as u16 & ROW_MASK)
    }

    pub fn unpack(packed: u16) -> Option<Self> {
        if packed == NO_LINK {
            return None;
        }
        Some(Self {
            context: LinkContext::from_bits(packed >> 14)?,
            row: (packed & ROW_MASK) as usize,
        })
    }
}

/// Packed form of an optional link.
pub fn pack_link(link: Option<SpecialLink>) -> u16 {
    link.map_or(NO_LINK, SpecialLink::pack)
}

/// Compute the link of every row of an ordered table.
///
/// A link whose target key is not in the table is left out.
pub fn compute_links(rows: &[Variant]) -> Result<Vec<Option<SpecialLink>>, SchemaError> {
    if rows.len() > MAX_ROWS {
        return Err(SchemaError::TableTooLarge {
            rows: rows.len(),
            max: MAX_ROWS,
        });
    }

    let mut index: HashMap<(&str, &[OperandType]), usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        index.entry((row.name.as_str(), row.operands.as_slice())).or_insert(i);
    }

    let mut links = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let link = match link_target(row) {
            Some((context, name, operands)) => index
                .get(&(name, operands.as_slice()))
                .map(|&target| SpecialLink { context, row: target }),
            None => None,
        };
        if let Some(link) = link {
            if link.row >= rows.len() {
                return Err(SchemaError::LinkOutOfBounds {
                    row: i,
                    target: link.row,
                    len: rows.len(),
                });
            }
            trace!("row {} {} {:?} -> {:?}", i, row.name, row.operands, link);
        }
        links.push(link);
    }
    Ok(links)
}

/// Key a row should link to, if its mnemonic and operands call for one.
fn link_target(row: &Variant) -> Option<(LinkContext, &str, Vec<OperandType>)> {
    use OperandType::*;
    let ops = row.operands.as_slice();
    let name = row.name.as_str();

    if name == "mov" && ops == [R64, I32] {
        return Some((LinkContext::WideImmediate, name, vec![R32, I32]));
    }
    if SHIFT_MNEMONICS.contains(&name) && ops.len() == 2 && ops[1] != One {
        return Some((LinkContext::ShiftByOne, name, vec![ops[0], One]));
    }
    if name == "imul" && ops.len() == 3 && matches!(ops[2], I16 | I32) {
        return Some((LinkContext::NarrowImmediate, name, vec![ops[0], ops[1], I8]));
    }
    None
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
    fn test_pack_unpack() {
        let link = SpecialLink {
            context: LinkContext::ShiftByOne,
            row: 0x1234,
        };
        assert_eq!(link.pack(), 0x5234);
        assert_eq!(SpecialLink::unpack(0x5234), Some(link));
        assert_eq!(SpecialLink::unpack(NO_LINK), None);
        assert_eq!(pack_link(None), NO_LINK);
    }

    #[test]
    fn test_highest_row_does_not_collide_with_sentinel() {
        let link = SpecialLink {
            context: LinkContext::NarrowImmediate,
            row: MAX_ROWS - 1,
        };
        assert_ne!(link.pack(), NO_LINK);
    }

    #[test]
    fn test_three_contexts() {
        let rows = vec![
            variant("imul", &[R32, R32, I8], "6B /r ib"),
            variant("imul", &[R32, R32, I32], "69 /r id"),
            variant("mov", &[R32, I32], "B8+r id"),
            variant("mov", &[R64, I32], "REX.W C7 /0 id"),
            variant("shl", &[R32, Cl], "D3 /4"),
            variant("shl", &[R32, One], "D1 /4"),
            variant("shl", &[R32, I8], "C1 /4 ib"),
        ];
        let links = compute_links(&rows).unwrap();
        assert_eq!(links[0], None);
        assert_eq!(
            links[1],
            Some(SpecialLink {
                context: LinkContext::NarrowImmediate,
                row: 0
            })
        );
        assert_eq!(links[2], None);
        assert_eq!(
            links[3],
            Some(SpecialLink {
                context: LinkContext::WideImmediate,
                row: 2
            })
        );
        assert_eq!(links[4].map(|l| l.row), Some(5));
        assert_eq!(links[5], None);
        assert_eq!(
            links[6],
            Some(SpecialLink {
                context: LinkContext::ShiftByOne,
                row: 5
            })
        );
    }

    #[test]
    fn test_missing_target_means_no_link() {
        let rows = vec![
            variant("imul", &[R64, R64, I32], "REX.W 69 /r id"),
            variant("ror", &[R8, I8], "C0 /1 ib"),
        ];
        assert_eq!(compute_links(&rows).unwrap(), vec![None, None]);
    }

    #[test]
    fn test_table_too_large() {
        let row = variant("nop", &[], "90");
        let rows = vec![row; MAX_ROWS + 1];
        assert!(matches!(
            compute_links(&rows),
            Err(SchemaError::TableTooLarge { .. })
        ));
    }
}

//! Variant selection.
//!
//! Several raw encodings can produce the same (mnemonic, operand tuple)
//! key, e.g. `add r32, r32` is both `01 /r` and `03 /r`. The selector keeps
//! exactly one per key: the shortest by [`code_length`], and on a tie the
//! one offered first. The tie-break is only there to make the output
//! deterministic; it carries no meaning about which encoding is better.

use crate::encoding::descriptor::EncodingDescriptor;
use crate::isa::operand::OperandType;
use hashbrown::HashMap;
use log::trace;

/// Composite key of a table row.
pub type VariantKey = (String, Vec<OperandType>);

/// One canonical (mnemonic, operand tuple, encoding) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub operands: Vec<OperandType>,
    pub descriptor: EncodingDescriptor,
}

impl Variant {
    pub fn new(name: &str, operands: Vec<OperandType>, descriptor: EncodingDescriptor) -> Self {
        Self {
            name: name.to_string(),
            operands,
            descriptor,
        }
    }

    pub fn key(&self) -> VariantKey {
        (self.name.clone(), self.operands.clone())
    }

    pub fn code_length(&self) -> u32 {
        code_length(&self.descriptor)
    }
}

/// Length metric used to rank encodings of one key.
///
/// One byte for any legacy prefixes, one per nonzero opcode byte, one for a
/// ModRM extension and one for REX.W.
pub fn code_length(descriptor: &EncodingDescriptor) -> u32 {
    let prefix = u32::from(!descriptor.prefixes.is_empty());
    let opcode = descriptor.opcode.iter().filter(|&&b| b != 0).count() as u32;
    let modrm = u32::from(descriptor.modrm.is_some());
    let rex_w = u32::from(descriptor.rex_w);
    prefix + opcode + modrm + rex_w
}

/// Accumulates candidate encodings and keeps the shortest per key.
#[derive(Debug, Default)]
pub struct VariantSelector {
    index: HashMap<VariantKey, usize>,
    variants: Vec<Variant>,
    offered: usize,
}

impl VariantSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer one candidate encoding for `(name, operands)`.
    pub fn offer(&mut self, name: &str, operands: Vec<OperandType>, descriptor: &EncodingDescriptor) {
        self.offered += 1;
        let key = (name.to_string(), operands);
        match self.index.get(&key) {
            Some(&slot) => {
                let current = &mut self.variants[slot];
                if code_length(descriptor) < current.code_length() {
                    trace!(
                        "{} {:?}: '{}' replaces '{}'",
                        name,
                        key.1,
                        descriptor,
                        current.descriptor
                    );
                    current.descriptor = descriptor.clone();
                }
            }
            None => {
                self.index.insert(key.clone(), self.variants.len());
                self.variants.push(Variant {
                    name: key.0,
                    operands: key.1,
                    descriptor: descriptor.clone(),
                });
            }
        }
    }

    /// Number of candidates offered so far.
    pub fn offered(&self) -> usize {
        self.offered
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Selected variants, in the order their keys were first seen.
    pub fn finish(self) -> Vec<Variant> {
        self.variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperandType::*;

    fn desc(enc: &str) -> EncodingDescriptor {
        EncodingDescriptor::parse(enc).unwrap()
    }

    #[test]
    fn test_code_length() {
        assert_eq!(code_length(&desc("REX.W B8+r id")), 2);
        assert_eq!(code_length(&desc("66 0F 38 9A /r")), 5);
        assert_eq!(code_length(&desc("C7 /0 id")), 2);
        assert_eq!(code_length(&desc("0F 00 /0")), 2);
    }

    #[test]
    fn test_shortest_wins() {
        let mut sel = VariantSelector::new();
        sel.offer("mov", vec![R64, I32], &desc("REX.W C7 /0 id"));
        sel.offer("mov", vec![R64, I32], &desc("REX.W B8+r id"));
        let variants = sel.finish();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].descriptor.opcode, vec![0xB8]);
    }

    #[test]
    fn test_tie_keeps_first() {
        let mut sel = VariantSelector::new();
        sel.offer("add", vec![R32, R32], &desc("01 /r"));
        sel.offer("add", vec![R32, R32], &desc("03 /r"));
        assert_eq!(sel.offered(), 2);
        let variants = sel.finish();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].descriptor.opcode, vec![0x01]);
    }

    #[test]
    fn test_first_seen_order() {
        let mut sel = VariantSelector::new();
        sel.offer("sub", vec![R32, R32], &desc("29 /r"));
        sel.offer("add", vec![R32, R32], &desc("01 /r"));
        sel.offer("sub", vec![R32, R32], &desc("2B /r"));
        let names: Vec<_> = sel.finish().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["sub", "add"]);
    }
}

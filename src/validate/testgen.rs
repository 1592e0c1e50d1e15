//! Concrete test instructions for table rows.
//!
//! Each operand type has a small catalogue of representative values in
//! assembler syntax. A row's test cases are the cartesian product of its
//! operand catalogues, produced lazily by [`TestCombinations`].
//!
//! Catalogue rules:
//! - registers: a low register plus one that needs an extension bit
//!   (`r11d`, `xmm13`, `zmm29`, ...);
//! - immediates: `0`, `1`, the type's bounds and every narrower type's
//!   bounds, so truncation and sign extension are exercised;
//! - memory: absolute, rip-relative, then indirect, base+disp,
//!   base+index+disp and every scale, each with ordinary and extended
//!   registers. Broadcast forms take `{1toN}` from the vector width.

use crate::core::config::AsmDialect;
use crate::isa::operand::OperandType;
use crate::table::{EncodingTable, Variant};
use std::sync::Arc;

/// One rendered test instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub variant: Arc<Variant>,
    /// Row of `variant` in the table.
    pub row: usize,
    pub operands: Vec<String>,
    /// Full instruction text, e.g. `add ecx, 127`.
    pub text: String,
}

impl TestCase {
    pub fn new(variant: Arc<Variant>, row: usize, operands: Vec<String>) -> Self {
        let text = if operands.is_empty() {
            variant.name.clone()
        } else {
            format!("{} {}", variant.name, operands.join(", "))
        };
        Self {
            variant,
            row,
            operands,
            text,
        }
    }

    pub fn mnemonic(&self) -> &str {
        &self.variant.name
    }
}

/// Lazy odometer over the operand catalogues of one row.
///
/// The sequence is consumed once; it cannot be restarted or cloned.
#[derive(Debug)]
pub struct TestCombinations {
    variant: Arc<Variant>,
    row: usize,
    catalogues: Vec<Vec<String>>,
    indices: Vec<usize>,
    done: bool,
    remaining: Option<usize>,
}

impl TestCombinations {
    /// Combinations for `variant` at table row `row`, capped at `limit`
    /// cases when given.
    pub fn new(variant: Arc<Variant>, row: usize, dialect: AsmDialect, limit: Option<usize>) -> Self {
        let catalogues: Vec<Vec<String>> = variant
            .operands
            .iter()
            .map(|&op| catalogue(op, &variant, dialect))
            .collect();
        let done = catalogues.iter().any(Vec::is_empty) || limit == Some(0);
        Self {
            indices: vec![0; catalogues.len()],
            variant,
            row,
            catalogues,
            done,
            remaining: limit,
        }
    }

    /// Number of cases the full product holds, ignoring the cap.
    pub fn total(&self) -> usize {
        self.catalogues.iter().map(Vec::len).product()
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.catalogues[pos].len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.done = true;
    }
}

impl Iterator for TestCombinations {
    type Item = TestCase;

    fn next(&mut self) -> Option<TestCase> {
        if self.done {
            return None;
        }
        let operands: Vec<String> = self
            .indices
            .iter()
            .zip(&self.catalogues)
            .map(|(&i, values)| values[i].clone())
            .collect();
        self.advance();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.done = true;
            }
        }
        Some(TestCase::new(Arc::clone(&self.variant), self.row, operands))
    }
}

/// Every test case of every row, in table order.
pub fn generate_cases(table: &EncodingTable, dialect: AsmDialect, limit: Option<usize>) -> Vec<TestCase> {
    table
        .variants()
        .enumerate()
        .flat_map(|(row, v)| TestCombinations::new(Arc::new(v.clone()), row, dialect, limit))
        .collect()
}

/// Representative values of `op` in `dialect` syntax.
pub fn catalogue(op: OperandType, variant: &Variant, dialect: AsmDialect) -> Vec<String> {
    use OperandType::*;
    let nasm = dialect == AsmDialect::Nasm;
    let list = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    match op {
        Al => list(&["al"]),
        Cl => list(&["cl"]),
        Ax => list(&["ax"]),
        Dx => list(&["dx"]),
        Eax => list(&["eax"]),
        Rax => list(&["rax"]),
        R8 => list(&["bl", "r10b"]),
        R16 => list(&["cx", "r11w"]),
        R32 => list(&["ecx", "r11d"]),
        R64 => list(&["rdx", "r12"]),
        St0 if nasm => list(&["st0"]),
        St0 => list(&["st(0)"]),
        St if nasm => list(&["st1", "st7"]),
        St => list(&["st(1)", "st(7)"]),
        Sreg => list(&["ds", "es"]),
        Fs => list(&["fs"]),
        Gs => list(&["gs"]),
        Creg => list(&["cr0", "cr8"]),
        Dreg => list(&["dr0", "dr7"]),
        Mmx => list(&["mm1", "mm6"]),
        Xmm => list(&["xmm2", "xmm13"]),
        Ymm => list(&["ymm3", "ymm12"]),
        Zmm => list(&["zmm1", "zmm29"]),
        XmmK | YmmK | ZmmK | XmmKz | YmmKz | ZmmKz => {
            let zero = matches!(op, XmmKz | YmmKz | ZmmKz);
            let base = match op {
                XmmK | XmmKz => Xmm,
                YmmK | YmmKz => Ymm,
                _ => Zmm,
            };
            catalogue(base, variant, dialect)
                .into_iter()
                .zip(["k1", "k7"])
                .map(|(reg, k)| {
                    if zero {
                        format!("{reg}{{{k}}}{{z}}")
                    } else {
                        format!("{reg}{{{k}}}")
                    }
                })
                .collect()
        }
        K => list(&["k1", "k6"]),
        KK => list(&["k2{k1}", "k5{k7}"]),
        One => list(&["1"]),
        I8 | I16 | I32 | I64 => immediates(op),
        M16Bcst | M32Bcst | M64Bcst => broadcast(op, variant, dialect),
        Vm32x | Vm32y | Vm32z | Vm64x | Vm64y | Vm64z => vsib(op, dialect),
        Rel8 if nasm => list(&["short $+0x10", "short $-0x10"]),
        Rel8 => list(&[".+0x10", ".-0x10"]),
        Rel32 if nasm => list(&["near $+0x1000", "near $-0x1000"]),
        Rel32 => list(&[".+0x1000", ".-0x1000"]),
        Moff8 | Moff16 | Moff32 | Moff64 => moffs(op, dialect),
        M8 | M16 | M32 | M64 | M80 | M128 | M256 | M512 | Mem => memory(op, dialect),
    }
}

/// `0`, `1`, then the bounds of the type and of every narrower type,
/// widest first.
fn immediates(op: OperandType) -> Vec<String> {
    let bits = op.immediate_bits().unwrap_or(8);
    let mut values: Vec<i128> = vec![0, 1];
    for width in [64u32, 32, 16, 8] {
        if width <= bits {
            values.push((1i128 << (width - 1)) - 1);
            values.push(-(1i128 << (width - 1)));
        }
    }
    let mut seen = Vec::with_capacity(values.len());
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.into_iter().map(|v| v.to_string()).collect()
}

/// Size keyword for an access of `bits` bits.
fn size_keyword(bits: u32, dialect: AsmDialect) -> Option<&'static str> {
    let (nasm, gas) = match bits {
        8 => ("byte", "BYTE PTR"),
        16 => ("word", "WORD PTR"),
        32 => ("dword", "DWORD PTR"),
        64 => ("qword", "QWORD PTR"),
        80 => ("tword", "TBYTE PTR"),
        128 => ("oword", "XMMWORD PTR"),
        256 => ("yword", "YMMWORD PTR"),
        512 => ("zword", "ZMMWORD PTR"),
        _ => return None,
    };
    Some(match dialect {
        AsmDialect::Nasm => nasm,
        AsmDialect::Gas => gas,
    })
}

/// Every addressing shape, with ordinary then extended registers.
fn address_shapes(dialect: AsmDialect) -> Vec<String> {
    let mut shapes = vec![
        "[0x1000]".to_string(),
        match dialect {
            AsmDialect::Nasm => "[rel 0x10]".to_string(),
            AsmDialect::Gas => "[rip+0x10]".to_string(),
        },
    ];
    let registers = [("rax", "rbx", "rsi", "rdi"), ("r9", "r13", "r10", "r14")];
    for (indirect, base, index_base, index) in registers {
        shapes.push(format!("[{indirect}]"));
        shapes.push(format!("[{base}+0x40]"));
        shapes.push(format!("[{index_base}+{index}+0x10]"));
        for scale in [2, 4, 8] {
            shapes.push(format!("[{base}+{index}*{scale}+0x80]"));
        }
    }
    shapes
}

fn with_size(address: String, bits: Option<u32>, dialect: AsmDialect) -> String {
    match bits.and_then(|b| size_keyword(b, dialect)) {
        Some(keyword) => format!("{keyword} {address}"),
        None => address,
    }
}

fn memory(op: OperandType, dialect: AsmDialect) -> Vec<String> {
    address_shapes(dialect)
        .into_iter()
        .map(|addr| with_size(addr, op.memory_bits(), dialect))
        .collect()
}

/// Vector width the broadcast expands to: the encoded length, otherwise the
/// widest vector operand.
fn vector_width(variant: &Variant) -> u32 {
    variant
        .descriptor
        .vector
        .and_then(|v| v.length.bits())
        .or_else(|| variant.operands.iter().filter_map(|op| op.vector_bits()).max())
        .unwrap_or(128)
}

fn broadcast(op: OperandType, variant: &Variant, dialect: AsmDialect) -> Vec<String> {
    let element = op.broadcast_bits().unwrap_or(32);
    let count = (vector_width(variant) / element).max(1);
    ["[rax]", "[r9+0x40]"]
        .iter()
        .map(|addr| with_size(format!("{addr}{{1to{count}}}"), Some(element), dialect))
        .collect()
}

fn vsib(op: OperandType, dialect: AsmDialect) -> Vec<String> {
    use OperandType::*;
    let (element, index) = match op {
        Vm32x => (32, "xmm"),
        Vm32y => (32, "ymm"),
        Vm32z => (32, "zmm"),
        Vm64x => (64, "xmm"),
        Vm64y => (64, "ymm"),
        _ => (64, "zmm"),
    };
    let scale = element / 8;
    let shapes = [
        format!("[rax+{index}1*{scale}+0x10]"),
        format!("[r9+{index}14*{scale}]"),
    ];
    shapes
        .into_iter()
        .map(|addr| match dialect {
            AsmDialect::Nasm => addr,
            AsmDialect::Gas => with_size(addr, Some(element), dialect),
        })
        .collect()
}

fn moffs(op: OperandType, dialect: AsmDialect) -> Vec<String> {
    let bits = op.memory_bits();
    ["0x1122334455667788", "0x10"]
        .iter()
        .map(|addr| match dialect {
            AsmDialect::Nasm => with_size(format!("[qword {addr}]"), bits, dialect),
            AsmDialect::Gas => with_size(format!("ds:{addr}"), bits, dialect),
        })
        .collect()
}

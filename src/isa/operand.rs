//! The operand type domain and its fixed total order.
//!
//! Every operand of every table row is one of the [`OperandType`] values
//! below. Rows of one mnemonic are laid out by the rank of their first two
//! operands in [`RANK_ORDER`], so the order is part of the generated table's
//! format: reordering it changes every row index and every special link.

use crate::core::error::SchemaError;
use std::fmt;

macro_rules! operand_types {
    ($($variant:ident => $token:literal, $table:literal;)*) => {
        /// Symbolic operand class and width.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OperandType {
            $($variant,)*
        }

        impl OperandType {
            /// Every operand type, in declaration order.
            pub const ALL: &'static [OperandType] = &[$(OperandType::$variant,)*];

            /// Canonical catalogue token, e.g. `r32` or `xmm_kz`.
            pub fn name(self) -> &'static str {
                match self {
                    $(OperandType::$variant => $token,)*
                }
            }

            /// Constant name used in generated table rows, e.g. `OP_R32`.
            pub fn table_name(self) -> &'static str {
                match self {
                    $(OperandType::$variant => $table,)*
                }
            }

            /// Look up a canonical token. Aliases are resolved by
            /// [`OperandType::parse`].
            pub fn from_name(name: &str) -> Option<OperandType> {
                match name {
                    $($token => Some(OperandType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

operand_types! {
    // general purpose registers, narrow to wide, fixed registers first
    Al => "al", "OP_AL";
    Cl => "cl", "OP_CL";
    R8 => "r8", "OP_R8";
    Ax => "ax", "OP_AX";
    Dx => "dx", "OP_DX";
    R16 => "r16", "OP_R16";
    Eax => "eax", "OP_EAX";
    R32 => "r32", "OP_R32";
    Rax => "rax", "OP_RAX";
    R64 => "r64", "OP_R64";
    St0 => "st0", "OP_ST0";
    St => "st", "OP_ST";
    // immediates
    One => "1", "OP_ONE";
    I8 => "i8", "OP_I8";
    I16 => "i16", "OP_I16";
    I32 => "i32", "OP_I32";
    I64 => "i64", "OP_I64";
    // segment, control and debug registers
    Sreg => "sreg", "OP_SREG";
    Fs => "fs", "OP_FS";
    Gs => "gs", "OP_GS";
    Creg => "creg", "OP_CREG";
    Dreg => "dreg", "OP_DREG";
    // memory
    M8 => "m8", "OP_M8";
    M16 => "m16", "OP_M16";
    M32 => "m32", "OP_M32";
    M64 => "m64", "OP_M64";
    M80 => "m80", "OP_M80";
    M128 => "m128", "OP_M128";
    M256 => "m256", "OP_M256";
    M512 => "m512", "OP_M512";
    Mem => "mem", "OP_MEM";
    M16Bcst => "m16bcst", "OP_M16BCST";
    M32Bcst => "m32bcst", "OP_M32BCST";
    M64Bcst => "m64bcst", "OP_M64BCST";
    Vm32x => "vm32x", "OP_VM32X";
    Vm32y => "vm32y", "OP_VM32Y";
    Vm32z => "vm32z", "OP_VM32Z";
    Vm64x => "vm64x", "OP_VM64X";
    Vm64y => "vm64y", "OP_VM64Y";
    Vm64z => "vm64z", "OP_VM64Z";
    // vector and mask registers
    Mmx => "mmx", "OP_MMX";
    Xmm => "xmm", "OP_XMM";
    XmmK => "xmm_k", "OP_XMM_K";
    XmmKz => "xmm_kz", "OP_XMM_KZ";
    Ymm => "ymm", "OP_YMM";
    YmmK => "ymm_k", "OP_YMM_K";
    YmmKz => "ymm_kz", "OP_YMM_KZ";
    Zmm => "zmm", "OP_ZMM";
    ZmmK => "zmm_k", "OP_ZMM_K";
    ZmmKz => "zmm_kz", "OP_ZMM_KZ";
    K => "k", "OP_K";
    KK => "k_k", "OP_K_K";
    // branch targets and absolute offsets
    Rel8 => "rel8", "OP_REL8";
    Rel32 => "rel32", "OP_REL32";
    Moff8 => "moff8", "OP_MOFF8";
    Moff16 => "moff16", "OP_MOFF16";
    Moff32 => "moff32", "OP_MOFF32";
    Moff64 => "moff64", "OP_MOFF64";
}

/// The fixed total order over operand types.
///
/// Widening register classes, then immediates, then segment/control/debug
/// registers, then memory classes, then vector and mask forms, then relative
/// and offset forms. A type missing here is a defect that
/// [`OperandType::rank`] reports instead of guessing a position.
pub const RANK_ORDER: &[OperandType] = &[
    OperandType::Al,
    OperandType::Cl,
    OperandType::R8,
    OperandType::Ax,
    OperandType::Dx,
    OperandType::R16,
    OperandType::Eax,
    OperandType::R32,
    OperandType::Rax,
    OperandType::R64,
    OperandType::St0,
    OperandType::St,
    OperandType::One,
    OperandType::I8,
    OperandType::I16,
    OperandType::I32,
    OperandType::I64,
    OperandType::Sreg,
    OperandType::Fs,
    OperandType::Gs,
    OperandType::Creg,
    OperandType::Dreg,
    OperandType::M8,
    OperandType::M16,
    OperandType::M32,
    OperandType::M64,
    OperandType::M80,
    OperandType::M128,
    OperandType::M256,
    OperandType::M512,
    OperandType::Mem,
    OperandType::M16Bcst,
    OperandType::M32Bcst,
    OperandType::M64Bcst,
    OperandType::Vm32x,
    OperandType::Vm32y,
    OperandType::Vm32z,
    OperandType::Vm64x,
    OperandType::Vm64y,
    OperandType::Vm64z,
    OperandType::Mmx,
    OperandType::Xmm,
    OperandType::XmmK,
    OperandType::XmmKz,
    OperandType::Ymm,
    OperandType::YmmK,
    OperandType::YmmKz,
    OperandType::Zmm,
    OperandType::ZmmK,
    OperandType::ZmmKz,
    OperandType::K,
    OperandType::KK,
    OperandType::Rel8,
    OperandType::Rel32,
    OperandType::Moff8,
    OperandType::Moff16,
    OperandType::Moff32,
    OperandType::Moff64,
];

/// Mask suffix folded onto a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSuffix {
    /// `{k}`: merge masking.
    Merge,
    /// `{kz}`: zero masking.
    Zero,
}

impl OperandType {
    /// Position of this type in [`RANK_ORDER`].
    pub fn rank(self) -> Result<u16, SchemaError> {
        RANK_ORDER
            .iter()
            .position(|&t| t == self)
            .map(|pos| pos as u16)
            .ok_or_else(|| SchemaError::UnrankedOperand {
                operand: self.name().to_string(),
            })
    }

    /// Parse a raw operand token, resolving spelling aliases.
    ///
    /// Returns `None` for tokens outside the operand domain.
    pub fn parse(token: &str) -> Option<OperandType> {
        let lower = token.to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "ib" | "ub" | "u8" | "imm8" => "i8",
            "iw" | "uw" | "u16" | "imm16" => "i16",
            "id" | "ud" | "u32" | "imm32" => "i32",
            "iq" | "uq" | "u64" | "imm64" => "i64",
            "mm" => "mmx",
            "st(0)" => "st0",
            "st(i)" => "st",
            "m16int" => "m16",
            "m32fp" | "m32int" => "m32",
            "m64fp" | "m64int" => "m64",
            "m80fp" | "m80bcd" | "m80dec" => "m80",
            "b16" => "m16bcst",
            "b32" => "m32bcst",
            "b64" => "m64bcst",
            "moffs8" => "moff8",
            "moffs16" => "moff16",
            "moffs32" => "moff32",
            "moffs64" => "moff64",
            other => other,
        };
        OperandType::from_name(canonical)
    }

    /// Register form carrying the given mask suffix, if the class can be
    /// masked. Memory operands absorb the suffix unchanged.
    pub fn with_mask(self, mask: MaskSuffix) -> Option<OperandType> {
        use OperandType::*;
        if self.is_memory() {
            return Some(self);
        }
        match (self, mask) {
            (Xmm, MaskSuffix::Merge) => Some(XmmK),
            (Xmm, MaskSuffix::Zero) => Some(XmmKz),
            (Ymm, MaskSuffix::Merge) => Some(YmmK),
            (Ymm, MaskSuffix::Zero) => Some(YmmKz),
            (Zmm, MaskSuffix::Merge) => Some(ZmmK),
            (Zmm, MaskSuffix::Zero) => Some(ZmmKz),
            (K, MaskSuffix::Merge) => Some(KK),
            _ => None,
        }
    }

    pub fn is_memory(self) -> bool {
        use OperandType::*;
        matches!(
            self,
            M8 | M16
                | M32
                | M64
                | M80
                | M128
                | M256
                | M512
                | Mem
                | M16Bcst
                | M32Bcst
                | M64Bcst
                | Vm32x
                | Vm32y
                | Vm32z
                | Vm64x
                | Vm64y
                | Vm64z
        )
    }

    /// Width in bits of an immediate type. The literal `1` counts as 8 bits.
    pub fn immediate_bits(self) -> Option<u32> {
        match self {
            OperandType::One | OperandType::I8 => Some(8),
            OperandType::I16 => Some(16),
            OperandType::I32 => Some(32),
            OperandType::I64 => Some(64),
            _ => None,
        }
    }

    pub fn is_immediate(self) -> bool {
        self.immediate_bits().is_some()
    }

    /// Access size in bits of a sized memory type.
    pub fn memory_bits(self) -> Option<u32> {
        use OperandType::*;
        match self {
            M8 | Moff8 => Some(8),
            M16 | Moff16 | M16Bcst => Some(16),
            M32 | Moff32 | M32Bcst => Some(32),
            M64 | Moff64 | M64Bcst => Some(64),
            M80 => Some(80),
            M128 => Some(128),
            M256 => Some(256),
            M512 => Some(512),
            _ => None,
        }
    }

    /// Element width of a broadcast memory form.
    pub fn broadcast_bits(self) -> Option<u32> {
        match self {
            OperandType::M16Bcst => Some(16),
            OperandType::M32Bcst => Some(32),
            OperandType::M64Bcst => Some(64),
            _ => None,
        }
    }

    /// Vector register width in bits, including masked forms.
    pub fn vector_bits(self) -> Option<u32> {
        use OperandType::*;
        match self {
            Mmx => Some(64),
            Xmm | XmmK | XmmKz => Some(128),
            Ymm | YmmK | YmmKz => Some(256),
            Zmm | ZmmK | ZmmKz => Some(512),
            _ => None,
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

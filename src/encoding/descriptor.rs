// This module normalizes raw encoding syntax ("66 0F 38 9A /r", "REX.W B8+r id",
// "EVEX.256.66.0F38.W0 9A /r") into a structured EncodingDescriptor. Tokens are classified one
// at a time: legacy prefixes (only until the first opcode byte), opcode bytes, REX.W, ModRM
// extensions, opcode+register folds, immediate markers, explicit encoding-id overrides and
// the three vector prefix families, each of which has its own whitelist of dotted sub-fields.
// The descriptor also knows how to pack itself into the prefix and flag bytes of a generated
// table row.

//! Encoding syntax normalizer.

use crate::core::error::ParseError;
use std::fmt;

/// Longest opcode (without map escape) accepted in a descriptor.
pub const MAX_OPCODE_BYTES: usize = 4;

/// Legacy prefix bytes that may precede the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyPrefix {
    OperandSize,
    AddressSize,
    Lock,
    Repne,
    Rep,
    Cs,
    Ss,
    Ds,
    Es,
    Fs,
    Gs,
}

impl LegacyPrefix {
    pub const ALL: [LegacyPrefix; 11] = [
        LegacyPrefix::OperandSize,
        LegacyPrefix::AddressSize,
        LegacyPrefix::Lock,
        LegacyPrefix::Repne,
        LegacyPrefix::Rep,
        LegacyPrefix::Cs,
        LegacyPrefix::Ss,
        LegacyPrefix::Ds,
        LegacyPrefix::Es,
        LegacyPrefix::Fs,
        LegacyPrefix::Gs,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.byte() == byte)
    }

    pub fn byte(self) -> u8 {
        match self {
            LegacyPrefix::OperandSize => 0x66,
            LegacyPrefix::AddressSize => 0x67,
            LegacyPrefix::Lock => 0xF0,
            LegacyPrefix::Repne => 0xF2,
            LegacyPrefix::Rep => 0xF3,
            LegacyPrefix::Cs => 0x2E,
            LegacyPrefix::Ss => 0x36,
            LegacyPrefix::Ds => 0x3E,
            LegacyPrefix::Es => 0x26,
            LegacyPrefix::Fs => 0x64,
            LegacyPrefix::Gs => 0x65,
        }
    }

    /// Code in bits 5-2 of the packed prefix byte, for segment and branch
    /// hint prefixes.
    fn segment_code(self) -> Option<u8> {
        match self {
            LegacyPrefix::Es => Some(1),
            LegacyPrefix::Cs => Some(2),
            LegacyPrefix::Ss => Some(3),
            LegacyPrefix::Ds => Some(4),
            LegacyPrefix::Fs => Some(5),
            LegacyPrefix::Gs => Some(6),
            _ => None,
        }
    }

    /// Code in bits 1-0 of the packed prefix byte.
    fn repeat_code(self) -> Option<u8> {
        match self {
            LegacyPrefix::Lock => Some(1),
            LegacyPrefix::Repne => Some(2),
            LegacyPrefix::Rep => Some(3),
            _ => None,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of legacy prefixes, iterated in [`LegacyPrefix::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PrefixSet {
    bits: u16,
}

impl PrefixSet {
    pub fn insert(&mut self, prefix: LegacyPrefix) {
        self.bits |= prefix.bit();
    }

    pub fn contains(&self, prefix: LegacyPrefix) -> bool {
        self.bits & prefix.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = LegacyPrefix> + '_ {
        LegacyPrefix::ALL.iter().copied().filter(|p| self.contains(*p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorFamily {
    Vex,
    Evex,
    Xop,
}

impl VectorFamily {
    pub fn name(self) -> &'static str {
        match self {
            VectorFamily::Vex => "VEX",
            VectorFamily::Evex => "EVEX",
            VectorFamily::Xop => "XOP",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "VEX" => Some(VectorFamily::Vex),
            "EVEX" => Some(VectorFamily::Evex),
            "XOP" => Some(VectorFamily::Xop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorLength {
    L128,
    L256,
    L512,
    /// `LIG`/`LLIG`: the length bits are ignored.
    Ignored,
}

impl VectorLength {
    pub fn bits(self) -> Option<u32> {
        match self {
            VectorLength::L128 => Some(128),
            VectorLength::L256 => Some(256),
            VectorLength::L512 => Some(512),
            VectorLength::Ignored => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeMap {
    Map0F,
    Map0F38,
    Map0F3A,
    Map5,
    Map6,
    Xop8,
    Xop9,
    XopA,
}

impl OpcodeMap {
    /// Bytes standing for the map in front of the opcode of a vector form.
    pub fn escape(self) -> &'static [u8] {
        match self {
            OpcodeMap::Map0F => &[0x0F],
            OpcodeMap::Map0F38 => &[0x0F, 0x38],
            OpcodeMap::Map0F3A => &[0x0F, 0x3A],
            OpcodeMap::Map5 => &[0x05],
            OpcodeMap::Map6 => &[0x06],
            OpcodeMap::Xop8 => &[0x08],
            OpcodeMap::Xop9 => &[0x09],
            OpcodeMap::XopA => &[0x0A],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorW {
    W0,
    W1,
    Ignored,
}

/// Decoded VEX/EVEX/XOP prefix token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorPrefix {
    pub family: VectorFamily,
    pub length: VectorLength,
    pub map: OpcodeMap,
    /// Mandatory prefix carried in the `pp` field.
    pub pp: Option<LegacyPrefix>,
    pub w: VectorW,
}

/// ModRM `reg` field usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModRm {
    /// `/0`..`/7`: the reg field holds a fixed digit.
    Digit(u8),
    /// `/r`: the reg field holds a register operand.
    Reg,
    /// `/is4`: register form with a register in imm8[7:4].
    Is4,
}

impl ModRm {
    /// Value of bits 1-4 of the packed flag byte.
    pub fn field(self) -> u8 {
        match self {
            ModRm::Digit(d) => d + 1,
            ModRm::Reg => 9,
            ModRm::Is4 => 10,
        }
    }

    /// Spelling in intermediate records: `"0"`..`"7"`, `"r"` or `"is4"`.
    pub fn record_name(self) -> String {
        match self {
            ModRm::Digit(d) => d.to_string(),
            ModRm::Reg => "r".to_string(),
            ModRm::Is4 => "is4".to_string(),
        }
    }
}

/// Register number or fixed digit added to the last opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeFold {
    /// `+r`, `+rb`, `+rw`, `+rd`, `+ro`
    Register,
    /// `+i` (x87 stack register)
    Immediate,
}

impl OpcodeFold {
    pub fn record_name(self) -> &'static str {
        match self {
            OpcodeFold::Register => "r",
            OpcodeFold::Immediate => "i",
        }
    }
}

/// Trailing immediate or code-offset marker (`ib`, `id`, `cd`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmediateMarker {
    Ib,
    Iw,
    Id,
    Iq,
    Io,
    Cb,
    Cw,
    Cd,
    Cp,
    Co,
    Ct,
}

impl ImmediateMarker {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "ib" => ImmediateMarker::Ib,
            "iw" => ImmediateMarker::Iw,
            "id" => ImmediateMarker::Id,
            "iq" => ImmediateMarker::Iq,
            "io" => ImmediateMarker::Io,
            "cb" => ImmediateMarker::Cb,
            "cw" => ImmediateMarker::Cw,
            "cd" => ImmediateMarker::Cd,
            "cp" => ImmediateMarker::Cp,
            "co" => ImmediateMarker::Co,
            "ct" => ImmediateMarker::Ct,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ImmediateMarker::Ib => "ib",
            ImmediateMarker::Iw => "iw",
            ImmediateMarker::Id => "id",
            ImmediateMarker::Iq => "iq",
            ImmediateMarker::Io => "io",
            ImmediateMarker::Cb => "cb",
            ImmediateMarker::Cw => "cw",
            ImmediateMarker::Cd => "cd",
            ImmediateMarker::Cp => "cp",
            ImmediateMarker::Co => "co",
            ImmediateMarker::Ct => "ct",
        }
    }
}

/// Normalized form of one raw encoding string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodingDescriptor {
    /// `NORMAL`, the vector family name, or an explicit `XX:` override.
    pub encoding_id: String,
    pub prefixes: PrefixSet,
    pub opcode: Vec<u8>,
    pub rex_w: bool,
    pub vector: Option<VectorPrefix>,
    pub modrm: Option<ModRm>,
    pub fold: Option<OpcodeFold>,
    pub immediates: Vec<ImmediateMarker>,
}

impl EncodingDescriptor {
    /// Parse one raw encoding string.
    pub fn parse(encoding: &str) -> Result<Self, ParseError> {
        let mut prefixes = PrefixSet::default();
        let mut opcode = Vec::new();
        let mut rex_w = false;
        let mut vector = None;
        let mut modrm = None;
        let mut fold = None;
        let mut immediates = Vec::new();
        let mut id_override: Option<String> = None;

        let unknown = |token: &str| ParseError::UnknownToken {
            token: token.to_string(),
            encoding: encoding.to_string(),
        };

        for token in encoding.split_whitespace() {
            if let Some(id) = token.strip_suffix(':') {
                if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(unknown(token));
                }
                id_override = Some(id.to_ascii_uppercase());
            } else if is_vector_token(token) {
                vector = Some(parse_vector(token)?);
            } else if token == "REX.W" {
                rex_w = true;
            } else if matches!(token, "REX" | "NP" | "NFx") {
                // carries no information for the table
            } else if token.starts_with('/') {
                modrm = Some(parse_modrm(token)?);
            } else if token.contains('+') {
                let (byte, kind) = parse_fold(token)?;
                opcode.push(byte);
                fold = Some(kind);
            } else if let Some(byte) = parse_hex_byte(token) {
                match LegacyPrefix::from_byte(byte) {
                    Some(prefix) if opcode.is_empty() && vector.is_none() => prefixes.insert(prefix),
                    _ => opcode.push(byte),
                }
            } else if let Some(marker) = ImmediateMarker::parse(token) {
                immediates.push(marker);
            } else {
                return Err(unknown(token));
            }

            if opcode.len() > MAX_OPCODE_BYTES {
                return Err(ParseError::OpcodeTooLong {
                    encoding: encoding.to_string(),
                    max: MAX_OPCODE_BYTES,
                });
            }
        }

        if opcode.is_empty() {
            return Err(ParseError::MissingOpcode {
                encoding: encoding.to_string(),
            });
        }

        let encoding_id = id_override
            .or_else(|| vector.map(|v: VectorPrefix| v.family.name().to_string()))
            .unwrap_or_else(|| "NORMAL".to_string());

        Ok(Self {
            encoding_id,
            prefixes,
            opcode,
            rex_w,
            vector,
            modrm,
            fold,
            immediates,
        })
    }

    pub fn family(&self) -> Option<VectorFamily> {
        self.vector.map(|v| v.family)
    }

    pub fn is_evex(&self) -> bool {
        self.family() == Some(VectorFamily::Evex)
    }

    /// Map escape (vector forms only) followed by the opcode bytes.
    pub fn full_opcode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.opcode.len() + 2);
        if let Some(v) = self.vector {
            bytes.extend_from_slice(v.map.escape());
        }
        bytes.extend_from_slice(&self.opcode);
        bytes
    }

    /// [`full_opcode`](Self::full_opcode) as one big-endian integer.
    pub fn opcode_value(&self) -> u64 {
        self.full_opcode()
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    /// Upper-case hex spelling of [`full_opcode`](Self::full_opcode).
    pub fn opcode_hex(&self) -> String {
        self.full_opcode().iter().map(|b| format!("{b:02X}")).collect()
    }

    /// Packed prefix byte of a generated table row.
    ///
    /// bit7 = 67h, bit6 = 66h, bits5-2 = segment/branch hint, bits1-0 =
    /// F0h/F2h/F3h. A vector mandatory prefix lands in the same bits.
    pub fn prefix_bits(&self) -> u8 {
        let mut bits = 0u8;
        let apply = |prefix: LegacyPrefix, bits: &mut u8| match prefix {
            LegacyPrefix::AddressSize => *bits |= 0x80,
            LegacyPrefix::OperandSize => *bits |= 0x40,
            other => {
                if let Some(code) = other.segment_code() {
                    if *bits & 0x3C == 0 {
                        *bits |= code << 2;
                    }
                } else if let Some(code) = other.repeat_code() {
                    if *bits & 0x03 == 0 {
                        *bits |= code;
                    }
                }
            }
        };
        for prefix in self.prefixes.iter() {
            apply(prefix, &mut bits);
        }
        if let Some(pp) = self.vector.and_then(|v| v.pp) {
            apply(pp, &mut bits);
        }
        bits
    }

    /// Packed flag byte of a generated table row.
    ///
    /// bit0 = REX.W, bits1-4 = ModRM extension field, bit5 = opcode fold,
    /// bit6 = vector W1, bit7 = the fold is `+i`.
    pub fn flag_bits(&self) -> u8 {
        let mut bits = 0u8;
        if self.rex_w {
            bits |= 0x01;
        }
        if let Some(modrm) = self.modrm {
            bits |= modrm.field() << 1;
        }
        if let Some(fold) = self.fold {
            bits |= 0x20;
            if fold == OpcodeFold::Immediate {
                bits |= 0x80;
            }
        }
        if self.vector.is_some_and(|v| v.w == VectorW::W1) {
            bits |= 0x40;
        }
        bits
    }
}

impl fmt::Display for EncodingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for prefix in self.prefixes.iter() {
            parts.push(format!("{:02X}", prefix.byte()));
        }
        if self.rex_w {
            parts.push("REX.W".to_string());
        }
        if let Some(v) = self.vector {
            let map: String = v.map.escape().iter().map(|b| format!("{b:02X}")).collect();
            parts.push(format!("{}.{map}", v.family.name()));
        }
        let last = self.opcode.len().saturating_sub(1);
        for (i, byte) in self.opcode.iter().enumerate() {
            match self.fold {
                Some(fold) if i == last => parts.push(format!("{byte:02X}+{}", fold.record_name())),
                _ => parts.push(format!("{byte:02X}")),
            }
        }
        if let Some(modrm) = self.modrm {
            parts.push(format!("/{}", modrm.record_name()));
        }
        for imm in &self.immediates {
            parts.push(imm.name().to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

fn is_vector_token(token: &str) -> bool {
    token.starts_with("VEX") || token.starts_with("EVEX") || token.starts_with("XOP")
}

/// Upper-case two-digit hex byte. Lower-case tokens such as `cd` are
/// immediate markers, not opcodes.
fn parse_hex_byte(token: &str) -> Option<u8> {
    if token.len() == 2
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    {
        u8::from_str_radix(token, 16).ok()
    } else {
        None
    }
}

fn parse_modrm(token: &str) -> Result<ModRm, ParseError> {
    let invalid = || ParseError::InvalidModRm {
        token: token.to_string(),
    };
    match &token[1..] {
        "r" => Ok(ModRm::Reg),
        "is4" => Ok(ModRm::Is4),
        digit if digit.len() == 1 => match digit.as_bytes()[0] {
            d @ b'0'..=b'7' => Ok(ModRm::Digit(d - b'0')),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

fn parse_fold(token: &str) -> Result<(u8, OpcodeFold), ParseError> {
    let invalid = || ParseError::InvalidFold {
        token: token.to_string(),
    };
    let (byte, marker) = token.split_once('+').ok_or_else(invalid)?;
    let byte = parse_hex_byte(byte).ok_or_else(invalid)?;
    let kind = match marker {
        "r" | "rb" | "rw" | "rd" | "ro" => OpcodeFold::Register,
        "i" => OpcodeFold::Immediate,
        _ => return Err(invalid()),
    };
    if byte & 0x07 != 0 {
        return Err(invalid());
    }
    Ok((byte, kind))
}

fn parse_vector(token: &str) -> Result<VectorPrefix, ParseError> {
    let mut fields = token.split('.');
    let head = fields.next().unwrap_or_default();
    let family = VectorFamily::from_name(head).ok_or_else(|| ParseError::UnknownVectorField {
        family: "vector",
        field: head.to_string(),
        token: token.to_string(),
    })?;

    let mut length = VectorLength::L128;
    let mut map = None;
    let mut pp = None;
    let mut w = VectorW::Ignored;

    for field in fields {
        let evex = family == VectorFamily::Evex;
        let xop = family == VectorFamily::Xop;
        match field {
            "128" | "L0" | "LZ" => length = VectorLength::L128,
            "256" | "L1" => length = VectorLength::L256,
            "LIG" => length = VectorLength::Ignored,
            "512" if evex => length = VectorLength::L512,
            "LLIG" if evex => length = VectorLength::Ignored,
            "0F" if !xop => map = Some(OpcodeMap::Map0F),
            "0F38" if !xop => map = Some(OpcodeMap::Map0F38),
            "0F3A" if !xop => map = Some(OpcodeMap::Map0F3A),
            "MAP5" if evex => map = Some(OpcodeMap::Map5),
            "MAP6" if evex => map = Some(OpcodeMap::Map6),
            "08" | "M08" if xop => map = Some(OpcodeMap::Xop8),
            "09" | "M09" if xop => map = Some(OpcodeMap::Xop9),
            "0A" | "M0A" if xop => map = Some(OpcodeMap::XopA),
            "66" if !xop => pp = Some(LegacyPrefix::OperandSize),
            "F2" if !xop => pp = Some(LegacyPrefix::Repne),
            "F3" if !xop => pp = Some(LegacyPrefix::Rep),
            "NP" => pp = None,
            "P0" if xop => pp = None,
            "W0" => w = VectorW::W0,
            "W1" => w = VectorW::W1,
            "WIG" => w = VectorW::Ignored,
            "NDS" | "NDD" | "DDS" => {}
            "K" | "Z" | "KZ" | "ER" | "SAE" | "B16" | "B32" | "B64" if evex => {}
            _ => {
                return Err(ParseError::UnknownVectorField {
                    family: family.name(),
                    field: field.to_string(),
                    token: token.to_string(),
                })
            }
        }
    }

    let map = map.ok_or_else(|| ParseError::MissingOpcodeMap {
        token: token.to_string(),
    })?;

    Ok(VectorPrefix {
        family,
        length,
        map,
        pp,
        w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_prefix_then_opcode() {
        let desc = EncodingDescriptor::parse("66 0F 38 9A /r").unwrap();
        assert!(desc.prefixes.contains(LegacyPrefix::OperandSize));
        assert_eq!(desc.opcode, vec![0x0F, 0x38, 0x9A]);
        assert_eq!(desc.modrm, Some(ModRm::Reg));
        assert_eq!(desc.encoding_id, "NORMAL");
        assert_eq!(desc.opcode_hex(), "0F389A");
    }

    #[test]
    fn test_prefix_bytes_after_opcode_are_opcode() {
        let desc = EncodingDescriptor::parse("F3 0F B8 /r").unwrap();
        assert!(desc.prefixes.contains(LegacyPrefix::Rep));
        assert_eq!(desc.opcode, vec![0x0F, 0xB8]);

        let desc = EncodingDescriptor::parse("0F 66").unwrap();
        assert!(desc.prefixes.is_empty());
        assert_eq!(desc.opcode, vec![0x0F, 0x66]);
    }

    #[test]
    fn test_rex_w_fold_and_immediate() {
        let desc = EncodingDescriptor::parse("REX.W B8+r id").unwrap();
        assert!(desc.rex_w);
        assert_eq!(desc.opcode, vec![0xB8]);
        assert_eq!(desc.fold, Some(OpcodeFold::Register));
        assert_eq!(desc.immediates, vec![ImmediateMarker::Id]);
        assert_eq!(desc.flag_bits(), 0x21);
    }

    #[test]
    fn test_lowercase_cd_is_marker_uppercase_is_opcode() {
        let desc = EncodingDescriptor::parse("CD ib").unwrap();
        assert_eq!(desc.opcode, vec![0xCD]);

        let desc = EncodingDescriptor::parse("E8 cd").unwrap();
        assert_eq!(desc.opcode, vec![0xE8]);
        assert_eq!(desc.immediates, vec![ImmediateMarker::Cd]);
    }

    #[test]
    fn test_evex_token() {
        let desc = EncodingDescriptor::parse("EVEX.256.66.0F38.W0 9A /r").unwrap();
        let v = desc.vector.unwrap();
        assert_eq!(v.family, VectorFamily::Evex);
        assert_eq!(v.length, VectorLength::L256);
        assert_eq!(v.map, OpcodeMap::Map0F38);
        assert_eq!(v.pp, Some(LegacyPrefix::OperandSize));
        assert_eq!(v.w, VectorW::W0);
        assert_eq!(desc.encoding_id, "EVEX");
        assert_eq!(desc.opcode_hex(), "0F389A");
        assert_eq!(desc.prefix_bits(), 0x40);
    }

    #[test]
    fn test_vex_opcode_matching_prefix_byte() {
        // 66 after a VEX token is an opcode (vpcmpgtd), not a prefix
        let desc = EncodingDescriptor::parse("VEX.NDS.128.66.0F.WIG 66 /r").unwrap();
        assert_eq!(desc.opcode, vec![0x66]);
        assert!(desc.prefixes.is_empty());
    }

    #[test]
    fn test_xop_whitelist() {
        let desc = EncodingDescriptor::parse("XOP.128.09.W0 81 /r").unwrap();
        assert_eq!(desc.vector.unwrap().map, OpcodeMap::Xop9);
        assert_eq!(desc.encoding_id, "XOP");

        let err = EncodingDescriptor::parse("XOP.128.66.09.W0 81 /r").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnknownVectorField { family: "XOP", ref field, .. } if field == "66"
        ));
    }

    #[test]
    fn test_explicit_no_prefix_fields() {
        let desc = EncodingDescriptor::parse("XOP.L0.P0.M09.W0 01 /1").unwrap();
        let vector = desc.vector.unwrap();
        assert_eq!(vector.map, OpcodeMap::Xop9);
        assert_eq!(vector.pp, None);
        assert_eq!(desc.modrm, Some(ModRm::Digit(1)));

        let desc = EncodingDescriptor::parse("VEX.128.NP.0F.WIG 58 /r").unwrap();
        assert_eq!(desc.vector.unwrap().pp, None);
        assert_eq!(desc.prefix_bits(), 0);

        let desc = EncodingDescriptor::parse("EVEX.512.NP.MAP5.W0 58 /r").unwrap();
        let vector = desc.vector.unwrap();
        assert_eq!(vector.map, OpcodeMap::Map5);
        assert_eq!(vector.pp, None);
        assert_eq!(desc.prefix_bits(), 0);

        assert!(EncodingDescriptor::parse("VEX.128.P0.0F.WIG 58 /r").is_err());
    }

    #[test]
    fn test_evex_only_fields_rejected_for_vex() {
        let err = EncodingDescriptor::parse("VEX.512.66.0F.W0 58 /r").unwrap_err();
        assert!(matches!(err, ParseError::UnknownVectorField { family: "VEX", .. }));

        assert!(EncodingDescriptor::parse("EVEX.512.66.0F.W1.ER 58 /r").is_ok());
    }

    #[test]
    fn test_unknown_vector_field_names_token() {
        let err = EncodingDescriptor::parse("EVEX.256.66.0F38.BOGUS 9A /r").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownVectorField {
                family: "EVEX",
                field: "BOGUS".to_string(),
                token: "EVEX.256.66.0F38.BOGUS".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_map() {
        let err = EncodingDescriptor::parse("VEX.128.66.W0 58 /r").unwrap_err();
        assert!(matches!(err, ParseError::MissingOpcodeMap { .. }));
    }

    #[test]
    fn test_encoding_id_override() {
        let desc = EncodingDescriptor::parse("MR: 89 /r").unwrap();
        assert_eq!(desc.encoding_id, "MR");

        let desc = EncodingDescriptor::parse("RVM: VEX.128.0F.W0 58 /r").unwrap();
        assert_eq!(desc.encoding_id, "RVM");
    }

    #[test]
    fn test_modrm_forms() {
        assert_eq!(
            EncodingDescriptor::parse("C1 /4 ib").unwrap().modrm,
            Some(ModRm::Digit(4))
        );
        assert_eq!(
            EncodingDescriptor::parse("VEX.128.66.0F3A.W0 4A /is4").unwrap().modrm,
            Some(ModRm::Is4)
        );
        assert!(matches!(
            EncodingDescriptor::parse("C1 /8 ib"),
            Err(ParseError::InvalidModRm { .. })
        ));
    }

    #[test]
    fn test_flag_bits_modrm_field() {
        assert_eq!(EncodingDescriptor::parse("F7 /0 id").unwrap().flag_bits(), 0x02);
        assert_eq!(EncodingDescriptor::parse("F7 /7").unwrap().flag_bits(), 0x10);
        assert_eq!(EncodingDescriptor::parse("89 /r").unwrap().flag_bits(), 0x12);
        assert_eq!(EncodingDescriptor::parse("D8+i").unwrap().flag_bits(), 0xA0);
    }

    #[test]
    fn test_prefix_bits() {
        assert_eq!(EncodingDescriptor::parse("67 66 F3 A5").unwrap().prefix_bits(), 0xC3);
        assert_eq!(EncodingDescriptor::parse("64 8B /r").unwrap().prefix_bits(), 5 << 2);
        assert_eq!(EncodingDescriptor::parse("F0 0F B1 /r").unwrap().prefix_bits(), 0x01);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            EncodingDescriptor::parse("/r"),
            Err(ParseError::MissingOpcode { .. })
        ));
        assert!(matches!(
            EncodingDescriptor::parse("89 /r zz"),
            Err(ParseError::UnknownToken { ref token, .. }) if token == "zz"
        ));
        assert!(matches!(
            EncodingDescriptor::parse("B9+r"),
            Err(ParseError::InvalidFold { .. })
        ));
    }
}

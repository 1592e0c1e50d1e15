//! Descriptor database model.
//!
//! The database is a JSON document of instruction groups, each holding one
//! or more forms:
//!
//! ```text
//! {"instructions": [
//!   {"category": "move", "ext": "BASE", "arch": "ANY",
//!    "data": [{"inst": "mov r32, i32", "op": "B8+r id"}]}
//! ]}
//! ```
//!
//! Absent `deprecated` means `false`; absent `ext`/`arch` means untagged.
//! Form-level tags override group-level tags. Unknown fields are rejected.

use crate::core::diagnostics::SkippedRecord;
use crate::core::error::ParseError;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorDatabase {
    pub instructions: Vec<InstructionGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionGroup {
    pub category: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    pub data: Vec<InstructionForm>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionForm {
    /// Mnemonic followed by the operand syntax, e.g. `"add r32/m32, i8"`.
    pub inst: String,
    /// Raw encoding syntax, e.g. `"83 /0 ib"`.
    pub op: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl DescriptorDatabase {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Flatten all groups into records, in database order.
    ///
    /// A form whose `inst` text has no mnemonic yields a [`SkippedRecord`].
    pub fn records(&self) -> impl Iterator<Item = Result<RawInstructionRecord, SkippedRecord>> + '_ {
        self.instructions.iter().flat_map(|group| {
            group
                .data
                .iter()
                .map(move |form| RawInstructionRecord::from_form(group, form))
        })
    }
}

/// One (instruction syntax, encoding syntax) pair with its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstructionRecord {
    pub name: String,
    pub operands: String,
    pub encoding: String,
    pub category: String,
    pub extension: Option<String>,
    pub arch: Option<String>,
    pub deprecated: bool,
}

impl RawInstructionRecord {
    /// Record with no tags, mostly useful for tests and hand-built tables.
    pub fn new(name: &str, operands: &str, encoding: &str) -> Self {
        Self {
            name: name.to_string(),
            operands: operands.to_string(),
            encoding: encoding.to_string(),
            category: String::new(),
            extension: None,
            arch: None,
            deprecated: false,
        }
    }

    fn from_form(group: &InstructionGroup, form: &InstructionForm) -> Result<Self, SkippedRecord> {
        let (name, operands) = split_inst(&form.inst).ok_or_else(|| SkippedRecord {
            inst: form.inst.clone(),
            encoding: form.op.clone(),
            error: ParseError::MalformedInstruction {
                inst: form.inst.clone(),
            },
        })?;

        Ok(Self {
            name,
            operands,
            encoding: form.op.trim().to_string(),
            category: group.category.clone(),
            extension: form.ext.clone().or_else(|| group.ext.clone()),
            arch: form.arch.clone().or_else(|| group.arch.clone()),
            deprecated: group.deprecated,
        })
    }

    /// The `inst` text this record was read from.
    pub fn inst(&self) -> String {
        if self.operands.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.operands)
        }
    }
}

fn split_inst(inst: &str) -> Option<(String, String)> {
    let inst = inst.trim();
    let (name, rest) = match inst.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (inst, ""),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_ascii_lowercase(), rest.to_string()))
}

// This module renders a finished EncodingTable as text. The table itself becomes one
// `inst(...)` row per variant with its prefix byte, opcode value, flag byte and packed special
// index; the secondary lookup becomes one `shape(...)` row per key; and every row can also be
// written as an intermediate JSON record for tools that want the decoded fields rather than the
// packed bytes. No column alignment is attempted.

//! Text and JSON emitters for the encoding table.

use crate::encoding::descriptor::EncodingDescriptor;
use crate::table::{EncodingTable, LookupEntry, TableRow, Variant};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Render one table row.
pub fn table_row(row: &TableRow) -> String {
    let v = &row.variant;
    let d = &v.descriptor;
    let mut out = format!(
        "inst({}, ENC_{}, 0x{:02X}, 0x{}, 0x{:02X}, 0x{:04X}, OPS_{}",
        v.name,
        d.encoding_id,
        d.prefix_bits(),
        d.opcode_hex(),
        d.flag_bits(),
        row.special_index(),
        v.operands.len()
    );
    for op in &v.operands {
        out.push_str(", ");
        out.push_str(op.table_name());
    }
    out.push(')');
    out
}

/// Render one lookup row.
pub fn lookup_row(entry: &LookupEntry) -> String {
    let mut out = format!("shape({}, {}", entry.row, entry.name);
    for op in &entry.operands {
        out.push_str(", ");
        out.push_str(op.table_name());
    }
    out.push(')');
    out
}

pub fn write_table<W: Write>(table: &EncodingTable, out: &mut W) -> io::Result<()> {
    for row in table.rows() {
        writeln!(out, "{}", table_row(row))?;
    }
    Ok(())
}

pub fn write_lookup<W: Write>(table: &EncodingTable, out: &mut W) -> io::Result<()> {
    for entry in table.lookup().entries() {
        writeln!(out, "{}", lookup_row(entry))?;
    }
    Ok(())
}

/// Decoded fields of one variant, as written to the records file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub name: String,
    pub operands: Vec<String>,
    pub enc: String,
    pub opcode: String,
    pub prefix: Vec<String>,
    pub rexw: bool,
    /// `""`, `"0"`..`"7"`, `"r"` or `"is4"`.
    pub rm: String,
    /// `""`, `"r"` or `"i"`.
    pub ri: String,
    pub size: u32,
}

impl VariantRecord {
    pub fn from_variant(variant: &Variant) -> Self {
        let d = &variant.descriptor;
        Self {
            name: variant.name.clone(),
            operands: variant.operands.iter().map(|op| op.name().to_string()).collect(),
            enc: d.encoding_id.clone(),
            opcode: d.opcode_hex(),
            prefix: prefix_names(d),
            rexw: d.rex_w,
            rm: d.modrm.map(|m| m.record_name()).unwrap_or_default(),
            ri: d
                .fold
                .map(|f| f.record_name().to_string())
                .unwrap_or_default(),
            size: variant.code_length(),
        }
    }
}

/// Legacy prefixes as hex bytes, followed by a vector mandatory prefix.
fn prefix_names(d: &EncodingDescriptor) -> Vec<String> {
    let mut names: Vec<String> = d.prefixes.iter().map(|p| format!("{:02X}", p.byte())).collect();
    if let Some(pp) = d.vector.and_then(|v| v.pp) {
        names.push(format!("{:02X}", pp.byte()));
    }
    names
}

/// Write every row as a pretty-printed JSON array of [`VariantRecord`]s.
pub fn write_records<W: Write>(table: &EncodingTable, out: &mut W) -> serde_json::Result<()> {
    let records: Vec<VariantRecord> = table.variants().map(VariantRecord::from_variant).collect();
    serde_json::to_writer_pretty(&mut *out, &records)?;
    out.write_all(b"\n").map_err(serde_json::Error::io)
}

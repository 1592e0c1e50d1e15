//! Diagnostics collected while building a table.
//!
//! Every parse call reports into a [`Diagnostics`] value owned by the caller
//! instead of a process-wide set, so two builds never see each other's
//! findings.

use super::error::ParseError;
use std::collections::BTreeSet;
use std::fmt;

/// A descriptor record that was dropped because it failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// `inst` text of the record, e.g. `"mov r32, i32"`.
    pub inst: String,
    /// Raw encoding string of the record.
    pub encoding: String,
    pub error: ParseError,
}

/// Findings of one table build.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    unknown_operands: BTreeSet<String>,
    skipped: Vec<SkippedRecord>,
    filtered: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an operand token that is not part of the operand domain.
    pub fn unknown_operand(&mut self, token: &str) {
        self.unknown_operands.insert(token.to_string());
    }

    pub fn skip(&mut self, record: SkippedRecord) {
        self.skipped.push(record);
    }

    /// Count a record dropped by the deprecation or architecture filter.
    pub fn filtered(&mut self) {
        self.filtered += 1;
    }

    pub fn unknown_operands(&self) -> impl Iterator<Item = &str> {
        self.unknown_operands.iter().map(String::as_str)
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered
    }

    pub fn is_clean(&self) -> bool {
        self.unknown_operands.is_empty() && self.skipped.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} skipped, {} filtered, {} unknown operand types",
            self.skipped.len(),
            self.filtered,
            self.unknown_operands.len()
        )?;
        if !self.unknown_operands.is_empty() {
            let names: Vec<&str> = self.unknown_operands().collect();
            write!(f, " ({})", names.join(", "))?;
        }
        Ok(())
    }
}

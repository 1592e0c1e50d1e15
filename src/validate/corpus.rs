//! Test corpus fixture writer.
//!
//! Only verified results reach the corpus; rejections and decode mismatches
//! are logged and counted in the returned [`CorpusSummary`].

use super::oracle::{OracleOutcome, OracleResult};
use log::warn;
use std::fmt;
use std::io::{self, Write};

/// Layout of one corpus line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CorpusFormat {
    /// `add ecx, 1 ;83C101`
    #[default]
    Line,
    /// `TEST_INST("83C101", add(ecx, 1));`
    Call,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    pub verified: usize,
    pub rejected: usize,
    pub mismatched: usize,
}

impl CorpusSummary {
    pub fn failed(&self) -> usize {
        self.rejected + self.mismatched
    }
}

impl fmt::Display for CorpusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} verified, {} rejected, {} mismatched",
            self.verified, self.rejected, self.mismatched
        )
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Corpus line of a verified result.
pub fn corpus_line(result: &OracleResult, format: CorpusFormat) -> Option<String> {
    let bytes = result.bytes()?;
    let case = &result.case;
    Some(match format {
        CorpusFormat::Line => format!("{} ;{}", case.text, hex(bytes)),
        CorpusFormat::Call => format!(
            "TEST_INST(\"{}\", {}({}));",
            hex(bytes),
            case.mnemonic(),
            case.operands.join(", ")
        ),
    })
}

/// Write every verified result in order, logging the others.
pub fn write_corpus<W: Write>(
    results: &[OracleResult],
    format: CorpusFormat,
    out: &mut W,
) -> io::Result<CorpusSummary> {
    let mut summary = CorpusSummary::default();
    for result in results {
        match &result.outcome {
            OracleOutcome::Encoded(_) => {
                if let Some(line) = corpus_line(result, format) {
                    writeln!(out, "{line}")?;
                }
                summary.verified += 1;
            }
            OracleOutcome::Rejected(err) => {
                warn!("row {}: '{}' rejected: {}", result.case.row, result.case.text, err);
                summary.rejected += 1;
            }
            OracleOutcome::Mismatch { bytes, reason } => {
                warn!(
                    "row {}: '{}' assembled to {} which disagrees with the table: {}",
                    result.case.row,
                    result.case.text,
                    hex(bytes),
                    reason
                );
                summary.mismatched += 1;
            }
        }
    }
    Ok(summary)
}

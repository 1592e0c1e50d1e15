// This module defines the reference-assembler side of validation. An Oracle turns one rendered
// TestCase into an outcome: the bytes it assembled to, or the assembler's rejection. The
// ExternalAssembler oracle writes the case into a scratch directory owned by the calling
// worker, runs the configured command pipeline with {src}/{obj}/{bin} substituted, reads the
// raw bytes back and removes its files before returning. Rejections listed in the configured
// exit codes are data; anything else that goes wrong with the subprocess is a PoolError. The
// decode check at the bottom verifies produced bytes against the table row using iced-x86.

//! Reference assembler oracles and the decode cross-check.

use super::testgen::TestCase;
use crate::core::config::{AsmDialect, AssemblerCommand, ValidationConfig};
use crate::core::error::{OracleInvocationError, PoolError, PoolResult};
use crate::encoding::descriptor::{ModRm, OpcodeMap, VectorFamily};
use crate::table::Variant;
use iced_x86::{Code, Decoder, DecoderOptions, EncodingKind, OpCodeTableKind};
use log::trace;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the oracle made of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleOutcome {
    /// Assembled bytes that agree with the table row.
    Encoded(Vec<u8>),
    /// The assembler refused the instruction.
    Rejected(OracleInvocationError),
    /// The assembler produced bytes that disagree with the table row.
    Mismatch { bytes: Vec<u8>, reason: String },
}

/// Outcome of one test case, kept next to the case itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    pub case: TestCase,
    pub outcome: OracleOutcome,
}

impl OracleResult {
    pub fn is_verified(&self) -> bool {
        matches!(self.outcome, OracleOutcome::Encoded(_))
    }

    /// Verified bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.outcome {
            OracleOutcome::Encoded(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A trusted reference assembler.
///
/// Implementations are shared between worker threads; every call names the
/// calling worker so per-worker resources never overlap.
pub trait Oracle: Send + Sync {
    /// Assemble one test case.
    fn assemble(&self, worker: usize, case: &TestCase) -> PoolResult<OracleOutcome>;

    /// Called once when `worker` stops, whether it finished, failed or panicked.
    fn release(&self, _worker: usize) {}
}

/// Assembly source holding the single instruction of `case`.
pub fn render_source(dialect: AsmDialect, case: &TestCase) -> String {
    match dialect {
        AsmDialect::Nasm => format!("bits 64\n{}\n", case.text),
        AsmDialect::Gas => format!(".intel_syntax noprefix\n{}\n", case.text),
    }
}

/// Scratch file paths of one worker.
#[derive(Debug, Clone)]
struct ScratchPaths {
    src: PathBuf,
    obj: PathBuf,
    bin: PathBuf,
}

impl ScratchPaths {
    fn in_dir(dir: &Path) -> Self {
        Self {
            src: dir.join("test.asm"),
            obj: dir.join("test.o"),
            bin: dir.join("test.bin"),
        }
    }

    fn substitute(&self, arg: &str) -> String {
        arg.replace("{src}", &self.src.to_string_lossy())
            .replace("{obj}", &self.obj.to_string_lossy())
            .replace("{bin}", &self.bin.to_string_lossy())
    }

    fn cleanup(&self) {
        for path in [&self.src, &self.obj, &self.bin] {
            let _ = fs::remove_file(path);
        }
    }
}

static NEXT_INSTANCE: AtomicUsize = AtomicUsize::new(0);

/// Oracle backed by an external assembler process.
#[derive(Debug, Clone)]
pub struct ExternalAssembler {
    dialect: AsmDialect,
    command: AssemblerCommand,
    rejection_codes: Vec<i32>,
    scratch_root: PathBuf,
    instance: usize,
}

impl ExternalAssembler {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            dialect: config.dialect,
            command: config.assembler.clone(),
            rejection_codes: config.rejection_codes.clone(),
            scratch_root: config.scratch_root.clone(),
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Scratch directory of `worker`, unique to this oracle instance.
    ///
    /// Clones share their directories.
    pub fn scratch_dir(&self, worker: usize) -> PathBuf {
        self.scratch_root.join(format!(
            "enctab_{}_{}_w{}",
            std::process::id(),
            self.instance,
            worker
        ))
    }

    /// Whether the first program of the pipeline can be launched at all.
    pub fn is_available(&self) -> bool {
        let Some(first) = self.command.steps.first() else {
            return false;
        };
        let flag = if first.program == "nasm" { "-v" } else { "--version" };
        Command::new(&first.program)
            .arg(flag)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, worker: usize, case: &TestCase, paths: &ScratchPaths) -> PoolResult<OracleOutcome> {
        let scratch = |e: std::io::Error| PoolError::Scratch {
            worker,
            reason: e.to_string(),
        };
        fs::write(&paths.src, render_source(self.dialect, case)).map_err(scratch)?;

        for step in &self.command.steps {
            let args: Vec<String> = step.args.iter().map(|a| paths.substitute(a)).collect();
            trace!("worker {}: {} {}", worker, step.program, args.join(" "));
            let output = Command::new(&step.program)
                .args(&args)
                .output()
                .map_err(|e| PoolError::Launch {
                    worker,
                    program: step.program.clone(),
                    reason: e.to_string(),
                })?;

            match output.status.code() {
                Some(0) => {}
                Some(code) if self.rejection_codes.contains(&code) => {
                    let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    return Ok(OracleOutcome::Rejected(OracleInvocationError {
                        exit_code: code,
                        diagnostic,
                    }));
                }
                status => {
                    return Err(PoolError::UnexpectedExit {
                        worker,
                        program: step.program.clone(),
                        status: match status {
                            Some(code) => format!("exit code {code}"),
                            None => "terminated by signal".to_string(),
                        },
                        test: case.text.clone(),
                    })
                }
            }
        }

        let bytes = fs::read(&paths.bin).map_err(scratch)?;
        Ok(OracleOutcome::Encoded(bytes))
    }
}

impl Oracle for ExternalAssembler {
    fn assemble(&self, worker: usize, case: &TestCase) -> PoolResult<OracleOutcome> {
        let dir = self.scratch_dir(worker);
        fs::create_dir_all(&dir).map_err(|e| PoolError::Scratch {
            worker,
            reason: format!("{}: {}", dir.display(), e),
        })?;
        let paths = ScratchPaths::in_dir(&dir);
        let outcome = self.run(worker, case, &paths);
        paths.cleanup();
        outcome
    }

    fn release(&self, worker: usize) {
        let _ = fs::remove_dir_all(self.scratch_dir(worker));
    }
}

const LEGACY_PREFIXES: [u8; 11] = [0x66, 0x67, 0xF0, 0xF2, 0xF3, 0x2E, 0x36, 0x3E, 0x26, 0x64, 0x65];

/// Decode `bytes` and compare them with the encoding of `variant`.
///
/// The bytes must form exactly one instruction (an fwait prefix in front of
/// a `9B`-led opcode is allowed) of the row's encoding family, map, opcode
/// and ModRM group digit, and a REX.W row must carry a REX.W byte.
pub fn verify_encoding(variant: &Variant, bytes: &[u8]) -> Result<(), String> {
    let d = &variant.descriptor;
    let mut decoder = Decoder::new(64, bytes, DecoderOptions::NONE);
    let mut instr = decoder.decode();
    let mut consumed = instr.len();
    if instr.code() == Code::Wait && d.opcode.first() == Some(&0x9B) && decoder.can_decode() {
        instr = decoder.decode();
        consumed += instr.len();
    }

    if instr.is_invalid() {
        return Err(format!("{:02X?} does not decode", bytes));
    }
    if consumed != bytes.len() {
        return Err(format!("decoded {} of {} bytes", consumed, bytes.len()));
    }

    let expected_kind = match d.family() {
        None => EncodingKind::Legacy,
        Some(VectorFamily::Vex) => EncodingKind::VEX,
        Some(VectorFamily::Evex) => EncodingKind::EVEX,
        Some(VectorFamily::Xop) => EncodingKind::XOP,
    };
    if instr.encoding() != expected_kind {
        return Err(format!("encoded as {:?}, expected {:?}", instr.encoding(), expected_kind));
    }

    let info = instr.op_code();
    let expected_table = expected_table(variant);
    if info.table() != expected_table {
        return Err(format!("opcode map {:?}, expected {:?}", info.table(), expected_table));
    }

    // only the final opcode byte identifies the instruction within its map
    let op = (info.op_code() & 0xFF) as u8;
    let last = d.opcode.last().copied();
    let found = last == Some(op) || (d.fold.is_some() && last == Some(op & 0xF8));
    if !found {
        return Err(format!("opcode {op:02X} not in {}", d.opcode_hex()));
    }

    if let Some(ModRm::Digit(digit)) = d.modrm {
        if info.is_group() && info.group_index() != i32::from(digit) {
            return Err(format!("ModRM digit /{}, expected /{}", info.group_index(), digit));
        }
    }

    if d.rex_w && d.vector.is_none() {
        let rex = bytes.iter().copied().find(|b| !LEGACY_PREFIXES.contains(b));
        if !matches!(rex, Some(0x48..=0x4F)) {
            return Err("missing REX.W".to_string());
        }
    }
    Ok(())
}

fn expected_table(variant: &Variant) -> OpCodeTableKind {
    let d = &variant.descriptor;
    match d.vector.map(|v| v.map) {
        Some(OpcodeMap::Map0F) => OpCodeTableKind::T0F,
        Some(OpcodeMap::Map0F38) => OpCodeTableKind::T0F38,
        Some(OpcodeMap::Map0F3A) => OpCodeTableKind::T0F3A,
        Some(OpcodeMap::Map5) => OpCodeTableKind::MAP5,
        Some(OpcodeMap::Map6) => OpCodeTableKind::MAP6,
        Some(OpcodeMap::Xop8) => OpCodeTableKind::MAP8,
        Some(OpcodeMap::Xop9) => OpCodeTableKind::MAP9,
        Some(OpcodeMap::XopA) => OpCodeTableKind::MAP10,
        None => match d.opcode.as_slice() {
            [0x0F, 0x38, ..] => OpCodeTableKind::T0F38,
            [0x0F, 0x3A, ..] => OpCodeTableKind::T0F3A,
            [0x0F, ..] => OpCodeTableKind::T0F,
            _ => OpCodeTableKind::Normal,
        },
    }
}

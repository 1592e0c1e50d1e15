// This module is the shared infrastructure of enctab: the error families with their propagation
// policies, the build and validation configurations (defaults, ENCTAB_* environment variables,
// command line overrides), and the diagnostics collector that every parse call reports into.
// Nothing in here knows about x86 encodings; the isa, encoding, table and validate modules
// build on these pieces.

//! Core enctab infrastructure.
//!
//! # Key Components
//!
//! ## Errors (`error`)
//! - `ParseError`: one record is malformed, drop it (or abort in strict mode)
//! - `SchemaError`: the operand order or link space is broken, always fatal
//! - `OracleInvocationError`: the reference assembler said no, kept as data
//! - `PoolError`: validation infrastructure failed, fatal for the run
//!
//! ## Configuration (`config`)
//! - `BuildConfig` for table construction
//! - `ValidationConfig` for the oracle pool
//!
//! ## Diagnostics (`diagnostics`)
//! - Unknown operand tokens and skipped records of one build

pub mod config;
pub mod diagnostics;
pub mod error;

pub use config::{AsmDialect, AssemblerCommand, BuildConfig, CommandStep, TargetArch, ValidationConfig};
pub use diagnostics::{Diagnostics, SkippedRecord};
pub use error::{
    OracleInvocationError, ParseError, PoolError, PoolResult, SchemaError, TableError, TableResult,
};

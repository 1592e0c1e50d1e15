//! enctab - x86-64 instruction-encoding table compiler.
//!
//! enctab turns a catalogue of instruction descriptors (mnemonic, operand
//! syntax, encoding syntax) into a deduplicated, totally ordered, bit-packed
//! encoding table with special-link indices, and validates the encodings
//! the table implies against an external reference assembler.
//!
//! # Primary Usage
//!
//! ```ignore
//! use enctab::core::{BuildConfig, ValidationConfig};
//! use enctab::pipeline::{build_table_from_json, validate_table};
//! use enctab::validate::ExternalAssembler;
//!
//! let build = build_table_from_json(&json, &BuildConfig::from_env())?;
//! enctab::emit::write_table(&build.table, &mut out)?;
//!
//! let config = ValidationConfig::from_env();
//! let oracle = ExternalAssembler::new(&config);
//! let results = validate_table(&build.table, &config, &oracle)?;
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Errors, configuration and build diagnostics
//! - [`isa`] - Operand type domain and the descriptor database model
//! - [`encoding`] - Encoding and operand syntax parsing
//! - [`table`] - Variant selection, ordering, special links and lookup
//! - [`emit`] - Table, lookup and variant record text output
//! - [`validate`] - Test generation, oracles, worker pool and corpus output
//! - [`pipeline`] - Top-level drivers tying the above together

pub mod core;
pub mod emit;
pub mod encoding;
pub mod isa;
pub mod pipeline;
pub mod table;
pub mod validate;

pub use crate::core::{
    AsmDialect, BuildConfig, Diagnostics, ParseError, PoolError, SchemaError, TableError,
    ValidationConfig,
};
pub use encoding::EncodingDescriptor;
pub use isa::OperandType;
pub use pipeline::{build_table, build_table_from_json, validate_table, TableBuild};
pub use table::{EncodingTable, SpecialLink, Variant};

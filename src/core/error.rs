// This module defines the error types for enctab using the thiserror crate. There are four
// families, each with its own propagation policy: ParseError covers structural problems in a
// single descriptor record (unknown encoding or operand tokens) and is recoverable by dropping
// the record; SchemaError covers defects in the fixed operand rank table and in special-link
// resolution and is always surfaced immediately; OracleInvocationError is what an external
// assembler says when it rejects a rendered test and is carried as data in the validation
// results; PoolError covers worker and subprocess infrastructure failures and aborts the whole
// validation run. TableError ties the first three together for the table-building driver.

//! Error types for table construction and validation.

use thiserror::Error;

/// Structural problem in one raw encoding or operand string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized encoding token '{token}' in '{encoding}'")]
    UnknownToken { token: String, encoding: String },

    #[error("unrecognized {family} sub-field '{field}' in '{token}'")]
    UnknownVectorField {
        family: &'static str,
        field: String,
        token: String,
    },

    #[error("malformed opcode fold '{token}'")]
    InvalidFold { token: String },

    #[error("malformed ModRM extension '{token}'")]
    InvalidModRm { token: String },

    #[error("encoding '{encoding}' has no opcode byte")]
    MissingOpcode { encoding: String },

    #[error("encoding '{encoding}' has more than {max} opcode bytes")]
    OpcodeTooLong { encoding: String, max: usize },

    #[error("vector prefix '{token}' names no opcode map")]
    MissingOpcodeMap { token: String },

    #[error("unknown operand type '{token}'")]
    UnknownOperand { token: String },

    #[error("operand '{token}' names no operand type")]
    EmptyOperand { token: String },

    #[error("mask suffix '{token}' does not follow an operand")]
    DanglingMask { token: String },

    #[error("malformed instruction syntax '{inst}'")]
    MalformedInstruction { inst: String },
}

/// Defect in the fixed operand schema or in link resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("operand type '{operand}' has no rank in the operand order table")]
    UnrankedOperand { operand: String },

    #[error("special link of row {row} targets row {target}, table has {len} rows")]
    LinkOutOfBounds { row: usize, target: usize, len: usize },

    #[error("table has {rows} rows, link index space holds at most {max}")]
    TableTooLarge { rows: usize, max: usize },
}

/// The reference assembler rejected a rendered test instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("assembler rejected test (exit code {exit_code}): {diagnostic}")]
pub struct OracleInvocationError {
    pub exit_code: i32,
    pub diagnostic: String,
}

/// Fatal failure of the validation pool infrastructure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("failed to spawn worker {worker}: {reason}")]
    Spawn { worker: usize, reason: String },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("worker {worker} finished without reporting results")]
    MissingResults { worker: usize },

    #[error("worker {worker} could not launch '{program}': {reason}")]
    Launch {
        worker: usize,
        program: String,
        reason: String,
    },

    #[error("worker {worker}: '{program}' exited unexpectedly ({status}) on '{test}'")]
    UnexpectedExit {
        worker: usize,
        program: String,
        status: String,
        test: String,
    },

    #[error("worker {worker}: scratch file error: {reason}")]
    Scratch { worker: usize, reason: String },
}

/// Error raised by the table-building driver.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("record '{record}': {source}")]
    Parse {
        record: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("descriptor database: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type alias for table construction.
pub type TableResult<T> = Result<T, TableError>;

/// Result type alias for validation runs.
pub type PoolResult<T> = Result<T, PoolError>;

// This module checks a finished encoding table against a trusted reference assembler. The test
// generator expands every row into concrete instructions with boundary-value operands, the pool
// runs them through an Oracle on statically partitioned worker threads, the decode check
// compares each produced byte string with the row it came from, and the corpus writer keeps
// the verified results as an ordered fixture for downstream encoder tests.

//! Oracle validation of the encoding table.

pub mod corpus;
pub mod oracle;
pub mod pool;
pub mod testgen;

pub use corpus::{corpus_line, write_corpus, CorpusFormat, CorpusSummary};
pub use oracle::{
    render_source, verify_encoding, ExternalAssembler, Oracle, OracleOutcome, OracleResult,
};
pub use pool::{plan_chunks, worker_count, Progress, ValidationPool, WorkerMessage, PROGRESS_INTERVAL};
pub use testgen::{catalogue, generate_cases, TestCase, TestCombinations};

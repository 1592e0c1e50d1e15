// This module runs test cases through an Oracle on a fixed set of worker threads. The case list
// is cut once into contiguous chunks of equal size, one per worker, with no work stealing.
// Each worker assembles its chunk strictly in order, reports advisory progress every few
// tests and finally sends its whole result list back over a channel. The coordinator drains
// the channel, joins every worker and concatenates the lists by worker index, so the output
// order matches the input order no matter which worker finished first. A worker panic or any
// PoolError fails the whole run; there is no cancellation, so a hung assembler stalls its
// worker and with it the pool.

//! Statically partitioned oracle validation pool.

use super::oracle::{verify_encoding, Oracle, OracleOutcome, OracleResult};
use super::testgen::TestCase;
use crate::core::config::ValidationConfig;
use crate::core::error::{PoolError, PoolResult};
use log::{debug, info};
use std::ops::Range;
use std::sync::mpsc::{self, Sender};
use std::thread;

/// Completed tests between two progress messages of a worker.
pub const PROGRESS_INTERVAL: usize = 10;

/// Advisory progress of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub worker: usize,
    pub completed: usize,
    pub total: usize,
}

/// Worker to coordinator message.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(Progress),
    Result {
        worker: usize,
        results: Vec<OracleResult>,
    },
    FatalError {
        worker: usize,
        error: PoolError,
    },
}

/// Number of workers for `total` tests.
///
/// Hardware parallelism minus one (at least one), capped by `max_workers`
/// and by how many workers `min_per_worker` tests each would keep busy.
pub fn worker_count(
    total: usize,
    hardware: usize,
    max_workers: Option<usize>,
    min_per_worker: usize,
) -> usize {
    if total == 0 {
        return 0;
    }
    let mut workers = hardware.saturating_sub(1).max(1);
    if let Some(max) = max_workers {
        workers = workers.min(max.max(1));
    }
    let justified = total.div_ceil(min_per_worker.max(1));
    workers.min(justified).max(1)
}

/// Contiguous, equally sized chunks covering `0..total`. The last chunk
/// takes the remainder; empty chunks are not produced.
pub fn plan_chunks(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 || workers == 0 {
        return Vec::new();
    }
    let chunk = total.div_ceil(workers);
    (0..total)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(total))
        .collect()
}

fn hardware_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Runs test cases through one shared oracle.
pub struct ValidationPool<'a> {
    oracle: &'a dyn Oracle,
    max_workers: Option<usize>,
    min_tests_per_worker: usize,
    decode_check: bool,
}

impl<'a> ValidationPool<'a> {
    pub fn new(oracle: &'a dyn Oracle, config: &ValidationConfig) -> Self {
        Self {
            oracle,
            max_workers: config.max_workers,
            min_tests_per_worker: config.min_tests_per_worker,
            decode_check: config.decode_check,
        }
    }

    /// Run every case and return the results in case order.
    pub fn run(&self, cases: &[TestCase]) -> PoolResult<Vec<OracleResult>> {
        self.run_with_progress(cases, |p| {
            debug!("worker {}: {}/{} tests", p.worker, p.completed, p.total)
        })
    }

    /// Like [`run`](Self::run), reporting worker progress to `on_progress`.
    pub fn run_with_progress(
        &self,
        cases: &[TestCase],
        mut on_progress: impl FnMut(&Progress),
    ) -> PoolResult<Vec<OracleResult>> {
        let workers = worker_count(
            cases.len(),
            hardware_parallelism(),
            self.max_workers,
            self.min_tests_per_worker,
        );
        let chunks = plan_chunks(cases.len(), workers);
        info!("validating {} tests on {} workers", cases.len(), chunks.len());

        let (tx, rx) = mpsc::channel::<WorkerMessage>();
        let oracle = self.oracle;
        let decode_check = self.decode_check;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(chunks.len());
            let mut fatal: Option<PoolError> = None;

            for (worker, range) in chunks.iter().enumerate() {
                let chunk = &cases[range.clone()];
                let tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("enctab-worker-{worker}"))
                    .spawn_scoped(scope, move || run_worker(worker, chunk, oracle, decode_check, tx));
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(e) => {
                        fatal = Some(PoolError::Spawn {
                            worker,
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
            drop(tx);

            let mut slots: Vec<Option<Vec<OracleResult>>> = vec![None; chunks.len()];
            for message in rx {
                match message {
                    WorkerMessage::Progress(progress) => on_progress(&progress),
                    WorkerMessage::Result { worker, results } => slots[worker] = Some(results),
                    WorkerMessage::FatalError { worker, error } => {
                        debug!("worker {worker} failed: {error}");
                        fatal.get_or_insert(error);
                    }
                }
            }

            for (worker, handle) in handles {
                if handle.join().is_err() {
                    oracle.release(worker);
                    fatal.get_or_insert(PoolError::WorkerPanicked { worker });
                }
            }
            if let Some(error) = fatal {
                return Err(error);
            }

            let mut results = Vec::with_capacity(cases.len());
            for (worker, slot) in slots.into_iter().enumerate() {
                let chunk = slot.ok_or(PoolError::MissingResults { worker })?;
                results.extend(chunk);
            }
            Ok(results)
        })
    }
}

fn run_worker(
    worker: usize,
    cases: &[TestCase],
    oracle: &dyn Oracle,
    decode_check: bool,
    tx: Sender<WorkerMessage>,
) {
    let mut results = Vec::with_capacity(cases.len());
    for (i, case) in cases.iter().enumerate() {
        let outcome = match oracle.assemble(worker, case) {
            Ok(outcome) => outcome,
            Err(error) => {
                oracle.release(worker);
                let _ = tx.send(WorkerMessage::FatalError { worker, error });
                return;
            }
        };
        let outcome = match outcome {
            OracleOutcome::Encoded(bytes) if decode_check => {
                match verify_encoding(&case.variant, &bytes) {
                    Ok(()) => OracleOutcome::Encoded(bytes),
                    Err(reason) => OracleOutcome::Mismatch { bytes, reason },
                }
            }
            other => other,
        };
        results.push(OracleResult {
            case: case.clone(),
            outcome,
        });

        let completed = i + 1;
        if completed % PROGRESS_INTERVAL == 0 {
            let _ = tx.send(WorkerMessage::Progress(Progress {
                worker,
                completed,
                total: cases.len(),
            }));
        }
    }
    oracle.release(worker);
    let _ = tx.send(WorkerMessage::Result { worker, results });
}

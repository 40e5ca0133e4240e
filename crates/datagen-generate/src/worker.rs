//! Partitioned multi-threaded row generation.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::errors::{GenerationError, Result};
use crate::model::Model;
use crate::row::Row;

/// Rows per worker: worker 0 takes the remainder.
pub fn partition_rows(total: usize, threads: usize) -> Vec<usize> {
    if threads == 0 {
        return Vec::new();
    }
    let base = total / threads;
    let rest = total % threads;
    (0..threads)
        .map(|worker| if worker == 0 { base + rest } else { base })
        .collect()
}

/// Cooperative cancellation shared with running workers.
///
/// Workers check it before each row; an interrupted worker stops and hands
/// back the rows it already finished.
#[derive(Debug, Default)]
pub struct GenerationControl {
    stop_all: AtomicBool,
    limits: RwLock<BTreeMap<usize, usize>>,
}

impl GenerationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt_worker(&self, worker: usize) {
        self.interrupt_worker_after(worker, 0);
    }

    /// Let `worker` finish `rows` rows, then stop it.
    pub fn interrupt_worker_after(&self, worker: usize, rows: usize) {
        if let Ok(mut limits) = self.limits.write() {
            limits.insert(worker, rows);
        }
    }

    pub fn interrupt_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    fn should_stop(&self, worker: usize, produced: usize) -> bool {
        if self.stop_all.load(Ordering::SeqCst) {
            return true;
        }
        self.limits
            .read()
            .ok()
            .and_then(|limits| limits.get(&worker).copied())
            .is_some_and(|limit| produced >= limit)
    }
}

struct WorkerOutput {
    rows: Vec<Row>,
    interrupted: bool,
}

pub(crate) fn generate_rows(
    model: &Model,
    total: usize,
    threads: usize,
    control: &GenerationControl,
) -> Result<Vec<Row>> {
    if threads == 0 {
        return Err(GenerationError::InvalidThreadCount);
    }
    let loads = partition_rows(total, threads);
    let start = Instant::now();
    info!(rows = total, threads, seed = model.seed(), "generation started");

    let outputs: Vec<Result<WorkerOutput>> = thread::scope(|scope| {
        let handles: Vec<_> = loads
            .iter()
            .enumerate()
            .map(|(worker, &rows)| {
                debug!(worker, rows, "starting worker");
                thread::Builder::new()
                    .name(format!("datagen-worker-{worker}"))
                    .spawn_scoped(scope, move || run_worker(model, worker, rows, control))
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| match handle {
                Ok(handle) => handle.join().unwrap_or_else(|panic| {
                    Err(GenerationError::WorkerPanicked {
                        worker,
                        message: panic_message(panic),
                    })
                }),
                Err(err) => Err(GenerationError::Io(err)),
            })
            .collect()
    });

    let mut rows = Vec::with_capacity(total);
    for (worker, output) in outputs.into_iter().enumerate() {
        let output = output.inspect_err(|err| {
            warn!(worker, error = %err, "generation failed");
        })?;
        if output.interrupted {
            warn!(
                worker,
                requested = loads[worker],
                produced = output.rows.len(),
                "worker was interrupted, keeping the rows it finished"
            );
        }
        rows.extend(output.rows);
    }

    info!(
        rows = rows.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "generation completed"
    );
    Ok(rows)
}

fn run_worker(
    model: &Model,
    worker: usize,
    rows: usize,
    control: &GenerationControl,
) -> Result<WorkerOutput> {
    let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(model.seed(), &format!("worker-{worker}")));
    let mut produced = Vec::with_capacity(rows);
    for _ in 0..rows {
        if control.should_stop(worker, produced.len()) {
            return Ok(WorkerOutput {
                rows: produced,
                interrupted: true,
            });
        }
        produced.push(model.generate_row(&mut rng)?);
    }
    debug!(worker, rows = produced.len(), "worker finished");
    Ok(WorkerOutput {
        rows: produced,
        interrupted: false,
    })
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_worker_takes_the_remainder() {
        assert_eq!(partition_rows(10, 3), vec![4, 3, 3]);
        assert_eq!(partition_rows(2, 4), vec![2, 0, 0, 0]);
        assert_eq!(partition_rows(0, 2), vec![0, 0]);
        assert!(partition_rows(5, 0).is_empty());
    }

    #[test]
    fn worker_seeds_differ() {
        assert_ne!(hash_seed(1, "worker-0"), hash_seed(1, "worker-1"));
        assert_eq!(hash_seed(1, "worker-0"), hash_seed(1, "worker-0"));
    }

    #[test]
    fn limits_apply_per_worker() {
        let control = GenerationControl::new();
        control.interrupt_worker_after(1, 2);
        assert!(!control.should_stop(0, 100));
        assert!(!control.should_stop(1, 1));
        assert!(control.should_stop(1, 2));
        control.interrupt_all();
        assert!(control.should_stop(0, 0));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(3_u8)), "panic during generation");
    }
}

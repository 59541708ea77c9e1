use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::OnceLock;
use std::thread;

use anyhow::{anyhow, Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::chunking::ChunkPlan;

/// Total execution contexts per call: the caller plus two workers.
pub const DEFAULT_MAX_CONTEXTS: usize = 3;

static DEFAULT_MAPPER: OnceLock<ChunkMapper> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperConfig {
    /// Upper bound on concurrently running contexts, caller included.
    pub max_contexts: usize,
    /// When false no worker pool is built and every map runs on the caller.
    pub parallel: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_contexts: DEFAULT_MAX_CONTEXTS,
            parallel: true,
        }
    }
}

impl MapperConfig {
    pub fn with_contexts(max_contexts: Option<usize>) -> Self {
        let max_contexts = max_contexts
            .map(clamp_contexts)
            .unwrap_or(DEFAULT_MAX_CONTEXTS);

        Self {
            max_contexts,
            parallel: true,
        }
    }

    pub fn sequential() -> Self {
        Self {
            max_contexts: 1,
            parallel: false,
        }
    }
}

/// Maps a function over a slice with a small fixed pool of workers.
///
/// Chunk 0 always runs on the calling thread; the remaining chunks run on
/// the mapper's own pool of `max_contexts - 1` threads. Results are joined
/// in chunk order, so output order never depends on completion order.
pub struct ChunkMapper {
    max_contexts: usize,
    pool: Option<ThreadPool>,
}

impl ChunkMapper {
    /// Builds a mapper, clamping `max_contexts` to `1..=max(cpus, 3)`.
    pub fn new(config: MapperConfig) -> Self {
        let max_contexts = clamp_contexts(config.max_contexts);
        let pool = if config.parallel && max_contexts > 1 {
            build_pool(max_contexts - 1)
        } else {
            None
        };

        Self { max_contexts, pool }
    }

    pub fn sequential() -> Self {
        Self::new(MapperConfig::sequential())
    }

    pub fn max_contexts(&self) -> usize {
        self.max_contexts
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn plan(&self, len: usize) -> ChunkPlan {
        ChunkPlan::new(len, self.max_contexts)
    }

    /// Maps `f` over `items`, returning results in input order.
    ///
    /// A panic in any chunk is re-raised on the calling thread once every
    /// worker has finished.
    pub fn map<T, U, F>(&self, f: F, items: &[T]) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let plan = self.plan(items.len());
        let pool = match &self.pool {
            Some(pool) if !plan.is_sequential() => pool,
            _ => return items.iter().map(f).collect(),
        };

        let (head, workers) = run_chunks(pool, &plan, items, |chunk: &[T]| {
            chunk.iter().map(&f).collect::<Vec<U>>()
        });

        let mut results = Vec::with_capacity(items.len());
        results.extend(head);
        for worker in workers {
            match worker.join() {
                Ok(part) => results.extend(part),
                Err(payload) => panic::resume_unwind(payload),
            }
        }

        results
    }

    /// Fallible variant of [`ChunkMapper::map`].
    ///
    /// The first failing chunk in chunk order is reported, wrapped in a
    /// context naming the chunk and its item range. Worker panics are
    /// turned into errors the same way.
    pub fn try_map<T, U, F>(&self, f: F, items: &[T]) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U> + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let plan = self.plan(items.len());
        let pool = match &self.pool {
            Some(pool) if !plan.is_sequential() => pool,
            _ => {
                return items
                    .iter()
                    .map(f)
                    .collect::<Result<Vec<U>>>()
                    .with_context(|| chunk_failure(0, &(0..items.len())));
            }
        };

        let (head, workers) = run_chunks(pool, &plan, items, |chunk: &[T]| {
            chunk.iter().map(&f).collect::<Result<Vec<U>>>()
        });

        let mut results = Vec::with_capacity(items.len());
        let head_range = plan.range(0).unwrap_or(0..0);
        results.extend(head.with_context(|| chunk_failure(0, &head_range))?);

        for worker in workers {
            let index = worker.index;
            let range = worker.range.clone();
            let part = worker
                .join()
                .map_err(|payload| {
                    anyhow!(
                        "worker for chunk {} panicked: {}",
                        index,
                        panic_message(payload.as_ref())
                    )
                })
                .and_then(|outcome| outcome)
                .with_context(|| chunk_failure(index, &range))?;
            results.extend(part);
        }

        Ok(results)
    }
}

impl Default for ChunkMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

/// Maps `f` over `items` with the process-wide default mapper.
pub fn map_parallel<T, U, F>(f: F, items: &[T]) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync,
{
    default_mapper().map(f, items)
}

pub fn try_map_parallel<T, U, F>(f: F, items: &[T]) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync,
{
    default_mapper().try_map(f, items)
}

fn clamp_contexts(requested: usize) -> usize {
    let ceiling = num_cpus::get().max(DEFAULT_MAX_CONTEXTS);
    requested.clamp(1, ceiling)
}

fn default_mapper() -> &'static ChunkMapper {
    DEFAULT_MAPPER.get_or_init(ChunkMapper::default)
}

fn build_pool(num_threads: usize) -> Option<ThreadPool> {
    match ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("chunkmap-worker-{}", i))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!(error = %err, "worker pool unavailable, mapping sequentially");
            None
        }
    }
}

/// Result of one background chunk, owned by the dispatching call.
///
/// The scope in `run_chunks` only exits after every worker has sent, so
/// `join` never blocks; it hands results over in chunk order.
struct WorkerHandle<R> {
    index: usize,
    range: Range<usize>,
    rx: Receiver<thread::Result<R>>,
}

impl<R> WorkerHandle<R> {
    fn join(self) -> thread::Result<R> {
        self.rx.recv().unwrap_or_else(|_| {
            let payload: Box<dyn Any + Send> = Box::new("worker exited without a result");
            Err(payload)
        })
    }
}

/// Runs chunk 0 on the caller and every other chunk on `pool`.
///
/// Returns at scope exit, i.e. once every chunk is done. The handles are
/// then drained by the caller in ascending index order.
fn run_chunks<'a, T, R, C>(
    pool: &ThreadPool,
    plan: &ChunkPlan,
    items: &'a [T],
    chunk_fn: C,
) -> (R, Vec<WorkerHandle<R>>)
where
    T: Sync,
    R: Send,
    C: Fn(&'a [T]) -> R + Sync,
{
    let chunk_fn = &chunk_fn;
    let mut chunks = plan.split(items).into_iter().zip(plan.ranges());
    let head = chunks.next().map_or(&items[..0], |(chunk, _)| chunk);

    tracing::debug!(
        len = plan.len(),
        chunks = plan.count(),
        chunk_size = plan.chunk_size(),
        "dispatching parallel map"
    );

    pool.in_place_scope(|scope| {
        let workers: Vec<WorkerHandle<R>> = chunks
            .enumerate()
            .map(|(offset, (chunk, range))| {
                let (tx, rx) = mpsc::sync_channel(1);
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| chunk_fn(chunk)));
                    // The handle may already be gone if the caller unwound
                    let _ = tx.send(outcome);
                });

                WorkerHandle {
                    index: offset + 1,
                    range,
                    rx,
                }
            })
            .collect();

        (chunk_fn(head), workers)
    })
}

fn chunk_failure(index: usize, range: &Range<usize>) -> String {
    format!(
        "parallel map failed in chunk {} (items {}..{})",
        index, range.start, range.end
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

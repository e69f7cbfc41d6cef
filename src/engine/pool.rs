// src/engine/pool.rs
//
// Global thread pool for batch probing and backfills.
//
// One pool for the whole process, created lazily on first use. Its size is
// available_parallelism() minus the libuv reservation (UV_THREADPOOL_SIZE,
// Node.js default 4), never below one thread. Changes to UV_THREADPOOL_SIZE
// after the first call have no effect.

use rayon::ThreadPool;
use std::sync::OnceLock;

/// Default libuv thread pool size (Node.js default)
const DEFAULT_LIBUV_THREADPOOL_SIZE: usize = 4;

/// Minimum number of rayon threads to ensure at least some parallelism
const MIN_RAYON_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Run `op` on the global pool. If no dedicated pool could be built the
/// closure runs on rayon's own global pool instead.
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// The dedicated pool, or `None` when building it failed.
pub fn get_pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = pool_size(detected_parallelism(), reserved_libuv_threads());
            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("alog-imaging-{i}"))
                .build()
            {
                Ok(pool) => {
                    tracing::debug!(target: "alog_imaging::pool", num_threads, "thread pool ready");
                    Some(pool)
                }
                Err(e) => {
                    tracing::warn!(
                        target: "alog_imaging::pool",
                        error = %e,
                        num_threads,
                        "failed to build thread pool, using rayon global pool"
                    );
                    None
                }
            }
        })
        .as_ref()
}

fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_RAYON_THREADS)
}

fn reserved_libuv_threads() -> usize {
    std::env::var("UV_THREADPOOL_SIZE")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIBUV_THREADPOOL_SIZE)
}

fn pool_size(parallelism: usize, uv_reserve: usize) -> usize {
    parallelism
        .saturating_sub(uv_reserve)
        .max(MIN_RAYON_THREADS)
}

//! Shared thread pool for batch inference.
//!
//! Pixels are the unit of parallelism: each one runs its own optimizer
//! search with no shared mutable state. The pool is built once and reused
//! by every batch.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Get or initialize the shared thread pool.
///
/// One worker per logical CPU, with named threads. Returns `None` if the
/// pool cannot be built; `install` then runs on rayon's global pool.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> Option<&'static ThreadPool> {
    if let Some(pool) = THREAD_POOL.get() {
        return Some(pool);
    }
    match rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("kpfm-bayes-{i}"))
        .build()
    {
        Ok(pool) => Some(THREAD_POOL.get_or_init(|| pool)),
        Err(err) => {
            tracing::warn!(%err, "failed to build inference thread pool; using global pool");
            None
        }
    }
}

/// Execute a parallel operation on the shared pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Execute the operation directly when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}

//! Global tokio runtime management.
//!
//! The public API is blocking; underneath, every socket is a tokio stream
//! driven by one shared multi-threaded runtime that lives for the rest of
//! the process.

use std::sync::OnceLock;
use tokio::runtime::Runtime;

/// Global tokio runtime, initialized once on first use.
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get (or initialize) the global tokio runtime.
///
/// The runtime is multi-threaded with the default number of worker threads
/// (typically equal to the number of CPU cores). Override with the
/// `RSSDB_RUNTIME_THREADS` environment variable.
pub fn get_runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all();

        if let Some(n) = std::env::var("RSSDB_RUNTIME_THREADS")
            .ok()
            .and_then(|threads| threads.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            builder.worker_threads(n);
        }

        match builder.thread_name("rssdb-rt").build() {
            Ok(rt) => rt,
            Err(e) => {
                // OnceLock::get_or_init cannot fail, and a runtime that cannot
                // be created (e.g. ulimit too low) leaves nothing to fall back to.
                panic!("rssdb: failed to create tokio runtime: {e}");
            }
        }
    })
}

/// Block on a future using the global runtime.
///
/// This is the bridge between the synchronous client and async I/O.
/// Note: This must NOT be called from within an async context (will panic).
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    get_runtime().block_on(future)
}

/// Spawn a future on the global runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    get_runtime().spawn(future)
}

// ── Tests ──────────────────────────────────────────────────────────

use std::sync::atomic::AtomicUsize;

use crate::Result;

/// Stop signal for one run. Clones observe the same state.
pub use tokio_util::sync::CancellationToken;

pub trait ParallelProcessor {
    /// Build a dedicated pool for one run rather than touching rayon's global
    /// pool, so each run gets exactly `threads` workers.
    fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("convert-worker-{}", i))
            .build()?;
        println!("Using {} threads", pool.current_num_threads());
        Ok(pool)
    }

    fn get_progress_counter() -> AtomicUsize {
        AtomicUsize::new(0)
    }
}

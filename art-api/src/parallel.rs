//! Bounded fan-out of independent REST calls
//!
//! Jobs run concurrently with at most `max_workers` in flight. Every job is
//! awaited; results come back in submission order, or the error of the first
//! failed job in submission order.

use art_shared::{ArtError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub async fn run_all<T, Fut>(max_workers: usize, jobs: Vec<Fut>) -> Result<Vec<T>>
where
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();
    let total = jobs.len();

    for (index, job) in jobs.into_iter().enumerate() {
        let permits = permits.clone();
        set.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => job.await,
                Err(e) => Err(ArtError::Worker(e.to_string())),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<T>>> = (0..total).map(|_| None).collect();
    let mut join_error = None;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => {
                tracing::error!("Worker task aborted: {}", e);
                join_error.get_or_insert(ArtError::Worker(e.to_string()));
            }
        }
    }

    let mut values = Vec::with_capacity(total);
    for slot in slots {
        match slot {
            Some(Ok(value)) => values.push(value),
            Some(Err(e)) => return Err(e),
            None => {
                return Err(join_error
                    .take()
                    .unwrap_or_else(|| ArtError::Worker("job did not complete".to_string())))
            }
        }
    }
    Ok(values)
}

/// Apply `job` to every item concurrently
pub async fn map_parallel<I, T, F, Fut>(max_workers: usize, items: I, job: F) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    run_all(max_workers, items.into_iter().map(job).collect()).await
}

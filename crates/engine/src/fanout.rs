use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs `work` over every item in `items` with at most `concurrency`
/// tasks in flight at once. A failing item is logged by the caller
/// (via `on_failure`) and dropped — siblings are never aborted because
/// one item failed. Results are NOT returned in input order: callers
/// that need input order should carry the original index through `T`.
pub async fn run<T, Fut, F, E>(items: Vec<T>, concurrency: usize, work: F, mut on_failure: impl FnMut(&T, E))
where
    T: Send + 'static + Clone,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    E: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let work = Arc::new(work);
    let mut set = JoinSet::new();

    for item in items {
        let permit = Arc::clone(&semaphore).acquire_owned().await.expect("semaphore not closed");
        let work = Arc::clone(&work);
        let item_for_task = item.clone();
        set.spawn(async move {
            let result = work(item_for_task).await;
            drop(permit);
            (item, result)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((item, Err(e))) => on_failure(&item, e),
            Ok((_, Ok(()))) => {}
            Err(join_error) => {
                tracing::error!(error = %join_error, "fan-out task panicked");
            }
        }
    }
}

/// Variant of `run` that collects successful outputs (in completion
/// order, not input order) alongside logging failures.
pub async fn run_collect<T, R, Fut, F, E>(
    items: Vec<T>,
    concurrency: usize,
    work: F,
    mut on_failure: impl FnMut(&T, E),
) -> Vec<R>
where
    T: Send + 'static + Clone,
    R: Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    E: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let work = Arc::new(work);
    let mut set = JoinSet::new();

    for item in items {
        let permit = Arc::clone(&semaphore).acquire_owned().await.expect("semaphore not closed");
        let work = Arc::clone(&work);
        let item_for_task = item.clone();
        set.spawn(async move {
            let result = work(item_for_task).await;
            drop(permit);
            (item, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((item, Ok(value))) => results.push((item, value)),
            Ok((item, Err(e))) => on_failure(&item, e),
            Err(join_error) => {
                tracing::error!(error = %join_error, "fan-out task panicked");
            }
        }
    }

    results.into_iter().map(|(_, value)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn collects_successful_results_and_reports_failures() {
        let processed = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(std::sync::Mutex::new(Vec::new()));
        let failures_clone = Arc::clone(&failures);

        let processed_clone = Arc::clone(&processed);
        let results = run_collect(
            vec![1, 2, 3, 4],
            2,
            move |n: i32| {
                let processed = Arc::clone(&processed_clone);
                async move {
                    processed.fetch_add(1, Ordering::SeqCst);
                    if n == 3 {
                        Err("boom".to_string())
                    } else {
                        Ok(n * 10)
                    }
                }
            },
            move |item, e: String| failures_clone.lock().unwrap().push((*item, e)),
        )
        .await;

        assert_eq!(processed.load(Ordering::SeqCst), 4);
        assert_eq!(results.len(), 3);
        assert!(results.contains(&10));
        assert!(results.contains(&20));
        assert!(results.contains(&40));
        assert_eq!(failures.lock().unwrap().len(), 1);
    }
}

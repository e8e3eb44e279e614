use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

/// Run `f` over every item with at most `limit` futures in flight at once.
/// Results come back in input order; each item fails independently.
pub async fn bounded_map<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<anyhow::Result<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let tasks = items.into_iter().map(|item| {
        let semaphore = semaphore.clone();
        let fut = f(item);
        async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| anyhow::anyhow!("fanout semaphore closed"))?;
            fut.await
        }
    });
    join_all(tasks).await
}

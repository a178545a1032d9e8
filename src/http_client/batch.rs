use futures::stream::{self, StreamExt};
use std::future::Future;

/// Await every operation concurrently; results come back in input order
pub async fn batch<I, F>(ops: I) -> Vec<F::Output>
where
    I: IntoIterator<Item = F>,
    F: Future,
{
    futures::future::join_all(ops).await
}

/// Run `ops` with at most `limit` in flight, starting the next one as soon
/// as any finishes. Results are returned in input order, not completion order.
pub async fn batch_with_limit<I, F>(ops: I, limit: usize) -> Vec<F::Output>
where
    I: IntoIterator<Item = F>,
    F: Future,
{
    let mut indexed: Vec<(usize, F::Output)> = stream::iter(
        ops.into_iter()
            .enumerate()
            .map(|(index, op)| async move { (index, op.await) }),
    )
    .buffer_unordered(limit.max(1))
    .collect()
    .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn keeps_input_order_when_completion_order_differs() {
        let ops = (0..5u64).map(|i| async move {
            tokio::time::sleep(Duration::from_millis(50 - i * 10)).await;
            i
        });
        assert_eq!(batch_with_limit(ops, 2).await, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let ops = (0..3).map(|i| async move { i * 2 });
        assert_eq!(batch_with_limit(ops, 0).await, vec![0, 2, 4]);
        assert_eq!(batch((0..3).map(|i| async move { i })).await, vec![0, 1, 2]);
    }
}

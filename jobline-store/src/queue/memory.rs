//! In-process Work Queue

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use super::WorkQueue;
use crate::error::QueueError;

/// FIFO queue backed by a `VecDeque`, woken through a `Notify`
///
/// Clones share the same underlying queue. Dropping a pending `dequeue`
/// future never loses an item.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    items: Arc<Mutex<VecDeque<String>>>,
    available: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids currently waiting, head first
    pub async fn snapshot(&self) -> Vec<String> {
        self.items.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, job_id: &str) -> Result<(), QueueError> {
        self.items.lock().await.push_back(job_id.to_string());
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Result<String, QueueError> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job_id) = self.items.lock().await.pop_front() {
                return Ok(job_id);
            }

            notified.await;
        }
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        Ok(self.items.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryQueue::new();
        queue.enqueue("a").await.unwrap();
        queue.enqueue("b").await.unwrap();
        queue.enqueue("c").await.unwrap();

        assert_eq!(queue.depth().await.unwrap(), 3);
        assert_eq!(queue.dequeue().await.unwrap(), "a");
        assert_eq!(queue.dequeue().await.unwrap(), "b");
        assert_eq!(queue.dequeue().await.unwrap(), "c");
        assert_eq!(queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dequeue_blocks_until_enqueue() {
        let queue = MemoryQueue::new();
        let consumer = queue.clone();

        let handle = tokio::spawn(async move { consumer.dequeue().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        queue.enqueue("late").await.unwrap();

        let job_id = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dequeue should wake up")
            .unwrap()
            .unwrap();
        assert_eq!(job_id, "late");
    }

    #[tokio::test]
    async fn test_cancelled_dequeue_keeps_items() {
        let queue = MemoryQueue::new();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), queue.dequeue()).await;
        assert!(timed_out.is_err());

        queue.enqueue("kept").await.unwrap();
        assert_eq!(queue.snapshot().await, vec!["kept".to_string()]);
        assert_eq!(queue.dequeue().await.unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_each_item_delivered_once() {
        let queue = MemoryQueue::new();
        let mut consumers = Vec::new();
        for _ in 0..4 {
            let q = queue.clone();
            consumers.push(tokio::spawn(async move { q.dequeue().await.unwrap() }));
        }

        for i in 0..4 {
            queue.enqueue(&format!("job-{}", i)).await.unwrap();
        }

        let mut received = Vec::new();
        for consumer in consumers {
            received.push(
                tokio::time::timeout(Duration::from_secs(1), consumer)
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        received.sort();
        assert_eq!(received, vec!["job-0", "job-1", "job-2", "job-3"]);
    }
}

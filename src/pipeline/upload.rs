use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::{error::ErrorInfo, error::ErrorKind, models::UploadResult, storage::BlobStoreClient};

#[derive(Debug, Clone)]
pub struct UploadTask {
    /// Position of the item in the caller's batch; copied into the result.
    pub index: usize,
    pub payload: Vec<u8>,
    pub key: String,
    pub content_type: String,
}

/// Uploads through a fixed pool of workers pulling from one task queue.
pub struct UploadStage {
    store: BlobStoreClient,
    workers: usize,
}

impl UploadStage {
    pub fn new(store: BlobStoreClient, workers: usize) -> Self {
        Self {
            store,
            workers: workers.max(1),
        }
    }

    /// One result per task, aligned with `tasks` regardless of completion order.
    pub async fn upload_all(&self, tasks: Vec<UploadTask>) -> Vec<UploadResult> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        log::info!(
            "📤 Uploading {} images with {} workers...",
            total,
            self.workers.min(total)
        );

        let mut slots: Vec<Option<UploadResult>> = vec![None; total];
        let fallback: Vec<(usize, String)> = tasks
            .iter()
            .map(|task| (task.index, task.key.clone()))
            .collect();

        let (sender, receiver) = mpsc::channel(total);
        for (position, task) in tasks.into_iter().enumerate() {
            // Capacity equals the task count, so this never waits.
            if sender.send((position, task)).await.is_err() {
                break;
            }
        }
        drop(sender);

        let mut join_set = spawn_workers(self.store.clone(), receiver, self.workers.min(total));
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(finished) => {
                    for (position, result) in finished {
                        slots[position] = Some(result);
                    }
                }
                Err(e) => log::error!("❌ Upload worker terminated: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(fallback)
            .map(|(slot, (index, key))| {
                slot.unwrap_or_else(|| {
                    UploadResult::failure(
                        index,
                        Some(key),
                        ErrorInfo::new(ErrorKind::Storage, "upload worker terminated"),
                    )
                })
            })
            .collect()
    }
}

type QueuedTask = (usize, UploadTask);

fn spawn_workers(
    store: BlobStoreClient,
    receiver: mpsc::Receiver<QueuedTask>,
    worker_count: usize,
) -> JoinSet<Vec<(usize, UploadResult)>> {
    let shared_receiver = Arc::new(Mutex::new(receiver));

    let mut join_set = JoinSet::new();
    for worker_idx in 0..worker_count {
        let rx = Arc::clone(&shared_receiver);
        let store = store.clone();
        join_set.spawn(async move { run_worker(worker_idx, rx, store).await });
    }
    join_set
}

async fn run_worker(
    worker_idx: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedTask>>>,
    store: BlobStoreClient,
) -> Vec<(usize, UploadResult)> {
    let mut finished = Vec::new();
    loop {
        let Some((position, task)) = receive_task(&receiver).await else {
            log::debug!("upload worker {} finished ({} tasks)", worker_idx, finished.len());
            break;
        };

        let result = match store
            .upload(task.payload, &task.key, &task.content_type)
            .await
        {
            Ok(url) => UploadResult::success(task.index, task.key, url),
            Err(e) => {
                log::warn!("⚠️  Upload failed {}: {}", task.key, e);
                UploadResult::failure(task.index, Some(task.key), e.to_info())
            }
        };
        finished.push((position, result));
    }
    finished
}

async fn receive_task(receiver: &Arc<Mutex<mpsc::Receiver<QueuedTask>>>) -> Option<QueuedTask> {
    let mut guard = receiver.lock().await;
    guard.recv().await
}

//! Background stylization queue.
//!
//! Jobs go through a bounded channel to a dispatcher task that runs up to
//! `workers` of them at once. Jobs are independent and finish in any order.
//!
//! # Example
//!
//! ```rust,ignore
//! let (queue, handle) = StylizeQueue::start(stylizer, &config.jobs);
//! queue.submit(StylizeJob::for_upload(hole_id, image_id)).await?;
//! ```

use std::sync::Arc;

use anyhow::Result;
use fairway_db::pool::{get_conn, DbPool};
use fairway_db::queries::hole_images;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::job::{StylizeJob, StylizeOutcome, Stylizer};
use crate::config::JobsConfig;

/// Handle for submitting stylization jobs.
///
/// Cheap to clone. The dispatcher stops once every handle is dropped and
/// in-flight jobs have finished.
#[derive(Clone)]
pub struct StylizeQueue {
    sender: mpsc::Sender<StylizeJob>,
}

impl StylizeQueue {
    /// Spawn the dispatcher and return a handle plus the dispatcher's task.
    pub fn start(stylizer: Arc<Stylizer>, config: &JobsConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(dispatch(receiver, stylizer, config.workers.max(1)));
        (Self { sender }, handle)
    }

    /// Enqueue a job. Waits only when the channel is full.
    pub async fn submit(&self, job: StylizeJob) -> Result<()> {
        debug!(hole_id = %job.hole_id, image_id = ?job.image_id, "Submitting stylization job");
        self.sender
            .send(job)
            .await
            .map_err(|_| anyhow::anyhow!("Stylization queue is closed"))
    }

    /// Re-enqueue uploads left unfinished by a previous process.
    pub async fn recover(&self, pool: &DbPool) -> Result<usize> {
        let unfinished = {
            let conn = get_conn(pool)?;
            hole_images::list_unfinished_originals(&conn)?
        };

        let count = unfinished.len();
        for image in unfinished {
            self.submit(StylizeJob::for_upload(image.hole_id, image.id))
                .await?;
        }
        if count > 0 {
            info!(count, "Re-enqueued unfinished stylization jobs");
        }
        Ok(count)
    }
}

async fn dispatch(mut receiver: mpsc::Receiver<StylizeJob>, stylizer: Arc<Stylizer>, workers: usize) {
    info!(workers, "Stylization queue started");

    let permits = Arc::new(Semaphore::new(workers));
    let mut running = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        while running.try_join_next().is_some() {}

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let stylizer = stylizer.clone();
        running.spawn(async move {
            let _permit = permit;
            let outcome = stylizer.run(&job).await;
            match &outcome {
                StylizeOutcome::Failed(error) => {
                    warn!(hole_id = %job.hole_id, %error, "Stylization job failed")
                }
                other => debug!(hole_id = %job.hole_id, outcome = ?other, "Stylization job finished"),
            }
        });
    }

    while running.join_next().await.is_some() {}
    info!("Stylization queue stopped (channel closed)");
}

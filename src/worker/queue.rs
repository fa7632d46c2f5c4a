use crate::event::ChangeEvent;
use crate::telemetry::generate_job_id;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Where a job came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    Webhook,
    Manual,
}

impl JobSource {
    pub fn as_str(self) -> &'static str {
        match self {
            JobSource::Webhook => "webhook",
            JobSource::Manual => "manual",
        }
    }
}

/// One queued unit of work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub event: ChangeEvent,
    pub received_at: DateTime<Utc>,
    pub source: JobSource,
}

impl Job {
    pub fn new(event: ChangeEvent, source: JobSource) -> Self {
        Self {
            id: generate_job_id(),
            event,
            received_at: Utc::now(),
            source,
        }
    }
}

#[derive(Debug, Error)]
#[error("job queue is closed, the worker has stopped")]
pub struct QueueClosed;

/// Producer side of the job queue. Cheap to clone; enqueueing never blocks.
///
/// Events for a PR that is already queued are not merged: each one becomes
/// its own job and they run one after another.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobSender {
    pub fn enqueue(&self, event: ChangeEvent, source: JobSource) -> Result<Uuid, QueueClosed> {
        let job = Job::new(event, source);
        let id = job.id;
        self.tx.send(job).map_err(|_| QueueClosed)?;
        Ok(id)
    }
}

/// Consumer side; owned by the single worker
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl JobReceiver {
    /// Wait for the next job; `None` once every sender is gone and the
    /// queue is drained
    pub async fn next(&mut self) -> Option<Job> {
        self.rx.recv().await
    }
}

pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (JobSender { tx }, JobReceiver { rx })
}

//! The single worker that runs jobs one at a time
//!
//! Jobs share one workspace, so they are never processed concurrently: the
//! next job is dequeued only after the previous one has fully finished,
//! teardown included.

pub mod queue;

pub use queue::{job_queue, Job, JobReceiver, JobSender, JobSource, QueueClosed};

use crate::errors::{Disposition, PipelineError, PipelineResult};
use crate::telemetry::job_span;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// Runs one job to completion
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &Job) -> PipelineResult<()>;
}

pub struct Worker {
    receiver: JobReceiver,
    processor: Arc<dyn JobProcessor>,
}

impl Worker {
    pub fn new(receiver: JobReceiver, processor: Arc<dyn JobProcessor>) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    /// Process jobs until the queue closes. Returns early only for errors
    /// that make further jobs pointless (configuration problems).
    pub async fn run(mut self) -> PipelineResult<()> {
        info!("worker started");
        while let Some(job) = self.receiver.next().await {
            let span = job_span(&job.id, job.event.number, job.source.as_str());
            let processor = self.processor.clone();

            let handle = tokio::spawn(
                async move {
                    info!(queued_at = %job.received_at, "processing job");
                    let outcome = processor.process(&job).await;
                    if let Err(err) = &outcome {
                        report(err);
                    }
                    outcome
                }
                .instrument(span),
            );

            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.disposition() == Disposition::AbortProcess => {
                    error!("stopping worker");
                    return Err(err);
                }
                Ok(Err(_)) => {}
                Err(join_error) => error!("job crashed: {join_error}"),
            }
        }
        info!("job queue closed, worker exiting");
        Ok(())
    }
}

fn report(err: &PipelineError) {
    match err.disposition() {
        Disposition::Skip => warn!("job skipped: {err}"),
        Disposition::AbortJob => error!("job aborted: {err}"),
        Disposition::AbortProcess => error!("fatal: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::sample_event;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records start/end of every job; PR numbers pick the behaviour
    #[derive(Default)]
    struct RecordingProcessor {
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobProcessor for RecordingProcessor {
        async fn process(&self, job: &Job) -> PipelineResult<()> {
            let n = job.event.number;
            self.log.lock().unwrap().push(format!("start {n}"));
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.log.lock().unwrap().push(format!("end {n}"));
            match n {
                2 => Err(PipelineError::Retrieval("remote missing".into())),
                3 => panic!("formatter crashed"),
                4 => Err(PipelineError::Configuration("token revoked".into())),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_jobs_run_strictly_in_fifo_order() {
        let (sender, receiver) = job_queue();
        let processor = Arc::new(RecordingProcessor::default());
        for n in [1, 2, 3, 5] {
            sender.enqueue(sample_event(n), JobSource::Webhook).unwrap();
        }
        drop(sender);

        Worker::new(receiver, processor.clone()).run().await.unwrap();

        assert_eq!(
            *processor.log.lock().unwrap(),
            vec!["start 1", "end 1", "start 2", "end 2", "start 3", "end 3", "start 5", "end 5"]
        );
    }

    #[tokio::test]
    async fn test_configuration_error_stops_the_worker() {
        let (sender, receiver) = job_queue();
        let processor = Arc::new(RecordingProcessor::default());
        sender.enqueue(sample_event(4), JobSource::Manual).unwrap();
        sender.enqueue(sample_event(1), JobSource::Manual).unwrap();

        let result = Worker::new(receiver, processor.clone()).run().await;

        assert!(matches!(result, Err(PipelineError::Configuration(_))));
        assert_eq!(*processor.log.lock().unwrap(), vec!["start 4", "end 4"]);
    }
}

use super::Command;
use crate::config::StyleGuardConfig;
use crate::ingest::IngestOutcome;
use crate::service::Service;
use crate::worker::JobSource;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct ReplayCommand {
    pub config: StyleGuardConfig,
    pub payload: PathBuf,
}

impl ReplayCommand {
    pub fn new(config: StyleGuardConfig, payload: PathBuf) -> Self {
        Self { config, payload }
    }
}

impl Command for ReplayCommand {
    async fn execute(&self) -> Result<()> {
        let text = tokio::fs::read_to_string(&self.payload)
            .await
            .with_context(|| format!("cannot read {}", self.payload.display()))?;
        let payload: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not JSON", self.payload.display()))?;

        let service = Service::start(&self.config).await?;
        match service.ingest().accept_payload(payload, JobSource::Webhook)? {
            IngestOutcome::Enqueued(id) => println!("🎯 Payload queued (job {id})"),
            IngestOutcome::Ignored(reason) => println!("⏭️  Payload ignored: {reason}"),
        }

        service.drain().await?;
        Ok(())
    }
}

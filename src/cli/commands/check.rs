use super::Command;
use crate::config::StyleGuardConfig;
use crate::service::Service;
use anyhow::Result;

pub struct CheckCommand {
    pub config: StyleGuardConfig,
    pub prs: Vec<u64>,
}

impl CheckCommand {
    pub fn new(config: StyleGuardConfig, prs: Vec<u64>) -> Self {
        Self { config, prs }
    }
}

impl Command for CheckCommand {
    async fn execute(&self) -> Result<()> {
        let service = Service::start(&self.config).await?;

        for pr in &self.prs {
            let id = service.ingest().trigger(*pr).await?;
            println!("🎯 PR #{pr} queued (job {id})");
        }

        service.drain().await?;
        println!("✅ All checks finished");
        Ok(())
    }
}

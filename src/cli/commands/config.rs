use super::Command;
use crate::config::{Credential, StyleGuardConfig};
use anyhow::Result;

pub struct ConfigCommand {
    pub config: StyleGuardConfig,
    pub check: bool,
}

impl ConfigCommand {
    pub fn new(config: StyleGuardConfig, check: bool) -> Self {
        Self { config, check }
    }
}

impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", self.config.to_toml()?);

        if self.check {
            println!();
            println!("🔍 CONFIGURATION CHECK:");
            println!("──────────────────────");
            self.config.validate()?;
            println!("✅ Options are consistent");
            println!("   📦 Repository: {}", self.config.repository_slug()?);
            println!("   📁 Workspace: {}", self.config.repo_dir().display());

            match Credential::load_status(&self.config.credentials_path()) {
                Ok(_) => println!("✅ Credentials found with required scopes"),
                Err(e) => {
                    println!("❌ Credentials: {e}");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

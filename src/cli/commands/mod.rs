use anyhow::Result;

pub mod check;
pub mod config;
pub mod replay;

pub use check::CheckCommand;
pub use config::ConfigCommand;
pub use replay::ReplayCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

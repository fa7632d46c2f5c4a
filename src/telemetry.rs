use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured logging
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_telemetry(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    }

    tracing::debug!("style-guard telemetry initialized");
    Ok(())
}

/// Generate an id linking every log line of one job
pub fn generate_job_id() -> Uuid {
    Uuid::new_v4()
}

/// Span covering one job from validation to teardown
pub fn job_span(job_id: &Uuid, pr_number: u64, source: &str) -> tracing::Span {
    tracing::info_span!(
        "job",
        job.id = %job_id,
        pr.number = pr_number,
        source = source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(generate_job_id(), generate_job_id());
    }
}

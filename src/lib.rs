// style-guard library - code style verification for pull requests
// This exposes the pipeline stages for testing and integration

pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod external;
pub mod feedback;
pub mod filter;
pub mod github;
pub mod ingest;
pub mod patches;
pub mod pipeline;
pub mod retrieval;
pub mod service;
pub mod telemetry;
pub mod validator;
pub mod verifier;
pub mod worker;
pub mod workspace;

// Re-export key types for easy access
pub use config::{RetrievalMode, StyleGuardConfig};
pub use errors::{Disposition, PipelineError, PipelineResult};
pub use event::{ChangeEvent, Mergeability, PrState};
pub use filter::FileFilter;
pub use github::{GitHubClient, GitHubError, HostingPlatform};
pub use ingest::{EventIngest, IngestError, IngestOutcome};
pub use pipeline::{JobReport, Pipeline};
pub use service::Service;
pub use telemetry::init_telemetry;
pub use verifier::{StyleVerifier, VerificationResult};
pub use worker::{job_queue, Job, JobSource, Worker};
pub use workspace::{Workspace, WorkspaceLayout};

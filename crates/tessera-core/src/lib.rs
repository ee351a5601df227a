//! Whole-plan runs: validate the plan, mine the building blocks into a
//! pool, cover every row, and report.

pub mod campaign;
pub mod config;
pub mod external;
pub mod hierarchy;
pub mod summary;

pub use campaign::{Campaign, CampaignError, CampaignReport, ExtendedSequence};
pub use config::{ExternalRunnerConfig, RunConfig};
pub use external::{parse_verdict, ExternalError, ExternalVerdict, ProcessRunner};
pub use hierarchy::MemoizedHierarchy;
pub use summary::{RunSummary, StatusCounts};

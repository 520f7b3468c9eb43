//! Domain services for the validator
//!
//! Ingestion-time: group resolution, quality scoring, primary arbitration.
//! Validation-time: scheduled availability re-checks, quota bookkeeping and
//! the failover cascade.

pub mod failover;
pub mod group_resolver;
pub mod ingest;
pub mod platform_client;
pub mod primary_arbiter;
pub mod quality_scorer;
pub mod quota;
pub mod title_matcher;
pub mod validation_scheduler;

pub use failover::{FailoverCascade, FailoverOutcome};
pub use group_resolver::{CandidateIdentity, GroupMatch, GroupResolver, MatchType};
pub use ingest::{CandidateIngestor, IngestDisposition, IngestResult, NewCandidate};
pub use platform_client::{PlatformClient, PlatformError, StatusProbe, UnavailableReason, VideoStatus};
pub use primary_arbiter::{PrimaryArbiter, PrimaryDecision};
pub use quality_scorer::ObservableSignals;
pub use quota::QuotaLedger;
pub use validation_scheduler::{ValidationRunSummary, ValidationScheduler};

//! fdrepo core
//!
//! Decides, per tracked application, which upstream releases to publish,
//! which APK of each release to take, what version code it gets, what must
//! be downloaded and what must be evicted. Collaborators (release catalog,
//! artifact store, progress reporting) are injected as trait objects.

pub mod config;
pub mod engine;
pub mod error;
pub mod forges;
pub mod paths;
pub mod report;
pub mod reporter;
pub mod select;
pub mod store;

pub use engine::{Engine, EngineOptions, StopHandle};
pub use error::{AppError, ConfigError, ProviderError, RetentionError, SelectError, StoreError};
pub use paths::RepoLayout;
pub use report::{AppOutcome, AppReport, BuildStatus, RemovedApp, RunReport, SkipReason};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("fdrepo-core/", env!("CARGO_PKG_VERSION"));

//! Configuration boundary.
//!
//! Two documents feed a run: the tracked app list (`apps.yaml`) and the
//! optional engine settings (`fdrepo.toml`). Both are adapted into typed
//! values here so nothing downstream inspects raw document shapes.

/// App list adapter (`apps.yaml` → [`fdrepo_schema::TrackedApp`]).
pub mod apps;
/// Engine settings (`fdrepo.toml`).
pub mod settings;

pub use apps::{AppEntry, LoadedApps, append_app, load_apps, parse_apps};
pub use settings::{FetchSettings, PathSettings, RetentionSettings, Settings};

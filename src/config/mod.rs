//! Configuration system.
//!
//! Settings are merged from three tiers with field-by-field YAML merging:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/task-view/config.yaml`
//! 3. **User** - `<config dir>/task-view/config.yaml`, then environment variables
//!
//! ## Environment Variables
//! - `TASK_VIEW_CONFIG_PATH` - Explicit config file (overrides all tiers)
//! - `TASK_VIEW_CACHE_TTL_MS` - Index lookup cache lifetime
//! - `TASK_VIEW_BATCH_SIZE` - Record hydration batch size

mod loader;
mod types;

pub use loader::{BATCH_SIZE_ENV, CACHE_TTL_ENV, CONFIG_PATH_ENV, ConfigLoader, ConfigPaths};
pub use types::*;

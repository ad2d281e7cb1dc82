//! Tiered configuration.
//!
//! Configuration is merged field-by-field from:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/plandoc/config.yaml`
//! 3. **User** - `~/.plandoc/config.yaml`
//! 4. **Environment** - `PLANDOC_*` variables
//!
//! ## Environment Variables
//! - `PLANDOC_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `PLANDOC_DOCS_ROOT` - Document root directory
//! - `PLANDOC_BACKUPS_DIR` - Backup directory
//! - `PLANDOC_PORT` - Console API port
//! - `PLANDOC_USER_DIR` - User config dir (default: `~/.plandoc`)
//! - `PLANDOC_PROJECT_DIR` - Project config dir (default: `./plandoc`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;

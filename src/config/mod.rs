//! Configuration for docket.
//!
//! Settings live in KDL files:
//!
//! - System: `~/.config/docket/config.kdl` (or `$DOCKET_CONFIG_DIR/config.kdl`)
//! - Session: `<data-dir>/config.kdl`
//!
//! Keys:
//! - `backend` - `file`, `sheets`, `proxy` or `none`
//! - `spreadsheet` - spreadsheet name for the sheets backend
//! - `drive-root` - Drive folder receiving uploaded documents
//! - `credentials-file` - service-account key file
//! - `proxy-url` - endpoint of the proxy backend
//! - `action-log` - whether CLI commands are logged
//!
//! ## Precedence
//!
//! CLI flag > environment > session config > system config > defaults
//!
//! Secrets (inline credentials, proxy token) are only read from the
//! environment and never written to config files.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Credentials, Resolved, ResolvedConfig, ValueSource, resolve_config,
    session_config_path, system_config_path,
};
pub use schema::{CONFIG_KEYS, DEFAULT_DRIVE_ROOT, DEFAULT_SPREADSHEET, DocketConfig};

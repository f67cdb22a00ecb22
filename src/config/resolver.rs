//! Precedence resolution for docket configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables
//! 3. Session config.kdl (`<data-dir>/config.kdl`)
//! 4. System config.kdl (`~/.config/docket/config.kdl`)
//! 5. Built-in defaults
//!
//! Service-account credentials resolve separately: `GOOGLE_CREDS_JSON`
//! (inline key) beats `GOOGLE_CREDS` (path), which beats `credentials-file`
//! from the config files.

use crate::config::schema::{DEFAULT_DRIVE_ROOT, DEFAULT_SPREADSHEET, DocketConfig};
use crate::storage::{BackendType, resolve_data_dir};
use crate::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

pub const BACKEND_ENV: &str = "DOCKET_BACKEND";
pub const SPREADSHEET_ENV: &str = "GOOGLE_SHEETS_FILE";
pub const DRIVE_ROOT_ENV: &str = "GOOGLE_DRIVE_ROOT";
pub const CREDS_FILE_ENV: &str = "GOOGLE_CREDS";
pub const CREDS_JSON_ENV: &str = "GOOGLE_CREDS_JSON";
pub const PROXY_URL_ENV: &str = "DOCKET_PROXY_URL";
pub const PROXY_TOKEN_ENV: &str = "DOCKET_PROXY_TOKEN";
/// Overrides the directory holding the system config.
pub const CONFIG_DIR_ENV: &str = "DOCKET_CONFIG_DIR";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Where service-account credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Key JSON given inline
    Inline(String),
    /// Path to a key file
    File(PathBuf),
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: Resolved<PathBuf>,
    pub backend: Resolved<BackendType>,
    pub spreadsheet: Resolved<String>,
    pub drive_root: Resolved<String>,
    pub credentials: Option<Resolved<Credentials>>,
    pub proxy_url: Option<Resolved<String>>,
    pub proxy_token: Option<Resolved<String>>,
    pub action_log: Resolved<bool>,
}

impl ResolvedConfig {
    /// Defaults for a given data directory.
    pub fn with_data_dir(data_dir: PathBuf, source: ValueSource) -> Self {
        Self {
            data_dir: Resolved::new(data_dir, source),
            backend: Resolved::new(BackendType::File, ValueSource::Default),
            spreadsheet: Resolved::new(DEFAULT_SPREADSHEET.to_string(), ValueSource::Default),
            drive_root: Resolved::new(DEFAULT_DRIVE_ROOT.to_string(), ValueSource::Default),
            credentials: None,
            proxy_url: None,
            proxy_token: None,
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }

    pub fn session_config_path(&self) -> PathBuf {
        session_config_path(&self.data_dir.value)
    }

    /// All values as `(key, display value, source)`, secrets masked.
    pub fn entries(&self) -> Vec<(&'static str, String, ValueSource)> {
        let mut entries = vec![
            (
                "data-dir",
                self.data_dir.value.display().to_string(),
                self.data_dir.source.clone(),
            ),
            (
                "backend",
                self.backend.value.as_str().to_string(),
                self.backend.source.clone(),
            ),
            (
                "spreadsheet",
                self.spreadsheet.value.clone(),
                self.spreadsheet.source.clone(),
            ),
            (
                "drive-root",
                self.drive_root.value.clone(),
                self.drive_root.source.clone(),
            ),
        ];
        if let Some(creds) = &self.credentials {
            let shown = match &creds.value {
                Credentials::Inline(_) => "<inline service account JSON>".to_string(),
                Credentials::File(path) => path.display().to_string(),
            };
            entries.push(("credentials", shown, creds.source.clone()));
        }
        if let Some(url) = &self.proxy_url {
            entries.push(("proxy-url", url.value.clone(), url.source.clone()));
        }
        if let Some(token) = &self.proxy_token {
            entries.push(("proxy-token", mask_secret(&token.value), token.source.clone()));
        }
        entries.push((
            "action-log",
            self.action_log.value.to_string(),
            self.action_log.source.clone(),
        ));
        entries
    }
}

/// Show only the first and last 4 characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4.min(chars.len() / 2)).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

/// Path of the session config inside a data directory.
pub fn session_config_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("config.kdl")
}

/// Path of the system config.
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("config.kdl"));
        }
    }
    dirs::config_dir().map(|d| d.join("docket").join("config.kdl"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve configuration from the process environment and config files.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let data_dir = match &overrides.data_dir {
        Some(dir) => Resolved::new(dir.clone(), ValueSource::CliFlag),
        None => match env_value(crate::storage::DATA_DIR_ENV) {
            Some(dir) => Resolved::new(
                PathBuf::from(dir),
                ValueSource::EnvVar(crate::storage::DATA_DIR_ENV.to_string()),
            ),
            None => Resolved::new(resolve_data_dir(None)?, ValueSource::Default),
        },
    };

    let session = DocketConfig::load(&session_config_path(&data_dir.value))?;
    let system = match system_config_path() {
        Some(path) => DocketConfig::load(&path)?,
        None => DocketConfig::new(),
    };

    resolve_with(data_dir, overrides, &env_value, &session, &system)
}

/// Resolve configuration from explicit layers.
///
/// `env` looks up an environment variable, returning `None` when unset.
pub fn resolve_with(
    data_dir: Resolved<PathBuf>,
    overrides: &ConfigOverrides,
    env: &dyn Fn(&str) -> Option<String>,
    session: &DocketConfig,
    system: &DocketConfig,
) -> Result<ResolvedConfig> {
    let mut result = ResolvedConfig::with_data_dir(data_dir.value, data_dir.source);

    // Resolve backend
    if let Some(ref backend) = overrides.backend {
        result.backend = Resolved::new(backend.parse()?, ValueSource::CliFlag);
    } else if let Some(backend) = env(BACKEND_ENV) {
        let parsed = backend
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", BACKEND_ENV, e)))?;
        result.backend = Resolved::new(parsed, ValueSource::EnvVar(BACKEND_ENV.to_string()));
    } else if let Some(backend) = session.backend {
        result.backend = Resolved::new(backend, ValueSource::Session);
    } else if let Some(backend) = system.backend {
        result.backend = Resolved::new(backend, ValueSource::System);
    }

    // Resolve string settings shared by env and files
    let pick = |env_name: &str,
                session_value: &Option<String>,
                system_value: &Option<String>|
     -> Option<Resolved<String>> {
        if let Some(value) = env(env_name) {
            Some(Resolved::new(value, ValueSource::EnvVar(env_name.to_string())))
        } else if let Some(value) = session_value {
            Some(Resolved::new(value.clone(), ValueSource::Session))
        } else {
            system_value
                .as_ref()
                .map(|value| Resolved::new(value.clone(), ValueSource::System))
        }
    };

    if let Some(name) = pick(SPREADSHEET_ENV, &session.spreadsheet, &system.spreadsheet) {
        result.spreadsheet = name;
    }
    if let Some(root) = pick(DRIVE_ROOT_ENV, &session.drive_root, &system.drive_root) {
        result.drive_root = root;
    }
    result.proxy_url = pick(PROXY_URL_ENV, &session.proxy_url, &system.proxy_url);
    result.proxy_token = env(PROXY_TOKEN_ENV)
        .map(|token| Resolved::new(token, ValueSource::EnvVar(PROXY_TOKEN_ENV.to_string())));

    // Resolve credentials
    result.credentials = if let Some(json) = env(CREDS_JSON_ENV) {
        Some(Resolved::new(
            Credentials::Inline(json),
            ValueSource::EnvVar(CREDS_JSON_ENV.to_string()),
        ))
    } else {
        pick(CREDS_FILE_ENV, &session.credentials_file, &system.credentials_file)
            .map(|r| Resolved::new(Credentials::File(PathBuf::from(r.value)), r.source))
    };

    // Resolve action log switch (config files only)
    if let Some(enabled) = session.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::Session);
    } else if let Some(enabled) = system.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::System);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serial_test::serial;
    use std::collections::HashMap;

    fn dir() -> Resolved<PathBuf> {
        Resolved::new(PathBuf::from("/tmp/docket"), ValueSource::Default)
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(
            ValueSource::EnvVar("GOOGLE_CREDS".to_string()).to_string(),
            "env:GOOGLE_CREDS"
        );
        assert_eq!(ValueSource::Session.to_string(), "session");
        assert_eq!(ValueSource::System.to_string(), "system");
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
        assert_eq!(ValueSource::Default.to_string(), "default");
    }

    #[test]
    fn test_defaults() {
        let resolved = resolve_with(
            dir(),
            &ConfigOverrides::new(),
            &env_of(&[]),
            &DocketConfig::new(),
            &DocketConfig::new(),
        )
        .unwrap();

        assert_eq!(resolved.backend.value, BackendType::File);
        assert_eq!(resolved.backend.source, ValueSource::Default);
        assert_eq!(resolved.spreadsheet.value, DEFAULT_SPREADSHEET);
        assert_eq!(resolved.drive_root.value, DEFAULT_DRIVE_ROOT);
        assert!(resolved.credentials.is_none());
        assert!(resolved.action_log.value);
    }

    #[test]
    fn test_precedence_cli_env_session_system() {
        let system = DocketConfig {
            backend: Some(BackendType::Sheets),
            spreadsheet: Some("system".to_string()),
            drive_root: Some("system-root".to_string()),
            ..Default::default()
        };
        let session = DocketConfig {
            backend: Some(BackendType::Proxy),
            spreadsheet: Some("session".to_string()),
            ..Default::default()
        };
        let env = env_of(&[(BACKEND_ENV, "none"), (SPREADSHEET_ENV, "env")]);

        let resolved = resolve_with(dir(), &ConfigOverrides::new(), &env, &session, &system).unwrap();
        assert_eq!(resolved.backend.value, BackendType::Disabled);
        assert_eq!(resolved.backend.source, ValueSource::EnvVar(BACKEND_ENV.to_string()));
        assert_eq!(resolved.spreadsheet.value, "env");
        assert_eq!(resolved.drive_root.value, "system-root");
        assert_eq!(resolved.drive_root.source, ValueSource::System);

        let overrides = ConfigOverrides::new().with_backend("file");
        let resolved = resolve_with(dir(), &overrides, &env, &session, &system).unwrap();
        assert_eq!(resolved.backend.value, BackendType::File);
        assert_eq!(resolved.backend.source, ValueSource::CliFlag);

        let resolved = resolve_with(dir(), &ConfigOverrides::new(), &env_of(&[]), &session, &system).unwrap();
        assert_eq!(resolved.backend.value, BackendType::Proxy);
        assert_eq!(resolved.backend.source, ValueSource::Session);
    }

    #[test]
    fn test_inline_credentials_beat_file() {
        let session = DocketConfig {
            credentials_file: Some("/etc/sa.json".to_string()),
            ..Default::default()
        };
        let env = env_of(&[(CREDS_JSON_ENV, "{}"), (CREDS_FILE_ENV, "/env/sa.json")]);
        let resolved = resolve_with(dir(), &ConfigOverrides::new(), &env, &session, &DocketConfig::new()).unwrap();
        assert_eq!(
            resolved.credentials.unwrap().value,
            Credentials::Inline("{}".to_string())
        );

        let env = env_of(&[(CREDS_FILE_ENV, "/env/sa.json")]);
        let resolved = resolve_with(dir(), &ConfigOverrides::new(), &env, &session, &DocketConfig::new()).unwrap();
        assert_eq!(
            resolved.credentials.unwrap().value,
            Credentials::File(PathBuf::from("/env/sa.json"))
        );

        let resolved =
            resolve_with(dir(), &ConfigOverrides::new(), &env_of(&[]), &session, &DocketConfig::new()).unwrap();
        let creds = resolved.credentials.unwrap();
        assert_eq!(creds.value, Credentials::File(PathBuf::from("/etc/sa.json")));
        assert_eq!(creds.source, ValueSource::Session);
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let err = resolve_with(
            dir(),
            &ConfigOverrides::new(),
            &env_of(&[(BACKEND_ENV, "ftp")]),
            &DocketConfig::new(),
            &DocketConfig::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains(BACKEND_ENV));

        assert!(
            resolve_with(
                dir(),
                &ConfigOverrides::new().with_backend("ftp"),
                &env_of(&[]),
                &DocketConfig::new(),
                &DocketConfig::new(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_entries_mask_proxy_token() {
        let env = env_of(&[
            (PROXY_URL_ENV, "https://example.test/exec"),
            (PROXY_TOKEN_ENV, "abcd1234efgh5678ijkl"),
        ]);
        let resolved = resolve_with(dir(), &ConfigOverrides::new(), &env, &DocketConfig::new(), &DocketConfig::new()).unwrap();
        let token = resolved
            .entries()
            .into_iter()
            .find(|(key, _, _)| *key == "proxy-token")
            .unwrap();
        assert_eq!(token.1, "abcd...ijkl");
    }

    #[test]
    fn test_mask_secret_short() {
        assert_eq!(mask_secret("abc"), "a...");
        assert_eq!(mask_secret(""), "...");
    }

    #[test]
    #[serial]
    fn test_resolve_config_reads_session_and_system_files() {
        let env = TestEnv::new();
        let system_dir = tempfile::TempDir::new().unwrap();
        // SAFETY: We're in a test environment and this test runs serially
        unsafe {
            std::env::set_var(CONFIG_DIR_ENV, system_dir.path());
            std::env::remove_var(BACKEND_ENV);
            std::env::remove_var(SPREADSHEET_ENV);
            std::env::remove_var(DRIVE_ROOT_ENV);
        }

        let mut system = DocketConfig::new();
        system.set("spreadsheet", "Planilha_Sistema").unwrap();
        system.set("drive-root", "Pasta_Sistema").unwrap();
        system.save(&system_config_path().unwrap()).unwrap();

        let mut session = DocketConfig::new();
        session.set("spreadsheet", "Planilha_Sessao").unwrap();
        session.save(&session_config_path(env.data_path())).unwrap();

        let config =
            resolve_config(&ConfigOverrides::new().with_data_dir(env.data_path())).unwrap();
        assert_eq!(config.data_dir.source, ValueSource::CliFlag);
        assert_eq!(config.spreadsheet.value, "Planilha_Sessao");
        assert_eq!(config.spreadsheet.source, ValueSource::Session);
        assert_eq!(config.drive_root.value, "Pasta_Sistema");
        assert_eq!(config.drive_root.source, ValueSource::System);
        assert_eq!(config.backend.value, BackendType::File);

        // SAFETY: see above
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
    }
}

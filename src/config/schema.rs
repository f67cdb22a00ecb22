//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Conversion to/from KDL documents
//! - Key-by-key editing for `docket config set|unset`
//! - Reading and writing config files

use crate::storage::BackendType;
use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::path::Path;

/// Default spreadsheet name for the sheets backend.
pub const DEFAULT_SPREADSHEET: &str = "PlataformaAD_Dados";

/// Default Drive folder holding uploaded documents.
pub const DEFAULT_DRIVE_ROOT: &str = "PlataformaAD_Documentos";

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &[
    "backend",
    "spreadsheet",
    "drive-root",
    "credentials-file",
    "proxy-url",
    "action-log",
];

/// Settings stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// backend "sheets"          // file | sheets | proxy | none
/// spreadsheet "PlataformaAD_Dados"
/// drive-root "PlataformaAD_Documentos"
/// credentials-file "/etc/docket/service-account.json"
/// proxy-url "https://script.google.com/macros/s/.../exec"
/// action-log #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocketConfig {
    pub backend: Option<BackendType>,
    pub spreadsheet: Option<String>,
    pub drive_root: Option<String>,
    /// Path to a service-account key file
    pub credentials_file: Option<String>,
    pub proxy_url: Option<String>,
    pub action_log: Option<bool>,
}

fn first_string(doc: &KdlDocument, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(str::to_string)
}

fn string_node(key: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

/// Parse a boolean typed on the command line.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "#true" => Some(true),
        "false" | "no" | "off" | "0" | "#false" => Some(false),
        _ => None,
    }
}

impl DocketConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document.
    ///
    /// Values of the wrong shape are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let action_log = doc
            .get("action-log")
            .and_then(|node| node.entries().first())
            .and_then(|entry| match entry.value() {
                KdlValue::Bool(b) => Some(*b),
                KdlValue::String(s) => parse_bool(s),
                _ => None,
            });

        Self {
            backend: first_string(doc, "backend").and_then(|s| BackendType::parse(&s)),
            spreadsheet: first_string(doc, "spreadsheet"),
            drive_root: first_string(doc, "drive-root"),
            credentials_file: first_string(doc, "credentials-file"),
            proxy_url: first_string(doc, "proxy-url"),
            action_log,
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let nodes = doc.nodes_mut();

        if let Some(backend) = self.backend {
            nodes.push(string_node("backend", backend.as_str()));
        }
        if let Some(ref name) = self.spreadsheet {
            nodes.push(string_node("spreadsheet", name));
        }
        if let Some(ref root) = self.drive_root {
            nodes.push(string_node("drive-root", root));
        }
        if let Some(ref path) = self.credentials_file {
            nodes.push(string_node("credentials-file", path));
        }
        if let Some(ref url) = self.proxy_url {
            nodes.push(string_node("proxy-url", url));
        }
        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            nodes.push(node);
        }

        doc.autoformat();
        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &DocketConfig) {
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.spreadsheet.is_some() {
            self.spreadsheet = other.spreadsheet.clone();
        }
        if other.drive_root.is_some() {
            self.drive_root = other.drive_root.clone();
        }
        if other.credentials_file.is_some() {
            self.credentials_file = other.credentials_file.clone();
        }
        if other.proxy_url.is_some() {
            self.proxy_url = other.proxy_url.clone();
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Set one key from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidInput(format!("empty value for '{}'", key)));
        }
        match key {
            "backend" => self.backend = Some(value.parse()?),
            "spreadsheet" => self.spreadsheet = Some(value.to_string()),
            "drive-root" => self.drive_root = Some(value.to_string()),
            "credentials-file" => self.credentials_file = Some(value.to_string()),
            "proxy-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(Error::InvalidInput(format!(
                        "proxy-url must start with http:// or https://, got '{}'",
                        value
                    )));
                }
                self.proxy_url = Some(value.to_string());
            }
            "action-log" => {
                self.action_log = Some(parse_bool(value).ok_or_else(|| {
                    Error::InvalidInput(format!("action-log must be true or false, got '{}'", value))
                })?)
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Clear one key. Returns true if it was set.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        let was_set = match key {
            "backend" => self.backend.take().is_some(),
            "spreadsheet" => self.spreadsheet.take().is_some(),
            "drive-root" => self.drive_root.take().is_some(),
            "credentials-file" => self.credentials_file.take().is_some(),
            "proxy-url" => self.proxy_url.take().is_some(),
            "action-log" => self.action_log.take().is_some(),
            _ => return Err(unknown_key(key)),
        };
        Ok(was_set)
    }

    /// Read a config file; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;
        Ok(Self::from_kdl(&doc))
    }

    /// Write the config file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

fn unknown_key(key: &str) -> Error {
    Error::InvalidInput(format!(
        "unknown config key '{}' (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

//! Proxy backend: a small JSON protocol over HTTP.
//!
//! Meant for a script web app sitting in front of the spreadsheet:
//!
//! ```text
//! GET  <url>?action=load&sheet=S                      -> {"rows": [{...}]}
//! POST {"action": "append"|"replace", "sheet", "header", "rows"}
//! POST {"action": "upload", "filename", "folder", "content_base64"}
//!                                                     -> {"link": "..."}
//! ```
//!
//! Any response may carry `{"error": "..."}`, which is treated as a failure.

use super::backend::{BackendType, PersistenceBackend};
use crate::models::Row;
use crate::{Error, Result};
use base64::Engine;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("docket/", env!("CARGO_PKG_VERSION"));

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct LoadResponse {
    #[serde(default)]
    rows: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Talks to a proxy endpoint with an optional bearer token.
pub struct ProxyBackend {
    url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl ProxyBackend {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
        }
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn post(&self, body: Value) -> Result<WriteResponse> {
        let request = self.authorize(self.agent.post(&self.url));
        let response = request.send_json(body).map_err(http_error)?;
        let parsed: WriteResponse = response.into_json().map_err(|e| Error::Backend {
            backend: "proxy",
            message: format!("invalid response: {}", e),
        })?;
        match parsed.error {
            Some(error) => Err(Error::Backend {
                backend: "proxy",
                message: error,
            }),
            None => Ok(parsed),
        }
    }

    fn write(&self, action: &str, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        debug!(action, sheet, rows = rows.len(), "proxy write");
        self.post(json!({
            "action": action,
            "sheet": sheet,
            "header": header,
            "rows": rows,
        }))
        .map(|_| ())
    }
}

fn http_error(e: ureq::Error) -> Error {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            Error::Backend {
                backend: "proxy",
                message: format!("HTTP {}: {}", code, body.trim()),
            }
        }
        other => Error::Http(other.to_string()),
    }
}

/// Render a JSON cell the way a spreadsheet would show it.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn rows_from_load(response: LoadResponse) -> Result<Vec<Row>> {
    if let Some(error) = response.error {
        return Err(Error::Backend {
            backend: "proxy",
            message: error,
        });
    }
    Ok(response
        .rows
        .into_iter()
        .map(|object| object.iter().map(|(k, v)| (k.clone(), cell_text(v))).collect())
        .collect())
}

impl PersistenceBackend for ProxyBackend {
    fn append_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        self.write("append", sheet, header, rows)
    }

    fn replace_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        self.write("replace", sheet, header, rows)
    }

    fn load_rows(&mut self, sheet: &str) -> Result<Vec<Row>> {
        let request = self
            .authorize(self.agent.get(&self.url))
            .query("action", "load")
            .query("sheet", sheet);
        let response = request.call().map_err(http_error)?;
        let parsed: LoadResponse = response.into_json().map_err(|e| Error::Backend {
            backend: "proxy",
            message: format!("invalid response: {}", e),
        })?;
        rows_from_load(parsed)
    }

    fn upload_file(&mut self, bytes: &[u8], filename: &str, owner: &str) -> Result<String> {
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);
        let response = self.post(json!({
            "action": "upload",
            "filename": filename,
            "folder": owner,
            "content_base64": content,
        }))?;
        response.link.ok_or_else(|| Error::Backend {
            backend: "proxy",
            message: "upload response had no link".to_string(),
        })
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Proxy
    }
}

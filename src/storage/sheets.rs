//! Google Sheets + Drive backend.
//!
//! Authenticates as a service account: a short-lived RS256 JWT is exchanged
//! for an OAuth access token, which is cached until shortly before expiry.
//! The spreadsheet is found by name through Drive (created when missing) and
//! each record type lives in a worksheet named after its sheet. Uploaded
//! files go to `<drive-root>/<owner>/`.

use super::backend::{BackendType, PersistenceBackend, rows_to_maps};
use crate::models::Row;
use crate::{Error, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
/// Cells are stored as sent, so text like "0001" loads back unchanged.
const VALUE_INPUT: &str = "RAW";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Tokens live one hour; refresh this long before they run out.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TIMEOUT: Duration = Duration::from_secs(30);

/// Fields of a service-account key file that matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse inline key JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("invalid service account credentials: {}", e)))
    }

    /// Read a key file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read credentials file {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Build the signed assertion sent to the token endpoint.
fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        Error::Config(format!("invalid service account private key: {}", e))
    })?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).map_err(|e| {
        Error::Backend {
            backend: "sheets",
            message: format!("failed to sign token request: {}", e),
        }
    })
}

/// Quote a value for a Drive search query.
fn drive_query_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Values endpoint for `range` of spreadsheet `id`.
fn values_url(id: &str, range: &str) -> String {
    format!(
        "{}/{}/values/{}",
        SHEETS_API,
        urlencoding::encode(id),
        urlencoding::encode(range)
    )
}

/// A1 range covering a whole worksheet.
fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Turn a `values` response into field maps, first row as header.
fn values_to_rows(values: Vec<Vec<Value>>) -> Vec<Row> {
    let mut grid = values.into_iter().map(|row| {
        row.into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>()
    });
    let Some(header) = grid.next() else {
        return Vec::new();
    };
    let rows: Vec<Vec<String>> = grid.collect();
    rows_to_maps(&header, &rows)
}

fn status_error(e: ureq::Error) -> Error {
    match e {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            Error::Backend {
                backend: "sheets",
                message: format!("HTTP {}: {}", code, message.trim()),
            }
        }
        other => Error::Http(other.to_string()),
    }
}

fn json_body(response: ureq::Response) -> Result<Value> {
    response.into_json().map_err(|e| Error::Backend {
        backend: "sheets",
        message: format!("invalid response: {}", e),
    })
}

/// Mirrors records into a Google spreadsheet.
pub struct SheetsBackend {
    key: ServiceAccountKey,
    spreadsheet_name: String,
    drive_root: String,
    agent: ureq::Agent,
    token: Option<CachedToken>,
    spreadsheet_id: Option<String>,
    known_sheets: HashSet<String>,
}

impl SheetsBackend {
    pub fn new(key: ServiceAccountKey, spreadsheet_name: &str, drive_root: &str) -> Self {
        Self {
            key,
            spreadsheet_name: spreadsheet_name.to_string(),
            drive_root: drive_root.to_string(),
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
            token: None,
            spreadsheet_id: None,
            known_sheets: HashSet::new(),
        }
    }

    fn access_token(&mut self) -> Result<String> {
        if let Some(token) = &self.token {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Other(e.to_string()))?
            .as_secs();
        let assertion = sign_assertion(&self.key, now)?;
        let response = self
            .agent
            .post(&self.key.token_uri)
            .send_form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &assertion),
            ])
            .map_err(status_error)?;
        let token: TokenResponse = response.into_json().map_err(|e| Error::Backend {
            backend: "sheets",
            message: format!("invalid token response: {}", e),
        })?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS));
        debug!(expires_in = lifetime.as_secs(), "obtained access token");
        self.token = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_MARGIN),
        });
        Ok(token.access_token)
    }

    fn get(&mut self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let token = self.access_token()?;
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", token));
        for (name, value) in query {
            request = request.query(name, value);
        }
        json_body(request.call().map_err(status_error)?)
    }

    fn send(&mut self, method: &str, url: &str, query: &[(&str, &str)], body: Value) -> Result<Value> {
        let token = self.access_token()?;
        let mut request = self
            .agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", token));
        for (name, value) in query {
            request = request.query(name, value);
        }
        json_body(request.send_json(body).map_err(status_error)?)
    }

    /// Find a Drive file by name and MIME type, optionally inside a parent.
    fn find_file(&mut self, name: &str, mime: &str, parent: Option<&str>) -> Result<Option<String>> {
        let mut q = format!(
            "name={} and mimeType={} and trashed=false",
            drive_query_literal(name),
            drive_query_literal(mime)
        );
        if let Some(parent) = parent {
            q.push_str(&format!(" and {} in parents", drive_query_literal(parent)));
        }
        let found = self.get(DRIVE_API, &[("q", &q), ("fields", "files(id,name)")])?;
        Ok(found["files"]
            .as_array()
            .and_then(|files| files.first())
            .and_then(|f| f["id"].as_str())
            .map(str::to_string))
    }

    fn spreadsheet_id(&mut self) -> Result<String> {
        if let Some(id) = &self.spreadsheet_id {
            return Ok(id.clone());
        }
        let name = self.spreadsheet_name.clone();
        let id = match self.find_file(&name, SPREADSHEET_MIME, None)? {
            Some(id) => id,
            None => {
                info!(spreadsheet = %name, "creating spreadsheet");
                let created = self.send("POST", SHEETS_API, &[], json!({"properties": {"title": name}}))?;
                created["spreadsheetId"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Backend {
                        backend: "sheets",
                        message: "spreadsheet creation returned no id".to_string(),
                    })?
            }
        };
        self.spreadsheet_id = Some(id.clone());
        Ok(id)
    }

    /// Make sure a worksheet exists, returning the spreadsheet id.
    fn ensure_sheet(&mut self, sheet: &str) -> Result<String> {
        let id = self.spreadsheet_id()?;
        if self.known_sheets.contains(sheet) {
            return Ok(id);
        }
        let url = format!("{}/{}", SHEETS_API, urlencoding::encode(&id));
        let meta = self.get(&url, &[("fields", "sheets.properties.title")])?;
        let titles: HashSet<String> = meta["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if !titles.contains(sheet) {
            info!(sheet, "creating worksheet");
            self.send(
                "POST",
                &format!("{}:batchUpdate", url),
                &[],
                json!({"requests": [{"addSheet": {"properties": {"title": sheet}}}]}),
            )?;
        }
        self.known_sheets.extend(titles);
        self.known_sheets.insert(sheet.to_string());
        Ok(id)
    }

    fn read_values(&mut self, sheet: &str) -> Result<Vec<Vec<Value>>> {
        let id = self.ensure_sheet(sheet)?;
        let url = values_url(&id, &sheet_range(sheet));
        let body = self.get(&url, &[])?;
        Ok(body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| row.as_array().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn folder(&mut self, name: &str, parent: Option<&str>) -> Result<String> {
        if let Some(id) = self.find_file(name, FOLDER_MIME, parent)? {
            return Ok(id);
        }
        let mut metadata = json!({"name": name, "mimeType": FOLDER_MIME});
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }
        let created = self.send("POST", DRIVE_API, &[("fields", "id")], metadata)?;
        created["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Backend {
                backend: "sheets",
                message: format!("folder creation for '{}' returned no id", name),
            })
    }
}

/// Body of a Drive multipart upload: JSON metadata followed by the bytes.
fn multipart_body(boundary: &str, metadata: &Value, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = boundary,
            m = metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

impl PersistenceBackend for SheetsBackend {
    fn append_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        let id = self.ensure_sheet(sheet)?;
        let first_row = values_url(&id, &format!("{}!1:1", sheet_range(sheet)));
        let existing = self.get(&first_row, &[])?;
        let mut values: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        if existing["values"].as_array().is_none_or(|v| v.is_empty()) {
            values.push(header.iter().map(|h| h.to_string()).collect());
        }
        values.extend(rows.iter().cloned());

        let url = format!("{}:append", values_url(&id, &sheet_range(sheet)));
        debug!(sheet, rows = rows.len(), "appending rows");
        self.send(
            "POST",
            &url,
            &[("valueInputOption", VALUE_INPUT), ("insertDataOption", "INSERT_ROWS")],
            json!({ "values": values }),
        )?;
        Ok(())
    }

    fn replace_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        let id = self.ensure_sheet(sheet)?;
        let range = sheet_range(sheet);
        let clear_url = format!("{}:clear", values_url(&id, &range));
        self.send("POST", &clear_url, &[], json!({}))?;

        let mut values: Vec<Vec<String>> = vec![header.iter().map(|h| h.to_string()).collect()];
        values.extend(rows.iter().cloned());
        let url = values_url(&id, &format!("{}!A1", range));
        debug!(sheet, rows = rows.len(), "rewriting sheet");
        self.send(
            "PUT",
            &url,
            &[("valueInputOption", VALUE_INPUT)],
            json!({ "values": values }),
        )?;
        Ok(())
    }

    fn load_rows(&mut self, sheet: &str) -> Result<Vec<Row>> {
        Ok(values_to_rows(self.read_values(sheet)?))
    }

    fn upload_file(&mut self, bytes: &[u8], filename: &str, owner: &str) -> Result<String> {
        let root_name = self.drive_root.clone();
        let root = self.folder(&root_name, None)?;
        let owner_folder = self.folder(owner, Some(&root))?;

        let boundary = format!("docket-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({"name": filename, "parents": [owner_folder]});
        let body = multipart_body(&boundary, &metadata, bytes);

        let token = self.access_token()?;
        let response = self
            .agent
            .post(DRIVE_UPLOAD_API)
            .query("uploadType", "multipart")
            .query("fields", "id,webViewLink")
            .set("Authorization", &format!("Bearer {}", token))
            .set("Content-Type", &format!("multipart/related; boundary={}", boundary))
            .send_bytes(&body)
            .map_err(status_error)?;
        let created = json_body(response)?;
        created["webViewLink"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Backend {
                backend: "sheets",
                message: "upload returned no link".to_string(),
            })
    }

    fn location(&self) -> String {
        format!("Google Sheets: {}", self.spreadsheet_name)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Sheets
    }
}

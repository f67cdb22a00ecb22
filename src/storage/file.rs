//! File backend: one JSONL file per sheet in the data directory.
//!
//! Layout:
//! ```text
//! <data-dir>/sheets/Clientes.jsonl   one JSON object per row
//! <data-dir>/files/<owner>/<name>    uploaded documents
//! ```
//!
//! Uploads never replace an earlier file: a name already taken gets a
//! numeric suffix (`procuracao-2.pdf`).

use super::backend::{BackendType, PersistenceBackend};
use crate::models::Row;
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Stores sheets as JSONL files under a root directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.to_path_buf(),
        }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.root
            .join("sheets")
            .join(format!("{}.jsonl", sanitize_component(sheet)))
    }

    fn files_dir(&self, owner: &str) -> PathBuf {
        self.root.join("files").join(sanitize_component(owner))
    }

    fn write_lines(&self, sheet: &str, header: &[&str], rows: &[Vec<String>], append: bool) -> Result<()> {
        let path = self.sheet_path(sheet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = if append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            File::create(&path)?
        };
        for cells in rows {
            let row: Row = header
                .iter()
                .map(|h| h.to_string())
                .zip(cells.iter().cloned())
                .collect();
            writeln!(file, "{}", serde_json::to_string(&row)?)?;
        }
        Ok(())
    }
}

/// Make a name safe to use as a single path component.
/// `name` for the first attempt, then `stem-N.ext`.
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt <= 1 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, attempt, ext),
        _ => format!("{}-{}", name, attempt),
    }
}

fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

impl PersistenceBackend for FileBackend {
    fn append_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        self.write_lines(sheet, header, rows, true)
    }

    fn replace_rows(&mut self, sheet: &str, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
        self.write_lines(sheet, header, rows, false)
    }

    fn load_rows(&mut self, sheet: &str) -> Result<Vec<Row>> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut rows = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: Row = serde_json::from_str(&line).map_err(|e| Error::Backend {
                backend: "file",
                message: format!("{}:{}: {}", path.display(), number + 1, e),
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn upload_file(&mut self, bytes: &[u8], filename: &str, owner: &str) -> Result<String> {
        let dir = self.files_dir(owner);
        fs::create_dir_all(&dir)?;
        let name = sanitize_component(filename);
        let mut attempt = 1;
        let (path, mut file) = loop {
            let path = dir.join(numbered_name(&name, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(bytes)?;
        let absolute = path.canonicalize().unwrap_or(path);
        Ok(format!("file://{}", absolute.display()))
    }

    fn location(&self) -> String {
        self.root.join("sheets").display().to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}

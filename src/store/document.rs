//! Document file I/O
//!
//! A document is read and written whole. Writes go to a sibling temp file
//! which is renamed over the document, so a crash mid-write leaves either
//! the old or the new content, never a truncated file.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::schema::Row;

/// Full file content: storage key → row
pub type Document = BTreeMap<String, Row>;

/// Suffix of the temp file used for atomic replacement
const TEMP_SUFFIX: &str = ".tmp";

/// Handle on one document file
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
    sync_on_write: bool,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>, sync_on_write: bool) -> Self {
        Self {
            path: path.into(),
            sync_on_write,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create parent directories and an empty document if the file is missing
    ///
    /// Returns true if the file was created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        self.save(&Document::new())?;
        Ok(true)
    }

    /// Raw file bytes
    pub fn read_raw(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Read and parse the whole document
    pub fn load(&self) -> Result<Document> {
        let bytes = self.read_raw()?;
        parse_document(&self.path, &bytes)
    }

    /// Replace the whole document (write temp, fsync, rename)
    pub fn save(&self, document: &Document) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let temp_path = self.temp_path();

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&bytes)?;
            if self.sync_on_write {
                file.sync_all()?;
            }
        }

        fs::rename(&temp_path, &self.path)?;

        if self.sync_on_write {
            sync_parent_dir(&self.path);
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, TEMP_SUFFIX)
    }
}

/// Parse document bytes
///
/// A zero-length or whitespace-only file is an empty document.
pub fn parse_document(path: &Path, bytes: &[u8]) -> Result<Document> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }

    serde_json::from_slice(bytes).map_err(|e| StoreError::ParseFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// `path` with `suffix` appended to its file name
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Best effort: make the rename itself durable
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

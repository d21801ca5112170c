//! Corruption Recovery
//!
//! Runs once when a store is opened. A document that fails to parse is
//! either dumped and reset, or reported as fatal.
//!
//! ## Dump File
//! ```text
//! <document path>.dump        (append-only, never truncated)
//!
//!
//! --- DUMP: <unix seconds> ---
//! <raw corrupted bytes>
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::store::document::{parse_document, with_suffix};
use crate::store::{Document, DocumentFile};
use crate::timestamp;

/// Suffix appended to the document path for dumps
pub const DUMP_SUFFIX: &str = ".dump";

/// Outcome of opening a document
#[derive(Debug)]
pub struct RecoveryResult {
    /// The parsed (or reset) document
    pub document: Document,

    /// Whether the file was corrupted and reset
    pub was_reset: bool,

    /// Number of corrupted bytes written to the dump file
    pub bytes_dumped: usize,

    /// Where the corrupted bytes went, if anywhere
    pub dump_path: Option<PathBuf>,
}

/// Opens documents, healing corrupted ones when allowed
pub struct DocumentRecovery;

impl DocumentRecovery {
    /// Load a document, recovering from corruption
    ///
    /// This will:
    /// 1. Parse the file
    /// 2. On failure without `dump_on_corruption`, return `ParseFailure`
    /// 3. Otherwise append the raw bytes to the dump file
    /// 4. Reset the document to `{}`
    pub fn recover(file: &DocumentFile, dump_on_corruption: bool) -> Result<RecoveryResult> {
        let raw = file.read_raw()?;

        let error = match parse_document(file.path(), &raw) {
            Ok(document) => {
                return Ok(RecoveryResult {
                    document,
                    was_reset: false,
                    bytes_dumped: 0,
                    dump_path: None,
                })
            }
            Err(e) => e,
        };

        if !dump_on_corruption {
            tracing::error!(path = %file.path().display(), "Document is corrupted: {}", error);
            return Err(error);
        }

        let dump_path = Self::dump_path(file.path());
        Self::append_dump(&dump_path, &raw)?;

        let document = Document::new();
        file.save(&document)?;

        tracing::error!(
            path = %file.path().display(),
            dump = %dump_path.display(),
            bytes = raw.len(),
            "Document was corrupted ({}), dumped and reset",
            error
        );

        Ok(RecoveryResult {
            document,
            was_reset: true,
            bytes_dumped: raw.len(),
            dump_path: Some(dump_path),
        })
    }

    /// Check a document without modifying anything
    pub fn verify(path: &Path) -> Result<usize> {
        let raw = std::fs::read(path)?;
        parse_document(path, &raw).map(|document| document.len())
    }

    /// `<path>.dump`
    pub fn dump_path(path: &Path) -> PathBuf {
        with_suffix(path, DUMP_SUFFIX)
    }

    fn append_dump(dump_path: &Path, raw: &[u8]) -> Result<()> {
        let mut dump = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dump_path)
            .map_err(|e| {
                StoreError::Io(std::io::Error::new(
                    e.kind(),
                    format!("cannot open dump file {}: {}", dump_path.display(), e),
                ))
            })?;

        let header = format!("\n\n--- DUMP: {} ---\n", timestamp::now());
        dump.write_all(header.as_bytes())?;
        dump.write_all(raw)?;
        dump.sync_all()?;
        Ok(())
    }
}

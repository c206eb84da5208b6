//! Line-oriented block-list sources.
//!
//! A source yields one entry per line: a hostname for the host list, a
//! normalized `scheme://host[:port]/path` URL for the URL list. There is no
//! comment syntax; surrounding whitespace is trimmed and blank lines are
//! skipped by the loader.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a block list
#[derive(Debug, Error)]
pub enum BlockListError {
    #[error("Block list source unavailable: {name}: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Something a load pipeline can read entries from.
pub trait ListSource: Send + 'static {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Open the source for reading.
    fn open(&self) -> Result<Box<dyn BufRead + Send>, BlockListError>;
}

/// A list stored in a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: &str, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, BlockListError> {
        let file = File::open(&self.path).map_err(|e| BlockListError::SourceUnavailable {
            name: self.name.clone(),
            reason: format!("{}: {}", self.path.display(), e),
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A list held in memory, e.g. an asset compiled into the host binary.
#[derive(Debug, Clone)]
pub struct InlineSource {
    name: String,
    text: String,
}

impl InlineSource {
    pub fn new(name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            text: text.into(),
        }
    }
}

impl ListSource for InlineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, BlockListError> {
        Ok(Box::new(Cursor::new(self.text.clone().into_bytes())))
    }
}

//! Durable checkpoint store for harvest progress.
//!
//! A single small file holds one `token/cursor/completeListSize/expiration`
//! line. It is rewritten after every committed record: truncate, write,
//! flush, fsync as one logical step. An empty file means "no checkpoint";
//! both a fresh harvest and a completed one look this way.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::HarvestError;
use crate::token::ResumptionToken;

pub struct CheckpointStore {
    path: PathBuf,
    file: File,
}

impl std::fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CheckpointStore {
    /// Open (or create) the checkpoint file, keeping the handle for the
    /// whole harvest session.
    pub fn open(path: &Path) -> Result<Self, HarvestError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Read the stored continuation state.
    ///
    /// `Ok(None)` for an empty file (missing file behaves the same, since
    /// open creates it empty). A non-empty file must hold exactly one valid
    /// line; anything else is [`HarvestError::CorruptCheckpoint`], so a
    /// damaged checkpoint never silently restarts the harvest from zero.
    pub fn load(&mut self) -> Result<Option<ResumptionToken>, HarvestError> {
        let mut content = String::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut content)?;
        let line = content.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }
        ResumptionToken::from_line(line).map(Some)
    }

    /// Persist the continuation state, forced to stable storage before
    /// returning. `None` truncates the file (listing exhausted).
    pub fn save(&mut self, token: Option<&ResumptionToken>) -> Result<(), HarvestError> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        if let Some(token) = token {
            self.file.write_all(token.to_line().as_bytes())?;
        }
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Mark the harvest complete by truncating to empty.
    pub fn clear(&mut self) -> Result<(), HarvestError> {
        self.save(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

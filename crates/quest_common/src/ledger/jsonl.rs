//! Append-only JSONL ledger.
//!
//! One JSON object per line. Nothing is ever rewritten or rotated; counts
//! are recomputed from the file on every read.

use super::{EventLedger, EventRecord};
use crate::aggregate::{TallyTransition, UserTally};
use crate::error::LedgerError;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// JSONL file ledger
pub struct JsonlLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in the file
    pub fn read_all(&self) -> Result<Vec<EventRecord>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // A torn final line from a crash mid-write is the usual cause
                    warn!(
                        "Skipping malformed ledger line {} in {}: {}",
                        line_no + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        Ok(records)
    }
}

/// Whether the file is non-empty and its last byte is not a newline
fn ends_mid_line(file: &mut File) -> Result<bool, LedgerError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl EventLedger for JsonlLedger {
    fn append(&self, record: &EventRecord) -> Result<TallyTransition, LedgerError> {
        let _guard = self.write_lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let existing = self.events(&record.user_id)?;
        let new_day = !existing
            .iter()
            .any(|r| r.event_type == record.event_type && r.day() == record.day());
        let mut after = UserTally::from_events(&existing);
        after.add(&record.event_type, new_day);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let mut line = String::new();
        if ends_mid_line(&mut file)? {
            // Terminate the torn tail first
            warn!("Ledger {} ends mid-line; starting a new line", self.path.display());
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(record)?);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        debug!("Appended {} for {} to JSONL ledger", record.event_type, record.user_id);
        Ok(TallyTransition::from_after(after, &record.event_type, new_day))
    }

    fn events(&self, user_id: &str) -> Result<Vec<EventRecord>, LedgerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    fn users(&self) -> Result<Vec<String>, LedgerError> {
        let users: BTreeSet<String> = self.read_all()?.into_iter().map(|r| r.user_id).collect();
        Ok(users.into_iter().collect())
    }

    fn backend(&self) -> &'static str {
        "jsonl"
    }
}

//! The read phase: stream records out of the downloaded files, one file at a
//! time, advancing transparently across file boundaries.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// One record pulled out of a downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub data: Vec<u8>,
    /// Local file the record came from.
    pub origin: PathBuf,
}

/// Named auxiliary filter list, forwarded opaquely to record readers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList {
    pub name: String,
    pub entries: Vec<String>,
}

/// Read window and filters shared by every reader opened during one batch.
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub filter_lists: Vec<FilterList>,
}

/// Per-file record parser. Opaque to the delegation layer: it only ever
/// asks for the next record.
pub trait RecordReader {
    /// The next record, or `Ok(None)` once this file is exhausted. An error
    /// is recoverable: the caller abandons this file and moves on.
    fn next_record(&mut self) -> Result<Option<RawRecord>>;
}

/// Opens a [`RecordReader`] over one downloaded file. Swapping the factory
/// swaps the record format without touching the delegation logic.
pub trait RecordReaderFactory {
    fn open(&self, path: &Path, context: &ReadContext) -> Result<Box<dyn RecordReader>>;
}

struct OpenFile {
    path: PathBuf,
    reader: Box<dyn RecordReader>,
}

/// Presents an ordered list of downloaded files as one continuous record
/// stream.
///
/// At most one inner reader is open at a time; the previous one is dropped
/// before the next file is opened. Files that fail to open or fail
/// mid-read are logged and skipped, never ending the stream while files
/// remain. The cursor only moves forward: a consumed file is never
/// revisited.
pub struct DelegatingReader {
    handles: Vec<PathBuf>,
    cursor: usize,
    current: Option<OpenFile>,
    factory: Box<dyn RecordReaderFactory>,
    context: ReadContext,
}

impl DelegatingReader {
    pub fn new(
        handles: Vec<PathBuf>,
        factory: Box<dyn RecordReaderFactory>,
        context: ReadContext,
    ) -> Self {
        Self {
            handles,
            cursor: 0,
            current: None,
            factory,
            context,
        }
    }

    /// The next record across all files, or `None` once every file has been
    /// consumed. Never fails: per-file problems are absorbed and logged.
    pub fn next_record(&mut self) -> Option<RawRecord> {
        // Advance-and-retry as a loop bounded by the handle count, not
        // recursion: a long run of bad files must not grow the stack.
        loop {
            if self.current.is_none() && !self.open_next() {
                return None;
            }
            let open = self.current.as_mut()?;
            match open.reader.next_record() {
                Ok(Some(record)) => return Some(record),
                Ok(None) => {
                    info!(file = %open.path.display(), "end of file");
                    self.current = None;
                }
                Err(err) => {
                    warn!(
                        file = %open.path.display(),
                        error = %err,
                        "error processing file, skipping the rest of it"
                    );
                    self.current = None;
                }
            }
        }
    }

    // Opens the next openable file, skipping any that refuse. False once the
    // handles run out.
    fn open_next(&mut self) -> bool {
        while self.cursor < self.handles.len() {
            let path = self.handles[self.cursor].clone();
            self.cursor += 1;
            match self.factory.open(&path, &self.context) {
                Ok(reader) => {
                    debug!(file = %path.display(), "opened downloaded file");
                    self.current = Some(OpenFile { path, reader });
                    return true;
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "cannot open downloaded file, skipping");
                }
            }
        }
        false
    }

    /// Drops the open reader and forgets the remaining handles. Idempotent.
    pub fn close(&mut self) {
        self.current = None;
        self.handles.clear();
        self.cursor = 0;
    }
}

/// Default per-file reader: every non-empty line is one record.
pub struct LineRecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl LineRecordReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("cannot open '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
        })
    }
}

impl RecordReader for LineRecordReader {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(RawRecord {
                data: line.into_bytes(),
                origin: self.path.clone(),
            }));
        }
        Ok(None)
    }
}

/// Factory for the line-oriented default format. Line records carry no
/// timestamps, so the read window and filter lists are not consulted.
pub struct LineReaderFactory;

impl RecordReaderFactory for LineReaderFactory {
    fn open(&self, path: &Path, _context: &ReadContext) -> Result<Box<dyn RecordReader>> {
        Ok(Box::new(LineRecordReader::open(path)?))
    }
}

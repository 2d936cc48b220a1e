use std::path::PathBuf;

use tracing::debug;

use crate::config::FtpConfig;
use crate::download;
use crate::error::SourceError;
use crate::reader::{DelegatingReader, RawRecord, ReadContext, RecordReaderFactory};

/// FTP-backed record source: downloads the configured batch up front, then
/// streams records from the downloaded files in download order.
pub struct FtpSource {
    reader: Option<DelegatingReader>,
}

impl FtpSource {
    /// Runs the fetch phase and primes the record stream.
    ///
    /// Fatal outcomes: missing connection properties, session
    /// establishment/loss, staging failure, or zero successful downloads.
    /// After a successful `init` the stream can no longer fail, only end.
    pub fn init(
        config: &FtpConfig,
        context: ReadContext,
        factory: Box<dyn RecordReaderFactory>,
    ) -> Result<Self, SourceError> {
        let outcome = download::fetch_batch(config)?;
        Self::from_handles(outcome.handles, context, factory)
    }

    /// Wraps already-downloaded files. An empty handle list is the
    /// nothing-retrieved condition and fails just like it does after a
    /// live fetch.
    pub fn from_handles(
        handles: Vec<PathBuf>,
        context: ReadContext,
        factory: Box<dyn RecordReaderFactory>,
    ) -> Result<Self, SourceError> {
        if handles.is_empty() {
            return Err(SourceError::NothingRetrieved);
        }
        debug!(files = handles.len(), "priming record stream");
        Ok(Self {
            reader: Some(DelegatingReader::new(handles, factory, context)),
        })
    }

    /// The next record, or `None` once every downloaded file has been
    /// consumed or the source was closed.
    pub fn next_record(&mut self) -> Option<RawRecord> {
        self.reader.as_mut()?.next_record()
    }

    /// Releases the active reader and the handle list. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
    }
}

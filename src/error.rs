//! Fatal error taxonomy for the download-and-read pipeline.
//!
//! Only conditions that stop the whole pipeline appear here. Per-file
//! problems (a rejected download, an unreadable file) are absorbed where
//! they occur and surface as log events, never as error values.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::client::TransferError;

#[derive(Debug, Error)]
pub enum SourceError {
    /// A required connection property is blank. Raised before any network
    /// activity.
    #[error("missing required '{0}' property")]
    MissingProperty(&'static str),

    /// The FTP session could not be established, or broke mid-batch.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The local staging directory could not be created.
    #[error("cannot create staging directory '{}': {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The fetch phase completed without a single successful download.
    #[error("failed to download any files")]
    NothingRetrieved,
}

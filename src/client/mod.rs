pub mod ftp;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Outcome of one protocol operation, split by what it breaks.
///
/// `ConnectionLost` means the session itself is unusable and the rest of the
/// batch must be abandoned. `Rejected` means the server refused this one
/// file; the batch continues without it. The distinction is deliberate and
/// the download loop relies on it.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The control or data connection failed.
    #[error("connection to {host}:{port} lost: {source}")]
    ConnectionLost {
        host: String,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server refused this particular file (typically a 550).
    #[error("server rejected '{path}': {reason}")]
    Rejected { path: String, reason: String },

    /// The local staging file could not be written.
    #[error("cannot write staging file '{}': {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// True when the error invalidates the whole session, not just one file.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// Blocking file-transfer session, already connected and authenticated.
///
/// One exclusively-owned session per batch; implementations are not expected
/// to survive a `ConnectionLost` error.
pub trait FileTransfer {
    /// Downloads `remote_path` into `local_path`, overwriting it.
    fn retrieve(&mut self, remote_path: &str, local_path: &Path) -> Result<(), TransferError>;

    /// Deletes `remote_path` on the server.
    fn delete(&mut self, remote_path: &str) -> Result<(), TransferError>;

    /// Logs out and drops the connection.
    fn disconnect(&mut self) -> Result<(), TransferError>;
}

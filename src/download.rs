//! The fetch phase: download the configured batch of remote files into the
//! local staging directory, in list order, tolerating per-file rejections.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::client::ftp::FtpTransfer;
use crate::client::{FileTransfer, TransferError};
use crate::config::FtpConfig;
use crate::error::SourceError;

/// Joins the remote base directory and a file name with exactly one
/// separator. A blank base means the server root.
pub fn remote_path(remote_dir: &str, name: &str) -> String {
    let base = remote_dir.trim_end_matches('/');
    if !base.is_empty() {
        format!("{base}/{name}")
    } else if remote_dir.starts_with('/') {
        format!("/{name}")
    } else {
        name.to_string()
    }
}

/// What the fetch phase produced: staged files in download order, plus the
/// names the server rejected. Rejections are already logged; the tally is
/// kept for callers that want to surface it.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub handles: Vec<PathBuf>,
    /// (remote path, reason) per rejected file, in encounter order.
    pub skipped: Vec<(String, String)>,
}

/// Runs the whole fetch phase: validate, connect, download everything, and
/// tear the session down (best effort) whatever the per-file outcomes were.
///
/// Only connection establishment, a mid-batch session loss, or a staging
/// failure abort the batch. The returned handle list may be empty; the
/// caller decides whether that is fatal.
pub fn fetch_batch(config: &FtpConfig) -> Result<BatchOutcome, SourceError> {
    config.validate()?;
    let mut transfer = FtpTransfer::connect(config)?;
    let result = download_all(config, &mut transfer);
    if let Err(err) = transfer.disconnect() {
        warn!(error = %err, "FTP logout failed");
    }
    result
}

/// The per-file transfer loop over an established session.
///
/// File names are processed in list order; duplicates are downloaded again
/// independently. A rejected file is logged and skipped. A lost connection
/// aborts the remaining names: the session is broken, not the file.
pub fn download_all(
    config: &FtpConfig,
    transfer: &mut dyn FileTransfer,
) -> Result<BatchOutcome, SourceError> {
    let names = config.file_list();
    debug!(count = names.len(), "file names in the download list");

    fs::create_dir_all(&config.local_dir).map_err(|err| SourceError::Staging {
        path: config.local_dir.clone(),
        source: err,
    })?;

    let mut outcome = BatchOutcome::default();
    for name in names {
        let remote = remote_path(&config.remote_dir, name);
        let local = config.local_dir.join(name);
        debug!(remote = %remote, local = %local.display(), "downloading remote file");

        match transfer.retrieve(&remote, &local) {
            Ok(()) => {
                outcome.handles.push(local);
                if config.delete_from_server {
                    if let Err(err) = transfer.delete(&remote) {
                        warn!(remote = %remote, error = %err, "cannot delete file on server");
                    }
                }
            }
            Err(TransferError::Rejected { path, reason }) => {
                warn!(remote = %path, reason = %reason, "download failed, skipping");
                outcome.skipped.push((path, reason));
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(
        downloaded = outcome.handles.len(),
        skipped = outcome.skipped.len(),
        "download batch complete"
    );
    Ok(outcome)
}

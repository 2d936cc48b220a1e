use std::fs::File;
use std::io::Write;
use std::path::Path;

use suppaftp::types::{FileType, FormatControl};
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::debug;

use super::{FileTransfer, TransferError};
use crate::config::{FtpConfig, XferMode};

/// FTP-backed [`FileTransfer`] holding one control connection for the whole
/// batch.
pub struct FtpTransfer {
    stream: FtpStream,
    host: String,
    port: u16,
}

impl FtpTransfer {
    /// Connects, logs in, and selects the session and transfer modes. Any
    /// failure here is a connection failure: without a working session there
    /// is nothing to retry per-file.
    pub fn connect(config: &FtpConfig) -> Result<Self, TransferError> {
        debug!(
            host = %config.host,
            port = config.port,
            username = %config.username,
            mode = if config.active_mode { "active" } else { "passive" },
            "connecting to FTP server"
        );

        let lost = |err: FtpError| Self::lost(&config.host, config.port, err);

        let mut stream = FtpStream::connect((config.host.as_str(), config.port)).map_err(lost)?;
        stream
            .login(&config.username, &config.password)
            .map_err(lost)?;
        stream.set_mode(if config.active_mode {
            Mode::Active
        } else {
            Mode::Passive
        });
        stream
            .transfer_type(match config.xfer_mode {
                XferMode::Binary => FileType::Binary,
                XferMode::Ascii => FileType::Ascii(FormatControl::Default),
            })
            .map_err(lost)?;

        Ok(Self {
            stream,
            host: config.host.clone(),
            port: config.port,
        })
    }

    fn lost(host: &str, port: u16, err: FtpError) -> TransferError {
        TransferError::ConnectionLost {
            host: host.to_string(),
            port,
            source: Box::new(err),
        }
    }

    /// Socket-level failures kill the session; anything the server said in
    /// protocol (a 550, a refused command) only concerns this one path.
    fn classify(host: &str, port: u16, remote_path: &str, err: FtpError) -> TransferError {
        match err {
            FtpError::ConnectionError(_) => Self::lost(host, port, err),
            other => TransferError::Rejected {
                path: remote_path.to_string(),
                reason: other.to_string(),
            },
        }
    }

    fn local_io(local_path: &Path, err: std::io::Error) -> TransferError {
        TransferError::LocalIo {
            path: local_path.to_path_buf(),
            source: err,
        }
    }
}

impl FileTransfer for FtpTransfer {
    fn retrieve(&mut self, remote_path: &str, local_path: &Path) -> Result<(), TransferError> {
        let buffer = self
            .stream
            .retr_as_buffer(remote_path)
            .map_err(|err| Self::classify(&self.host, self.port, remote_path, err))?;

        let mut file = File::create(local_path).map_err(|err| Self::local_io(local_path, err))?;
        file.write_all(buffer.get_ref())
            .map_err(|err| Self::local_io(local_path, err))?;
        Ok(())
    }

    fn delete(&mut self, remote_path: &str) -> Result<(), TransferError> {
        self.stream
            .rm(remote_path)
            .map_err(|err| Self::classify(&self.host, self.port, remote_path, err))
    }

    fn disconnect(&mut self) -> Result<(), TransferError> {
        self.stream
            .quit()
            .map_err(|err| Self::lost(&self.host, self.port, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn lost_err() -> TransferError {
        FtpTransfer::lost(
            "ftp.example.com",
            21,
            FtpError::ConnectionError(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        )
    }

    #[test]
    fn test_lost_carries_endpoint() {
        let err = lost_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ftp.example.com:21"));
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn test_classify_connection_error_is_fatal() {
        let err = FtpError::ConnectionError(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        let classified = FtpTransfer::classify("ftp.example.com", 21, "data/a.txt", err);
        assert!(classified.is_fatal());
        assert!(classified.to_string().contains("ftp.example.com:21"));
    }

    #[test]
    fn test_classify_server_response_is_rejection() {
        let classified =
            FtpTransfer::classify("ftp.example.com", 21, "data/a.txt", FtpError::BadResponse);
        assert!(!classified.is_fatal());
        assert!(classified.to_string().contains("data/a.txt"));
    }
}

//! Transfer emitter - multipart upload with byte-level progress

use crate::api::{ApiClient, FileOperationResponse};
use crate::error::TransferError;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::types::{TransferKind, TransferProgress};

/// Owns the progress value of the transfers started through it.
///
/// At most one transfer is in flight per emitter. Each new transfer resets
/// the published value to 0 before its first byte leaves.
pub struct TransferEmitter {
    client: ApiClient,
    progress: Arc<watch::Sender<TransferProgress>>,
    active: Arc<AtomicBool>,
    token: CancellationToken,
}

/// Releases the single-flight slot however the transfer ends.
struct FlightSlot(Arc<AtomicBool>);

impl Drop for FlightSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TransferEmitter {
    pub fn new(client: ApiClient, token: CancellationToken) -> Self {
        let (progress, _) = watch::channel(TransferProgress::default());
        Self {
            client,
            progress: Arc::new(progress),
            active: Arc::new(AtomicBool::new(false)),
            token,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TransferProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> TransferProgress {
        *self.progress.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Back to 0 between uses. Ignored while a transfer is running or after
    /// teardown.
    pub fn reset(&self) {
        if self.is_active() || self.token.is_cancelled() {
            return;
        }
        self.progress.send_replace(TransferProgress::default());
    }

    /// Upload a file from disk to the endpoint for `kind`.
    pub async fn transfer(
        &self,
        kind: TransferKind,
        path: &Path,
    ) -> Result<FileOperationResponse, TransferError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        check_file_type(kind, &file_name)?;

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        self.transfer_reader(kind, &file_name, file, Some(size)).await
    }

    /// Upload from any reader. With `total == None` the percentage stays 0
    /// until the server answers.
    pub async fn transfer_reader<R>(
        &self,
        kind: TransferKind,
        file_name: &str,
        reader: R,
        total: Option<u64>,
    ) -> Result<FileOperationResponse, TransferError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        check_file_type(kind, file_name)?;

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("transfer_rejected: {} already in flight", kind);
            return Err(TransferError::AlreadyInFlight);
        }
        let _slot = FlightSlot(self.active.clone());

        if self.token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        self.progress.send_replace(TransferProgress::started(total));
        info!(
            "transfer_start: {} file={} total_bytes={:?}",
            kind, file_name, total
        );

        let progress = self.progress.clone();
        let token = self.token.clone();
        let mut sent: u64 = 0;
        let stream = ReaderStream::new(reader).map(move |chunk_result| {
            if token.is_cancelled() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
            }
            let chunk = chunk_result?;
            sent += chunk.len() as u64;
            progress.send_if_modified(|current| current.record(sent, total));
            Ok(chunk)
        });

        let body = Body::wrap_stream(stream);
        let part = match total {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(file_name.to_string())
        .mime_str(kind.mime_type(file_name))?;
        let form = Form::new().part("file", part);

        let response = match self.client.post_file(kind.endpoint(), form).await {
            Ok(response) => response,
            Err(err) if self.token.is_cancelled() => {
                debug!("transfer_error_after_cancel: {} error={}", kind, err);
                info!("transfer_cancelled: {} file={}", kind, file_name);
                return Err(TransferError::Cancelled);
            }
            Err(err) => {
                warn!("transfer_failed: {} file={} error={}", kind, file_name, err);
                return Err(err.into());
            }
        };

        if !response.success {
            warn!("transfer_rejected: {} message={}", kind, response.message);
            return Err(TransferError::Rejected(response.message));
        }
        let data = response.data.ok_or_else(|| {
            TransferError::Rejected("transfer response carried no data".to_string())
        })?;

        if !self.token.is_cancelled() {
            self.progress.send_if_modified(TransferProgress::complete);
        }
        debug!(
            "transfer_done: {} records={} path={}",
            kind, data.records_processed, data.path
        );
        Ok(data)
    }
}

fn check_file_type(kind: TransferKind, file_name: &str) -> Result<(), TransferError> {
    if kind.accepts(file_name) {
        Ok(())
    } else {
        Err(TransferError::UnsupportedFileType {
            kind: kind.endpoint(),
            file_name: file_name.to_string(),
        })
    }
}

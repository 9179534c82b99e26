use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::TransferError;
use crate::transport::Transport;

/// Retrieves a single remote file to the given local path.
///
/// On success, the number of copied bytes is returned.
///
/// # Note
///
/// If the copy fails midway, the bytes received so far are flushed and the
/// partially written local file is left in place.
#[tracing::instrument(name = "Fetch", skip(transport, local_path), fields(local = %local_path.as_ref().display()))]
pub async fn fetch<T: Transport>(
    transport: &T,
    remote_path: &str,
    local_path: impl AsRef<Path>,
) -> Result<u64, TransferError<T::Error>> {
    let local_path = local_path.as_ref();

    let mut remote_file = transport
        .open_file(remote_path)
        .await
        .map_err(|e| TransferError::RemoteOpen(remote_path.to_owned(), e))?;

    let mut local_file = tokio::fs::File::create(local_path)
        .await
        .map_err(|e| TransferError::LocalCreate(local_path.to_owned(), e))?;

    let copied = tokio::io::copy(&mut remote_file, &mut local_file).await;
    let flushed = local_file.flush().await;

    let n_bytes = copied.map_err(TransferError::Copy)?;
    flushed.map_err(TransferError::Copy)?;

    tracing::info!(n_bytes, "fetched");

    Ok(n_bytes)
}

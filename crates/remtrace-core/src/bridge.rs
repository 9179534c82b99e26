use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::transport::TunnelListener;

/// Bridge relaying a live trace stream from the target to a local sink.
///
/// A background task accepts **exactly one** inbound connection on the
/// listener, then copies everything it receives to the sink until the remote
/// producer closes the connection. The listener is dropped right after the
/// first accept, so later connection attempts are refused.
pub struct StreamBridge<E> {
    address: SocketAddr,
    outcome: oneshot::Receiver<Result<u64, StreamError<E>>>,
    abandon: CancellationToken,
}

impl<E> StreamBridge<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Starts relaying from the given listener to the given sink.
    ///
    /// If `accept_timeout` is set, the bridge gives up waiting for an inbound
    /// connection after that long.
    ///
    /// # Note
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<L, W>(listener: L, sink: W, accept_timeout: Option<Duration>) -> Self
    where
        L: TunnelListener<Error = E>,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let address = listener.address();
        let abandon = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(relay(listener, sink, accept_timeout, abandon.clone(), tx));

        Self {
            address,
            outcome: rx,
            abandon,
        }
    }

    /// Address the remote producer connects to.
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Stops waiting for an inbound connection.
    ///
    /// A stream that was already accepted is relayed until its end.
    pub fn abandon(&self) {
        self.abandon.cancel();
    }

    /// Waits for the bridge to finish.
    ///
    /// On success, the number of relayed bytes is returned.
    pub async fn finish(self) -> Result<u64, StreamError<E>> {
        self.outcome.await.unwrap_or(Err(StreamError::Lost))
    }
}

async fn relay<L, W>(
    mut listener: L,
    mut sink: W,
    accept_timeout: Option<Duration>,
    abandon: CancellationToken,
    outcome: oneshot::Sender<Result<u64, StreamError<L::Error>>>,
) where
    L: TunnelListener,
    W: AsyncWrite + Unpin,
{
    tracing::info!(addr = %listener.address(), "listening for remote connection");

    let res: Result<u64, StreamError<L::Error>> = async {
        let accept = async {
            match accept_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, listener.accept()).await {
                    Ok(res) => res.map_err(StreamError::Accept),
                    Err(_) => Err(StreamError::AcceptTimeout(timeout)),
                },
                None => listener.accept().await.map_err(StreamError::Accept),
            }
        };

        let mut stream = tokio::select! {
            stream = accept => stream?,
            _ = abandon.cancelled() => return Err(StreamError::Abandoned),
        };

        drop(listener);

        tracing::info!("incoming trace stream connected");

        let copied = tokio::io::copy(&mut stream, &mut sink).await;

        // whatever was relayed reaches the sink, even if the stream broke
        let flushed = sink.flush().await;

        let n_bytes = copied.map_err(StreamError::Copy)?;
        flushed.map_err(StreamError::Copy)?;

        Ok(n_bytes)
    }
    .await;

    match &res {
        Ok(n_bytes) => tracing::info!(n_bytes, "wrote trace output"),
        Err(e) => tracing::error!(error = %e, "trace stream failed"),
    }

    // the receiver is gone only if the orchestrator itself was dropped
    let _ = outcome.send(res);
}

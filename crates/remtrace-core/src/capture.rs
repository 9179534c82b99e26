use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncWrite;

use crate::bridge::StreamBridge;
use crate::command::RemoteCommand;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, ValidationError};
use crate::transport::Transport;

/// Runtime options of a trace capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Address the stream tunnel is bound to on the target.
    pub tunnel_bind: SocketAddr,

    /// Maximum time to wait for the target to connect to the stream tunnel.
    pub accept_timeout: Option<Duration>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            tunnel_bind: SocketAddr::from((Ipv6Addr::LOCALHOST, 0)),
            accept_timeout: None,
        }
    }
}

/// Outcome of a successful trace capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// The remote invocation that was executed.
    pub command: RemoteCommand,

    /// Number of bytes streamed to the local sink, if streaming.
    pub streamed_bytes: Option<u64>,
}

/// Records a trace on the target.
///
/// The configuration is validated before any remote operation. When
/// streaming is requested, the trace is relayed to `sink` while the remote
/// command runs, and both are awaited before returning.
///
/// If both the remote command and the stream fail, the remote command error
/// is returned.
#[tracing::instrument(name = "Capture", skip_all, fields(stream = config.stream))]
pub async fn capture<T, W>(
    transport: &T,
    config: &CaptureConfig,
    options: &CaptureOptions,
    sink: Option<W>,
) -> crate::Result<CaptureOutcome, T::Error>
where
    T: Transport,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut command = RemoteCommand::build(config)?;

    let bridge = match (command.is_streaming(), sink) {
        (true, Some(sink)) => {
            let listener = transport
                .open_tunnel(options.tunnel_bind)
                .await
                .map_err(CaptureError::Session)?;

            let bridge = StreamBridge::spawn(listener, sink, options.accept_timeout);
            command.set_stream_destination(bridge.address());

            Some(bridge)
        }
        (true, None) => return Err(ValidationError::MissingStreamSink.into()),
        (false, _) => None,
    };

    let command_line = command.to_string();
    tracing::debug!("running: {command_line}");

    let command_res = match transport.execute(&command_line).await {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(CaptureError::RemoteCommand(status)),
        Err(e) => Err(CaptureError::Session(e)),
    };

    let stream_res = match bridge {
        Some(bridge) => {
            if command_res.is_err() {
                bridge.abandon();
            }

            tracing::info!("waiting to finish receiving trace stream");
            Some(bridge.finish().await)
        }
        None => None,
    };

    command_res?;

    let streamed_bytes = stream_res.transpose()?;

    Ok(CaptureOutcome {
        command,
        streamed_bytes,
    })
}

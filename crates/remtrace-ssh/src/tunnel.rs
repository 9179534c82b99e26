use std::net::SocketAddr;

use remtrace_core::transport::TunnelListener;

use crate::error::{Error, Result};
use crate::pipe::{Pipe, retry};

/// Listener bound on the target, forwarding its connections to the host.
pub struct Listener {
    inner: ssh2::Listener,
    address: SocketAddr,
}

impl Listener {
    pub(crate) fn new(inner: ssh2::Listener, address: SocketAddr) -> Self {
        Self { inner, address }
    }
}

impl TunnelListener for Listener {
    type Stream = Pipe<ssh2::Channel>;
    type Error = Error;

    fn address(&self) -> SocketAddr {
        self.address
    }

    async fn accept(&mut self) -> Result<Pipe<ssh2::Channel>> {
        let channel = retry(|| self.inner.accept()).await?;
        Ok(Pipe::new(channel))
    }
}

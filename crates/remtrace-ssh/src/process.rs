use std::sync::{Arc, Mutex};

use remtrace_core::transport::{ExitStatus, RemoteProcess};
use ssh2::{Channel, Session};

use crate::error::{Error, Result};
use crate::pipe::{ChannelStdin, Pipe, lock};

/// Command running on the target, with piped standard input and error.
pub struct Process {
    channel: Arc<Mutex<Channel>>,
    stdin: Option<Pipe<ChannelStdin>>,
    stderr: Option<Pipe<ssh2::Stream>>,
}

impl Process {
    pub(crate) async fn spawn(session: &Session, command: &str) -> Result<Self> {
        let channel = Arc::new(Mutex::new(crate::exec::open(session, command).await?));
        let stderr = lock(&channel).stderr();

        tracing::debug!("spawned: {command}");

        Ok(Self {
            stdin: Some(Pipe::new(ChannelStdin::new(channel.clone()))),
            stderr: Some(Pipe::new(stderr)),
            channel,
        })
    }
}

impl RemoteProcess for Process {
    type Stdin = Pipe<ChannelStdin>;
    type Stderr = Pipe<ssh2::Stream>;
    type Error = Error;

    fn stdin(&mut self) -> Option<Pipe<ChannelStdin>> {
        self.stdin.take()
    }

    fn stderr(&mut self) -> Option<Pipe<ssh2::Stream>> {
        self.stderr.take()
    }

    async fn wait(self) -> Result<ExitStatus> {
        crate::exec::wait(&self.channel).await
    }
}

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use remtrace_core::transport::{ExitStatus, RemoteProcess, Transport, TunnelListener};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the remote trace tool does with its stream destination.
#[derive(Clone)]
pub enum Producer {
    /// Never connects.
    Silent,

    /// Connects and sends the given bytes.
    Send(Vec<u8>),
}

/// Behavior of the remote time service.
#[derive(Clone)]
pub struct TimeService {
    /// First line written, or `None` to close stderr right away.
    pub banner: Option<String>,

    /// One response per timestamp request, in order.
    pub responses: Vec<String>,

    /// Exit code once stdin is closed.
    pub exit_code: i32,

    /// Keeps stderr open once `responses` is exhausted, leaving further
    /// requests unanswered.
    pub hang: bool,
}

/// In-process transport, with tunnels bound to the IPv4 loopback.
pub struct FakeTransport {
    producer: Producer,
    exit_code: i32,
    files: HashMap<String, Vec<u8>>,
    broken_files: HashMap<String, Vec<u8>>,
    time_service: Option<TimeService>,

    /// Command lines executed or spawned, in order.
    pub commands: Mutex<Vec<String>>,

    /// Addresses of the opened tunnels.
    pub tunnels: Mutex<Vec<SocketAddr>>,

    /// Bytes received by the time service on its stdin.
    pub time_requests: Arc<Mutex<Vec<u8>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            producer: Producer::Silent,
            exit_code: 0,
            files: HashMap::new(),
            broken_files: HashMap::new(),
            time_service: None,
            commands: Mutex::default(),
            tunnels: Mutex::default(),
            time_requests: Arc::default(),
        }
    }

    pub fn with_producer(mut self, producer: Producer) -> Self {
        self.producer = producer;
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.insert(path.to_owned(), content.to_vec());
        self
    }

    /// File whose reads fail once `content` is consumed.
    pub fn with_broken_file(mut self, path: &str, content: &[u8]) -> Self {
        self.broken_files.insert(path.to_owned(), content.to_vec());
        self
    }

    pub fn with_time_service(mut self, service: TimeService) -> Self {
        self.time_service = Some(service);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn tunnels(&self) -> Vec<SocketAddr> {
        self.tunnels.lock().unwrap().clone()
    }

    pub fn time_requests(&self) -> Vec<u8> {
        self.time_requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    type Listener = FakeListener;
    type Process = FakeProcess;
    type File = Box<dyn AsyncRead + Unpin + Send>;
    type Error = io::Error;

    async fn execute(&self, command: &str) -> io::Result<ExitStatus> {
        self.commands.lock().unwrap().push(command.to_owned());

        if let Producer::Send(payload) = &self.producer {
            let words = shell_words::split(command).map_err(io::Error::other)?;
            let addr = words
                .iter()
                .find_map(|token| token.strip_prefix("--output-file=tcp:"))
                .ok_or_else(|| io::Error::other("no stream destination"))?
                .parse::<SocketAddr>()
                .map_err(io::Error::other)?;

            let mut stream = TcpStream::connect(addr).await?;
            stream.write_all(payload).await?;
            stream.shutdown().await?;
        }

        Ok(ExitStatus::from_code(self.exit_code))
    }

    async fn open_tunnel(&self, _bind: SocketAddr) -> io::Result<FakeListener> {
        let inner = TcpListener::bind("127.0.0.1:0").await?;
        let address = inner.local_addr()?;

        self.tunnels.lock().unwrap().push(address);

        Ok(FakeListener { inner, address })
    }

    async fn open_file(&self, path: &str) -> io::Result<Self::File> {
        if let Some(content) = self.files.get(path) {
            return Ok(Box::new(io::Cursor::new(content.clone())));
        }

        if let Some(content) = self.broken_files.get(path) {
            return Ok(Box::new(io::Cursor::new(content.clone()).chain(BrokenPipe)));
        }

        Err(io::Error::new(io::ErrorKind::NotFound, path.to_owned()))
    }

    async fn spawn(&self, command: &str) -> io::Result<FakeProcess> {
        self.commands.lock().unwrap().push(command.to_owned());

        let service = self
            .time_service
            .clone()
            .ok_or_else(|| io::Error::other("no time service"))?;

        let (stdin, service_stdin) = tokio::io::duplex(64);
        let (stderr, service_stderr) = tokio::io::duplex(1024);
        let (exit_tx, exit_rx) = oneshot::channel();

        tokio::spawn(respond(
            service,
            service_stdin,
            service_stderr,
            self.time_requests.clone(),
            exit_tx,
        ));

        Ok(FakeProcess {
            stdin: Some(stdin),
            stderr: Some(stderr),
            exit: exit_rx,
        })
    }

    async fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

async fn respond(
    service: TimeService,
    mut stdin: DuplexStream,
    mut stderr: DuplexStream,
    requests: Arc<Mutex<Vec<u8>>>,
    exit: oneshot::Sender<i32>,
) {
    let mut stderr = match service.banner {
        Some(banner) => {
            let _ = stderr.write_all(banner.as_bytes()).await;
            Some(stderr)
        }
        None => {
            drop(stderr);
            None
        }
    };

    let mut responses = service.responses.into_iter();
    let mut byte = [0u8; 1];

    while let Ok(1) = stdin.read(&mut byte).await {
        requests.lock().unwrap().push(byte[0]);

        if byte[0] == b't' {
            if let (Some(stderr), Some(response)) = (stderr.as_mut(), responses.next()) {
                let _ = stderr.write_all(response.as_bytes()).await;
            }

            // output is closed once every response was sent
            if responses.len() == 0 && !service.hang {
                stderr = None;
            }
        }
    }

    let _ = exit.send(service.exit_code);
}

pub struct FakeListener {
    inner: TcpListener,
    address: SocketAddr,
}

impl TunnelListener for FakeListener {
    type Stream = TcpStream;
    type Error = io::Error;

    fn address(&self) -> SocketAddr {
        self.address
    }

    async fn accept(&mut self) -> io::Result<TcpStream> {
        let (stream, _) = self.inner.accept().await?;
        Ok(stream)
    }
}

pub struct FakeProcess {
    stdin: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    exit: oneshot::Receiver<i32>,
}

impl RemoteProcess for FakeProcess {
    type Stdin = DuplexStream;
    type Stderr = DuplexStream;
    type Error = io::Error;

    fn stdin(&mut self) -> Option<DuplexStream> {
        self.stdin.take()
    }

    fn stderr(&mut self) -> Option<DuplexStream> {
        self.stderr.take()
    }

    async fn wait(self) -> io::Result<ExitStatus> {
        self.exit
            .await
            .map(ExitStatus::from_code)
            .map_err(|_| io::Error::other("time service vanished"))
    }
}

/// Listener serving a single stream, which breaks once `content` is
/// consumed.
pub struct BrokenStreamListener {
    content: Option<Vec<u8>>,
}

impl BrokenStreamListener {
    pub fn new(content: &[u8]) -> Self {
        Self {
            content: Some(content.to_vec()),
        }
    }
}

impl TunnelListener for BrokenStreamListener {
    type Stream = Box<dyn AsyncRead + Unpin + Send>;
    type Error = io::Error;

    fn address(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 9))
    }

    async fn accept(&mut self) -> io::Result<Self::Stream> {
        let content = self
            .content
            .take()
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))?;

        Ok(Box::new(io::Cursor::new(content).chain(BrokenPipe)))
    }
}

/// Reader failing on every read.
struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }
}

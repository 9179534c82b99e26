use std::io::Read;
use std::sync::{Arc, Mutex, OnceLock};

use remtrace_core::transport::ExitStatus;
use ssh2::{Channel, Session};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Chunks read from our standard input.
///
/// A single thread reads our standard input for the whole process, so that
/// successive commands don't compete for it. Only one command at a time
/// receives the chunks.
static LOCAL_STDIN: OnceLock<tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>> = OnceLock::new();

use crate::error::Result;
use crate::pipe::{ChannelStdin, Pipe, lock, retry};

/// Opens a channel running the given command line.
pub(crate) async fn open(session: &Session, command: &str) -> Result<Channel> {
    let mut channel = retry(|| session.channel_session()).await?;
    retry(|| channel.exec(command)).await?;

    Ok(channel)
}

/// Runs a command line with its standard streams connected to ours.
pub(crate) async fn run(session: &Session, command: &str) -> Result<ExitStatus> {
    let channel = Arc::new(Mutex::new(open(session, command).await?));

    let mut stdout = Pipe::new(lock(&channel).stream(0));
    let mut stderr = Pipe::new(lock(&channel).stderr());
    let mut stdin = Pipe::new(ChannelStdin::new(channel.clone()));

    let mut stdin_rx = local_stdin().lock().await;

    let mut local_stdout = tokio::io::stdout();
    let mut local_stderr = tokio::io::stderr();

    let outputs = async {
        tokio::try_join!(
            tokio::io::copy(&mut stdout, &mut local_stdout),
            tokio::io::copy(&mut stderr, &mut local_stderr),
        )
    };
    tokio::pin!(outputs);

    let mut stdin_open = true;

    loop {
        tokio::select! {
            res = &mut outputs => {
                res?;
                break;
            }
            chunk = stdin_rx.recv(), if stdin_open => {
                let res = match chunk {
                    Some(chunk) => stdin.write_all(&chunk).await,
                    None => {
                        stdin_open = false;
                        stdin.shutdown().await
                    }
                };

                // the command may exit without reading its input
                if let Err(e) = res {
                    tracing::debug!("remote stdin closed: {e}");
                    stdin_open = false;
                }
            }
        }
    }

    drop(stdin);

    wait(&channel).await
}

/// Waits for the command of a channel to exit.
pub(crate) async fn wait(channel: &Mutex<Channel>) -> Result<ExitStatus> {
    retry(|| lock(channel).wait_eof()).await?;
    retry(|| lock(channel).close()).await?;
    retry(|| lock(channel).wait_close()).await?;

    let channel = lock(channel);

    if let Some(signal) = channel.exit_signal()?.exit_signal {
        return Ok(ExitStatus::from_signal(signal));
    }

    Ok(ExitStatus::from_code(channel.exit_status()?))
}

fn local_stdin() -> &'static tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>> {
    LOCAL_STDIN.get_or_init(|| {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || forward_stdin(tx));
        tokio::sync::Mutex::new(rx)
    })
}

fn forward_stdin(tx: mpsc::Sender<Vec<u8>>) {
    let mut stdin = std::io::stdin();
    let mut buf = [0; 4096];

    while let Ok(n @ 1..) = stdin.read(&mut buf) {
        if tx.blocking_send(buf[..n].to_vec()).is_err() {
            break;
        }
    }
}

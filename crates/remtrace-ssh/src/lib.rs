//! This crate provides the default transport (to be used with
//! `remtrace-core`), implemented over SSH.
//!
//! A single [Connection] hosts every remote session needed for a capture:
//! command executions, spawned processes, SFTP file reads, and remote port
//! forwarding for streaming traces back to the host.
//!
//! <div class="warning">
//!
//! *This crate is not meant to be used on its own! It merely implements the
//! interface (traits) provided by `remtrace-core`.*
//!
//! </div>
//!
//! # Host Identity
//!
//! The identity of the target is checked against a [TrustPolicy] right after
//! the SSH handshake, before any credential is sent.

mod connection;
mod error;
mod exec;
mod pipe;
mod process;
mod trust;
mod tunnel;

pub use self::connection::{ConnectOptions, Connection, Credential, DEFAULT_PORT, Target};
pub use self::error::{Error, Result};
pub use self::pipe::{ChannelStdin, Pipe};
pub use self::process::Process;
pub use self::trust::{TrustPolicy, fingerprint};
pub use self::tunnel::Listener;

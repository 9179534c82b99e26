//! This crate allows to record performance traces on a remote target.
//!
//! It is agnostic of how the target is reached: the
//! [Transport](self::transport::Transport) traits describe what an
//! authenticated connection must provide (running commands, opening
//! tunnels, reading files), and `remtrace-ssh` provides the default
//! implementation over SSH.
//!
//! Three operations are built on top of a transport:
//! - [capture] runs the remote `trace record` tool, optionally streaming the
//!   trace back to the host while it is being recorded.
//! - [fetch] retrieves a result file from the target.
//! - [sync_clock] estimates the offset between the local and the remote
//!   clock, so that remote timestamps can be correlated with host events.
//!
//! # Recording a trace
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use remtrace_core::transport::Transport;
//! use remtrace_core::{CaptureConfig, CaptureOptions, capture};
//!
//! async fn record<T: Transport>(transport: &T) {
//!     let config = CaptureConfig::new("gfx,kernel:meta")
//!         .buffering_mode("circular")
//!         .duration(Duration::from_secs(5))
//!         .stream(true);
//!
//!     let output = tokio::fs::File::create("trace.json").await.unwrap();
//!
//!     let outcome = capture(transport, &config, &CaptureOptions::default(), Some(output))
//!         .await
//!         .unwrap();
//!
//!     println!("streamed {:?} bytes", outcome.streamed_bytes);
//! }
//! ```

/// Module containing traits for implementing a remote transport.
pub mod transport;

mod bridge;
mod capture;
mod clock;
mod command;
mod config;
mod error;
mod transfer;

pub use self::bridge::StreamBridge;
pub use self::capture::{CaptureOptions, CaptureOutcome, capture};
pub use self::clock::{
    Clock, ClockOffset, ClockSyncOptions, ClockSyncResult, DEFAULT_TIME_SERVICE, SYNC_ROUNDS,
    SystemClock, sync_clock, sync_clock_with,
};
pub use self::command::{CHILD_RESULT_FLAG, RemoteCommand};
pub use self::config::{ALL_CATEGORIES, BufferingMode, CaptureConfig};
pub use self::error::{
    CaptureError, ClockSyncError, Result, StreamError, TransferError, ValidationError,
};
pub use self::transfer::fetch;

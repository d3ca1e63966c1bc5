//! Host-side engine for ADP, the message-based debug protocol used to bootstrap,
//! control and inspect a remote ARM target through a resident debug agent.
//!
//! This crate implements the host half of the protocol: request/reply
//! correlation, connection bootstrap, execution control, binary message
//! encoding and decoding, chunked bulk transfer and debug agent replacement.
//! The physical link and its channel multiplexer are supplied by the
//! application through the [`channel::Transport`] trait, and user-visible text
//! goes out through [`host::HostInterface`].
//!
//! `no_std`.  Requires `alloc`.
//!
//! ## Architecture
//!
//! Assumes a Host (debugger) and Target (processor running a debug agent)
//! architecture, connected by a byte-oriented link (serial, parallel, network
//! or JTAG) carrying several logical channels:
//! - **Boot channels** (host and target originated): reset, booted,
//!   parameter negotiation and link checks
//! - **Debug channels** (host and target originated): every debug operation,
//!   and the target's asynchronous stopped notifications
//! - **Log channel**: text the agent wants shown to the user
//! - **Comms channel**: a duplex word pass-through to the running application
//!
//! Every message starts with a fixed little-endian header:
//!
//! ```text
//! 0..4    reason code (opcode | direction bit)
//! 4..8    debug id
//! 8..12   OS handle 1 (host always sends 0xFFFFFFFF)
//! 12..16  OS handle 2 (host always sends 0xFFFFFFFF)
//! 16..20  status, or sub-reason for sub-tagged operation families
//! 20..    operation specific payload
//! ```
//!
//! Only one request may be outstanding per channel.  Replies are matched to
//! requests by temporal adjacency, not by an id: the engine registers a
//! one-shot handler on the channel, sends the request, then pumps the
//! transport until the handler fires or the deadline expires.  Everything is
//! single threaded and cooperative; the only thing that may happen
//! asynchronously is setting one of the two cancellation flags held by a
//! [`cancel::CancelHandle`].
//!
//! ## Modules
//!
//! - [`codec`] - Typed little-endian field encoding and decoding
//! - [`protocol`] - Channel ids, reason codes and fixed wire sizes
//! - [`status`] - Target status codes and host advisories
//! - [`params`] - Connection parameter sets and their negotiation encoding
//! - [`channel`] - The transport contract, and per-channel handler slots
//! - [`host`] - The host interface used for user-visible output
//! - [`cancel`] - Cooperative cancellation flags
//! - [`client`] - The [`client::Session`] protocol engine
//!
//! ## Getting Started
//!
//! 1. Implement [`channel::Transport`] for your link.  It must be able to
//!    send a packet on a channel, and to pump I/O either without blocking or
//!    blocking until something is read, handing back any packet received.
//! 2. Implement [`host::HostInterface`] to show banners and advisories.
//! 3. Create a [`client::Session`] with a [`client::SessionConfig`].
//! 4. Call [`client::Session::open()`] with [`client::OpenKind::Cold`] to
//!    reset and connect to the agent.
//! 5. Read and write memory and registers, set breakpoints, and run the
//!    target with [`client::Session::execute()`].
//! 6. Give a [`cancel::CancelHandle`] to whatever handles Ctrl-C, so a
//!    running target can be interrupted.
//!
//! ```rust,ignore
//! use adp_host::client::{OpenKind, Session, SessionConfig};
//!
//! let mut session = Session::new(transport, host, SessionConfig::default());
//! let opened = session.open(OpenKind::Cold)?;
//! let mut buf = [0u8; 64];
//! let transfer = session.read_memory(0x8000, &mut buf)?;
//! let point = session.set_breakpoint(0x8000, 0, 0)?;
//! let stop = session.execute()?;
//! ```

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod cancel;
pub mod channel;
pub mod client;
pub mod codec;
pub mod host;
pub mod params;
pub mod protocol;
pub mod status;

use crate::status::Status;

/// ADP host errors
///
/// Transport and sequencing failures, target declined requests and local
/// invariant violations are all distinct, so a caller can always tell "no
/// reply" apart from "the target said no".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Timeout waiting for a reply
    #[error("timed out waiting for a reply")]
    Timeout,
    /// Timeout while negotiating or waiting for the target to boot
    #[error("timed out opening the connection")]
    TimeoutOnOpen,
    /// Reply carried a reason code other than the one requested
    #[error("expected reason code {expected:#010X}, got {got:#010X}")]
    UnexpectedReason { expected: u32, got: u32 },
    /// Target replied that it does not recognise the operation
    #[error("operation not recognised by the target")]
    Unimplemented,
    /// Transport could not provide a packet buffer
    #[error("packet allocation failed")]
    AllocationFailed,
    /// I/O error on the transport
    #[error("transport I/O error")]
    Io,
    /// Reply shorter than its fixed layout
    #[error("reply truncated")]
    Truncated,
    /// Well-formed reply, but the target reported a failure status
    #[error("target reported: {0}")]
    Target(Status),
    /// Reply belongs to a different member of a sub-tagged family
    #[error("expected sub-reason {expected:#010X}, got {got:#010X}")]
    SubReasonMismatch { expected: u32, got: u32 },
    /// Payload too large for buffer
    #[error("payload too large for buffer")]
    PayloadTooLarge,
    /// Buffer too small for operation
    #[error("buffer too small for operation")]
    BufferTooSmall,
    /// Coprocessor register transfer before its description is known
    #[error("coprocessor {0} has not been described")]
    UnknownCoprocessor(u8),
    /// Target description longer than the local capacity
    #[error("description does not fit the local buffer")]
    BufferFull,
    /// User gave up waiting for the target to boot
    #[error("abandoned waiting for the target to boot")]
    BootAbandoned,
    /// Invalid operation or arguments
    #[error("invalid operation")]
    InvalidOperation,
}

/// Type to represent the result of an ADP operation
pub type Result<T> = core::result::Result<T, Error>;

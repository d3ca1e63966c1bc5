//! The ADP protocol engine.
//!
//! A [`Session`] owns the [`Transport`] and [`HostInterface`] and all of a
//! connection's mutable state.  Every operation is a method on the session,
//! grouped by submodule:
//! - [`request`] - the request/reply primitive everything else is built on
//! - [`boot`] - cold and warm open, parameter negotiation, close
//! - [`exec`] - execute, step and stop handling
//! - [`memory`] - chunked memory reads and writes
//! - [`registers`] - CPU and coprocessor registers
//! - [`points`] - breakpoints and watchpoints
//! - [`info`] - info, control and capability queries
//! - [`profile`] - profile map transfer
//! - [`agent`] - agent configurations and agent replacement
//! - [`comms`] - the comms channel pass-through
//!
//! See [`crate`] for a description of how to use these objects.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod agent;
pub mod boot;
pub mod comms;
pub mod exec;
pub mod info;
pub mod memory;
pub mod points;
pub mod profile;
pub mod registers;
pub mod request;

pub use agent::{ConfigAspect, ConfigDesc, ConfigMatch};
pub use boot::{Opened, TargetInfo};
pub use comms::{FromHostFn, ToHostFn};
pub use exec::{Stop, StopObserver, StopOutcome};
pub use info::{InfoReply, InfoRequest};
pub use memory::Transfer;
pub use points::Point;
pub use registers::{CoproDescEntry, CoproRegisterDesc, RegisterMap};

use alloc::string::String;
use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::cancel::CancelHandle;
use crate::channel::{Handler, Packet, PumpMode, Router, Transport};
use crate::host::HostInterface;
use crate::params::ParameterConfig;
use crate::protocol::{BUFFER_MIN_SIZE, ChannelId, boot as boot_codes};
use crate::Result;

/// Number of coprocessors that can be described
pub const NUM_COPROCESSORS: usize = 16;

/// Target endianness requested at cold open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteSex {
    /// No preference
    #[default]
    Any,
    Little,
    Big,
    /// Host can work with either
    Both,
}

impl ByteSex {
    /// Feature flags for the Reset request
    pub const fn features(&self) -> u32 {
        match self {
            ByteSex::Any => 0,
            ByteSex::Little => boot_codes::HOST_FEATURE_LITTLE_END,
            ByteSex::Big => boot_codes::HOST_FEATURE_BIG_END,
            ByteSex::Both => {
                boot_codes::HOST_FEATURE_LITTLE_END | boot_codes::HOST_FEATURE_BIG_END
            }
        }
    }
}

/// How long to wait for a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Pump without blocking until the given number of milliseconds pass
    Bounded(u64),
    /// Pump, blocking on reads, until the reply arrives
    Unbounded,
    /// Pump once without blocking
    Poll,
}

/// Which bootstrap path [`Session::open()`] takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    /// Negotiate, reset the target and wait for it to boot
    Cold,
    /// Resume an application on an agent that is already connected
    Warm,
}

/// Configuration for creating a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target endianness to ask for at cold open
    pub byte_sex: ByteSex,
    /// Bound on negotiation responses, and on waiting for Booted
    pub open_timeout_ms: u64,
    /// Bound on waiting for a replacement agent to boot
    pub agent_boot_timeout_ms: u64,
    /// Pause between applying negotiated parameters and the link check
    pub negotiate_settle_us: u32,
    /// Deadline for ordinary request/reply exchanges
    pub reply_deadline: Deadline,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            byte_sex: ByteSex::Any,
            open_timeout_ms: 5000,
            agent_boot_timeout_ms: 2000,
            negotiate_settle_us: 100_000,
            reply_deadline: Deadline::Bounded(5000),
        }
    }
}

/// Which of the two negotiated buffer budgets a message must fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Buffer {
    Short,
    Long,
}

#[derive(Debug, Default)]
struct BootState {
    booted_not_received: bool,
    late_booted: bool,
    handler_installed: bool,
}

#[derive(Debug, Default)]
struct NegotiateState {
    response: bool,
    accepted: Option<ParameterConfig>,
    link_check: bool,
}

/// ADP host session.
///
/// Example usage:
///
/// ```rust,ignore
/// use adp_host::client::{OpenKind, Session, SessionConfig};
///
/// let mut session = Session::new(transport, host, SessionConfig::default());
/// session.open(OpenKind::Cold)?;
/// let regs = session.read_cpu_registers(adp_host::protocol::MODE_CURRENT, 0x7FFFF)?;
/// ```
pub struct Session<T: Transport, H: HostInterface> {
    transport: T,
    host: H,
    config: SessionConfig,
    router: Router,
    cancel: CancelHandle,
    buffer_size: usize,
    long_buffer_size: usize,
    target: Option<TargetInfo>,
    boot: BootState,
    negotiate: NegotiateState,
    reply: Option<Packet>,
    executing: bool,
    stopped: Option<exec::StoppedInfo>,
    observers: Vec<StopObserver>,
    coprocessors: [Option<RegisterMap>; NUM_COPROCESSORS],
    trace_level: u32,
    command_line: Option<String>,
    to_host: Option<ToHostFn>,
    from_host: Option<FromHostFn>,
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Create a new Session
    ///
    /// Arguments:
    /// - `transport`: Link to the target
    /// - `host`: Where user-visible output goes
    /// - `config`: Timeouts and open options
    pub fn new(transport: T, host: H, config: SessionConfig) -> Self {
        Self {
            transport,
            host,
            config,
            router: Router::new(),
            cancel: CancelHandle::new(),
            buffer_size: BUFFER_MIN_SIZE,
            long_buffer_size: BUFFER_MIN_SIZE,
            target: None,
            boot: BootState::default(),
            negotiate: NegotiateState::default(),
            reply: None,
            executing: false,
            stopped: None,
            observers: Vec::new(),
            coprocessors: Default::default(),
            trace_level: 0,
            command_line: None,
            to_host: None,
            from_host: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle to this session's cancellation flags
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Details from the most recent Booted notification
    pub fn target_info(&self) -> Option<&TargetInfo> {
        self.target.as_ref()
    }

    /// Current (short, long) buffer budgets in bytes, including the channel
    /// header
    pub fn buffer_sizes(&self) -> (usize, usize) {
        (self.buffer_size, self.long_buffer_size)
    }

    /// Whether the target is currently executing
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Command line last set with [`InfoRequest::SetCommandLine`]
    pub fn command_line(&self) -> Option<&str> {
        self.command_line.as_deref()
    }

    /// Register map cached for a coprocessor, if it has been described
    pub fn register_map(&self, cpnum: u8) -> Option<&RegisterMap> {
        self.coprocessors.get(cpnum as usize)?.as_ref()
    }

    /// Consume the session, returning the transport and host
    pub fn into_parts(self) -> (T, H) {
        (self.transport, self.host)
    }

    /// Register a function to be called with the raw stop reason every time
    /// the target stops.
    ///
    /// Observers are called in registration order and are never removed.
    /// All are called even if one fails, and the last failure is reported
    /// in [`Stop::observer_status`].
    pub fn on_target_stopped(&mut self, observer: StopObserver) {
        self.observers.push(observer);
    }

    fn budget(&self, buffer: Buffer) -> usize {
        match buffer {
            Buffer::Short => self.buffer_size,
            Buffer::Long => self.long_buffer_size,
        }
    }

    /// Pump the transport once, dispatching anything received
    fn pump(&mut self, mode: PumpMode) -> Result<()> {
        if let Some(packet) = self.transport.pump(mode)? {
            self.dispatch(packet);
        }
        Ok(())
    }

    /// Hand a received packet to whichever handler is registered on its
    /// channel.  Packets on channels with no handler are dropped.
    fn dispatch(&mut self, packet: Packet) {
        let channel = packet.channel;
        match self.router.route(channel) {
            Some(Handler::Reply) => {
                if self.reply.replace(packet).is_some() {
                    warn!("Unclaimed reply on {channel:?} discarded");
                }
            }
            Some(Handler::Stopped) => self.handle_stopped(packet),
            Some(Handler::Negotiate) => self.handle_negotiate(packet),
            Some(Handler::ResetAck) => self.handle_reset_ack(packet),
            Some(Handler::Booted) => self.handle_booted(packet),
            Some(Handler::TargetLog) => self.handle_target_log(packet),
            Some(Handler::Comms) => self.handle_comms(packet),
            None => trace!(
                "Dropping {} byte packet on unregistered channel {channel:?}",
                packet.data.len()
            ),
        }
    }

    fn handle_target_log(&mut self, packet: Packet) {
        self.host.write(&packet.data);
        drop(packet);

        // The acknowledgement's contents are ignored by the target
        match self.transport.allocate(ChannelId::TargetLog, 4) {
            Ok(ack) => {
                if let Err(e) = self.transport.send(ack) {
                    warn!("Failed to acknowledge target log: {e}");
                }
            }
            Err(e) => warn!("No buffer to acknowledge target log: {e}"),
        }
    }
}

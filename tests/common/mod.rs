//! Scripted transport and recording host shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use adp_host::Result;
use adp_host::cancel::CancelHandle;
use adp_host::channel::{DeviceControl, Packet, PumpMode, Transport};
use adp_host::client::{OpenKind, Session, SessionConfig};
use adp_host::host::HostInterface;
use adp_host::params::{ParameterConfig, ParameterOptions};
use adp_host::protocol::{
    ChannelId, HANDLE_UNKNOWN, HOST_TO_TARGET, TARGET_TO_HOST, boot, tadp,
};

/// Answers each packet the engine sends with zero or more packets
pub type Responder = Box<dyn FnMut(&Packet) -> Vec<Packet>>;

/// Device controls the engine asked for, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    SetParams(ParameterConfig),
    Resync,
    Reset,
    Heartbeat(bool),
}

pub struct MockTransport {
    pub sent: Vec<Packet>,
    pub inbox: VecDeque<Packet>,
    pub controls: Vec<Control>,
    pub clock_ms: u64,
    pub pumps: usize,
    pub sequence_resets: usize,
    pub delays_us: Vec<u32>,
    pub default_params: Option<ParameterConfig>,
    pub user_params: Option<ParameterOptions>,
    scheduled: Vec<(u64, Packet)>,
    responder: Responder,
}

impl MockTransport {
    pub fn new(responder: Responder) -> Self {
        Self {
            sent: Vec::new(),
            inbox: VecDeque::new(),
            controls: Vec::new(),
            clock_ms: 0,
            pumps: 0,
            sequence_resets: 0,
            delays_us: Vec::new(),
            default_params: None,
            user_params: None,
            scheduled: Vec::new(),
            responder,
        }
    }

    /// Deliver `packet` once the clock reaches `at_ms`
    pub fn schedule(&mut self, at_ms: u64, packet: Packet) {
        self.scheduled.push((at_ms, packet));
    }

    /// Packets sent on the host debug channel with the given operation
    pub fn requests(&self, op: u32) -> Vec<&Packet> {
        self.sent
            .iter()
            .filter(|p| p.channel == ChannelId::HostAdp && word(&p.data, 0) == op)
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, packet: Packet) -> Result<()> {
        let responses = (self.responder)(&packet);
        self.inbox.extend(responses);
        self.sent.push(packet);
        Ok(())
    }

    fn pump(&mut self, _mode: PumpMode) -> Result<Option<Packet>> {
        self.pumps += 1;
        self.clock_ms += 1;
        let now = self.clock_ms;
        let (due, later): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|(at, _)| *at <= now);
        self.scheduled = later;
        self.inbox.extend(due.into_iter().map(|(_, packet)| packet));
        Ok(self.inbox.pop_front())
    }

    fn now_ms(&mut self) -> u64 {
        self.clock_ms
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_us.push(us);
    }

    fn reset_sequence(&mut self) {
        self.sequence_resets += 1;
    }

    fn control(&mut self, control: DeviceControl<'_>) -> Result<()> {
        self.controls.push(match control {
            DeviceControl::SetParams(config) => Control::SetParams(config.clone()),
            DeviceControl::Resync => Control::Resync,
            DeviceControl::Reset => Control::Reset,
            DeviceControl::Heartbeat(on) => Control::Heartbeat(on),
        });
        Ok(())
    }

    fn user_params(&mut self) -> Option<ParameterOptions> {
        self.user_params.clone()
    }

    fn default_params(&mut self) -> Option<ParameterConfig> {
        self.default_params.clone()
    }
}

#[derive(Default)]
pub struct MockHost {
    pub output: Vec<u8>,
    pub debug: String,
    pub ui_polls: usize,
    pub handler: Option<CancelHandle>,
    pub handler_installs: usize,
    /// Interrupt as soon as an interrupt handler is installed
    pub interrupt_on_install: bool,
    /// Request a stop on this turn of the execution poll loop
    pub stop_on_poll: Option<usize>,
}

impl MockHost {
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl HostInterface for MockHost {
    fn write(&mut self, text: &[u8]) {
        self.output.extend_from_slice(text);
    }

    fn debug_print(&mut self, args: std::fmt::Arguments<'_>) {
        self.debug.push_str(&args.to_string());
    }

    fn ui_poll(&mut self) {
        self.ui_polls += 1;
        if self.stop_on_poll == Some(self.ui_polls) {
            if let Some(handle) = &self.handler {
                handle.request_stop();
            }
        }
    }

    fn set_interrupt_handler(&mut self, handle: Option<CancelHandle>) {
        if let Some(handle) = &handle {
            self.handler_installs += 1;
            if self.interrupt_on_install {
                handle.interrupt();
            }
        }
        self.handler = handle;
    }
}

pub type TestSession = Session<MockTransport, MockHost>;

// Packet building

pub fn word(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Target originated message with the standard header
pub fn message(channel: ChannelId, reason: u32, body: &[u32]) -> Packet {
    let mut words = vec![reason | TARGET_TO_HOST, 0, HANDLE_UNKNOWN, HANDLE_UNKNOWN];
    words.extend_from_slice(body);
    Packet::new(channel, words_to_bytes(&words))
}

/// Reply to a plain request
pub fn reply(op: u32, body: &[u32]) -> Packet {
    message(ChannelId::HostAdp, op, body)
}

/// Reply to a sub-tagged request
pub fn sub_reply(op: u32, sub: u32, status: u32, body: &[u32]) -> Packet {
    let mut words = vec![sub, status];
    words.extend_from_slice(body);
    reply(op, &words)
}

/// Reply with trailing raw bytes after the words
pub fn reply_with_bytes(op: u32, body: &[u32], bytes: &[u8]) -> Packet {
    let mut packet = reply(op, body);
    packet.data.extend_from_slice(bytes);
    packet
}

pub fn reset_ack(status: u32) -> Packet {
    message(ChannelId::HostBoot, boot::RESET, &[status])
}

pub const BUFFER_SIZE: u32 = 1020;
pub const LONG_BUFFER_SIZE: u32 = 4092;

pub fn booted(hw_status: u32, banner: &[u8]) -> Packet {
    booted_with(BUFFER_SIZE, LONG_BUFFER_SIZE, hw_status, banner)
}

pub fn booted_with(buffer_size: u32, long_buffer_size: u32, hw_status: u32, banner: &[u8]) -> Packet {
    let body = [
        buffer_size,
        long_buffer_size,
        0x102,
        0x10,
        0x4,
        0x41,
        hw_status,
        banner.len() as u32,
    ];
    let mut packet = message(ChannelId::TargetBoot, boot::BOOTED, &body);
    packet.data.extend_from_slice(banner);
    packet
}

pub fn stopped(reason: u32, handle: u32) -> Packet {
    message(ChannelId::TargetAdp, tadp::STOPPED, &[reason, handle])
}

pub fn is_host_message(packet: &Packet, channel: ChannelId, reason: u32) -> bool {
    packet.channel == channel && word(&packet.data, 0) == reason | HOST_TO_TARGET
}

/// Answers the boot traffic of a cold open: a normal reset acknowledgement
/// then Booted.  `None` for anything else.
pub fn boot_responses(packet: &Packet) -> Option<Vec<Packet>> {
    if is_host_message(packet, ChannelId::HostBoot, boot::RESET) {
        return Some(vec![reset_ack(boot::NORMAL_ACK), booted(0, b"Test Agent\n")]);
    }
    if packet.channel == ChannelId::TargetBoot
        || packet.channel == ChannelId::TargetAdp
        || packet.channel == ChannelId::TargetLog
        || packet.channel == ChannelId::TargetComms
    {
        return Some(Vec::new());
    }
    None
}

/// Session answering everything with `responder`
pub fn session(responder: Responder) -> TestSession {
    Session::new(
        MockTransport::new(responder),
        MockHost::default(),
        SessionConfig::default(),
    )
}

/// Session over a target that boots normally, then answers debug requests
/// with `debug`
pub fn session_with<F>(mut debug: F) -> TestSession
where
    F: FnMut(&Packet) -> Vec<Packet> + 'static,
{
    session(Box::new(move |packet: &Packet| {
        boot_responses(packet).unwrap_or_else(|| debug(packet))
    }))
}

/// As [`session_with()`], cold opened
pub fn opened_session<F>(debug: F) -> TestSession
where
    F: FnMut(&Packet) -> Vec<Packet> + 'static,
{
    let mut session = session_with(debug);
    session.open(OpenKind::Cold).unwrap();
    session
}

/// Operation of a packet sent on the host debug channel
pub fn op_of(packet: &Packet) -> u32 {
    word(&packet.data, 0)
}

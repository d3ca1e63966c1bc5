//! Connection bootstrap and shutdown.
//!
//! Cold open runs:
//!
//! ```text
//! [negotiate] -> Reset sent -> wait for Booted -> Booted acknowledged -> open
//!                                  |
//!                             late reset ack
//!                                  |
//!                    wait for Booted, without timeout
//! ```
//!
//! Warm open is a single InitialiseApplication exchange.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{DeviceControl, Handler, Packet, PumpMode, Transport};
use crate::client::{Buffer, OpenKind, Session};
use crate::codec::{self, Cursor, Field, FieldKind};
use crate::host::HostInterface;
use crate::params::{ParameterConfig, ParameterOptions};
use crate::protocol::{CHANNEL_HEADER_SIZE, ChannelId, HEADER_SIZE, TARGET_TO_HOST, boot, hadp};
use crate::status::{Advisory, Status};
use crate::{Error, Result};

/// Result of a successful [`Session::open()`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// Cold open completed, target is little-endian
    LittleEndian,
    /// Cold open completed, target is big-endian
    BigEndian,
    /// Warm open completed
    Resumed,
    /// The user interrupted the wait for the target to boot.  Parameters
    /// have been renegotiated to defaults.
    BootAbandoned,
}

impl Opened {
    /// The status a legacy caller would see for this outcome
    pub const fn status(&self) -> Status {
        match self {
            Opened::LittleEndian => Status::LITTLE_ENDIAN,
            Opened::BigEndian => Status::BIG_ENDIAN,
            Opened::Resumed => Status::NO_ERROR,
            Opened::BootAbandoned => Status::USER_INTERRUPT,
        }
    }
}

/// Details the agent reports when it boots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Short message size, excluding the channel header
    pub buffer_size: u32,
    /// Long message size, excluding the channel header
    pub long_buffer_size: u32,
    pub angel_version: u32,
    pub adp_version: u32,
    pub arch_info: u32,
    pub cpu_info: u32,
    pub hw_status: u32,
    pub banner: Vec<u8>,
}

impl TargetInfo {
    pub fn is_big_endian(&self) -> bool {
        self.hw_status & boot::CPU_BIG_ENDIAN != 0
    }
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Open the connection.
    ///
    /// Cold open negotiates parameters if the transport asks for any, resets
    /// the target and waits for it to boot.  A user interrupt (see
    /// [`crate::cancel::CancelHandle::interrupt()`]) while waiting gives
    /// up, returning [`Opened::BootAbandoned`].
    ///
    /// Warm open resumes the application on the current agent.
    pub fn open(&mut self, kind: OpenKind) -> Result<Opened> {
        match kind {
            OpenKind::Cold => self.open_cold(),
            OpenKind::Warm => self.open_warm(),
        }
    }

    /// End the debug session.
    ///
    /// On success the link is renegotiated to default parameters and the
    /// device is reset.
    pub fn close(&mut self) -> Result<()> {
        self.set_heartbeat(false);
        self.request(hadp::END, &[])?.check()?;
        self.negotiate_defaults()?;
        self.transport.control(DeviceControl::Reset)?;
        debug!("Session closed");
        Ok(())
    }

    pub(crate) fn open_cold(&mut self) -> Result<Opened> {
        self.router.register(ChannelId::TargetLog, Handler::TargetLog);

        if let Some(options) = self.transport.user_params() {
            self.negotiate(&options)?;
        } else {
            self.negotiate_defaults()?;
        }

        // Handlers go in before anything is sent
        self.boot.booted_not_received = true;
        self.router.register(ChannelId::HostBoot, Handler::ResetAck);
        self.router.register(ChannelId::TargetBoot, Handler::Booted);

        let features = self.config.byte_sex.features();
        self.send_message(
            ChannelId::HostBoot,
            boot::RESET,
            &[Field::Word(features)],
            Buffer::Short,
        )?;
        debug!("Reset sent, features {features:#010X}");

        let waited = self.wait_for_booted();

        if self.boot.handler_installed {
            self.host.set_interrupt_handler(None);
            self.boot.handler_installed = false;
        }
        waited?;

        if self.cancel.is_interrupted() {
            self.cancel.clear_interrupt();
            debug!("Boot wait abandoned");
            if let Err(e) = self.negotiate_defaults() {
                warn!("Renegotiating defaults after abandoned boot failed: {e}");
            }
            self.host.write(Advisory::AbandonBootWait.text().as_bytes());
            return Ok(Opened::BootAbandoned);
        }

        self.router.unregister(ChannelId::HostBoot);

        // The Booted handler stays installed, to catch agent restarts
        self.send_message(
            ChannelId::TargetBoot,
            boot::BOOTED,
            &[Field::Word(0)],
            Buffer::Short,
        )?;
        self.transport.reset_sequence();
        debug!("Booted acknowledged, boot sequence complete");

        let big = self.target.as_ref().is_some_and(TargetInfo::is_big_endian);
        Ok(if big {
            Opened::BigEndian
        } else {
            Opened::LittleEndian
        })
    }

    fn open_warm(&mut self) -> Result<Opened> {
        self.request(hadp::INITIALISE_APPLICATION, &[])?.check()?;
        debug!("Application initialised");
        Ok(Opened::Resumed)
    }

    /// Wait for Booted, or a user interrupt.  Bounded by the open timeout
    /// unless the target has sent a late reset acknowledgement.
    fn wait_for_booted(&mut self) -> Result<()> {
        self.cancel.clear_interrupt();
        if self.boot.late_booted {
            self.install_boot_interrupt_handler();
        }

        let start = self.transport.now_ms();
        loop {
            self.pump(PumpMode::Poll)?;
            if !self.boot.booted_not_received || self.cancel.is_interrupted() {
                return Ok(());
            }
            let elapsed = self.transport.now_ms().saturating_sub(start);
            if elapsed > self.config.open_timeout_ms && !self.boot.late_booted {
                warn!("No Booted message after {elapsed} ms");
                return Err(Error::TimeoutOnOpen);
            }
        }
    }

    fn install_boot_interrupt_handler(&mut self) {
        if !self.boot.handler_installed {
            self.host.set_interrupt_handler(Some(self.cancel.clone()));
            self.boot.handler_installed = true;
        }
    }

    /// Negotiate the device's default parameters, if it has any
    pub(crate) fn negotiate_defaults(&mut self) -> Result<()> {
        match self.transport.default_params() {
            Some(config) => self.negotiate(&ParameterOptions::from(&config)),
            None => Ok(()),
        }
    }

    /// Offer `options` to the target.  If it accepts, switch the link to the
    /// accepted parameters and check the link still works.
    fn negotiate(&mut self, options: &ParameterOptions) -> Result<()> {
        debug!("Negotiating {} parameters", options.lists.len());
        self.negotiate = Default::default();
        self.router.register(ChannelId::HostBoot, Handler::Negotiate);

        self.send_message(
            ChannelId::HostBoot,
            boot::PARAM_NEGOTIATE,
            &options.fields(),
            Buffer::Short,
        )?;

        let start = self.transport.now_ms();
        while !self.negotiate.response {
            self.pump(PumpMode::Poll)?;
            if self.transport.now_ms().saturating_sub(start) > self.config.open_timeout_ms {
                warn!("No response to parameter negotiation");
                return Err(Error::TimeoutOnOpen);
            }
        }

        let Some(accepted) = self.negotiate.accepted.take() else {
            debug!("Target declined parameters");
            self.router.unregister(ChannelId::HostBoot);
            return Ok(());
        };

        self.transport.control(DeviceControl::SetParams(&accepted))?;

        // The target needs time to switch before the link check
        self.transport.delay_us(self.config.negotiate_settle_us);

        self.send_message(ChannelId::HostBoot, boot::LINK_CHECK, &[], Buffer::Short)?;
        while !self.negotiate.link_check {
            self.pump(PumpMode::BlockOnRead)?;
        }
        self.router.unregister(ChannelId::HostBoot);
        self.transport.reset_sequence();
        debug!("Link checked with new parameters");
        Ok(())
    }

    pub(crate) fn handle_negotiate(&mut self, packet: Packet) {
        let Ok(reason) = packet.reason() else {
            warn!("Short packet on boot channel");
            return;
        };

        if reason == boot::PARAM_NEGOTIATE | TARGET_TO_HOST {
            self.negotiate.response = true;
            let accepted = Cursor::at(&packet.data, HEADER_SIZE).and_then(|mut c| {
                let status = c.word()?;
                if status != 0 {
                    debug!("Negotiation status {status}");
                    return Ok(None);
                }
                ParameterConfig::decode(&mut c).map(Some)
            });
            match accepted {
                Ok(config) => self.negotiate.accepted = config,
                Err(e) => warn!("Malformed negotiation response: {e}"),
            }
        } else if reason == boot::LINK_CHECK | TARGET_TO_HOST {
            trace!("Link check echoed");
            self.negotiate.link_check = true;
        } else {
            warn!("Unexpected {reason:#010X} during negotiation");
        }
    }

    pub(crate) fn handle_reset_ack(&mut self, packet: Packet) {
        let reason = packet.reason();
        let status = packet.status();
        match (reason, status) {
            (Ok(r), Ok(boot::NORMAL_ACK)) if r == boot::RESET | TARGET_TO_HOST => {
                debug!("Normal reset acknowledgement");
                self.boot.late_booted = false;
            }
            (Ok(r), Ok(boot::LATE_ACK)) if r == boot::RESET | TARGET_TO_HOST => {
                debug!("Late reset acknowledgement, target already running");
                self.boot.late_booted = true;
                self.install_boot_interrupt_handler();
                self.host.write(Advisory::LateStartup.text().as_bytes());
            }
            (reason, status) => warn!("Bad reset acknowledgement: {reason:?} {status:?}"),
        }
    }

    pub(crate) fn handle_booted(&mut self, packet: Packet) {
        const KINDS: [FieldKind; 12] = [FieldKind::Word; 12];
        let words: Vec<u32> = match codec::decode(&packet.data, &KINDS) {
            Ok(fields) => fields
                .into_iter()
                .map(|f| match f {
                    Field::Word(w) => w,
                    _ => 0,
                })
                .collect(),
            Err(e) => {
                warn!("Malformed Booted message: {e}");
                return;
            }
        };

        if words[0] != boot::BOOTED | TARGET_TO_HOST {
            warn!("Bad Booted message: reason {:#010X}", words[0]);
            return;
        }

        let banner_at = KINDS.len() * 4;
        let banner_len = words[11] as usize;
        let banner = packet
            .data
            .get(banner_at..)
            .map(|rest| &rest[..banner_len.min(rest.len())])
            .unwrap_or_default();
        for &c in banner {
            self.host.write_char(c);
        }

        let info = TargetInfo {
            buffer_size: words[4],
            long_buffer_size: words[5],
            angel_version: words[6],
            adp_version: words[7],
            arch_info: words[8],
            cpu_info: words[9],
            hw_status: words[10],
            banner: banner.to_vec(),
        };
        debug!(
            "Booted: cpu_info {:#010X} hw_status {:#010X} buffers {}/{}",
            info.cpu_info, info.hw_status, info.buffer_size, info.long_buffer_size
        );

        self.boot.booted_not_received = false;
        self.set_heartbeat(true);
        self.buffer_size = info.buffer_size as usize + CHANNEL_HEADER_SIZE;
        self.long_buffer_size = info.long_buffer_size as usize + CHANNEL_HEADER_SIZE;
        self.target = Some(info);
    }

    pub(crate) fn set_heartbeat(&mut self, enabled: bool) {
        if let Err(e) = self.transport.control(DeviceControl::Heartbeat(enabled)) {
            warn!("Failed to set heartbeat {enabled}: {e}");
        }
    }
}

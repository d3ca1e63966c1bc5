//! Agent configurations and agent replacement.
//!
//! Configuration data and replacement agent images are both downloaded with
//! the same DownloadData request.  Loading an agent then
//! starts it, and reopens the connection to it from scratch.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{DeviceControl, PumpMode, Transport};
use crate::client::{Buffer, Opened, Session};
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::{WRITE_HEADER_SIZE, ctrl, hadp, icem};
use crate::status::Advisory;
use crate::{Error, Result};

/// What a configuration applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigAspect {
    Cpu = 0,
    System = 1,
}

/// How a configuration's version must match the requested version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigMatch {
    Any = 0,
    Exactly = 1,
    NoEarlier = 2,
}

/// One configuration known to the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDesc {
    pub version: u32,
    pub name: Vec<u8>,
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Number of configurations the target holds
    pub fn config_count(&mut self) -> Result<u32> {
        self.sub_query_word(hadp::ICEMAN, icem::CONFIG_COUNT, &[])
    }

    /// Describe the `n`th configuration
    pub fn config_nth(&mut self, n: u32) -> Result<ConfigDesc> {
        let reply = self
            .sub_request(hadp::ICEMAN, icem::CONFIG_NTH, &[Field::Word(n)])?
            .check()?;
        let mut payload = reply.payload()?;
        let version = payload.word()?;
        let len = payload.byte()? as usize;
        let name = payload.bytes(len)?.to_vec();
        Ok(ConfigDesc { version, name })
    }

    /// Announce a configuration of `nbytes` bytes
    pub fn add_config(&mut self, nbytes: u32) -> Result<()> {
        self.sub_command(hadp::ICEMAN, icem::ADD_CONFIG, &[Field::Word(nbytes)])
    }

    /// Download one block of configuration data.  The block must fit the
    /// long buffer.  Targets that want the data announced first need an
    /// [`Self::add_config()`] beforehand.
    pub fn load_config_data(&mut self, data: &[u8]) -> Result<()> {
        let reply = self.sub_request_with(
            hadp::CONTROL,
            ctrl::DOWNLOAD_DATA,
            &[Field::Word(data.len() as u32), Field::Bytes(data)],
            Buffer::Long,
        )?;
        reply.check()?;
        Ok(())
    }

    /// Select the configuration named `name`.  Returns the version the
    /// target selected.
    pub fn select_config(
        &mut self,
        aspect: ConfigAspect,
        name: &[u8],
        matching: ConfigMatch,
        version_req: u32,
    ) -> Result<u32> {
        let name_len = u8::try_from(name.len()).map_err(|_| Error::InvalidOperation)?;
        let version = self
            .sub_request(
                hadp::ICEMAN,
                icem::SELECT_CONFIG,
                &[
                    Field::Byte(aspect as u8),
                    Field::Byte(name_len),
                    Field::Byte(matching as u8),
                    Field::Word(version_req),
                    Field::Bytes(name),
                ],
            )?
            .check()?
            .payload()?
            .word()?;
        debug!("Selected config version {version}");
        Ok(version)
    }

    /// Replace the debug agent.
    ///
    /// Downloads `size` bytes of agent image to `dest`, taking blocks from
    /// `next_block` until it returns `None` or an empty block, then starts
    /// the new agent and reopens the connection to it.
    ///
    /// Returns [`Error::BootAbandoned`] if the user gives up waiting for
    /// the new agent to boot.
    pub fn load_agent<F, B>(&mut self, dest: u32, size: u32, mut next_block: F) -> Result<()>
    where
        F: FnMut() -> Option<B>,
        B: AsRef<[u8]>,
    {
        self.sub_command(
            hadp::CONTROL,
            ctrl::DOWNLOAD_AGENT,
            &[Field::Word(dest), Field::Word(size)],
        )?;
        debug!("Downloading {size} byte agent to {dest:#010X}");

        let max = self.chunk_size(Buffer::Long, WRITE_HEADER_SIZE)?;
        let mut pos = 0usize;
        while pos < size as usize {
            let Some(block) = next_block() else {
                debug!("Agent image ended early at {pos} bytes");
                return Ok(());
            };
            let block = block.as_ref();
            if block.is_empty() {
                debug!("Agent image ended early at {pos} bytes");
                return Ok(());
            }
            for chunk in block.chunks(max) {
                self.load_config_data(chunk)?;
            }
            pos += block.len();
        }

        // Back to default parameters before the old agent goes away
        self.negotiate_defaults()?;
        self.host.write(Advisory::NewAgentStarting.text().as_bytes());

        self.boot.booted_not_received = true;
        self.sub_command(hadp::CONTROL, ctrl::START_AGENT, &[Field::Word(dest)])?;
        self.set_heartbeat(false);
        self.wait_for_agent_boot()?;

        if let Err(e) = self.transport.control(DeviceControl::Resync) {
            warn!("Resync with new agent failed: {e}");
        }

        let opened = self.open_cold();
        self.set_heartbeat(true);
        match opened? {
            Opened::LittleEndian | Opened::BigEndian => {
                debug!("New agent running");
                Ok(())
            }
            // A cold open never resumes
            Opened::BootAbandoned | Opened::Resumed => Err(Error::BootAbandoned),
        }
    }

    /// Give the new agent a chance to announce itself.  Not hearing from it
    /// is not an error: the reopen that follows resets it anyway.
    fn wait_for_agent_boot(&mut self) -> Result<()> {
        let start = self.transport.now_ms();
        while self.boot.booted_not_received {
            self.pump(PumpMode::Poll)?;
            if self.transport.now_ms().saturating_sub(start) > self.config.agent_boot_timeout_ms {
                debug!("No Booted from new agent, reopening anyway");
                break;
            }
        }
        Ok(())
    }
}

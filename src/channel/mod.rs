//! Channel transport contract between the protocol engine and the link.
//!
//! The application provides the physical link and its channel multiplexer
//! by implementing [`Transport`].  The engine decides which of its handlers
//! each received packet goes to using a [`Router`].
//!
//! See [`crate`] for a description of how to use these objects.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod router;

pub use router::{Handler, Router};

use alloc::vec;
use alloc::vec::Vec;

use crate::params::{ParameterConfig, ParameterOptions};
use crate::protocol::ChannelId;
use crate::{Error, Result};

/// One message buffer, on one logical channel.
///
/// `data` is the ADP message itself, starting with the reason code.  Any
/// channel-layer framing is the transport's to add and remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub channel: ChannelId,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(channel: ChannelId, data: Vec<u8>) -> Self {
        Self { channel, data }
    }

    /// Reason code at the start of the message
    pub fn reason(&self) -> Result<u32> {
        word_at(&self.data, 0)
    }

    /// Status (or sub-reason) word following the fixed header
    pub fn status(&self) -> Result<u32> {
        word_at(&self.data, crate::protocol::HEADER_SIZE)
    }
}

/// How far a call to [`Transport::pump()`] may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMode {
    /// Make whatever progress is possible without blocking
    Poll,
    /// Block until at least one read event has occurred
    BlockOnRead,
}

/// Device-level requests the engine makes of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceControl<'a> {
    /// Switch the link to a newly negotiated parameter set
    SetParams(&'a ParameterConfig),
    /// Resynchronise with a freshly started agent
    Resync,
    /// Reset the device
    Reset,
    /// Enable or disable the link heartbeat
    Heartbeat(bool),
}

/// Trait for the channel-multiplexed link to the target.
///
/// Received packets are returned from [`Self::pump()`], and the engine
/// routes them itself.  Only one packet is outstanding at a time: each one
/// is owned by the engine until decoded, then dropped.
pub trait Transport {
    /// Queue a packet for transmission on its channel
    fn send(&mut self, packet: Packet) -> Result<()>;

    /// Drive link I/O, returning a packet if one was received.
    ///
    /// Arguments:
    /// - `mode` - Whether this call may block waiting for a read
    fn pump(&mut self, mode: PumpMode) -> Result<Option<Packet>>;

    /// Allocate a zeroed packet able to hold `len` bytes of message.
    ///
    /// The default implementation allocates from the heap.  Return
    /// [`Error::AllocationFailed`] if no buffer is available.
    fn allocate(&mut self, channel: ChannelId, len: usize) -> Result<Packet> {
        Ok(Packet::new(channel, vec![0u8; len]))
    }

    /// Monotonic time in milliseconds, used for bounded waits
    fn now_ms(&mut self) -> u64;

    /// Pause for the given number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Restart link sequence numbering
    fn reset_sequence(&mut self);

    /// Apply a device-level request
    fn control(&mut self, control: DeviceControl<'_>) -> Result<()>;

    /// Parameter options the user asked for, if any
    fn user_params(&mut self) -> Option<ParameterOptions> {
        None
    }

    /// The device's default parameter set, if it has one
    fn default_params(&mut self) -> Option<ParameterConfig> {
        None
    }
}

// Helper functions

fn word_at(data: &[u8], offset: usize) -> Result<u32> {
    match data.get(offset..offset + 4) {
        Some(bytes) => Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(Error::Truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_reads_header_words() {
        let mut data = vec![0u8; 20];
        data[..4].copy_from_slice(&0x8001_0003u32.to_le_bytes());
        data[16..20].copy_from_slice(&0x91u32.to_le_bytes());
        let packet = Packet::new(ChannelId::HostAdp, data);
        assert_eq!(packet.reason(), Ok(0x8001_0003));
        assert_eq!(packet.status(), Ok(0x91));
    }

    #[test]
    fn short_packet_is_truncated() {
        let packet = Packet::new(ChannelId::HostAdp, vec![1, 2, 3, 4, 5]);
        assert_eq!(packet.status(), Err(Error::Truncated));
    }
}

//! Per-channel handler slots.
//!
//! Each logical channel has at most one handler registered at a time.
//! Registering over an existing handler replaces it, which is only correct
//! when the earlier one has already fired or been abandoned, so it is
//! logged.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::protocol::{ChannelId, NUM_CHANNELS};

/// What the engine does with a packet received on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Reply to an outstanding request.  One-shot.
    Reply,
    /// Target stopped notifications during execution
    Stopped,
    /// Parameter negotiation and link check responses
    Negotiate,
    /// Acknowledgement of a Reset request
    ResetAck,
    /// Target booted notifications
    Booted,
    /// Text from the agent for the user
    TargetLog,
    /// Comms channel pass-through traffic
    Comms,
}

impl Handler {
    /// One-shot handlers are cleared from their slot when they fire
    pub const fn is_one_shot(&self) -> bool {
        matches!(self, Handler::Reply)
    }
}

/// Handler slot table, one slot per logical channel
#[derive(Debug, Clone, Default)]
pub struct Router {
    slots: [Option<Handler>; NUM_CHANNELS],
}

impl Router {
    pub const fn new() -> Self {
        Self {
            slots: [None; NUM_CHANNELS],
        }
    }

    /// Register `handler` on `channel`, returning any handler it replaced.
    pub fn register(&mut self, channel: ChannelId, handler: Handler) -> Option<Handler> {
        let old = self.slots[channel.index()].replace(handler);
        match old {
            Some(old) if old != handler => {
                debug!("Channel {channel:?}: {old:?} handler replaced by {handler:?}")
            }
            _ => trace!("Channel {channel:?}: registered {handler:?}"),
        }
        old
    }

    /// Clear the slot for `channel`, returning the handler it held
    pub fn unregister(&mut self, channel: ChannelId) -> Option<Handler> {
        let old = self.slots[channel.index()].take();
        if let Some(old) = old {
            trace!("Channel {channel:?}: unregistered {old:?}");
        }
        old
    }

    /// Handler registered on `channel`, without consuming it
    pub fn handler(&self, channel: ChannelId) -> Option<Handler> {
        self.slots[channel.index()]
    }

    /// Find the handler for a packet received on `channel`.
    ///
    /// One-shot handlers are removed as they are returned.
    pub fn route(&mut self, channel: ChannelId) -> Option<Handler> {
        let handler = self.slots[channel.index()]?;
        if handler.is_one_shot() {
            self.slots[channel.index()] = None;
        }
        Some(handler)
    }
}

//! The comms channel pass-through.
//!
//! While connected, the running application can send words to the host and
//! ask for words from it.  The session answers the target on the host's
//! behalf, calling whichever callbacks the host has connected.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::boxed::Box;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{Handler, Packet, Transport};
use crate::client::{Buffer, InfoRequest, Session};
use crate::codec::{Cursor, Field};
use crate::host::HostInterface;
use crate::protocol::{ChannelId, HEADER_SIZE, TARGET_TO_HOST, hadp, iceb, tdcc};
use crate::status::Status;
use crate::{Error, Result};

/// Receives each word the application sends to the host
pub type ToHostFn = Box<dyn FnMut(u32)>;

/// Supplies a word when the application asks for one, or `None` if none is
/// available
pub type FromHostFn = Box<dyn FnMut() -> Option<u32>>;

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Connect (`Some`) or disconnect (`None`) the receiver of words from
    /// the application.
    ///
    /// Returns [`Error::Unimplemented`] if the target has no comms channel.
    pub fn connect_comms_to_host(&mut self, callback: Option<ToHostFn>) -> Result<()> {
        self.cc_exists()?;
        let enabled = callback.is_some();
        self.to_host = callback;
        self.check_comms_handler();
        self.sub_command(
            hadp::ICEBREAKER,
            iceb::CC_CONNECT_TO_HOST,
            &[Field::Byte(enabled as u8)],
        )
    }

    /// Connect (`Some`) or disconnect (`None`) the supplier of words to the
    /// application.
    ///
    /// Returns [`Error::Unimplemented`] if the target has no comms channel.
    pub fn connect_comms_from_host(&mut self, callback: Option<FromHostFn>) -> Result<()> {
        self.cc_exists()?;
        let enabled = callback.is_some();
        self.from_host = callback;
        self.check_comms_handler();
        self.sub_command(
            hadp::ICEBREAKER,
            iceb::CC_CONNECT_FROM_HOST,
            &[Field::Byte(enabled as u8)],
        )
    }

    fn cc_exists(&mut self) -> Result<()> {
        let mut exists = self.info(InfoRequest::Icebreaker).map(|_| ());
        if exists.is_ok() {
            exists = self.sub_command(hadp::ICEBREAKER, iceb::CC_EXISTS, &[]);
        }
        if let Err(e) = exists {
            debug!("No comms channel: {e}");
            return Err(Error::Unimplemented);
        }
        Ok(())
    }

    /// Keep the comms handler registered exactly while a callback is
    /// connected
    fn check_comms_handler(&mut self) {
        let wanted = self.to_host.is_some() || self.from_host.is_some();
        let registered = self.router.handler(ChannelId::TargetComms) == Some(Handler::Comms);
        if wanted && !registered {
            debug!("Registering comms channel handler");
            self.router.register(ChannelId::TargetComms, Handler::Comms);
        } else if !wanted && registered {
            debug!("Unregistering comms channel handler");
            self.router.unregister(ChannelId::TargetComms);
        }
    }

    pub(crate) fn handle_comms(&mut self, packet: Packet) {
        let Ok([reason, debug_id, os1, os2]) = header_words(&packet.data) else {
            warn!("Short comms channel message");
            return;
        };

        let sent = if reason == tdcc::TO_HOST | TARGET_TO_HOST {
            let body = Cursor::at(&packet.data, HEADER_SIZE)
                .and_then(|mut c| Ok((c.word()?, c.word()?)));
            let Ok((nbytes, data)) = body else {
                warn!("Malformed comms to host message");
                return;
            };
            trace!("Comms to host: {nbytes} bytes {data:#010X}");
            if let Some(to_host) = self.to_host.as_mut() {
                to_host(data);
            }
            self.send_with_header(
                ChannelId::TargetComms,
                [tdcc::TO_HOST, debug_id, os1, os2],
                &[Field::Word(Status::NO_ERROR.0)],
                Buffer::Short,
            )
        } else if reason == tdcc::FROM_HOST | TARGET_TO_HOST {
            let word = self.from_host.as_mut().and_then(|from_host| from_host());
            trace!("Comms from host: {word:?}");
            self.send_with_header(
                ChannelId::TargetComms,
                [tdcc::FROM_HOST, debug_id, os1, os2],
                &[
                    Field::Word(Status::NO_ERROR.0),
                    Field::Word(word.is_some() as u32),
                    Field::Word(word.unwrap_or(0)),
                ],
                Buffer::Short,
            )
        } else {
            warn!("Unexpected comms channel message {reason:#010X}");
            return;
        };

        if let Err(e) = sent {
            warn!("Failed to answer comms channel message: {e}");
        }
    }
}

fn header_words(data: &[u8]) -> Result<[u32; 4]> {
    let mut cursor = Cursor::new(data);
    Ok([cursor.word()?, cursor.word()?, cursor.word()?, cursor.word()?])
}

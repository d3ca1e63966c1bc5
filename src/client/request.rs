//! The request/reply primitive.
//!
//! Every host originated debug operation is one exchange on the host debug
//! channel:
//! 1. register a one-shot reply handler on the channel
//! 2. send the request
//! 3. pump the transport until the handler fires or the deadline passes
//! 4. validate the reply's reason code, and for sub-tagged families its
//!    sub-reason
//!
//! There is no correlation id.  A reply belongs to whichever request was
//! last sent on the channel, so only one request may be outstanding.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{Handler, Packet, PumpMode, Transport};
use crate::client::{Buffer, Deadline, Session};
use crate::codec::{self, Cursor, Field};
use crate::host::HostInterface;
use crate::protocol::{
    CHANNEL_HEADER_SIZE, ChannelId, HANDLE_UNKNOWN, HEADER_SIZE, HOST_TO_TARGET, TARGET_TO_HOST,
    is_unrecognised,
};
use crate::status::Status;
use crate::{Error, Result};

/// A validated reply.
///
/// Plain replies carry their status at offset 16.  Sub-tagged replies carry
/// the sub-reason there, and the status at offset 20.
#[derive(Debug)]
pub(crate) struct Reply {
    packet: Packet,
    status_at: usize,
}

impl Reply {
    pub(crate) fn status(&self) -> Result<Status> {
        Cursor::at(&self.packet.data, self.status_at)?
            .word()
            .map(Status)
    }

    /// The reply, if its status is success
    pub(crate) fn check(self) -> Result<Self> {
        self.status()?.check()?;
        Ok(self)
    }

    /// Cursor positioned just after the status word
    pub(crate) fn payload(&self) -> Result<Cursor<'_>> {
        Cursor::at(&self.packet.data, self.status_at + 4)
    }

    /// Read `count` words from the payload
    pub(crate) fn words(&self, count: usize) -> Result<Vec<u32>> {
        let mut cursor = self.payload()?;
        (0..count).map(|_| cursor.word()).collect()
    }
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Build and send one message on `channel`, with the host's standard
    /// header.
    ///
    /// Returns [`Error::PayloadTooLarge`] if the message would not fit the
    /// chosen buffer budget.
    pub(crate) fn send_message(
        &mut self,
        channel: ChannelId,
        reason: u32,
        fields: &[Field<'_>],
        buffer: Buffer,
    ) -> Result<()> {
        let header = [reason | HOST_TO_TARGET, 0, HANDLE_UNKNOWN, HANDLE_UNKNOWN];
        self.send_with_header(channel, header, fields, buffer)
    }

    /// As [`Self::send_message()`], with every header word supplied
    pub(crate) fn send_with_header(
        &mut self,
        channel: ChannelId,
        header: [u32; 4],
        fields: &[Field<'_>],
        buffer: Buffer,
    ) -> Result<()> {
        let len = HEADER_SIZE + codec::encode(None, fields)?;
        if len + CHANNEL_HEADER_SIZE > self.budget(buffer) {
            warn!(
                "Message {:#010X} of {len} bytes exceeds {buffer:?} buffer of {} bytes",
                header[0],
                self.budget(buffer)
            );
            return Err(Error::PayloadTooLarge);
        }

        let mut packet = self.transport.allocate(channel, len)?;
        packet.data.resize(len, 0);
        codec::encode(Some(&mut packet.data[..HEADER_SIZE]), &header.map(Field::Word))?;
        codec::encode(Some(&mut packet.data[HEADER_SIZE..]), fields)?;

        trace!("Send {:#010X} on {channel:?} ({len} bytes)", header[0]);
        self.transport.send(packet)
    }

    /// Send a request on the host debug channel and wait for its reply,
    /// under the session's reply deadline.
    ///
    /// Returns the reply packet once its reason code has been validated
    /// against `op`.
    pub(crate) fn exchange(
        &mut self,
        op: u32,
        fields: &[Field<'_>],
        buffer: Buffer,
    ) -> Result<Packet> {
        let deadline = self.config.reply_deadline;
        self.exchange_with_deadline(op, fields, buffer, deadline)
    }

    /// As [`Self::exchange()`], with an explicit deadline
    pub(crate) fn exchange_with_deadline(
        &mut self,
        op: u32,
        fields: &[Field<'_>],
        buffer: Buffer,
        deadline: Deadline,
    ) -> Result<Packet> {
        self.reply = None;
        self.router.register(ChannelId::HostAdp, Handler::Reply);

        if let Err(e) = self.send_message(ChannelId::HostAdp, op, fields, buffer) {
            self.release_reply_slot();
            return Err(e);
        }

        let packet = match self.wait_for_reply(deadline) {
            Ok(packet) => packet,
            Err(e) => {
                self.release_reply_slot();
                return Err(e);
            }
        };

        let got = packet.reason()?;
        if is_unrecognised(got) {
            debug!("Target does not recognise {op:#010X}");
            return Err(Error::Unimplemented);
        }
        let expected = op | TARGET_TO_HOST;
        if got != expected {
            error!("Expected reason code {expected:#010X}, got {got:#010X}");
            self.host.debug_print(format_args!(
                "ADP error: expected reason code {expected:#X} got reason code {got:#X}\n"
            ));
            return Err(Error::UnexpectedReason { expected, got });
        }

        trace!("Reply {got:#010X} ({} bytes)", packet.data.len());
        Ok(packet)
    }

    /// Plain request, using the short buffer
    pub(crate) fn request(&mut self, op: u32, fields: &[Field<'_>]) -> Result<Reply> {
        self.request_with(op, fields, Buffer::Short)
    }

    /// Plain request, using the given buffer
    pub(crate) fn request_with(
        &mut self,
        op: u32,
        fields: &[Field<'_>],
        buffer: Buffer,
    ) -> Result<Reply> {
        let packet = self.exchange(op, fields, buffer)?;
        Ok(Reply {
            packet,
            status_at: HEADER_SIZE,
        })
    }

    /// Sub-tagged request, using the short buffer
    pub(crate) fn sub_request(&mut self, op: u32, sub: u32, fields: &[Field<'_>]) -> Result<Reply> {
        self.sub_request_with(op, sub, fields, Buffer::Short)
    }

    /// Sub-tagged request.  The reply must echo `sub`.
    pub(crate) fn sub_request_with(
        &mut self,
        op: u32,
        sub: u32,
        fields: &[Field<'_>],
        buffer: Buffer,
    ) -> Result<Reply> {
        let mut all = Vec::with_capacity(fields.len() + 1);
        all.push(Field::Word(sub));
        all.extend_from_slice(fields);

        let packet = self.exchange(op, &all, buffer)?;
        let got = packet.status()?;
        if got != sub {
            warn!("Request {op:#010X}: expected sub-reason {sub:#010X}, got {got:#010X}");
            return Err(Error::SubReasonMismatch { expected: sub, got });
        }
        Ok(Reply {
            packet,
            status_at: HEADER_SIZE + 4,
        })
    }

    /// Sub-tagged request with no reply payload of interest
    pub(crate) fn sub_command(&mut self, op: u32, sub: u32, fields: &[Field<'_>]) -> Result<()> {
        self.sub_request(op, sub, fields)?.check().map(|_| ())
    }

    /// Sub-tagged request returning one word
    pub(crate) fn sub_query_word(
        &mut self,
        op: u32,
        sub: u32,
        fields: &[Field<'_>],
    ) -> Result<u32> {
        self.sub_request(op, sub, fields)?.check()?.payload()?.word()
    }

    fn wait_for_reply(&mut self, deadline: Deadline) -> Result<Packet> {
        let start = self.transport.now_ms();
        let mut polled = false;
        loop {
            if let Some(packet) = self.reply.take() {
                return Ok(packet);
            }
            match deadline {
                Deadline::Unbounded => self.pump(PumpMode::BlockOnRead)?,
                Deadline::Bounded(ms) => {
                    if self.transport.now_ms().saturating_sub(start) > ms {
                        break;
                    }
                    self.pump(PumpMode::Poll)?;
                }
                Deadline::Poll => {
                    if polled {
                        break;
                    }
                    self.pump(PumpMode::Poll)?;
                    polled = true;
                }
            }
        }

        debug!("Timed out waiting for reply ({deadline:?})");
        Err(Error::Timeout)
    }

    /// Drop the reply handler if it never fired
    fn release_reply_slot(&mut self) {
        if self.router.handler(ChannelId::HostAdp) == Some(Handler::Reply) {
            self.router.unregister(ChannelId::HostAdp);
        }
    }
}

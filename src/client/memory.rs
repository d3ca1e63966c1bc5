//! Target memory access.
//!
//! Transfers larger than one message are split into chunks sized to the
//! current buffer budget, one request per chunk.  A chunk the target
//! declines ends the transfer, so callers must check
//! [`Transfer::not_transferred`] rather than assume the whole range was
//! moved.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::Transport;
use crate::client::{Buffer, Session};
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::{CHANNEL_HEADER_SIZE, READ_HEADER_SIZE, WRITE_HEADER_SIZE, hadp};
use crate::status::Status;
use crate::{Error, Result};

/// Outcome of a bulk memory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Status of the last chunk attempted
    pub status: Status,
    /// Bytes of the requested range that were not transferred
    pub not_transferred: usize,
}

impl Transfer {
    fn complete() -> Self {
        Self {
            status: Status::NO_ERROR,
            not_transferred: 0,
        }
    }

    /// Whether the whole range was transferred
    pub fn is_complete(&self) -> bool {
        self.status.is_ok() && self.not_transferred == 0
    }

    /// As a `Result`, failing with the target's status if the transfer
    /// stopped early
    pub fn check(self) -> Result<()> {
        self.status.check()?;
        if self.not_transferred != 0 {
            return Err(Error::Target(Status::ERROR));
        }
        Ok(())
    }
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Read `buf.len()` bytes of target memory starting at `address`.
    ///
    /// A failing transport or reply sequencing returns `Err`.  A chunk the
    /// target declines returns `Ok` with the failing status, and the
    /// unread remainder of `buf` left untouched.
    pub fn read_memory(&mut self, address: u32, buf: &mut [u8]) -> Result<Transfer> {
        trace!("Read {} bytes from {address:#010X}", buf.len());
        let chunk_size = self.chunk_size(Buffer::Short, READ_HEADER_SIZE)?;

        let total = buf.len();
        let mut transfer = Transfer::complete();
        let mut done = 0;
        for chunk in buf.chunks_mut(chunk_size) {
            let len = chunk.len();
            let reply = self.request(
                hadp::READ,
                &[
                    Field::Word(address.wrapping_add(done as u32)),
                    Field::Word(len as u32),
                ],
            )?;

            let status = reply.status()?;
            if !status.is_ok() {
                debug!("Read at offset {done} failed: {status}");
                transfer.status = status;
                transfer.not_transferred += total - done;
                return Ok(transfer);
            }

            let mut payload = reply.payload()?;
            let not_read = (payload.word()? as usize).min(len);
            let data = payload.rest();
            let copied = (len - not_read).min(data.len());
            if copied < len - not_read {
                debug!("Read at offset {done} returned {copied} of {} bytes", len - not_read);
            }
            chunk[..copied].copy_from_slice(&data[..copied]);
            transfer.not_transferred += len - copied;
            done += len;
        }
        Ok(transfer)
    }

    /// Write `data` to target memory starting at `address`.
    ///
    /// Uses the long buffer.  Error handling is as for
    /// [`Self::read_memory()`].
    pub fn write_memory(&mut self, address: u32, data: &[u8]) -> Result<Transfer> {
        trace!("Write {} bytes to {address:#010X}", data.len());
        let chunk_size = self.chunk_size(Buffer::Long, WRITE_HEADER_SIZE)?;

        let mut done = 0;
        for chunk in data.chunks(chunk_size) {
            let reply = self.request_with(
                hadp::WRITE,
                &[
                    Field::Word(address.wrapping_add(done as u32)),
                    Field::Word(chunk.len() as u32),
                    Field::Bytes(chunk),
                ],
                Buffer::Long,
            )?;

            let status = reply.status()?;
            if !status.is_ok() {
                debug!("Write at offset {done} failed: {status}");
                return Ok(Transfer {
                    status,
                    not_transferred: data.len() - done,
                });
            }
            done += chunk.len();
        }
        Ok(Transfer::complete())
    }

    /// Largest payload one message on `buffer` can carry after a header of
    /// `header` bytes
    pub(crate) fn chunk_size(&self, buffer: Buffer, header: usize) -> Result<usize> {
        match self.budget(buffer).checked_sub(CHANNEL_HEADER_SIZE + header) {
            Some(size) if size > 0 => Ok(size),
            _ => {
                warn!("{buffer:?} buffer too small for a {header} byte header");
                Err(Error::BufferTooSmall)
            }
        }
    }
}

//! Profile map transfer.
//!
//! A profile map is an array of words, sent and read back in chunks.  The
//! codec always writes little-endian, so no byte order conversion is needed
//! whatever the host's native order.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::Transport;
use crate::client::{Buffer, Session};
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::{PROFILE_READ_HEADER_SIZE, PROFILE_WRITE_HEADER_SIZE, hadp, profile};
use crate::Result;

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Send a profile map to the target
    pub fn write_profile_map(&mut self, map: &[u32]) -> Result<()> {
        let chunk_words = self.chunk_size(Buffer::Long, PROFILE_WRITE_HEADER_SIZE)? / 4;
        let map_len = map.len() as u32;

        let mut offset = 0usize;
        for chunk in map.chunks(chunk_words.max(1)) {
            let mut fields = Vec::with_capacity(chunk.len() + 3);
            fields.push(Field::Word(map_len));
            fields.push(Field::Word(chunk.len() as u32));
            fields.push(Field::Word(offset as u32));
            fields.extend(chunk.iter().map(|&w| Field::Word(w)));

            self.sub_request_with(hadp::PROFILE, profile::WRITE_MAP, &fields, Buffer::Long)?
                .check()?;
            offset += chunk.len();
        }
        debug!("Wrote {map_len} word profile map");
        Ok(())
    }

    /// Read back the target's profile counts into `counts`
    pub fn read_profile_map(&mut self, counts: &mut [u32]) -> Result<()> {
        let chunk_words = self.chunk_size(Buffer::Short, PROFILE_READ_HEADER_SIZE)? / 4;

        let mut offset = 0usize;
        for chunk in counts.chunks_mut(chunk_words.max(1)) {
            let words = self
                .sub_request(
                    hadp::PROFILE,
                    profile::READ_MAP,
                    &[Field::Word(offset as u32), Field::Word(chunk.len() as u32)],
                )?
                .check()?
                .words(chunk.len())?;
            chunk.copy_from_slice(&words);
            offset += chunk.len();
        }
        trace!("Read {offset} profile counts");
        Ok(())
    }
}

//! Breakpoints and watchpoints.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::Transport;
use crate::client::Session;
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::hadp;
use crate::Result;

/// A breakpoint or watchpoint the target has set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// Target-assigned handle, used to clear the point
    pub handle: u32,
    /// Address the target actually used
    pub address: u32,
    /// Bound the target actually used
    pub bound: u32,
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Set a breakpoint
    pub fn set_breakpoint(&mut self, address: u32, kind: u8, bound: u32) -> Result<Point> {
        self.set_point(
            hadp::SET_BREAK,
            &[Field::Word(address), Field::Byte(kind), Field::Word(bound)],
        )
    }

    pub fn clear_breakpoint(&mut self, handle: u32) -> Result<()> {
        self.request(hadp::CLEAR_BREAK, &[Field::Word(handle)])?.check()?;
        debug!("Cleared breakpoint {handle:#X}");
        Ok(())
    }

    /// Set a watchpoint on accesses of `datatype` at `address`
    pub fn set_watchpoint(
        &mut self,
        address: u32,
        kind: u8,
        datatype: u8,
        bound: u32,
    ) -> Result<Point> {
        self.set_point(
            hadp::SET_WATCH,
            &[
                Field::Word(address),
                Field::Byte(kind),
                Field::Byte(datatype),
                Field::Word(bound),
            ],
        )
    }

    pub fn clear_watchpoint(&mut self, handle: u32) -> Result<()> {
        self.request(hadp::CLEAR_WATCH, &[Field::Word(handle)])?.check()?;
        debug!("Cleared watchpoint {handle:#X}");
        Ok(())
    }

    /// Find out whether the target can set a point: a breakpoint if
    /// `datatype` is 0, otherwise a watchpoint.
    ///
    /// The target has no dry-run request, so this really sets the point.
    /// It is not cleared again; the returned point belongs to the caller.
    pub fn point_inquiry(
        &mut self,
        address: u32,
        kind: u8,
        datatype: u8,
        bound: u32,
    ) -> Result<Point> {
        if datatype == 0 {
            self.set_breakpoint(address, kind, bound)
        } else {
            self.set_watchpoint(address, kind, datatype, bound)
        }
    }

    fn set_point(&mut self, op: u32, fields: &[Field<'_>]) -> Result<Point> {
        let reply = self.request(op, fields)?.check()?;
        let mut payload = reply.payload()?;
        let point = Point {
            handle: payload.word()?,
            address: payload.word()?,
            bound: payload.word()?,
        };
        debug!("Set point {:#X} at {:#010X}", point.handle, point.address);
        Ok(point)
    }
}
